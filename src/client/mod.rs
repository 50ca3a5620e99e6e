//! HTTP client for the backend's request/response endpoints.
//!
//! Covers logs, daily analytics, image analysis and video upload. The live
//! stream endpoint is handled by [`crate::stream`].

mod error;
mod types;

pub use error::ClientError;
pub use types::{AnalysisResult, DailyAnalytics, LogRecord, TrendPoint, UploadReceipt};

use crate::config::BackendConfig;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

/// Request/response operations the dashboard depends on.
///
/// Implemented by [`BackendClient`]; the seam lets the dashboard run against
/// in-memory fakes.
#[async_trait]
pub trait BackendApi: Send + Sync + 'static {
    async fn fetch_logs(&self, limit: u32) -> Result<Vec<LogRecord>, ClientError>;

    async fn fetch_daily_analytics(&self) -> Result<DailyAnalytics, ClientError>;

    async fn analyze_image(&self, path: &Path) -> Result<AnalysisResult, ClientError>;

    async fn upload_video(&self, path: &Path) -> Result<UploadReceipt, ClientError>;
}

/// Client bound to one backend root address.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: Url,
    client: reqwest::Client,
    timeout_seconds: u64,
}

impl BackendClient {
    /// Create a client from configuration.
    pub fn new(config: &BackendConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Self::with_client(config, client)
    }

    /// Create a client with a custom HTTP client (for testing).
    pub fn with_client(config: &BackendConfig, client: reqwest::Client) -> Result<Self, ClientError> {
        let mut base_url =
            Url::parse(&config.url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            client,
            timeout_seconds: config.timeout_seconds,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }

    /// Fetch the most recent log records, in the order the backend returns them.
    pub async fn fetch_logs(&self, limit: u32) -> Result<Vec<LogRecord>, ClientError> {
        let url = self.endpoint("logs")?;
        let request = self.client.get(url).query(&[("limit", limit)]);
        self.send_json(request).await
    }

    /// Fetch today's aggregate counts.
    pub async fn fetch_daily_analytics(&self) -> Result<DailyAnalytics, ClientError> {
        let url = self.endpoint("analytics/daily")?;
        self.send_json(self.client.get(url)).await
    }

    /// Submit one image for analysis.
    pub async fn analyze_image(&self, path: &Path) -> Result<AnalysisResult, ClientError> {
        let url = self.endpoint("analyze/image")?;
        let form = Self::file_form(path).await?;
        self.send_json(self.client.post(url).multipart(form)).await
    }

    /// Upload a video; the returned filename is the source for replay streaming.
    pub async fn upload_video(&self, path: &Path) -> Result<UploadReceipt, ClientError> {
        let url = self.endpoint("upload/video")?;
        let form = Self::file_form(path).await?;
        let receipt: UploadReceipt = self.send_json(self.client.post(url).multipart(form)).await?;
        if receipt.filename.is_empty() {
            return Err(ClientError::InvalidResponse(
                "upload response has an empty filename".to_string(),
            ));
        }
        Ok(receipt)
    }

    /// Check that the backend root answers.
    pub async fn ping(&self) -> Result<String, ClientError> {
        #[derive(serde::Deserialize)]
        struct Root {
            #[serde(default)]
            message: String,
        }
        let root: Root = self.send_json(self.client.get(self.base_url.clone())).await?;
        Ok(root.message)
    }

    async fn file_form(path: &Path) -> Result<Form, ClientError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.as_ref())
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Form::new().part("file", part))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.timeout_seconds))?;
        serde_json::from_str(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl BackendApi for BackendClient {
    async fn fetch_logs(&self, limit: u32) -> Result<Vec<LogRecord>, ClientError> {
        BackendClient::fetch_logs(self, limit).await
    }

    async fn fetch_daily_analytics(&self) -> Result<DailyAnalytics, ClientError> {
        BackendClient::fetch_daily_analytics(self).await
    }

    async fn analyze_image(&self, path: &Path) -> Result<AnalysisResult, ClientError> {
        BackendClient::analyze_image(self, path).await
    }

    async fn upload_video(&self, path: &Path) -> Result<UploadReceipt, ClientError> {
        BackendClient::upload_video(self, path).await
    }
}
