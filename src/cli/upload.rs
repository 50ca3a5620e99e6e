//! Upload command implementation

use crate::cli::{load_config_with_overrides, UploadArgs};
use crate::client::BackendClient;
use crate::stream::SourceRef;

/// Upload the video and report the source it can be streamed from.
pub async fn handle_upload(
    args: &UploadArgs,
    client: &BackendClient,
) -> Result<String, Box<dyn std::error::Error>> {
    let receipt = client.upload_video(&args.video).await?;
    let source = SourceRef::new(receipt.filename);

    let mut output = format!("✓ Uploaded {}\n  Source: {}", args.video.display(), source);
    if let Some(message) = receipt.message {
        output.push_str(&format!("\n  Backend: {}", message));
    }
    output.push_str(&format!(
        "\n  Stream it with: traffic-guard watch --source {}",
        source
    ));
    Ok(output)
}

pub async fn run_upload(args: UploadArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args.backend)?;
    let client = BackendClient::new(&config.backend)?;
    println!("{}", handle_upload(&args, &client).await?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::BackendArgs;
    use crate::config::BackendConfig;
    use std::path::PathBuf;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_upload_reports_source() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/video"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "filename": "junction.mp4",
                "message": "Video uploaded successfully"
            })))
            .expect(1)
            .mount(&server)
            .await;
        let client = BackendClient::new(&BackendConfig {
            url: server.uri(),
            timeout_seconds: 5,
        })
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("junction.mp4");
        std::fs::write(&video, b"mp4").unwrap();

        let args = UploadArgs {
            backend: BackendArgs {
                config: PathBuf::from("traffic-guard.toml"),
                backend: None,
                log_level: None,
            },
            video,
        };
        let output = handle_upload(&args, &client).await.unwrap();
        assert!(output.contains("Source: junction.mp4"));
        assert!(output.contains("--source junction.mp4"));
        assert!(output.contains("Video uploaded successfully"));
    }
}
