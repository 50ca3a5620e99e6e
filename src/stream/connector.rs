//! Connection establishment for stream sessions.

use super::error::StreamError;
use super::types::SourceRef;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Url;
use tokio_tungstenite::tungstenite::Message;

/// Inbound text messages of one established connection.
///
/// The stream ends when the remote side closes. An `Err(Malformed)` item is a
/// single undecodable frame and the session skips it; any other `Err` item
/// means the transport failed. Dropping the stream releases the connection.
pub type MessageStream = BoxStream<'static, Result<String, StreamError>>;

/// Opens message-oriented connections addressed by a [`SourceRef`].
///
/// Implemented by [`WsConnector`] for the backend's websocket endpoint and by
/// in-memory fakes in tests.
#[async_trait]
pub trait StreamConnector: Send + Sync + 'static {
    /// Perform the handshake and return the inbound message stream.
    async fn connect(&self, source: &SourceRef) -> Result<MessageStream, StreamError>;
}

/// Connector for `ws(s)://<backend>/ws/video?source=<source>`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    base_url: Url,
}

impl WsConnector {
    /// Path of the stream endpoint relative to the backend root.
    pub const STREAM_PATH: &'static str = "ws/video";

    /// Create a connector from the backend's http(s) root address.
    pub fn new(backend_url: &str) -> Result<Self, StreamError> {
        let mut base_url =
            Url::parse(backend_url).map_err(|e| StreamError::InvalidAddress(e.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { base_url })
    }

    /// Build the websocket address for a source.
    pub fn stream_url(&self, source: &SourceRef) -> Result<Url, StreamError> {
        let mut url = self
            .base_url
            .join(Self::STREAM_PATH)
            .map_err(|e| StreamError::InvalidAddress(e.to_string()))?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(StreamError::InvalidAddress(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| StreamError::InvalidAddress(format!("cannot use scheme {}", scheme)))?;

        url.query_pairs_mut().append_pair("source", source.as_str());
        Ok(url)
    }
}

#[async_trait]
impl StreamConnector for WsConnector {
    async fn connect(&self, source: &SourceRef) -> Result<MessageStream, StreamError> {
        let url = self.stream_url(source)?;
        let (socket, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| StreamError::ConnectionFailed(e.to_string()))?;

        let messages = socket.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Binary(bytes)) => Some(
                    String::from_utf8(bytes).map_err(|e| StreamError::Malformed(e.to_string())),
                ),
                // Close frames end the stream on the next poll; control frames carry no data
                Ok(_) => None,
                Err(e) => Some(Err(StreamError::Transport(e.to_string()))),
            }
        });

        Ok(messages.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url_from_http_root() {
        let connector = WsConnector::new("http://localhost:8000").unwrap();
        let url = connector.stream_url(&SourceRef::webcam()).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/ws/video?source=webcam");
    }

    #[test]
    fn test_stream_url_https_becomes_wss() {
        let connector = WsConnector::new("https://traffic.example.com/api").unwrap();
        let url = connector.stream_url(&SourceRef::webcam()).unwrap();
        assert_eq!(
            url.as_str(),
            "wss://traffic.example.com/api/ws/video?source=webcam"
        );
    }

    #[test]
    fn test_stream_url_encodes_source() {
        let connector = WsConnector::new("http://localhost:8000/").unwrap();
        let url = connector
            .stream_url(&SourceRef::new("rtsp://cam/1?ch=2"))
            .unwrap();
        assert_eq!(
            url.query_pairs().next().map(|(k, v)| (k.into_owned(), v.into_owned())),
            Some(("source".to_string(), "rtsp://cam/1?ch=2".to_string()))
        );
        assert!(!url.as_str().contains("?ch=2"));
    }

    #[test]
    fn test_invalid_backend_url() {
        assert!(matches!(
            WsConnector::new("not a url"),
            Err(StreamError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_unsupported_scheme() {
        let connector = WsConnector::new("ftp://localhost").unwrap();
        assert!(connector.stream_url(&SourceRef::webcam()).is_err());
    }
}
