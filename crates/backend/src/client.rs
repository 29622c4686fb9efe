use std::fmt;
use std::path::PathBuf;

pub use futures::future::BoxFuture;
use serde_json::Value;
use snafu::Snafu;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const CHAT_PATH: &str = "/chat/";
pub const VISION_PATH: &str = "/vision/";

/// The two backend routes a session can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Chat,
    Vision,
}

impl Endpoint {
    pub const fn path(self) -> &'static str {
        match self {
            Self::Chat => CHAT_PATH,
            Self::Vision => VISION_PATH,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().to_string(),
        }
    }

    /// Joins the configured base URL with an endpoint path.
    pub fn url_for(&self, endpoint: Endpoint) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}{}", endpoint.path())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Decoded body of a `/chat/` or `/vision/` response.
///
/// The `reply` field is kept as raw JSON because the server is free to send any
/// value there; callers decide how to render it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BotReply {
    pub reply: Option<Value>,
}

impl BotReply {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(Value::String(reply.into())),
        }
    }

    pub fn empty() -> Self {
        Self { reply: None }
    }

    /// Extracts the `reply` field from any JSON document.
    ///
    /// Non-object documents carry no reply.
    pub fn from_json(document: Value) -> Self {
        match document {
            Value::Object(mut fields) => Self {
                reply: fields.remove("reply"),
            },
            _ => Self::empty(),
        }
    }
}

/// An image file read from disk, ready to be attached to a multipart form.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to {endpoint} failed on `{stage}`: {source}"))]
    SendRequest {
        stage: &'static str,
        endpoint: Endpoint,
        source: reqwest::Error,
    },
    #[snafu(display("{endpoint} returned status {status}: {body}"))]
    Status {
        stage: &'static str,
        endpoint: Endpoint,
        status: u16,
        body: String,
    },
    #[snafu(display("failed to read {endpoint} response body on `{stage}`: {source}"))]
    ReadBody {
        stage: &'static str,
        endpoint: Endpoint,
        source: reqwest::Error,
    },
    #[snafu(display("{endpoint} response is not valid JSON: {source}"))]
    DecodeReply {
        stage: &'static str,
        endpoint: Endpoint,
        source: serde_json::Error,
    },
    #[snafu(display("invalid mime type '{mime_type}' on `{stage}`: {source}"))]
    InvalidMimeType {
        stage: &'static str,
        mime_type: String,
        source: reqwest::Error,
    },
    #[snafu(display("failed to read image at {path:?} on `{stage}`: {source}"))]
    ReadImage {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("{path:?} is not an image file"))]
    UnsupportedImage { stage: &'static str, path: PathBuf },
}

/// Transport for the chat and vision endpoints.
pub trait ChatBackend: Send + Sync {
    fn send_text<'a>(&'a self, text: String) -> BoxFuture<'a, BackendResult<BotReply>>;
    fn send_image<'a>(
        &'a self,
        image: ImageUpload,
        question: String,
    ) -> BoxFuture<'a, BackendResult<BotReply>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_for_joins_without_doubled_slashes() {
        let config = BackendConfig::new(" http://localhost:8000/ ");
        assert_eq!(config.url_for(Endpoint::Chat), "http://localhost:8000/chat/");
        assert_eq!(
            config.url_for(Endpoint::Vision),
            "http://localhost:8000/vision/"
        );
    }

    #[test]
    fn empty_base_url_keeps_relative_paths() {
        let config = BackendConfig::new("");
        assert_eq!(config.url_for(Endpoint::Chat), "/chat/");
    }

    #[test]
    fn reply_is_taken_only_from_objects() {
        let reply = BotReply::from_json(json!({ "reply": "A fever is...", "extra": 1 }));
        assert_eq!(reply, BotReply::new("A fever is..."));

        assert_eq!(BotReply::from_json(json!({ "answer": "x" })), BotReply::empty());
        assert_eq!(BotReply::from_json(json!(["reply"])), BotReply::empty());
        assert_eq!(BotReply::from_json(json!("reply")), BotReply::empty());
    }

    #[test]
    fn image_debug_hides_payload() {
        let image = ImageUpload {
            file_name: "rash.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![0; 2048],
        };
        let rendered = format!("{image:?}");
        assert!(rendered.contains("size: 2048"));
        assert!(!rendered.contains("[0, 0"));
    }
}
