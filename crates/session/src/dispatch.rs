use std::sync::Arc;

use medassist_backend::{BotReply, ChatBackend, Endpoint};
use serde_json::Value;

use super::channel::{OutboundRequest, RequestId, RequestKind};
use super::text::RawText;

pub const CHAT_FALLBACK_REPLY: &str = "No reply from server.";
pub const VISION_FALLBACK_REPLY: &str = "No response for image.";
pub const CHAT_ERROR_REPLY: &str = "Error contacting server.";
pub const VISION_ERROR_REPLY: &str = "Image send failed.";

/// Transport, status or decoding failure, rendered once at the dispatch boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    pub message: String,
}

/// Result of one dispatched request, routed back into the session.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestCompletion {
    pub id: RequestId,
    pub endpoint: Endpoint,
    pub outcome: Result<BotReply, DispatchFailure>,
}

impl RequestCompletion {
    pub fn replied(id: RequestId, endpoint: Endpoint, reply: BotReply) -> Self {
        Self {
            id,
            endpoint,
            outcome: Ok(reply),
        }
    }

    pub fn failed(id: RequestId, endpoint: Endpoint, message: impl Into<String>) -> Self {
        Self {
            id,
            endpoint,
            outcome: Err(DispatchFailure {
                message: message.into(),
            }),
        }
    }

    /// The bot message this completion produces.
    ///
    /// Missing, null, `false`, zero and empty-string replies count as absent and
    /// use the endpoint fallback; failures use the endpoint error text.
    pub fn bot_text(&self) -> RawText {
        match &self.outcome {
            Ok(reply) => match reply.reply.as_ref().filter(|value| is_present(value)) {
                Some(value) => RawText::from(value.clone()),
                None => RawText::from(fallback_reply(self.endpoint)),
            },
            Err(_) => RawText::from(error_reply(self.endpoint)),
        }
    }
}

pub fn fallback_reply(endpoint: Endpoint) -> &'static str {
    match endpoint {
        Endpoint::Chat => CHAT_FALLBACK_REPLY,
        Endpoint::Vision => VISION_FALLBACK_REPLY,
    }
}

pub fn error_reply(endpoint: Endpoint) -> &'static str {
    match endpoint {
        Endpoint::Chat => CHAT_ERROR_REPLY,
        Endpoint::Vision => VISION_ERROR_REPLY,
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Runs one request to completion. Errors are folded into the completion, never
/// returned, and the call is never retried.
pub async fn dispatch(backend: Arc<dyn ChatBackend>, request: OutboundRequest) -> RequestCompletion {
    let OutboundRequest { id, kind } = request;
    let endpoint = kind.endpoint();

    let result = match kind {
        RequestKind::Chat { text } => backend.send_text(text).await,
        RequestKind::Vision { image, question } => backend.send_image(image, question).await,
    };

    match result {
        Ok(reply) => {
            tracing::debug!(request_id = %id, %endpoint, "request completed");
            RequestCompletion::replied(id, endpoint, reply)
        }
        Err(error) => {
            tracing::warn!(request_id = %id, %endpoint, error = %error, "request failed");
            RequestCompletion::failed(id, endpoint, error.to_string())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use medassist_backend::{BackendError, BackendResult, BoxFuture, ImageUpload};
    use serde_json::json;

    use super::*;
    use crate::text::to_safe_text;

    /// What a scripted backend answers, per endpoint.
    #[derive(Debug, Clone)]
    pub(crate) enum Script {
        Reply(BotReply),
        Status(u16),
    }

    #[derive(Default)]
    pub(crate) struct ScriptedBackend {
        pub chat: Mutex<Vec<Script>>,
        pub vision: Mutex<Vec<Script>>,
        pub sent_texts: Mutex<Vec<String>>,
        pub sent_images: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedBackend {
        pub(crate) fn with_chat(script: Script) -> Self {
            let backend = Self::default();
            backend.chat.lock().unwrap().push(script);
            backend
        }

        pub(crate) fn with_vision(script: Script) -> Self {
            let backend = Self::default();
            backend.vision.lock().unwrap().push(script);
            backend
        }

        fn play(endpoint: Endpoint, script: Option<Script>) -> BackendResult<BotReply> {
            match script {
                Some(Script::Reply(reply)) => Ok(reply),
                Some(Script::Status(status)) => Err(BackendError::Status {
                    stage: "scripted",
                    endpoint,
                    status,
                    body: String::new(),
                }),
                None => Ok(BotReply::empty()),
            }
        }
    }

    impl ChatBackend for ScriptedBackend {
        fn send_text<'a>(&'a self, text: String) -> BoxFuture<'a, BackendResult<BotReply>> {
            self.sent_texts.lock().unwrap().push(text);
            let script = self.chat.lock().unwrap().pop();
            Box::pin(async move { Self::play(Endpoint::Chat, script) })
        }

        fn send_image<'a>(
            &'a self,
            image: ImageUpload,
            question: String,
        ) -> BoxFuture<'a, BackendResult<BotReply>> {
            self.sent_images
                .lock()
                .unwrap()
                .push((image.file_name, question));
            let script = self.vision.lock().unwrap().pop();
            Box::pin(async move { Self::play(Endpoint::Vision, script) })
        }
    }

    pub(crate) fn sample_image() -> ImageUpload {
        ImageUpload {
            file_name: "rash.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            bytes: vec![0xff, 0xd8],
        }
    }

    #[tokio::test]
    async fn chat_reply_is_passed_through() {
        let backend = Arc::new(ScriptedBackend::with_chat(Script::Reply(BotReply::new(
            "A fever is...",
        ))));
        let request = OutboundRequest {
            id: RequestId::new(1),
            kind: RequestKind::Chat {
                text: "What is a fever?".to_string(),
            },
        };

        let completion = dispatch(backend.clone(), request).await;

        assert_eq!(completion.id, RequestId::new(1));
        assert_eq!(to_safe_text(completion.bot_text()), "A fever is...");
        assert_eq!(
            backend.sent_texts.lock().unwrap().as_slice(),
            &["What is a fever?".to_string()]
        );
    }

    #[tokio::test]
    async fn failures_become_endpoint_specific_errors() {
        let chat = Arc::new(ScriptedBackend::with_chat(Script::Status(502)));
        let completion = dispatch(
            chat,
            OutboundRequest {
                id: RequestId::new(2),
                kind: RequestKind::Chat {
                    text: "hi".to_string(),
                },
            },
        )
        .await;
        assert!(completion.outcome.is_err());
        assert_eq!(to_safe_text(completion.bot_text()), CHAT_ERROR_REPLY);

        let vision = Arc::new(ScriptedBackend::with_vision(Script::Status(500)));
        let completion = dispatch(
            vision.clone(),
            OutboundRequest {
                id: RequestId::new(3),
                kind: RequestKind::Vision {
                    image: sample_image(),
                    question: String::new(),
                },
            },
        )
        .await;
        assert_eq!(to_safe_text(completion.bot_text()), VISION_ERROR_REPLY);
        assert_eq!(
            vision.sent_images.lock().unwrap().as_slice(),
            &[("rash.jpg".to_string(), String::new())]
        );
    }

    #[test]
    fn absent_replies_use_fallbacks() {
        for reply in [
            BotReply::empty(),
            BotReply { reply: Some(json!(null)) },
            BotReply::new(""),
            BotReply { reply: Some(json!(false)) },
            BotReply { reply: Some(json!(0)) },
        ] {
            let chat = RequestCompletion::replied(RequestId::new(1), Endpoint::Chat, reply.clone());
            assert_eq!(to_safe_text(chat.bot_text()), CHAT_FALLBACK_REPLY);

            let vision = RequestCompletion::replied(RequestId::new(2), Endpoint::Vision, reply);
            assert_eq!(to_safe_text(vision.bot_text()), VISION_FALLBACK_REPLY);
        }
    }

    #[test]
    fn structured_replies_are_coerced() {
        let completion = RequestCompletion::replied(
            RequestId::new(1),
            Endpoint::Chat,
            BotReply {
                reply: Some(json!({ "summary": "rest" })),
            },
        );
        assert_eq!(to_safe_text(completion.bot_text()), r#"{"summary":"rest"}"#);

        let numeric = RequestCompletion::replied(
            RequestId::new(2),
            Endpoint::Chat,
            BotReply {
                reply: Some(json!(37.5)),
            },
        );
        assert_eq!(to_safe_text(numeric.bot_text()), "37.5");
    }
}
