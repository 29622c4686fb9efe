use futures::FutureExt;
use reqwest::multipart::{Form, Part};
use snafu::ResultExt;

use super::client::{
    BackendConfig, BackendResult, BotReply, BoxFuture, BuildClientSnafu, ChatBackend,
    DecodeReplySnafu, Endpoint, ImageUpload, InvalidMimeTypeSnafu, ReadBodySnafu,
    SendRequestSnafu, StatusSnafu,
};

/// `reqwest` transport for the chat and vision endpoints.
///
/// The client is built without a request timeout: a call runs until the server
/// answers or the connection fails.
pub struct HttpBackend {
    config: BackendConfig,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let http = reqwest::Client::builder().build().context(BuildClientSnafu {
            stage: "http-backend-new",
        })?;

        Ok(Self { config, http })
    }

    async fn post_text(&self, text: String) -> BackendResult<BotReply> {
        let endpoint = Endpoint::Chat;
        tracing::debug!(%endpoint, length = text.len(), "sending chat request");

        let response = self
            .http
            .post(self.config.url_for(endpoint))
            .form(&[("text", text.as_str())])
            .send()
            .await
            .context(SendRequestSnafu {
                stage: "send-chat-request",
                endpoint,
            })?;

        Self::read_reply(endpoint, response).await
    }

    async fn post_image(&self, image: ImageUpload, question: String) -> BackendResult<BotReply> {
        let endpoint = Endpoint::Vision;
        tracing::debug!(
            %endpoint,
            file_name = %image.file_name,
            size = image.bytes.len(),
            "sending vision request"
        );

        let mime_type = image.mime_type.clone();
        let file_part = Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&mime_type)
            .context(InvalidMimeTypeSnafu {
                stage: "build-vision-file-part",
                mime_type: mime_type.clone(),
            })?;

        let form = Form::new()
            .part("file", file_part)
            .text("question", question);

        let response = self
            .http
            .post(self.config.url_for(endpoint))
            .multipart(form)
            .send()
            .await
            .context(SendRequestSnafu {
                stage: "send-vision-request",
                endpoint,
            })?;

        Self::read_reply(endpoint, response).await
    }

    async fn read_reply(
        endpoint: Endpoint,
        response: reqwest::Response,
    ) -> BackendResult<BotReply> {
        let status = response.status();
        let payload = response.text().await.context(ReadBodySnafu {
            stage: "read-reply-body",
            endpoint,
        })?;

        if !status.is_success() {
            return StatusSnafu {
                stage: "reply-http-status",
                endpoint,
                status: status.as_u16(),
                body: payload,
            }
            .fail();
        }

        let document = serde_json::from_str(&payload).context(DecodeReplySnafu {
            stage: "decode-reply-json",
            endpoint,
        })?;

        Ok(BotReply::from_json(document))
    }
}

impl ChatBackend for HttpBackend {
    fn send_text<'a>(&'a self, text: String) -> BoxFuture<'a, BackendResult<BotReply>> {
        self.post_text(text).boxed()
    }

    fn send_image<'a>(
        &'a self,
        image: ImageUpload,
        question: String,
    ) -> BoxFuture<'a, BackendResult<BotReply>> {
        self.post_image(image, question).boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::Router;
    use axum::extract::{Form as AxumForm, Multipart};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use serde_json::{Value, json};

    use super::*;
    use crate::BackendError;

    async fn serve(router: Router) -> BackendConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        BackendConfig::new(format!("http://{address}"))
    }

    async fn echo_chat(AxumForm(fields): AxumForm<HashMap<String, String>>) -> impl IntoResponse {
        let text = fields.get("text").cloned().unwrap_or_default();
        axum::Json(json!({ "reply": format!("echo: {text}") }))
    }

    async fn describe_upload(mut multipart: Multipart) -> impl IntoResponse {
        let mut parts = Vec::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.unwrap();
            parts.push(json!({
                "name": name,
                "file_name": file_name,
                "content_type": content_type,
                "size": bytes.len(),
                "text": String::from_utf8_lossy(&bytes),
            }));
        }
        axum::Json(json!({ "reply": parts }))
    }

    fn sample_image() -> ImageUpload {
        ImageUpload {
            file_name: "rash.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![1, 2, 3, 4],
        }
    }

    #[tokio::test]
    async fn chat_posts_form_encoded_text() {
        let config = serve(Router::new().route("/chat/", post(echo_chat))).await;
        let backend = HttpBackend::new(config).unwrap();

        let reply = backend
            .send_text("What is a fever?".to_string())
            .await
            .unwrap();

        assert_eq!(reply, BotReply::new("echo: What is a fever?"));
    }

    #[tokio::test]
    async fn vision_posts_file_and_empty_question() {
        let config = serve(Router::new().route("/vision/", post(describe_upload))).await;
        let backend = HttpBackend::new(config).unwrap();

        let reply = backend
            .send_image(sample_image(), String::new())
            .await
            .unwrap();

        let Some(Value::Array(parts)) = reply.reply else {
            panic!("expected the multipart description array");
        };
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["name"], "file");
        assert_eq!(parts[0]["file_name"], "rash.png");
        assert_eq!(parts[0]["content_type"], "image/png");
        assert_eq!(parts[0]["size"], 4);
        assert_eq!(parts[1]["name"], "question");
        assert_eq!(parts[1]["text"], "");
    }

    #[tokio::test]
    async fn missing_reply_field_is_not_an_error() {
        let router = Router::new().route(
            "/chat/",
            post(|| async { axum::Json(json!({ "detail": "ok" })) }),
        );
        let backend = HttpBackend::new(serve(router).await).unwrap();

        let reply = backend.send_text("hi".to_string()).await.unwrap();
        assert_eq!(reply, BotReply::empty());
    }

    #[tokio::test]
    async fn failure_status_is_reported_with_body() {
        let router = Router::new().route(
            "/chat/",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model offline") }),
        );
        let backend = HttpBackend::new(serve(router).await).unwrap();

        let error = backend.send_text("hi".to_string()).await.unwrap_err();
        match error {
            BackendError::Status {
                endpoint,
                status,
                body,
                ..
            } => {
                assert_eq!(endpoint, Endpoint::Chat);
                assert_eq!(status, 500);
                assert_eq!(body, "model offline");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let router = Router::new().route("/vision/", post(|| async { "<html>oops</html>" }));
        let backend = HttpBackend::new(serve(router).await).unwrap();

        let error = backend
            .send_image(sample_image(), String::new())
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            BackendError::DecodeReply {
                endpoint: Endpoint::Vision,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_send_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(BackendConfig::new(format!("http://{address}"))).unwrap();
        let error = backend.send_text("hi".to_string()).await.unwrap_err();
        assert!(matches!(error, BackendError::SendRequest { .. }));
    }

    #[tokio::test]
    async fn invalid_mime_type_is_rejected_before_sending() {
        let backend = HttpBackend::new(BackendConfig::new("http://127.0.0.1:9")).unwrap();
        let mut image = sample_image();
        image.mime_type = "not a mime".to_string();

        let error = backend.send_image(image, String::new()).await.unwrap_err();
        assert!(matches!(error, BackendError::InvalidMimeType { .. }));
    }
}
