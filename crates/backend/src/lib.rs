use std::sync::Arc;

mod client;
mod http;
mod image;

pub use client::{
    BackendConfig, BackendError, BackendResult, BotReply, BoxFuture, CHAT_PATH, ChatBackend,
    DEFAULT_BASE_URL, Endpoint, ImageUpload, VISION_PATH,
};
pub use http::HttpBackend;
pub use image::image_mime_type;

/// Builds the HTTP transport for the configured server.
pub fn create_backend(config: BackendConfig) -> BackendResult<Arc<dyn ChatBackend>> {
    tracing::info!(base_url = %config.base_url, "creating chat backend");
    Ok(Arc::new(HttpBackend::new(config)?))
}
