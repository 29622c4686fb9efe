use std::path::Path;

use snafu::{OptionExt, ResultExt};

use super::client::{BackendResult, ImageUpload, ReadImageSnafu, UnsupportedImageSnafu};

/// Guesses the MIME type from the file extension, keeping only `image/*` types.
pub fn image_mime_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .iter()
        .find(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.to_string())
}

impl ImageUpload {
    /// Reads an image file from disk. Size and dimensions are not checked.
    pub async fn read(path: &Path) -> BackendResult<Self> {
        let mime_type = image_mime_type(path).context(UnsupportedImageSnafu {
            stage: "detect-image-mime",
            path: path.to_path_buf(),
        })?;

        let bytes = tokio::fs::read(path).await.context(ReadImageSnafu {
            stage: "read-image-file",
            path: path.to_path_buf(),
        })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        tracing::debug!(
            file_name = %file_name,
            mime_type = %mime_type,
            size = bytes.len(),
            "read image for upload"
        );

        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }
}
