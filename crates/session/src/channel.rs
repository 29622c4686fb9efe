use std::fmt;

use medassist_backend::{Endpoint, ImageUpload};

use super::text::RawText;

/// User message appended for every image upload.
pub const IMAGE_PLACEHOLDER: &str = "[Sent an image]";

/// Correlates a dispatched request with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Where a text submission comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TextSource {
    /// The live composer box. Accepted submissions clear it.
    Composer,
    /// Text supplied by another channel, such as a voice transcript.
    Override(RawText),
}

impl TextSource {
    pub fn transcript(text: impl Into<String>) -> Self {
        Self::Override(RawText::Text(text.into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    Chat {
        text: String,
    },
    Vision {
        image: ImageUpload,
        question: String,
    },
}

impl RequestKind {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Chat { .. } => Endpoint::Chat,
            Self::Vision { .. } => Endpoint::Vision,
        }
    }
}

/// A request the session has registered as in flight and expects back as a
/// [`crate::RequestCompletion`].
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub id: RequestId,
    pub kind: RequestKind,
}

impl OutboundRequest {
    pub fn endpoint(&self) -> Endpoint {
        self.kind.endpoint()
    }
}
