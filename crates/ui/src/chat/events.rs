/// Emitted when the composer asks to send its current text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submit {
    pub content: String,
}

impl Submit {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Emitted whenever the composer text may have changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerChanged {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceToggleClicked;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImagePickClicked;

/// A user-facing warning raised by the chat view, shown as a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRaised {
    pub message: String,
}

impl AlertRaised {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
