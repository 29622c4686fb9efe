#![deny(unsafe_code)]

//! Conversation session for the MedAssist client.
//!
//! Three input channels (composer text, voice transcripts, image uploads) feed
//! one append-only message store. Each accepted action yields an
//! [`OutboundRequest`] that the host runs with [`dispatch`] and hands back to
//! [`Session::complete`]. Nothing here depends on the UI toolkit.

/// Input channel contracts and outbound request types.
pub mod channel;
pub mod dispatch;
mod error;
/// Append-only conversation log.
pub mod message;
mod session;
pub mod text;
/// Speech recognition state machine and recognizer seam.
pub mod voice;

pub use channel::{IMAGE_PLACEHOLDER, OutboundRequest, RequestId, RequestKind, TextSource};
pub use dispatch::{
    CHAT_ERROR_REPLY, CHAT_FALLBACK_REPLY, DispatchFailure, RequestCompletion,
    VISION_ERROR_REPLY, VISION_FALLBACK_REPLY, dispatch,
};
pub use error::{SessionError, SessionResult};
pub use message::{Message, MessageId, MessageStore, Sender};
pub use session::Session;
pub use text::{RawText, UI_ELEMENT_PLACEHOLDER, UiElement, to_safe_text};
pub use voice::{
    DEFAULT_SPEECH_LOCALE, RecognizerSettings, SpeechRecognizer, VoiceChannel, VoiceCommand,
    VoiceEvent, VoiceEventReceiver, VoiceEventSender, VoiceState,
};
