use snafu::Snafu;

use super::channel::RequestId;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("Voice recognition not supported"))]
    VoiceUnsupported { stage: &'static str },
    #[snafu(display("speech recognizer refused to start on `{stage}`: {message}"))]
    VoiceStart {
        stage: &'static str,
        message: String,
    },
    #[snafu(display("request {id} is not in flight"))]
    UnknownRequest { stage: &'static str, id: RequestId },
}

impl SessionError {
    /// Builds the error a recognizer returns when it cannot begin listening.
    pub fn voice_start(stage: &'static str, message: impl Into<String>) -> Self {
        Self::VoiceStart {
            stage,
            message: message.into(),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
