use tokio::sync::mpsc;

use super::error::{SessionResult, VoiceUnsupportedSnafu};

pub const DEFAULT_SPEECH_LOCALE: &str = "en-US";

pub type VoiceEventSender = mpsc::UnboundedSender<VoiceEvent>;
pub type VoiceEventReceiver = mpsc::UnboundedReceiver<VoiceEvent>;

/// How a recognizer is asked to listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerSettings {
    pub locale: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl RecognizerSettings {
    /// Single-utterance settings for the given locale.
    pub fn for_locale(locale: impl Into<String>) -> Self {
        let locale = locale.into().trim().to_string();
        Self {
            locale: if locale.is_empty() {
                DEFAULT_SPEECH_LOCALE.to_string()
            } else {
                locale
            },
            continuous: false,
            interim_results: false,
        }
    }
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self::for_locale(DEFAULT_SPEECH_LOCALE)
    }
}

/// Lifecycle notifications reported by a recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    Started,
    Ended,
    Error(String),
    /// Candidate transcripts for the utterance, best first.
    Result(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceState {
    #[default]
    Idle,
    Listening,
}

/// Platform speech-to-text engine.
///
/// Implementations report progress by sending [`VoiceEvent`]s on the channel
/// handed to [`SpeechRecognizer::start`]; they never touch session state.
pub trait SpeechRecognizer: Send + Sync {
    fn start(&self, settings: &RecognizerSettings, events: VoiceEventSender) -> SessionResult<()>;
    fn stop(&self);
}

/// Idle/listening state machine for the voice channel.
#[derive(Debug, Clone, Default)]
pub struct VoiceChannel {
    state: VoiceState,
    supported: bool,
    transcript_taken: bool,
}

impl VoiceChannel {
    pub fn new(supported: bool) -> Self {
        Self {
            state: VoiceState::Idle,
            supported,
            transcript_taken: false,
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == VoiceState::Listening
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Decides what the voice button does. State only moves on recognizer events.
    pub fn toggle(&self) -> SessionResult<VoiceCommand> {
        if !self.supported {
            return VoiceUnsupportedSnafu {
                stage: "voice-toggle",
            }
            .fail();
        }

        Ok(match self.state {
            VoiceState::Listening => VoiceCommand::Stop,
            VoiceState::Idle => VoiceCommand::Start,
        })
    }

    /// Applies one recognizer event, returning the transcript to submit if this
    /// event carries the first result of the current listening session.
    pub fn apply(&mut self, event: VoiceEvent) -> Option<String> {
        match event {
            VoiceEvent::Started => {
                self.state = VoiceState::Listening;
                self.transcript_taken = false;
                None
            }
            VoiceEvent::Ended => {
                self.state = VoiceState::Idle;
                None
            }
            VoiceEvent::Error(message) => {
                tracing::warn!(error = %message, "speech recognition failed");
                self.state = VoiceState::Idle;
                None
            }
            VoiceEvent::Result(alternatives) => {
                if self.state != VoiceState::Listening || self.transcript_taken {
                    tracing::debug!("ignoring speech result outside of a fresh listening session");
                    return None;
                }

                self.transcript_taken = true;
                alternatives.into_iter().next()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionError;

    #[test]
    fn unsupported_voice_never_issues_commands() {
        let channel = VoiceChannel::new(false);
        assert!(matches!(
            channel.toggle(),
            Err(SessionError::VoiceUnsupported { .. })
        ));
        assert_eq!(channel.state(), VoiceState::Idle);
    }

    #[test]
    fn toggle_follows_listening_state() {
        let mut channel = VoiceChannel::new(true);
        assert_eq!(channel.toggle().unwrap(), VoiceCommand::Start);

        channel.apply(VoiceEvent::Started);
        assert!(channel.is_listening());
        assert_eq!(channel.toggle().unwrap(), VoiceCommand::Stop);

        channel.apply(VoiceEvent::Ended);
        assert_eq!(channel.toggle().unwrap(), VoiceCommand::Start);
    }

    #[test]
    fn only_first_candidate_of_first_result_is_taken() {
        let mut channel = VoiceChannel::new(true);
        channel.apply(VoiceEvent::Started);

        let transcript = channel.apply(VoiceEvent::Result(vec![
            "what is a fever".to_string(),
            "what is a beaver".to_string(),
        ]));
        assert_eq!(transcript.as_deref(), Some("what is a fever"));

        let second = channel.apply(VoiceEvent::Result(vec!["again".to_string()]));
        assert_eq!(second, None);

        channel.apply(VoiceEvent::Ended);
        channel.apply(VoiceEvent::Started);
        let next_session = channel.apply(VoiceEvent::Result(vec!["headache".to_string()]));
        assert_eq!(next_session.as_deref(), Some("headache"));
    }

    #[test]
    fn errors_return_to_idle_and_drop_late_results() {
        let mut channel = VoiceChannel::new(true);
        channel.apply(VoiceEvent::Started);
        channel.apply(VoiceEvent::Error("no-speech".to_string()));

        assert_eq!(channel.state(), VoiceState::Idle);
        assert_eq!(
            channel.apply(VoiceEvent::Result(vec!["late".to_string()])),
            None
        );
    }

    #[test]
    fn empty_result_consumes_the_session() {
        let mut channel = VoiceChannel::new(true);
        channel.apply(VoiceEvent::Started);
        assert_eq!(channel.apply(VoiceEvent::Result(Vec::new())), None);
        assert_eq!(
            channel.apply(VoiceEvent::Result(vec!["second".to_string()])),
            None
        );
    }

    #[test]
    fn settings_default_to_single_utterance_en_us() {
        let settings = RecognizerSettings::default();
        assert_eq!(settings.locale, "en-US");
        assert!(!settings.continuous);
        assert!(!settings.interim_results);
        assert_eq!(RecognizerSettings::for_locale("  ").locale, "en-US");
        assert_eq!(RecognizerSettings::for_locale("fr-FR").locale, "fr-FR");
    }
}
