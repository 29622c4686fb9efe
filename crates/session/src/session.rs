use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use medassist_backend::{Endpoint, ImageUpload};
use snafu::OptionExt;
use tokio::sync::mpsc;

use super::channel::{IMAGE_PLACEHOLDER, OutboundRequest, RequestId, RequestKind, TextSource};
use super::dispatch::RequestCompletion;
use super::error::{SessionResult, UnknownRequestSnafu};
use super::message::{MessageId, MessageStore, Sender};
use super::text::to_safe_text;
use super::voice::{
    RecognizerSettings, SpeechRecognizer, VoiceChannel, VoiceCommand, VoiceEvent,
    VoiceEventReceiver, VoiceEventSender, VoiceState,
};

/// Recognizer wiring kept next to the voice state machine.
struct VoiceBinding {
    recognizer: Arc<dyn SpeechRecognizer>,
    settings: RecognizerSettings,
    events: VoiceEventSender,
}

/// Conversation state for one window, mutated only through the methods below.
///
/// Every accepted channel action appends the user message and registers the
/// request as in flight before returning it, so the caller can only dispatch
/// requests the session already knows about. Busy is derived from the
/// in-flight set, which keeps it true until the last overlapping request
/// completes.
pub struct Session {
    messages: MessageStore,
    composing_text: String,
    in_flight: BTreeMap<RequestId, Endpoint>,
    next_request_id: u64,
    active_image_preview: Option<PathBuf>,
    voice: VoiceChannel,
    voice_binding: Option<VoiceBinding>,
}

impl Session {
    /// Creates an empty session without speech recognition.
    pub fn new() -> Self {
        Self {
            messages: MessageStore::new(),
            composing_text: String::new(),
            in_flight: BTreeMap::new(),
            next_request_id: 1,
            active_image_preview: None,
            voice: VoiceChannel::new(false),
            voice_binding: None,
        }
    }

    /// Creates an empty session whose voice channel drives `recognizer`.
    ///
    /// The returned receiver carries recognizer events; feed each one back
    /// through [`Session::apply_voice_event`].
    pub fn with_recognizer(
        recognizer: Arc<dyn SpeechRecognizer>,
        settings: RecognizerSettings,
    ) -> (Self, VoiceEventReceiver) {
        let (events, receiver) = mpsc::unbounded_channel();
        let mut session = Self::new();
        session.voice = VoiceChannel::new(true);
        session.voice_binding = Some(VoiceBinding {
            recognizer,
            settings,
            events,
        });
        (session, receiver)
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn composing_text(&self) -> &str {
        &self.composing_text
    }

    pub fn set_composing_text(&mut self, text: impl Into<String>) {
        self.composing_text = text.into();
    }

    /// True when the composer holds something worth sending.
    pub fn can_send_composer(&self) -> bool {
        !self.composing_text.trim().is_empty()
    }

    pub fn is_busy(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Number of dispatched requests still awaiting completion.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn active_image_preview(&self) -> Option<&Path> {
        self.active_image_preview.as_deref()
    }

    pub fn voice_state(&self) -> VoiceState {
        self.voice.state()
    }

    pub fn voice_supported(&self) -> bool {
        self.voice.is_supported()
    }

    /// Text channel submit.
    ///
    /// Returns `None` without touching state when the override is structural or
    /// the coerced text is blank.
    pub fn submit_text(&mut self, source: TextSource) -> Option<OutboundRequest> {
        let from_composer = matches!(source, TextSource::Composer);
        let text = match source {
            TextSource::Composer => self.composing_text.clone(),
            TextSource::Override(raw) => {
                if raw.is_structural() {
                    tracing::debug!("ignoring structured text submission");
                    return None;
                }
                to_safe_text(raw)
            }
        };

        if text.trim().is_empty() {
            tracing::debug!(from_composer, "ignoring blank text submission");
            return None;
        }

        self.messages.append(Sender::User, text.as_str());
        if from_composer {
            self.composing_text.clear();
        }

        Some(self.begin_request(RequestKind::Chat { text }))
    }

    /// Image channel submit: previews the file, appends the placeholder user
    /// message and returns the vision request with an empty question.
    pub fn submit_image(
        &mut self,
        image: ImageUpload,
        preview: impl Into<PathBuf>,
    ) -> OutboundRequest {
        self.active_image_preview = Some(preview.into());
        self.messages.append(Sender::User, IMAGE_PLACEHOLDER);

        self.begin_request(RequestKind::Vision {
            image,
            question: String::new(),
        })
    }

    /// Applies a finished request: appends its bot message, then releases it.
    pub fn complete(&mut self, completion: RequestCompletion) -> SessionResult<MessageId> {
        self.in_flight
            .get(&completion.id)
            .context(UnknownRequestSnafu {
                stage: "complete-request",
                id: completion.id,
            })?;

        let message_id = self.messages.append(Sender::Bot, completion.bot_text());
        self.in_flight.remove(&completion.id);

        tracing::debug!(
            request_id = %completion.id,
            endpoint = %completion.endpoint,
            remaining = self.in_flight.len(),
            "request settled"
        );
        Ok(message_id)
    }

    /// Voice button. Starts or stops the recognizer; listening state itself only
    /// changes when the recognizer reports back.
    pub fn toggle_voice(&mut self) -> SessionResult<VoiceCommand> {
        let command = self.voice.toggle()?;
        let Some(binding) = self.voice_binding.as_ref() else {
            // `VoiceChannel::toggle` already refuses when no recognizer is bound.
            return Ok(command);
        };

        match command {
            VoiceCommand::Start => binding
                .recognizer
                .start(&binding.settings, binding.events.clone())?,
            VoiceCommand::Stop => binding.recognizer.stop(),
        }

        tracing::debug!(?command, "voice toggled");
        Ok(command)
    }

    /// Feeds a recognizer event into the voice state machine. A fresh transcript
    /// is submitted through the text channel as an override.
    pub fn apply_voice_event(&mut self, event: VoiceEvent) -> Option<OutboundRequest> {
        let transcript = self.voice.apply(event)?;
        self.submit_text(TextSource::transcript(transcript))
    }

    fn begin_request(&mut self, kind: RequestKind) -> OutboundRequest {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id = self.next_request_id.saturating_add(1);
        self.in_flight.insert(id, kind.endpoint());

        tracing::debug!(request_id = %id, endpoint = %kind.endpoint(), "request registered");
        OutboundRequest { id, kind }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
