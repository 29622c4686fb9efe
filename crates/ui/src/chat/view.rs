use std::path::PathBuf;
use std::sync::Arc;

use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{ActiveTheme, v_flex};
use gpui_tokio_bridge::Tokio;
use medassist_backend::{
    BackendResult, ChatBackend, ImageUpload, create_backend, image_mime_type,
};
use medassist_session::{
    OutboundRequest, RequestCompletion, Session, SpeechRecognizer, TextSource, VoiceEvent,
    VoiceEventReceiver, VoiceState, dispatch,
};

use crate::chat::events::{
    AlertRaised, ComposerChanged, ImagePickClicked, Submit, VoiceToggleClicked,
};
use crate::chat::{MessageInput, MessageList};
use crate::settings::AppSettings;

pub const BACKEND_UNAVAILABLE: &str = "Chat server is not configured.";
pub const NOT_AN_IMAGE: &str = "Please choose an image file.";
pub const IMAGE_PREVIEW_MAX_HEIGHT: Pixels = px(100.);

/// Owns the conversation session and wires the composer, voice and image
/// channels to the backend.
pub struct ChatView {
    message_list: Entity<MessageList>,
    message_input: Entity<MessageInput>,
    session: Session,
    backend: Option<Arc<dyn ChatBackend>>,
    _voice_task: Option<Task<()>>,
    _image_pick_task: Option<Task<()>>,
}

impl EventEmitter<AlertRaised> for ChatView {}

impl ChatView {
    pub fn new(
        settings: &AppSettings,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let message_list = cx.new(MessageList::new);
        let message_input = cx.new(|cx| MessageInput::new(window, cx));

        let backend = match create_backend(settings.backend_config()) {
            Ok(backend) => Some(backend),
            Err(error) => {
                tracing::error!(%error, "failed to initialize chat backend");
                None
            }
        };

        let (session, voice_events) = match recognizer {
            Some(recognizer) => {
                let (session, events) =
                    Session::with_recognizer(recognizer, settings.recognizer_settings());
                (session, Some(events))
            }
            None => (Session::new(), None),
        };

        let mut this = Self {
            message_list: message_list.clone(),
            message_input: message_input.clone(),
            session,
            backend,
            _voice_task: None,
            _image_pick_task: None,
        };

        if let Some(events) = voice_events {
            this.spawn_voice_listener(events, cx);
        }

        cx.subscribe(&message_input, |this, _, event: &Submit, cx| {
            this.handle_submit(event.content.clone(), cx);
        })
        .detach();

        cx.subscribe(&message_input, |this, _, event: &ComposerChanged, _cx| {
            this.session.set_composing_text(event.text.clone());
        })
        .detach();

        cx.subscribe(&message_input, |this, _, _event: &VoiceToggleClicked, cx| {
            this.handle_voice_toggle(cx);
        })
        .detach();

        cx.subscribe(&message_input, |this, _, _event: &ImagePickClicked, cx| {
            this.pick_image(cx);
        })
        .detach();

        this
    }

    fn handle_submit(&mut self, content: String, cx: &mut Context<Self>) {
        self.session.set_composing_text(content);
        let Some(request) = self.session.submit_text(TextSource::Composer) else {
            return;
        };

        self.dispatch_request(request, cx);
    }

    fn dispatch_request(&mut self, request: OutboundRequest, cx: &mut Context<Self>) {
        let request_id = request.id;
        let endpoint = request.endpoint();

        let Some(backend) = self.backend.clone() else {
            self.finish_request(
                RequestCompletion::failed(request_id, endpoint, BACKEND_UNAVAILABLE),
                cx,
            );
            return;
        };

        tracing::info!(request_id = %request_id, %endpoint, "dispatching request");
        let worker = Tokio::spawn(cx, dispatch(backend, request));

        // Each request settles on its own; overlapping requests are not queued.
        cx.spawn(async move |this, cx| {
            let completion = match worker.await {
                Ok(completion) => completion,
                Err(error) => {
                    tracing::error!(request_id = %request_id, %error, "request worker stopped");
                    RequestCompletion::failed(request_id, endpoint, error.to_string())
                }
            };

            let _ = this.update(cx, |this, cx| {
                this.finish_request(completion, cx);
            });
        })
        .detach();

        self.sync_view(cx);
    }

    fn finish_request(&mut self, completion: RequestCompletion, cx: &mut Context<Self>) {
        if let Err(error) = self.session.complete(completion) {
            tracing::warn!(%error, "dropping completion");
        }

        self.sync_view(cx);
    }

    fn handle_voice_toggle(&mut self, cx: &mut Context<Self>) {
        if let Err(error) = self.session.toggle_voice() {
            tracing::warn!(%error, "voice toggle refused");
            cx.emit(AlertRaised::new(error.to_string()));
        }
    }

    fn spawn_voice_listener(&mut self, mut events: VoiceEventReceiver, cx: &mut Context<Self>) {
        self._voice_task = Some(cx.spawn(async move |this, cx| {
            while let Some(event) = events.recv().await {
                let applied = this.update(cx, |this, cx| {
                    this.handle_voice_event(event, cx);
                });
                if applied.is_err() {
                    break;
                }
            }
        }));
    }

    fn handle_voice_event(&mut self, event: VoiceEvent, cx: &mut Context<Self>) {
        if let Some(request) = self.session.apply_voice_event(event) {
            self.dispatch_request(request, cx);
            return;
        }

        self.sync_view(cx);
    }

    fn pick_image(&mut self, cx: &mut Context<Self>) {
        let paths = cx.prompt_for_paths(PathPromptOptions {
            files: true,
            directories: false,
            multiple: false,
            prompt: None,
        });

        self._image_pick_task = Some(cx.spawn(async move |this, cx| {
            let selected = match paths.await {
                Ok(Ok(Some(paths))) => paths.into_iter().next(),
                Ok(Ok(None)) | Err(_) => None,
                Ok(Err(error)) => {
                    tracing::warn!(%error, "image picker failed");
                    None
                }
            };

            let Some(path) = selected else {
                return;
            };

            let _ = this.update(cx, |this, cx| {
                this.load_image(path, cx);
            });
        }));
    }

    fn load_image(&mut self, path: PathBuf, cx: &mut Context<Self>) {
        if image_mime_type(&path).is_none() {
            tracing::info!(path = ?path, "refusing non-image file");
            cx.emit(AlertRaised::new(NOT_AN_IMAGE));
            return;
        }

        let read_path = path.clone();
        let read = Tokio::spawn(cx, async move { ImageUpload::read(&read_path).await });

        // Each pick is read to completion; a later pick does not cancel an earlier one.
        cx.spawn(async move |this, cx| {
            let result = match read.await {
                Ok(result) => result,
                Err(error) => {
                    tracing::error!(%error, "image read worker stopped");
                    return;
                }
            };

            let _ = this.update(cx, |this, cx| {
                this.submit_image(result, path, cx);
            });
        })
        .detach();
    }

    fn submit_image(
        &mut self,
        result: BackendResult<ImageUpload>,
        path: PathBuf,
        cx: &mut Context<Self>,
    ) {
        match result {
            Ok(image) => {
                let request = self.session.submit_image(image, path);
                self.dispatch_request(request, cx);
            }
            Err(error) => {
                tracing::warn!(%error, "failed to read image");
                cx.emit(AlertRaised::new(error.to_string()));
            }
        }
    }

    fn sync_view(&mut self, cx: &mut Context<Self>) {
        let store = self.session.messages();
        let messages = store.messages().to_vec();
        let revision = store.revision();
        let busy = self.session.is_busy();
        let listening = self.session.voice_state() == VoiceState::Listening;

        self.message_list.update(cx, |list, cx| {
            list.set_messages(messages, revision, busy, cx);
        });
        self.message_input.update(cx, |input, cx| {
            input.set_listening(listening, cx);
        });
        cx.notify();
    }
}

impl Render for ChatView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let preview = self.session.active_image_preview().map(|path| path.to_path_buf());

        v_flex()
            .id("chat-view")
            .relative()
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(theme.background)
            .child(
                div()
                    .id("chat-view-message-list")
                    .flex_1()
                    .min_h_0()
                    .child(self.message_list.clone()),
            )
            .child(
                div()
                    .id("chat-view-message-input")
                    .flex_shrink_0()
                    .w_full()
                    .border_t_1()
                    .border_color(theme.border)
                    .child(self.message_input.clone()),
            )
            .when_some(preview, |view, path| {
                view.child(
                    div()
                        .id("chat-view-image-preview")
                        .flex_shrink_0()
                        .px_3()
                        .pb_3()
                        .child(img(path).max_h(IMAGE_PREVIEW_MAX_HEIGHT).rounded_md()),
                )
            })
    }
}
