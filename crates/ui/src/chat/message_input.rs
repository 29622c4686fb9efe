use gpui::*;
use gpui_component::{
    ActiveTheme, Disableable, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    input::{Input, InputEvent, InputState},
    v_flex,
};

use crate::chat::events::{ComposerChanged, ImagePickClicked, Submit, VoiceToggleClicked};

pub const COMPOSER_PLACEHOLDER: &str = "Type your medical question...";

/// Composer box plus the send, voice and image controls.
pub struct MessageInput {
    input_state: Entity<InputState>,
    last_value: String,
    is_listening: bool,
    pending_newline: bool,
}

impl EventEmitter<Submit> for MessageInput {}
impl EventEmitter<ComposerChanged> for MessageInput {}
impl EventEmitter<VoiceToggleClicked> for MessageInput {}
impl EventEmitter<ImagePickClicked> for MessageInput {}

impl MessageInput {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let input_state = cx.new(|cx| {
            InputState::new(window, cx)
                .placeholder(COMPOSER_PLACEHOLDER)
                .auto_grow(1, 6)
        });

        cx.subscribe_in(
            &input_state,
            window,
            |this, _, event: &InputEvent, window, cx| match event {
                InputEvent::PressEnter { secondary } => {
                    if *secondary {
                        this.pending_newline = false;
                        return;
                    }

                    if this.pending_newline {
                        // Shift+Enter inserts the newline itself and still emits PressEnter.
                        this.pending_newline = false;
                    } else {
                        this.trim_trailing_newline(window, cx);
                        this.handle_submit(window, cx);
                    }
                }
                _ => this.sync_value(cx),
            },
        )
        .detach();

        Self {
            input_state,
            last_value: String::new(),
            is_listening: false,
            pending_newline: false,
        }
    }

    pub fn set_listening(&mut self, listening: bool, cx: &mut Context<Self>) {
        if self.is_listening != listening {
            self.is_listening = listening;
            cx.notify();
        }
    }

    pub fn clear(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            state.set_value("", window, cx);
        });
        self.pending_newline = false;
        self.sync_value(cx);
    }

    fn can_send(&self) -> bool {
        !self.last_value.trim().is_empty()
    }

    fn sync_value(&mut self, cx: &mut Context<Self>) {
        let value = self.input_state.read(cx).value().to_string();
        if value == self.last_value {
            return;
        }

        self.last_value = value.clone();
        cx.emit(ComposerChanged { text: value });
        cx.notify();
    }

    fn handle_shift_enter(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.pending_newline = true;
        self.input_state.update(cx, |state, cx| {
            state.insert("\n", window, cx);
        });
        cx.notify();
    }

    fn trim_trailing_newline(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            let value = state.value().to_string();
            if let Some(trimmed) = value.strip_suffix('\n') {
                state.set_value(trimmed.to_string(), window, cx);
            }
        });
    }

    fn handle_submit(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let content = self.input_state.read(cx).value().to_string();
        if content.trim().is_empty() {
            return;
        }

        cx.emit(Submit::new(content));
        self.clear(window, cx);
    }
}

impl Render for MessageInput {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let can_send = self.can_send();

        let voice = if self.is_listening {
            Button::new("voice")
                .small()
                .danger()
                .icon(IconName::CircleX)
                .child("Listening")
        } else {
            Button::new("voice").small().ghost().child("Voice")
        };

        v_flex()
            .bg(theme.background)
            .gap_2()
            .p_3()
            .child(
                div()
                    .w_full()
                    .px_3()
                    .py_2()
                    .rounded_lg()
                    .border_1()
                    .border_color(theme.border)
                    .bg(theme.background)
                    .on_key_down(cx.listener(|this, event: &KeyDownEvent, window, cx| {
                        if event.keystroke.key == "enter" && event.keystroke.modifiers.shift {
                            this.handle_shift_enter(window, cx);
                        }
                    }))
                    .child(Input::new(&self.input_state).w_full()),
            )
            .child(
                h_flex()
                    .w_full()
                    .gap_2()
                    .justify_end()
                    .child(
                        Button::new("send")
                            .small()
                            .primary()
                            .icon(IconName::ArrowUp)
                            .child("Send")
                            .disabled(!can_send)
                            .on_click(cx.listener(|this, _, window, cx| {
                                this.handle_submit(window, cx);
                            })),
                    )
                    .child(voice.on_click(cx.listener(|_, _, _window, cx| {
                        cx.emit(VoiceToggleClicked);
                    })))
                    .child(
                        Button::new("image")
                            .small()
                            .ghost()
                            .child("Image")
                            .on_click(cx.listener(|_, _, _window, cx| {
                                cx.emit(ImagePickClicked);
                            })),
                    ),
            )
    }
}
