#![deny(unsafe_code)]

//! MedAssist desktop client: a single-window chat with a medical assistant
//! server, built with GPUI and gpui-component.

/// Application shell: title bar, disclaimer footer and notifications.
pub mod app;
pub mod chat;
/// Settings loading, persistence and theme application.
pub mod settings;
