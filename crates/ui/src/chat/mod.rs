/// Event contracts between the composer, chat view and shell.
pub mod events;
pub mod message_input;
pub mod message_list;
pub mod scroll_manager;
pub mod view;

pub use events::{AlertRaised, ComposerChanged, ImagePickClicked, Submit, VoiceToggleClicked};
pub use message_input::MessageInput;
pub use message_list::MessageList;
pub use scroll_manager::ScrollManager;
pub use view::ChatView;
