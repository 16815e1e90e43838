//! Telegram bot integration and handlers

pub mod bot;
pub mod handlers;
pub mod progress;
pub mod transport;
pub mod videos;
pub mod webapp;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use transport::{upload_error, ChatTransport, VideoPayload};
pub use videos::{deliver_video, FAILURE_TEXT, PLACEHOLDER_TEXT, VIDEO_CAPTION};
pub use webapp::{WebAppError, WebAppRequest};
