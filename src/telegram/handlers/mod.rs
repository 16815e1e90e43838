//! Telegram bot handler tree configuration
//!
//! The dispatcher schema wires teloxide updates to handler bodies that only
//! depend on [`ChatTransport`](crate::telegram::transport::ChatTransport), so
//! integration tests can drive the same code as production.

mod commands;
mod schema;
mod types;

pub use commands::{
    handle_command, handle_text_message, handle_web_app_data, route_text, run_delivery, TextAction, NO_LINK_TEXT,
};
pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
