//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use crate::config::Config;
use crate::web::token::TokenCodec;
use dtai_core::assistant::Assistant;
use dtai_core::ports::{ChatService, DirectoryService, HelpDeskService};

/// The shared application state, created once at startup and passed to all
/// handlers. Every dependency is an explicitly injected handle; there are no
/// module-level singletons.
pub struct AppState {
    pub directory: Arc<dyn DirectoryService>,
    pub chat: Arc<dyn ChatService>,
    pub help_desk: Arc<dyn HelpDeskService>,
    pub assistant: Assistant,
    pub tokens: TokenCodec,
    pub config: Arc<Config>,
}
