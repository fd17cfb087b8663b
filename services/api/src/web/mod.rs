pub mod auth;
pub mod chat;
pub mod help;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod student;
pub mod token;

// Re-export the pieces the binary needs to assemble the router.
pub use middleware::{require_auth, require_staff, require_student};
pub use rest::{list_programs_handler, ApiDoc};
pub use state::AppState;
pub use token::TokenCodec;
