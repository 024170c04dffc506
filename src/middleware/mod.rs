pub mod auth;

pub use auth::{authenticate, require_token, require_token_plain};
