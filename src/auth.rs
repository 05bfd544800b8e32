//! Credential models and the token store that persists them.

pub mod secret;
pub mod tokens;

pub use secret::*;
pub use tokens::*;
