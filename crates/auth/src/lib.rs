//! Discord OAuth login for the presence client
//!
//! The browser is sent to Discord's authorize page, Discord redirects back to a
//! local callback listener with a one-time `code`, and the code is exchanged
//! for the access token the status API expects.

pub mod bootstrap;
pub mod callback;
pub mod client;

pub use bootstrap::*;
pub use callback::CallbackServer;
pub use client::*;
