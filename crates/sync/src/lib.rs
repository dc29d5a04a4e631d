//! Track state to presence synchronization
//!
//! The [`SyncController`] owns the current track and the connection status,
//! and turns every track change into one status update on the delivery channel.
//! The [`TrackWatcher`] feeds it from a polled [`qobuz_rpc_core::TrackSource`].

pub mod controller;
pub mod observable;
pub mod watcher;

pub use controller::*;
pub use observable::*;
pub use watcher::*;
