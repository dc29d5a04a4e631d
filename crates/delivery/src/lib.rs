//! HTTP collaborators of the sync pipeline
//!
//! - [`HttpDeliveryChannel`]: posts status updates to the presence API
//! - [`ArtworkLookup`]: fills in cover art and duration for title-only tracks

pub mod artwork;
pub mod http;

pub use artwork::*;
pub use http::*;
