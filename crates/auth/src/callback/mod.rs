/// Local OAuth redirect listener
///
/// Receives the browser redirect from Discord and hands the one-time
/// authorization code to whoever is waiting on the server.

pub mod routes;
pub mod server;

pub use server::CallbackServer;
