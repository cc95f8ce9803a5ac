// Submodules
mod api;
pub mod routes;
pub mod runtime;

// Public API (what main.rs imports)
pub use api::{start_share_server, ShareRequest};
pub use runtime::{run_session, shutdown_signal, SessionEnd};
