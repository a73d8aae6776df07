//! Event console backend: events, their advance ledger and advance notices.

pub mod backend;

pub use backend::config::ServerConfig;
pub use backend::{build_state, create_router, initialize_backend, AppState};
