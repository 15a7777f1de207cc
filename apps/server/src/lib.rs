//! Courtside server library.
//!
//! REST backend for the Courtside social layer: a paginated, searchable user
//! directory plus the friendship state machine (requests, blocks, and
//! relationship status).

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod request_context;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
