//! Time-stamp recording service.
//!
//! Clients report a begin/finish pair for the current day and minute and
//! read back everything recorded for a given day. Stamps live in memory
//! behind [`state::StampStore`] and are persisted as a JSON snapshot by
//! [`persistence`] at startup and shutdown.

pub mod app;
pub mod config;
pub mod errors;
pub mod logging;
pub mod persistence;
pub mod routes;
pub mod server;
pub mod services;
pub mod state;

pub use app::build_app;
pub use config::AppConfig;
pub use errors::{Result, StampError};
pub use state::{AppState, StampContent, StampStore};
