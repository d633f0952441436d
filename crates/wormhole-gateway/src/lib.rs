//! HTTP front door for Wormhole.
//!
//! Exposes link creation, redirects, per-link stats and deletion over axum.
//! The binary in `bin/http` wires concrete stores and services into
//! [`AppState`] and serves [`App::router`].

pub mod app;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use error::{AppError, Result};
pub use state::AppState;
