//! URL shortener service implementation.
//!
//! This crate turns shorten requests into stored links: it validates the
//! target URL, picks a short code (custom alias or generated), and claims it
//! through the store's atomic create. Core types are re-exported from
//! `wormhole_core`.

pub mod config;
pub mod resume;
pub mod service;
pub mod validate;

pub use config::ShortenerConfig;
pub use resume::resume_sequence;
pub use service::ShortenerService;
pub use wormhole_core::{ShortenParams, Shortener, ShortenerError};
