//! Core types and traits for the Wormhole URL shortener.
//!
//! This crate provides shared types and traits used by the shortener,
//! redirector and analytics services, and by every storage backend.

pub mod cache;
pub mod clicks;
pub mod error;
pub mod link;
pub mod repository;
pub mod shortcode;
pub mod shortener;

pub use cache::UrlCache;
pub use clicks::{ClickLog, LinkStore};
pub use error::{CacheError, CoreError, ShortenerError, StorageError};
pub use link::{ClickEvent, ClickMeta, Link, NewLink, ReferrerCount, Stats};
pub use repository::{ReadRepository, Repository, UrlRecord};
pub use shortcode::ShortCode;
pub use shortener::{CodeReusePolicy, ExpirationPolicy, ShortenParams, Shortener};
