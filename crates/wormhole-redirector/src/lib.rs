//! Redirector service library with caching support.
//!
//! This crate provides a [`RedirectorService`] that resolves short codes to
//! their original URLs and hands every successful resolve to the click
//! recorder. It uses the Repository decorator pattern to add transparent
//! in-memory (Moka) caching without touching the store.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wormhole_analytics::{ClickRecorder, RecorderConfig};
//! use wormhole_core::{ClickMeta, ShortCode};
//! use wormhole_redirector::{CachedRepository, MokaUrlCache, Redirector, RedirectorService};
//! use wormhole_storage::InMemoryRepository;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryRepository::new());
//! let recorder = ClickRecorder::spawn(store.clone(), RecorderConfig::default());
//!
//! // Create repository with Moka in-memory caching
//! let cached_repo = CachedRepository::new(store, MokaUrlCache::new());
//! let service = RedirectorService::new(cached_repo, recorder);
//!
//! let code = ShortCode::new("abc123")?;
//! match service.resolve(&code, ClickMeta::default()).await {
//!     Ok(url) => println!("Redirect to: {url}"),
//!     Err(e) => println!("No redirect: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod redirector;
pub mod repository;
pub mod service;

pub use cache::MokaUrlCache;
pub use error::{RedirectorError, Result};
pub use redirector::Redirector;
pub use repository::{CachedRepository, Invalidate};
pub use service::RedirectorService;
