//! Link store backends.
//!
//! [`InMemoryRepository`] keeps everything in sharded maps and is the default
//! for tests and single-node runs. [`MySqlRepository`] persists links and
//! click events in MySQL. Either can be wrapped in [`BoundedRepository`] to
//! put a deadline and a retry budget on every call.

pub mod bounded;
pub mod memory;
pub mod mysql;

pub use bounded::{BoundedRepository, RetryPolicy};
pub use memory::InMemoryRepository;
pub use mysql::{MySqlRepository, MySqlSettings};
pub use wormhole_core::{ClickLog, ReadRepository, Repository, StorageError};
