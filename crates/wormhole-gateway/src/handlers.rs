mod health;
mod link;
mod redirect;
mod stats;

pub use health::health_handler;
pub use link::{create_url_handler, delete_url_handler};
pub use redirect::redirect_handler;
pub use stats::stats_handler;

use crate::error::AppError;
use wormhole_core::{ShortCode, StorageError};

/// Path segments that cannot be a short code resolve to nothing.
fn parse_code(raw: String) -> Result<ShortCode, AppError> {
    ShortCode::new(raw.as_str()).map_err(|_| AppError::Storage(StorageError::NotFound(raw)))
}
