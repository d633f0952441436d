use std::sync::Arc;

use wormhole_analytics::ClickRecorder;
use wormhole_core::Shortener;
use wormhole_redirector::Redirector;

#[derive(Clone)]
pub struct AppState {
    pub(crate) shortener: Arc<dyn Shortener>,
    pub(crate) redirector: Arc<dyn Redirector>,
    pub(crate) recorder: ClickRecorder,
    base_url: String,
}

impl AppState {
    pub fn new(
        shortener: Arc<dyn Shortener>,
        redirector: Arc<dyn Redirector>,
        recorder: ClickRecorder,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            shortener,
            redirector,
            recorder,
            base_url: public_base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
