//! Click analytics for Wormhole.
//!
//! Redirects hand a [`ClickEvent`](wormhole_core::ClickEvent) to the
//! [`ClickRecorder`], which persists it in the background and later answers
//! aggregate [`Stats`](wormhole_core::Stats) queries.

pub mod recorder;

pub use recorder::{ClickRecorder, RecorderConfig, DEFAULT_RECENT_CLICKS, DEFAULT_TOP_REFERRERS};
