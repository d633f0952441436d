use jiff::Timestamp;
use serde::Serialize;
use wormhole_core::{ClickEvent, ReferrerCount, Stats};

#[derive(Debug, Serialize)]
pub struct ReferrerView {
    pub referrer: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct ClickView {
    pub timestamp: Timestamp,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub client_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub short_code: String,
    pub original_url: String,
    pub clicks: u64,
    pub created_at: Timestamp,
    pub last_click_at: Option<Timestamp>,
    pub top_referrers: Vec<ReferrerView>,
    pub recent_clicks: Vec<ClickView>,
}

impl From<ReferrerCount> for ReferrerView {
    fn from(value: ReferrerCount) -> Self {
        Self {
            referrer: value.referrer,
            count: value.count,
        }
    }
}

impl From<ClickEvent> for ClickView {
    fn from(value: ClickEvent) -> Self {
        Self {
            timestamp: value.timestamp,
            referrer: value.referrer,
            user_agent: value.user_agent,
            client_address: value.client_address,
        }
    }
}

impl From<Stats> for StatsResponse {
    fn from(stats: Stats) -> Self {
        Self {
            short_code: stats.short_code.to_string(),
            original_url: stats.original_url,
            clicks: stats.clicks,
            created_at: stats.created_at,
            last_click_at: stats.last_click_at,
            top_referrers: stats.top_referrers.into_iter().map(Into::into).collect(),
            recent_clicks: stats.recent_clicks.into_iter().map(Into::into).collect(),
        }
    }
}
