use crate::repository::UrlRecord;
use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored mapping from a short code to its original URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub short_code: ShortCode,
    pub original_url: String,
    pub created_at: Timestamp,
    /// When the link stops resolving, if ever.
    pub expire_at: Option<Timestamp>,
    /// Only ever increased by the click-recording path.
    pub click_count: u64,
    pub last_click_at: Option<Timestamp>,
}

impl Link {
    /// Builds the record a store returns right after a successful create.
    pub fn from_new(short_code: ShortCode, new: NewLink) -> Self {
        Self {
            short_code,
            original_url: new.original_url,
            created_at: new.created_at,
            expire_at: new.expire_at,
            click_count: 0,
            last_click_at: None,
        }
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expire_at.is_some_and(|expire_at| now >= expire_at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Timestamp::now())
    }
}

impl From<Link> for UrlRecord {
    fn from(link: Link) -> Self {
        UrlRecord {
            original_url: link.original_url,
            created_at: link.created_at,
            expire_at: link.expire_at,
        }
    }
}

/// The immutable part of a link, as handed to `Repository::create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub original_url: String,
    pub created_at: Timestamp,
    pub expire_at: Option<Timestamp>,
}

/// Request metadata captured for a click.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickMeta {
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub client_address: Option<String>,
}

/// One immutable record of a single redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub short_code: ShortCode,
    pub timestamp: Timestamp,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub client_address: Option<String>,
}

impl ClickEvent {
    pub fn new(short_code: ShortCode, timestamp: Timestamp, meta: ClickMeta) -> Self {
        Self {
            short_code,
            timestamp,
            referrer: meta.referrer,
            user_agent: meta.user_agent,
            client_address: meta.client_address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerCount {
    pub referrer: String,
    pub count: u64,
}

/// Aggregated analytics for one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub short_code: ShortCode,
    pub original_url: String,
    pub clicks: u64,
    pub created_at: Timestamp,
    pub last_click_at: Option<Timestamp>,
    /// Most frequent referrers first.
    pub top_referrers: Vec<ReferrerCount>,
    /// Newest first.
    pub recent_clicks: Vec<ClickEvent>,
}
