use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use std::collections::HashMap;
use wormhole_core::error::{Result, StorageError};
use wormhole_core::{
    ClickEvent, ClickLog, CodeReusePolicy, Link, NewLink, ReadRepository, ReferrerCount,
    Repository, ShortCode,
};

/// What a code currently maps to.
#[derive(Debug, Clone)]
enum Slot {
    Live(Link),
    /// Deleted under [`CodeReusePolicy::Retire`]; the code stays taken.
    Retired,
}

/// In-memory implementation of the store traits using DashMap.
///
/// DashMap provides better concurrency than RwLock<HashMap> because it
/// uses sharded locks, allowing concurrent reads and writes to different
/// buckets without blocking. The entry API gives insert-if-absent, and
/// `get_mut` holds the shard write lock across a click increment.
#[derive(Debug)]
pub struct InMemoryRepository {
    links: DashMap<String, Slot>,
    clicks: DashMap<String, Vec<ClickEvent>>,
    policy: CodeReusePolicy,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository that frees codes on delete.
    pub fn new() -> Self {
        Self::with_policy(CodeReusePolicy::default())
    }

    pub fn with_policy(policy: CodeReusePolicy) -> Self {
        Self {
            links: DashMap::new(),
            clicks: DashMap::new(),
            policy,
        }
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize, policy: CodeReusePolicy) -> Self {
        Self {
            links: DashMap::with_capacity(capacity),
            clicks: DashMap::with_capacity(capacity),
            policy,
        }
    }

    pub fn policy(&self) -> CodeReusePolicy {
        self.policy
    }

    /// Number of codes held, retired ones included.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(code: &ShortCode) -> StorageError {
    StorageError::NotFound(code.to_string())
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn lookup(&self, code: &ShortCode) -> Result<Link> {
        let Some(slot) = self.links.get(code.as_str()) else {
            return Err(not_found(code));
        };

        match slot.value() {
            Slot::Live(link) if !link.is_expired() => Ok(link.clone()),
            _ => Err(not_found(code)),
        }
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let Some(slot) = self.links.get(code.as_str()) else {
            return Ok(false);
        };

        Ok(match slot.value() {
            Slot::Live(link) => !link.is_expired(),
            Slot::Retired => true,
        })
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create(&self, code: &ShortCode, new: NewLink) -> Result<Link> {
        let link = Link::from_new(code.clone(), new);

        let _slot = match self.links.entry(code.as_str().to_owned()) {
            Entry::Vacant(vacant) => vacant.insert(Slot::Live(link.clone())),
            Entry::Occupied(mut occupied) => {
                // An expired link gives its code back; anything else keeps it.
                let reclaimable = matches!(occupied.get(), Slot::Live(old) if old.is_expired());
                if !reclaimable {
                    return Err(StorageError::DuplicateCode(code.to_string()));
                }
                occupied.insert(Slot::Live(link.clone()));
                occupied.into_ref()
            }
        };
        // A new link starts with an empty history whoever held the code before.
        // The link's shard stays locked so a concurrent append waits on it.
        self.clicks.remove(code.as_str());

        Ok(link)
    }

    async fn increment_click(&self, code: &ShortCode, at: Timestamp) -> Result<()> {
        let mut slot = self
            .links
            .get_mut(code.as_str())
            .ok_or_else(|| not_found(code))?;

        match slot.value_mut() {
            // A click resolved just before expiry still counts.
            Slot::Live(link) => {
                link.click_count += 1;
                link.last_click_at = Some(link.last_click_at.map_or(at, |last| last.max(at)));
                Ok(())
            }
            Slot::Retired => Err(not_found(code)),
        }
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        match self.policy {
            CodeReusePolicy::Reuse => {
                self.links
                    .remove_if(code.as_str(), |_, slot| matches!(slot, Slot::Live(_)))
                    .ok_or_else(|| not_found(code))?;
                self.clicks.remove(code.as_str());
            }
            CodeReusePolicy::Retire => {
                let mut slot = self
                    .links
                    .get_mut(code.as_str())
                    .ok_or_else(|| not_found(code))?;
                if matches!(*slot, Slot::Retired) {
                    return Err(not_found(code));
                }
                *slot = Slot::Retired;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ClickLog for InMemoryRepository {
    /// Events are kept only for a live link created no later than the click.
    /// The link's shard lock is held while the event is stored, so a
    /// concurrent delete either sees the event or prevents it.
    async fn append(&self, events: Vec<ClickEvent>) -> Result<()> {
        for event in events {
            let Some(slot) = self.links.get(event.short_code.as_str()) else {
                continue;
            };
            match slot.value() {
                Slot::Live(link) if link.created_at <= event.timestamp => {}
                _ => continue,
            }

            self.clicks
                .entry(event.short_code.as_str().to_owned())
                .or_default()
                .push(event);
        }
        Ok(())
    }

    async fn recent(&self, code: &ShortCode, limit: usize) -> Result<Vec<ClickEvent>> {
        Ok(self
            .clicks
            .get(code.as_str())
            .map(|events| events.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn top_referrers(&self, code: &ShortCode, limit: usize) -> Result<Vec<ReferrerCount>> {
        let Some(events) = self.clicks.get(code.as_str()) else {
            return Ok(Vec::new());
        };

        let mut counts: HashMap<&str, u64> = HashMap::new();
        for referrer in events.iter().filter_map(|e| e.referrer.as_deref()) {
            *counts.entry(referrer).or_insert(0) += 1;
        }

        let mut ranked: Vec<ReferrerCount> = counts
            .into_iter()
            .map(|(referrer, count)| ReferrerCount {
                referrer: referrer.to_owned(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.referrer.cmp(&b.referrer)));
        ranked.truncate(limit);

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use std::sync::Arc;
    use wormhole_core::ClickMeta;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn new_link(url: &str, expire_at: Option<Timestamp>) -> NewLink {
        NewLink {
            original_url: url.to_string(),
            created_at: Timestamp::now(),
            expire_at,
        }
    }

    fn click(c: &str, referrer: Option<&str>) -> ClickEvent {
        ClickEvent::new(
            code(c),
            Timestamp::now(),
            ClickMeta {
                referrer: referrer.map(str::to_string),
                ..ClickMeta::default()
            },
        )
    }

    #[tokio::test]
    async fn create_and_lookup() {
        let repo = InMemoryRepository::new();

        let created = repo
            .create(&code("abc123"), new_link("https://example.com", None))
            .await
            .unwrap();
        assert_eq!(created.click_count, 0);

        let found = repo.lookup(&code("abc123")).await.unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn lookup_nonexistent() {
        let repo = InMemoryRepository::new();

        let err = repo.lookup(&code("nope")).await.unwrap_err();
        assert_eq!(err, StorageError::NotFound("nope".into()));
        assert_eq!(repo.get(&code("nope")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn create_conflict() {
        let repo = InMemoryRepository::new();

        repo.create(&code("abc123"), new_link("https://example.com", None))
            .await
            .unwrap();

        let err = repo
            .create(&code("abc123"), new_link("https://other.com", None))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::DuplicateCode(_)));
        let kept = repo.lookup(&code("abc123")).await.unwrap();
        assert_eq!(kept.original_url, "https://example.com");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_creates_of_one_code_admit_exactly_one() {
        let repo = Arc::new(InMemoryRepository::new());

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    repo.create(&code("proj"), new_link(&format!("https://e{i}.com"), None))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, StorageError::DuplicateCode(_))),
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn create_over_expired_entry() {
        let repo = InMemoryRepository::new();
        let expired = Timestamp::now() - SignedDuration::from_secs(1);

        repo.create(&code("abc123"), new_link("https://old.com", Some(expired)))
            .await
            .unwrap();
        repo.increment_click(&code("abc123"), Timestamp::now())
            .await
            .unwrap();
        repo.append(vec![click("abc123", Some("old"))]).await.unwrap();

        // Should succeed because the existing entry is expired.
        let link = repo
            .create(&code("abc123"), new_link("https://new.com", None))
            .await
            .unwrap();
        assert_eq!(link.click_count, 0);

        let result = repo.lookup(&code("abc123")).await.unwrap();
        assert_eq!(result.original_url, "https://new.com");
        assert!(repo.recent(&code("abc123"), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_entry_is_not_found() {
        let repo = InMemoryRepository::new();
        let expired = Timestamp::now() - SignedDuration::from_secs(1);

        repo.create(&code("abc123"), new_link("https://example.com", Some(expired)))
            .await
            .unwrap();

        assert!(matches!(
            repo.lookup(&code("abc123")).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(!repo.exists(&code("abc123")).await.unwrap());
    }

    #[tokio::test]
    async fn not_expired_entry() {
        let repo = InMemoryRepository::new();
        let future = Timestamp::now() + SignedDuration::from_hours(1);

        repo.create(&code("abc123"), new_link("https://example.com", Some(future)))
            .await
            .unwrap();

        let result = repo.lookup(&code("abc123")).await.unwrap();
        assert_eq!(result.original_url, "https://example.com");
    }

    #[tokio::test]
    async fn increment_updates_count_and_last_click() {
        let repo = InMemoryRepository::new();
        repo.create(&code("abc123"), new_link("https://example.com", None))
            .await
            .unwrap();

        let first = Timestamp::now();
        let second = first + SignedDuration::from_secs(5);
        repo.increment_click(&code("abc123"), second).await.unwrap();
        repo.increment_click(&code("abc123"), first).await.unwrap();

        let link = repo.lookup(&code("abc123")).await.unwrap();
        assert_eq!(link.click_count, 2);
        assert_eq!(link.last_click_at, Some(second));
    }

    #[tokio::test]
    async fn increment_unknown_code_is_not_found() {
        let repo = InMemoryRepository::new();

        let err = repo
            .increment_click(&code("nope"), Timestamp::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_increments_are_not_lost() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.create(&code("hot"), new_link("https://example.com", None))
            .await
            .unwrap();

        let handles: Vec<_> = (0..1000)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    repo.increment_click(&code("hot"), Timestamp::now())
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(repo.lookup(&code("hot")).await.unwrap().click_count, 1000);
    }

    #[tokio::test]
    async fn delete_then_lookup_is_not_found() {
        let repo = InMemoryRepository::new();

        repo.create(&code("abc123"), new_link("https://example.com", None))
            .await
            .unwrap();

        repo.delete(&code("abc123")).await.unwrap();
        assert!(matches!(
            repo.lookup(&code("abc123")).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_nonexistent() {
        let repo = InMemoryRepository::new();

        assert!(matches!(
            repo.delete(&code("nope")).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn reuse_policy_frees_code_and_history() {
        let repo = InMemoryRepository::with_policy(CodeReusePolicy::Reuse);
        repo.create(&code("abc123"), new_link("https://old.com", None))
            .await
            .unwrap();
        repo.append(vec![click("abc123", None)]).await.unwrap();

        repo.delete(&code("abc123")).await.unwrap();
        assert!(!repo.exists(&code("abc123")).await.unwrap());
        assert!(repo.recent(&code("abc123"), 10).await.unwrap().is_empty());

        repo.create(&code("abc123"), new_link("https://new.com", None))
            .await
            .unwrap();
        assert_eq!(
            repo.lookup(&code("abc123")).await.unwrap().original_url,
            "https://new.com"
        );
    }

    #[tokio::test]
    async fn retire_policy_keeps_code_taken() {
        let repo = InMemoryRepository::with_policy(CodeReusePolicy::Retire);
        repo.create(&code("abc123"), new_link("https://old.com", None))
            .await
            .unwrap();

        repo.delete(&code("abc123")).await.unwrap();

        assert!(repo.exists(&code("abc123")).await.unwrap());
        assert!(matches!(
            repo.lookup(&code("abc123")).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            repo.create(&code("abc123"), new_link("https://new.com", None))
                .await,
            Err(StorageError::DuplicateCode(_))
        ));
        assert!(matches!(
            repo.delete(&code("abc123")).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            repo.increment_click(&code("abc123"), Timestamp::now()).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_limited() {
        let repo = InMemoryRepository::new();
        repo.create(&code("abc123"), new_link("https://example.com", None))
            .await
            .unwrap();
        let events: Vec<_> = (0..5)
            .map(|i| click("abc123", Some(&format!("r{i}"))))
            .collect();
        repo.append(events).await.unwrap();

        let recent = repo.recent(&code("abc123"), 3).await.unwrap();
        let referrers: Vec<_> = recent.iter().map(|e| e.referrer.as_deref()).collect();
        assert_eq!(referrers, vec![Some("r4"), Some("r3"), Some("r2")]);
    }

    #[tokio::test]
    async fn top_referrers_ranked_by_count_then_name() {
        let repo = InMemoryRepository::new();
        for c in ["abc123", "other"] {
            repo.create(&code(c), new_link("https://example.com", None))
                .await
                .unwrap();
        }
        repo.append(vec![
            click("abc123", Some("b.com")),
            click("abc123", Some("a.com")),
            click("abc123", Some("c.com")),
            click("abc123", Some("c.com")),
            click("abc123", None),
            click("other", Some("c.com")),
        ])
        .await
        .unwrap();

        let top = repo.top_referrers(&code("abc123"), 2).await.unwrap();
        assert_eq!(
            top,
            vec![
                ReferrerCount {
                    referrer: "c.com".into(),
                    count: 2
                },
                ReferrerCount {
                    referrer: "a.com".into(),
                    count: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn late_clicks_do_not_leak_into_a_recreated_code() {
        let repo = InMemoryRepository::with_policy(CodeReusePolicy::Reuse);
        repo.create(&code("abc123"), new_link("https://old.com", None))
            .await
            .unwrap();
        let late = click("abc123", Some("old-ref"));
        repo.increment_click(&code("abc123"), late.timestamp)
            .await
            .unwrap();

        repo.delete(&code("abc123")).await.unwrap();
        repo.append(vec![late.clone()]).await.unwrap();
        assert!(repo.recent(&code("abc123"), 10).await.unwrap().is_empty());

        let recreated = NewLink {
            created_at: late.timestamp + SignedDuration::from_secs(1),
            ..new_link("https://new.com", None)
        };
        repo.create(&code("abc123"), recreated).await.unwrap();
        repo.append(vec![late]).await.unwrap();

        assert_eq!(repo.lookup(&code("abc123")).await.unwrap().click_count, 0);
        assert!(repo.recent(&code("abc123"), 10).await.unwrap().is_empty());
        assert!(repo.top_referrers(&code("abc123"), 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clicks_for_unknown_codes_are_not_stored() {
        let repo = InMemoryRepository::new();
        repo.append(vec![click("ghost", Some("r"))]).await.unwrap();
        assert!(repo.recent(&code("ghost"), 10).await.unwrap().is_empty());
    }
}
