use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};
use std::time::Duration;
use tracing::debug;
use typed_builder::TypedBuilder;
use wormhole_core::error::{Result, StorageError};
use wormhole_core::{
    ClickEvent, ClickLog, CodeReusePolicy, Link, NewLink, ReadRepository, ReferrerCount,
    Repository, ShortCode,
};

const REFERRER_MAX_CHARS: usize = 2048;
const USER_AGENT_MAX_CHARS: usize = 1024;
const CLIENT_ADDRESS_MAX_CHARS: usize = 64;

/// Connection settings for [`MySqlRepository::connect`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct MySqlSettings {
    #[builder(default = 10)]
    pub max_connections: u32,
    /// How long a caller may wait for a pooled connection.
    #[builder(default = Duration::from_secs(2))]
    pub acquire_timeout: Duration,
    #[builder(default)]
    pub policy: CodeReusePolicy,
}

impl Default for MySqlSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// MySQL implementation of the store contracts.
///
/// The primary key on `short_code` is the insert-if-absent authority and
/// click counters are bumped with a single `UPDATE`, so concurrent writers
/// never lose an increment. Under [`CodeReusePolicy::Retire`] deletes set
/// `deleted_at` and the row keeps its code forever; under
/// [`CodeReusePolicy::Reuse`] the row and its click events are removed.
/// Timestamps are stored as Unix microseconds.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
    policy: CodeReusePolicy,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool, policy: CodeReusePolicy) -> Self {
        Self { pool, policy }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str, settings: MySqlSettings) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool, settings.policy))
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Query(format!("migration failed: {e}")))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Takes over a code whose link has expired. Returns false when the
    /// code is held by a live or retired row.
    async fn reclaim_expired(&self, code: &ShortCode, new: &NewLink) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET original_url = ?, created_at = ?, expire_at = ?,
                click_count = 0, last_click_at = NULL
            WHERE short_code = ?
              AND deleted_at IS NULL
              AND expire_at IS NOT NULL
              AND expire_at <= ?
            "#,
        )
        .bind(&new.original_url)
        .bind(to_micros(new.created_at))
        .bind(new.expire_at.map(to_micros))
        .bind(code.as_str())
        .bind(now_micros())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM click_events WHERE short_code = ?")
            .bind(code.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(code = %code, "reclaimed expired short code");
        Ok(true)
    }
}

fn to_micros(ts: Timestamp) -> i64 {
    ts.as_microsecond()
}

fn now_micros() -> i64 {
    to_micros(Timestamp::now())
}

fn parse_micros(column: &str, value: i64) -> Result<Timestamp> {
    Timestamp::from_microsecond(value).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{value}': {e}"))
    })
}

fn parse_optional_micros(column: &str, value: Option<i64>) -> Result<Option<Timestamp>> {
    value.map(|v| parse_micros(column, v)).transpose()
}

fn clip(value: Option<&str>, max_chars: usize) -> Option<String> {
    value.map(|v| v.chars().take(max_chars).collect())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn link_from_row(code: &ShortCode, row: &MySqlRow) -> Result<Link> {
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let expire_at: Option<i64> = row.try_get("expire_at").map_err(map_sqlx_error)?;
    let click_count: u64 = row.try_get("click_count").map_err(map_sqlx_error)?;
    let last_click_at: Option<i64> = row.try_get("last_click_at").map_err(map_sqlx_error)?;

    Ok(Link {
        short_code: code.clone(),
        original_url,
        created_at: parse_micros("created_at", created_at)?,
        expire_at: parse_optional_micros("expire_at", expire_at)?,
        click_count,
        last_click_at: parse_optional_micros("last_click_at", last_click_at)?,
    })
}

fn event_from_row(code: &ShortCode, row: &MySqlRow) -> Result<ClickEvent> {
    let clicked_at: i64 = row.try_get("clicked_at").map_err(map_sqlx_error)?;

    Ok(ClickEvent {
        short_code: code.clone(),
        timestamp: parse_micros("clicked_at", clicked_at)?,
        referrer: row.try_get("referrer").map_err(map_sqlx_error)?,
        user_agent: row.try_get("user_agent").map_err(map_sqlx_error)?,
        client_address: row.try_get("client_address").map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl ReadRepository for MySqlRepository {
    async fn lookup(&self, code: &ShortCode) -> Result<Link> {
        let row = sqlx::query(
            r#"
            SELECT original_url, created_at, expire_at, click_count, last_click_at
            FROM short_urls
            WHERE short_code = ?
              AND deleted_at IS NULL
              AND (expire_at IS NULL OR expire_at > ?)
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .bind(now_micros())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => link_from_row(code, &row),
            None => Err(StorageError::NotFound(code.to_string())),
        }
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query(
            r#"
            SELECT 1
            FROM short_urls
            WHERE short_code = ?
              AND (deleted_at IS NOT NULL OR expire_at IS NULL OR expire_at > ?)
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .bind(now_micros())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .is_some();

        Ok(exists)
    }
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn create(&self, code: &ShortCode, new: NewLink) -> Result<Link> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (short_code, original_url, created_at, expire_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(code.as_str())
        .bind(&new.original_url)
        .bind(to_micros(new.created_at))
        .bind(new.expire_at.map(to_micros))
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {
                // Events a previous holder of the code left behind.
                sqlx::query("DELETE FROM click_events WHERE short_code = ?")
                    .bind(code.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
                tx.commit().await.map_err(map_sqlx_error)?;
                Ok(Link::from_new(code.clone(), new))
            }
            Err(err) if is_unique_violation(&err) => {
                tx.rollback().await.map_err(map_sqlx_error)?;
                if self.reclaim_expired(code, &new).await? {
                    Ok(Link::from_new(code.clone(), new))
                } else {
                    Err(StorageError::DuplicateCode(code.to_string()))
                }
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn increment_click(&self, code: &ShortCode, at: Timestamp) -> Result<()> {
        let at = to_micros(at);

        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET click_count = click_count + 1,
                last_click_at = GREATEST(COALESCE(last_click_at, ?), ?)
            WHERE short_code = ?
              AND deleted_at IS NULL
            "#,
        )
        .bind(at)
        .bind(at)
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(code.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        let removed = match self.policy {
            CodeReusePolicy::Retire => sqlx::query(
                r#"
                UPDATE short_urls
                SET deleted_at = ?
                WHERE short_code = ?
                  AND deleted_at IS NULL
                "#,
            )
            .bind(now_micros())
            .bind(code.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected(),
            CodeReusePolicy::Reuse => {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
                let removed = sqlx::query(
                    "DELETE FROM short_urls WHERE short_code = ? AND deleted_at IS NULL",
                )
                .bind(code.as_str())
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?
                .rows_affected();

                if removed > 0 {
                    sqlx::query("DELETE FROM click_events WHERE short_code = ?")
                        .bind(code.as_str())
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx_error)?;
                }
                tx.commit().await.map_err(map_sqlx_error)?;
                removed
            }
        };

        if removed == 0 {
            return Err(StorageError::NotFound(code.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClickLog for MySqlRepository {
    async fn append(&self, events: Vec<ClickEvent>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        // Only events for a live link created no later than the click are kept,
        // so a flush that lands after a delete or a re-create drops them.
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(
            r#"
            INSERT INTO click_events (short_code, clicked_at, referrer, user_agent, client_address)
            SELECT e.short_code, e.clicked_at, e.referrer, e.user_agent, e.client_address
            FROM ("#,
        );
        for (seq, event) in events.iter().enumerate() {
            if seq > 0 {
                builder.push(" UNION ALL ");
            }
            builder
                .push("SELECT ")
                .push_bind(seq as i64)
                .push(" AS seq, ")
                .push_bind(event.short_code.as_str())
                .push(" AS short_code, ")
                .push_bind(to_micros(event.timestamp))
                .push(" AS clicked_at, ")
                .push_bind(clip(event.referrer.as_deref(), REFERRER_MAX_CHARS))
                .push(" AS referrer, ")
                .push_bind(clip(event.user_agent.as_deref(), USER_AGENT_MAX_CHARS))
                .push(" AS user_agent, ")
                .push_bind(clip(
                    event.client_address.as_deref(),
                    CLIENT_ADDRESS_MAX_CHARS,
                ))
                .push(" AS client_address");
        }
        builder.push(
            r#") AS e
            JOIN short_urls s ON s.short_code = e.short_code
            WHERE s.deleted_at IS NULL
              AND s.created_at <= e.clicked_at
            ORDER BY e.seq"#,
        );

        builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn recent(&self, code: &ShortCode, limit: usize) -> Result<Vec<ClickEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT clicked_at, referrer, user_agent, client_address
            FROM click_events
            WHERE short_code = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(code.as_str())
        .bind(limit as u64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(|row| event_from_row(code, row)).collect()
    }

    async fn top_referrers(&self, code: &ShortCode, limit: usize) -> Result<Vec<ReferrerCount>> {
        let rows = sqlx::query(
            r#"
            SELECT referrer, COUNT(*) AS hits
            FROM click_events
            WHERE short_code = ?
              AND referrer IS NOT NULL
            GROUP BY referrer
            ORDER BY hits DESC, referrer COLLATE utf8mb4_bin ASC
            LIMIT ?
            "#,
        )
        .bind(code.as_str())
        .bind(limit as u64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                let referrer: String = row.try_get("referrer").map_err(map_sqlx_error)?;
                let hits: i64 = row.try_get("hits").map_err(map_sqlx_error)?;
                Ok(ReferrerCount {
                    referrer,
                    count: hits.max(0) as u64,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_truncates_on_char_boundaries() {
        assert_eq!(clip(Some("héllo"), 2), Some("hé".to_string()));
        assert_eq!(clip(Some("ok"), 10), Some("ok".to_string()));
        assert_eq!(clip(None, 10), None);
    }

    #[test]
    fn micros_round_trip_is_exact() {
        let ts = Timestamp::from_microsecond(1_767_225_600_123_456).unwrap();
        assert_eq!(parse_micros("t", to_micros(ts)).unwrap(), ts);
    }

    #[test]
    fn pool_timeout_is_unavailable() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StorageError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StorageError::InvalidData(_)
        ));
    }
}
