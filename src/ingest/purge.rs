// src/ingest/purge.rs
//! Retention for the downstream reader's `entries` table.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

use super::scheduler::Job;
use crate::config::pipeline::PurgeCfg;
use crate::error::IngestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Read,
    Unread,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Read => "read",
            EntryStatus::Unread => "unread",
        }
    }
}

#[async_trait]
pub trait PurgeStore: Send + Sync {
    /// Delete unstarred entries with `status` published before `cutoff`.
    async fn delete_older_than(
        &self,
        status: EntryStatus,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, IngestError>;
}

pub struct PgPurgeStore {
    pool: PgPool,
}

impl PgPurgeStore {
    /// Lazy pool: an unreachable database surfaces as a `Store` error on the
    /// first purge run, not at startup.
    pub fn connect_lazy(database_url: &str) -> Result<Self, IngestError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl PurgeStore for PgPurgeStore {
    async fn delete_older_than(
        &self,
        status: EntryStatus,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, IngestError> {
        let res = sqlx::query(
            "DELETE FROM entries WHERE status = $1 AND starred = false AND published_at < $2",
        )
        .bind(status.as_str())
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }
}

/// Cutoffs for read and unread entries relative to `now`.
pub fn cutoffs(now: DateTime<Utc>, read_days: u32, unread_days: u32) -> [(EntryStatus, DateTime<Utc>); 2] {
    [
        (EntryStatus::Read, now - ChronoDuration::days(i64::from(read_days))),
        (EntryStatus::Unread, now - ChronoDuration::days(i64::from(unread_days))),
    ]
}

/// One purge pass. `None` store means purging is not configured.
pub async fn run_purge(
    store: Option<&dyn PurgeStore>,
    cfg: &PurgeCfg,
    now: DateTime<Utc>,
) -> Result<u64, IngestError> {
    let Some(store) = store else {
        tracing::debug!("purge not configured, skipping");
        return Ok(0);
    };

    let mut total = 0;
    for (status, cutoff) in cutoffs(now, cfg.read_days, cfg.unread_days) {
        let n = store.delete_older_than(status, cutoff).await?;
        tracing::info!(status = status.as_str(), %cutoff, deleted = n, "purged entries");
        total += n;
    }
    counter!("purge_rows_deleted_total").increment(total);
    Ok(total)
}

pub struct PurgeJob {
    store: Option<Arc<dyn PurgeStore>>,
    cfg: PurgeCfg,
}

impl PurgeJob {
    pub fn new(store: Option<Arc<dyn PurgeStore>>, cfg: PurgeCfg) -> Self {
        Self { store, cfg }
    }

    pub fn from_cfg(cfg: &PurgeCfg) -> Result<Self, IngestError> {
        let url = cfg.database_url.trim();
        let store = if url.is_empty() {
            None
        } else {
            Some(Arc::new(PgPurgeStore::connect_lazy(url)?) as Arc<dyn PurgeStore>)
        };
        Ok(Self::new(store, cfg.clone()))
    }
}

#[async_trait]
impl Job for PurgeJob {
    fn name(&self) -> &str {
        "purge"
    }

    async fn run(&self) -> anyhow::Result<()> {
        run_purge(self.store.as_deref(), &self.cfg, Utc::now()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(EntryStatus, DateTime<Utc>)>>,
        fail: bool,
    }

    #[async_trait]
    impl PurgeStore for Recorder {
        async fn delete_older_than(
            &self,
            status: EntryStatus,
            cutoff: DateTime<Utc>,
        ) -> Result<u64, IngestError> {
            if self.fail {
                return Err(IngestError::Store(sqlx::Error::PoolTimedOut));
            }
            self.calls.lock().unwrap().push((status, cutoff));
            Ok(match status {
                EntryStatus::Read => 3,
                EntryStatus::Unread => 1,
            })
        }
    }

    fn cfg() -> PurgeCfg {
        PurgeCfg {
            database_url: "postgres://x".into(),
            read_days: 30,
            unread_days: 90,
        }
    }

    #[tokio::test]
    async fn per_status_cutoffs() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let rec = Recorder::default();
        let n = run_purge(Some(&rec), &cfg(), now).await.unwrap();
        assert_eq!(n, 4);

        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, EntryStatus::Read);
        assert_eq!(calls[0].1, Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap());
        assert_eq!(calls[1].0, EntryStatus::Unread);
        assert_eq!(calls[1].1, Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn noop_without_store() {
        assert_eq!(run_purge(None, &cfg(), Utc::now()).await.unwrap(), 0);
        let job = PurgeJob::from_cfg(&PurgeCfg::default()).unwrap();
        assert!(job.store.is_none());
        job.run().await.unwrap();
    }

    #[tokio::test]
    async fn store_errors_propagate_to_the_job_boundary() {
        let rec = Recorder {
            fail: true,
            ..Default::default()
        };
        let err = run_purge(Some(&rec), &cfg(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, IngestError::Store(_)));
    }
}
