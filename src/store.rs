// src/store.rs
//! Dedup memory and the bounded feed store behind one lock.
//!
//! The ingestion path is the only writer; the feed server takes read-locked
//! snapshots. Network I/O always happens before `add_item` is called, so the
//! lock is never held across an await point.

use std::collections::{HashSet, VecDeque};
use std::sync::{PoisonError, RwLock};

use metrics::{counter, gauge};
use sha2::{Digest, Sha256};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

pub const DEFAULT_FEED_MAX: usize = 500;
pub const DEFAULT_SEEN_MAX: usize = 2000;

/// A published article. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FeedItem {
    pub title: String,
    pub url: String,
    pub content: String,
    pub source: String,
    /// RFC 2822.
    pub published: String,
    pub guid: String,
}

impl FeedItem {
    /// Unix seconds of `published`; anything unparseable sorts as the epoch.
    pub fn effective_ts(&self) -> i64 {
        parse_timestamp(&self.published).unwrap_or(0)
    }
}

/// Stable identifier for a URL: first 8 bytes of SHA-256, hex encoded.
pub fn guid_for(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Accepts RFC 2822 (the store's format) and RFC 3339 (Atom leftovers).
pub fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();
    OffsetDateTime::parse(s, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
        .ok()
        .map(|dt| dt.unix_timestamp())
}

/// Current time in the store's timestamp format.
pub fn now_rfc2822() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc2822)
        .unwrap_or_else(|_| "Thu, 01 Jan 1970 00:00:00 +0000".to_string())
}

/// Capped URL set with insertion-order eviction.
#[derive(Debug)]
pub struct SeenSet {
    order: VecDeque<String>,
    members: HashSet<String>,
    cap: usize,
}

impl SeenSet {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            cap: cap.max(1),
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.members.contains(url)
    }

    /// Returns false if the URL was already present.
    pub fn insert(&mut self, url: &str) -> bool {
        if !self.members.insert(url.to_string()) {
            return false;
        }
        self.order.push_back(url.to_string());
        true
    }

    /// Drop oldest-inserted entries until the set is back at its cap.
    /// The newest entry is never evicted because cap >= 1.
    pub fn trim(&mut self) -> usize {
        let mut evicted = 0;
        while self.order.len() > self.cap {
            if let Some(old) = self.order.pop_front() {
                self.members.remove(&old);
                evicted += 1;
            }
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}

#[derive(Debug)]
struct Inner {
    seen: SeenSet,
    items: Vec<FeedItem>,
}

/// Owns the seen-set and the feed store. Constructed once per process and
/// shared as `Arc<IngestionEngine>` by the scheduler and the feed server.
#[derive(Debug)]
pub struct IngestionEngine {
    inner: RwLock<Inner>,
    feed_max: usize,
}

impl IngestionEngine {
    pub fn new(feed_max: usize, seen_max: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                seen: SeenSet::with_capacity(seen_max),
                items: Vec::new(),
            }),
            feed_max: feed_max.max(1),
        }
    }

    /// Insert a new item unless its URL has been seen before.
    pub fn add_item(
        &self,
        title: &str,
        url: &str,
        content: &str,
        source: &str,
        pub_date: Option<&str>,
    ) -> bool {
        let published = match pub_date.map(str::trim).filter(|s| !s.is_empty()) {
            Some(p) => p.to_string(),
            None => now_rfc2822(),
        };
        let item = FeedItem {
            title: title.to_string(),
            url: url.to_string(),
            content: content.to_string(),
            source: source.to_string(),
            published,
            guid: guid_for(url),
        };

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !inner.seen.insert(url) {
            return false;
        }
        inner.seen.trim();

        inner.items.push(item);
        // Stable: equal timestamps keep insertion order.
        inner
            .items
            .sort_by_key(|it| std::cmp::Reverse(it.effective_ts()));
        let feed_max = self.feed_max;
        inner.items.truncate(feed_max);

        counter!("ingest_items_added_total").increment(1);
        gauge!("feed_store_items").set(inner.items.len() as f64);
        true
    }

    /// Snapshot of the items matching `pred`, newest first.
    pub fn query<F>(&self, pred: F) -> Vec<FeedItem>
    where
        F: Fn(&FeedItem) -> bool,
    {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.items.iter().filter(|it| pred(it)).cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<FeedItem> {
        self.query(|_| true)
    }

    pub fn is_seen(&self, url: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn seen_len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.seen.len()
    }

    /// Periodic sweep of the seen-set, independent of feed eviction.
    pub fn sweep_seen(&self) -> usize {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.seen.trim()
    }

    pub fn feed_max(&self) -> usize {
        self.feed_max
    }
}

impl Default for IngestionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_MAX, DEFAULT_SEEN_MAX)
    }
}
