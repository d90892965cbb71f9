//! Per-kind snapshot cache.
//!
//! # State Machine (per check kind)
//! ```text
//! EMPTY ──refresh──▶ IN_FLIGHT ──complete──▶ VALID (until expires_at)
//!                        ▲                         │
//!                        └─────────expired─────────┘
//! ```
//!
//! # Design Decisions
//! - Valid entries are read lock-free through `ArcSwapOption`
//! - A per-kind async mutex serializes refreshes; callers that arrive during
//!   a refresh wait on it and then re-check the slot, joining the result
//!   instead of probing again
//! - The refresh runs as its own task holding that mutex, so a caller that
//!   goes away (client disconnect) neither loses the result nor lets a
//!   second refresh start
//! - Entries are replaced wholesale, never mutated
//! - Failed refreshes leave the slot untouched

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tokio::time::Instant;

use crate::health::types::{CheckKind, HealthSnapshot};
use crate::observability::metrics;

/// A cached snapshot and the instant it stops being served.
#[derive(Debug)]
pub struct CacheEntry {
    pub snapshot: Arc<HealthSnapshot>,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
struct CacheSlot {
    entry: ArcSwapOption<CacheEntry>,
    refresh: Arc<Mutex<()>>,
}

impl CacheSlot {
    fn valid(&self) -> Option<Arc<HealthSnapshot>> {
        self.entry
            .load()
            .as_ref()
            .filter(|e| e.is_valid_at(Instant::now()))
            .map(|e| e.snapshot.clone())
    }
}

/// Memoizes the latest snapshot for each [`CheckKind`].
#[derive(Default)]
pub struct HealthCache {
    slots: [Arc<CacheSlot>; 3],
}

impl HealthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached snapshot for `kind`, refreshing it first if it is
    /// missing or expired. At most one `refresh` runs per kind at a time,
    /// and it runs to completion even if every caller stops waiting.
    pub async fn get_or_refresh<F, Fut, E>(
        &self,
        kind: CheckKind,
        ttl: Duration,
        refresh: F,
    ) -> Result<Arc<HealthSnapshot>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HealthSnapshot, E>> + Send + 'static,
        E: From<JoinError> + Send + 'static,
    {
        let slot = &self.slots[kind.index()];

        if let Some(snapshot) = slot.valid() {
            metrics::record_cache_lookup(kind, true);
            return Ok(snapshot);
        }

        let guard = slot.refresh.clone().lock_owned().await;

        // Whoever held the lock before us may have just filled the slot.
        if let Some(snapshot) = slot.valid() {
            metrics::record_cache_lookup(kind, true);
            return Ok(snapshot);
        }

        metrics::record_cache_lookup(kind, false);
        tracing::debug!(kind = %kind, "Refreshing health snapshot");

        let pending = refresh();
        let target = slot.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            let snapshot = Arc::new(pending.await?);
            target.entry.store(Some(Arc::new(CacheEntry {
                snapshot: snapshot.clone(),
                expires_at: Instant::now() + ttl,
            })));
            Ok::<_, E>(snapshot)
        });

        task.await.map_err(E::from)?
    }

    /// The current snapshot for `kind` if it has not expired. Never refreshes.
    pub fn peek(&self, kind: CheckKind) -> Option<Arc<HealthSnapshot>> {
        self.slots[kind.index()].valid()
    }

    /// Drop the entry for `kind` so the next lookup re-probes.
    pub fn invalidate(&self, kind: CheckKind) {
        self.slots[kind.index()].entry.store(None);
        tracing::info!(kind = %kind, "Health cache invalidated");
    }

    pub fn invalidate_all(&self) {
        for kind in CheckKind::ALL {
            self.invalidate(kind);
        }
    }

    /// True while a refresh for `kind` is running.
    pub fn is_refreshing(&self, kind: CheckKind) -> bool {
        self.slots[kind.index()].refresh.try_lock().is_err()
    }
}
