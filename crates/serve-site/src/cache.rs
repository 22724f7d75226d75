use chrono::{DateTime, Utc};
use shared::{Bill, VoteTally};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Last good copy of the featured bill and its tallies. Served (marked
/// stale) whenever the store is unavailable.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub bill: Bill,
    pub tally: VoteTally,
    pub cached_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct PageCache {
    inner: Arc<RwLock<Option<Snapshot>>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn store(&self, bill: Bill, tally: VoteTally) {
        let mut guard = self.inner.write().await;
        *guard = Some(Snapshot {
            bill,
            tally,
            cached_at: Utc::now(),
        });
    }

    /// Refresh the cached tallies if `slug` is the cached bill.
    pub async fn update_tally(&self, slug: &str, tally: VoteTally) {
        let mut guard = self.inner.write().await;
        if let Some(snapshot) = guard.as_mut() {
            if snapshot.bill.slug == slug {
                snapshot.tally = tally;
                snapshot.cached_at = Utc::now();
            }
        }
    }

    pub async fn get(&self) -> Option<Snapshot> {
        self.inner.read().await.clone()
    }
}
