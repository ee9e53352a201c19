//! Single-slot TTL cache for the normalized call listing.
//!
//! There is one global slot, not one per query string: whichever listing was
//! fetched last is served to every caller until it expires. Concurrent misses
//! are not de-duplicated, so two racing misses both fetch and the last write
//! wins.

use callrelay_types::CanonicalCallRecord;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// A normalized listing and the moment it was fetched.
#[derive(Debug)]
pub struct CachedListing {
    pub records: Vec<CanonicalCallRecord>,
    pub fetched_at: Instant,
}

/// Shared handle to the listing slot.
///
/// The slot is replaced wholesale on every write, so readers either see the
/// previous listing or the new one, never a mix. Uses `std::sync::RwLock`
/// because the lock is only held for a pointer clone or swap and never across
/// an `.await`.
#[derive(Debug, Clone)]
pub struct ResultCache {
    ttl: Duration,
    slot: Arc<RwLock<Option<Arc<CachedListing>>>>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Arc::new(RwLock::new(None)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached listing if one exists and is younger than the TTL.
    pub fn get(&self) -> Option<Arc<CachedListing>> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref()
            .filter(|listing| listing.fetched_at.elapsed() < self.ttl)
            .cloned()
    }

    /// Replaces the slot with a freshly fetched listing.
    pub fn set(&self, records: Vec<CanonicalCallRecord>) {
        let listing = Arc::new(CachedListing {
            records,
            fetched_at: Instant::now(),
        });
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(listing);
    }
}
