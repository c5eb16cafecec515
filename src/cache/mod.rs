//! Expiring cache for IPO listings built on the key-value store.
//!
//! This module provides:
//! - Time-bounded entries under a key namespace (`ipo_cache_` by default)
//! - Lazy eviction on read plus an explicit expiry sweep
//! - Favorites and watchlist membership lists outside the namespace
//! - A single preferences slot

mod clock;
mod entry;
mod membership;
mod service;
mod settings;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use membership::MembershipList;
pub use service::{CacheStats, IpoCache};
pub use settings::CacheSettings;
