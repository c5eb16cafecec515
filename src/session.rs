//! Consumer-facing facade over the cache service.
//!
//! A [`CacheSession`] keeps an in-memory mirror of the cached listing,
//! favorites and watchlist so presentation code can read them repeatedly
//! without touching the store. Every mutating call writes through to the
//! [`IpoCache`] and then re-reads the affected collection, so once a call
//! returns the mirror matches what is persisted.
//!
//! # Example
//!
//! ```ignore
//! let mut session = CacheSession::new(IpoCache::new(KeyValueStore::in_memory()));
//! let mut events = session.subscribe();
//!
//! session.add_to_favorites("3");
//! assert!(session.is_favorite("3"));
//!
//! // In the render loop
//! while let Ok(event) = events.try_recv() {
//!     // Re-render whatever `event` names
//! }
//! ```

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::cache::{CacheStats, IpoCache};
use crate::ipo::Ipo;

/// Events buffered per subscriber before further events are dropped for it.
pub const SUBSCRIBER_CAPACITY: usize = 64;

/// Emitted after the mirror has been resynchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
  /// The cached listing changed (written, expired or cleared)
  ListingsChanged,
  FavoritesChanged,
  WatchlistChanged,
}

/// Cache facade with a read-through mirror and change notifications.
pub struct CacheSession<R = Ipo> {
  cache: IpoCache<R>,
  cached_ipos: Option<Vec<R>>,
  favorites: Vec<String>,
  watchlist: Vec<String>,
  subscribers: Vec<mpsc::Sender<CacheEvent>>,
}

impl<R> CacheSession<R>
where
  R: Serialize + DeserializeOwned,
{
  /// Load the mirror from `cache` and sweep expired entries once.
  pub fn new(cache: IpoCache<R>) -> Self {
    let mut session = Self {
      cache,
      cached_ipos: None,
      favorites: Vec::new(),
      watchlist: Vec::new(),
      subscribers: Vec::new(),
    };
    session.load();
    session.cache.clean_expired_cache();
    session
  }

  /// The wrapped cache service.
  pub fn cache(&self) -> &IpoCache<R> {
    &self.cache
  }

  /// Give the cache service back.
  pub fn into_cache(self) -> IpoCache<R> {
    self.cache
  }

  /// Receive a [`CacheEvent`] after every change to the mirror.
  ///
  /// Each subscriber buffers up to [`SUBSCRIBER_CAPACITY`] events; while its
  /// buffer is full new events for it are dropped. Call [`refresh`](Self::refresh)
  /// or re-read the mirror after catching up.
  pub fn subscribe(&mut self) -> mpsc::Receiver<CacheEvent> {
    let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
    self.subscribers.push(tx);
    rx
  }

  /// Re-read every mirrored collection from the cache.
  pub fn refresh(&mut self) {
    self.load();
    self.emit(CacheEvent::ListingsChanged);
    self.emit(CacheEvent::FavoritesChanged);
    self.emit(CacheEvent::WatchlistChanged);
  }

  // ==========================================================================
  // Listings
  // ==========================================================================

  /// Mirrored listing, as of the last load or mutation.
  pub fn cached_ipos(&self) -> Option<&[R]> {
    self.cached_ipos.as_deref()
  }

  pub fn cache_ipos(&mut self, ipos: &[R]) {
    self.cache.cache_ipos(ipos, None);
    self.sync_listings();
  }

  /// Detail record for `id`, read straight from the cache.
  pub fn cached_ipo(&self, id: &str) -> Option<R> {
    self.cache.cached_ipo_details(id)
  }

  pub fn cache_ipo(&self, id: &str, ipo: &R) {
    self.cache.cache_ipo_details(id, ipo, None);
  }

  pub fn clear_cache(&mut self) {
    self.cache.clear_cache();
    self.sync_listings();
  }

  pub fn clean_expired_cache(&mut self) {
    self.cache.clean_expired_cache();
    self.sync_listings();
  }

  pub fn stats(&self) -> CacheStats {
    self.cache.get_cache_stats()
  }

  // ==========================================================================
  // Favorites
  // ==========================================================================

  pub fn favorites(&self) -> &[String] {
    &self.favorites
  }

  pub fn is_favorite(&self, id: &str) -> bool {
    self.favorites.iter().any(|f| f == id)
  }

  pub fn add_to_favorites(&mut self, id: &str) {
    self.cache.add_to_favorites(id);
    self.sync_favorites();
  }

  pub fn remove_from_favorites(&mut self, id: &str) {
    self.cache.remove_from_favorites(id);
    self.sync_favorites();
  }

  pub fn clear_favorites(&mut self) {
    self.cache.clear_favorites();
    self.sync_favorites();
  }

  /// Flip favorite membership, returning whether `id` is now a favorite.
  pub fn toggle_favorite(&mut self, id: &str) -> bool {
    let now_member = self.cache.favorites().toggle(id);
    self.sync_favorites();
    now_member
  }

  // ==========================================================================
  // Watchlist
  // ==========================================================================

  pub fn watchlist(&self) -> &[String] {
    &self.watchlist
  }

  pub fn is_in_watchlist(&self, id: &str) -> bool {
    self.watchlist.iter().any(|w| w == id)
  }

  pub fn add_to_watchlist(&mut self, id: &str) {
    self.cache.add_to_watchlist(id);
    self.sync_watchlist();
  }

  pub fn remove_from_watchlist(&mut self, id: &str) {
    self.cache.remove_from_watchlist(id);
    self.sync_watchlist();
  }

  pub fn clear_watchlist(&mut self) {
    self.cache.clear_watchlist();
    self.sync_watchlist();
  }

  /// Flip watchlist membership, returning whether `id` is now watched.
  pub fn toggle_watchlist(&mut self, id: &str) -> bool {
    let now_member = self.cache.watchlist().toggle(id);
    self.sync_watchlist();
    now_member
  }

  // ==========================================================================
  // Internal
  // ==========================================================================

  fn load(&mut self) {
    self.cached_ipos = self.cache.cached_ipos();
    self.favorites = self.cache.get_favorites();
    self.watchlist = self.cache.get_watchlist();
  }

  fn sync_listings(&mut self) {
    self.cached_ipos = self.cache.cached_ipos();
    self.emit(CacheEvent::ListingsChanged);
  }

  fn sync_favorites(&mut self) {
    self.favorites = self.cache.get_favorites();
    self.emit(CacheEvent::FavoritesChanged);
  }

  fn sync_watchlist(&mut self) {
    self.watchlist = self.cache.get_watchlist();
    self.emit(CacheEvent::WatchlistChanged);
  }

  fn emit(&mut self, event: CacheEvent) {
    // Drop subscribers whose receiver is gone; a full buffer just loses the event
    self.subscribers.retain(|tx| match tx.try_send(event) {
      Ok(()) => true,
      Err(mpsc::error::TrySendError::Full(_)) => {
        debug!("Subscriber buffer full, dropping {:?}", event);
        true
      }
      Err(mpsc::error::TrySendError::Closed(_)) => false,
    });
    debug!("Cache event {:?} sent to {} subscribers", event, self.subscribers.len());
  }
}
