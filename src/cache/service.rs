//! Expiring cache for IPO listings plus favorites, watchlist and preferences.

use chrono::Duration;
use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::entry::{CacheEntry, EntryHeader};
use super::membership::MembershipList;
use super::settings::CacheSettings;
use crate::ipo::Ipo;
use crate::store::KeyValueStore;

/// Logical key of the bulk listing entry.
const ALL_IPOS_KEY: &str = "all_ipos";

/// Diagnostic snapshot of the cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
  /// Number of keys under the cache prefix
  pub total_keys: usize,
  /// Size of the whole store in bytes
  pub cache_size: u64,
}

/// Cache service over a [`KeyValueStore`].
///
/// Listing entries expire lazily: an expired entry is removed when it is
/// next read, or by [`IpoCache::clean_expired_cache`]. Nothing runs in the
/// background.
///
/// `R` is the cached record type. The service never looks inside it.
pub struct IpoCache<R = Ipo> {
  store: KeyValueStore,
  settings: CacheSettings,
  clock: Arc<dyn Clock>,
  _record: PhantomData<fn() -> R>,
}

impl<R> IpoCache<R>
where
  R: Serialize + DeserializeOwned,
{
  /// Create a cache service with the default settings.
  pub fn new(store: KeyValueStore) -> Self {
    Self {
      store,
      settings: CacheSettings::default(),
      clock: Arc::new(SystemClock),
      _record: PhantomData,
    }
  }

  /// Create a cache service with custom settings.
  pub fn with_settings(store: KeyValueStore, settings: CacheSettings) -> Result<Self> {
    settings.validate()?;
    Ok(Self {
      settings,
      ..Self::new(store)
    })
  }

  /// Replace the time source.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn settings(&self) -> &CacheSettings {
    &self.settings
  }

  /// The underlying store.
  pub fn store(&self) -> &KeyValueStore {
    &self.store
  }

  /// Give the store back, e.g. to close it.
  pub fn into_store(self) -> KeyValueStore {
    self.store
  }

  /// Full storage key for a logical cache key.
  pub fn cache_key(&self, key: &str) -> String {
    format!("{}{}", self.settings.prefix, key)
  }

  /// Storage key of the bulk listing entry.
  pub fn ipos_key(&self) -> String {
    self.cache_key(ALL_IPOS_KEY)
  }

  /// Storage key of the detail entry for `id`.
  pub fn ipo_details_key(&self, id: &str) -> String {
    self.cache_key(&format!("ipo_{}", id))
  }

  // ==========================================================================
  // Generic entries
  // ==========================================================================

  /// Cache `data` under `key` (inside the namespace) for `ttl`, or the
  /// default TTL when `None`.
  pub fn put<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Option<Duration>) {
    let ttl = ttl.unwrap_or(self.settings.default_ttl);
    let entry = CacheEntry::new(data, self.clock.now_millis(), ttl);
    self.store.set(&self.cache_key(key), &entry);
  }

  /// Read the entry under `key`, evicting it if it has expired.
  pub fn fetch<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let full_key = self.cache_key(key);
    let entry: CacheEntry<T> = self.store.get_opt(&full_key)?;

    if entry.is_expired_at(self.clock.now_millis()) {
      debug!("Cache entry {} expired, evicting", full_key);
      self.store.remove(&full_key);
      return None;
    }

    Some(entry.data)
  }

  // ==========================================================================
  // Listings
  // ==========================================================================

  /// Cache the full listing.
  pub fn cache_ipos(&self, ipos: &[R], ttl: Option<Duration>) {
    self.put(ALL_IPOS_KEY, ipos, ttl);
  }

  /// The cached listing, if present and not expired.
  pub fn cached_ipos(&self) -> Option<Vec<R>> {
    self.fetch(ALL_IPOS_KEY)
  }

  /// Cache the detail record of one IPO.
  pub fn cache_ipo_details(&self, id: &str, ipo: &R, ttl: Option<Duration>) {
    self.put(&format!("ipo_{}", id), ipo, ttl);
  }

  /// The cached detail record for `id`, if present and not expired.
  pub fn cached_ipo_details(&self, id: &str) -> Option<R> {
    self.fetch(&format!("ipo_{}", id))
  }

  pub fn remove_ipo_details(&self, id: &str) {
    self.store.remove(&self.ipo_details_key(id));
  }

  // ==========================================================================
  // Membership lists
  // ==========================================================================

  pub fn favorites(&self) -> MembershipList<'_> {
    MembershipList::new(&self.store, &self.settings.favorites_key)
  }

  pub fn watchlist(&self) -> MembershipList<'_> {
    MembershipList::new(&self.store, &self.settings.watchlist_key)
  }

  pub fn add_to_favorites(&self, id: &str) {
    self.favorites().add(id);
  }

  pub fn remove_from_favorites(&self, id: &str) {
    self.favorites().remove(id);
  }

  pub fn get_favorites(&self) -> Vec<String> {
    self.favorites().ids()
  }

  pub fn is_favorite(&self, id: &str) -> bool {
    self.favorites().contains(id)
  }

  pub fn add_to_watchlist(&self, id: &str) {
    self.watchlist().add(id);
  }

  pub fn remove_from_watchlist(&self, id: &str) {
    self.watchlist().remove(id);
  }

  pub fn clear_favorites(&self) {
    self.favorites().clear();
  }

  pub fn clear_watchlist(&self) {
    self.watchlist().clear();
  }

  pub fn get_watchlist(&self) -> Vec<String> {
    self.watchlist().ids()
  }

  pub fn is_in_watchlist(&self, id: &str) -> bool {
    self.watchlist().contains(id)
  }

  // ==========================================================================
  // Preferences
  // ==========================================================================

  pub fn set_user_preferences<P: Serialize>(&self, prefs: &P) {
    self.store.set(&self.settings.preferences_key, prefs);
  }

  pub fn get_user_preferences<P: DeserializeOwned>(&self, default: P) -> P {
    self.store.get(&self.settings.preferences_key, default)
  }

  // ==========================================================================
  // Maintenance
  // ==========================================================================

  fn namespaced_keys(&self) -> Vec<String> {
    self
      .store
      .all_keys()
      .into_iter()
      .filter(|key| key.starts_with(&self.settings.prefix))
      .collect()
  }

  /// Remove every cache entry. Favorites, watchlist and preferences are kept.
  ///
  /// Returns the number of keys removed.
  pub fn clear_cache(&self) -> usize {
    let keys = self.namespaced_keys();
    for key in &keys {
      self.store.remove(key);
    }
    info!("Cleared {} cache entries", keys.len());
    keys.len()
  }

  /// Remove every cache entry whose expiry has passed.
  ///
  /// Keys that don't parse as a cache entry are left alone. Returns the
  /// number of entries removed.
  pub fn clean_expired_cache(&self) -> usize {
    let now = self.clock.now_millis();
    let mut removed = 0;

    for key in self.namespaced_keys() {
      match self.store.try_get::<EntryHeader>(&key) {
        Ok(Some(header)) if header.expires_at < now => {
          self.store.remove(&key);
          removed += 1;
        }
        Ok(_) => {}
        Err(e) => debug!("Skipping unreadable cache key {}: {}", key, e),
      }
    }

    if removed > 0 {
      info!("Removed {} expired cache entries", removed);
    }
    removed
  }

  pub fn get_cache_stats(&self) -> CacheStats {
    CacheStats {
      total_keys: self.namespaced_keys().len(),
      cache_size: self.store.size(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::ManualClock;
  use chrono::Utc;
  use serde::Deserialize;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Listing {
    id: String,
    name: String,
  }

  fn listing(id: &str) -> Listing {
    Listing {
      id: id.to_string(),
      name: format!("Company {}", id),
    }
  }

  fn create_test_cache() -> (IpoCache<Listing>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let cache = IpoCache::new(KeyValueStore::in_memory()).with_clock(clock.clone());
    (cache, clock)
  }

  #[test]
  fn test_cached_ipos_roundtrip() {
    let (cache, _clock) = create_test_cache();
    let ipos = vec![listing("1"), listing("2")];

    cache.cache_ipos(&ipos, None);

    assert_eq!(cache.cached_ipos(), Some(ipos));
  }

  #[test]
  fn test_cached_ipos_missing() {
    let (cache, _clock) = create_test_cache();

    assert_eq!(cache.cached_ipos(), None);
  }

  #[test]
  fn test_expired_listing_is_evicted_on_read() {
    let (cache, clock) = create_test_cache();
    let ipos = vec![listing("1"), listing("2"), listing("3")];

    cache.cache_ipos(&ipos, Some(Duration::milliseconds(1)));
    assert_eq!(cache.cached_ipos().map(|v| v.len()), Some(3));

    clock.advance(Duration::milliseconds(2));

    assert_eq!(cache.cached_ipos(), None);
    assert_eq!(cache.ipos_key(), "ipo_cache_all_ipos");
    assert!(!cache.store().contains(&cache.ipos_key()));
  }

  #[test]
  fn test_entry_is_valid_at_expiry_instant() {
    let (cache, clock) = create_test_cache();

    cache.cache_ipos(&[listing("1")], Some(Duration::seconds(10)));
    clock.advance(Duration::seconds(10));

    assert!(cache.cached_ipos().is_some());
  }

  #[test]
  fn test_default_ttl_is_five_minutes() {
    let (cache, clock) = create_test_cache();

    cache.cache_ipo_details("4", &listing("4"), None);
    clock.advance(Duration::minutes(5));
    assert!(cache.cached_ipo_details("4").is_some());

    clock.advance(Duration::milliseconds(1));
    assert!(cache.cached_ipo_details("4").is_none());
  }

  #[test]
  fn test_details_are_keyed_per_id() {
    let (cache, _clock) = create_test_cache();

    cache.cache_ipo_details("1", &listing("1"), None);
    cache.cache_ipo_details("2", &listing("2"), None);

    assert!(cache.store().contains("ipo_cache_ipo_1"));
    assert_eq!(cache.cached_ipo_details("2"), Some(listing("2")));
    assert_eq!(cache.cached_ipo_details("3"), None);

    cache.remove_ipo_details("1");
    assert_eq!(cache.cached_ipo_details("1"), None);
  }

  #[test]
  fn test_rewrite_restamps_expiry() {
    let (cache, clock) = create_test_cache();

    cache.cache_ipos(&[listing("1")], Some(Duration::seconds(5)));
    clock.advance(Duration::seconds(4));
    cache.cache_ipos(&[listing("2")], Some(Duration::seconds(5)));
    clock.advance(Duration::seconds(4));

    assert_eq!(cache.cached_ipos(), Some(vec![listing("2")]));
  }

  #[test]
  fn test_favorites_and_watchlist() {
    let (cache, _clock) = create_test_cache();

    cache.add_to_favorites("1");
    cache.add_to_favorites("1");
    cache.add_to_watchlist("2");
    cache.remove_from_favorites("9");

    assert_eq!(cache.get_favorites(), vec!["1".to_string()]);
    assert!(cache.is_favorite("1"));
    assert!(!cache.is_in_watchlist("1"));
    assert!(cache.is_in_watchlist("2"));

    cache.remove_from_watchlist("2");
    assert!(cache.get_watchlist().is_empty());
  }

  #[test]
  fn test_watchlist_add_add_remove() {
    let (cache, _clock) = create_test_cache();

    cache.add_to_watchlist("5");
    assert_eq!(cache.get_watchlist(), vec!["5".to_string()]);
    cache.add_to_watchlist("5");
    assert_eq!(cache.get_watchlist(), vec!["5".to_string()]);
    cache.remove_from_watchlist("5");

    assert!(!cache.is_in_watchlist("5"));
    assert!(cache.get_watchlist().is_empty());
  }

  #[test]
  fn test_clear_cache_keeps_lists_and_preferences() {
    let (cache, _clock) = create_test_cache();
    cache.cache_ipos(&[listing("1")], None);
    cache.cache_ipo_details("1", &listing("1"), None);
    cache.add_to_favorites("1");
    cache.add_to_watchlist("2");
    cache.set_user_preferences(&"dark");

    assert_eq!(cache.clear_cache(), 2);

    let store = cache.store();
    assert!(!store.contains("ipo_cache_all_ipos"));
    assert!(!store.contains("ipo_cache_ipo_1"));
    assert!(store.contains("favorite_ipos"));
    assert!(store.contains("watchlist_ipos"));
    assert_eq!(
      cache.get_user_preferences("light".to_string()),
      "dark".to_string()
    );
  }

  #[test]
  fn test_clear_favorites_keeps_watchlist_and_cache() {
    let (cache, _clock) = create_test_cache();
    cache.cache_ipos(&[listing("1")], None);
    cache.add_to_favorites("1");
    cache.add_to_favorites("2");
    cache.add_to_watchlist("1");

    cache.clear_favorites();

    assert!(cache.get_favorites().is_empty());
    assert!(!cache.is_favorite("1"));
    assert_eq!(cache.get_watchlist(), vec!["1".to_string()]);
    assert_eq!(cache.cached_ipos(), Some(vec![listing("1")]));

    cache.clear_watchlist();
    assert!(cache.get_watchlist().is_empty());
    assert_eq!(cache.get_cache_stats().total_keys, 1);
  }

  #[test]
  fn test_corrupt_listing_reads_as_absent() {
    let (cache, _clock) = create_test_cache();
    cache.store().set_string("ipo_cache_all_ipos", "{corrupt");

    assert_eq!(cache.cached_ipos(), None);
    assert_eq!(cache.clean_expired_cache(), 0);
    assert!(cache.store().contains("ipo_cache_all_ipos"));
  }

  #[test]
  fn test_clean_expired_cache_only_removes_expired() {
    let (cache, clock) = create_test_cache();
    cache.cache_ipo_details("short", &listing("short"), Some(Duration::seconds(1)));
    cache.cache_ipo_details("long", &listing("long"), Some(Duration::hours(1)));

    clock.advance(Duration::seconds(2));

    assert_eq!(cache.clean_expired_cache(), 1);
    assert!(!cache.store().contains("ipo_cache_ipo_short"));
    assert_eq!(cache.cached_ipo_details("long"), Some(listing("long")));
  }

  #[test]
  fn test_clean_expired_cache_skips_unparseable_keys() {
    let (cache, clock) = create_test_cache();
    cache.store().set_string("ipo_cache_garbage", "not an entry");
    cache.store().set_bool("ipo_cache_flag", true);
    cache.cache_ipos(&[listing("1")], Some(Duration::seconds(1)));

    clock.advance(Duration::seconds(2));

    assert_eq!(cache.clean_expired_cache(), 1);
    assert!(cache.store().contains("ipo_cache_garbage"));
    assert!(cache.store().contains("ipo_cache_flag"));
  }

  #[test]
  fn test_cache_stats_counts_namespace_only() {
    let (cache, _clock) = create_test_cache();
    cache.cache_ipos(&[listing("1")], None);
    cache.cache_ipo_details("1", &listing("1"), None);
    cache.add_to_favorites("1");

    let stats = cache.get_cache_stats();

    assert_eq!(stats.total_keys, 2);
    assert_eq!(stats.cache_size, cache.store().size());
  }

  #[test]
  fn test_custom_prefix() {
    let settings = CacheSettings {
      prefix: "listings:".to_string(),
      ..Default::default()
    };
    let cache: IpoCache<Listing> =
      IpoCache::with_settings(KeyValueStore::in_memory(), settings).unwrap();

    cache.cache_ipos(&[listing("1")], None);

    assert!(cache.store().contains("listings:all_ipos"));
    assert_eq!(cache.ipo_details_key("7"), "listings:ipo_7");
  }

  #[test]
  fn test_invalid_settings_are_rejected() {
    let settings = CacheSettings {
      preferences_key: "ipo_cache_prefs".to_string(),
      ..Default::default()
    };

    assert!(IpoCache::<Listing>::with_settings(KeyValueStore::in_memory(), settings).is_err());
  }
}
