use std::sync::Arc;

use chrono::{Duration, Utc};
use ipo_cache::cache::{IpoCache, ManualClock};
use ipo_cache::ipo::{FinancialHighlights, Ipo, IpoCategory, IpoStatus};
use ipo_cache::session::CacheSession;
use ipo_cache::store::{KeyValueStore, SqliteBackend};
use tempfile::TempDir;

fn ipo(id: &str, name: &str, status: IpoStatus) -> Ipo {
  Ipo {
    id: id.to_string(),
    company_name: name.to_string(),
    symbol: name.to_uppercase(),
    logo: String::new(),
    price_range: "₹ 350 - ₹ 375".to_string(),
    lot_size: 40,
    issue_size: "₹ 10,000 Cr".to_string(),
    open_date: "2023-10-05".to_string(),
    close_date: "2023-10-07".to_string(),
    listing_date: "2023-10-15".to_string(),
    status,
    subscription_rate: Some(1.2),
    listing_gain: None,
    sector: "Food Delivery".to_string(),
    description: format!("{} description", name),
    financial_highlights: FinancialHighlights::default(),
    lead_managers: vec!["Kotak Mahindra Capital".to_string()],
    registrar: "Link Intime India".to_string(),
    category: Some(IpoCategory::Mainline),
  }
}

fn listings() -> Vec<Ipo> {
  vec![
    ipo("1", "Bajaj", IpoStatus::Live),
    ipo("2", "Ola", IpoStatus::Listed),
    ipo("3", "Swiggy", IpoStatus::Upcoming),
  ]
}

fn open_cache(dir: &TempDir, clock: Arc<ManualClock>) -> IpoCache<Ipo> {
  let backend = SqliteBackend::open(&dir.path().join("store.db")).expect("Store should open");
  IpoCache::new(KeyValueStore::new(backend)).with_clock(clock)
}

#[test]
fn test_state_survives_reopen() {
  let dir = TempDir::new().expect("Failed to create temp directory");
  let clock = Arc::new(ManualClock::new(Utc::now()));

  let cache = open_cache(&dir, clock.clone());
  cache.cache_ipos(&listings(), None);
  cache.add_to_favorites("2");
  cache.add_to_watchlist("3");
  cache.into_store().close();

  let cache = open_cache(&dir, clock);
  assert_eq!(cache.cached_ipos(), Some(listings()));
  assert_eq!(cache.get_favorites(), vec!["2".to_string()]);
  assert!(cache.is_in_watchlist("3"));
}

#[test]
fn test_listing_expires_and_key_is_removed() {
  let dir = TempDir::new().expect("Failed to create temp directory");
  let clock = Arc::new(ManualClock::new(Utc::now()));
  let cache = open_cache(&dir, clock.clone());

  cache.cache_ipos(&listings(), Some(Duration::milliseconds(1)));
  assert_eq!(cache.cached_ipos().map(|v| v.len()), Some(3));

  clock.advance(Duration::milliseconds(2));

  assert!(cache.cached_ipos().is_none());
  assert!(!cache.store().contains("ipo_cache_all_ipos"));
}

#[test]
fn test_clear_and_sweep_respect_namespace() {
  let dir = TempDir::new().expect("Failed to create temp directory");
  let clock = Arc::new(ManualClock::new(Utc::now()));
  let cache = open_cache(&dir, clock.clone());

  cache.cache_ipos(&listings(), Some(Duration::hours(1)));
  cache.cache_ipo_details("1", &listings()[0], Some(Duration::seconds(1)));
  cache.add_to_favorites("1");
  cache.add_to_watchlist("1");

  clock.advance(Duration::seconds(5));
  assert_eq!(cache.clean_expired_cache(), 1);
  assert!(cache.cached_ipos().is_some());
  assert_eq!(cache.get_cache_stats().total_keys, 1);

  cache.clear_cache();
  let store = cache.store();
  assert!(!store.contains("ipo_cache_all_ipos"));
  assert!(store.contains("favorite_ipos"));
  assert!(store.contains("watchlist_ipos"));
  assert!(cache.get_cache_stats().cache_size > 0);
}

#[test]
fn test_session_over_sqlite() {
  let dir = TempDir::new().expect("Failed to create temp directory");
  let clock = Arc::new(ManualClock::new(Utc::now()));
  let mut session = CacheSession::new(open_cache(&dir, clock));

  session.cache_ipos(&listings());
  session.add_to_watchlist("5");
  session.add_to_watchlist("5");
  assert_eq!(session.watchlist(), ["5".to_string()]);
  session.remove_from_watchlist("5");

  assert!(!session.is_in_watchlist("5"));
  assert!(session.cache().get_watchlist().is_empty());
  assert_eq!(session.cached_ipos().map(|ipos| ipos.len()), Some(3));
}
