//! Named, deduplicated lists of identifiers (favorites, watchlist).

use tracing::debug;

use crate::store::KeyValueStore;

/// View over one membership list persisted as a JSON array under `key`.
///
/// Adding an id already present and removing one that is absent are both
/// no-ops. Insertion order is kept.
pub struct MembershipList<'a> {
  store: &'a KeyValueStore,
  key: &'a str,
}

impl<'a> MembershipList<'a> {
  pub fn new(store: &'a KeyValueStore, key: &'a str) -> Self {
    Self { store, key }
  }

  /// Current ids in insertion order.
  pub fn ids(&self) -> Vec<String> {
    let mut ids: Vec<String> = self.store.get(self.key, Vec::new());
    let before = ids.len();
    dedup_in_order(&mut ids);
    if ids.len() != before {
      debug!("Dropped {} duplicate ids from {}", before - ids.len(), self.key);
    }
    ids
  }

  pub fn contains(&self, id: &str) -> bool {
    self.ids().iter().any(|existing| existing == id)
  }

  /// Add `id`. Returns `false` if it was already present.
  pub fn add(&self, id: &str) -> bool {
    let mut ids = self.ids();
    if ids.iter().any(|existing| existing == id) {
      return false;
    }
    ids.push(id.to_string());
    self.store.set(self.key, &ids);
    true
  }

  /// Remove `id`. Returns `false` if it wasn't present.
  pub fn remove(&self, id: &str) -> bool {
    let mut ids = self.ids();
    let before = ids.len();
    ids.retain(|existing| existing != id);
    self.store.set(self.key, &ids);
    ids.len() != before
  }

  /// Flip membership of `id`, returning whether it is now a member.
  pub fn toggle(&self, id: &str) -> bool {
    if self.remove(id) {
      false
    } else {
      self.add(id)
    }
  }

  /// Drop every id. The list reads as empty afterwards.
  pub fn clear(&self) {
    self.store.remove(self.key);
  }
}

fn dedup_in_order(ids: &mut Vec<String>) {
  let mut seen = std::collections::HashSet::new();
  ids.retain(|id| seen.insert(id.clone()));
}
