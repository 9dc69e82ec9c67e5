//! Single-slot result cache.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::key::CacheKey;

/// One cached result window tagged with the key of the query that produced it.
///
/// Records are shared behind an `Arc`, so cloning an entry is cheap and an
/// entry handed out to a caller can never be mutated afterwards.
#[derive(Debug)]
pub struct CacheEntry<T> {
  key: CacheKey,
  records: Arc<[T]>,
  total: u64,
  fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
  pub fn new(key: CacheKey, records: Vec<T>, total: u64) -> Self {
    Self {
      key,
      records: records.into(),
      total,
      fetched_at: Utc::now(),
    }
  }

  pub fn key(&self) -> &CacheKey {
    &self.key
  }

  pub fn records(&self) -> &[T] {
    &self.records
  }

  /// Total reported by the source, uncapped
  pub fn total(&self) -> u64 {
    self.total
  }

  pub fn fetched_at(&self) -> DateTime<Utc> {
    self.fetched_at
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}

impl<T> Clone for CacheEntry<T> {
  fn clone(&self) -> Self {
    Self {
      key: self.key.clone(),
      records: Arc::clone(&self.records),
      total: self.total,
      fetched_at: self.fetched_at,
    }
  }
}

/// Holds zero or one [`CacheEntry`].
///
/// There is no eviction: a `set` replaces the previous entry wholesale and
/// `invalidate` empties the slot.
#[derive(Debug)]
pub struct ResultCache<T> {
  entry: Option<CacheEntry<T>>,
}

impl<T> Default for ResultCache<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> ResultCache<T> {
  pub fn new() -> Self {
    Self { entry: None }
  }

  pub fn get(&self) -> Option<&CacheEntry<T>> {
    self.entry.as_ref()
  }

  /// Return the entry only if it was produced by `key`
  pub fn get_for(&self, key: &CacheKey) -> Option<&CacheEntry<T>> {
    self.entry.as_ref().filter(|entry| entry.key() == key)
  }

  pub fn set(&mut self, key: CacheKey, records: Vec<T>, total: u64) {
    self.entry = Some(CacheEntry::new(key, records, total));
  }

  pub fn put(&mut self, entry: CacheEntry<T>) {
    self.entry = Some(entry);
  }

  pub fn invalidate(&mut self) {
    self.entry = None;
  }
}
