//! Fetch coordinator: decides between serving the cached window and fetching.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::key::CacheKey;
use super::slot::{CacheEntry, ResultCache};
use super::traits::{CacheResult, Window};

struct State<T> {
  slot: ResultCache<T>,
  /// Key of the most recent `ensure` call, hit or miss
  latest: Option<CacheKey>,
  /// Bumped by `invalidate`; fetches started under an older generation
  /// never reach the slot
  generation: u64,
}

/// Owns the single-slot result cache and decides when a fetch is needed.
///
/// The state lock is only taken between suspension points and never held
/// across the fetcher's `.await`, so concurrent `ensure` calls interleave
/// only at the fetch itself. Completion order is then resolved by the
/// last-issued-key rule: a fetch whose key is no longer the most recently
/// requested one is handed back to its caller as superseded and never
/// written to the cache.
pub struct FetchCoordinator<T> {
  state: Arc<Mutex<State<T>>>,
}

impl<T> Default for FetchCoordinator<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> FetchCoordinator<T> {
  pub fn new() -> Self {
    Self {
      state: Arc::new(Mutex::new(State {
        slot: ResultCache::new(),
        latest: None,
        generation: 0,
      })),
    }
  }

  // The slot is only ever replaced wholesale, so a poisoned lock still
  // guards a consistent value.
  fn lock(&self) -> MutexGuard<'_, State<T>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Return the cached window for `key`, fetching it when needed.
  ///
  /// 1. Record `key` as the most recently requested key
  /// 2. Unless `force_reload`, serve a matching cached entry with no I/O
  /// 3. Otherwise await `fetcher`; on failure the cache is left untouched
  /// 4. Store the result, unless a newer key was requested or the cache was
  ///    invalidated meanwhile
  pub async fn ensure<F, Fut, E>(
    &self,
    key: CacheKey,
    force_reload: bool,
    fetcher: F,
  ) -> Result<CacheResult<CacheEntry<T>>, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Window<T>, E>>,
  {
    let generation = {
      let mut state = self.lock();
      state.latest = Some(key.clone());
      if !force_reload {
        if let Some(entry) = state.slot.get_for(&key) {
          debug!(key = %key.digest(), "result cache hit");
          return Ok(CacheResult::from_cache(entry.clone()));
        }
      }
      state.generation
    };

    debug!(key = %key.digest(), force_reload, "result cache miss, fetching");
    let window = fetcher().await?;
    let entry = CacheEntry::new(key, window.records, window.total);

    let mut state = self.lock();
    if state.latest.as_ref() != Some(entry.key()) {
      debug!(
        key = %entry.key().digest(),
        records = entry.len(),
        "discarding response for superseded request"
      );
      return Ok(CacheResult::superseded(entry));
    }
    if state.generation != generation {
      debug!(
        key = %entry.key().digest(),
        records = entry.len(),
        "discarding response fetched before invalidation"
      );
      return Ok(CacheResult::superseded(entry));
    }
    state.slot.put(entry.clone());
    Ok(CacheResult::from_network(entry))
  }

  /// Drop the cached window; the next `ensure` fetches. Responses to
  /// fetches already in flight are not stored.
  pub fn invalidate(&self) {
    let mut state = self.lock();
    state.generation = state.generation.wrapping_add(1);
    state.slot.invalidate();
  }

  /// Snapshot of the current entry, if any
  pub fn cached(&self) -> Option<CacheEntry<T>> {
    self.lock().slot.get().cloned()
  }
}

impl<T> Clone for FetchCoordinator<T> {
  fn clone(&self) -> Self {
    Self {
      state: Arc::clone(&self.state),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::KeyBuilder;
  use std::sync::atomic::{AtomicU32, Ordering};
  use tokio::sync::oneshot;

  fn key(v: &str) -> CacheKey {
    KeyBuilder::new("test").field("q", Some(v)).build()
  }

  fn ok_window(records: Vec<u32>) -> Result<Window<u32>, String> {
    let total = records.len() as u64;
    Ok(Window::new(records, total))
  }

  #[tokio::test]
  async fn test_hit_skips_fetcher() {
    let coordinator = FetchCoordinator::new();
    let calls = AtomicU32::new(0);

    for _ in 0..2 {
      coordinator
        .ensure(key("a"), false, || async {
          calls.fetch_add(1, Ordering::SeqCst);
          ok_window(vec![1, 2])
        })
        .await
        .unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_second_call_reports_cache_source() {
    let coordinator = FetchCoordinator::new();
    let first = coordinator
      .ensure(key("a"), false, || async { ok_window(vec![1]) })
      .await
      .unwrap();
    let second = coordinator
      .ensure(key("a"), false, || async { ok_window(vec![2]) })
      .await
      .unwrap();

    assert_eq!(first.source, crate::cache::CacheSource::Network);
    assert_eq!(second.source, crate::cache::CacheSource::Cache);
    assert_eq!(second.data.records(), &[1]);
  }

  #[tokio::test]
  async fn test_force_reload_always_fetches() {
    let coordinator = FetchCoordinator::new();
    let calls = AtomicU32::new(0);

    for _ in 0..3 {
      coordinator
        .ensure(key("a"), true, || async {
          let n = calls.fetch_add(1, Ordering::SeqCst);
          ok_window(vec![n])
        })
        .await
        .unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(coordinator.cached().unwrap().records(), &[2]);
  }

  #[tokio::test]
  async fn test_key_change_fetches() {
    let coordinator = FetchCoordinator::new();
    coordinator
      .ensure(key("a"), false, || async { ok_window(vec![1]) })
      .await
      .unwrap();
    let result = coordinator
      .ensure(key("b"), false, || async { ok_window(vec![2]) })
      .await
      .unwrap();

    assert_eq!(result.source, crate::cache::CacheSource::Network);
    assert_eq!(coordinator.cached().unwrap().key(), &key("b"));
  }

  #[tokio::test]
  async fn test_failure_leaves_cache_untouched() {
    let coordinator = FetchCoordinator::new();
    coordinator
      .ensure(key("a"), false, || async { ok_window(vec![7]) })
      .await
      .unwrap();

    let err = coordinator
      .ensure(key("b"), false, || async {
        Err::<Window<u32>, _>("connection refused".to_string())
      })
      .await
      .unwrap_err();

    assert_eq!(err, "connection refused");
    let cached = coordinator.cached().unwrap();
    assert_eq!(cached.key(), &key("a"));
    assert_eq!(cached.records(), &[7]);
  }

  #[tokio::test]
  async fn test_failed_reload_keeps_stale_entry() {
    let coordinator = FetchCoordinator::new();
    coordinator
      .ensure(key("a"), false, || async { ok_window(vec![7]) })
      .await
      .unwrap();

    let result = coordinator
      .ensure(key("a"), true, || async {
        Err::<Window<u32>, _>("timeout".to_string())
      })
      .await;

    assert!(result.is_err());
    assert_eq!(coordinator.cached().unwrap().records(), &[7]);
  }

  #[tokio::test]
  async fn test_slow_older_response_is_discarded() {
    let coordinator = FetchCoordinator::new();
    let (tx_a, rx_a) = oneshot::channel::<Vec<u32>>();
    let (tx_b, rx_b) = oneshot::channel::<Vec<u32>>();

    let (started_a, wait_a) = oneshot::channel::<()>();
    let (started_b, wait_b) = oneshot::channel::<()>();

    let c = coordinator.clone();
    let task_a = tokio::spawn(async move {
      c.ensure(key("k1"), false, || async move {
        let _ = started_a.send(());
        ok_window(rx_a.await.unwrap_or_default())
      })
      .await
    });
    wait_a.await.unwrap();

    let c = coordinator.clone();
    let task_b = tokio::spawn(async move {
      c.ensure(key("k2"), false, || async move {
        let _ = started_b.send(());
        ok_window(rx_b.await.unwrap_or_default())
      })
      .await
    });
    wait_b.await.unwrap();

    // B resolves first, then A
    tx_b.send(vec![2, 2]).unwrap();
    let result_b = task_b.await.unwrap().unwrap();
    tx_a.send(vec![1]).unwrap();
    let result_a = task_a.await.unwrap().unwrap();

    assert!(!result_b.is_superseded());
    assert!(result_a.is_superseded());
    assert_eq!(result_a.data.records(), &[1]);

    let cached = coordinator.cached().unwrap();
    assert_eq!(cached.key(), &key("k2"));
    assert_eq!(cached.records(), &[2, 2]);
  }

  #[tokio::test]
  async fn test_cache_hit_supersedes_in_flight_fetch() {
    let coordinator = FetchCoordinator::new();
    coordinator
      .ensure(key("k2"), false, || async { ok_window(vec![2]) })
      .await
      .unwrap();

    let (tx, rx) = oneshot::channel::<Vec<u32>>();
    let (started, wait) = oneshot::channel::<()>();
    let c = coordinator.clone();
    let slow = tokio::spawn(async move {
      c.ensure(key("k1"), false, || async move {
        let _ = started.send(());
        ok_window(rx.await.unwrap_or_default())
      })
      .await
    });
    wait.await.unwrap();

    // User switches back to the cached query before k1 arrives
    let hit = coordinator
      .ensure(key("k2"), false, || async { ok_window(vec![99]) })
      .await
      .unwrap();
    assert_eq!(hit.data.records(), &[2]);

    tx.send(vec![1]).unwrap();
    assert!(slow.await.unwrap().unwrap().is_superseded());
    assert_eq!(coordinator.cached().unwrap().key(), &key("k2"));
  }

  #[tokio::test]
  async fn test_invalidate_forces_next_fetch() {
    let coordinator = FetchCoordinator::new();
    let calls = AtomicU32::new(0);
    let fetch = || async {
      calls.fetch_add(1, Ordering::SeqCst);
      ok_window(vec![1])
    };

    coordinator.ensure(key("a"), false, fetch).await.unwrap();
    coordinator.invalidate();
    assert!(coordinator.cached().is_none());
    coordinator.ensure(key("a"), false, fetch).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_fetch_in_flight_during_invalidate_is_not_cached() {
    let coordinator = FetchCoordinator::new();
    let (tx, rx) = oneshot::channel::<Vec<u32>>();
    let (started, wait) = oneshot::channel::<()>();

    let c = coordinator.clone();
    let in_flight = tokio::spawn(async move {
      c.ensure(key("a"), true, || async move {
        let _ = started.send(());
        ok_window(rx.await.unwrap_or_default())
      })
      .await
    });
    wait.await.unwrap();

    // A write lands while the old data is on the wire
    coordinator.invalidate();
    tx.send(vec![1]).unwrap();
    let stale = in_flight.await.unwrap().unwrap();
    assert!(stale.is_superseded());
    assert!(coordinator.cached().is_none());

    let fresh = coordinator
      .ensure(key("a"), false, || async { ok_window(vec![2]) })
      .await
      .unwrap();
    assert_eq!(fresh.source, crate::cache::CacheSource::Network);
    assert_eq!(fresh.data.records(), &[2]);
  }

  #[tokio::test]
  async fn test_fetch_started_after_invalidate_is_cached() {
    let coordinator = FetchCoordinator::new();
    coordinator.invalidate();
    coordinator
      .ensure(key("a"), false, || async { ok_window(vec![3]) })
      .await
      .unwrap();
    assert_eq!(coordinator.cached().unwrap().records(), &[3]);
  }
}
