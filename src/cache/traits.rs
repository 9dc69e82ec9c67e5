//! Core types shared by the result cache and its callers.

/// One materialized result window as returned by a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window<T> {
  /// Records in source order, at most the requested limit
  pub records: Vec<T>,
  /// Total number of matching records in the source, which may exceed
  /// `records.len()`
  pub total: u64,
}

impl<T> Window<T> {
  pub fn new(records: Vec<T>, total: u64) -> Self {
    Self { records, total }
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  /// Fresh data from the data source, now held by the cache.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  /// Data served from the cache without any I/O.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  /// Data fetched for a query that a newer request has since replaced.
  pub fn superseded(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Superseded,
    }
  }

  pub fn is_superseded(&self) -> bool {
    self.source == CacheSource::Superseded
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheResult<U> {
    CacheResult {
      data: f(self.data),
      source: self.source,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched from the data source and stored in the cache
  Network,
  /// Served from the cache, no fetch happened
  Cache,
  /// Fetched, but a newer request had been issued before it resolved, so
  /// the cache was left alone
  Superseded,
}

impl CacheSource {
  pub fn label(&self) -> &'static str {
    match self {
      CacheSource::Network => "fetched",
      CacheSource::Cache => "cached",
      CacheSource::Superseded => "superseded",
    }
  }
}
