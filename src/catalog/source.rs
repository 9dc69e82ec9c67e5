//! The data source seam between the cache core and whatever holds the products.

use async_trait::async_trait;

use crate::cache::Window;
use crate::error::RemoteError;

use super::types::{NewProduct, Product, ProductPatch, QueryFilter, SortSpec};

/// Server-side page request. 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page: u32,
  pub page_size: u32,
}

impl PageRequest {
  pub fn new(page: u32, page_size: u32) -> Self {
    Self { page, page_size }
  }

  /// The first `limit` records as a single page
  pub fn window(limit: u32) -> Self {
    Self::new(1, limit)
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
  }
}

/// Executes product queries and writes.
///
/// Implemented by the HTTP client and by the SQLite store, so the cached
/// client and the TUI work the same against either.
#[async_trait]
pub trait ProductSource: Send + Sync {
  /// Filter, sort and count, returning one page of matches plus the total
  /// number of matches.
  async fn query(
    &self,
    filter: &QueryFilter,
    sort: &SortSpec,
    page: PageRequest,
  ) -> Result<Window<Product>, RemoteError>;

  async fn get(&self, id: u64) -> Result<Product, RemoteError>;

  async fn create(&self, product: &NewProduct) -> Result<Product, RemoteError>;

  async fn update(&self, id: u64, patch: &ProductPatch) -> Result<Product, RemoteError>;

  async fn delete(&self, id: u64) -> Result<Product, RemoteError>;

  /// Delete every listed product that exists. Returns the ids actually removed.
  async fn delete_many(&self, ids: &[u64]) -> Result<Vec<u64>, RemoteError>;
}
