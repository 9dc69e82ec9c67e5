//! Local pagination over a cached result window.

use crate::error::CatalogError;

use super::slot::CacheEntry;

/// A 1-indexed page of a given size. Ephemeral; recomputed on every render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageView {
  page: usize,
  page_size: usize,
}

impl PageView {
  pub fn new(page: usize, page_size: usize) -> Result<Self, CatalogError> {
    if page == 0 {
      return Err(CatalogError::invalid("page numbers start at 1"));
    }
    if page_size == 0 {
      return Err(CatalogError::invalid("page size must be positive"));
    }
    Ok(Self { page, page_size })
  }

  pub fn page(&self) -> usize {
    self.page
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  fn start(&self) -> usize {
    (self.page - 1).saturating_mul(self.page_size)
  }
}

/// Records shown on `view`, taken from the cached window without any I/O.
///
/// Paging past the end of the window yields an empty slice. That happens
/// when the window is capped by the fetch limit while the source reports a
/// larger total.
pub fn slice<T>(entry: &CacheEntry<T>, view: PageView) -> &[T] {
  let records = entry.records();
  let start = view.start();
  if start >= records.len() {
    return &[];
  }
  let end = start.saturating_add(view.page_size).min(records.len());
  &records[start..end]
}

/// Total used for pagination display: never more than the fetch limit.
pub fn display_total(server_total: u64, fetch_limit: u32) -> u64 {
  server_total.min(u64::from(fetch_limit))
}

/// Number of pages for `total` records, at least one.
pub fn page_count(total: u64, page_size: usize) -> usize {
  if page_size == 0 {
    return 1;
  }
  let size = page_size as u64;
  let pages = total.div_ceil(size).max(1);
  usize::try_from(pages).unwrap_or(usize::MAX)
}
