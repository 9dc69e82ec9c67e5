//! Cached catalog client: the product-list view model over any data source.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::page::{display_total, slice};
use crate::cache::{CacheEntry, CacheResult, CacheSource, FetchCoordinator, PageView};
use crate::config::LimitsConfig;
use crate::error::CatalogError;
use crate::export::{export_to_file, ExportEncoder};

use super::cache::normalize;
use super::source::{PageRequest, ProductSource};
use super::types::{NewProduct, Product, ProductPatch, QueryFilter, SortSpec};

/// One rendered page of the product list
#[derive(Debug, Clone)]
pub struct ProductView {
  pub records: Vec<Product>,
  /// Match count for pagination, never above the fetch limit
  pub total: u64,
  pub page: usize,
  pub page_size: usize,
  pub source: CacheSource,
  pub fetched_at: DateTime<Utc>,
}

impl ProductView {
  pub fn is_superseded(&self) -> bool {
    self.source == CacheSource::Superseded
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
  pub path: PathBuf,
  pub records: usize,
}

/// Product data source with a single-window result cache in front.
///
/// List reads go through the fetch coordinator and are sliced locally;
/// exports bypass the cache; writes pass through and invalidate it.
#[derive(Clone)]
pub struct CachedCatalogClient {
  source: Arc<dyn ProductSource>,
  coordinator: FetchCoordinator<Product>,
  limits: LimitsConfig,
}

impl CachedCatalogClient {
  pub fn new(source: Arc<dyn ProductSource>, limits: LimitsConfig) -> Self {
    Self {
      source,
      coordinator: FetchCoordinator::new(),
      limits,
    }
  }

  pub fn limits(&self) -> &LimitsConfig {
    &self.limits
  }

  /// Make sure the cached window matches the query, fetching if needed.
  ///
  /// Invalid input fails before any I/O. The source is asked for at most
  /// `min(limit, view_hard_cap)` records.
  pub async fn ensure(
    &self,
    filter: &QueryFilter,
    sort: &SortSpec,
    limit: i64,
    force_reload: bool,
  ) -> Result<CacheResult<CacheEntry<Product>>, CatalogError> {
    let key = normalize(filter, sort, limit)?;
    let effective = u32::try_from(limit)
      .unwrap_or(u32::MAX)
      .min(self.limits.view_hard_cap);

    let result = self
      .coordinator
      .ensure(key, force_reload, || async {
        info!(limit = effective, "fetching product window");
        let window = self
          .source
          .query(filter, sort, PageRequest::window(effective))
          .await
          .inspect_err(|e| warn!(error = %e, "product fetch failed"))?;
        Ok::<_, CatalogError>(window)
      })
      .await?;

    debug!(
      key = %result.data.key().digest(),
      source = result.source.label(),
      records = result.data.len(),
      total = result.data.total(),
      "product window ready"
    );
    Ok(result)
  }

  /// Refetch the current query. The caller resets its page to 1.
  pub async fn reload(
    &self,
    filter: &QueryFilter,
    sort: &SortSpec,
    limit: i64,
  ) -> Result<CacheResult<CacheEntry<Product>>, CatalogError> {
    self.ensure(filter, sort, limit, true).await
  }

  pub fn invalidate(&self) {
    self.coordinator.invalidate();
  }

  /// Records and pagination total for one page of the list.
  pub async fn request_view(
    &self,
    filter: &QueryFilter,
    sort: &SortSpec,
    limit: i64,
    page: usize,
    page_size: usize,
    force_reload: bool,
  ) -> Result<ProductView, CatalogError> {
    let view = PageView::new(page, page_size)?;
    let result = self.ensure(filter, sort, limit, force_reload).await?;
    let entry = &result.data;
    // ensure() has validated the limit
    let fetch_limit = u32::try_from(limit).unwrap_or(u32::MAX);

    Ok(ProductView {
      records: slice(entry, view).to_vec(),
      total: display_total(entry.total(), fetch_limit),
      page: view.page(),
      page_size: view.page_size(),
      source: result.source,
      fetched_at: entry.fetched_at(),
    })
  }

  /// Every product matching the query, up to `export_hard_cap`, fetched in
  /// chunks. Never reads or writes the cache.
  pub async fn export_all(
    &self,
    filter: &QueryFilter,
    sort: &SortSpec,
  ) -> Result<Vec<Product>, CatalogError> {
    let cap = self.limits.export_hard_cap as usize;
    let chunk = self.limits.export_chunk_size.clamp(1, self.limits.export_hard_cap.max(1));
    let mut records: Vec<Product> = Vec::new();
    let mut page = 1u32;

    loop {
      let window = self
        .source
        .query(filter, sort, PageRequest::new(page, chunk))
        .await?;
      let received = window.records.len();
      let wanted = cap.saturating_sub(records.len());
      records.extend(window.records.into_iter().take(wanted));

      let reachable = usize::try_from(window.total).unwrap_or(usize::MAX).min(cap);
      if received < chunk as usize || records.len() >= reachable {
        break;
      }
      page += 1;
    }

    if records.is_empty() {
      return Err(CatalogError::EmptyResult);
    }
    info!(records = records.len(), "export collected");
    Ok(records)
  }

  /// Export the query to `path` with `encoder`.
  pub async fn request_export(
    &self,
    filter: &QueryFilter,
    sort: &SortSpec,
    encoder: &dyn ExportEncoder,
    path: &Path,
  ) -> Result<ExportSummary, CatalogError> {
    let records = self.export_all(filter, sort).await?;
    let path = export_to_file(encoder, &records, path).await?;
    Ok(ExportSummary {
      path,
      records: records.len(),
    })
  }

  /// Single product, never cached
  pub async fn get(&self, id: u64) -> Result<Product, CatalogError> {
    Ok(self.source.get(id).await?)
  }

  pub async fn create(&self, product: &NewProduct) -> Result<Product, CatalogError> {
    let created = self.source.create(product).await?;
    info!(id = created.id, "product created");
    self.invalidate();
    Ok(created)
  }

  pub async fn update(&self, id: u64, patch: &ProductPatch) -> Result<Product, CatalogError> {
    let updated = self.source.update(id, patch).await?;
    info!(id, "product updated");
    self.invalidate();
    Ok(updated)
  }

  pub async fn delete(&self, id: u64) -> Result<Product, CatalogError> {
    let deleted = self.source.delete(id).await?;
    info!(id, "product deleted");
    self.invalidate();
    Ok(deleted)
  }

  pub async fn delete_many(&self, ids: &[u64]) -> Result<Vec<u64>, CatalogError> {
    if ids.is_empty() {
      return Err(CatalogError::invalid("no products selected"));
    }
    let deleted = self.source.delete_many(ids).await?;
    info!(requested = ids.len(), deleted = deleted.len(), "products deleted");
    self.invalidate();
    Ok(deleted)
  }
}
