//! Query normalization for product list requests.

use crate::cache::{CacheKey, KeyBuilder};
use crate::error::CatalogError;

use super::types::{Category, FetchLimit, ProductStatus, QueryFilter, SortField, SortOrder, SortSpec};

const KEY_NAMESPACE: &str = "products";

/// Derive the cache key for a product list query.
///
/// Fails with `InvalidInput` when `limit` is not positive. The limit is not
/// clamped here; the coordinator applies deployment caps.
pub fn normalize(
  filter: &QueryFilter,
  sort: &SortSpec,
  limit: i64,
) -> Result<CacheKey, CatalogError> {
  let limit = FetchLimit::try_from(limit)?;
  Ok(cache_key(filter, sort, limit))
}

/// Key derivation for an already validated limit.
///
/// Fields are written in a fixed order: filter.name, filter.category,
/// filter.status, sort.field, sort.order, limit. The name term is trimmed and
/// ASCII-lowercased, the same folding SQLite's `lower()` applies, so two
/// terms share a key only when the store returns the same rows for them. An
/// empty term is the same as no term. Sorting is keyed by its effective value so an absent sort and
/// an explicit ascending-by-id sort share a key.
pub fn cache_key(filter: &QueryFilter, sort: &SortSpec, limit: FetchLimit) -> CacheKey {
  let name = filter.name_term().map(str::to_ascii_lowercase);
  KeyBuilder::new(KEY_NAMESPACE)
    .field("filter.name", name.as_deref())
    .field("filter.category", filter.category.map(|c| c.as_str()))
    .field("filter.status", filter.status.map(|s| s.as_str()))
    .field("sort.field", Some(sort.effective_field().as_str()))
    .field("sort.order", Some(sort.effective_order().as_str()))
    .field("limit", Some(&limit.to_string()))
    .build()
}

/// Loosely-typed list parameters as they arrive from a UI, CLI or query
/// string. Empty strings mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQuery {
  pub name: Option<String>,
  pub category: Option<String>,
  pub status: Option<String>,
  pub sort_field: Option<String>,
  pub sort_order: Option<String>,
  pub limit: Option<String>,
}

/// Strongly-typed form of a [`RawQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
  pub filter: QueryFilter,
  pub sort: SortSpec,
  pub limit: FetchLimit,
}

impl ParsedQuery {
  pub fn key(&self) -> CacheKey {
    cache_key(&self.filter, &self.sort, self.limit)
  }
}

fn present(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl RawQuery {
  /// Validate every field. `default_limit` applies when no limit was given.
  pub fn parse(&self, default_limit: FetchLimit) -> Result<ParsedQuery, CatalogError> {
    let filter = QueryFilter {
      name: present(&self.name).map(String::from),
      category: present(&self.category)
        .map(str::parse::<Category>)
        .transpose()?,
      status: present(&self.status)
        .map(str::parse::<ProductStatus>)
        .transpose()?,
    };
    let sort = SortSpec {
      field: present(&self.sort_field)
        .map(str::parse::<SortField>)
        .transpose()?,
      order: present(&self.sort_order)
        .map(str::parse::<SortOrder>)
        .transpose()?,
    };
    let limit = match present(&self.limit) {
      Some(raw) => raw.parse::<FetchLimit>()?,
      None => default_limit,
    };
    Ok(ParsedQuery {
      filter,
      sort,
      limit,
    })
  }
}
