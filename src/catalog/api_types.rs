//! Serde types matching the product REST API wire format.
//!
//! Shared by the HTTP client and the axum backend so both sides agree on
//! field names. Domain types stay in `types`.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

use super::source::PageRequest;
use super::types::{
  Category, NewProduct, Product, ProductStatus, QueryFilter, SortField, SortOrder, SortSpec,
};

/// Largest page the backend will serve in one response
pub const MAX_PAGE_SIZE: u32 = 100_000;

const DEFAULT_PAGE_SIZE: u32 = 10;

// ============================================================================
// Response envelopes
// ============================================================================

/// `GET /api/products`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
  #[serde(default)]
  pub data: Vec<Product>,
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub success: bool,
  #[serde(default)]
  pub current: u32,
  #[serde(default)]
  pub page_size: u32,
}

/// Single-record responses: detail, create, update, delete
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
  pub data: T,
  #[serde(default)]
  pub success: bool,
}

impl<T> ApiResponse<T> {
  pub fn ok(data: T) -> Self {
    Self {
      data,
      success: true,
    }
  }
}

/// Body of every non-2xx response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiFailure {
  #[serde(default)]
  pub success: bool,
  #[serde(default)]
  pub message: String,
}

impl ApiFailure {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      success: false,
      message: message.into(),
    }
  }
}

// ============================================================================
// Requests
// ============================================================================

/// Query string of `GET /api/products`. Everything arrives as text and is
/// validated by [`ListParams::parse`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  pub current: Option<String>,
  pub page_size: Option<String>,
  pub name: Option<String>,
  pub category: Option<String>,
  pub status: Option<String>,
  pub sort_field: Option<String>,
  pub sort_order: Option<String>,
}

impl ListParams {
  pub fn new(filter: &QueryFilter, sort: &SortSpec, page: PageRequest) -> Self {
    Self {
      current: Some(page.page.to_string()),
      page_size: Some(page.page_size.to_string()),
      name: filter.name_term().map(String::from),
      category: filter.category.map(|c| c.as_str().to_string()),
      status: filter.status.map(|s| s.as_str().to_string()),
      sort_field: sort.field.map(|f| f.as_str().to_string()),
      sort_order: sort.order.map(|o| o.as_str().to_string()),
    }
  }

  /// Non-empty parameters as query pairs, in a stable order
  pub fn to_pairs(&self) -> Vec<(&'static str, &str)> {
    let fields: [(&'static str, &Option<String>); 7] = [
      ("current", &self.current),
      ("pageSize", &self.page_size),
      ("name", &self.name),
      ("category", &self.category),
      ("status", &self.status),
      ("sortField", &self.sort_field),
      ("sortOrder", &self.sort_order),
    ];
    fields
      .into_iter()
      .filter_map(|(name, value)| {
        value
          .as_deref()
          .filter(|v| !v.trim().is_empty())
          .map(|v| (name, v))
      })
      .collect()
  }

  /// Validate into typed filter, sort and page. Missing paging defaults to
  /// page 1 of 10; the page size is capped at [`MAX_PAGE_SIZE`].
  pub fn parse(&self) -> Result<(QueryFilter, SortSpec, PageRequest), CatalogError> {
    let page = parse_positive(self.current.as_deref(), "current")?.unwrap_or(1);
    let page_size = parse_positive(self.page_size.as_deref(), "pageSize")?
      .unwrap_or(DEFAULT_PAGE_SIZE)
      .min(MAX_PAGE_SIZE);

    let filter = QueryFilter {
      name: self.name.clone().filter(|n| !n.trim().is_empty()),
      category: non_empty(&self.category)
        .map(str::parse::<Category>)
        .transpose()?,
      status: non_empty(&self.status)
        .map(str::parse::<ProductStatus>)
        .transpose()?,
    };
    let sort = SortSpec {
      field: non_empty(&self.sort_field)
        .map(str::parse::<SortField>)
        .transpose()?,
      order: non_empty(&self.sort_order)
        .map(str::parse::<SortOrder>)
        .transpose()?,
    };
    Ok((filter, sort, PageRequest::new(page, page_size)))
  }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_positive(value: Option<&str>, name: &str) -> Result<Option<u32>, CatalogError> {
  let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
    return Ok(None);
  };
  match raw.parse::<u32>() {
    Ok(0) | Err(_) => Err(CatalogError::invalid(format!(
      "{} must be a positive integer, got '{}'",
      name, raw
    ))),
    Ok(n) => Ok(Some(n)),
  }
}

/// Body of `POST /api/products`. Required fields are optional here so a
/// missing one is reported as a 400 rather than a deserialization error.
#[derive(Debug, Default, Deserialize)]
pub struct CreateProductRequest {
  pub name: Option<String>,
  pub category: Option<Category>,
  pub price: Option<u64>,
  pub stock: Option<u64>,
  pub status: Option<ProductStatus>,
}

impl CreateProductRequest {
  pub fn into_new_product(self) -> Option<NewProduct> {
    let name = self.name.filter(|n| !n.trim().is_empty())?;
    Some(NewProduct {
      name,
      category: self.category?,
      price: self.price?,
      stock: self.stock,
      status: self.status,
    })
  }
}

/// Body of `DELETE /api/products`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BulkDeleteRequest {
  #[serde(default)]
  pub ids: Option<Vec<u64>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
  #[serde(default)]
  pub deleted_ids: Vec<u64>,
  #[serde(default)]
  pub success: bool,
}
