use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::error::CatalogError;

/// Product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  Electronics,
  Clothing,
  Food,
  Furniture,
  Books,
}

impl Category {
  pub const ALL: [Category; 5] = [
    Category::Electronics,
    Category::Clothing,
    Category::Food,
    Category::Furniture,
    Category::Books,
  ];

  /// Wire value
  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Electronics => "electronics",
      Category::Clothing => "clothing",
      Category::Food => "food",
      Category::Furniture => "furniture",
      Category::Books => "books",
    }
  }

  /// Human-readable label used in tables and exports
  pub fn label(&self) -> &'static str {
    match self {
      Category::Electronics => "Electronics",
      Category::Clothing => "Clothing",
      Category::Food => "Food",
      Category::Furniture => "Furniture",
      Category::Books => "Books",
    }
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Category {
  type Err = CatalogError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_lowercase();
    Category::ALL
      .into_iter()
      .find(|c| c.as_str() == wanted)
      .ok_or_else(|| CatalogError::invalid(format!("unknown category '{}'", s)))
  }
}

/// Lifecycle status of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
  Active,
  Inactive,
  Soldout,
}

impl ProductStatus {
  pub const ALL: [ProductStatus; 3] = [
    ProductStatus::Active,
    ProductStatus::Inactive,
    ProductStatus::Soldout,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ProductStatus::Active => "active",
      ProductStatus::Inactive => "inactive",
      ProductStatus::Soldout => "soldout",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      ProductStatus::Active => "On sale",
      ProductStatus::Inactive => "Hidden",
      ProductStatus::Soldout => "Sold out",
    }
  }
}

impl fmt::Display for ProductStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ProductStatus {
  type Err = CatalogError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_lowercase();
    ProductStatus::ALL
      .into_iter()
      .find(|st| st.as_str() == wanted)
      .ok_or_else(|| CatalogError::invalid(format!("unknown status '{}'", s)))
  }
}

/// A catalog record. Read-only from the client's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: u64,
  pub name: String,
  pub category: Category,
  pub price: u64,
  pub stock: u64,
  pub status: ProductStatus,
  pub created_at: NaiveDate,
  pub updated_at: NaiveDate,
}

/// Fields for creating a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
  pub name: String,
  pub category: Category,
  pub price: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stock: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<ProductStatus>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<Category>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub price: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stock: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<ProductStatus>,
}

/// Row filter. No field set matches every product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
  /// Case-insensitive substring of the product name
  pub name: Option<String>,
  pub category: Option<Category>,
  pub status: Option<ProductStatus>,
}

impl QueryFilter {
  /// The name term with surrounding whitespace removed.
  /// Empty and whitespace-only terms count as absent.
  pub fn name_term(&self) -> Option<&str> {
    self
      .name
      .as_deref()
      .map(str::trim)
      .filter(|term| !term.is_empty())
  }

  pub fn is_empty(&self) -> bool {
    self.name_term().is_none() && self.category.is_none() && self.status.is_none()
  }

  /// In-memory equivalent of the store's filter. Case folding is ASCII only,
  /// as in SQLite.
  pub fn matches(&self, product: &Product) -> bool {
    if let Some(term) = self.name_term() {
      let name = product.name.to_ascii_lowercase();
      if !name.contains(&term.to_ascii_lowercase()) {
        return false;
      }
    }
    if self.category.is_some_and(|c| c != product.category) {
      return false;
    }
    if self.status.is_some_and(|s| s != product.status) {
      return false;
    }
    true
  }
}

/// Sortable columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
  Id,
  Price,
  Stock,
  CreatedAt,
}

impl SortField {
  pub const ALL: [SortField; 4] = [
    SortField::Id,
    SortField::Price,
    SortField::Stock,
    SortField::CreatedAt,
  ];

  /// Wire value (`sortField`)
  pub fn as_str(&self) -> &'static str {
    match self {
      SortField::Id => "id",
      SortField::Price => "price",
      SortField::Stock => "stock",
      SortField::CreatedAt => "createdAt",
    }
  }

  /// Store column
  pub fn column(&self) -> &'static str {
    match self {
      SortField::Id => "id",
      SortField::Price => "price",
      SortField::Stock => "stock",
      SortField::CreatedAt => "created_at",
    }
  }
}

impl fmt::Display for SortField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SortField {
  type Err = CatalogError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "id" => Ok(SortField::Id),
      "price" => Ok(SortField::Price),
      "stock" => Ok(SortField::Stock),
      "createdAt" | "created_at" => Ok(SortField::CreatedAt),
      other => Err(CatalogError::invalid(format!(
        "cannot sort by '{}' (allowed: id, price, stock, createdAt)",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
  #[default]
  Ascending,
  Descending,
}

impl SortOrder {
  /// Wire value (`sortOrder`)
  pub fn as_str(&self) -> &'static str {
    match self {
      SortOrder::Ascending => "ascend",
      SortOrder::Descending => "descend",
    }
  }

  pub fn sql(&self) -> &'static str {
    match self {
      SortOrder::Ascending => "ASC",
      SortOrder::Descending => "DESC",
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      SortOrder::Ascending => SortOrder::Descending,
      SortOrder::Descending => SortOrder::Ascending,
    }
  }
}

impl fmt::Display for SortOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SortOrder {
  type Err = CatalogError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "asc" | "ascend" | "ascending" => Ok(SortOrder::Ascending),
      "desc" | "descend" | "descending" => Ok(SortOrder::Descending),
      other => Err(CatalogError::invalid(format!(
        "unknown sort order '{}'",
        other
      ))),
    }
  }
}

/// Requested ordering. Absent parts default to ascending by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSpec {
  pub field: Option<SortField>,
  pub order: Option<SortOrder>,
}

impl SortSpec {
  pub fn new(field: SortField, order: SortOrder) -> Self {
    Self {
      field: Some(field),
      order: Some(order),
    }
  }

  pub fn effective_field(&self) -> SortField {
    self.field.unwrap_or(SortField::Id)
  }

  pub fn effective_order(&self) -> SortOrder {
    self.order.unwrap_or_default()
  }
}

/// Upper bound on the number of products in scope for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchLimit(NonZeroU32);

impl FetchLimit {
  pub fn new(limit: u32) -> Option<Self> {
    NonZeroU32::new(limit).map(Self)
  }

  pub fn get(&self) -> u32 {
    self.0.get()
  }

  /// The smaller of this limit and a deployment cap
  pub fn capped(&self, cap: u32) -> u32 {
    self.get().min(cap)
  }
}

impl TryFrom<i64> for FetchLimit {
  type Error = CatalogError;

  fn try_from(value: i64) -> Result<Self, Self::Error> {
    if value <= 0 {
      return Err(CatalogError::invalid(format!(
        "fetch limit must be a positive integer, got {}",
        value
      )));
    }
    u32::try_from(value)
      .ok()
      .and_then(FetchLimit::new)
      .ok_or_else(|| CatalogError::invalid(format!("fetch limit {} is too large", value)))
  }
}

impl FromStr for FetchLimit {
  type Err = CatalogError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let value: i64 = s
      .trim()
      .parse()
      .map_err(|_| CatalogError::invalid(format!("fetch limit '{}' is not an integer", s)))?;
    FetchLimit::try_from(value)
  }
}

impl fmt::Display for FetchLimit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.get())
  }
}
