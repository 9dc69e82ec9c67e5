//! SQLite product table.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

use crate::cache::Window;
use crate::catalog::{
  Category, NewProduct, PageRequest, Product, ProductPatch, ProductSource, ProductStatus,
  QueryFilter, SortField, SortSpec,
};
use crate::error::RemoteError;

use super::seed::{sample_products, SEED_BATCH_SIZE};

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("product {0} not found")]
  NotFound(u64),

  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),
}

const PRODUCTS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    price INTEGER NOT NULL CHECK (price >= 0),
    stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
    status TEXT NOT NULL DEFAULT 'active',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);
CREATE INDEX IF NOT EXISTS idx_products_status ON products(status);
"#;

const COLUMNS: &str = "id, name, category, price, stock, status, created_at, updated_at";

impl ToSql for Category {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(ToSqlOutput::from(self.as_str()))
  }
}

impl FromSql for Category {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    value
      .as_str()?
      .parse()
      .map_err(|e| FromSqlError::Other(Box::new(e)))
  }
}

impl ToSql for ProductStatus {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(ToSqlOutput::from(self.as_str()))
  }
}

impl FromSql for ProductStatus {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    value
      .as_str()?
      .parse()
      .map_err(|e| FromSqlError::Other(Box::new(e)))
  }
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
  Ok(Product {
    id: row.get(0)?,
    name: row.get(1)?,
    category: row.get(2)?,
    price: row.get(3)?,
    stock: row.get(4)?,
    status: row.get(5)?,
    created_at: row.get(6)?,
    updated_at: row.get(7)?,
  })
}

/// `%`, `_` and the escape char itself match literally
fn like_pattern(term: &str) -> String {
  let mut pattern = String::with_capacity(term.len() + 2);
  pattern.push('%');
  for c in term.chars() {
    if matches!(c, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}

/// WHERE clause and its bound values for a filter
fn where_clause(filter: &QueryFilter) -> (String, Vec<Value>) {
  let mut clauses = Vec::new();
  let mut values = Vec::new();

  if let Some(term) = filter.name_term() {
    // SQLite's lower() folds ASCII only; the term is folded the same way
    clauses.push("lower(name) LIKE ? ESCAPE '\\'");
    values.push(Value::Text(like_pattern(&term.to_ascii_lowercase())));
  }
  if let Some(category) = filter.category {
    clauses.push("category = ?");
    values.push(Value::Text(category.as_str().to_string()));
  }
  if let Some(status) = filter.status {
    clauses.push("status = ?");
    values.push(Value::Text(status.as_str().to_string()));
  }

  if clauses.is_empty() {
    (String::new(), values)
  } else {
    (format!(" WHERE {}", clauses.join(" AND ")), values)
  }
}

fn order_clause(sort: &SortSpec) -> String {
  let field = sort.effective_field();
  let order = sort.effective_order().sql();
  if field == SortField::Id {
    format!(" ORDER BY id {}", order)
  } else {
    format!(" ORDER BY {} {}, id ASC", field.column(), order)
  }
}

/// Product table behind a single connection
pub struct ProductStore {
  conn: Mutex<Connection>,
}

impl ProductStore {
  /// Open or create the database at `path`
  pub fn open(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      // Surfaces as a SQLite open error below if this fails
      let _ = std::fs::create_dir_all(parent);
    }
    Self::with_connection(Connection::open(path)?)
  }

  pub fn in_memory() -> Result<Self, StoreError> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> Result<Self, StoreError> {
    conn.execute_batch(PRODUCTS_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  // Statements either complete or roll back, so a poisoned lock is still usable
  fn conn(&self) -> MutexGuard<'_, Connection> {
    self.conn.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn count(&self) -> Result<u64, StoreError> {
    let conn = self.conn();
    Ok(conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?)
  }

  /// One page of matches plus the total match count
  pub fn query(
    &self,
    filter: &QueryFilter,
    sort: &SortSpec,
    page: PageRequest,
  ) -> Result<(Vec<Product>, u64), StoreError> {
    let (where_sql, mut values) = where_clause(filter);
    let conn = self.conn();

    let total: u64 = conn.query_row(
      &format!("SELECT COUNT(*) FROM products{}", where_sql),
      params_from_iter(values.iter()),
      |row| row.get(0),
    )?;

    let sql = format!(
      "SELECT {} FROM products{}{} LIMIT ? OFFSET ?",
      COLUMNS,
      where_sql,
      order_clause(sort)
    );
    values.push(Value::Integer(i64::from(page.page_size)));
    values.push(Value::Integer(
      i64::try_from(page.offset()).unwrap_or(i64::MAX),
    ));

    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
      .query_map(params_from_iter(values.iter()), product_from_row)?
      .collect::<Result<Vec<_>, _>>()?;

    debug!(total, returned = records.len(), offset = page.offset(), "store query");
    Ok((records, total))
  }

  pub fn get(&self, id: u64) -> Result<Product, StoreError> {
    let conn = self.conn();
    conn
      .query_row(
        &format!("SELECT {} FROM products WHERE id = ?", COLUMNS),
        params![id],
        product_from_row,
      )
      .optional()?
      .ok_or(StoreError::NotFound(id))
  }

  pub fn insert(&self, product: &NewProduct, today: NaiveDate) -> Result<Product, StoreError> {
    let conn = self.conn();
    conn.execute(
      "INSERT INTO products (name, category, price, stock, status, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
      params![
        product.name,
        product.category,
        product.price,
        product.stock.unwrap_or(0),
        product.status.unwrap_or(ProductStatus::Active),
        today,
      ],
    )?;
    let id = conn.last_insert_rowid();
    drop(conn);
    self.get(u64::try_from(id).unwrap_or_default())
  }

  /// Insert fully specified rows, keeping their dates. Ids are assigned.
  pub fn insert_many(&self, products: &[Product]) -> Result<usize, StoreError> {
    let mut conn = self.conn();
    let tx = conn.transaction()?;
    {
      let mut stmt = tx.prepare(
        "INSERT INTO products (name, category, price, stock, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
      )?;
      for p in products {
        stmt.execute(params![
          p.name,
          p.category,
          p.price,
          p.stock,
          p.status,
          p.created_at,
          p.updated_at,
        ])?;
      }
    }
    tx.commit()?;
    Ok(products.len())
  }

  /// Insert the sample products when the table is empty. Returns the number
  /// of rows inserted.
  pub fn seed_if_empty(&self) -> Result<usize, StoreError> {
    if self.count()? > 0 {
      return Ok(0);
    }
    self.insert_many(&sample_products())
  }

  /// Drop every row, restart ids at 1, then insert `products` in batches
  pub fn replace_all(&self, products: &[Product]) -> Result<usize, StoreError> {
    {
      let conn = self.conn();
      conn.execute("DELETE FROM products", [])?;
      // Absent until the first insert, in which case there is nothing to reset
      let _ = conn.execute("DELETE FROM sqlite_sequence WHERE name = 'products'", []);
    }
    let mut inserted = 0;
    for batch in products.chunks(SEED_BATCH_SIZE) {
      inserted += self.insert_many(batch)?;
      debug!(inserted, total = products.len(), "seeded batch");
    }
    Ok(inserted)
  }

  /// Apply the set fields of `patch`; an empty name leaves the name alone.
  /// `updated_at` always becomes `today`.
  pub fn update(
    &self,
    id: u64,
    patch: &ProductPatch,
    today: NaiveDate,
  ) -> Result<Product, StoreError> {
    let conn = self.conn();
    let changed = conn.execute(
      "UPDATE products SET
         name = COALESCE(?2, name),
         category = COALESCE(?3, category),
         price = COALESCE(?4, price),
         stock = COALESCE(?5, stock),
         status = COALESCE(?6, status),
         updated_at = ?7
       WHERE id = ?1",
      params![
        id,
        patch.name.as_deref().filter(|n| !n.trim().is_empty()),
        patch.category,
        patch.price,
        patch.stock,
        patch.status,
        today,
      ],
    )?;
    drop(conn);
    if changed == 0 {
      return Err(StoreError::NotFound(id));
    }
    self.get(id)
  }

  pub fn delete(&self, id: u64) -> Result<Product, StoreError> {
    let product = self.get(id)?;
    self.conn().execute("DELETE FROM products WHERE id = ?", params![id])?;
    Ok(product)
  }

  /// Remove the listed ids that exist, returning those, in request order
  pub fn delete_many(&self, ids: &[u64]) -> Result<Vec<u64>, StoreError> {
    let mut conn = self.conn();
    let tx = conn.transaction()?;
    let mut deleted = Vec::new();
    {
      let mut stmt = tx.prepare("DELETE FROM products WHERE id = ?")?;
      for &id in ids {
        if stmt.execute(params![id])? > 0 {
          deleted.push(id);
        }
      }
    }
    tx.commit()?;
    Ok(deleted)
  }
}

fn today() -> NaiveDate {
  Local::now().date_naive()
}

impl From<StoreError> for RemoteError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::NotFound(id) => RemoteError::Status {
        status: 404,
        message: format!("product {} not found", id),
      },
      other => RemoteError::store(other),
    }
  }
}

/// Lets the TUI and the export command run against a local database
#[async_trait]
impl ProductSource for ProductStore {
  async fn query(
    &self,
    filter: &QueryFilter,
    sort: &SortSpec,
    page: PageRequest,
  ) -> Result<Window<Product>, RemoteError> {
    let (records, total) = ProductStore::query(self, filter, sort, page)?;
    Ok(Window::new(records, total))
  }

  async fn get(&self, id: u64) -> Result<Product, RemoteError> {
    Ok(ProductStore::get(self, id)?)
  }

  async fn create(&self, product: &NewProduct) -> Result<Product, RemoteError> {
    Ok(self.insert(product, today())?)
  }

  async fn update(&self, id: u64, patch: &ProductPatch) -> Result<Product, RemoteError> {
    Ok(ProductStore::update(self, id, patch, today())?)
  }

  async fn delete(&self, id: u64) -> Result<Product, RemoteError> {
    Ok(ProductStore::delete(self, id)?)
  }

  async fn delete_many(&self, ids: &[u64]) -> Result<Vec<u64>, RemoteError> {
    Ok(ProductStore::delete_many(self, ids)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::SortOrder;
  use crate::server::seed::generate_products;

  fn seeded() -> ProductStore {
    let store = ProductStore::in_memory().unwrap();
    store.insert_many(&sample_products()).unwrap();
    store
  }

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn ids(products: &[Product]) -> Vec<u64> {
    products.iter().map(|p| p.id).collect()
  }

  #[test]
  fn test_unfiltered_query_pages_by_id() {
    let store = seeded();
    let (page1, total) = store
      .query(&QueryFilter::default(), &SortSpec::default(), PageRequest::new(1, 10))
      .unwrap();
    let (page3, _) = store
      .query(&QueryFilter::default(), &SortSpec::default(), PageRequest::new(3, 10))
      .unwrap();

    assert_eq!(total, 20);
    assert_eq!(ids(&page1), (1..=10).collect::<Vec<_>>());
    assert!(page3.is_empty());
  }

  #[test]
  fn test_filters_combine_and_count_matches() {
    let store = seeded();
    let filter = QueryFilter {
      category: Some(Category::Electronics),
      status: Some(ProductStatus::Active),
      ..Default::default()
    };
    let (records, total) = store
      .query(&filter, &SortSpec::default(), PageRequest::new(1, 2))
      .unwrap();

    assert_eq!(total, 5);
    assert_eq!(records.len(), 2);
    assert!(records
      .iter()
      .all(|p| p.category == Category::Electronics && p.status == ProductStatus::Active));
  }

  #[test]
  fn test_name_filter_is_case_insensitive_substring() {
    let store = seeded();
    let filter = QueryFilter {
      name: Some("ORGANIC".to_string()),
      ..Default::default()
    };
    let (records, total) = store
      .query(&filter, &SortSpec::default(), PageRequest::new(1, 10))
      .unwrap();

    assert_eq!(total, 2);
    assert_eq!(ids(&records), vec![4, 17]);
  }

  #[test]
  fn test_like_wildcards_are_literal() {
    let store = seeded();
    let filter = QueryFilter {
      name: Some("%".to_string()),
      ..Default::default()
    };
    let (_, total) = store
      .query(&filter, &SortSpec::default(), PageRequest::new(1, 10))
      .unwrap();
    assert_eq!(total, 0);
  }

  #[test]
  fn test_sort_by_price_descending() {
    let store = seeded();
    let sort = SortSpec::new(SortField::Price, SortOrder::Descending);
    let (records, _) = store
      .query(&QueryFilter::default(), &sort, PageRequest::new(1, 3))
      .unwrap();

    assert_eq!(ids(&records), vec![1, 2, 15]);
  }

  #[test]
  fn test_sort_ties_broken_by_id() {
    let store = ProductStore::in_memory().unwrap();
    let new = NewProduct {
      name: "Same price".to_string(),
      category: Category::Books,
      price: 1000,
      stock: None,
      status: None,
    };
    for _ in 0..3 {
      store.insert(&new, date(2024, 5, 1)).unwrap();
    }
    let sort = SortSpec::new(SortField::Price, SortOrder::Descending);
    let (records, _) = store
      .query(&QueryFilter::default(), &sort, PageRequest::new(1, 10))
      .unwrap();
    assert_eq!(ids(&records), vec![1, 2, 3]);
  }

  #[test]
  fn test_insert_applies_defaults() {
    let store = ProductStore::in_memory().unwrap();
    let created = store
      .insert(
        &NewProduct {
          name: "Matcha set".to_string(),
          category: Category::Food,
          price: 8500,
          stock: None,
          status: None,
        },
        date(2024, 6, 1),
      )
      .unwrap();

    assert_eq!(created.id, 1);
    assert_eq!(created.stock, 0);
    assert_eq!(created.status, ProductStatus::Active);
    assert_eq!(created.created_at, date(2024, 6, 1));
    assert_eq!(created.updated_at, date(2024, 6, 1));
  }

  #[test]
  fn test_update_only_touches_set_fields() {
    let store = seeded();
    let patch = ProductPatch {
      name: Some(String::new()),
      stock: Some(0),
      status: Some(ProductStatus::Soldout),
      ..Default::default()
    };
    let updated = store.update(1, &patch, date(2024, 12, 24)).unwrap();

    assert_eq!(updated.name, "MacBook Pro 14-inch");
    assert_eq!(updated.price, 298_000);
    assert_eq!(updated.stock, 0);
    assert_eq!(updated.status, ProductStatus::Soldout);
    assert_eq!(updated.created_at, date(2024, 1, 15));
    assert_eq!(updated.updated_at, date(2024, 12, 24));
  }

  #[test]
  fn test_missing_rows_are_not_found() {
    let store = seeded();
    assert!(matches!(store.get(999), Err(StoreError::NotFound(999))));
    assert!(matches!(
      store.update(999, &ProductPatch::default(), date(2024, 1, 1)),
      Err(StoreError::NotFound(999))
    ));
    assert!(matches!(store.delete(999), Err(StoreError::NotFound(999))));
  }

  #[test]
  fn test_delete_many_reports_existing_ids() {
    let store = seeded();
    let deleted = store.delete_many(&[3, 999, 5]).unwrap();
    assert_eq!(deleted, vec![3, 5]);
    assert_eq!(store.count().unwrap(), 18);
  }

  #[test]
  fn test_seed_only_fills_empty_table() {
    let store = ProductStore::in_memory().unwrap();
    assert_eq!(store.seed_if_empty().unwrap(), 20);
    assert_eq!(store.seed_if_empty().unwrap(), 0);
    assert_eq!(store.count().unwrap(), 20);
  }

  #[test]
  fn test_replace_all_restarts_ids() {
    let store = seeded();
    store.delete(20).unwrap();
    assert_eq!(store.replace_all(&generate_products(250)).unwrap(), 250);

    let (records, total) = store
      .query(&QueryFilter::default(), &SortSpec::default(), PageRequest::new(1, 1))
      .unwrap();
    assert_eq!(total, 250);
    assert_eq!(records[0].id, 1);
  }

  #[tokio::test]
  async fn test_store_as_product_source() {
    let store = seeded();
    let source: &dyn ProductSource = &store;
    let window = source
      .query(
        &QueryFilter::default(),
        &SortSpec::default(),
        PageRequest::window(1000),
      )
      .await
      .unwrap();
    assert_eq!(window.records.len(), 20);
    assert_eq!(window.total, 20);

    let err = source.get(999).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
  }
}
