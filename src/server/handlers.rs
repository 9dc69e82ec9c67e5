//! Product API handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;
use std::sync::Arc;
use tracing::{error, info};

use crate::catalog::api_types::{
  ApiFailure, ApiResponse, BulkDeleteRequest, BulkDeleteResponse, CreateProductRequest,
  ListParams, ProductListResponse,
};
use crate::catalog::{Product, ProductPatch};

use super::store::{ProductStore, StoreError};

const NOT_FOUND: &str = "product not found";

/// Shared handler state
pub type AppState = Arc<ProductStore>;

/// Status code plus the JSON failure body
#[derive(Debug)]
pub struct ApiError {
  pub status: StatusCode,
  pub body: ApiFailure,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (self.status, Json(self.body)).into_response()
  }
}

pub fn api_bad_request(message: impl Into<String>) -> ApiError {
  ApiError {
    status: StatusCode::BAD_REQUEST,
    body: ApiFailure::new(message),
  }
}

pub fn api_not_found() -> ApiError {
  ApiError {
    status: StatusCode::NOT_FOUND,
    body: ApiFailure::new(NOT_FOUND),
  }
}

/// Logs the cause server-side; the client only sees a generic message
pub fn api_internal(message: &str, err: &dyn std::fmt::Display) -> ApiError {
  error!(error = %err, "{}", message);
  ApiError {
    status: StatusCode::INTERNAL_SERVER_ERROR,
    body: ApiFailure::new(message),
  }
}

fn store_error(context: &str, err: StoreError) -> ApiError {
  match err {
    StoreError::NotFound(_) => api_not_found(),
    other => api_internal(context, &other),
  }
}

/// Run a store call off the async workers
async fn blocking<T, F>(store: &AppState, context: &'static str, f: F) -> Result<T, ApiError>
where
  T: Send + 'static,
  F: FnOnce(&ProductStore) -> Result<T, StoreError> + Send + 'static,
{
  let store = Arc::clone(store);
  match tokio::task::spawn_blocking(move || f(&store)).await {
    Ok(result) => result.map_err(|e| store_error(context, e)),
    Err(join) => Err(api_internal(context, &join)),
  }
}

/// Path ids that are not numbers cannot name a product
fn parse_id(raw: &str) -> Result<u64, ApiError> {
  raw.trim().parse().map_err(|_| api_not_found())
}

/// Malformed or missing JSON bodies are client errors
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
  body
    .map(|Json(value)| value)
    .map_err(|rejection| api_bad_request(rejection.body_text()))
}

/// `GET /api/products`
pub async fn list_products(
  State(store): State<AppState>,
  Query(params): Query<ListParams>,
) -> Result<Json<ProductListResponse>, ApiError> {
  let (filter, sort, page) = params
    .parse()
    .map_err(|e| api_bad_request(e.to_string()))?;

  let (data, total) = blocking(&store, "failed to list products", move |s| {
    s.query(&filter, &sort, page)
  })
  .await?;

  Ok(Json(ProductListResponse {
    data,
    total,
    success: true,
    current: page.page,
    page_size: page.page_size,
  }))
}

/// `GET /api/products/{id}`
pub async fn get_product(
  State(store): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
  let id = parse_id(&id)?;
  let product = blocking(&store, "failed to fetch product", move |s| s.get(id)).await?;
  Ok(Json(ApiResponse::ok(product)))
}

/// `POST /api/products`
pub async fn create_product(
  State(store): State<AppState>,
  body: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let new = json_body(body)?
    .into_new_product()
    .ok_or_else(|| api_bad_request("name, category and price are required"))?;

  let today = Local::now().date_naive();
  let created = blocking(&store, "failed to create product", move |s| {
    s.insert(&new, today)
  })
  .await?;

  info!(id = created.id, name = %created.name, "product created");
  Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

/// `PUT /api/products/{id}`
pub async fn update_product(
  State(store): State<AppState>,
  Path(id): Path<String>,
  body: Result<Json<ProductPatch>, JsonRejection>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
  let id = parse_id(&id)?;
  let patch = json_body(body)?;

  let today = Local::now().date_naive();
  let updated = blocking(&store, "failed to update product", move |s| {
    s.update(id, &patch, today)
  })
  .await?;

  info!(id, "product updated");
  Ok(Json(ApiResponse::ok(updated)))
}

/// `DELETE /api/products/{id}`
pub async fn delete_product(
  State(store): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
  let id = parse_id(&id)?;
  let deleted = blocking(&store, "failed to delete product", move |s| s.delete(id)).await?;

  info!(id, "product deleted");
  Ok(Json(ApiResponse::ok(deleted)))
}

/// `DELETE /api/products` with `{ids: [...]}`
pub async fn delete_products(
  State(store): State<AppState>,
  body: Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
  let ids = json_body(body)
    .ok()
    .and_then(|req| req.ids)
    .filter(|ids| !ids.is_empty())
    .ok_or_else(|| api_bad_request("ids must list at least one product"))?;

  let requested = ids.len();
  let deleted_ids = blocking(&store, "failed to delete products", move |s| {
    s.delete_many(&ids)
  })
  .await?;

  info!(requested, deleted = deleted_ids.len(), "bulk delete");
  Ok(Json(BulkDeleteResponse {
    deleted_ids,
    success: true,
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_helpers_build_expected_statuses() {
    let bad = api_bad_request("bad");
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert!(!bad.body.success);
    assert_eq!(bad.body.message, "bad");

    let missing = api_not_found();
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body.message, NOT_FOUND);

    let internal = api_internal("storage failed", &"disk full");
    assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(internal.body.message, "storage failed");
  }

  #[test]
  fn test_store_errors_map_to_statuses() {
    let not_found = store_error("ctx", StoreError::NotFound(3));
    assert_eq!(not_found.status, StatusCode::NOT_FOUND);

    let sqlite = store_error(
      "ctx",
      StoreError::Sqlite(rusqlite::Error::InvalidQuery),
    );
    assert_eq!(sqlite.status, StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn test_non_numeric_id_is_not_found() {
    assert_eq!(parse_id(" 12 ").unwrap(), 12);
    assert_eq!(parse_id("abc").unwrap_err().status, StatusCode::NOT_FOUND);
  }
}
