//! REST backend for the product catalog.
//!
//! Serves the product API over a SQLite table. The same store doubles as an
//! in-process data source for `--local` runs.

pub mod handlers;
pub mod seed;
pub mod store;

use axum::routing::get;
use axum::Router;
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;

pub use store::{ProductStore, StoreError};

/// Routes of the product API
pub fn router(store: Arc<ProductStore>) -> Router {
  Router::new()
    .route(
      "/api/products",
      get(handlers::list_products)
        .post(handlers::create_product)
        .delete(handlers::delete_products),
    )
    .route(
      "/api/products/{id}",
      get(handlers::get_product)
        .put(handlers::update_product)
        .delete(handlers::delete_product),
    )
    .with_state(store)
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
}

/// Open the configured database, seeding it when empty unless `no_seed`
pub fn open_store(config: &Config, no_seed: bool) -> Result<ProductStore> {
  let path = config.database_path()?;
  let store = ProductStore::open(&path)
    .map_err(|e| eyre!("Failed to open database {}: {}", path.display(), e))?;

  if !no_seed {
    let seeded = store
      .seed_if_empty()
      .map_err(|e| eyre!("Failed to seed database: {}", e))?;
    if seeded > 0 {
      info!(seeded, path = %path.display(), "seeded empty database");
    }
  }
  Ok(store)
}

/// Serve the API on `bind` until the process is stopped
pub async fn serve(store: ProductStore, bind: &str) -> Result<()> {
  let listener = TcpListener::bind(bind)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", bind, e))?;

  let addr = listener
    .local_addr()
    .map_err(|e| eyre!("Failed to read bound address: {}", e))?;
  info!(%addr, "catalog API listening");

  axum::serve(listener, router(Arc::new(store)))
    .await
    .map_err(|e| eyre!("Server error: {}", e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::{
    CachedCatalogClient, CatalogClient, Category, NewProduct, PageRequest, ProductPatch,
    ProductSource, ProductStatus, QueryFilter, SortField, SortOrder, SortSpec,
  };
  use crate::config::LimitsConfig;
  use crate::error::CatalogError;

  /// Start a seeded server on an ephemeral port and return a client for it
  async fn spawn_server() -> CatalogClient {
    let store = ProductStore::in_memory().unwrap();
    store.seed_if_empty().unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, router(Arc::new(store))).await.unwrap();
    });

    CatalogClient::with_http(reqwest::Client::new(), &format!("http://{}", addr)).unwrap()
  }

  #[tokio::test]
  async fn test_list_over_http() {
    let client = spawn_server().await;
    let filter = QueryFilter {
      category: Some(Category::Food),
      ..Default::default()
    };
    let sort = SortSpec::new(SortField::Price, SortOrder::Descending);

    let response = client
      .list(&filter, &sort, PageRequest::new(1, 2))
      .await
      .unwrap();

    assert!(response.success);
    assert_eq!(response.total, 4);
    assert_eq!(response.current, 1);
    assert_eq!(response.page_size, 2);
    let ids: Vec<u64> = response.data.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![13, 12]);
  }

  #[tokio::test]
  async fn test_crud_over_http() {
    let client = spawn_server().await;

    let created = client
      .create(&NewProduct {
        name: "Hinoki cutting board".to_string(),
        category: Category::Furniture,
        price: 12_000,
        stock: Some(4),
        status: None,
      })
      .await
      .unwrap();
    assert_eq!(created.id, 21);
    assert_eq!(created.status, ProductStatus::Active);

    let updated = client
      .update(
        created.id,
        &ProductPatch {
          status: Some(ProductStatus::Inactive),
          ..Default::default()
        },
      )
      .await
      .unwrap();
    assert_eq!(updated.status, ProductStatus::Inactive);
    assert_eq!(updated.name, "Hinoki cutting board");

    let deleted = client.delete(created.id).await.unwrap();
    assert_eq!(deleted.id, created.id);

    let err = client.get(created.id).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("product not found"));
  }

  #[tokio::test]
  async fn test_bulk_delete_over_http() {
    let client = spawn_server().await;

    let deleted = client.delete_many(&[1, 2, 999]).await.unwrap();
    assert_eq!(deleted, vec![1, 2]);

    let err = client.delete_many(&[]).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
  }

  #[tokio::test]
  async fn test_invalid_query_is_bad_request() {
    let client = spawn_server().await;
    let url = client.base_url().join("api/products?pageSize=0").unwrap();

    let response = reqwest::get(url).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn test_create_without_price_is_bad_request() {
    let client = spawn_server().await;
    let url = client.base_url().join("api/products").unwrap();

    let response = reqwest::Client::new()
      .post(url)
      .json(&serde_json::json!({ "name": "No price", "category": "books" }))
      .send()
      .await
      .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn test_cached_client_over_http() {
    let client = spawn_server().await;
    let cached = CachedCatalogClient::new(Arc::new(client), LimitsConfig::default());
    let sort = SortSpec::default();

    let view = cached
      .request_view(&QueryFilter::default(), &sort, 15, 2, 10, false)
      .await
      .unwrap();
    assert_eq!(view.total, 15);
    assert_eq!(view.records.len(), 5);
    assert_eq!(view.records[0].id, 11);

    let nothing = QueryFilter {
      name: Some("does not exist".to_string()),
      ..Default::default()
    };
    let err = cached.export_all(&nothing, &sort).await.unwrap_err();
    assert!(matches!(err, CatalogError::EmptyResult));
  }
}
