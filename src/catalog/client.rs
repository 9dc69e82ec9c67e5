use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::cache::Window;
use crate::config::Config;
use crate::error::RemoteError;

use super::api_types::{
  ApiFailure, ApiResponse, BulkDeleteRequest, BulkDeleteResponse, ListParams, ProductListResponse,
};
use super::source::{PageRequest, ProductSource};
use super::types::{NewProduct, Product, ProductPatch, QueryFilter, SortSpec};

/// Product REST API client
#[derive(Clone)]
pub struct CatalogClient {
  http: reqwest::Client,
  base: Url,
}

impl CatalogClient {
  pub fn new(config: &Config) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.api.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;
    Self::with_http(http, &config.api.url)
  }

  pub fn with_http(http: reqwest::Client, base_url: &str) -> Result<Self> {
    // Url::join drops the last path segment unless it ends with '/'
    let normalized = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };
    let base = Url::parse(&normalized).map_err(|e| eyre!("Invalid API URL {}: {}", base_url, e))?;
    Ok(Self { http, base })
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
    self
      .base
      .join(path)
      .map_err(|e| RemoteError::Decode(format!("bad endpoint {}: {}", path, e)))
  }

  fn product_url(&self, id: u64) -> Result<Url, RemoteError> {
    self.endpoint(&format!("api/products/{}", id))
  }

  /// List one server-side page of products
  pub async fn list(
    &self,
    filter: &QueryFilter,
    sort: &SortSpec,
    page: PageRequest,
  ) -> Result<ProductListResponse, RemoteError> {
    let params = ListParams::new(filter, sort, page);
    let url = self.endpoint("api/products")?;
    debug!(%url, page = page.page, page_size = page.page_size, "listing products");

    let response = self.http.get(url).query(&params.to_pairs()).send().await?;
    decode(response).await
  }
}

#[async_trait]
impl ProductSource for CatalogClient {
  async fn query(
    &self,
    filter: &QueryFilter,
    sort: &SortSpec,
    page: PageRequest,
  ) -> Result<Window<Product>, RemoteError> {
    let response = self.list(filter, sort, page).await?;
    Ok(Window::new(response.data, response.total))
  }

  async fn get(&self, id: u64) -> Result<Product, RemoteError> {
    let response = self.http.get(self.product_url(id)?).send().await?;
    let body: ApiResponse<Product> = decode(response).await?;
    Ok(body.data)
  }

  async fn create(&self, product: &NewProduct) -> Result<Product, RemoteError> {
    let response = self
      .http
      .post(self.endpoint("api/products")?)
      .json(product)
      .send()
      .await?;
    let body: ApiResponse<Product> = decode(response).await?;
    Ok(body.data)
  }

  async fn update(&self, id: u64, patch: &ProductPatch) -> Result<Product, RemoteError> {
    let response = self
      .http
      .put(self.product_url(id)?)
      .json(patch)
      .send()
      .await?;
    let body: ApiResponse<Product> = decode(response).await?;
    Ok(body.data)
  }

  async fn delete(&self, id: u64) -> Result<Product, RemoteError> {
    let response = self.http.delete(self.product_url(id)?).send().await?;
    let body: ApiResponse<Product> = decode(response).await?;
    Ok(body.data)
  }

  async fn delete_many(&self, ids: &[u64]) -> Result<Vec<u64>, RemoteError> {
    let request = BulkDeleteRequest {
      ids: Some(ids.to_vec()),
    };
    let response = self
      .http
      .delete(self.endpoint("api/products")?)
      .json(&request)
      .send()
      .await?;
    let body: BulkDeleteResponse = decode(response).await?;
    Ok(body.deleted_ids)
  }
}

/// Turn a response into `T`, or into `RemoteError::Status` carrying the
/// server's message for non-2xx answers.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
  let status = response.status();
  let bytes = response.bytes().await?;

  if !status.is_success() {
    return Err(status_error(status, &bytes));
  }

  serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
}

fn status_error(status: StatusCode, body: &[u8]) -> RemoteError {
  let message = serde_json::from_slice::<ApiFailure>(body)
    .ok()
    .map(|f| f.message)
    .filter(|m| !m.is_empty())
    .unwrap_or_else(|| {
      status
        .canonical_reason()
        .unwrap_or("unexpected status")
        .to_string()
    });
  RemoteError::Status {
    status: status.as_u16(),
    message,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_base_url_gets_trailing_slash() {
    let client = CatalogClient::with_http(reqwest::Client::new(), "http://localhost:3001/v1").unwrap();
    assert_eq!(
      client.endpoint("api/products").unwrap().as_str(),
      "http://localhost:3001/v1/api/products"
    );
    assert_eq!(
      client.product_url(7).unwrap().as_str(),
      "http://localhost:3001/v1/api/products/7"
    );
  }

  #[test]
  fn test_invalid_base_url() {
    assert!(CatalogClient::with_http(reqwest::Client::new(), "not a url").is_err());
  }

  #[test]
  fn test_status_error_uses_body_message() {
    let err = status_error(
      StatusCode::NOT_FOUND,
      br#"{"success":false,"message":"product not found"}"#,
    );
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "server returned 404: product not found");
  }

  #[test]
  fn test_status_error_without_json_body() {
    let err = status_error(StatusCode::BAD_GATEWAY, b"<html>upstream down</html>");
    assert_eq!(err.to_string(), "server returned 502: Bad Gateway");
  }
}
