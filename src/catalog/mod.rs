//! Product catalog domain: types, data sources and the cached list client.

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod source;
pub mod types;

pub use cache::{cache_key, normalize, ParsedQuery, RawQuery};
pub use cached_client::{CachedCatalogClient, ExportSummary, ProductView};
pub use client::CatalogClient;
pub use source::{PageRequest, ProductSource};
pub use types::{
  Category, FetchLimit, NewProduct, Product, ProductPatch, ProductStatus, QueryFilter, SortField,
  SortOrder, SortSpec,
};
