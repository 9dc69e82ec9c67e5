//! Generic client-side result caching.
//!
//! This module is domain-agnostic. It provides:
//! - Canonical cache keys built from a fixed field schema
//! - A single-slot cache holding one result window at a time
//! - A fetch coordinator that serves hits without I/O and discards
//!   responses for superseded requests
//! - Local pagination over the cached window

mod coordinator;
mod key;
pub mod page;
mod slot;
mod traits;

pub use coordinator::FetchCoordinator;
pub use key::{CacheKey, KeyBuilder};
pub use page::PageView;
pub use slot::{CacheEntry, ResultCache};
pub use traits::{CacheResult, CacheSource, Window};
