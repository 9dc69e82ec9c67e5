//! Canonical cache keys.

use sha2::{Digest, Sha256};
use std::fmt;

/// Canonical, order-independent identity of a query.
///
/// Two keys are equal exactly when their canonical serializations are equal.
/// The serialization is produced by [`KeyBuilder`], which writes fields in the
/// order the caller's schema declares them, so logically identical queries
/// always serialize the same way no matter how their inputs were assembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Short SHA256 fingerprint for logs and status lines
  pub fn digest(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.0.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..6])
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Builds a [`CacheKey`] one schema field at a time.
///
/// Each field is written as `name=<len>:<value>;`, or `name=;` when absent.
/// The length prefix keeps values containing `;` or `=` unambiguous without
/// escaping, and "absent" can never collide with a present value because
/// present values are written with a prefix.
#[derive(Debug)]
pub struct KeyBuilder {
  buf: String,
}

impl KeyBuilder {
  pub fn new(namespace: &str) -> Self {
    let mut buf = String::with_capacity(128);
    buf.push_str(namespace);
    buf.push('|');
    Self { buf }
  }

  pub fn field(mut self, name: &str, value: Option<&str>) -> Self {
    self.buf.push_str(name);
    self.buf.push('=');
    if let Some(value) = value {
      self.buf.push_str(&value.len().to_string());
      self.buf.push(':');
      self.buf.push_str(value);
    }
    self.buf.push(';');
    self
  }

  pub fn build(self) -> CacheKey {
    CacheKey(self.buf)
  }
}
