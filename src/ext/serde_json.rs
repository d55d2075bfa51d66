// === Module Header (agents-tooling) START ===
// purpose: Dotted-path fetching over serde_json::Value with lenient and required typed extraction
// role: extension/serde_json
// outputs: JsonFetch trait and JsonFetched wrapper; `required` maps absence or type mismatch to ApiError::Malformed
// invariants: No panics; missing paths yield None (lenient) or a Malformed error naming the path (required)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// A location inside a JSON document, remembered together with the path used to reach it.
pub struct JsonFetched<'a> {
  path: String,
  inner: Option<&'a serde_json::Value>,
}

impl<'a> JsonFetched<'a> {
  /// Deserialize the fetched value as `T`; `null` and missing both yield `None`.
  pub fn to<T>(&self) -> Option<T>
  where
    T: DeserializeOwned,
  {
    self
      .inner
      .filter(|v| !v.is_null())
      .and_then(|v| serde_json::from_value::<T>(v.clone()).ok())
  }

  /// Deserialize as `T`, failing with the offending path when absent, `null`, or mistyped.
  pub fn required<T>(&self) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
  {
    let value = self
      .inner
      .filter(|v| !v.is_null())
      .ok_or_else(|| ApiError::Malformed(format!("missing `{}`", self.path)))?;

    serde_json::from_value::<T>(value.clone())
      .map_err(|e| ApiError::Malformed(format!("unexpected shape at `{}`: {}", self.path, e)))
  }

  /// Borrow the raw value when present and not `null`.
  pub fn value(&self) -> Option<&'a serde_json::Value> {
    self.inner.filter(|v| !v.is_null())
  }
}

/// Fetch nested values via dotted paths like "organization.membersWithRole.pageInfo".
/// Numeric segments index into arrays ("errors.0.message").
pub trait JsonFetch {
  fn fetch(&self, path: &str) -> JsonFetched<'_>;
}

impl JsonFetch for serde_json::Value {
  fn fetch(&self, path: &str) -> JsonFetched<'_> {
    if path.is_empty() {
      return JsonFetched {
        path: String::new(),
        inner: Some(self),
      };
    }

    let mut cur = self;

    for key in path.split('.') {
      let next = match (cur, key.parse::<usize>()) {
        (serde_json::Value::Array(items), Ok(idx)) => items.get(idx),
        _ => cur.get(key),
      };

      match next {
        Some(next) => cur = next,
        None => {
          return JsonFetched {
            path: path.to_string(),
            inner: None,
          }
        }
      }
    }

    JsonFetched {
      path: path.to_string(),
      inner: Some(cur),
    }
  }
}
