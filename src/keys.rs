//! Cache key builders.
//!
//! Pure functions that derive stable key strings, so unrelated callers
//! asking for the same logical query land on the same entry. Parameter
//! bundles are canonicalized through `serde_json::Value`, whose object keys
//! are ordered, so field order never changes the key.

use std::fmt::Display;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Separator between key segments.
pub const SEPARATOR: &str = ":";

/// `user:42`
pub fn entity_key(entity: &str, id: impl Display) -> String {
    format!("{entity}{SEPARATOR}{id}")
}

/// `user:` - the prefix shared by every key built for `entity`, suitable for
/// `invalidate_prefix`.
pub fn namespace_prefix(entity: &str) -> String {
    format!("{entity}{SEPARATOR}")
}

/// `settings:ui:theme`
pub fn scoped_key(scope: &str, parts: &[&str]) -> String {
    std::iter::once(scope)
        .chain(parts.iter().copied())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// `search:{"page":1,"q":"rust"}`; `search` when there are no parameters.
pub fn query_key<P: Serialize + ?Sized>(name: &str, params: &P) -> Result<String> {
    Ok(match canonical(params)? {
        Some(params) => format!("{name}{SEPARATOR}{params}"),
        None => name.to_string(),
    })
}

/// `card:list:{"deck":3}` - lives under [`namespace_prefix`] of `entity`.
pub fn list_key<F: Serialize + ?Sized>(entity: &str, filters: &F) -> Result<String> {
    query_key(&scoped_key(entity, &["list"]), filters)
}

/// Canonical JSON for a parameter bundle, `None` for null or empty bundles.
fn canonical<P: Serialize + ?Sized>(params: &P) -> Result<Option<String>> {
    let value = serde_json::to_value(params)?;
    let empty = match &value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    if empty {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(&value)?))
}
