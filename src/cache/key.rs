//! Cache Key Module
//!
//! Deterministic cache keys derived from an operation name and its arguments.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};
use xxhash_rust::xxh64::xxh64;

use crate::error::CacheError;

/// Number of hex characters of the argument hash kept in a key.
pub const KEY_HASH_WIDTH: usize = 16;

// == Call Arguments ==
/// Positional and named arguments of a cached call, as JSON values.
///
/// Named arguments live in a sorted map, so the order in which they were
/// supplied never affects the derived key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    args: Vec<Value>,
    kwargs: BTreeMap<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, CacheError> {
        self.args.push(serde_json::to_value(value)?);
        Ok(self)
    }

    /// Sets a named argument, replacing an earlier one with the same name.
    pub fn kwarg<T: Serialize + ?Sized>(
        mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, CacheError> {
        self.kwargs.insert(name.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Builds arguments from any serializable value.
    ///
    /// A struct or map becomes named arguments. Any other value, sequences
    /// and `()` included, is kept whole as the single positional argument,
    /// so values of different shapes never share a key.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, CacheError> {
        let call = match serde_json::to_value(value)? {
            Value::Object(map) => Self {
                args: Vec::new(),
                kwargs: map.into_iter().collect(),
            },
            other => Self {
                args: vec![other],
                kwargs: BTreeMap::new(),
            },
        };
        Ok(call)
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &BTreeMap<String, Value> {
        &self.kwargs
    }

    /// Canonical JSON text hashed into the key:
    /// `{"args":[...],"kwargs":[[name,value],...]}` with names sorted.
    pub fn canonical(&self) -> String {
        let kwargs: Vec<Value> = self
            .kwargs
            .iter()
            .map(|(name, value)| json!([name, value]))
            .collect();
        json!({ "args": self.args, "kwargs": kwargs }).to_string()
    }
}

// == Key Derivation ==
/// Derives `"{operation}:{hash}"` where `hash` is the xxh64 of the canonical
/// arguments as 16 lowercase hex characters.
///
/// Non-cryptographic: collisions are possible in principle and accepted.
pub fn derive_key(operation: &str, call: &CallArgs) -> String {
    let digest = xxh64(call.canonical().as_bytes(), 0);
    format!("{}:{:0width$x}", operation, digest, width = KEY_HASH_WIDTH)
}
