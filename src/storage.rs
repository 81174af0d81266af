//! Structured storage handles.
//!
//! Machines and activations persist themselves through a keyed store of floats,
//! strings, size lists and float arrays under a `/`-separated hierarchical namespace.
//! [`Storage`] reads from a handle and [`StorageMut`] writes to it. [`Scope`] opens a
//! sub-group of any handle, and [`MemoryStore`] is the in-crate backend
//! (JSON-serializable with the `serde` feature).

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use ndarray::ArrayD;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use std::path::Path;

use crate::{Error, Result};

/// A single stored value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", content = "value", rename_all = "snake_case")
)]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Text(String),
    Sizes(Vec<usize>),
    Array(ArrayD<f64>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Sizes(_) => "sizes",
            Value::Array(_) => "array",
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<usize>> for Value {
    fn from(value: Vec<usize>) -> Self {
        Value::Sizes(value)
    }
}

impl From<ArrayD<f64>> for Value {
    fn from(value: ArrayD<f64>) -> Self {
        Value::Array(value)
    }
}

/// Keyed read access to a structured store.
pub trait Storage {
    /// Identity of the underlying handle (e.g. a file name), used in diagnostics.
    fn name(&self) -> &str;

    /// Path of the group this handle reads from and writes to.
    fn group(&self) -> &str {
        "/"
    }

    fn contains(&self, key: &str) -> bool;

    /// Reads the value stored under `key`; a missing key is a load error.
    fn read(&self, key: &str) -> Result<Value>;

    fn read_float(&self, key: &str) -> Result<f64> {
        match self.read(key)? {
            Value::Float(v) => Ok(v),
            other => Err(type_mismatch(self, key, "float", &other)),
        }
    }

    fn read_text(&self, key: &str) -> Result<String> {
        match self.read(key)? {
            Value::Text(v) => Ok(v),
            other => Err(type_mismatch(self, key, "text", &other)),
        }
    }

    fn read_sizes(&self, key: &str) -> Result<Vec<usize>> {
        match self.read(key)? {
            Value::Sizes(v) => Ok(v),
            other => Err(type_mismatch(self, key, "sizes", &other)),
        }
    }

    fn read_array(&self, key: &str) -> Result<ArrayD<f64>> {
        match self.read(key)? {
            Value::Array(v) => Ok(v),
            other => Err(type_mismatch(self, key, "array", &other)),
        }
    }
}

/// Write access to a structured store.
pub trait StorageMut: Storage {
    /// Stores `value` under `key`, replacing any previous value.
    fn write(&mut self, key: &str, value: Value) -> Result<()>;
}

fn type_mismatch<S: Storage + ?Sized>(
    store: &S,
    key: &str,
    expected: &str,
    found: &Value,
) -> Error {
    Error::TypeMismatch(format!(
        "{}: `{}` holds a {} value, expected {expected}",
        store.name(),
        join(store.group(), key),
        found.kind()
    ))
}

fn join(group: &str, key: &str) -> String {
    let group = group.trim_end_matches('/');
    format!("{group}/{key}")
}

/// A view of a sub-group of another handle.
///
/// Keys are resolved relative to the group, so `Scope::new(&store, "a").read("x")`
/// reads `a/x` from `store`. Scopes nest. A scope over `&S` only reads; a scope
/// over `&mut S` also writes.
pub struct Scope<H> {
    inner: H,
    prefix: String,
    path: String,
}

impl<H> Scope<H>
where
    H: Deref,
    H::Target: Storage,
{
    pub fn new(inner: H, group: &str) -> Self {
        let group = group.trim_matches('/');
        let path = join(inner.group(), group);
        Self {
            inner,
            prefix: group.to_owned(),
            path,
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}/{key}", self.prefix)
    }
}

impl<H> Storage for Scope<H>
where
    H: Deref,
    H::Target: Storage,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn group(&self) -> &str {
        &self.path
    }

    fn contains(&self, key: &str) -> bool {
        self.inner.contains(&self.key(key))
    }

    fn read(&self, key: &str) -> Result<Value> {
        self.inner.read(&self.key(key))
    }
}

impl<H> StorageMut for Scope<H>
where
    H: DerefMut,
    H::Target: StorageMut,
{
    fn write(&mut self, key: &str, value: Value) -> Result<()> {
        let key = self.key(key);
        self.inner.write(&key, value)
    }
}

/// In-memory store keyed by full `/`-separated paths.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStore {
    name: String,
    entries: BTreeMap<String, Value>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored keys in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Removes and returns the value under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }
}

impl Storage for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn read(&self, key: &str) -> Result<Value> {
        self.entries.get(key).cloned().ok_or_else(|| {
            Error::Load(format!(
                "{}: no value stored under `{}`",
                self.name,
                join(self.group(), key)
            ))
        })
    }
}

impl StorageMut for MemoryStore {
    fn write(&mut self, key: &str, value: Value) -> Result<()> {
        if key.is_empty() || key.ends_with('/') {
            return Err(Error::Storage {
                handle: self.name.clone(),
                group: self.group().to_owned(),
                message: format!("invalid key `{key}`"),
            });
        }
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }
}

pub const STORE_FORMAT_VERSION: u32 = 1;

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct SerializedStore {
    format_version: u32,
    entries: BTreeMap<String, Value>,
}

#[cfg(feature = "serde")]
impl MemoryStore {
    /// JSON has no encoding for NaN or infinities, so those are refused up front.
    fn serialized(&self) -> Result<SerializedStore> {
        for (key, value) in &self.entries {
            let finite = match value {
                Value::Float(v) => v.is_finite(),
                Value::Array(a) => a.iter().all(|v| v.is_finite()),
                Value::Text(_) | Value::Sizes(_) => true,
            };
            if !finite {
                return Err(Error::Storage {
                    handle: self.name.clone(),
                    group: self.group().to_owned(),
                    message: format!("`{key}` holds a non-finite value, which JSON cannot encode"),
                });
            }
        }
        Ok(SerializedStore {
            format_version: STORE_FORMAT_VERSION,
            entries: self.entries.clone(),
        })
    }

    fn serialize_error(&self, e: serde_json::Error) -> Error {
        Error::Storage {
            handle: self.name.clone(),
            group: self.group().to_owned(),
            message: format!("failed to serialize store: {e}"),
        }
    }

    /// Serialize the store to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.serialized()?).map_err(|e| self.serialize_error(e))
    }

    /// Serialize the store to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(&self.serialized()?).map_err(|e| self.serialize_error(e))
    }

    /// Parse a store from a JSON string, naming it `name`.
    pub fn from_json_str(name: impl Into<String>, s: &str) -> Result<Self> {
        let name = name.into();
        let ser: SerializedStore = serde_json::from_str(s)
            .map_err(|e| Error::Load(format!("{name}: failed to parse store json: {e}")))?;
        if ser.format_version != STORE_FORMAT_VERSION {
            return Err(Error::Load(format!(
                "{name}: unsupported store format_version {}; expected {}",
                ser.format_version, STORE_FORMAT_VERSION
            )));
        }
        Ok(Self {
            name,
            entries: ser.entries,
        })
    }

    /// Save the store to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        let p = path.as_ref();
        std::fs::write(p, s).map_err(|e| Error::Storage {
            handle: p.display().to_string(),
            group: self.group().to_owned(),
            message: format!("failed to write: {e}"),
        })?;
        log::debug!("saved {} entries to {}", self.len(), p.display());
        Ok(())
    }

    /// Load a store from a JSON file; the store is named after the path.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p).map_err(|e| Error::Storage {
            handle: p.display().to_string(),
            group: "/".to_owned(),
            message: format!("failed to read: {e}"),
        })?;
        Self::from_json_str(p.display().to_string(), &s)
    }
}
