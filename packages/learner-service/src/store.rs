//! Versioned state persistence
//!
//! Every mutable record is saved with compare-and-swap on its version so two
//! writers racing on the same learner cannot silently overwrite each other.
//! Audit records go to append-only logs.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// Key builders. Ids are escaped so `:` inside an id can never be read as a
/// separator: `%` becomes `%25` and `:` becomes `%3A`.
pub mod keys {
    use std::borrow::Cow;

    pub fn escape(id: &str) -> Cow<'_, str> {
        if !id.contains(['%', ':']) {
            return Cow::Borrowed(id);
        }
        let mut out = String::with_capacity(id.len() + 4);
        for ch in id.chars() {
            match ch {
                '%' => out.push_str("%25"),
                ':' => out.push_str("%3A"),
                other => out.push(other),
            }
        }
        Cow::Owned(out)
    }

    /// Inverse of [`escape`]; `None` for text `escape` cannot produce.
    pub fn unescape(segment: &str) -> Option<String> {
        let mut out = String::with_capacity(segment.len());
        let mut rest = segment;
        while let Some(pos) = rest.find(['%', ':']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if tail.starts_with("%25") {
                out.push('%');
            } else if tail.starts_with("%3A") {
                out.push(':');
            } else {
                return None;
            }
            rest = &tail[3..];
        }
        out.push_str(rest);
        Some(out)
    }

    pub fn memory_prefix(learner_id: &str) -> String {
        format!("memory:{}:", escape(learner_id))
    }

    pub fn memory_key(learner_id: &str, item_id: &str) -> String {
        format!("memory:{}:{}", escape(learner_id), escape(item_id))
    }

    pub fn review_log(learner_id: &str) -> String {
        format!("reviews:{}", escape(learner_id))
    }

    pub fn placement_key(learner_id: &str) -> String {
        format!("placement:{}", escape(learner_id))
    }

    pub fn ability_key(learner_id: &str) -> String {
        format!("ability:{}", escape(learner_id))
    }

    pub fn assessment_key(session_id: &str) -> String {
        format!("assessment:{}", escape(session_id))
    }

    pub fn assessment_log(session_id: &str) -> String {
        format!("assessment:{}:responses", escape(session_id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Versioned<Value>>, StoreError>;

    /// Writes `value` if the stored version still equals `expected`
    /// (`None` = key must not exist). Returns the new version.
    fn save(&self, key: &str, expected: Option<u64>, value: Value) -> Result<u64, StoreError>;

    /// Removes the key if the stored version still equals `expected`.
    fn delete(&self, key: &str, expected: u64) -> Result<(), StoreError>;

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    fn append(&self, log: &str, entry: Value) -> Result<(), StoreError>;

    fn read_log(&self, log: &str) -> Result<Vec<Value>, StoreError>;
}

pub fn load_typed<T>(store: &dyn StateStore, key: &str) -> Result<Option<Versioned<T>>, StoreError>
where
    T: DeserializeOwned,
{
    let Some(raw) = store.load(key)? else {
        return Ok(None);
    };
    let value = serde_json::from_value(raw.value)?;
    Ok(Some(Versioned {
        version: raw.version,
        value,
    }))
}

pub fn save_typed<T>(
    store: &dyn StateStore,
    key: &str,
    expected: Option<u64>,
    value: &T,
) -> Result<u64, StoreError>
where
    T: Serialize,
{
    store.save(key, expected, serde_json::to_value(value)?)
}

pub fn append_typed<T>(store: &dyn StateStore, log: &str, entry: &T) -> Result<(), StoreError>
where
    T: Serialize,
{
    store.append(log, serde_json::to_value(entry)?)
}

pub fn read_log_typed<T>(store: &dyn StateStore, log: &str) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned,
{
    store
        .read_log(log)?
        .into_iter()
        .map(|entry| serde_json::from_value(entry).map_err(StoreError::from))
        .collect()
}

// ==================== In-memory implementation ====================

#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, Versioned<Value>>>,
    logs: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }
}

impl StateStore for InMemoryStore {
    fn load(&self, key: &str) -> Result<Option<Versioned<Value>>, StoreError> {
        Ok(self.records.read().get(key).cloned())
    }

    fn save(&self, key: &str, expected: Option<u64>, value: Value) -> Result<u64, StoreError> {
        let mut records = self.records.write();
        let actual = records.get(key).map(|r| r.version);
        if actual != expected {
            return Err(StoreError::VersionConflict {
                key: key.to_string(),
                expected,
                actual,
            });
        }
        let version = actual.map_or(1, |v| v + 1);
        records.insert(key.to_string(), Versioned { version, value });
        Ok(version)
    }

    fn delete(&self, key: &str, expected: u64) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let actual = records.get(key).map(|r| r.version);
        if actual != Some(expected) {
            return Err(StoreError::VersionConflict {
                key: key.to_string(),
                expected: Some(expected),
                actual,
            });
        }
        records.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .records
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn append(&self, log: &str, entry: Value) -> Result<(), StoreError> {
        self.logs.write().entry(log.to_string()).or_default().push(entry);
        Ok(())
    }

    fn read_log(&self, log: &str) -> Result<Vec<Value>, StoreError> {
        Ok(self.logs.read().get(log).cloned().unwrap_or_default())
    }
}
