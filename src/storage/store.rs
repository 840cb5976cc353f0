//! Generic record store.
//!
//! Records are JSON objects grouped into named collections. Every record has
//! a string `id` assigned on insert. The agent pipeline and the CLI only talk
//! to the [`DataStore`] trait.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::error::{NewsroomError, Result};

/// One stored record.
pub type Record = Map<String, Value>;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Equality filters, one optional ordering and an optional limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `record` passes every filter.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| record.get(field).unwrap_or(&Value::Null) == value)
    }

    /// Filter, sort and truncate `records`. Sorting is stable.
    #[must_use]
    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        let mut out: Vec<Record> = records.into_iter().filter(|r| self.matches(r)).collect();
        if let Some((field, direction)) = &self.order_by {
            out.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

/// Nulls first, then numbers, then strings (RFC 3339 timestamps sort correctly).
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Collection-oriented record store.
pub trait DataStore: Send + Sync {
    /// Insert `fields` and return the new record id.
    fn insert(&self, collection: &str, fields: Record) -> Result<String>;

    /// Merge `fields` into the record. Errors if it does not exist.
    fn update(&self, collection: &str, id: &str, fields: Record) -> Result<()>;

    /// Merge `fields` only if every `expected` field still has the given value.
    ///
    /// Returns `false` without writing when the record changed or is missing.
    fn update_if(&self, collection: &str, id: &str, expected: &Record, fields: Record) -> Result<bool>;

    /// Records of a collection matching `query`.
    fn select(&self, collection: &str, query: &Query) -> Result<Vec<Record>>;

    /// Delete a record. Returns whether it existed.
    fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    /// Id of the authenticated principal, if any.
    fn current_principal(&self) -> Option<String> {
        None
    }

    /// Fetch one record by id.
    fn get(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        Ok(self
            .select(collection, &Query::new().eq("id", id).limit(1))?
            .into_iter()
            .next())
    }
}

pub(crate) fn merge(target: &mut Record, fields: Record) {
    for (key, value) in fields {
        if key != "id" {
            target.insert(key, value);
        }
    }
}

pub(crate) fn expectations_hold(record: &Record, expected: &Record) -> bool {
    expected
        .iter()
        .all(|(field, value)| record.get(field).unwrap_or(&Value::Null) == value)
}

pub(crate) fn new_record_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static SEQ: AtomicU64 = AtomicU64::new(0);

    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{nanos:x}-{seq:x}")
}

// =============================================================================
// In-memory store
// =============================================================================

/// Store kept entirely in memory. Insertion order is preserved.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Record>>>,
    principal: Option<String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that reports `principal` as the authenticated user.
    #[must_use]
    pub fn with_principal(principal: impl Into<String>) -> Self {
        Self {
            principal: Some(principal.into()),
            ..Self::default()
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Record>>>> {
        self.collections
            .lock()
            .map_err(|_| NewsroomError::Store("memory store lock poisoned".to_string()))
    }
}

impl DataStore for MemoryStore {
    fn insert(&self, collection: &str, mut fields: Record) -> Result<String> {
        let id = match fields.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => new_record_id(),
        };
        fields.insert("id".to_string(), Value::String(id.clone()));

        let mut collections = self.lock()?;
        let records = collections.entry(collection.to_string()).or_default();
        if records.iter().any(|r| r.get("id") == fields.get("id")) {
            return Err(NewsroomError::Store(format!("duplicate id {id} in {collection}")));
        }
        records.push(fields);
        Ok(id)
    }

    fn update(&self, collection: &str, id: &str, fields: Record) -> Result<()> {
        let mut collections = self.lock()?;
        let record = collections
            .get_mut(collection)
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
            })
            .ok_or_else(|| NewsroomError::Store(format!("{collection}/{id} not found")))?;
        merge(record, fields);
        Ok(())
    }

    fn update_if(&self, collection: &str, id: &str, expected: &Record, fields: Record) -> Result<bool> {
        let mut collections = self.lock()?;
        let Some(record) = collections.get_mut(collection).and_then(|records| {
            records
                .iter_mut()
                .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
        }) else {
            return Ok(false);
        };
        if !expectations_hold(record, expected) {
            return Ok(false);
        }
        merge(record, fields);
        Ok(true)
    }

    fn select(&self, collection: &str, query: &Query) -> Result<Vec<Record>> {
        let collections = self.lock()?;
        let records = collections.get(collection).cloned().unwrap_or_default();
        Ok(query.apply(records))
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let mut collections = self.lock()?;
        let Some(records) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = records.len();
        records.retain(|r| r.get("id").and_then(Value::as_str) != Some(id));
        Ok(records.len() != before)
    }

    fn current_principal(&self) -> Option<String> {
        self.principal.clone()
    }
}
