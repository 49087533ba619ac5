//! In-memory document store
//!
//! A [`DocumentStore`] backed by a map of collections, for tests and
//! embedding. Query specs match by equality on (dotted) field paths.
//! Updates support `$set`, `$unset`, `$inc`, `$push`, `$addToSet`,
//! `$pushAll`, `$pop` and `$rename`, or whole-document replacement.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use super::collection::DocumentStore;
use super::errors::{StoreError, StoreResult};
use crate::schema::IndexSpec;
use crate::validation::is_update_modifier;
use crate::value::{Document, Value};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, Vec<Document>>>,
    indexes: Mutex<BTreeMap<String, Vec<IndexSpec>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every document in `collection`, in insertion order.
    pub fn documents(&self, collection: &str) -> StoreResult<Vec<Document>> {
        Ok(lock(&self.collections)?
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    /// Indexes ensured on `collection`.
    pub fn indexes(&self, collection: &str) -> StoreResult<Vec<IndexSpec>> {
        Ok(lock(&self.indexes)?
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }
}

impl DocumentStore for MemoryStore {
    fn find_one(&self, collection: &str, spec: &Document) -> StoreResult<Option<Document>> {
        let collections = lock(&self.collections)?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| matches_spec(doc, spec)))
            .cloned())
    }

    fn find(&self, collection: &str, spec: &Document) -> StoreResult<Vec<Document>> {
        let collections = lock(&self.collections)?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches_spec(doc, spec))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn insert(&self, collection: &str, body: &Document) -> StoreResult<Value> {
        let mut body = body.clone();
        let id = body
            .entry("_id".to_string())
            .or_insert_with(|| Value::Identifier(Uuid::new_v4()))
            .clone();
        lock(&self.collections)?
            .entry(collection.to_string())
            .or_default()
            .push(body);
        Ok(id)
    }

    fn update(
        &self,
        collection: &str,
        spec: &Document,
        update: &Document,
        multi: bool,
    ) -> StoreResult<u64> {
        let mut collections = lock(&self.collections)?;
        let docs = match collections.get_mut(collection) {
            Some(docs) => docs,
            None => return Ok(0),
        };

        let mut updated = 0;
        for doc in docs.iter_mut().filter(|doc| matches_spec(doc, spec)) {
            apply_update(doc, update)?;
            updated += 1;
            if !multi {
                break;
            }
        }
        Ok(updated)
    }

    fn remove(&self, collection: &str, spec: &Document) -> StoreResult<u64> {
        let mut collections = lock(&self.collections)?;
        let docs = match collections.get_mut(collection) {
            Some(docs) => docs,
            None => return Ok(0),
        };
        let before = docs.len();
        docs.retain(|doc| !matches_spec(doc, spec));
        Ok((before - docs.len()) as u64)
    }

    fn find_and_modify(
        &self,
        collection: &str,
        spec: &Document,
        update: &Document,
        return_new: bool,
    ) -> StoreResult<Option<Document>> {
        let mut collections = lock(&self.collections)?;
        let doc = match collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| matches_spec(doc, spec)))
        {
            Some(doc) => doc,
            None => return Ok(None),
        };

        let old = doc.clone();
        apply_update(doc, update)?;
        Ok(Some(if return_new { doc.clone() } else { old }))
    }

    fn ensure_index(&self, collection: &str, index: &IndexSpec) -> StoreResult<()> {
        let mut indexes = lock(&self.indexes)?;
        let declared = indexes.entry(collection.to_string()).or_default();
        if !declared.contains(index) {
            declared.push(index.clone());
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> StoreResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
}

fn matches_spec(doc: &Document, spec: &Document) -> bool {
    spec.iter().all(|(path, expected)| {
        value_at(doc, path).map_or(false, |actual| actual.identical(expected))
    })
}

fn value_at<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Document(doc) => doc.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Slot at `path`; with `create`, missing documents along the way are
/// created and a missing leaf starts as null.
fn value_at_mut<'a>(doc: &'a mut Document, path: &str, create: bool) -> Option<&'a mut Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = if create {
        doc.entry(first.to_string()).or_insert(Value::Null)
    } else {
        doc.get_mut(first)?
    };

    for segment in segments {
        if create && matches!(current, Value::Null) {
            *current = Value::Document(Document::new());
        }
        current = match current {
            Value::Document(doc) => {
                if create {
                    doc.entry(segment.to_string()).or_insert(Value::Null)
                } else {
                    doc.get_mut(segment)?
                }
            }
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn remove_at(doc: &mut Document, path: &str) -> Option<Value> {
    match path.rsplit_once('.') {
        None => doc.remove(path),
        Some((parent, leaf)) => match value_at_mut(doc, parent, false)? {
            Value::Document(parent) => parent.remove(leaf),
            _ => None,
        },
    }
}

fn apply_update(doc: &mut Document, update: &Document) -> StoreResult<()> {
    if !is_update_modifier(update) {
        let id = doc.get("_id").cloned();
        *doc = update.clone();
        if let Some(id) = id {
            doc.insert("_id".to_string(), id);
        }
        return Ok(());
    }

    for (operator, args) in update {
        let args = args.as_document().ok_or_else(|| {
            StoreError::OperationFailed(format!("{} expects a document argument", operator))
        })?;
        for (path, arg) in args {
            apply_operator(doc, operator, path, arg)?;
        }
    }
    Ok(())
}

fn apply_operator(doc: &mut Document, operator: &str, path: &str, arg: &Value) -> StoreResult<()> {
    let unreachable = || StoreError::OperationFailed(format!("cannot apply {} at '{}'", operator, path));

    match operator {
        "$set" => {
            *value_at_mut(doc, path, true).ok_or_else(unreachable)? = arg.clone();
        }
        "$unset" => {
            remove_at(doc, path);
        }
        "$rename" => {
            let target = arg.as_str().ok_or_else(unreachable)?;
            if let Some(value) = remove_at(doc, path) {
                *value_at_mut(doc, target, true).ok_or_else(unreachable)? = value;
            }
        }
        "$inc" => {
            let slot = value_at_mut(doc, path, true).ok_or_else(unreachable)?;
            let next = match (&*slot, arg) {
                (Value::Null, amount) => amount.clone(),
                (Value::Int(a), Value::Int(b)) => match a.checked_add(*b) {
                    Some(sum) => Value::Int(sum),
                    None => Value::Long(*a as i64 + *b as i64),
                },
                (Value::Int(a), Value::Long(b)) => Value::Long(checked_long(*a as i64, *b, path)?),
                (Value::Long(a), Value::Int(b)) => Value::Long(checked_long(*a, *b as i64, path)?),
                (Value::Long(a), Value::Long(b)) => Value::Long(checked_long(*a, *b, path)?),
                (Value::Float(a), Value::Float(b)) => Value::Float(a + b),
                (Value::Float(a), Value::Int(b)) => Value::Float(a + *b as f64),
                (Value::Int(a), Value::Float(b)) => Value::Float(*a as f64 + b),
                _ => return Err(unreachable()),
            };
            *slot = next;
        }
        "$push" | "$addToSet" | "$pushAll" => {
            let additions: Vec<Value> = match arg {
                Value::Array(items) if operator == "$pushAll" => items.clone(),
                Value::Document(each) if each.contains_key("$each") => match each.get("$each") {
                    Some(Value::Array(items)) => items.clone(),
                    _ => return Err(unreachable()),
                },
                _ if operator == "$pushAll" => return Err(unreachable()),
                single => vec![single.clone()],
            };
            let slot = value_at_mut(doc, path, true).ok_or_else(unreachable)?;
            if matches!(slot, Value::Null) {
                *slot = Value::Array(Vec::new());
            }
            let items = slot.as_array_mut().ok_or_else(unreachable)?;
            for addition in additions {
                if operator == "$addToSet" && items.iter().any(|item| item.identical(&addition)) {
                    continue;
                }
                items.push(addition);
            }
        }
        "$pop" => {
            if let Some(Value::Array(items)) = value_at_mut(doc, path, false) {
                match arg {
                    Value::Int(-1) => {
                        if !items.is_empty() {
                            items.remove(0);
                        }
                    }
                    _ => {
                        items.pop();
                    }
                }
            }
        }
        other => {
            return Err(StoreError::OperationFailed(format!(
                "memory store does not support {}",
                other
            )))
        }
    }
    Ok(())
}

fn checked_long(a: i64, b: i64, path: &str) -> StoreResult<i64> {
    a.checked_add(b).ok_or_else(|| {
        StoreError::OperationFailed(format!("$inc overflows 64-bit integer at '{}'", path))
    })
}
