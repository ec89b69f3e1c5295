//! # PartialUpdate
//! A merge-write against a single document, described as a list of field operations.
//! Each operation either sets a (possibly nested) field or deletes it. Fields not mentioned are left alone.
//!
//! The client implementation decides how to put this on the wire. [`PartialUpdate::apply_to`] gives the reference
//! semantics, and is what the in-memory store uses.

use serde_json::{Map, Value};

use super::FieldPath;

#[derive(Clone, Debug, PartialEq)]
pub enum FieldOp {
    Set(Value),
    Delete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldUpdate {
    pub path: FieldPath,
    pub op: FieldOp,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartialUpdate {
    updates: Vec<FieldUpdate>,
}

impl PartialUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: FieldPath, value: impl Into<Value>) -> Self {
        self.updates.push(FieldUpdate {
            path,
            op: FieldOp::Set(value.into()),
        });
        self
    }

    pub fn delete(mut self, path: FieldPath) -> Self {
        self.updates.push(FieldUpdate {
            path,
            op: FieldOp::Delete,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldUpdate> {
        self.updates.iter()
    }

    /// Applies the operations in order. Missing intermediate objects are created on set;
    /// a non-object value in the way of a set is replaced by an object.
    pub fn apply_to(&self, document: &mut Value) {
        for update in &self.updates {
            match &update.op {
                FieldOp::Set(value) => set_field(document, update.path.segments(), value.clone()),
                FieldOp::Delete => delete_field(document, update.path.segments()),
            }
        }
    }
}

fn set_field(document: &mut Value, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = document;
    for segment in parents {
        current = ensure_object(current)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert(last.clone(), value);
}

fn delete_field(document: &mut Value, segments: &[String]) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = document;
    for segment in parents {
        match current.get_mut(segment.as_str()) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Value::Object(map) = current {
        map.remove(last.as_str());
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}
