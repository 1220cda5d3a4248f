//! Criteria matching and update operators for the in-memory backend.
//!
//! This is intentionally narrow: equality on (dotted) fields, array
//! membership and a handful of comparison operators. Anything else is
//! reported as unsupported rather than silently ignored.

use crate::store::{StoreError, StoreResult};
use crate::types::{Document, ID_FIELD};
use serde_json::{Map, Value};
use std::cmp::Ordering;

const UPDATE_OPERATORS: [&str; 5] = ["$set", "$unset", "$push", "$addToSet", "$pull"];

pub(crate) fn criteria_document(criteria: Value) -> StoreResult<Document> {
    match criteria {
        Value::Null => Ok(Document::new()),
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidInput(format!(
            "criteria must be an object, got {}",
            type_name(&other)
        ))),
    }
}

pub(crate) fn matches(document: &Document, criteria: &Document) -> StoreResult<bool> {
    for (path, expected) in criteria {
        if path.starts_with('$') {
            return Err(StoreError::Unsupported(format!(
                "top-level operator {path}"
            )));
        }
        let actual = lookup(document, path);
        let matched = match operator_map(expected) {
            Some(operators) => match_operators(actual, operators)?,
            None => equals_or_contains(actual, expected),
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn operator_map(expected: &Value) -> Option<&Map<String, Value>> {
    let map = expected.as_object()?;
    if !map.is_empty() && map.keys().all(|key| key.starts_with('$')) {
        Some(map)
    } else {
        None
    }
}

fn equals_or_contains(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
        Some(value) => value == expected,
        None => expected.is_null(),
    }
}

fn match_operators(actual: Option<&Value>, operators: &Map<String, Value>) -> StoreResult<bool> {
    for (operator, operand) in operators {
        let matched = match operator.as_str() {
            "$eq" => equals_or_contains(actual, operand),
            "$ne" => !equals_or_contains(actual, operand),
            "$in" => operand_list(operator, operand)?
                .iter()
                .any(|candidate| equals_or_contains(actual, candidate)),
            "$nin" => !operand_list(operator, operand)?
                .iter()
                .any(|candidate| equals_or_contains(actual, candidate)),
            "$exists" => {
                let wanted = operand.as_bool().ok_or_else(|| {
                    StoreError::InvalidInput("$exists expects a boolean".to_string())
                })?;
                actual.is_some() == wanted
            }
            "$gt" => compare(actual, operand).is_some_and(|ord| ord == Ordering::Greater),
            "$gte" => compare(actual, operand).is_some_and(|ord| ord != Ordering::Less),
            "$lt" => compare(actual, operand).is_some_and(|ord| ord == Ordering::Less),
            "$lte" => compare(actual, operand).is_some_and(|ord| ord != Ordering::Greater),
            other => {
                return Err(StoreError::Unsupported(format!("query operator {other}")));
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn operand_list<'a>(operator: &str, operand: &'a Value) -> StoreResult<&'a Vec<Value>> {
    operand
        .as_array()
        .ok_or_else(|| StoreError::InvalidInput(format!("{operator} expects an array")))
}

fn compare(actual: Option<&Value>, operand: &Value) -> Option<Ordering> {
    match (actual?, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Checks that `update` is a non-empty operator document and returns it.
pub(crate) fn update_document(update: &Value) -> StoreResult<&Document> {
    let map = update.as_object().ok_or_else(|| {
        StoreError::InvalidInput(format!(
            "update document must be an object, got {}",
            type_name(update)
        ))
    })?;
    if map.is_empty() {
        return Err(StoreError::InvalidInput(
            "update document must not be empty".to_string(),
        ));
    }
    for (operator, fields) in map {
        if !UPDATE_OPERATORS.contains(&operator.as_str()) {
            return Err(StoreError::InvalidInput(format!(
                "unknown update operator {operator}"
            )));
        }
        let Some(fields) = fields.as_object() else {
            return Err(StoreError::InvalidInput(format!(
                "{operator} expects an object, got {}",
                type_name(fields)
            )));
        };
        if fields.contains_key(ID_FIELD) {
            return Err(StoreError::InvalidInput(format!(
                "{operator} cannot modify {ID_FIELD}"
            )));
        }
    }
    Ok(map)
}

/// Applies a validated update document. Returns whether anything changed.
pub(crate) fn apply_update(document: &mut Document, update: &Document) -> StoreResult<bool> {
    let mut modified = false;
    for (operator, fields) in update {
        let Some(fields) = fields.as_object() else {
            continue;
        };
        for (path, value) in fields {
            let changed = match operator.as_str() {
                "$set" => set_field(document, path, value.clone())?,
                "$unset" => unset_field(document, path),
                "$push" => push_field(document, path, value, false)?,
                "$addToSet" => push_field(document, path, value, true)?,
                "$pull" => pull_field(document, path, value)?,
                _ => false,
            };
            modified |= changed;
        }
    }
    Ok(modified)
}

fn parent_mut<'d, 'p>(document: &'d mut Document, path: &'p str) -> StoreResult<(&'d mut Document, &'p str)> {
    let Some((prefix, last)) = path.rsplit_once('.') else {
        return Ok((document, path));
    };
    let mut current = document;
    for segment in prefix.split('.') {
        current = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| {
                StoreError::InvalidInput(format!(
                    "cannot traverse non-object field '{segment}' in '{path}'"
                ))
            })?;
    }
    Ok((current, last))
}

fn set_field(document: &mut Document, path: &str, value: Value) -> StoreResult<bool> {
    let (parent, field) = parent_mut(document, path)?;
    let changed = parent.get(field) != Some(&value);
    parent.insert(field.to_string(), value);
    Ok(changed)
}

fn unset_field(document: &mut Document, path: &str) -> bool {
    let Some((prefix, last)) = path.rsplit_once('.') else {
        return document.remove(path).is_some();
    };
    let mut current = document;
    for segment in prefix.split('.') {
        match current.get_mut(segment).and_then(Value::as_object_mut) {
            Some(next) => current = next,
            None => return false,
        }
    }
    current.remove(last).is_some()
}

fn push_field(document: &mut Document, path: &str, value: &Value, unique: bool) -> StoreResult<bool> {
    let (parent, field) = parent_mut(document, path)?;
    let slot = parent
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(items) = slot else {
        return Err(StoreError::InvalidInput(format!(
            "field '{path}' is not an array"
        )));
    };
    if unique && items.contains(value) {
        return Ok(false);
    }
    items.push(value.clone());
    Ok(true)
}

fn pull_field(document: &mut Document, path: &str, value: &Value) -> StoreResult<bool> {
    let (parent, field) = parent_mut(document, path)?;
    match parent.get_mut(field) {
        None => Ok(false),
        Some(Value::Array(items)) => {
            let before = items.len();
            items.retain(|item| item != value);
            Ok(items.len() != before)
        }
        Some(_) => Err(StoreError::InvalidInput(format!(
            "field '{path}' is not an array"
        ))),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
