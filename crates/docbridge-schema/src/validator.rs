//! Compiled form of a JSON schema document and its evaluation.
//!
//! Supported keywords: `$ref`, `type`, `enum`, `minimum`, `maximum`,
//! `minLength`, `maxLength`, `pattern`, `minItems`, `maxItems`, `items`
//! (single schema or tuple), `required`, `properties`,
//! `additionalProperties`. Other keywords are accepted and ignored.

use crate::registry::{SchemaError, SchemaResult};
use crate::violation::{Violation, ViolationKind, child_index_path, child_property_path};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

const MAX_REF_DEPTH: usize = 32;
const JSON_TYPES: [&str; 7] = [
    "null", "boolean", "object", "array", "number", "string", "integer",
];

#[derive(Debug)]
pub(crate) enum SchemaNode {
    Always,
    Never,
    Rules(Box<Rules>),
}

#[derive(Debug, Default)]
pub(crate) struct Rules {
    reference: Option<String>,
    types: Option<Vec<String>>,
    enum_values: Option<Vec<Value>>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    min_length: Option<u64>,
    max_length: Option<u64>,
    pattern: Option<Regex>,
    min_items: Option<u64>,
    max_items: Option<u64>,
    items: Option<Items>,
    required: Vec<String>,
    properties: Vec<(String, SchemaNode)>,
    additional: Option<SchemaNode>,
}

#[derive(Debug)]
pub(crate) enum Items {
    Each(SchemaNode),
    Tuple(Vec<SchemaNode>),
}

impl SchemaNode {
    pub(crate) fn compile(schema_id: &str, schema: &Value) -> SchemaResult<Self> {
        let invalid = |reason: String| SchemaError::InvalidSchema {
            id: schema_id.to_string(),
            reason,
        };
        let map = match schema {
            Value::Bool(true) => return Ok(Self::Always),
            Value::Bool(false) => return Ok(Self::Never),
            Value::Object(map) => map,
            other => return Err(invalid(format!("schema must be an object, got {other}"))),
        };

        let mut rules = Rules::default();
        if let Some(reference) = map.get("$ref") {
            let reference = reference
                .as_str()
                .ok_or_else(|| invalid("$ref must be a string".to_string()))?;
            rules.reference = Some(reference.to_string());
            return Ok(Self::Rules(Box::new(rules)));
        }

        rules.types = match map.get("type") {
            None => None,
            Some(Value::String(name)) => Some(vec![known_type(name).map_err(&invalid)?]),
            Some(Value::Array(names)) => Some(
                names
                    .iter()
                    .map(|name| {
                        name.as_str()
                            .ok_or_else(|| "type list must hold strings".to_string())
                            .and_then(known_type)
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(&invalid)?,
            ),
            Some(_) => return Err(invalid("type must be a string or a list".to_string())),
        };
        rules.enum_values = match map.get("enum") {
            None => None,
            Some(Value::Array(values)) => Some(values.clone()),
            Some(_) => return Err(invalid("enum must be a list".to_string())),
        };
        rules.minimum = number_keyword(map, "minimum").map_err(&invalid)?;
        rules.maximum = number_keyword(map, "maximum").map_err(&invalid)?;
        rules.min_length = count_keyword(map, "minLength").map_err(&invalid)?;
        rules.max_length = count_keyword(map, "maxLength").map_err(&invalid)?;
        rules.min_items = count_keyword(map, "minItems").map_err(&invalid)?;
        rules.max_items = count_keyword(map, "maxItems").map_err(&invalid)?;

        if let Some(pattern) = map.get("pattern") {
            let pattern = pattern
                .as_str()
                .ok_or_else(|| invalid("pattern must be a string".to_string()))?;
            let compiled = Regex::new(pattern)
                .map_err(|err| invalid(format!("pattern {pattern:?} does not compile: {err}")))?;
            rules.pattern = Some(compiled);
        }

        rules.items = match map.get("items") {
            None => None,
            Some(Value::Array(schemas)) => Some(Items::Tuple(
                schemas
                    .iter()
                    .map(|item| Self::compile(schema_id, item))
                    .collect::<SchemaResult<Vec<_>>>()?,
            )),
            Some(item) => Some(Items::Each(Self::compile(schema_id, item)?)),
        };

        if let Some(required) = map.get("required") {
            let names = required
                .as_array()
                .ok_or_else(|| invalid("required must be a list".to_string()))?;
            for name in names {
                let name = name
                    .as_str()
                    .ok_or_else(|| invalid("required must list property names".to_string()))?;
                rules.required.push(name.to_string());
            }
        }

        if let Some(properties) = map.get("properties") {
            let properties = properties
                .as_object()
                .ok_or_else(|| invalid("properties must be an object".to_string()))?;
            for (name, property) in properties {
                rules
                    .properties
                    .push((name.clone(), Self::compile(schema_id, property)?));
            }
        }

        if let Some(additional) = map.get("additionalProperties") {
            rules.additional = Some(Self::compile(schema_id, additional)?);
        }

        Ok(Self::Rules(Box::new(rules)))
    }
}

fn known_type(name: &str) -> Result<String, String> {
    if JSON_TYPES.contains(&name) {
        Ok(name.to_string())
    } else {
        Err(format!("unknown type {name:?}"))
    }
}

fn number_keyword(map: &Map<String, Value>, keyword: &str) -> Result<Option<f64>, String> {
    match map.get(keyword) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("{keyword} must be a number")),
    }
}

fn count_keyword(map: &Map<String, Value>, keyword: &str) -> Result<Option<u64>, String> {
    match map.get(keyword) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| format!("{keyword} must be a non-negative integer")),
    }
}

/// A registered schema: its source document (kept for idempotency checks) and
/// compiled root.
#[derive(Debug)]
pub(crate) struct CompiledSchema {
    pub source: Value,
    pub root: SchemaNode,
}

pub(crate) struct Evaluation<'a> {
    schemas: &'a BTreeMap<String, Arc<CompiledSchema>>,
    violations: Vec<Violation>,
}

impl<'a> Evaluation<'a> {
    pub(crate) fn new(schemas: &'a BTreeMap<String, Arc<CompiledSchema>>) -> Self {
        Self {
            schemas,
            violations: Vec::new(),
        }
    }

    pub(crate) fn run(mut self, schema_id: &str, data: &Value) -> SchemaResult<Vec<Violation>> {
        let root = self.resolve(schema_id)?;
        self.check(schema_id, &root.root, data, "", 0)?;
        Ok(self.violations)
    }

    fn resolve(&self, schema_id: &str) -> SchemaResult<&'a CompiledSchema> {
        let schemas: &'a BTreeMap<String, Arc<CompiledSchema>> = self.schemas;
        schemas
            .get(schema_id)
            .map(Arc::as_ref)
            .ok_or_else(|| SchemaError::UnknownSchema(schema_id.to_string()))
    }

    fn push(&mut self, path: &str, kind: ViolationKind, message: String) {
        self.violations.push(Violation::new(path, kind, message));
    }

    fn check(
        &mut self,
        current_id: &str,
        node: &SchemaNode,
        data: &Value,
        path: &str,
        ref_depth: usize,
    ) -> SchemaResult<()> {
        let rules = match node {
            SchemaNode::Always => return Ok(()),
            SchemaNode::Never => {
                self.push(path, ViolationKind::FalseSchema, "boolean schema is false".to_string());
                return Ok(());
            }
            SchemaNode::Rules(rules) => rules,
        };

        if let Some(reference) = &rules.reference {
            if ref_depth >= MAX_REF_DEPTH {
                return Err(SchemaError::InvalidSchema {
                    id: current_id.to_string(),
                    reason: format!("$ref chain deeper than {MAX_REF_DEPTH}"),
                });
            }
            let target_id = match reference.trim_end_matches('#') {
                "" => current_id,
                other => other,
            };
            let target = self.resolve(target_id)?;
            return self.check(target_id, &target.root, data, path, ref_depth + 1);
        }

        if let Some(types) = &rules.types {
            if !types.iter().any(|name| has_type(data, name)) {
                self.push(
                    path,
                    ViolationKind::Type {
                        expected: types.clone(),
                    },
                    format!("should be {}", types.join(",")),
                );
                return Ok(());
            }
        }

        match data {
            Value::Number(number) => {
                if let Some(value) = number.as_f64() {
                    self.check_number(rules, value, path);
                }
            }
            Value::String(text) => self.check_string(rules, text, path),
            Value::Array(items) => self.check_array(current_id, rules, items, path, ref_depth)?,
            Value::Object(map) => self.check_object(current_id, rules, map, path, ref_depth)?,
            Value::Null | Value::Bool(_) => {}
        }

        if let Some(allowed) = &rules.enum_values {
            if !allowed.contains(data) {
                self.push(
                    path,
                    ViolationKind::Enum,
                    "should be equal to one of the allowed values".to_string(),
                );
            }
        }
        Ok(())
    }

    fn check_number(&mut self, rules: &Rules, value: f64, path: &str) {
        if let Some(maximum) = rules.maximum {
            if value > maximum {
                self.push(path, ViolationKind::Maximum, format!("should be <= {maximum}"));
            }
        }
        if let Some(minimum) = rules.minimum {
            if value < minimum {
                self.push(path, ViolationKind::Minimum, format!("should be >= {minimum}"));
            }
        }
    }

    fn check_string(&mut self, rules: &Rules, text: &str, path: &str) {
        let length = text.chars().count() as u64;
        if let Some(max) = rules.max_length {
            if length > max {
                self.push(
                    path,
                    ViolationKind::MaxLength,
                    format!("should NOT be longer than {max} characters"),
                );
            }
        }
        if let Some(min) = rules.min_length {
            if length < min {
                self.push(
                    path,
                    ViolationKind::MinLength,
                    format!("should NOT be shorter than {min} characters"),
                );
            }
        }
        if let Some(pattern) = &rules.pattern {
            if !pattern.is_match(text) {
                self.push(
                    path,
                    ViolationKind::Pattern {
                        pattern: pattern.as_str().to_string(),
                    },
                    format!("should match pattern \"{}\"", pattern.as_str()),
                );
            }
        }
    }

    fn check_array(
        &mut self,
        current_id: &str,
        rules: &Rules,
        items: &[Value],
        path: &str,
        ref_depth: usize,
    ) -> SchemaResult<()> {
        let count = items.len() as u64;
        if let Some(max) = rules.max_items {
            if count > max {
                self.push(
                    path,
                    ViolationKind::MaxItems,
                    format!("should NOT have more than {max} items"),
                );
            }
        }
        if let Some(min) = rules.min_items {
            if count < min {
                self.push(
                    path,
                    ViolationKind::MinItems,
                    format!("should NOT have fewer than {min} items"),
                );
            }
        }
        match &rules.items {
            None => {}
            Some(Items::Each(schema)) => {
                for (index, item) in items.iter().enumerate() {
                    let item_path = child_index_path(path, index);
                    self.check(current_id, schema, item, &item_path, ref_depth)?;
                }
            }
            Some(Items::Tuple(schemas)) => {
                for (index, (schema, item)) in schemas.iter().zip(items).enumerate() {
                    let item_path = child_index_path(path, index);
                    self.check(current_id, schema, item, &item_path, ref_depth)?;
                }
            }
        }
        Ok(())
    }

    fn check_object(
        &mut self,
        current_id: &str,
        rules: &Rules,
        map: &Map<String, Value>,
        path: &str,
        ref_depth: usize,
    ) -> SchemaResult<()> {
        for property in &rules.required {
            if !map.contains_key(property) {
                self.push(
                    path,
                    ViolationKind::Required {
                        property: property.clone(),
                    },
                    format!("should have required property '{property}'"),
                );
            }
        }
        for (name, schema) in &rules.properties {
            if let Some(value) = map.get(name) {
                let property_path = child_property_path(path, name);
                self.check(current_id, schema, value, &property_path, ref_depth)?;
            }
        }
        if let Some(additional) = &rules.additional {
            for (name, value) in map {
                if rules.properties.iter().any(|(known, _)| known == name) {
                    continue;
                }
                match additional {
                    SchemaNode::Never => self.push(
                        path,
                        ViolationKind::AdditionalProperties {
                            property: name.clone(),
                        },
                        "should NOT have additional properties".to_string(),
                    ),
                    schema => {
                        let property_path = child_property_path(path, name);
                        self.check(current_id, schema, value, &property_path, ref_depth)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn has_type(data: &Value, name: &str) -> bool {
    match name {
        "null" => data.is_null(),
        "boolean" => data.is_boolean(),
        "object" => data.is_object(),
        "array" => data.is_array(),
        "string" => data.is_string(),
        "number" => data.is_number(),
        "integer" => match data {
            Value::Number(number) => {
                number.is_i64()
                    || number.is_u64()
                    || number.as_f64().is_some_and(|value| value.fract() == 0.0)
            }
            _ => false,
        },
        _ => false,
    }
}
