//! Argument shaping between a parsed message and a store call.
//!
//! Steps run in a fixed order and the first failure wins: shape validation,
//! model resolution, allowed actions, schema validation, reshaping, ownership
//! securing and verb resolution.

use crate::actions::Action;
use crate::errors::{BridgeError, BridgeResult};
use crate::models::{Model, ModelRegistry};
use docbridge_schema::SchemaRegistry;
use docbridge_store::StoreVerb;
use serde_json::{Map, Value};

pub const MAX_ARGUMENTS: usize = 3;
pub const OWNER_FIELD: &str = "owner";

/// Positional arguments for a store call, between one and three entries.
#[derive(Clone, Debug, PartialEq)]
pub struct CallArguments(Vec<Value>);

impl CallArguments {
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.0.clone())
    }
}

/// What the pipeline needs to know about one inbound call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallRequest {
    pub collection: String,
    pub action: String,
    pub arguments: Option<Value>,
    pub owner: Option<Value>,
}

/// A call ready for the execution adapter.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapedCall {
    pub collection: String,
    pub action: Action,
    pub verb: StoreVerb,
    pub arguments: CallArguments,
}

#[derive(Clone, Copy, Debug)]
pub struct Pipeline<'a> {
    has_store: bool,
    models: Option<&'a ModelRegistry>,
    schemas: &'a SchemaRegistry,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        has_store: bool,
        models: Option<&'a ModelRegistry>,
        schemas: &'a SchemaRegistry,
    ) -> Self {
        Self {
            has_store,
            models,
            schemas,
        }
    }

    pub fn shape(&self, request: CallRequest) -> BridgeResult<ShapedCall> {
        let CallRequest {
            collection,
            action,
            arguments,
            owner,
        } = request;

        let (action, arguments) =
            validate_input(self.has_store, &collection, arguments, &action)?;
        let model = get_model(self.models, &collection)?;
        check_allowed(model, action)?;
        if action != Action::Unset {
            if let Some(data) = get_data(&arguments, action) {
                validate_data(self.schemas, model, data, action)?;
            }
        }
        let arguments = format_args(arguments, action);
        let arguments = secure_args(model, arguments, owner.as_ref())?;

        Ok(ShapedCall {
            collection,
            action,
            verb: resolve_verb(action),
            arguments,
        })
    }
}

/// Checks the raw call shape and returns the typed action with its arguments.
pub fn validate_input(
    has_store: bool,
    collection: &str,
    arguments: Option<Value>,
    action: &str,
) -> BridgeResult<(Action, CallArguments)> {
    if !has_store {
        return Err(BridgeError::input("a document store handle must be defined"));
    }
    if collection.is_empty() {
        return Err(BridgeError::input(
            "impossible to execute the action if the collection was not specified",
        ));
    }
    let Some(arguments) = arguments else {
        return Err(BridgeError::input(
            "impossible to execute the action if no arguments were specified",
        ));
    };
    if action.is_empty() {
        return Err(BridgeError::input(
            "impossible to execute the action if the action was not specified",
        ));
    }
    let Some(typed) = Action::parse(action) else {
        return Err(BridgeError::input(format!(
            "impossible to execute the action because the action {action} is not valid"
        )));
    };
    let Value::Array(values) = arguments else {
        return Err(BridgeError::input("query arguments must be an array"));
    };
    if values.len() > MAX_ARGUMENTS {
        return Err(BridgeError::input("too many arguments were defined in a query"));
    }
    if values.is_empty() {
        return Err(BridgeError::input("no arguments were defined in a query"));
    }
    if typed.is_basic() && values.len() == MAX_ARGUMENTS {
        return Err(BridgeError::input(format!(
            "a query for a basic action ({typed}) can't have {MAX_ARGUMENTS} arguments"
        )));
    }
    Ok((typed, CallArguments(values)))
}

pub fn get_model<'m>(models: Option<&'m ModelRegistry>, collection: &str) -> BridgeResult<&'m Model> {
    let Some(models) = models else {
        return Err(BridgeError::ModelNotFound(
            "it is mandatory to provide models to validate the schema".to_string(),
        ));
    };
    models.get(collection).ok_or_else(|| {
        BridgeError::ModelNotFound(format!("required model does not exist: {collection}"))
    })
}

pub fn check_allowed(model: &Model, action: Action) -> BridgeResult<()> {
    if model.allows(action) {
        Ok(())
    } else {
        Err(BridgeError::ActionNotAllowed {
            collection: model.name.clone(),
            action,
        })
    }
}

/// The argument carrying data to validate, if any. A `null` update body counts
/// as none; an insert document is always validated, `null` included.
pub fn get_data(arguments: &CallArguments, action: Action) -> Option<&Value> {
    if action.is_query() {
        None
    } else if action.is_basic() {
        arguments.get(0)
    } else {
        arguments.get(1).filter(|data| !data.is_null())
    }
}

/// Validates `data` against the model schema. Array-update actions accept a
/// field holding a single element where the schema declares an array.
pub fn validate_data(
    schemas: &SchemaRegistry,
    model: &Model,
    data: &Value,
    action: Action,
) -> BridgeResult<()> {
    let Some(schema_id) = model.schema_id.as_deref() else {
        return Err(BridgeError::Schema(format!(
            "the schema does not exist for model {}",
            model.name
        )));
    };
    let violation = schemas
        .validate(schema_id, data)?
        .into_iter()
        .find(|violation| !(action.is_array() && violation.expects_array()));
    match violation {
        Some(violation) => Err(BridgeError::Schema(violation.to_string())),
        None => Ok(()),
    }
}

/// Wraps argument 1 of non-basic actions in their update operator.
pub fn format_args(arguments: CallArguments, action: Action) -> CallArguments {
    if action.is_basic() {
        return arguments;
    }
    let mut values = arguments.0;
    let data = if values.len() > 1 {
        std::mem::take(&mut values[1])
    } else {
        values.push(Value::Null);
        Value::Null
    };
    let mut update = Map::new();
    update.insert(action.operator(), data);
    values[1] = Value::Object(update);
    CallArguments(values)
}

/// Scopes argument 0 of private models to `owner`.
pub fn secure_args(
    model: &Model,
    arguments: CallArguments,
    owner: Option<&Value>,
) -> BridgeResult<CallArguments> {
    if !model.private {
        return Ok(arguments);
    }
    let Some(owner) = owner else {
        return Err(BridgeError::Ownership);
    };

    let mut values = arguments.0;
    let scoped = match std::mem::take(&mut values[0]) {
        Value::Null => stamp(Map::new(), owner),
        Value::Object(fields) => stamp(fields, owner),
        Value::Array(documents) => Value::Array(
            documents
                .into_iter()
                .map(|document| match document {
                    Value::Object(fields) => stamp(fields, owner),
                    other => other,
                })
                .collect(),
        ),
        other => {
            return Err(BridgeError::input(format!(
                "cannot secure a {} argument with an owner",
                value_kind(&other)
            )));
        }
    };
    values[0] = scoped;
    Ok(CallArguments(values))
}

pub fn resolve_verb(action: Action) -> StoreVerb {
    action.verb()
}

fn stamp(mut fields: Map<String, Value>, owner: &Value) -> Value {
    fields.insert(OWNER_FIELD.to_string(), owner.clone());
    Value::Object(fields)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
