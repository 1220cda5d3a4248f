//! Message-driven bridge between event envelopes and a document store.
//!
//! An inbound `{id, type, payload, owner?}` message names a collection, an
//! action and optionally a field. The bridge validates and reshapes the
//! payload into positional store arguments, runs the store call, and answers
//! with a `response` or `fail` message carrying the same id and type.

pub mod actions;
pub mod adapter;
pub mod bridge;
pub mod errors;
pub mod message;
pub mod message_type;
pub mod models;
pub mod pipeline;
pub mod response;

pub use actions::{ALL_ACTIONS, Action, is_array, is_basic, is_query, is_valid};
pub use bridge::{BoundBridge, BridgeConfig, EventBridge, ResponseCallback};
pub use errors::{BridgeError, BridgeResult};
pub use message::{Message, MessageHeader, MessageStatus, Request};
pub use message_type::{ParsedType, into_arguments, parse_type};
pub use models::{Model, ModelConfig, ModelRegistry};
pub use pipeline::{
    CallArguments, CallRequest, MAX_ARGUMENTS, Pipeline, ShapedCall, check_allowed, format_args,
    get_data, get_model, resolve_verb, secure_args, validate_data, validate_input,
};
pub use response::{TRANSPORT_FIELDS, build_failure, build_success};
