use crate::actions::Action;
use docbridge_schema::SchemaError;
use docbridge_store::StoreError;

/// Failures surfaced by the bridge. The display text of every variant except
/// `Callback` becomes the payload of a `fail` response.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("{0}")]
    Callback(String),

    #[error("{0}")]
    Input(String),

    #[error("message type is not valid for the bridge: {0:?}")]
    BadTypeFormat(String),

    #[error("cannot process an empty message")]
    EmptyMessage,

    #[error("message has no type")]
    MissingType,

    #[error("message has no payload")]
    MissingPayload,

    #[error("{0}")]
    ModelNotFound(String),

    #[error("action {action} is not allowed on model {collection}")]
    ActionNotAllowed { collection: String, action: Action },

    #[error("invalid model {collection}: {reason}")]
    InvalidModel { collection: String, reason: String },

    #[error("{0}")]
    Schema(String),

    #[error("an owner must be defined in order to secure the query on private models")]
    Ownership,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BridgeError {
    pub(crate) fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }
}

impl From<SchemaError> for BridgeError {
    fn from(error: SchemaError) -> Self {
        Self::Schema(error.to_string())
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
