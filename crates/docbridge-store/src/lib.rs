pub mod memory;
mod query;
pub mod store;
pub mod types;

pub use memory::{MemoryCursor, MemoryDocumentStore};
pub use store::{DocumentCursor, DocumentStore, StoreError, StoreOutcome, StoreResult, StoreVerb};
pub use types::{
    Document, DocumentId, FindOptions, ID_FIELD, RemoveOptions, UpdateOptions, insert_ack,
    remove_ack, update_ack,
};
