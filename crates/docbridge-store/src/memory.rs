use crate::query::{apply_update, criteria_document, matches, type_name, update_document};
use crate::store::{DocumentCursor, DocumentStore, StoreError, StoreOutcome, StoreResult};
use crate::types::{
    Document, FindOptions, ID_FIELD, RemoveOptions, UpdateOptions, insert_ack, parse_options,
    remove_ack, update_ack,
};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryState {
    pub collections: BTreeMap<String, Vec<Document>>,
}

/// Reference backend that keeps every collection in process memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store preloaded with `collections`; documents lacking `_id` get one.
    pub fn with_collections(collections: BTreeMap<String, Vec<Document>>) -> Self {
        let collections = collections
            .into_iter()
            .map(|(name, documents)| (name, documents.into_iter().map(with_id).collect()))
            .collect();
        Self {
            inner: Arc::new(Mutex::new(MemoryState { collections })),
        }
    }

    pub fn documents(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let state = self.lock()?;
        Ok(state
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    pub fn collection_names(&self) -> StoreResult<Vec<String>> {
        let state = self.lock()?;
        Ok(state.collections.keys().cloned().collect())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store mutex poisoned".to_string()))
    }
}

fn with_id(mut document: Document) -> Document {
    if !document.contains_key(ID_FIELD) {
        document.insert(
            ID_FIELD.to_string(),
            Value::String(uuid::Uuid::new_v4().simple().to_string()),
        );
    }
    document
}

fn insertable(documents: Value) -> StoreResult<Vec<Document>> {
    let documents = match documents {
        Value::Object(document) => vec![document],
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(document) => Ok(document),
                other => Err(StoreError::InvalidInput(format!(
                    "documents to insert must be objects, got {}",
                    type_name(&other)
                ))),
            })
            .collect::<StoreResult<Vec<_>>>()?,
        other => {
            return Err(StoreError::InvalidInput(format!(
                "documents to insert must be an object or an array, got {}",
                type_name(&other)
            )));
        }
    };
    if documents.is_empty() {
        return Err(StoreError::InvalidInput(
            "no documents to insert".to_string(),
        ));
    }
    Ok(documents)
}

/// Cursor over a snapshot taken when the read ran.
#[derive(Debug, Default)]
pub struct MemoryCursor {
    pending: VecDeque<Document>,
}

impl MemoryCursor {
    pub fn new(documents: impl IntoIterator<Item = Document>) -> Self {
        Self {
            pending: documents.into_iter().collect(),
        }
    }
}

#[async_trait::async_trait]
impl DocumentCursor for MemoryCursor {
    async fn next_document(&mut self) -> StoreResult<Option<Document>> {
        Ok(self.pending.pop_front())
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(
        &self,
        collection: &str,
        criteria: Value,
        options: Option<Value>,
    ) -> StoreResult<StoreOutcome> {
        let criteria = criteria_document(criteria)?;
        let options: FindOptions = parse_options(options)?;
        let state = self.lock()?;

        let mut selected = Vec::new();
        for document in state.collections.get(collection).into_iter().flatten() {
            if matches(document, &criteria)? {
                selected.push(document.clone());
            }
        }
        let limit = options.limit.unwrap_or(usize::MAX);
        let selected: Vec<Document> = selected.into_iter().skip(options.skip).take(limit).collect();
        tracing::debug!(collection, matched = selected.len(), "memory store find");

        Ok(StoreOutcome::Cursor(Box::new(MemoryCursor::new(selected))))
    }

    async fn insert(
        &self,
        collection: &str,
        documents: Value,
        _options: Option<Value>,
    ) -> StoreResult<StoreOutcome> {
        let documents: Vec<Document> = insertable(documents)?.into_iter().map(with_id).collect();
        let mut state = self.lock()?;
        let stored = state.collections.entry(collection.to_string()).or_default();

        for (index, document) in documents.iter().enumerate() {
            let id = document.get(ID_FIELD);
            let clashes = stored.iter().any(|existing| existing.get(ID_FIELD) == id)
                || documents[..index]
                    .iter()
                    .any(|earlier| earlier.get(ID_FIELD) == id);
            if clashes {
                return Err(StoreError::InvalidInput(format!(
                    "duplicate {ID_FIELD} in collection {collection}"
                )));
            }
        }
        stored.extend(documents.iter().cloned());
        tracing::debug!(collection, inserted = documents.len(), "memory store insert");

        Ok(StoreOutcome::Ack(insert_ack(&documents)))
    }

    async fn update(
        &self,
        collection: &str,
        selector: Value,
        update: Value,
        options: Option<Value>,
    ) -> StoreResult<StoreOutcome> {
        let selector = criteria_document(selector)?;
        let update = update_document(&update)?;
        let options: UpdateOptions = parse_options(options)?;
        let mut state = self.lock()?;

        let mut matched = 0;
        let mut modified = 0;
        if let Some(stored) = state.collections.get_mut(collection) {
            for document in stored.iter_mut() {
                if !matches(document, &selector)? {
                    continue;
                }
                matched += 1;
                let mut candidate = document.clone();
                if apply_update(&mut candidate, update)? {
                    *document = candidate;
                    modified += 1;
                }
                if !options.multi {
                    break;
                }
            }
        }
        tracing::debug!(collection, matched, modified, "memory store update");

        Ok(StoreOutcome::Ack(update_ack(matched, modified)))
    }

    async fn remove(
        &self,
        collection: &str,
        selector: Value,
        options: Option<Value>,
    ) -> StoreResult<StoreOutcome> {
        let selector = criteria_document(selector)?;
        let options: RemoveOptions = parse_options(options)?;
        let mut state = self.lock()?;

        let mut deleted = 0;
        if let Some(stored) = state.collections.get_mut(collection) {
            let mut doomed = Vec::new();
            for (index, document) in stored.iter().enumerate() {
                if options.single && !doomed.is_empty() {
                    break;
                }
                if matches(document, &selector)? {
                    doomed.push(index);
                }
            }
            deleted = doomed.len();
            for index in doomed.into_iter().rev() {
                stored.remove(index);
            }
        }
        tracing::debug!(collection, deleted, "memory store remove");

        Ok(StoreOutcome::Ack(remove_ack(deleted)))
    }
}
