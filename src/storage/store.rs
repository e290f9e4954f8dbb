use super::document::{Document, JsonMap};
use crate::core::{Caller, DocumentId, GrantStep, RecordId, StoreResult};
use crate::query::QueryParams;
use async_trait::async_trait;

/// Result of a `list` query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Documents(Vec<Document>),
    Count(usize),
}

/// Boundary of the document storage collaborator
///
/// The command layer only ever talks to storage through this trait. Each
/// call is atomic on its own; nothing here spans several calls.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Map an external id to the internal record reference
    ///
    /// Fails with `RidNotFound` when no document carries this id.
    async fn resolve(&self, id: &DocumentId) -> StoreResult<RecordId>;

    /// Fetch one document
    ///
    /// `Ok(None)` means the record exists but is not visible to `caller`.
    async fn get(&self, caller: &Caller, collection: &str, rid: RecordId) -> StoreResult<Option<Document>>;

    /// Run a query over the documents of `collection` visible to `caller`
    async fn query(&self, caller: &Caller, collection: &str, params: &QueryParams) -> StoreResult<QueryOutput>;

    /// Create a document
    ///
    /// `Ok(None)` means the store declined the creation without an error.
    async fn create(&self, caller: &Caller, collection: &str, data: &JsonMap) -> StoreResult<Option<Document>>;

    /// Replace the content of a document, honoring an optional `@version` in `data`
    async fn update(&self, caller: &Caller, collection: &str, rid: RecordId, data: &JsonMap) -> StoreResult<Document>;

    async fn delete(&self, caller: &Caller, collection: &str, rid: RecordId) -> StoreResult<()>;

    /// Apply a single grant or revoke to a document ACL
    async fn alter_grant(&self, caller: &Caller, collection: &str, rid: RecordId, step: &GrantStep) -> StoreResult<()>;
}
