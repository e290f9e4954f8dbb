//! In-memory document store
//!
//! Reference implementation of [`DocumentStore`] used by the CLI and the
//! tests. Collections map to clusters, documents to positions inside a
//! cluster, and a global index maps external ids to record references.

use super::acl::Acl;
use super::config::StoreConfig;
use super::document::{Document, DocumentFormat, JsonMap, split_system_fields};
use super::principals::PrincipalRegistry;
use super::store::{DocumentStore, QueryOutput};
use crate::core::{
    Caller, DocumentId, GrantAction, GrantStep, PermissionKind, RecordId, StoreError, StoreResult,
};
use crate::query::{Filter, QueryParams, WhereClauseValidator, lookup};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug)]
struct Collection {
    cluster: u32,
    frozen: bool,
    next_position: u64,
    records: BTreeMap<u64, Document>,
}

impl Collection {
    fn new(cluster: u32) -> Self {
        Self {
            cluster,
            frozen: false,
            next_position: 0,
            records: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
struct StoreState {
    collections: HashMap<String, Collection>,
    index: HashMap<DocumentId, RecordId>,
    principals: PrincipalRegistry,
    next_cluster: u32,
}

impl StoreState {
    fn collection(&self, name: &str) -> StoreResult<&Collection> {
        self.collections
            .get(name)
            .ok_or_else(|| StoreError::InvalidCollection(name.to_string()))
    }

    fn collection_mut(&mut self, name: &str) -> StoreResult<&mut Collection> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| StoreError::InvalidCollection(name.to_string()))
    }

    fn create_collection(&mut self, name: &str) -> StoreResult<()> {
        validate_collection_name(name)?;

        if self.collections.contains_key(name) {
            return Err(StoreError::InvalidCollection(format!(
                "collection '{}' already exists",
                name
            )));
        }

        let cluster = self.next_cluster;
        self.next_cluster += 1;
        self.collections.insert(name.to_string(), Collection::new(cluster));
        Ok(())
    }

    /// Record `rid` inside `collection`; records of other collections are not found
    fn document(&self, collection: &str, rid: RecordId) -> StoreResult<&Document> {
        let coll = self.collection(collection)?;
        if coll.cluster != rid.cluster {
            return Err(StoreError::DocumentNotFound(rid.to_string()));
        }
        coll.records
            .get(&rid.position)
            .ok_or_else(|| StoreError::DocumentNotFound(rid.to_string()))
    }

    fn document_mut(&mut self, collection: &str, rid: RecordId) -> StoreResult<&mut Document> {
        let coll = self.collection_mut(collection)?;
        if coll.cluster != rid.cluster {
            return Err(StoreError::DocumentNotFound(rid.to_string()));
        }
        coll.records
            .get_mut(&rid.position)
            .ok_or_else(|| StoreError::DocumentNotFound(rid.to_string()))
    }
}

/// In-memory implementation of [`DocumentStore`]
pub struct MemoryDocumentStore {
    state: RwLock<StoreState>,
    validator: WhereClauseValidator,
    config: StoreConfig,
}

impl MemoryDocumentStore {
    /// Create a store with default configuration
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let state = StoreState {
            collections: HashMap::new(),
            index: HashMap::new(),
            principals: PrincipalRegistry::new(&config.admin_role),
            next_cluster: 1,
        };

        Self {
            state: RwLock::new(state),
            validator: WhereClauseValidator::new(),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// A caller carrying the configured admin role
    pub fn admin_caller(&self) -> Caller {
        Caller::new(
            PrincipalRegistry::DEFAULT_ADMIN_USERNAME,
            vec![self.config.admin_role.clone()],
        )
    }

    pub async fn create_collection(&self, name: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.create_collection(name)?;
        log::debug!("created collection {}", name);
        Ok(())
    }

    pub async fn collection_exists(&self, name: &str) -> bool {
        self.state.read().await.collections.contains_key(name)
    }

    /// Make `create` on this collection decline silently
    pub async fn freeze_collection(&self, name: &str, frozen: bool) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.collection_mut(name)?.frozen = frozen;
        Ok(())
    }

    pub async fn document_count(&self, collection: &str) -> StoreResult<usize> {
        let state = self.state.read().await;
        Ok(state.collection(collection)?.records.len())
    }

    pub async fn create_user(&self, username: &str, roles: &[String]) -> StoreResult<()> {
        self.state.write().await.principals.create_user(username, roles)
    }

    pub async fn create_role(&self, name: &str) -> StoreResult<()> {
        self.state.write().await.principals.create_role(name)
    }

    /// The caller a session for `username` would carry
    pub async fn caller_for(&self, username: &str) -> StoreResult<Caller> {
        let state = self.state.read().await;
        let user = state.principals.get_user(username)?;
        Ok(Caller::new(
            user.username(),
            user.roles().map(str::to_string).collect(),
        ))
    }

    /// Snapshot of a document ACL, bypassing access checks
    pub async fn acl(&self, id: &DocumentId) -> StoreResult<Acl> {
        let state = self.state.read().await;
        let rid = *state
            .index
            .get(id)
            .ok_or_else(|| StoreError::RidNotFound(id.to_string()))?;

        state
            .collections
            .values()
            .find(|c| c.cluster == rid.cluster)
            .and_then(|c| c.records.get(&rid.position))
            .map(|doc| doc.acl().clone())
            .ok_or_else(|| StoreError::DocumentNotFound(rid.to_string()))
    }

    fn is_admin(&self, caller: &Caller) -> bool {
        caller.has_role(&self.config.admin_role)
    }

    /// Admins and authors bypass the ACL
    fn can(&self, caller: &Caller, doc: &Document, permission: PermissionKind) -> bool {
        self.is_admin(caller) || doc.author() == caller.username() || doc.acl().allows(caller, permission)
    }

    fn compile_filter(&self, params: &QueryParams) -> StoreResult<Option<Filter>> {
        let Some(clause) = params.where_clause.as_deref() else {
            return Ok(None);
        };

        let expr = if self.config.validate_queries {
            self.validator.validate(clause)?
        } else {
            self.validator.parse(clause)?
        };

        Filter::compile(expr, &params.params).map(Some)
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn resolve(&self, id: &DocumentId) -> StoreResult<RecordId> {
        let state = self.state.read().await;
        state
            .index
            .get(id)
            .copied()
            .ok_or_else(|| StoreError::RidNotFound(id.to_string()))
    }

    async fn get(&self, caller: &Caller, collection: &str, rid: RecordId) -> StoreResult<Option<Document>> {
        let state = self.state.read().await;
        let doc = state.document(collection, rid)?;

        if !self.can(caller, doc, PermissionKind::Read) {
            return Ok(None);
        }
        Ok(Some(doc.clone()))
    }

    async fn query(&self, caller: &Caller, collection: &str, params: &QueryParams) -> StoreResult<QueryOutput> {
        let filter = self.compile_filter(params)?;

        let state = self.state.read().await;
        let coll = state.collection(collection)?;

        let mut matched: Vec<(&Document, JsonValue)> = Vec::new();
        for doc in coll.records.values() {
            if !self.can(caller, doc, PermissionKind::Read) {
                continue;
            }

            let view = doc.to_json(DocumentFormat::Document)?;
            if let Some(filter) = &filter {
                if !filter.matches(&view)? {
                    continue;
                }
            }
            matched.push((doc, view));
        }

        if params.count {
            return Ok(QueryOutput::Count(matched.len()));
        }

        if let Some(order) = &params.order_by {
            let path: Vec<String> = order.field.split('.').map(str::to_string).collect();
            matched.sort_by(|(_, a), (_, b)| {
                let ordering = sort_order(lookup(a, &path), lookup(b, &path));
                if order.descending { ordering.reverse() } else { ordering }
            });
        }

        let (offset, limit) = params.window(
            self.config.default_records_per_page,
            self.config.max_records_per_page,
        );

        let documents = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(doc, _)| doc.clone())
            .collect();

        Ok(QueryOutput::Documents(documents))
    }

    async fn create(&self, caller: &Caller, collection: &str, data: &JsonMap) -> StoreResult<Option<Document>> {
        let (content, _) = split_system_fields(data, None)?;

        let mut state = self.state.write().await;
        if !state.collections.contains_key(collection) {
            if !self.config.auto_create_collections {
                return Err(StoreError::InvalidCollection(collection.to_string()));
            }
            state.create_collection(collection)?;
        }

        let coll = state.collection_mut(collection)?;
        if coll.frozen {
            log::debug!("collection {} is frozen, declining create", collection);
            return Ok(None);
        }

        let rid = RecordId::new(coll.cluster, coll.next_position);
        coll.next_position += 1;

        let id = DocumentId::new_v4();
        let doc = Document::new(id, rid, collection, caller.username(), content);
        coll.records.insert(rid.position, doc.clone());
        state.index.insert(id, rid);

        Ok(Some(doc))
    }

    async fn update(&self, caller: &Caller, collection: &str, rid: RecordId, data: &JsonMap) -> StoreResult<Document> {
        let mut state = self.state.write().await;

        let (id, current) = {
            let doc = state.document(collection, rid)?;
            if !self.can(caller, doc, PermissionKind::Update) {
                return Err(StoreError::PermissionDenied(format!(
                    "{} cannot update {}",
                    caller.username(),
                    doc.id()
                )));
            }
            (*doc.id(), doc.version())
        };

        let (content, supplied) = split_system_fields(data, Some(&id))?;
        if let Some(supplied) = supplied {
            if supplied != current {
                return Err(StoreError::VersionConflict {
                    id: id.to_string(),
                    current,
                    supplied,
                });
            }
        }

        let doc = state.document_mut(collection, rid)?;
        doc.replace_data(content);
        Ok(doc.clone())
    }

    async fn delete(&self, caller: &Caller, collection: &str, rid: RecordId) -> StoreResult<()> {
        let mut state = self.state.write().await;

        let id = {
            let doc = state.document(collection, rid)?;
            if !self.can(caller, doc, PermissionKind::Delete) {
                return Err(StoreError::PermissionDenied(format!(
                    "{} cannot delete {}",
                    caller.username(),
                    doc.id()
                )));
            }
            *doc.id()
        };

        state.collection_mut(collection)?.records.remove(&rid.position);
        state.index.remove(&id);
        Ok(())
    }

    async fn alter_grant(&self, caller: &Caller, collection: &str, rid: RecordId, step: &GrantStep) -> StoreResult<()> {
        let mut state = self.state.write().await;

        {
            let doc = state.document(collection, rid)?;
            if !self.can(caller, doc, PermissionKind::Update) {
                return Err(StoreError::PermissionDenied(format!(
                    "{} cannot alter grants on {}",
                    caller.username(),
                    doc.id()
                )));
            }
        }

        state.principals.ensure_exists(step.principal, &step.name)?;

        let acl = state.document_mut(collection, rid)?.acl_mut();
        match step.action {
            GrantAction::Grant => acl.grant(step.permission, step.principal, &step.name),
            GrantAction::Revoke => acl.revoke(step.permission, step.principal, &step.name),
        };
        Ok(())
    }
}

/// Total order for sorting: booleans, then numbers, then strings, then the rest
fn sort_order(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    fn rank(value: Option<&JsonValue>) -> u8 {
        match value {
            Some(JsonValue::Bool(_)) => 0,
            Some(JsonValue::Number(_)) => 1,
            Some(JsonValue::String(_)) => 2,
            _ => 3,
        }
    }

    match (a, b) {
        (Some(JsonValue::Bool(x)), Some(JsonValue::Bool(y))) => x.cmp(y),
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Validates collection names
pub fn validate_collection_name(name: &str) -> StoreResult<()> {
    let Some(first) = name.chars().next() else {
        return Err(StoreError::InvalidCollection(
            "Collection name cannot be empty".to_string(),
        ));
    };

    if !first.is_alphabetic() && first != '_' {
        return Err(StoreError::InvalidCollection(
            "Collection name must start with a letter or underscore".to_string(),
        ));
    }

    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidCollection(
            "Collection name can only contain letters, numbers, and underscores".to_string(),
        ));
    }

    if name.len() > 64 {
        return Err(StoreError::InvalidCollection(
            "Collection name too long (max 64 characters)".to_string(),
        ));
    }

    Ok(())
}
