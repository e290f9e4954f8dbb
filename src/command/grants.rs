//! Grant and revoke across permission kinds and principal kinds
//!
//! A request is applied one entry at a time, users before roles, kinds in
//! `PermissionKind::ORDERED`, names in array order. There is no rollback:
//! when an entry fails, every entry before it stays applied and the
//! [`GrantReport`] inside the [`GrantFailure`] says which ones.

use super::dispatcher::{CommandContext, CommandHandler, CommandName};
use super::envelope::CommandEnvelope;
use super::error::{CommandError, CommandResult};
use super::translate;
use crate::core::{Caller, DocumentId, GrantAction, GrantStep, PermissionKind, PrincipalKind};
use crate::storage::DocumentStore;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::fmt;

/// Entries of one principal kind, keyed by permission kind
#[derive(Debug, Clone, PartialEq)]
pub struct GrantBatch {
    pub principal: PrincipalKind,
    pub targets: Vec<(PermissionKind, Vec<JsonValue>)>,
}

impl GrantBatch {
    /// Read `params.users` or `params.roles`
    ///
    /// The batch must be an object and every kind it names must map to an
    /// array. Entries themselves are checked later, one by one.
    fn from_params(envelope: &CommandEnvelope, principal: PrincipalKind) -> CommandResult<Option<Self>> {
        let node = match envelope.param(principal.param_key()) {
            None | Some(JsonValue::Null) => return Ok(None),
            Some(JsonValue::Object(node)) => node,
            Some(other) => {
                return Err(CommandError::parsing(format!(
                    "invalid {} param: {}",
                    principal.param_key(),
                    other
                )));
            }
        };

        let mut targets = Vec::new();
        for permission in PermissionKind::ORDERED {
            match node.get(permission.param_key()) {
                None => {}
                Some(JsonValue::Array(entries)) => targets.push((permission, entries.clone())),
                Some(_) => {
                    return Err(CommandError::parsing("targets of permissions must be an array"));
                }
            }
        }

        Ok(Some(Self { principal, targets }))
    }
}

/// A validated `grant` or `revoke` command body
#[derive(Debug, Clone, PartialEq)]
pub struct GrantRequest {
    pub action: GrantAction,
    pub batches: Vec<GrantBatch>,
}

impl GrantRequest {
    pub fn from_envelope(envelope: &CommandEnvelope, action: GrantAction) -> CommandResult<Self> {
        let mut batches = Vec::new();
        for principal in PrincipalKind::ORDERED {
            if let Some(batch) = GrantBatch::from_params(envelope, principal)? {
                batches.push(batch);
            }
        }

        Ok(Self { action, batches })
    }
}

/// Steps applied so far, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantReport {
    pub action: GrantAction,
    pub applied: Vec<GrantStep>,
}

impl GrantReport {
    fn new(action: GrantAction) -> Self {
        Self {
            action,
            applied: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

/// A request that stopped partway
#[derive(Debug, Clone, PartialEq)]
pub struct GrantFailure {
    pub report: GrantReport,
    pub error: CommandError,
}

impl fmt::Display for GrantFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stopped after {} applied step(s): {}",
            self.report.action,
            self.report.len(),
            self.error
        )
    }
}

impl std::error::Error for GrantFailure {}

/// Applies a [`GrantRequest`] to one document
pub struct GrantEngine<'a> {
    store: &'a dyn DocumentStore,
    caller: &'a Caller,
    collection: &'a str,
    id: DocumentId,
}

impl<'a> GrantEngine<'a> {
    pub fn new(store: &'a dyn DocumentStore, caller: &'a Caller, collection: &'a str, id: DocumentId) -> Self {
        Self {
            store,
            caller,
            collection,
            id,
        }
    }

    pub async fn apply(&self, request: &GrantRequest) -> Result<GrantReport, GrantFailure> {
        let mut report = GrantReport::new(request.action);

        let rid = match self.store.resolve(&self.id).await {
            Ok(rid) => rid,
            Err(err) => {
                let error = translate::on_grant(err, self.collection, &self.id);
                return Err(GrantFailure { report, error });
            }
        };

        for batch in &request.batches {
            for (permission, entries) in &batch.targets {
                for entry in entries {
                    let Some(name) = entry.as_str() else {
                        let error = CommandError::parsing(format!(
                            "invalid {} name specified: {}",
                            batch.principal, entry
                        ));
                        return Err(GrantFailure { report, error });
                    };

                    let step = GrantStep::new(request.action, batch.principal, *permission, name);
                    if let Err(err) = self.store.alter_grant(self.caller, self.collection, rid, &step).await {
                        let error = translate::on_grant(err, self.collection, &self.id);
                        return Err(GrantFailure { report, error });
                    }

                    log::debug!("{} on {}/{}", step, self.collection, self.id);
                    report.applied.push(step);
                }
            }
        }

        Ok(report)
    }
}

/// `grant` and `revoke` command handlers
pub struct GrantCommand {
    action: GrantAction,
}

impl GrantCommand {
    pub fn grant() -> Self {
        Self {
            action: GrantAction::Grant,
        }
    }

    pub fn revoke() -> Self {
        Self {
            action: GrantAction::Revoke,
        }
    }
}

#[async_trait]
impl CommandHandler for GrantCommand {
    fn name(&self) -> CommandName {
        match self.action {
            GrantAction::Grant => CommandName::Grant,
            GrantAction::Revoke => CommandName::Revoke,
        }
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> CommandResult<Option<JsonValue>> {
        let collection = ctx.envelope.collection()?;
        let id = ctx.envelope.document_id()?;
        let request = GrantRequest::from_envelope(ctx.envelope, self.action)?;

        let engine = GrantEngine::new(ctx.store, ctx.caller, collection, id);
        match engine.apply(&request).await {
            Ok(_) => Ok(Some(JsonValue::Bool(true))),
            Err(failure) => {
                if !failure.report.is_empty() {
                    log::warn!("{}/{}: {}", collection, id, failure);
                }
                Err(failure.error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonMap, MemoryDocumentStore};
    use serde_json::json;

    fn envelope(params: JsonValue) -> CommandEnvelope {
        CommandEnvelope::from_json(json!({"resource": "documents", "name": "grant", "params": params}))
            .unwrap()
    }

    #[test]
    fn test_request_order() {
        let env = envelope(json!({
            "roles": {"all": ["editors"], "read": ["registered"]},
            "users": {"delete": ["bob"], "write": ["alice"]}
        }));

        let request = GrantRequest::from_envelope(&env, GrantAction::Grant).unwrap();
        assert_eq!(request.batches.len(), 2);
        assert_eq!(request.batches[0].principal, PrincipalKind::User);
        assert_eq!(request.batches[1].principal, PrincipalKind::Role);

        let user_kinds: Vec<PermissionKind> = request.batches[0].targets.iter().map(|(k, _)| *k).collect();
        assert_eq!(user_kinds, vec![PermissionKind::Update, PermissionKind::Delete]);

        let role_kinds: Vec<PermissionKind> = request.batches[1].targets.iter().map(|(k, _)| *k).collect();
        assert_eq!(role_kinds, vec![PermissionKind::Read, PermissionKind::All]);
    }

    #[test]
    fn test_request_shape_errors() {
        let err = GrantRequest::from_envelope(&envelope(json!({"users": {"read": "alice"}})), GrantAction::Grant)
            .unwrap_err();
        assert_eq!(err.message(), "targets of permissions must be an array");

        let err = GrantRequest::from_envelope(&envelope(json!({"roles": ["editors"]})), GrantAction::Revoke)
            .unwrap_err();
        assert!(err.is_parsing());

        let empty = GrantRequest::from_envelope(&envelope(json!({})), GrantAction::Grant).unwrap();
        assert!(empty.batches.is_empty());
    }

    #[tokio::test]
    async fn test_engine_reports_partial_progress() {
        let store = MemoryDocumentStore::new();
        store.create_collection("posts").await.unwrap();
        store.create_user("alice", &[]).await.unwrap();
        let admin = store.admin_caller();
        let doc = store.create(&admin, "posts", &JsonMap::new()).await.unwrap().unwrap();

        let env = envelope(json!({"users": {"read": ["alice", "ghost", "admin"]}}));
        let request = GrantRequest::from_envelope(&env, GrantAction::Grant).unwrap();

        let engine = GrantEngine::new(&store, &admin, "posts", *doc.id());
        let failure = engine.apply(&request).await.unwrap_err();

        assert_eq!(failure.error.message(), "user ghost not found");
        assert_eq!(
            failure.report.applied,
            vec![GrantStep::new(GrantAction::Grant, PrincipalKind::User, PermissionKind::Read, "alice")]
        );

        let acl = store.acl(doc.id()).await.unwrap();
        assert!(acl.holds(PermissionKind::Read, PrincipalKind::User, "alice"));
        assert!(!acl.holds(PermissionKind::Read, PrincipalKind::User, "admin"));
    }

    #[tokio::test]
    async fn test_engine_unresolved_document() {
        let store = MemoryDocumentStore::new();
        let admin = store.admin_caller();
        let id = DocumentId::new_v4();

        let request = GrantRequest {
            action: GrantAction::Revoke,
            batches: Vec::new(),
        };
        let failure = GrantEngine::new(&store, &admin, "posts", id).apply(&request).await.unwrap_err();
        assert_eq!(failure.error.message(), format!("document {} not found", id));
        assert!(failure.report.is_empty());
    }
}
