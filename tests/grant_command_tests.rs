/// Grant and revoke command tests
///
/// Ordering of users/roles and permission kinds, entry validation, and the
/// fact that a failing entry leaves earlier entries applied.
/// Run with: cargo test --test grant_command_tests

use docguard::{
    Acl, Caller, CommandEngine, CommandEnvelope, CommandFailure, DocumentId, MemoryDocumentStore,
    PermissionKind, PrincipalKind,
};
use serde_json::{Value, json};
use std::sync::Arc;

struct Fixture {
    store: Arc<MemoryDocumentStore>,
    engine: CommandEngine,
    admin: Caller,
    doc: DocumentId,
}

async fn setup() -> Fixture {
    let store = Arc::new(MemoryDocumentStore::new());
    store.create_collection("posts").await.unwrap();
    store.create_role("editors").await.unwrap();
    for user in ["alice", "bob", "carol"] {
        store.create_user(user, &["registered".into()]).await.unwrap();
    }

    let admin = store.admin_caller();
    let engine = CommandEngine::new(store.clone());

    let post = CommandEnvelope::from_json(json!({
        "resource": "documents",
        "name": "post",
        "params": {"collection": "posts", "data": {"title": "shared"}}
    }))
    .unwrap();
    let created = engine.execute(&admin, &post).await.unwrap().unwrap();
    let doc = DocumentId::parse(created["id"].as_str().unwrap()).unwrap();

    Fixture {
        store,
        engine,
        admin,
        doc,
    }
}

impl Fixture {
    async fn alter(&self, caller: &Caller, name: &str, grants: Value) -> Result<Option<Value>, CommandFailure> {
        let mut params = json!({"collection": "posts", "id": self.doc.to_string()});
        if let (Some(params), Some(grants)) = (params.as_object_mut(), grants.as_object()) {
            params.extend(grants.clone());
        }

        let env = CommandEnvelope::from_json(json!({"resource": "documents", "name": name, "params": params}))
            .unwrap();
        self.engine.execute(caller, &env).await
    }

    async fn acl(&self) -> Acl {
        self.store.acl(&self.doc).await.unwrap()
    }

    async fn get_as(&self, username: &str) -> Option<Value> {
        let caller = self.store.caller_for(username).await.unwrap();
        let env = CommandEnvelope::from_json(json!({
            "resource": "documents",
            "name": "get",
            "params": {"collection": "posts", "id": self.doc.to_string()}
        }))
        .unwrap();
        self.engine.execute(&caller, &env).await.unwrap()
    }
}

#[tokio::test]
async fn test_grant_returns_true_and_applies() {
    let fx = setup().await;
    assert_eq!(fx.get_as("alice").await, None);

    let result = fx
        .alter(&fx.admin, "grant", json!({"users": {"read": ["alice"]}, "roles": {"write": ["editors"]}}))
        .await;
    assert_eq!(result, Ok(Some(json!(true))));

    let acl = fx.acl().await;
    assert!(acl.holds(PermissionKind::Read, PrincipalKind::User, "alice"));
    assert!(acl.holds(PermissionKind::Update, PrincipalKind::Role, "editors"));
    assert!(fx.get_as("alice").await.is_some());
}

#[tokio::test]
async fn test_grant_then_revoke_restores_acl() {
    let fx = setup().await;
    fx.alter(&fx.admin, "grant", json!({"roles": {"delete": ["editors"]}}))
        .await
        .unwrap();
    let before = fx.acl().await;

    let grants = json!({
        "users": {"read": ["alice", "bob"], "all": ["carol"]},
        "roles": {"write": ["registered"]}
    });
    fx.alter(&fx.admin, "grant", grants.clone()).await.unwrap();
    assert_ne!(fx.acl().await, before);

    let result = fx.alter(&fx.admin, "revoke", grants).await;
    assert_eq!(result, Ok(Some(json!(true))));
    assert_eq!(fx.acl().await, before);
}

#[tokio::test]
async fn test_non_string_entry_stops_after_earlier_entries() {
    let fx = setup().await;

    let failure = fx
        .alter(&fx.admin, "grant", json!({"users": {"read": ["alice", "bob", 42]}}))
        .await
        .unwrap_err();
    assert!(failure.error.is_parsing());
    assert_eq!(failure.error.message(), "invalid user name specified: 42");

    let acl = fx.acl().await;
    assert!(acl.holds(PermissionKind::Read, PrincipalKind::User, "alice"));
    assert!(acl.holds(PermissionKind::Read, PrincipalKind::User, "bob"));
}

#[tokio::test]
async fn test_invalid_role_entry() {
    let fx = setup().await;

    let failure = fx
        .alter(&fx.admin, "revoke", json!({"roles": {"all": [{"name": "editors"}]}}))
        .await
        .unwrap_err();
    assert!(failure.error.is_parsing());
    assert_eq!(
        failure.error.message(),
        r#"invalid role name specified: {"name":"editors"}"#
    );
}

#[tokio::test]
async fn test_users_processed_before_roles() {
    let fx = setup().await;

    // The role entry fails only if it is reached; the user batch comes first
    let failure = fx
        .alter(
            &fx.admin,
            "grant",
            json!({"roles": {"read": ["ghosts"]}, "users": {"read": ["alice"], "delete": ["nobody"]}}),
        )
        .await
        .unwrap_err();
    assert_eq!(failure.error.message(), "user nobody not found");

    let acl = fx.acl().await;
    assert!(acl.holds(PermissionKind::Read, PrincipalKind::User, "alice"));
    assert!(acl.grantees(PermissionKind::Read).is_some_and(|g| g.roles.is_empty()));
}

#[tokio::test]
async fn test_role_failure_keeps_user_grants() {
    let fx = setup().await;

    let failure = fx
        .alter(
            &fx.admin,
            "grant",
            json!({
                "users": {"read": ["alice", "bob"], "write": ["carol"]},
                "roles": {"read": ["editors", "ghosts"]}
            }),
        )
        .await
        .unwrap_err();
    assert!(failure.error.is_execution());
    assert_eq!(failure.error.message(), "role ghosts not found");

    let acl = fx.acl().await;
    assert!(acl.holds(PermissionKind::Read, PrincipalKind::User, "alice"));
    assert!(acl.holds(PermissionKind::Read, PrincipalKind::User, "bob"));
    assert!(acl.holds(PermissionKind::Update, PrincipalKind::User, "carol"));
    assert!(acl.holds(PermissionKind::Read, PrincipalKind::Role, "editors"));
    assert!(!acl.holds(PermissionKind::Read, PrincipalKind::Role, "ghosts"));

    // Applied entries are live, not just recorded
    assert!(fx.get_as("bob").await.is_some());
}

#[tokio::test]
async fn test_permission_kinds_in_order() {
    let fx = setup().await;

    // all is processed after read/write/delete, so the failing `all` entry
    // leaves the other three applied
    let failure = fx
        .alter(
            &fx.admin,
            "grant",
            json!({"users": {"all": ["nobody"], "delete": ["carol"], "write": ["bob"], "read": ["alice"]}}),
        )
        .await
        .unwrap_err();
    assert!(failure.error.is_execution());

    let acl = fx.acl().await;
    assert!(acl.holds(PermissionKind::Read, PrincipalKind::User, "alice"));
    assert!(acl.holds(PermissionKind::Update, PrincipalKind::User, "bob"));
    assert!(acl.holds(PermissionKind::Delete, PrincipalKind::User, "carol"));
    assert!(acl.grantees(PermissionKind::All).is_none());
}

#[tokio::test]
async fn test_unknown_role_aborts() {
    let fx = setup().await;

    let failure = fx
        .alter(&fx.admin, "grant", json!({"roles": {"read": ["editors", "ghosts", "registered"]}}))
        .await
        .unwrap_err();
    assert!(failure.error.is_execution());
    assert_eq!(failure.error.message(), "role ghosts not found");

    let acl = fx.acl().await;
    assert!(acl.holds(PermissionKind::Read, PrincipalKind::Role, "editors"));
    assert!(!acl.holds(PermissionKind::Read, PrincipalKind::Role, "registered"));
}

#[tokio::test]
async fn test_all_is_independent_of_other_kinds() {
    let fx = setup().await;

    fx.alter(&fx.admin, "grant", json!({"users": {"all": ["alice"]}}))
        .await
        .unwrap();
    assert!(fx.get_as("alice").await.is_some());

    // Revoking read leaves the all entry, and with it read access
    fx.alter(&fx.admin, "revoke", json!({"users": {"read": ["alice"]}}))
        .await
        .unwrap();
    assert!(fx.acl().await.holds(PermissionKind::All, PrincipalKind::User, "alice"));
    assert!(fx.get_as("alice").await.is_some());

    fx.alter(&fx.admin, "revoke", json!({"users": {"all": ["alice"]}}))
        .await
        .unwrap();
    assert_eq!(fx.get_as("alice").await, None);
}

#[tokio::test]
async fn test_shape_errors_apply_nothing() {
    let fx = setup().await;

    let failure = fx
        .alter(&fx.admin, "grant", json!({"users": {"read": ["alice"]}, "roles": {"write": "editors"}}))
        .await
        .unwrap_err();
    assert!(failure.error.is_parsing());
    assert_eq!(failure.error.message(), "targets of permissions must be an array");
    assert!(fx.acl().await.is_empty());
}

#[tokio::test]
async fn test_grant_unresolved_document() {
    let fx = setup().await;
    let missing = DocumentId::new_v4();

    let env = CommandEnvelope::from_json(json!({
        "resource": "documents",
        "name": "grant",
        "params": {"collection": "posts", "id": missing.to_string(), "users": {"read": ["alice"]}}
    }))
    .unwrap();
    let failure = fx.engine.execute(&fx.admin, &env).await.unwrap_err();

    assert!(failure.error.is_execution());
    assert_eq!(failure.error.message(), format!("document {} not found", missing));
}

#[tokio::test]
async fn test_only_privileged_callers_alter_grants() {
    let fx = setup().await;
    let bob = fx.store.caller_for("bob").await.unwrap();

    let failure = fx
        .alter(&bob, "grant", json!({"users": {"read": ["bob"]}}))
        .await
        .unwrap_err();
    assert_eq!(
        failure.error.message(),
        format!("you don't have permissions to alter grants on: {}", fx.doc)
    );

    fx.alter(&fx.admin, "grant", json!({"users": {"write": ["bob"]}}))
        .await
        .unwrap();
    let result = fx.alter(&bob, "grant", json!({"users": {"read": ["carol"]}})).await;
    assert_eq!(result, Ok(Some(json!(true))));
}

#[tokio::test]
async fn test_empty_grant_succeeds() {
    let fx = setup().await;
    assert_eq!(fx.alter(&fx.admin, "grant", json!({})).await, Ok(Some(json!(true))));
}
