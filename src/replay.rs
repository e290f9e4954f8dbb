//! Seeding an in-memory store and replaying JSON-lines command scripts
//!
//! Each non-blank input line is one command envelope; each produces exactly
//! one output line, `{"ok":true,"result":...}` or
//! `{"ok":false,"kind":"parsing"|"execution","message":...}`.

use crate::command::{CommandEnvelope, CommandError};
use crate::core::{Caller, StoreError};
use crate::facade::CommandEngine;
use crate::storage::MemoryDocumentStore;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Seeding failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SeedUser {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Initial principals and collections for a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub collections: Vec<String>,
    pub roles: Vec<String>,
    pub users: Vec<SeedUser>,
}

impl Seed {
    pub fn from_json_str(input: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Roles first so users can reference them
    pub async fn apply(&self, store: &MemoryDocumentStore) -> Result<(), ReplayError> {
        for role in &self.roles {
            store.create_role(role).await?;
        }
        for user in &self.users {
            store.create_user(&user.name, &user.roles).await?;
        }
        for collection in &self.collections {
            store.create_collection(collection).await?;
        }

        log::info!(
            "seeded {} role(s), {} user(s), {} collection(s)",
            self.roles.len(),
            self.users.len(),
            self.collections.len()
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub executed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// The output line for one command
pub fn outcome_json(outcome: &Result<Option<JsonValue>, CommandError>) -> JsonValue {
    match outcome {
        Ok(result) => json!({
            "ok": true,
            "result": result.clone().unwrap_or(JsonValue::Null),
        }),
        Err(err) => json!({
            "ok": false,
            "kind": err.kind(),
            "message": err.message(),
        }),
    }
}

/// Run every command read from `input`, writing one result line per command
pub async fn replay<R, W>(
    engine: &CommandEngine,
    caller: &Caller,
    input: R,
    output: &mut W,
) -> Result<ReplayStats, ReplayError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = ReplayStats::default();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let outcome = match CommandEnvelope::parse(&line) {
            Ok(envelope) => engine
                .execute(caller, &envelope)
                .await
                .map_err(|failure| failure.error),
            Err(err) => Err(err),
        };

        stats.executed += 1;
        match &outcome {
            Ok(_) => stats.succeeded += 1,
            Err(err) => {
                stats.failed += 1;
                log::debug!("command {} failed: {}", stats.executed, err);
            }
        }

        let mut rendered = serde_json::to_string(&outcome_json(&outcome))?;
        rendered.push('\n');
        output.write_all(rendered.as_bytes()).await?;
    }

    output.flush().await?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_seed_apply() {
        let seed = Seed::from_json_str(
            r#"{"roles": ["editors"], "users": [{"name": "alice", "roles": ["editors"]}], "collections": ["posts"]}"#,
        )
        .unwrap();

        let store = MemoryDocumentStore::new();
        seed.apply(&store).await.unwrap();

        assert!(store.collection_exists("posts").await);
        let alice = store.caller_for("alice").await.unwrap();
        assert!(alice.has_role("editors"));
    }

    #[tokio::test]
    async fn test_seed_unknown_role_fails() {
        let seed = Seed::from_json_str(r#"{"users": [{"name": "bob", "roles": ["ghosts"]}]}"#).unwrap();
        let store = MemoryDocumentStore::new();
        assert!(matches!(
            seed.apply(&store).await,
            Err(ReplayError::Store(StoreError::RoleNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_replay_lines() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.create_collection("posts").await.unwrap();
        let caller = store.admin_caller();
        let engine = CommandEngine::new(store);

        let script = concat!(
            r#"{"resource":"documents","name":"post","params":{"collection":"posts","data":{"n":1}}}"#,
            "\n\n",
            r#"{"resource":"documents","name":"list","params":{"collection":"posts","query":{"count":true}}}"#,
            "\n",
            "not json\n",
            r#"{"resource":"documents","name":"list","params":{"collection":"drafts"}}"#,
            "\n",
        );

        let mut out = Vec::new();
        let stats = replay(&engine, &caller, script.as_bytes(), &mut out).await.unwrap();
        assert_eq!(
            stats,
            ReplayStats {
                executed: 4,
                succeeded: 2,
                failed: 2
            }
        );

        let lines: Vec<JsonValue> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["result"]["n"], 1);
        assert_eq!(lines[1]["result"], json!({"count": 1}));
        assert_eq!(lines[2]["kind"], "parsing");
        assert_eq!(lines[3], json!({"ok": false, "kind": "execution", "message": "invalid collection: drafts"}));
    }
}
