//! The `documents` resource
//!
//! Each handler pulls every input from the envelope before touching the
//! store, then hands store failures to its `translate::on_*` function.

use super::dispatcher::{CommandContext, CommandHandler, CommandName, CommandRegistry, Resource};
use super::error::CommandResult;
use super::grants::GrantCommand;
use super::translate;
use crate::core::StoreResult;
use crate::storage::{DocumentFormat, QueryOutput};
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};

pub const DOCUMENTS_RESOURCE: &str = "documents";

pub struct GetCommand;

#[async_trait]
impl CommandHandler for GetCommand {
    fn name(&self) -> CommandName {
        CommandName::Get
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> CommandResult<Option<JsonValue>> {
        let collection = ctx.envelope.collection()?;
        let id = ctx.envelope.document_id()?;

        let fetched: StoreResult<Option<JsonValue>> = async {
            let rid = ctx.store.resolve(&id).await?;
            match ctx.store.get(ctx.caller, collection, rid).await? {
                Some(doc) => Ok(Some(doc.to_json(DocumentFormat::Document)?)),
                None => Ok(None),
            }
        }
        .await;

        fetched.or_else(|err| translate::on_get(err, collection, &id).into_result())
    }
}

pub struct ListCommand;

#[async_trait]
impl CommandHandler for ListCommand {
    fn name(&self) -> CommandName {
        CommandName::List
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> CommandResult<Option<JsonValue>> {
        let collection = ctx.envelope.collection()?;
        let params = ctx.envelope.query();

        let listed: StoreResult<JsonValue> = async {
            match ctx.store.query(ctx.caller, collection, &params).await? {
                QueryOutput::Count(count) => Ok(json!({ "count": count })),
                QueryOutput::Documents(docs) => {
                    let mut out = Vec::with_capacity(docs.len());
                    for doc in &docs {
                        let value = doc.to_json(DocumentFormat::Document)?;
                        out.push(project(value, &params.fields));
                    }
                    Ok(JsonValue::Array(out))
                }
            }
        }
        .await;

        match listed {
            Ok(value) => Ok(Some(value)),
            Err(err) => translate::on_list(err, collection).into_result(),
        }
    }
}

/// Keep only `fields` (plus `id`) when a projection was requested
fn project(value: JsonValue, fields: &[String]) -> JsonValue {
    if fields.is_empty() {
        return value;
    }

    match value {
        JsonValue::Object(obj) => JsonValue::Object(
            obj.into_iter()
                .filter(|(key, _)| key == "id" || fields.iter().any(|f| f == key))
                .collect(),
        ),
        other => other,
    }
}

pub struct PostCommand;

#[async_trait]
impl CommandHandler for PostCommand {
    fn name(&self) -> CommandName {
        CommandName::Post
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> CommandResult<Option<JsonValue>> {
        let collection = ctx.envelope.collection()?;
        let data = ctx.envelope.data()?;

        let created: StoreResult<Option<JsonValue>> = async {
            match ctx.store.create(ctx.caller, collection, data).await? {
                Some(doc) => Ok(Some(doc.to_json(DocumentFormat::Json)?)),
                None => {
                    log::debug!("store declined post to {}", collection);
                    Ok(None)
                }
            }
        }
        .await;

        created.or_else(|err| translate::on_post(err, collection).into_result())
    }
}

pub struct PutCommand;

#[async_trait]
impl CommandHandler for PutCommand {
    fn name(&self) -> CommandName {
        CommandName::Put
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> CommandResult<Option<JsonValue>> {
        let collection = ctx.envelope.collection()?;
        let data = ctx.envelope.data()?;
        let id = ctx.envelope.document_id()?;

        let updated: StoreResult<JsonValue> = async {
            let rid = ctx.store.resolve(&id).await?;
            let doc = ctx.store.update(ctx.caller, collection, rid, data).await?;
            doc.to_json(DocumentFormat::Document)
        }
        .await;

        match updated {
            Ok(value) => Ok(Some(value)),
            Err(err) => translate::on_put(err, collection, &id).into_result(),
        }
    }
}

pub struct DeleteCommand;

#[async_trait]
impl CommandHandler for DeleteCommand {
    fn name(&self) -> CommandName {
        CommandName::Delete
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> CommandResult<Option<JsonValue>> {
        let collection = ctx.envelope.collection()?;
        let id = ctx.envelope.document_id()?;

        let deleted: StoreResult<()> = async {
            let rid = ctx.store.resolve(&id).await?;
            ctx.store.delete(ctx.caller, collection, rid).await
        }
        .await;

        match deleted {
            Ok(()) => Ok(None),
            Err(err) => translate::on_delete(err, collection, &id).into_result(),
        }
    }
}

/// get, list, post, put and delete
pub fn base_commands() -> CommandRegistry {
    CommandRegistry::new()
        .with(GetCommand)
        .with(ListCommand)
        .with(PostCommand)
        .with(PutCommand)
        .with(DeleteCommand)
}

pub struct DocumentsResource {
    commands: CommandRegistry,
}

impl DocumentsResource {
    pub fn new() -> Self {
        let extra = CommandRegistry::new()
            .with(GrantCommand::grant())
            .with(GrantCommand::revoke());

        Self {
            commands: base_commands().merge(extra),
        }
    }
}

impl Default for DocumentsResource {
    fn default() -> Self {
        Self::new()
    }
}

impl Resource for DocumentsResource {
    fn name(&self) -> &str {
        DOCUMENTS_RESOURCE
    }

    fn commands(&self) -> &CommandRegistry {
        &self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_commands() {
        let resource = DocumentsResource::new();
        assert_eq!(resource.name(), "documents");
        assert_eq!(
            resource.commands().names(),
            vec![
                CommandName::Get,
                CommandName::List,
                CommandName::Post,
                CommandName::Put,
                CommandName::Delete,
                CommandName::Grant,
                CommandName::Revoke,
            ]
        );
    }

    #[test]
    fn test_base_has_no_grants() {
        assert!(!base_commands().supports(CommandName::Grant));
    }

    #[test]
    fn test_project() {
        let value = serde_json::json!({"id": "x", "@rid": "#1:0", "title": "t", "body": "b"});
        let fields = vec!["title".to_string()];
        assert_eq!(project(value, &fields), serde_json::json!({"id": "x", "title": "t"}));
    }
}
