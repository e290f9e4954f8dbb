use super::envelope::CommandEnvelope;
use super::error::{CommandError, CommandResult};
use crate::core::Caller;
use crate::storage::DocumentStore;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Commands a resource may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandName {
    Get,
    List,
    Post,
    Put,
    Delete,
    Grant,
    Revoke,
}

impl CommandName {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "get" => Some(CommandName::Get),
            "list" => Some(CommandName::List),
            "post" => Some(CommandName::Post),
            "put" => Some(CommandName::Put),
            "delete" => Some(CommandName::Delete),
            "grant" => Some(CommandName::Grant),
            "revoke" => Some(CommandName::Revoke),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::Get => "get",
            CommandName::List => "list",
            CommandName::Post => "post",
            CommandName::Put => "put",
            CommandName::Delete => "delete",
            CommandName::Grant => "grant",
            CommandName::Revoke => "revoke",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a handler needs for one invocation
pub struct CommandContext<'a> {
    pub store: &'a dyn DocumentStore,
    pub caller: &'a Caller,
    pub envelope: &'a CommandEnvelope,
}

impl<'a> CommandContext<'a> {
    pub fn new(store: &'a dyn DocumentStore, caller: &'a Caller, envelope: &'a CommandEnvelope) -> Self {
        Self {
            store,
            caller,
            envelope,
        }
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn name(&self) -> CommandName;

    /// `Ok(None)` is the empty result
    async fn execute(&self, ctx: &CommandContext<'_>) -> CommandResult<Option<JsonValue>>;
}

/// Command name -> handler table of one resource
#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: HashMap<CommandName, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own name, replacing any previous one
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    pub fn with(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.register(Arc::new(handler));
        self
    }

    /// Layer `extra` over this table; on a name clash `extra` wins
    pub fn merge(mut self, extra: CommandRegistry) -> Self {
        self.handlers.extend(extra.handlers);
        self
    }

    pub fn get(&self, name: CommandName) -> Option<&Arc<dyn CommandHandler>> {
        self.handlers.get(&name)
    }

    pub fn supports(&self, name: CommandName) -> bool {
        self.handlers.contains_key(&name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<CommandName> {
        let mut names: Vec<CommandName> = self.handlers.keys().copied().collect();
        names.sort();
        names
    }

    /// Route `ctx.envelope` to its handler
    pub async fn dispatch(&self, resource: &str, ctx: &CommandContext<'_>) -> CommandResult<Option<JsonValue>> {
        let requested = ctx.envelope.name();
        let handler = CommandName::parse(requested)
            .and_then(|name| self.get(name))
            .ok_or_else(|| {
                CommandError::parsing(format!(
                    "command {} is not supported by resource {}",
                    requested, resource
                ))
            })?;

        log::debug!("dispatching {}.{} for {}", resource, requested, ctx.caller.username());
        handler.execute(ctx).await
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

/// A named family of commands, e.g. `documents`
pub trait Resource: Send + Sync {
    fn name(&self) -> &str;

    fn commands(&self) -> &CommandRegistry;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryDocumentStore;
    use serde_json::json;

    struct Fixed(CommandName, JsonValue);

    #[async_trait]
    impl CommandHandler for Fixed {
        fn name(&self) -> CommandName {
            self.0
        }

        async fn execute(&self, _ctx: &CommandContext<'_>) -> CommandResult<Option<JsonValue>> {
            Ok(Some(self.1.clone()))
        }
    }

    #[test]
    fn test_command_names() {
        for name in ["get", "list", "post", "put", "delete", "grant", "revoke"] {
            assert_eq!(CommandName::parse(name).map(|n| n.as_str()), Some(name));
        }
        assert_eq!(CommandName::parse("GET"), None);
        assert_eq!(CommandName::parse("patch"), None);
    }

    #[test]
    fn test_merge_overrides_base() {
        let base = CommandRegistry::new()
            .with(Fixed(CommandName::Get, json!("base")))
            .with(Fixed(CommandName::List, json!("base")));
        let extra = CommandRegistry::new()
            .with(Fixed(CommandName::List, json!("extra")))
            .with(Fixed(CommandName::Grant, json!("extra")));

        let merged = base.merge(extra);
        assert_eq!(
            merged.names(),
            vec![CommandName::Get, CommandName::List, CommandName::Grant]
        );
        assert!(!merged.supports(CommandName::Revoke));
    }

    #[tokio::test]
    async fn test_dispatch() {
        let registry = CommandRegistry::new().with(Fixed(CommandName::Get, json!(1)));
        let store = MemoryDocumentStore::new();
        let caller = store.admin_caller();

        let env = CommandEnvelope::new("documents", "get", Default::default());
        let ctx = CommandContext::new(&store, &caller, &env);
        assert_eq!(registry.dispatch("documents", &ctx).await, Ok(Some(json!(1))));

        let env = CommandEnvelope::new("documents", "revoke", Default::default());
        let ctx = CommandContext::new(&store, &caller, &env);
        let err = registry.dispatch("documents", &ctx).await.unwrap_err();
        assert!(err.is_parsing());
        assert_eq!(err.message(), "command revoke is not supported by resource documents");
    }
}
