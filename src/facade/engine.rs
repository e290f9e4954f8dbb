use crate::command::{
    CommandContext, CommandEnvelope, CommandError, CommandFailure, DocumentsResource, Resource,
};
use crate::core::Caller;
use crate::storage::DocumentStore;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Entry point for running commands against a document store
///
/// Holds no per-command state; one engine can serve any number of callers
/// concurrently.
///
/// # Examples
///
/// ```
/// use docguard::{CommandEngine, CommandEnvelope, MemoryDocumentStore};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryDocumentStore::new());
/// store.create_collection("posts").await?;
/// let admin = store.admin_caller();
///
/// let engine = CommandEngine::new(store);
/// let post = CommandEnvelope::from_json(json!({
///     "resource": "documents",
///     "name": "post",
///     "params": {"collection": "posts", "data": {"title": "hello"}}
/// }))?;
///
/// let created = engine.execute(&admin, &post).await?;
/// assert_eq!(created.unwrap()["title"], "hello");
/// # Ok(())
/// # }
/// ```
pub struct CommandEngine {
    store: Arc<dyn DocumentStore>,
    resources: HashMap<String, Arc<dyn Resource>>,
}

impl CommandEngine {
    /// Engine exposing the `documents` resource
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            resources: HashMap::new(),
        }
        .with_resource(DocumentsResource::new())
    }

    /// Register a resource, replacing one with the same name
    pub fn with_resource(mut self, resource: impl Resource + 'static) -> Self {
        self.resources
            .insert(resource.name().to_string(), Arc::new(resource));
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Registered resource names, sorted
    pub fn resources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run one command; `Ok(None)` is the empty result
    pub async fn execute(
        &self,
        caller: &Caller,
        envelope: &CommandEnvelope,
    ) -> Result<Option<JsonValue>, CommandFailure> {
        let Some(resource) = self.resources.get(envelope.resource()) else {
            let error = CommandError::parsing(format!(
                "resource {} is not supported",
                envelope.resource()
            ));
            return Err(CommandFailure::new(envelope.clone(), error));
        };

        let ctx = CommandContext::new(self.store.as_ref(), caller, envelope);
        resource
            .commands()
            .dispatch(resource.name(), &ctx)
            .await
            .map_err(|error| CommandFailure::new(envelope.clone(), error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryDocumentStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_resource() {
        let store = Arc::new(MemoryDocumentStore::new());
        let caller = store.admin_caller();
        let engine = CommandEngine::new(store);

        let env = CommandEnvelope::from_json(json!({"resource": "files", "name": "get"})).unwrap();
        let failure = engine.execute(&caller, &env).await.unwrap_err();

        assert!(failure.error.is_parsing());
        assert_eq!(failure.envelope, env);
        assert_eq!(failure.error.message(), "resource files is not supported");
    }

    #[tokio::test]
    async fn test_unknown_command_keeps_envelope() {
        let store = Arc::new(MemoryDocumentStore::new());
        let caller = store.admin_caller();
        let engine = CommandEngine::new(store);
        assert_eq!(engine.resources(), vec!["documents"]);

        let env = CommandEnvelope::from_json(json!({"resource": "documents", "name": "patch"})).unwrap();
        let failure = engine.execute(&caller, &env).await.unwrap_err();

        assert_eq!(
            failure.error.message(),
            "command patch is not supported by resource documents"
        );
        assert_eq!(failure.to_string(), "documents.patch: command patch is not supported by resource documents");
    }
}
