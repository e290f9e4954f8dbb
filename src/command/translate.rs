//! Store failure -> command outcome, one function per operation
//!
//! The same `StoreError` means different things depending on the command:
//! an unresolved id is an empty result for `get` and `delete` but a hard
//! failure for `put` and `grant`.

use super::error::{CommandError, ErrorContext};
use crate::core::{DocumentId, StoreError};

/// What a command does with a store failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// Finish successfully with an empty result
    Suppress,
    /// Fail the command
    Raise(CommandError),
}

impl Translation {
    fn raise(message: impl Into<String>, context: ErrorContext) -> Self {
        Translation::Raise(CommandError::execution(message, context))
    }

    /// `Ok(None)` for a suppressed failure, `Err` otherwise
    pub fn into_result<T>(self) -> Result<Option<T>, CommandError> {
        match self {
            Translation::Suppress => Ok(None),
            Translation::Raise(err) => Err(err),
        }
    }
}

fn invalid_collection(collection: &str) -> Translation {
    Translation::raise(
        format!("invalid collection: {}", collection),
        ErrorContext::new().collection(collection),
    )
}

pub fn on_get(err: StoreError, collection: &str, id: &DocumentId) -> Translation {
    match err {
        StoreError::RidNotFound(_) | StoreError::DocumentNotFound(_) => {
            log::debug!("get {}/{}: {}, returning empty result", collection, id, err);
            Translation::Suppress
        }
        StoreError::InvalidCollection(_) => invalid_collection(collection),
        other => Translation::raise(
            format!("error executing command: {}", other),
            ErrorContext::new().collection(collection).id(id),
        ),
    }
}

pub fn on_list(err: StoreError, collection: &str) -> Translation {
    match err {
        StoreError::InvalidCollection(_) => invalid_collection(collection),
        other => Translation::raise(
            format!("error executing command: {}", other),
            ErrorContext::new().collection(collection),
        ),
    }
}

pub fn on_post(err: StoreError, collection: &str) -> Translation {
    match err {
        StoreError::InvalidCollection(_) => invalid_collection(collection),
        other => Translation::raise(
            format!("error creating document: {}", other),
            ErrorContext::new().collection(collection),
        ),
    }
}

pub fn on_put(err: StoreError, collection: &str, id: &DocumentId) -> Translation {
    let context = ErrorContext::new().collection(collection).id(id);
    match err {
        StoreError::RidNotFound(_) | StoreError::DocumentNotFound(_) => {
            Translation::raise(format!("document: {} does not exist", id), context)
        }
        StoreError::VersionConflict { .. } => {
            Translation::raise(format!("document: {} has a more recent version", id), context)
        }
        StoreError::InvalidCollection(_) => invalid_collection(collection),
        other => Translation::raise(
            format!("error updating document: {} message: {}", id, other),
            context,
        ),
    }
}

/// Only an authorization denial fails a delete
pub fn on_delete(err: StoreError, collection: &str, id: &DocumentId) -> Translation {
    match err {
        StoreError::PermissionDenied(_) => Translation::raise(
            format!("you don't have permissions to delete: {}", id),
            ErrorContext::new().collection(collection).id(id),
        ),
        other => {
            log::debug!("delete {}/{}: {}, returning empty result", collection, id, other);
            Translation::Suppress
        }
    }
}

/// Grant failures are never suppressed
pub fn on_grant(err: StoreError, collection: &str, id: &DocumentId) -> CommandError {
    let context = ErrorContext::new().collection(collection).id(id);
    match err {
        StoreError::RidNotFound(_) | StoreError::DocumentNotFound(_) => {
            CommandError::execution(format!("document {} not found", id), context)
        }
        StoreError::UserNotFound(name) => CommandError::execution(
            format!("user {} not found", name),
            context.principal(&name),
        ),
        StoreError::RoleNotFound(name) => CommandError::execution(
            format!("role {} not found", name),
            context.principal(&name),
        ),
        StoreError::InvalidCollection(_) => {
            CommandError::execution(format!("invalid collection: {}", collection), context)
        }
        StoreError::PermissionDenied(_) => CommandError::execution(
            format!("you don't have permissions to alter grants on: {}", id),
            context,
        ),
        other => CommandError::execution(format!("error executing command: {}", other), context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raised(t: Translation) -> CommandError {
        match t {
            Translation::Raise(err) => err,
            Translation::Suppress => panic!("expected an error"),
        }
    }

    #[test]
    fn test_get_suppresses_missing() {
        let id = DocumentId::new_v4();
        assert_eq!(on_get(StoreError::RidNotFound(id.to_string()), "c", &id), Translation::Suppress);
        assert_eq!(on_get(StoreError::DocumentNotFound("#1:0".into()), "c", &id), Translation::Suppress);

        let err = raised(on_get(StoreError::InvalidCollection("c".into()), "c", &id));
        assert_eq!(err.message(), "invalid collection: c");

        let err = raised(on_get(StoreError::Serialization("boom".into()), "c", &id));
        assert!(err.message().starts_with("error executing command: "));
    }

    #[test]
    fn test_put_messages() {
        let id = DocumentId::new_v4();
        let err = raised(on_put(StoreError::RidNotFound(id.to_string()), "c", &id));
        assert_eq!(err.message(), format!("document: {} does not exist", id));

        let conflict = StoreError::VersionConflict {
            id: id.to_string(),
            current: 3,
            supplied: 1,
        };
        let err = raised(on_put(conflict, "c", &id));
        assert_eq!(err.message(), format!("document: {} has a more recent version", id));

        let err = raised(on_put(StoreError::InvalidModel("bad".into()), "c", &id));
        assert!(err.message().starts_with(&format!("error updating document: {} message: ", id)));
    }

    #[test]
    fn test_delete_only_raises_on_denial() {
        let id = DocumentId::new_v4();
        assert_eq!(on_delete(StoreError::RidNotFound(id.to_string()), "c", &id), Translation::Suppress);
        assert_eq!(on_delete(StoreError::Database("io".into()), "c", &id), Translation::Suppress);

        let err = raised(on_delete(StoreError::PermissionDenied("no".into()), "c", &id));
        assert_eq!(err.message(), format!("you don't have permissions to delete: {}", id));
    }

    #[test]
    fn test_grant_messages_carry_principal() {
        let id = DocumentId::new_v4();
        let err = on_grant(StoreError::UserNotFound("zed".into()), "c", &id);
        assert_eq!(err.message(), "user zed not found");
        match err {
            CommandError::Execution { context, .. } => {
                assert_eq!(context.principal.as_deref(), Some("zed"))
            }
            CommandError::Parsing { .. } => panic!("expected execution error"),
        }

        let err = on_grant(StoreError::RidNotFound(id.to_string()), "c", &id);
        assert_eq!(err.message(), format!("document {} not found", id));
    }

    #[test]
    fn test_list_and_post() {
        let err = raised(on_list(StoreError::SqlInjection("chained".into()), "c"));
        assert!(err.message().starts_with("error executing command: "));

        let err = raised(on_post(StoreError::InvalidModel("reserved".into()), "c"));
        assert!(err.message().starts_with("error creating document: "));
    }
}
