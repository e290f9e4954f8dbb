// ============================================================================
// docguard: document access-control command engine
// ============================================================================

pub mod command;
pub mod core;
pub mod facade;
pub mod query;
pub mod replay;
pub mod storage;

// Re-export main types for convenience
pub use command::{CommandEnvelope, CommandError, CommandFailure, CommandResult, DocumentsResource, Resource};
pub use core::{Caller, DocumentId, GrantAction, GrantStep, PermissionKind, PrincipalKind, RecordId, StoreError, StoreResult};
pub use facade::CommandEngine;
pub use query::QueryParams;
pub use storage::{Acl, Document, DocumentStore, MemoryDocumentStore, StoreConfig};
