pub mod error;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use types::{Caller, DocumentId, GrantAction, GrantStep, PermissionKind, PrincipalKind, RecordId};
