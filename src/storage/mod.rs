pub mod acl;
pub mod config;
pub mod document;
pub mod memory;
pub mod principals;
pub mod store;

pub use acl::{Acl, Grantees};
pub use config::StoreConfig;
pub use document::{Document, DocumentFormat, JsonMap};
pub use memory::{MemoryDocumentStore, validate_collection_name};
pub use principals::{PrincipalRegistry, UserAccount};
pub use store::{DocumentStore, QueryOutput};
