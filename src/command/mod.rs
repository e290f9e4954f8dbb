pub mod dispatcher;
pub mod documents;
pub mod envelope;
pub mod error;
pub mod grants;
pub mod translate;

pub use dispatcher::{CommandContext, CommandHandler, CommandName, CommandRegistry, Resource};
pub use documents::{DOCUMENTS_RESOURCE, DocumentsResource, base_commands};
pub use envelope::CommandEnvelope;
pub use error::{CommandError, CommandFailure, CommandResult, ErrorContext};
pub use grants::{GrantBatch, GrantCommand, GrantEngine, GrantFailure, GrantReport, GrantRequest};
pub use translate::Translation;
