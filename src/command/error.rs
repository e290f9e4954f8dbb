use super::envelope::CommandEnvelope;
use std::fmt;
use thiserror::Error;

/// What an execution failure was about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub collection: Option<String>,
    pub id: Option<String>,
    pub principal: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(mut self, collection: &str) -> Self {
        self.collection = Some(collection.to_string());
        self
    }

    pub fn id(mut self, id: impl fmt::Display) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn principal(mut self, principal: &str) -> Self {
        self.principal = Some(principal.to_string());
        self
    }
}

/// Failure of a single command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The envelope or its params are structurally invalid
    #[error("{message}")]
    Parsing { message: String },

    /// A well-formed command could not be completed
    #[error("{message}")]
    Execution {
        message: String,
        context: ErrorContext,
    },
}

impl CommandError {
    pub fn parsing(message: impl Into<String>) -> Self {
        CommandError::Parsing {
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>, context: ErrorContext) -> Self {
        CommandError::Execution {
            message: message.into(),
            context,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CommandError::Parsing { message } => message,
            CommandError::Execution { message, .. } => message,
        }
    }

    pub fn is_parsing(&self) -> bool {
        matches!(self, CommandError::Parsing { .. })
    }

    pub fn is_execution(&self) -> bool {
        matches!(self, CommandError::Execution { .. })
    }

    /// `"parsing"` or `"execution"`
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::Parsing { .. } => "parsing",
            CommandError::Execution { .. } => "execution",
        }
    }
}

pub type CommandResult<T> = std::result::Result<T, CommandError>;

/// A failed command together with the envelope that produced it
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}.{}: {}", .envelope.resource(), .envelope.name(), .error)]
pub struct CommandFailure {
    pub envelope: CommandEnvelope,
    #[source]
    pub error: CommandError,
}

impl CommandFailure {
    pub fn new(envelope: CommandEnvelope, error: CommandError) -> Self {
        Self { envelope, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_message() {
        let err = CommandError::parsing("missing document id");
        assert!(err.is_parsing());
        assert_eq!(err.kind(), "parsing");
        assert_eq!(err.to_string(), "missing document id");

        let err = CommandError::execution(
            "invalid collection: posts",
            ErrorContext::new().collection("posts"),
        );
        assert!(err.is_execution());
        assert_eq!(err.message(), "invalid collection: posts");
    }

    #[test]
    fn test_context_builder() {
        let ctx = ErrorContext::new().collection("posts").id("abc").principal("alice");
        assert_eq!(ctx.collection.as_deref(), Some("posts"));
        assert_eq!(ctx.id.as_deref(), Some("abc"));
        assert_eq!(ctx.principal.as_deref(), Some("alice"));
    }
}
