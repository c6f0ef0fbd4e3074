use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the document store, the task editor and the input workflow.
///
/// Every variant is recoverable: callers turn it into a one-line notice and
/// keep the session in a renderable state.
#[derive(Debug, Error)]
pub enum QuestError {
    /// The resolved storage key is already taken by another document.
    #[error("quest file already exists: {key}")]
    Conflict { key: String },

    /// Free text that does not match the grammar of the pending request.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The selected document or task disappeared between render and click.
    #[error("not found: {0}")]
    NotFound(String),

    /// Wrapper around IO errors from the backing file tree.
    #[error("failed to {op} {}: {source}", path.display())]
    Store {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document text that could not be parsed for a structured edit.
    #[error("quest file {key} is not valid YAML: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Document that parses but does not have the expected section layout.
    #[error("quest file {key} has an unexpected layout: {reason}")]
    Layout { key: String, reason: String },
}

/// Coarse classes used by callers to decide how to recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    InvalidInput,
    Store,
    NotFound,
}

impl QuestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuestError::Conflict { .. } => ErrorKind::Conflict,
            QuestError::InvalidInput(_) => ErrorKind::InvalidInput,
            QuestError::NotFound(_) => ErrorKind::NotFound,
            QuestError::Store { .. } | QuestError::Malformed { .. } | QuestError::Layout { .. } => {
                ErrorKind::Store
            }
        }
    }

    pub(crate) fn store(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        QuestError::Store {
            op,
            path: path.into(),
            source,
        }
    }
}

impl From<crate::validation::ValidationError> for QuestError {
    fn from(err: crate::validation::ValidationError) -> Self {
        QuestError::InvalidInput(err.to_string())
    }
}

pub type QuestResult<T> = Result<T, QuestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_counts_as_store_failure() {
        let source = serde_yaml::from_str::<serde_yaml::Value>("a: [").unwrap_err();
        let err = QuestError::Malformed {
            key: "broken.yml".into(),
            source,
        };
        assert_eq!(err.kind(), ErrorKind::Store);
        assert!(err.to_string().starts_with("quest file broken.yml"));
    }

    #[test]
    fn store_error_mentions_operation_and_path() {
        let err = QuestError::store(
            "read",
            "/tmp/q/a.yml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = err.to_string();
        assert!(text.contains("failed to read /tmp/q/a.yml"), "{text}");
        assert!(text.contains("denied"));
    }
}
