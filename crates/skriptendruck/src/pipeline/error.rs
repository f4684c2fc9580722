use thiserror::Error;

use crate::error::{MergeError, ParseError, ReadError, RenderError, StorageError};
use crate::order::OrderStatus;

/// Why an order left the happy path. Each variant maps to exactly one
/// terminal status.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("User '{0}' not found")]
    UserNotFound(String),

    #[error("User '{0}' is blocked")]
    Blocked(String),

    #[error("User '{username}' matches {candidates} directory entries")]
    Ambiguous { username: String, candidates: usize },

    #[error("Document has {pages} pages, minimum is {min}")]
    TooFewPages { pages: u32, min: u32 },

    #[error("Document has {pages} pages, maximum is {max}")]
    TooManyPages { pages: u32, max: u32 },

    #[error("Document is password protected")]
    PasswordProtected,

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to create work file: {0}")]
    WorkFile(#[source] std::io::Error),

    #[error("Processing panicked: {0}")]
    Panic(String),
}

impl PipelineError {
    pub fn status(&self) -> OrderStatus {
        match self {
            Self::Parse(_) => OrderStatus::ErrorInvalidFilename,
            Self::UserNotFound(_) => OrderStatus::ErrorUserNotFound,
            Self::Blocked(_) => OrderStatus::ErrorBlocked,
            Self::Ambiguous { .. } => OrderStatus::ManualReview,
            Self::TooFewPages { .. } => OrderStatus::ErrorTooFewPages,
            Self::TooManyPages { .. } => OrderStatus::ErrorTooManyPages,
            Self::PasswordProtected => OrderStatus::ErrorPasswordProtected,
            Self::Read(_)
            | Self::Render(_)
            | Self::Merge(_)
            | Self::Storage(_)
            | Self::WorkFile(_)
            | Self::Panic(_) => OrderStatus::ErrorOther,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let parse = PipelineError::from(ParseError::InvalidFilename {
            filename: "x.pdf".into(),
            reason: "bad".into(),
        });
        assert_eq!(parse.status(), OrderStatus::ErrorInvalidFilename);
        assert_eq!(
            PipelineError::TooManyPages { pages: 2000, max: 1000 }.status(),
            OrderStatus::ErrorTooManyPages
        );
        assert_eq!(
            PipelineError::Ambiguous {
                username: "ab12345".into(),
                candidates: 2
            }
            .status(),
            OrderStatus::ManualReview
        );
        assert_eq!(
            PipelineError::Panic("boom".into()).status(),
            OrderStatus::ErrorOther
        );
    }

    #[test]
    fn test_messages_are_not_empty() {
        let errors = [
            PipelineError::UserNotFound("ab12345".into()),
            PipelineError::Blocked("xx99999".into()),
            PipelineError::PasswordProtected,
            PipelineError::TooFewPages { pages: 0, min: 1 },
        ];
        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }
}
