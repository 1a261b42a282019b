//! Error types for the workflow document model.

use std::fmt;

/// Errors from document serialization and parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The document text is not syntactically valid.
    Parse { message: String },
    /// The document could not be serialized.
    Serialize { message: String },
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { message } => {
                write!(f, "failed to parse workflow document: {message}")
            }
            Self::Serialize { message } => {
                write!(f, "failed to serialize workflow document: {message}")
            }
        }
    }
}

impl std::error::Error for DocumentError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = DocumentError::Parse {
            message: "unexpected end of input".to_string(),
        };
        assert!(err.to_string().contains("unexpected end of input"));
    }
}
