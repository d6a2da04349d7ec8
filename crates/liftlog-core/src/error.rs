//! Error types for LiftLog
//!
//! Session operations never return these: an invalid precondition is a silent
//! no-op. Errors belong to the collaborators around the session (stores,
//! presentation surfaces, templates) and to process setup.

use thiserror::Error;

/// Result type alias using LiftLog's Error
pub type Result<T> = std::result::Result<T, Error>;

/// LiftLog error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Runtime errors (E001-E099)
    #[error("No Tokio runtime available. Build the session controller from inside a runtime.")]
    RuntimeUnavailable,

    // Collaborator errors (E100-E199)
    #[error("Recovery store error: {0}")]
    RecoveryStore(String),

    #[error("Workout store error: {0}")]
    WorkoutStore(String),

    #[error("Presentation surface error: {0}")]
    Surface(String),

    // Input errors (E200-E299)
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    // Serialization errors (E400-E499)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Template parse error: {0}")]
    TemplateParse(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::RuntimeUnavailable => "E001",
            Self::RecoveryStore(_) => "E100",
            Self::WorkoutStore(_) => "E101",
            Self::Surface(_) => "E102",
            Self::InvalidTemplate(_) => "E200",
            Self::Serialization(_) => "E400",
            Self::TemplateParse(_) => "E401",
            Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::RuntimeUnavailable => Some("wrap the caller in #[tokio::main]".to_string()),
            Self::RecoveryStore(_) => Some("liftlog recovery".to_string()),
            Self::TemplateParse(_) | Self::InvalidTemplate(_) => {
                Some("check the template's [[exercises]] entries".to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_unavailable_error() {
        let error = Error::RuntimeUnavailable;
        assert_eq!(error.code(), "E001");
        assert!(error.suggestion().is_some());
        assert!(error.to_string().contains("Tokio runtime"));
    }

    #[test]
    fn test_collaborator_errors() {
        let error = Error::RecoveryStore("disk full".to_string());
        assert_eq!(error.code(), "E100");
        assert_eq!(error.suggestion(), Some("liftlog recovery".to_string()));
        assert!(error.to_string().contains("disk full"));

        let error = Error::WorkoutStore("locked".to_string());
        assert_eq!(error.code(), "E101");
        assert_eq!(error.suggestion(), None);
    }

    #[test]
    fn test_template_errors_share_suggestion() {
        let error = Error::InvalidTemplate("template name is empty".to_string());
        assert_eq!(error.code(), "E200");
        assert_eq!(
            error.suggestion(),
            Some("check the template's [[exercises]] entries".to_string())
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: Error = io.into();
        assert_eq!(error.code(), "E9999");
    }
}
