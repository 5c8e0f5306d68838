//! Unified error hierarchy for FitAssess
//!
//! Every failure collapses onto three kinds the calling layer can map to a
//! response: not found, validation, and internal. Errors carry a short
//! machine-checkable reason string and integrate with tracing levels.

use thiserror::Error;

use crate::database::DatabaseError;

/// Top-level error type for all FitAssess operations
#[derive(Debug, Error)]
pub enum FitAssessError {
    /// Entity absent, or not owned by the caller
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Input rejected before any state change
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The three outcomes a caller needs to distinguish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Internal,
}

/// Result type alias for FitAssess operations
pub type Result<T> = std::result::Result<T, FitAssessError>;

impl FitAssessError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        FitAssessError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        FitAssessError::Validation(reason.into())
    }

    /// Collapse onto the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            FitAssessError::NotFound { .. } => ErrorKind::NotFound,
            FitAssessError::Database(DatabaseError::NotFound(_)) => ErrorKind::NotFound,
            FitAssessError::Validation(_) => ErrorKind::Validation,
            _ => ErrorKind::Internal,
        }
    }

    /// Short machine-checkable reason, e.g. `athlete_not_found`
    pub fn reason(&self) -> String {
        match self {
            FitAssessError::NotFound { entity, .. } => {
                format!("{}_not_found", entity.replace(' ', "_"))
            }
            FitAssessError::Validation(reason) => reason
                .split(':')
                .next()
                .unwrap_or(reason)
                .trim()
                .to_lowercase()
                .replace(' ', "_"),
            FitAssessError::Database(DatabaseError::NotFound(_)) => "record_not_found".to_string(),
            FitAssessError::Database(_) => "database_error".to_string(),
            FitAssessError::Configuration(_) => "configuration_error".to_string(),
            FitAssessError::Serialization(_) => "serialization_error".to_string(),
            FitAssessError::Io(_) => "io_error".to_string(),
            FitAssessError::Internal(_) => "internal_error".to_string(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FitAssessError::Database(DatabaseError::Busy(_)) | FitAssessError::Io(_)
        )
    }

    /// Emit this error as a tracing event at its severity level
    pub fn log(&self, operation: &str) {
        let reason = self.reason();
        let level = self.severity().to_tracing_level();
        if level == tracing::Level::ERROR {
            tracing::error!(operation, %reason, error = %self, "Operation failed");
        } else if level == tracing::Level::WARN {
            tracing::warn!(operation, %reason, error = %self, "Operation rejected");
        } else {
            tracing::info!(operation, %reason, error = %self, "Operation rejected");
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FitAssessError::NotFound { .. } => ErrorSeverity::Info,
            FitAssessError::Validation(_) => ErrorSeverity::Warning,
            FitAssessError::Database(DatabaseError::NotFound(_)) => ErrorSeverity::Warning,
            FitAssessError::Database(_) => ErrorSeverity::Error,
            FitAssessError::Configuration(_) => ErrorSeverity::Error,
            FitAssessError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            FitAssessError::not_found("athlete", "a1").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            FitAssessError::validation("not enough data").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            FitAssessError::Internal("boom".to_string()).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            FitAssessError::Database(DatabaseError::Serialization("bad".to_string())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(
            FitAssessError::not_found("training plan", "p1").reason(),
            "training_plan_not_found"
        );
        assert_eq!(
            FitAssessError::validation("not enough data: 1 result in 30 days").reason(),
            "not_enough_data"
        );
    }

    #[test]
    fn test_error_severity() {
        let err = FitAssessError::validation("weekly volume out of range");
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);

        let err = FitAssessError::Internal("test".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);

        let err = FitAssessError::not_found("athlete", "a-1");
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::INFO);
        err.log("get_athlete");
    }

    #[test]
    fn test_error_retryable() {
        let err = FitAssessError::Database(DatabaseError::Busy("locked".to_string()));
        assert!(err.is_retryable());

        let err = FitAssessError::validation("test");
        assert!(!err.is_retryable());
    }
}
