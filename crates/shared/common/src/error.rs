//! Unified error handling for the service and its gRPC surface.
//!
//! Every error is classified as a client fault (the caller sent something
//! wrong) or a server fault (the system failed), and converts into a
//! Tonic gRPC status accordingly.

use domain::DomainError;
use thiserror::Error;
use tonic::Status;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Client faults
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Row is still referenced by dependent rows and cannot be deleted.
    #[error("{0}")]
    InUse(String),

    // Server faults
    /// Commit failed; carries the underlying database message.
    #[error("Database error: {0}")]
    Persistence(String),

    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[error("Internal server error")]
    Internal(String),
}

/// Who caused a failure, as reported to the remote caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Client,
    Server,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InUse(_) => "IN_USE",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Classify the error as caller-caused or system-caused.
    pub fn fault(&self) -> Fault {
        match self {
            AppError::Validation(_) | AppError::NotFound(_) | AppError::InUse(_) => Fault::Client,
            _ => Fault::Server,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Commit failures surface the driver's text
            AppError::Persistence(msg) => {
                tracing::error!("Commit failed: {}", msg);
                self.to_string()
            }

            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            _ => self.to_string(),
        }
    }
}

// =============================================================================
// gRPC Status (Tonic)
// =============================================================================

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        let code = match &err {
            AppError::Validation(_) => tonic::Code::InvalidArgument,
            AppError::NotFound(_) => tonic::Code::NotFound,
            AppError::InUse(_) => tonic::Code::FailedPrecondition,
            _ => tonic::Code::Internal,
        };

        Status::new(code, err.user_message())
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn in_use(msg: impl Into<String>) -> Self {
        AppError::InUse(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        AppError::Persistence(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
