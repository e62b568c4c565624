use sea_orm::error::DbErr;
use serde::Serialize;
use uuid::Uuid;

/// Error taxonomy for ledger and reservation operations.
///
/// `InsufficientStock` and `OverRelease` carry the requested and held
/// quantities so callers can surface "only N left" style messages. The
/// remaining variants indicate defects or lost races and should be logged and
/// retried rather than shown verbatim to end users.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("Over-release: requested {requested}, reserved {reserved}")]
    OverRelease { requested: i32, reserved: i32 },

    /// A quantity field would have gone negative.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The version-guarded write lost the race after retries. Callers should
    /// retry the whole operation once rather than assume failure.
    #[error("Concurrent modification of inventory item {0}")]
    ConcurrentModification(Uuid),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// True for errors a caller may transparently retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::ConcurrentModification(_))
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

/// Bootstrap-level alias (connection establishment, migrations).
pub type AppError = ServiceError;
