use serde::Serialize;
use thiserror::Error;

use crate::model::{DatabaseError, ResourceType};

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Pricing details carried by `PaymentRequired`. Not a hard failure from the
/// caller's point of view: it tells the client to present a payment step.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PricingBreakdown {
    pub original_price: i64,
    pub discount_amount: i64,
    pub final_price: i64,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("CoreNotFound: {0:?}")]
    NotFound(ResourceType),

    #[error("CoreConflict: {0:?}")]
    Conflict(ResourceType),

    #[error("CoreForbidden")]
    Forbidden,

    #[error("CoreValidation: {0}")]
    Validation(String),

    #[error("CoreUnavailable: {0}")]
    Unavailable(String),

    #[error("CorePaymentRequired: final price {} is non-zero", .0.final_price)]
    PaymentRequired(PricingBreakdown),

    #[error("CoreDatabase: {0}")]
    Database(DatabaseError),
}

impl CoreError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Translate storage errors from a write on `resource`. Unique-index
    /// violations are the duplicate-guard firing under concurrency and must
    /// surface as Conflict, never as an opaque internal error.
    pub fn from_db(resource: ResourceType, e: DatabaseError) -> Self {
        if e.is_unique_violation() {
            Self::Conflict(resource)
        } else if matches!(e, DatabaseError::Forbidden) {
            Self::Forbidden
        } else {
            Self::Database(e)
        }
    }
}

impl From<DatabaseError> for CoreError {
    fn from(e: DatabaseError) -> Self {
        if matches!(e, DatabaseError::Forbidden) {
            Self::Forbidden
        } else {
            Self::Database(e)
        }
    }
}
