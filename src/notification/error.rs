use crate::database::error::DatabaseError;
use thiserror::Error;

pub type NotificationResult<T> = Result<T, NotificationError>;

/// Failures of the notification handling path.
///
/// Each variant maps to a distinct channel response: the redirect channels
/// pick an error redirect, the webhook channel answers with a JSON error
/// body. None of them ever escape a dispatcher as a raw server error.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Missing merchant reference")]
    MissingReference,

    #[error("No transaction found for merchant reference {reference}")]
    TransactionNotFound { reference: String },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String },

    #[error("Transaction store error: {0}")]
    Store(#[from] DatabaseError),
}

impl NotificationError {
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    pub fn transaction_not_found(reference: impl Into<String>) -> Self {
        Self::TransactionNotFound {
            reference: reference.into(),
        }
    }
}
