//! Reconciliation of provider status events against local transactions.
//!
//! Every notification, whichever channel delivered it, ends up here: the
//! transaction is resolved by merchant reference, the provider status is
//! mapped onto the generic lifecycle, descriptive fields are refreshed and
//! the state transition is applied. Duplicate and out-of-order deliveries
//! are the norm (the provider re-sends webhooks, and the redirect and
//! webhook channels usually both fire), so the whole operation is
//! idempotent and terminal states are never left.

use crate::database::repository::TransactionStore;
use crate::database::transaction::{PaymentMethod, TransactionState, TransactionUpdate};
use crate::notification::canonical::CanonicalNotification;
use crate::notification::error::NotificationError;
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_FAILURE_MESSAGE: &str = "Payment failed";
const DEFAULT_CANCEL_MESSAGE: &str = "Payment cancelled";

/// Status values the provider reports for a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Created,
    Initialised,
    InProgress,
    Confirmed,
    Failed,
    Canceled,
    Cancelled,
    /// Anything the provider starts sending that we do not know yet
    Unrecognized,
}

impl ProviderStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CREATED" => Self::Created,
            "INITIALISED" => Self::Initialised,
            "IN_PROGRESS" => Self::InProgress,
            "CONFIRMED" => Self::Confirmed,
            "FAILED" => Self::Failed,
            "CANCELED" => Self::Canceled,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Unrecognized,
        }
    }

    /// Provider status to transaction state table.
    ///
    /// Unrecognized values deliberately land on pending: an unknown
    /// intermediate status must never abort processing or finalize a
    /// payment.
    pub fn target_state(self) -> TransactionState {
        match self {
            Self::Confirmed => TransactionState::Done,
            Self::Failed => TransactionState::Error,
            Self::Canceled | Self::Cancelled => TransactionState::Cancel,
            Self::Created | Self::Initialised | Self::InProgress | Self::Unrecognized => {
                TransactionState::Pending
            }
        }
    }
}

/// What a reconciliation run did to the transaction
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub merchant_reference: String,
    pub previous_state: TransactionState,
    pub state: TransactionState,
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        self.previous_state != self.state
    }
}

pub struct ReconciliationEngine {
    store: Arc<dyn TransactionStore>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Apply one canonical notification to its transaction.
    ///
    /// Descriptive fields are refreshed whatever the mapped state turns out
    /// to be. The state itself only moves while the transaction is still
    /// pending: re-delivering a terminal status is a no-op, and a
    /// notification that would move a settled transaction elsewhere is
    /// ignored.
    pub async fn reconcile(
        &self,
        notification: &CanonicalNotification,
    ) -> Result<ReconcileOutcome, NotificationError> {
        let reference = notification.merchant_reference.trim();
        if reference.is_empty() {
            return Err(NotificationError::MissingReference);
        }

        let transaction = self
            .store
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| {
                error!("No transaction found for merchant reference: {}", reference);
                NotificationError::transaction_not_found(reference)
            })?;

        let target = ProviderStatus::parse(&notification.status).target_state();

        let update = TransactionUpdate {
            payment_id: notification.payment_id.clone(),
            status_details: notification.status_message.clone(),
            phone_number: notification.phone_number.clone(),
            payment_method: notification
                .payment_method
                .as_deref()
                .map(PaymentMethod::from_provider_code),
        };
        self.store
            .update_descriptive_fields(reference, &update)
            .await?;

        let previous = transaction.state;
        if previous.is_terminal() {
            if target != previous {
                warn!(
                    "Ignoring status '{}' for settled transaction {} (state stays {})",
                    notification.status, reference, previous
                );
            }
            return Ok(ReconcileOutcome {
                merchant_reference: reference.to_string(),
                previous_state: previous,
                state: previous,
            });
        }

        let state_message = match target {
            TransactionState::Error => Some(
                notification
                    .status_message
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(DEFAULT_FAILURE_MESSAGE)
                    .to_string(),
            ),
            TransactionState::Cancel => Some(
                notification
                    .status_message
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(DEFAULT_CANCEL_MESSAGE)
                    .to_string(),
            ),
            _ => None,
        };

        self.store
            .update_state(reference, target, state_message.as_deref())
            .await?;

        info!(
            "Transaction {} moved from {} to {} (provider status '{}', payment id {})",
            reference,
            previous,
            target,
            notification.status,
            notification.payment_id.as_deref().unwrap_or("none")
        );

        Ok(ReconcileOutcome {
            merchant_reference: reference.to_string(),
            previous_state: previous,
            state: target,
        })
    }
}
