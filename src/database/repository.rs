use crate::database::error::DatabaseError;
use crate::database::transaction::{PaymentTransaction, TransactionState, TransactionUpdate};
use async_trait::async_trait;

/// Narrow persistence surface for payment transactions.
///
/// The reconciliation engine only ever looks a transaction up by merchant
/// reference and mutates it; rows are created by the checkout flow and never
/// deleted. Keeping the trait this small lets the engine run against the
/// in-memory store in tests.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert a freshly created transaction. The merchant reference must be
    /// unique; a duplicate is a constraint violation, not an upsert.
    async fn insert(
        &self,
        transaction: &PaymentTransaction,
    ) -> Result<PaymentTransaction, DatabaseError>;

    /// Find a transaction by exact merchant reference match
    async fn find_by_reference(
        &self,
        merchant_reference: &str,
    ) -> Result<Option<PaymentTransaction>, DatabaseError>;

    /// Move a transaction to a new lifecycle state, optionally recording a
    /// reason message
    async fn update_state(
        &self,
        merchant_reference: &str,
        state: TransactionState,
        state_message: Option<&str>,
    ) -> Result<PaymentTransaction, DatabaseError>;

    /// Refresh the descriptive fields carried by a notification
    async fn update_descriptive_fields(
        &self,
        merchant_reference: &str,
        update: &TransactionUpdate,
    ) -> Result<PaymentTransaction, DatabaseError>;
}
