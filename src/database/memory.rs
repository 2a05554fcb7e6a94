//! In-memory transaction store.
//!
//! Backs the unit and integration tests and is handy for running the service
//! without Postgres. Mirrors the constraint behavior of the real store
//! (unique merchant reference, not-found on updates to unknown references).

use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::database::repository::TransactionStore;
use crate::database::transaction::{PaymentTransaction, TransactionState, TransactionUpdate};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryTransactionStore {
    transactions: RwLock<HashMap<String, PaymentTransaction>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transactions.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(
        &self,
        transaction: &PaymentTransaction,
    ) -> Result<PaymentTransaction, DatabaseError> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&transaction.merchant_reference) {
            return Err(DatabaseError::new(
                DatabaseErrorKind::UniqueConstraintViolation {
                    column: "merchant_reference".to_string(),
                    value: transaction.merchant_reference.clone(),
                },
            ));
        }
        transactions.insert(transaction.merchant_reference.clone(), transaction.clone());
        Ok(transaction.clone())
    }

    async fn find_by_reference(
        &self,
        merchant_reference: &str,
    ) -> Result<Option<PaymentTransaction>, DatabaseError> {
        Ok(self
            .transactions
            .read()
            .await
            .get(merchant_reference)
            .cloned())
    }

    async fn update_state(
        &self,
        merchant_reference: &str,
        state: TransactionState,
        state_message: Option<&str>,
    ) -> Result<PaymentTransaction, DatabaseError> {
        let mut transactions = self.transactions.write().await;
        let transaction = transactions
            .get_mut(merchant_reference)
            .ok_or_else(|| DatabaseError::not_found("PaymentTransaction", merchant_reference))?;

        transaction.state = state;
        if let Some(message) = state_message {
            transaction.state_message = Some(message.to_string());
        }
        transaction.updated_at = Utc::now();
        Ok(transaction.clone())
    }

    async fn update_descriptive_fields(
        &self,
        merchant_reference: &str,
        update: &TransactionUpdate,
    ) -> Result<PaymentTransaction, DatabaseError> {
        let mut transactions = self.transactions.write().await;
        let transaction = transactions
            .get_mut(merchant_reference)
            .ok_or_else(|| DatabaseError::not_found("PaymentTransaction", merchant_reference))?;

        if let Some(payment_id) = &update.payment_id {
            transaction.payment_id = Some(payment_id.clone());
        }
        transaction.status_details = update.status_details.clone();
        if let Some(phone_number) = &update.phone_number {
            transaction.phone_number = Some(phone_number.clone());
        }
        if let Some(payment_method) = update.payment_method {
            transaction.payment_method = Some(payment_method);
        }
        transaction.updated_at = Utc::now();
        Ok(transaction.clone())
    }
}
