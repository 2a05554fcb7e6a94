use crate::database::error::DatabaseError;
use crate::database::repository::TransactionStore;
use crate::database::transaction::{PaymentTransaction, TransactionState, TransactionUpdate};
use async_trait::async_trait;
use sqlx::PgPool;

const TRANSACTION_COLUMNS: &str = "id, merchant_reference, payment_id, state, state_message, \
     amount, currency, customer_email, customer_name, payment_method, phone_number, \
     status_details, created_at, updated_at";

/// Postgres-backed transaction store
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for TransactionRepository {
    async fn insert(
        &self,
        transaction: &PaymentTransaction,
    ) -> Result<PaymentTransaction, DatabaseError> {
        sqlx::query_as::<_, PaymentTransaction>(&format!(
            "INSERT INTO payment_transactions \
             (id, merchant_reference, payment_id, state, state_message, amount, currency, \
              customer_email, customer_name, payment_method, phone_number, status_details, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(&transaction.id)
        .bind(&transaction.merchant_reference)
        .bind(&transaction.payment_id)
        .bind(transaction.state)
        .bind(&transaction.state_message)
        .bind(&transaction.amount)
        .bind(&transaction.currency)
        .bind(&transaction.customer_email)
        .bind(&transaction.customer_name)
        .bind(transaction.payment_method)
        .bind(&transaction.phone_number)
        .bind(&transaction.status_details)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn find_by_reference(
        &self,
        merchant_reference: &str,
    ) -> Result<Option<PaymentTransaction>, DatabaseError> {
        sqlx::query_as::<_, PaymentTransaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM payment_transactions \
             WHERE merchant_reference = $1"
        ))
        .bind(merchant_reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn update_state(
        &self,
        merchant_reference: &str,
        state: TransactionState,
        state_message: Option<&str>,
    ) -> Result<PaymentTransaction, DatabaseError> {
        // Single statement so concurrent notifications settle
        // last-writer-wins on the row, no read-modify-write window.
        sqlx::query_as::<_, PaymentTransaction>(&format!(
            "UPDATE payment_transactions \
             SET state = $2, state_message = COALESCE($3, state_message), updated_at = NOW() \
             WHERE merchant_reference = $1 \
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(merchant_reference)
        .bind(state)
        .bind(state_message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DatabaseError::from_sqlx(e)
                .with_context(format!("updating state for reference {merchant_reference}"))
        })
    }

    async fn update_descriptive_fields(
        &self,
        merchant_reference: &str,
        update: &TransactionUpdate,
    ) -> Result<PaymentTransaction, DatabaseError> {
        sqlx::query_as::<_, PaymentTransaction>(&format!(
            "UPDATE payment_transactions \
             SET payment_id = COALESCE($2, payment_id), \
                 status_details = $3, \
                 phone_number = COALESCE($4, phone_number), \
                 payment_method = COALESCE($5, payment_method), \
                 updated_at = NOW() \
             WHERE merchant_reference = $1 \
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(merchant_reference)
        .bind(&update.payment_id)
        .bind(&update.status_details)
        .bind(&update.phone_number)
        .bind(update.payment_method)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DatabaseError::from_sqlx(e)
                .with_context(format!("updating details for reference {merchant_reference}"))
        })
    }
}
