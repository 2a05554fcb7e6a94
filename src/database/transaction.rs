//! Payment transaction entity and the enums it is built from.
//!
//! A transaction row is created once by the checkout flow and afterwards only
//! mutated by the notification reconciliation path. The merchant reference is
//! assigned at creation time and never changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Generic transaction lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionState {
    Pending,
    Done,
    Error,
    Cancel,
}

impl TransactionState {
    /// Terminal states are never left once reached
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancel)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Error => "error",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mobile money payment channels offered through SmobilPay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    MtnCm,
    OrangeCm,
    ExpressUnion,
    SmobilpayCash,
}

impl PaymentMethod {
    /// Map a provider method code onto a known channel.
    ///
    /// Codes the provider has not documented land on MTN, the dominant
    /// channel, instead of failing the notification.
    pub fn from_provider_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "MTN_CM" => Self::MtnCm,
            "ORANGE_CM" => Self::OrangeCm,
            "EXPRESS_UNION" => Self::ExpressUnion,
            "SMOBILPAY_CASH" => Self::SmobilpayCash,
            _ => Self::MtnCm,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MtnCm => "mtn_cm",
            Self::OrangeCm => "orange_cm",
            Self::ExpressUnion => "express_union",
            Self::SmobilpayCash => "smobilpay_cash",
        }
    }
}

/// Payment transaction entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentTransaction {
    pub id: String,
    /// Unique reference correlating this row with all provider-side events
    pub merchant_reference: String,
    /// Provider-assigned payment identifier, informational only
    pub payment_id: Option<String>,
    pub state: TransactionState,
    /// Reason recorded when the transaction fails or is cancelled
    pub state_message: Option<String>,
    /// Amount in minor currency units
    pub amount: String,
    pub currency: String,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub phone_number: Option<String>,
    /// Last human-readable status message received from the provider
    pub status_details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentTransaction {
    /// Build a fresh pending transaction for the checkout flow
    pub fn new_pending(
        merchant_reference: impl Into<String>,
        amount: impl Into<String>,
        currency: impl Into<String>,
        customer_email: Option<String>,
        customer_name: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            merchant_reference: merchant_reference.into(),
            payment_id: None,
            state: TransactionState::Pending,
            state_message: None,
            amount: amount.into(),
            currency: currency.into(),
            customer_email,
            customer_name,
            payment_method: None,
            phone_number: None,
            status_details: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Descriptive fields refreshed on every notification, whatever the mapped
/// state turns out to be.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    /// Written only when the notification carried one
    pub payment_id: Option<String>,
    /// Always written through; `None` clears the previous message
    pub status_details: Option<String>,
    /// Written only when the notification carried one
    pub phone_number: Option<String>,
    /// Written only when the notification carried one
    pub payment_method: Option<PaymentMethod>,
}
