//! Payment initiation endpoint.
//!
//! Creates the local pending transaction, registers the callback URL with
//! the provider and opens the payment order. The merchant reference is
//! minted here, once, and correlates every later notification.

use crate::api::AppState;
use crate::database::transaction::{PaymentTransaction, TransactionUpdate};
use crate::gateway::client::PaymentOrderRequest;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct InitiatePaymentRequest {
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitiatePaymentResponse {
    pub merchant_reference: String,
    pub payment_id: Option<String>,
    /// Hosted payment page the customer should be redirected to
    pub payment_url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

fn error_response(message: impl Into<String>) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        status: "error",
        message: message.into(),
    })
}

pub async fn initiate_payment(
    State(state): State<AppState>,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<Json<InitiatePaymentResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.amount <= 0 {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            error_response("Amount must be a positive number of minor currency units"),
        ));
    }
    if request.currency.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            error_response("Currency is required"),
        ));
    }

    let merchant_reference = Uuid::new_v4().to_string();
    let currency = request.currency.trim().to_string();

    let transaction = PaymentTransaction::new_pending(
        &merchant_reference,
        request.amount.to_string(),
        &currency,
        request.customer_email.clone(),
        request.customer_name.clone(),
    );

    state.store.insert(&transaction).await.map_err(|e| {
        error!("Failed to create payment transaction: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_response("Failed to create payment transaction"),
        )
    })?;

    info!(
        "Initiating SmobilPay payment: {} {} (reference {})",
        request.amount, currency, merchant_reference
    );

    let base = state.config.server.public_url.trim_end_matches('/');
    let callback_url = format!("{base}/payment/smobilpay/callback/{merchant_reference}");
    let return_url = format!("{base}/payment/smobilpay/return/{merchant_reference}");

    // Non-fatal: the provider can still deliver to a previously registered
    // URL, and the return channel covers the rest.
    if !state.gateway.register_callback_url(&callback_url).await {
        warn!(
            "Callback URL registration failed for {}, continuing with checkout",
            merchant_reference
        );
    }

    let order = PaymentOrderRequest {
        merchant_reference: merchant_reference.clone(),
        amount_minor: request.amount,
        currency,
        description: request
            .description
            .unwrap_or_else(|| format!("Payment {merchant_reference}")),
        customer_email: request.customer_email,
        customer_name: request.customer_name,
        callback_url,
        return_url,
    };

    let created = state.gateway.create_payment_order(&order).await.map_err(|e| {
        error!(
            "SmobilPay payment creation failed for {}: {}",
            merchant_reference, e
        );
        (
            StatusCode::BAD_GATEWAY,
            error_response(format!("Payment creation failed: {e}")),
        )
    })?;

    if let Some(payment_id) = &created.payment_id {
        let update = TransactionUpdate {
            payment_id: Some(payment_id.clone()),
            ..Default::default()
        };
        if let Err(e) = state
            .store
            .update_descriptive_fields(&merchant_reference, &update)
            .await
        {
            warn!(
                "Failed to record provider payment id for {}: {}",
                merchant_reference, e
            );
        }
    }

    Ok(Json(InitiatePaymentResponse {
        merchant_reference,
        payment_id: created.payment_id,
        payment_url: created.payment_url,
    }))
}
