//! Notification entry points.
//!
//! Three thin adapters over the reconciliation engine: the server-to-server
//! callback and the customer return answer with redirects chosen from the
//! transaction state, the webhook answers with a JSON acknowledgement.
//! Every failure degrades to the channel's standard error response; none of
//! these handlers ever surfaces a raw server error to the provider or the
//! customer's browser.

use crate::api::AppState;
use crate::database::transaction::TransactionState;
use crate::notification::canonical::CanonicalNotification;
use crate::notification::error::NotificationError;
use crate::notification::signature::verify_signature;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Redirect;
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, info};

pub const SIGNATURE_HEADER: &str = "X-Smobilpay-Signature";

const STATUS_PAGE: &str = "/payment/status";
const CART_PAGE: &str = "/shop/cart";
const CART_ERROR_PAGE: &str = "/shop/cart?payment_error=1";
const CART_CANCELLED_PAGE: &str = "/shop/cart?payment_cancelled=1";

/// JSON acknowledgement body for the webhook channel.
///
/// All outcomes the handler itself produces are answered with HTTP 200 and
/// an `error`/`success` status in the body, so the provider does not retry
/// permanent failures aggressively; non-2xx is left to transport faults.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    pub message: String,
}

impl WebhookAck {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

/// Server-to-server callback. Accepts query and/or form fields and always
/// answers with a redirect.
pub async fn callback(
    State(state): State<AppState>,
    Path(merchant_reference): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Redirect {
    info!(
        "SmobilPay callback received for merchant reference: {}",
        merchant_reference
    );

    let form: Vec<(String, String)> = serde_urlencoded::from_bytes(&body).unwrap_or_default();
    let notification =
        CanonicalNotification::from_callback_params(&merchant_reference, query, form);

    match state.engine.reconcile(&notification).await {
        Ok(outcome) => match outcome.state {
            TransactionState::Error | TransactionState::Cancel => Redirect::to(CART_ERROR_PAGE),
            TransactionState::Done | TransactionState::Pending => Redirect::to(STATUS_PAGE),
        },
        Err(NotificationError::TransactionNotFound { .. }) => Redirect::to(CART_PAGE),
        Err(e) => {
            error!(
                "Error processing SmobilPay callback for {}: {}",
                merchant_reference, e
            );
            Redirect::to(CART_ERROR_PAGE)
        }
    }
}

/// Customer return from the hosted payment page.
///
/// The query parameters only count as a notification when both `status` and
/// `paymentId` arrived; otherwise the redirect is chosen from whatever
/// state is already recorded.
pub async fn payment_return(
    State(state): State<AppState>,
    Path(merchant_reference): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Redirect {
    info!(
        "SmobilPay return received for merchant reference: {}",
        merchant_reference
    );

    let reconciled_state =
        match CanonicalNotification::from_return_params(&merchant_reference, &query) {
            Some(notification) => match state.engine.reconcile(&notification).await {
                Ok(outcome) => Some(outcome.state),
                Err(NotificationError::TransactionNotFound { .. }) => {
                    return Redirect::to(CART_PAGE);
                }
                Err(e) => {
                    error!(
                        "Error processing SmobilPay return for {}: {}",
                        merchant_reference, e
                    );
                    return Redirect::to(CART_ERROR_PAGE);
                }
            },
            None => None,
        };

    let current_state = match reconciled_state {
        Some(state) => state,
        None => match state.store.find_by_reference(&merchant_reference).await {
            Ok(Some(transaction)) => transaction.state,
            Ok(None) => {
                error!(
                    "No transaction found for merchant reference: {}",
                    merchant_reference
                );
                return Redirect::to(CART_PAGE);
            }
            Err(e) => {
                error!(
                    "Failed to load transaction for merchant reference {}: {}",
                    merchant_reference, e
                );
                return Redirect::to(CART_ERROR_PAGE);
            }
        },
    };

    redirect_after_payment(current_state)
}

fn redirect_after_payment(state: TransactionState) -> Redirect {
    match state {
        TransactionState::Done => Redirect::to(STATUS_PAGE),
        TransactionState::Cancel => Redirect::to(CART_CANCELLED_PAGE),
        TransactionState::Error => Redirect::to(CART_ERROR_PAGE),
        TransactionState::Pending => Redirect::to(STATUS_PAGE),
    }
}

/// Signed JSON webhook. The signature is checked against the exact raw body
/// before anything is parsed or looked up.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookAck> {
    info!("SmobilPay webhook received");

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !verify_signature(
        &body,
        signature,
        state.config.smobilpay.webhook_secret.as_deref(),
    ) {
        error!("SmobilPay webhook signature verification failed");
        return Json(WebhookAck::error("Invalid signature"));
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            error!("SmobilPay webhook body is not valid JSON: {}", e);
            return Json(WebhookAck::error("Malformed payload"));
        }
    };

    let notification = match CanonicalNotification::from_webhook_json(&payload) {
        Ok(notification) => notification,
        Err(e) => {
            error!("SmobilPay webhook rejected: {}", e);
            return Json(WebhookAck::error(e.to_string()));
        }
    };

    match state.engine.reconcile(&notification).await {
        Ok(outcome) => {
            info!(
                "SmobilPay webhook processed for {} (state {})",
                outcome.merchant_reference, outcome.state
            );
            Json(WebhookAck::success("Webhook processed successfully"))
        }
        Err(NotificationError::TransactionNotFound { .. }) => {
            Json(WebhookAck::error("Transaction not found"))
        }
        Err(e) => {
            error!("Error processing SmobilPay webhook: {}", e);
            Json(WebhookAck::error("Webhook processing failed"))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConnectionTestResponse {
    pub status: &'static str,
    pub message: String,
    pub environment: &'static str,
    pub api_url: String,
}

/// Connectivity check: acquires a token and echoes the result
pub async fn connection_test(
    State(state): State<AppState>,
) -> (StatusCode, Json<ConnectionTestResponse>) {
    let environment = state.gateway.environment().as_str();
    let api_url = state.gateway.api_url().to_string();

    match state.gateway.access_token().await {
        Ok(_) => (
            StatusCode::OK,
            Json(ConnectionTestResponse {
                status: "success",
                message: "Successfully connected to SmobilPay API".to_string(),
                environment,
                api_url,
            }),
        ),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ConnectionTestResponse {
                status: "error",
                message: e.to_string(),
                environment,
                api_url,
            }),
        ),
    }
}
