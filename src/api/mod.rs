//! HTTP surface: health, checkout initiation and the three notification
//! entry points the provider is configured with. The notification paths
//! must stay stable; SmobilPay stores them per merchant account.

pub mod checkout;
pub mod health;
pub mod notifications;

use crate::config::Config;
use crate::database::repository::TransactionStore;
use crate::gateway::client::SmobilpayClient;
use crate::notification::reconcile::ReconciliationEngine;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn TransactionStore>,
    pub engine: Arc<ReconciliationEngine>,
    pub gateway: Arc<SmobilpayClient>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/payment/smobilpay/initiate", post(checkout::initiate_payment))
        .route(
            "/payment/smobilpay/callback/:merchant_reference",
            get(notifications::callback).post(notifications::callback),
        )
        .route(
            "/payment/smobilpay/return/:merchant_reference",
            get(notifications::payment_return),
        )
        .route("/payment/smobilpay/webhook", post(notifications::webhook))
        .route("/payment/smobilpay/test", get(notifications::connection_test))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
