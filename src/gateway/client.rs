//! SmobilPay (enKap) REST API client.
//!
//! Wraps the OAuth client-credentials exchange, bearer-authenticated API
//! calls, order creation and callback URL registration. Every outbound call
//! carries a fixed timeout so the checkout path can never hang on the
//! provider.

use crate::config::{Environment, SmobilpayConfig};
use crate::gateway::error::{GatewayError, GatewayResult};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// OAuth token returned by the provider's token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Payment order sent to the provider at checkout time
#[derive(Debug, Clone)]
pub struct PaymentOrderRequest {
    pub merchant_reference: String,
    /// Amount in minor currency units
    pub amount_minor: i64,
    pub currency: String,
    pub description: String,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub callback_url: String,
    pub return_url: String,
}

#[derive(Debug, Clone)]
pub struct PaymentOrderResponse {
    pub payment_id: Option<String>,
    /// Hosted payment page the customer is sent to
    pub payment_url: String,
}

pub struct SmobilpayClient {
    config: SmobilpayConfig,
    client: Client,
}

/// Registration is attempted with the exact URL first, then with the
/// trailing slash stripped, then appended. The provider has historically
/// accepted different shapes depending on account configuration.
pub fn callback_url_variants(callback_url: &str) -> Vec<String> {
    let stripped = callback_url.trim_end_matches('/');
    vec![
        callback_url.to_string(),
        stripped.to_string(),
        format!("{stripped}/"),
    ]
}

impl SmobilpayClient {
    pub fn new(config: SmobilpayConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// API host: explicit override first, environment default otherwise
    pub fn api_url(&self) -> &str {
        self.config
            .api_url
            .as_deref()
            .unwrap_or_else(|| self.config.environment.api_url())
    }

    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    /// Perform the client-credentials exchange.
    ///
    /// All failure modes, transport errors and non-2xx alike, come back as
    /// an authentication failure; nothing raises through to handler code.
    pub async fn access_token(&self) -> GatewayResult<AccessToken> {
        let url = format!("{}/oauth/token", self.api_url());
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.consumer_key.as_str()),
            ("client_secret", self.config.consumer_secret.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to reach SmobilPay token endpoint: {}", e);
                GatewayError::authentication_failed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("SmobilPay token endpoint returned HTTP {}", status);
            return Err(GatewayError::authentication_failed(format!(
                "token endpoint returned HTTP {status}"
            )));
        }

        response.json::<AccessToken>().await.map_err(|e| {
            error!("Failed to parse SmobilPay token response: {}", e);
            GatewayError::authentication_failed(format!("invalid token response: {e}"))
        })
    }

    /// Make an authenticated request against the provider API.
    ///
    /// The payload is serialized as a JSON body for POST and as query
    /// parameters for GET.
    pub async fn request(
        &self,
        endpoint: &str,
        payload: Option<&Value>,
        method: Method,
    ) -> GatewayResult<Value> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.api_url(), endpoint);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(&token.access_token)
            .header("Accept", "application/json");

        if let Some(payload) = payload {
            request = if method == Method::POST {
                request.json(payload)
            } else {
                request.query(&query_pairs(payload))
            };
        }

        let response = request.send().await.map_err(|e| {
            error!("SmobilPay API request to {} failed: {}", endpoint, e);
            GatewayError::communication(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "SmobilPay API request to {} returned HTTP {}: {}",
                endpoint, status, body
            );
            return Err(GatewayError::communication(format!(
                "HTTP {status}: {body}"
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            GatewayError::unexpected_response(format!("invalid JSON in response: {e}"))
        })
    }

    /// Create a payment order and return the hosted payment page URL
    pub async fn create_payment_order(
        &self,
        order: &PaymentOrderRequest,
    ) -> GatewayResult<PaymentOrderResponse> {
        let payload = serde_json::json!({
            "amount": order.amount_minor,
            "currency": order.currency,
            "merchantReference": order.merchant_reference,
            "description": order.description,
            "customerEmail": order.customer_email,
            "customerName": order.customer_name,
            "callbackUrl": order.callback_url,
            "returnUrl": order.return_url,
        });

        let response = self
            .request("/api/order/create", Some(&payload), Method::POST)
            .await?;

        if response.get("status").and_then(Value::as_str) == Some("success") {
            if let Some(payment_url) = response.get("paymentUrl").and_then(Value::as_str) {
                info!(
                    "SmobilPay order created for reference {}",
                    order.merchant_reference
                );
                return Ok(PaymentOrderResponse {
                    payment_id: response
                        .get("paymentId")
                        .and_then(Value::as_str)
                        .map(String::from),
                    payment_url: payment_url.to_string(),
                });
            }
        }

        error!(
            "SmobilPay order creation for reference {} did not return a payment URL",
            order.merchant_reference
        );
        Err(GatewayError::unexpected_response(
            "order creation did not return a payment URL",
        ))
    }

    /// Register the callback URL the provider should notify.
    ///
    /// Tries each URL variant in sequence and stops at the first the
    /// provider accepts. In the sandbox one extra forced attempt follows if
    /// every variant was rejected. Failure degrades to `false` so a
    /// registration problem never blocks the payment page.
    pub async fn register_callback_url(&self, callback_url: &str) -> bool {
        for variant in callback_url_variants(callback_url) {
            let payload = serde_json::json!({ "callbackUrl": variant });
            match self
                .request("/api/callbackurl", Some(&payload), Method::POST)
                .await
            {
                Ok(response)
                    if response.get("status").and_then(Value::as_str) == Some("success") =>
                {
                    info!("Successfully registered callback URL: {}", variant);
                    return true;
                }
                Ok(_) => {
                    warn!("Callback URL variant rejected by provider: {}", variant);
                }
                Err(e) => {
                    warn!("Failed to register callback URL {}: {}", variant, e);
                }
            }
        }

        if self.config.environment == Environment::Test {
            let payload = serde_json::json!({ "callbackUrl": callback_url, "force": true });
            match self
                .request("/api/callbackurl", Some(&payload), Method::POST)
                .await
            {
                Ok(response) => {
                    if response.get("status").and_then(Value::as_str) == Some("success") {
                        info!("Forced callback URL registration accepted: {}", callback_url);
                        return true;
                    }
                }
                Err(e) => {
                    warn!("Forced callback URL registration failed: {}", e);
                }
            }
        }

        error!("Callback URL registration failed for {}", callback_url);
        false
    }
}

fn query_pairs(payload: &Value) -> Vec<(String, String)> {
    match payload.as_object() {
        Some(map) => map
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect(),
        None => Vec::new(),
    }
}
