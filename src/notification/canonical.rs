//! Canonical notification record and the per-channel normalizers.
//!
//! SmobilPay reports payment status over three wires: the customer's browser
//! returning from the payment page (query parameters), a server-to-server
//! callback (query and/or form fields), and a JSON webhook. All three are
//! folded into one flat record here before any business logic runs.

use crate::notification::error::NotificationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Channel-independent representation of a payment status event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalNotification {
    pub merchant_reference: String,
    /// Raw provider status, case-normalized at mapping time
    pub status: String,
    pub payment_id: Option<String>,
    pub payment_method: Option<String>,
    pub phone_number: Option<String>,
    pub status_message: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn json_str(body: &Value, key: &str) -> Option<String> {
    non_empty(body.get(key).and_then(Value::as_str))
}

impl CanonicalNotification {
    /// Normalize the return-redirect channel.
    ///
    /// Returns `None` unless both `status` and `paymentId` arrived; the
    /// return view is then purely informational and the handler reports
    /// whatever state is already recorded.
    pub fn from_return_params(
        merchant_reference: &str,
        params: &HashMap<String, String>,
    ) -> Option<Self> {
        let status = non_empty(params.get("status").map(String::as_str))?;
        let payment_id = non_empty(params.get("paymentId").map(String::as_str))?;

        Some(Self {
            merchant_reference: merchant_reference.to_string(),
            status,
            payment_id: Some(payment_id),
            payment_method: None,
            phone_number: None,
            status_message: non_empty(params.get("statusMessage").map(String::as_str)),
        })
    }

    /// Normalize the callback channel.
    ///
    /// Query parameters and form-body fields are folded into one flat map,
    /// body fields folded in second so they win on a name clash. The
    /// path-derived merchant reference overrides any same-named field.
    pub fn from_callback_params(
        merchant_reference: &str,
        query: HashMap<String, String>,
        form: Vec<(String, String)>,
    ) -> Self {
        let mut fields = query;
        fields.extend(form);

        Self {
            merchant_reference: merchant_reference.to_string(),
            status: fields.get("status").cloned().unwrap_or_default(),
            payment_id: non_empty(fields.get("paymentId").map(String::as_str)),
            payment_method: non_empty(fields.get("paymentMethod").map(String::as_str)),
            phone_number: non_empty(fields.get("phoneNumber").map(String::as_str)),
            status_message: non_empty(fields.get("statusMessage").map(String::as_str)),
        }
    }

    /// Normalize the webhook channel.
    ///
    /// The merchant reference comes from the body (`merchantReference`, or
    /// `reference` as a fallback key); its absence rejects the event before
    /// any transaction lookup.
    pub fn from_webhook_json(body: &Value) -> Result<Self, NotificationError> {
        if !body.is_object() {
            return Err(NotificationError::malformed_payload(
                "webhook body is not a JSON object",
            ));
        }

        let merchant_reference = json_str(body, "merchantReference")
            .or_else(|| json_str(body, "reference"))
            .ok_or(NotificationError::MissingReference)?;

        Ok(Self {
            merchant_reference,
            status: json_str(body, "status").unwrap_or_default(),
            payment_id: json_str(body, "paymentId"),
            payment_method: json_str(body, "paymentMethod"),
            phone_number: json_str(body, "phoneNumber"),
            status_message: json_str(body, "statusMessage"),
        })
    }
}
