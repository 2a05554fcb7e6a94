use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Authentication with the SmobilPay API failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Communication with the SmobilPay API failed: {message}")]
    Communication { message: String },

    #[error("Unexpected response from the SmobilPay API: {message}")]
    UnexpectedResponse { message: String },

    #[error("Gateway configuration error: {message}")]
    Config { message: String },
}

impl GatewayError {
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    pub fn unexpected_response(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
