use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Requested {requested} exceeds borrowing capacity {capacity}")]
    ExceedsCapacity { requested: Decimal, capacity: Decimal },

    #[error("Requested {requested} exceeds pool liquidity {liquidity}")]
    ExceedsLiquidity { requested: Decimal, liquidity: Decimal },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Repayment term must be between {min} and {max} months, got {got}")]
    InvalidTerm { got: u64, min: u64, max: u64 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid signed transaction: {0}")]
    InvalidPayload(String),

    #[error("Failed to decode {object}: {reason}")]
    Decode { object: &'static str, reason: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Ledger unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Price feed failure: {0}")]
    Oracle(String),

    #[error("Transaction failed: {0}")]
    Submission(String),

    #[error("Invalid configuration for {key}: {reason}")]
    Config { key: &'static str, reason: String },
}

impl DashboardError {
    pub fn decode(object: &'static str, reason: impl Into<String>) -> Self {
        DashboardError::Decode {
            object,
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DashboardError::InvalidAmount(_)
            | DashboardError::ExceedsCapacity { .. }
            | DashboardError::ExceedsLiquidity { .. }
            | DashboardError::MissingField(_)
            | DashboardError::InvalidTerm { .. }
            | DashboardError::InvalidAddress(_)
            | DashboardError::InvalidPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DashboardError::ObjectNotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::Submission(_) | DashboardError::Decode { .. } => {
                StatusCode::BAD_GATEWAY
            }
            DashboardError::Rpc { .. }
            | DashboardError::Transport(_)
            | DashboardError::Oracle(_) => StatusCode::SERVICE_UNAVAILABLE,
            DashboardError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
