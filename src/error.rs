use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is required but not set")]
    Missing { key: &'static str },

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("no contract specification for symbol {0}")]
    UnknownSymbol(String),
}

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("price feed connection failed: {0}")]
    ConnectionFailed(String),

    #[error("symbol {0} not found in terminal")]
    SymbolNotFound(String),
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("model API error: {0}")]
    ApiError(String),

    #[error("model API quota exceeded")]
    QuotaExceeded,

    #[error("model API timed out")]
    Timeout,

    #[error("model response is not a signal object: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("signal has no action")]
    MissingAction,

    #[error("action {0:?} is not a recognised order action")]
    InvalidAction(String),

    #[error("field {field} has unusable value {value:?}")]
    MalformedField { field: &'static str, value: String },

    #[error("invalid stop loss: {0}")]
    InvalidStopLoss(String),

    #[error("{action} stop loss {stop_loss} is on the wrong side of entry {entry_price}")]
    StopOnWrongSide {
        action: String,
        entry_price: Decimal,
        stop_loss: Decimal,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum LotSizeError {
    #[error("zero price difference between entry {entry_price} and stop {stop_loss}")]
    DivisionByZeroRisk {
        entry_price: Decimal,
        stop_loss: Decimal,
    },

    #[error("invalid lot step {0}")]
    InvalidLotStep(Decimal),

    #[error("arithmetic overflow computing {0}")]
    Overflow(String),

    #[error("sized order risks {actual_risk}, above the budget of {risk_amount}")]
    RiskExceeded {
        actual_risk: Decimal,
        risk_amount: Decimal,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Oracle,
    Validation,
    Arithmetic,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("configuration error: {0}")]
    Registry(#[from] RegistryError),

    #[error("price oracle failed: {0}")]
    Price(#[from] PriceError),

    #[error("signal oracle failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("signal rejected: {0}")]
    Validation(#[from] SignalError),

    #[error("lot size guard tripped: {0}")]
    Arithmetic(#[from] LotSizeError),

    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::Config(_) | PipelineError::Registry(_) => ErrorCategory::Configuration,
            PipelineError::Price(_) | PipelineError::Oracle(_) => ErrorCategory::Oracle,
            PipelineError::Validation(_) => ErrorCategory::Validation,
            PipelineError::Arithmetic(_) => ErrorCategory::Arithmetic,
            PipelineError::Cancelled => ErrorCategory::Cancelled,
        }
    }
}
