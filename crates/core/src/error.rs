use crate::order::OrderStatus;

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("order not found: {0}")]
    NotFound(String),
    #[error("invalid order payload: {0}")]
    Validation(String),
    #[error("failed to encode referral artifact: {0}")]
    Encoding(String),
    #[error("no free order code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },
    #[error("order code already in use: {0}")]
    CodeTaken(String),
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("order storage I/O failed: {0}")]
    Storage(#[from] std::io::Error),
    #[error("failed to (de)serialise order: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<allergo_types::TextError> for OrderError {
    fn from(err: allergo_types::TextError) -> Self {
        OrderError::Validation(err.to_string())
    }
}

pub type OrderResult<T> = std::result::Result<T, OrderError>;
