use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid transaction for order {order_id}: {reason}")]
    InvalidTransaction { order_id: String, reason: String },

    #[error("Calculation error: {0}")]
    Calculation(String),
}
