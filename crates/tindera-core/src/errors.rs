use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("cart is empty")]
    EmptyCart,
    #[error("invalid time slot selection")]
    InvalidSlot,
    #[error("that action is not available right now")]
    WrongStep,
    #[error("session expired")]
    SessionExpired,
}
