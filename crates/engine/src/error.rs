//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`InvalidAmount`] thrown when an input fails validation (amount, reason,
//!   identifiers, prices).
//! - [`InsufficientBalance`] thrown when a debit exceeds the wallet balance.
//! - [`KeyNotFound`] thrown when a booking is not found.
//! - [`InvalidTransition`] thrown when a booking status change is not allowed.
//! - [`ConcurrencyConflict`] thrown when the persisted booking status no longer
//!   matches the expected one.
//! - [`Database`] thrown by the store, or when a stored value cannot be decoded.
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InsufficientBalance`]: EngineError::InsufficientBalance
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`InvalidTransition`]: EngineError::InvalidTransition
//!  [`ConcurrencyConflict`]: EngineError::ConcurrencyConflict
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),
    #[error("Redemption limit exceeded: {0}")]
    RedemptionLimit(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("Operation timed out: {0}")]
    Timeout(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InsufficientBalance(a), Self::InsufficientBalance(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::ConcurrencyConflict(a), Self::ConcurrencyConflict(b)) => a == b,
            (Self::RedemptionLimit(a), Self::RedemptionLimit(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::Timeout(a), Self::Timeout(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
