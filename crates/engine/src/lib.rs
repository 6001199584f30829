//! Coin wallet ledger and booking lifecycle.
//!
//! Every mutation goes through [`Engine`], which persists through sea-orm and
//! publishes user notifications after commit.

pub use bookings::{Booking, BookingStatus, PaymentStatus};
pub use commands::{CreditCmd, DebitCmd, NewBookingCmd, RedeemCoinsCmd, TransitionCmd};
pub use error::EngineError;
pub use notifications::{
    DispatchError, Notification, NotificationDispatcher, NotificationKind, TracingDispatcher,
};
pub use ops::{
    BookingListFilter, Engine, EngineBuilder, EngineOptions, FlushReport, LedgerCheck, ListOrder,
};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use transactions::{Transaction, TransactionKind, TransactionStatus};
pub use wallets::Wallet;

mod bookings;
mod commands;
mod error;
mod notifications;
mod ops;
mod retry;
mod transactions;
mod util;
mod wallets;

type ResultEngine<T> = Result<T, EngineError>;
