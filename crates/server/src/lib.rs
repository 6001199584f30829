use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{AdminId, ServerState, UserId, router, run, run_with_listener, spawn_with_listener};

mod admin;
mod bookings;
mod server;
mod transactions;
mod wallets;

pub mod types {
    pub mod wallet {
        pub use api_types::wallet::{BalanceResponse, WalletAdjust, WalletView};
    }

    pub mod transaction {
        pub use api_types::transaction::{
            ListOrder, TransactionKind, TransactionList, TransactionListResponse, TransactionView,
        };
    }

    pub mod booking {
        pub use api_types::booking::{
            BookingList, BookingListResponse, BookingNew, BookingStatus, BookingTransition,
            BookingView, PaymentStatus, RedeemCoins, ReviewSubmit,
        };
    }

    pub mod notification {
        pub use api_types::notification::{Flush, FlushResponse};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ConcurrencyConflict(_) | EngineError::InvalidTransition(_) => {
            StatusCode::CONFLICT
        }
        EngineError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InsufficientBalance(_)
        | EngineError::InvalidAmount(_)
        | EngineError::RedemptionLimit(_)
        | EngineError::InvalidCursor(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
