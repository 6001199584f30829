//! Operator endpoints. Every wallet change made here is attributed to the
//! calling admin and notified to the user.

use api_types::{
    booking::{BookingList, BookingListResponse, BookingTransition, BookingView},
    notification::{Flush, FlushResponse},
    transaction::TransactionView,
    wallet::{BalanceResponse, WalletAdjust, WalletView},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use engine::{BookingListFilter, CreditCmd, DebitCmd, TransitionCmd};
use uuid::Uuid;

use crate::{
    AdminId, ServerError,
    bookings::{booking_view, engine_status},
    server::ServerState,
    transactions::transaction_view,
    wallets::wallet_view,
};

const DEFAULT_FLUSH_LIMIT: u64 = 100;

pub async fn wallet(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> Result<Json<WalletView>, ServerError> {
    let wallet = state.engine.wallet(&user_id).await?;
    Ok(Json(wallet_view(wallet)))
}

pub async fn credit(
    Extension(AdminId(admin_id)): Extension<AdminId>,
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
    Json(payload): Json<WalletAdjust>,
) -> Result<Json<BalanceResponse>, ServerError> {
    let mut cmd = CreditCmd::new(user_id, payload.amount, payload.reason).admin_id(admin_id);
    if let Some(booking_id) = payload.booking_id {
        cmd = cmd.booking_id(booking_id);
    }
    if let Some(key) = payload.idempotency_key {
        cmd = cmd.idempotency_key(key);
    }
    let balance = state.engine.credit(cmd).await?;
    Ok(Json(BalanceResponse { balance }))
}

pub async fn debit(
    Extension(AdminId(admin_id)): Extension<AdminId>,
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
    Json(payload): Json<WalletAdjust>,
) -> Result<Json<BalanceResponse>, ServerError> {
    let mut cmd = DebitCmd::new(user_id, payload.amount, payload.reason).admin_id(admin_id);
    if let Some(booking_id) = payload.booking_id {
        cmd = cmd.booking_id(booking_id);
    }
    if let Some(key) = payload.idempotency_key {
        cmd = cmd.idempotency_key(key);
    }
    let balance = state.engine.debit(cmd).await?;
    Ok(Json(BalanceResponse { balance }))
}

pub async fn bookings(
    State(state): State<ServerState>,
    Query(query): Query<BookingList>,
) -> Result<Json<BookingListResponse>, ServerError> {
    let filter = BookingListFilter {
        status: query.status.map(engine_status),
        user_id: query.user_id,
        limit: query.limit,
    };
    let bookings = state.engine.bookings(&filter).await?;
    Ok(Json(BookingListResponse {
        bookings: bookings.into_iter().map(booking_view).collect(),
    }))
}

pub async fn transition(
    Extension(AdminId(admin_id)): Extension<AdminId>,
    State(state): State<ServerState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<BookingTransition>,
) -> Result<Json<BookingView>, ServerError> {
    let cmd = TransitionCmd::new(
        booking_id,
        engine_status(payload.expected),
        engine_status(payload.next),
    );
    let booking = state.engine.transition_booking(cmd).await?;
    tracing::info!(%booking_id, %admin_id, status = %booking.status, "admin moved booking");
    Ok(Json(booking_view(booking)))
}

pub async fn request_review(
    State(state): State<ServerState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingView>, ServerError> {
    let booking = state.engine.request_review(booking_id).await?;
    Ok(Json(booking_view(booking)))
}

pub async fn refund(
    Extension(AdminId(admin_id)): Extension<AdminId>,
    State(state): State<ServerState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.refund_redemption(booking_id, &admin_id).await?;
    Ok(Json(transaction_view(tx)))
}

pub async fn flush(
    State(state): State<ServerState>,
    payload: Option<Json<Flush>>,
) -> Result<Json<FlushResponse>, ServerError> {
    let limit = payload
        .and_then(|Json(flush)| flush.limit)
        .unwrap_or(DEFAULT_FLUSH_LIMIT);
    let report = state.engine.flush_notifications(limit).await?;
    Ok(Json(FlushResponse {
        delivered: report.delivered,
        failed: report.failed,
    }))
}
