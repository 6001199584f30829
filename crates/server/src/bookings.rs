//! Booking API endpoints for end users.

use api_types::booking::{
    BookingListResponse, BookingNew, BookingStatus as ApiStatus, BookingView,
    PaymentStatus as ApiPayment, RedeemCoins, ReviewSubmit,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{EngineError, NewBookingCmd, RedeemCoinsCmd};
use uuid::Uuid;

use crate::{ServerError, UserId, server::ServerState};

pub(crate) fn map_status(status: engine::BookingStatus) -> ApiStatus {
    match status {
        engine::BookingStatus::Pending => ApiStatus::Pending,
        engine::BookingStatus::Confirmed => ApiStatus::Confirmed,
        engine::BookingStatus::PaymentReceived => ApiStatus::PaymentReceived,
        engine::BookingStatus::Completed => ApiStatus::Completed,
        engine::BookingStatus::Cancelled => ApiStatus::Cancelled,
    }
}

pub(crate) fn engine_status(status: ApiStatus) -> engine::BookingStatus {
    match status {
        ApiStatus::Pending => engine::BookingStatus::Pending,
        ApiStatus::Confirmed => engine::BookingStatus::Confirmed,
        ApiStatus::PaymentReceived => engine::BookingStatus::PaymentReceived,
        ApiStatus::Completed => engine::BookingStatus::Completed,
        ApiStatus::Cancelled => engine::BookingStatus::Cancelled,
    }
}

pub(crate) fn booking_view(booking: engine::Booking) -> BookingView {
    BookingView {
        id: booking.id,
        user_id: booking.user_id,
        status: map_status(booking.status),
        puja_id: booking.puja_id,
        puja_name: booking.puja_name,
        price: booking.price,
        discount_applied: booking.discount_applied,
        coins_redeemed: booking.coins_redeemed,
        final_price: booking.final_price,
        redemption_transaction_id: booking.redemption_transaction_id,
        payment_status: match booking.payment_status {
            engine::PaymentStatus::Unpaid => ApiPayment::Unpaid,
            engine::PaymentStatus::Received => ApiPayment::Received,
        },
        review_requested: booking.review_requested,
        has_review: booking.has_review,
        review_id: booking.review_id,
        created_at: booking.created_at,
        payment_received_at: booking.payment_received_at,
    }
}

/// Loads a booking and hides it from anyone but its owner.
async fn owned_booking(
    state: &ServerState,
    booking_id: Uuid,
    user_id: &str,
) -> Result<engine::Booking, ServerError> {
    let booking = state.engine.booking(booking_id).await?;
    if booking.user_id != user_id {
        return Err(EngineError::KeyNotFound("booking not exists".to_string()).into());
    }
    Ok(booking)
}

pub async fn create(
    Extension(UserId(user_id)): Extension<UserId>,
    State(state): State<ServerState>,
    Json(payload): Json<BookingNew>,
) -> Result<(StatusCode, Json<BookingView>), ServerError> {
    let cmd = NewBookingCmd::new(user_id, payload.puja_id, payload.puja_name, payload.price)
        .discount(payload.discount_applied.unwrap_or(0))
        .coins(payload.coins.unwrap_or(0));
    let booking = state.engine.create_booking(cmd).await?;
    Ok((StatusCode::CREATED, Json(booking_view(booking))))
}

pub async fn list(
    Extension(UserId(user_id)): Extension<UserId>,
    State(state): State<ServerState>,
) -> Result<Json<BookingListResponse>, ServerError> {
    let bookings = state.engine.bookings_for_user(&user_id).await?;
    Ok(Json(BookingListResponse {
        bookings: bookings.into_iter().map(booking_view).collect(),
    }))
}

pub async fn get(
    Extension(UserId(user_id)): Extension<UserId>,
    State(state): State<ServerState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingView>, ServerError> {
    let booking = owned_booking(&state, booking_id, &user_id).await?;
    Ok(Json(booking_view(booking)))
}

pub async fn redeem(
    Extension(UserId(user_id)): Extension<UserId>,
    State(state): State<ServerState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<RedeemCoins>,
) -> Result<Json<BookingView>, ServerError> {
    let booking = state
        .engine
        .redeem_coins(RedeemCoinsCmd::new(booking_id, user_id, payload.coins))
        .await?;
    Ok(Json(booking_view(booking)))
}

pub async fn review(
    Extension(UserId(user_id)): Extension<UserId>,
    State(state): State<ServerState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<ReviewSubmit>,
) -> Result<Json<BookingView>, ServerError> {
    owned_booking(&state, booking_id, &user_id).await?;
    let booking = state
        .engine
        .submit_review(booking_id, &payload.review_id)
        .await?;
    Ok(Json(booking_view(booking)))
}
