use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    Booking, BookingStatus, EngineError, NewBookingCmd, Notification, PaymentStatus, ResultEngine,
    TransitionCmd, bookings,
    util::normalize_required_text,
};

use super::{Engine, normalize_user_id, with_tx};

/// Filters for the admin booking listing.
#[derive(Clone, Debug, Default)]
pub struct BookingListFilter {
    pub status: Option<BookingStatus>,
    pub user_id: Option<String>,
    /// `None` returns every matching booking.
    pub limit: Option<u64>,
}

impl Engine {
    /// Create a booking in `pending`.
    ///
    /// When `cmd.coins > 0` the coins are redeemed in the same database
    /// transaction: if redemption is rejected, the booking is not created
    /// either.
    pub async fn create_booking(&self, cmd: NewBookingCmd) -> ResultEngine<Booking> {
        let user_id = normalize_user_id(&cmd.user_id)?;
        let puja_id = normalize_required_text(&cmd.puja_id, "puja id")?;
        let puja_name = normalize_required_text(&cmd.puja_name, "puja name")?;
        if cmd.coins < 0 {
            return Err(EngineError::InvalidAmount("coins must be >= 0".to_string()));
        }
        let booking = Booking::new(
            user_id,
            puja_id,
            puja_name,
            cmd.price,
            cmd.discount_applied,
            Utc::now(),
        )?;

        let booking = self
            .bounded("create_booking", async {
                with_tx!(self, |db_tx| {
                    bookings::ActiveModel::from(&booking).insert(&db_tx).await?;
                    if cmd.coins > 0 {
                        self.redeem_in_tx(&db_tx, &booking, cmd.coins).await
                    } else {
                        self.require_booking(&db_tx, booking.id).await
                    }
                })
            })
            .await?;

        tracing::info!(
            booking_id = %booking.id,
            user_id = %booking.user_id,
            price = booking.price,
            coins = booking.coins_redeemed,
            "booking created"
        );
        Ok(booking)
    }

    /// Returns a booking.
    pub async fn booking(&self, booking_id: Uuid) -> ResultEngine<Booking> {
        self.bounded("booking", async {
            with_tx!(self, |db_tx| { self.require_booking(&db_tx, booking_id).await })
        })
        .await
    }

    /// Bookings of a user, newest first.
    pub async fn bookings_for_user(&self, user_id: &str) -> ResultEngine<Vec<Booking>> {
        let filter = BookingListFilter {
            user_id: Some(normalize_user_id(user_id)?),
            ..Default::default()
        };
        self.bookings(&filter).await
    }

    /// Bookings matching `filter`, newest first.
    pub async fn bookings(&self, filter: &BookingListFilter) -> ResultEngine<Vec<Booking>> {
        if filter.limit == Some(0) {
            return Err(EngineError::InvalidAmount("limit must be > 0".to_string()));
        }
        self.bounded("bookings", async {
            with_tx!(self, |db_tx| {
                let mut query = bookings::Entity::find();
                if let Some(status) = filter.status {
                    query = query.filter(bookings::Column::Status.eq(status.as_str()));
                }
                if let Some(user_id) = &filter.user_id {
                    query = query.filter(bookings::Column::UserId.eq(user_id.clone()));
                }
                query
                    .order_by_desc(bookings::Column::CreatedAt)
                    .order_by_desc(bookings::Column::Id)
                    .limit(filter.limit)
                    .all(&db_tx)
                    .await?
                    .into_iter()
                    .map(Booking::try_from)
                    .collect::<ResultEngine<Vec<_>>>()
            })
        })
        .await
    }

    /// Move a booking from `cmd.expected` to `cmd.next`.
    ///
    /// - [`EngineError::InvalidTransition`] if the pair is not in the
    ///   transition table.
    /// - [`EngineError::ConcurrencyConflict`] if the stored status is no
    ///   longer `cmd.expected`.
    ///
    /// On success exactly one status notification is published after commit.
    pub async fn transition_booking(&self, cmd: TransitionCmd) -> ResultEngine<Booking> {
        if !cmd.expected.can_transition_to(cmd.next) {
            return Err(EngineError::InvalidTransition(format!(
                "{} -> {}",
                cmd.expected, cmd.next
            )));
        }

        let (booking, notification) = self
            .bounded("transition_booking", async {
                with_tx!(self, |db_tx| {
                    let now = Utc::now();
                    let mut update = bookings::Entity::update_many()
                        .col_expr(bookings::Column::Status, Expr::value(cmd.next.as_str()))
                        .col_expr(bookings::Column::UpdatedAt, Expr::value(now));
                    if cmd.next == BookingStatus::PaymentReceived {
                        update = update
                            .col_expr(
                                bookings::Column::PaymentStatus,
                                Expr::value(PaymentStatus::Received.as_str()),
                            )
                            .col_expr(bookings::Column::PaymentReceivedAt, Expr::value(now));
                    }
                    let result = update
                        .filter(bookings::Column::Id.eq(cmd.booking_id.to_string()))
                        .filter(bookings::Column::Status.eq(cmd.expected.as_str()))
                        .exec(&db_tx)
                        .await?;

                    if result.rows_affected == 0 {
                        let current = self.require_booking(&db_tx, cmd.booking_id).await?;
                        return Err(EngineError::ConcurrencyConflict(format!(
                            "expected {}, found {}",
                            cmd.expected, current.status
                        )));
                    }

                    let booking = self.require_booking(&db_tx, cmd.booking_id).await?;
                    let notification = Notification::booking_status(
                        &booking.user_id,
                        booking.id,
                        &booking.puja_name,
                        booking.status,
                        now,
                    );
                    self.enqueue_notification(&db_tx, &notification).await?;
                    Ok((booking, notification))
                })
            })
            .await?;

        tracing::info!(
            booking_id = %booking.id,
            from = %cmd.expected,
            to = %cmd.next,
            "booking transitioned"
        );
        self.deliver(&notification).await;
        Ok(booking)
    }

    /// `pending → confirmed`.
    pub async fn confirm_booking(&self, booking_id: Uuid) -> ResultEngine<Booking> {
        self.transition_booking(TransitionCmd::new(
            booking_id,
            BookingStatus::Pending,
            BookingStatus::Confirmed,
        ))
        .await
    }

    /// `pending → cancelled`. Redeemed coins are not returned automatically,
    /// see [`Engine::refund_redemption`].
    pub async fn cancel_booking(&self, booking_id: Uuid) -> ResultEngine<Booking> {
        self.transition_booking(TransitionCmd::new(
            booking_id,
            BookingStatus::Pending,
            BookingStatus::Cancelled,
        ))
        .await
    }

    /// `confirmed → payment_received`.
    pub async fn mark_payment_received(&self, booking_id: Uuid) -> ResultEngine<Booking> {
        self.transition_booking(TransitionCmd::new(
            booking_id,
            BookingStatus::Confirmed,
            BookingStatus::PaymentReceived,
        ))
        .await
    }

    /// `payment_received → completed`.
    pub async fn complete_booking(&self, booking_id: Uuid) -> ResultEngine<Booking> {
        self.transition_booking(TransitionCmd::new(
            booking_id,
            BookingStatus::PaymentReceived,
            BookingStatus::Completed,
        ))
        .await
    }

    /// Ask the user to review a completed booking.
    ///
    /// No-op (and no second notification) if a review was already requested.
    pub async fn request_review(&self, booking_id: Uuid) -> ResultEngine<Booking> {
        let (booking, notification) = self
            .bounded("request_review", async {
                with_tx!(self, |db_tx| {
                    let booking = self.require_completed(&db_tx, booking_id).await?;
                    if booking.review_requested {
                        return Ok((booking, None));
                    }

                    let now = Utc::now();
                    let result = bookings::Entity::update_many()
                        .col_expr(bookings::Column::ReviewRequested, Expr::value(true))
                        .col_expr(bookings::Column::ReviewRequestedAt, Expr::value(now))
                        .col_expr(bookings::Column::UpdatedAt, Expr::value(now))
                        .filter(bookings::Column::Id.eq(booking_id.to_string()))
                        .filter(bookings::Column::ReviewRequested.eq(false))
                        .exec(&db_tx)
                        .await?;
                    let booking = self.require_booking(&db_tx, booking_id).await?;
                    if result.rows_affected == 0 {
                        return Ok((booking, None));
                    }

                    let notification = Notification::review_request(
                        &booking.user_id,
                        booking.id,
                        &booking.puja_name,
                        now,
                    );
                    self.enqueue_notification(&db_tx, &notification).await?;
                    Ok((booking, Some(notification)))
                })
            })
            .await?;

        if let Some(notification) = &notification {
            self.deliver(notification).await;
        }
        Ok(booking)
    }

    /// Record the review left for a completed booking.
    ///
    /// No-op if the booking already has a review.
    pub async fn submit_review(&self, booking_id: Uuid, review_id: &str) -> ResultEngine<Booking> {
        let review_id = normalize_required_text(review_id, "review id")?;
        self.bounded("submit_review", async {
            with_tx!(self, |db_tx| {
                let booking = self.require_completed(&db_tx, booking_id).await?;
                if booking.has_review {
                    return Ok(booking);
                }

                let now = Utc::now();
                bookings::Entity::update_many()
                    .col_expr(bookings::Column::HasReview, Expr::value(true))
                    .col_expr(bookings::Column::ReviewId, Expr::value(review_id.clone()))
                    .col_expr(bookings::Column::ReviewedAt, Expr::value(now))
                    .col_expr(bookings::Column::UpdatedAt, Expr::value(now))
                    .filter(bookings::Column::Id.eq(booking_id.to_string()))
                    .filter(bookings::Column::HasReview.eq(false))
                    .exec(&db_tx)
                    .await?;
                self.require_booking(&db_tx, booking_id).await
            })
        })
        .await
    }

    pub(in crate::ops) async fn require_booking(
        &self,
        db_tx: &DatabaseTransaction,
        booking_id: Uuid,
    ) -> ResultEngine<Booking> {
        bookings::Entity::find_by_id(booking_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("booking not exists".to_string()))
            .and_then(Booking::try_from)
    }

    async fn require_completed(
        &self,
        db_tx: &DatabaseTransaction,
        booking_id: Uuid,
    ) -> ResultEngine<Booking> {
        let booking = self.require_booking(db_tx, booking_id).await?;
        if booking.status != BookingStatus::Completed {
            return Err(EngineError::InvalidTransition(format!(
                "reviews require a completed booking, found {}",
                booking.status
            )));
        }
        Ok(booking)
    }
}
