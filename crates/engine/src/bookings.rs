//! Bookings and their status lifecycle.
//!
//! ```text
//! pending ──► confirmed ──► payment_received ──► completed
//!    │
//!    └──────► cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal. The transition table is owned by
//! [`BookingStatus::can_transition_to`]; callers never compare status strings.

use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError,
    util::{corrupt_value, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    PaymentReceived,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::PaymentReceived,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::PaymentReceived => "payment_received",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::PaymentReceived)
                | (Self::PaymentReceived, Self::Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Human readable label used in notifications.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::PaymentReceived => "payment received",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BookingStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "payment_received" => Ok(Self::PaymentReceived),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(corrupt_value(format!(
                "invalid booking status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Received,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Received => "received",
        }
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "unpaid" => Ok(Self::Unpaid),
            "received" => Ok(Self::Received),
            other => Err(corrupt_value(format!(
                "invalid payment status: {other}"
            ))),
        }
    }
}

/// A scheduled puja order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: String,
    pub status: BookingStatus,
    pub puja_id: String,
    pub puja_name: String,
    pub price: i64,
    /// Discount from mechanisms other than coins (coupons, offers).
    pub discount_applied: i64,
    pub coins_redeemed: i64,
    pub final_price: i64,
    pub redemption_transaction_id: Option<Uuid>,
    pub payment_status: PaymentStatus,
    pub review_requested: bool,
    pub has_review: bool,
    pub review_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payment_received_at: Option<DateTime<Utc>>,
    pub review_requested_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn new(
        user_id: String,
        puja_id: String,
        puja_name: String,
        price: i64,
        discount_applied: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        if price <= 0 {
            return Err(EngineError::InvalidAmount("price must be > 0".to_string()));
        }
        if discount_applied < 0 || discount_applied > price {
            return Err(EngineError::InvalidAmount(
                "discount must be between 0 and price".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            status: BookingStatus::Pending,
            puja_id,
            puja_name,
            price,
            discount_applied,
            coins_redeemed: 0,
            final_price: price - discount_applied,
            redemption_transaction_id: None,
            payment_status: PaymentStatus::Unpaid,
            review_requested: false,
            has_review: false,
            review_id: None,
            created_at: now,
            updated_at: now,
            payment_received_at: None,
            review_requested_at: None,
            reviewed_at: None,
        })
    }

    /// Amount still payable after non-coin discounts.
    pub fn payable_before_coins(&self) -> i64 {
        self.price - self.discount_applied
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub puja_id: String,
    pub puja_name: String,
    pub price: i64,
    pub discount_applied: i64,
    pub coins_redeemed: i64,
    pub final_price: i64,
    pub redemption_transaction_id: Option<String>,
    pub payment_status: String,
    pub review_requested: bool,
    pub has_review: bool,
    pub review_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub payment_received_at: Option<DateTimeUtc>,
    pub review_requested_at: Option<DateTimeUtc>,
    pub reviewed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Booking> for ActiveModel {
    fn from(value: &Booking) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.clone()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            puja_id: ActiveValue::Set(value.puja_id.clone()),
            puja_name: ActiveValue::Set(value.puja_name.clone()),
            price: ActiveValue::Set(value.price),
            discount_applied: ActiveValue::Set(value.discount_applied),
            coins_redeemed: ActiveValue::Set(value.coins_redeemed),
            final_price: ActiveValue::Set(value.final_price),
            redemption_transaction_id: ActiveValue::Set(
                value.redemption_transaction_id.map(|id| id.to_string()),
            ),
            payment_status: ActiveValue::Set(value.payment_status.as_str().to_string()),
            review_requested: ActiveValue::Set(value.review_requested),
            has_review: ActiveValue::Set(value.has_review),
            review_id: ActiveValue::Set(value.review_id.clone()),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
            payment_received_at: ActiveValue::Set(value.payment_received_at),
            review_requested_at: ActiveValue::Set(value.review_requested_at),
            reviewed_at: ActiveValue::Set(value.reviewed_at),
        }
    }
}

impl TryFrom<Model> for Booking {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "booking")?,
            user_id: model.user_id,
            status: BookingStatus::try_from(model.status.as_str())?,
            puja_id: model.puja_id,
            puja_name: model.puja_name,
            price: model.price,
            discount_applied: model.discount_applied,
            coins_redeemed: model.coins_redeemed,
            final_price: model.final_price,
            redemption_transaction_id: model
                .redemption_transaction_id
                .as_deref()
                .map(|id| parse_uuid(id, "transaction"))
                .transpose()?,
            payment_status: PaymentStatus::try_from(model.payment_status.as_str())?,
            review_requested: model.review_requested,
            has_review: model.has_review,
            review_id: model.review_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
            payment_received_at: model.payment_received_at,
            review_requested_at: model.review_requested_at,
            reviewed_at: model.reviewed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_transitions() {
        use BookingStatus::*;

        let allowed = [
            (Pending, Confirmed),
            (Pending, Cancelled),
            (Confirmed, PaymentReceived),
            (PaymentReceived, Completed),
        ];
        for from in BookingStatus::ALL {
            for to in BookingStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for status in [BookingStatus::Completed, BookingStatus::Cancelled] {
            assert!(status.is_terminal());
            assert!(
                BookingStatus::ALL
                    .iter()
                    .all(|next| !status.can_transition_to(*next))
            );
        }
    }

    #[test]
    fn confirmed_cannot_be_cancelled() {
        assert!(!BookingStatus::Confirmed.can_transition_to(BookingStatus::Cancelled));
    }

    #[test]
    fn status_parses_storage_strings() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::try_from(status.as_str()).unwrap(), status);
        }
        assert!(matches!(
            BookingStatus::try_from("shipped"),
            Err(EngineError::Database(_))
        ));
        assert!(matches!(
            PaymentStatus::try_from("refunded"),
            Err(EngineError::Database(_))
        ));
    }

    #[test]
    fn new_booking_starts_pending_and_unpaid() {
        let booking = Booking::new(
            "alice".to_string(),
            "puja-1".to_string(),
            "Ganesh Puja".to_string(),
            1000,
            100,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Unpaid);
        assert_eq!(booking.final_price, 900);
        assert_eq!(booking.payable_before_coins(), 900);
        assert!(!booking.review_requested);
    }

    #[test]
    fn new_booking_rejects_discount_above_price() {
        let err = Booking::new(
            "alice".to_string(),
            "puja-1".to_string(),
            "Ganesh Puja".to_string(),
            100,
            101,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }
}
