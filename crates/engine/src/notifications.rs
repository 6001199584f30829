//! Notifications emitted by the engine.
//!
//! Notifications are written to an outbox table in the same database
//! transaction as the mutation that causes them, then handed to a
//! [`NotificationDispatcher`] after commit. Delivery is at-least-once: the
//! `idempotency_key` is stable across retries so consumers can deduplicate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    BookingStatus, EngineError,
    util::{corrupt_value, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingStatus,
    ReviewRequest,
    WalletCredit,
    WalletDebit,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BookingStatus => "booking_status",
            Self::ReviewRequest => "review_request",
            Self::WalletCredit => "wallet_credit",
            Self::WalletDebit => "wallet_debit",
        }
    }
}

impl TryFrom<&str> for NotificationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "booking_status" => Ok(Self::BookingStatus),
            "review_request" => Ok(Self::ReviewRequest),
            "wallet_credit" => Ok(Self::WalletCredit),
            "wallet_debit" => Ok(Self::WalletDebit),
            other => Err(corrupt_value(format!(
                "invalid notification kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    /// Booking id or transaction id the notification is about.
    pub ref_id: String,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn new(
        user_id: &str,
        title: String,
        message: String,
        kind: NotificationKind,
        ref_id: String,
        idempotency_key: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title,
            message,
            kind,
            ref_id,
            idempotency_key,
            created_at,
        }
    }

    /// Booking moved to `status`.
    pub fn booking_status(
        user_id: &str,
        booking_id: Uuid,
        puja_name: &str,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Self {
        let title = match status {
            BookingStatus::Pending => "Booking received",
            BookingStatus::Confirmed => "Booking confirmed",
            BookingStatus::PaymentReceived => "Payment received",
            BookingStatus::Completed => "Puja completed",
            BookingStatus::Cancelled => "Booking cancelled",
        };
        Self::new(
            user_id,
            title.to_string(),
            format!("Your booking for {puja_name} is now {}.", status.label()),
            NotificationKind::BookingStatus,
            booking_id.to_string(),
            format!("booking:{booking_id}:status:{}", status.as_str()),
            now,
        )
    }

    pub fn review_request(
        user_id: &str,
        booking_id: Uuid,
        puja_name: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            "How was your puja?".to_string(),
            format!("Please share a review of {puja_name}."),
            NotificationKind::ReviewRequest,
            booking_id.to_string(),
            format!("booking:{booking_id}:review_request"),
            now,
        )
    }

    /// Admin-initiated wallet change confirmation.
    pub fn wallet_change(
        user_id: &str,
        transaction_id: Uuid,
        kind: crate::TransactionKind,
        amount: i64,
        balance_after: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let (title, verb, kind) = match kind {
            crate::TransactionKind::Credit => {
                ("Coins credited", "credited to", NotificationKind::WalletCredit)
            }
            crate::TransactionKind::Debit => {
                ("Coins debited", "debited from", NotificationKind::WalletDebit)
            }
        };
        Self::new(
            user_id,
            title.to_string(),
            format!(
                "{amount} coins were {verb} your wallet ({reason}). Balance: {balance_after}."
            ),
            kind,
            transaction_id.to_string(),
            format!("wallet:{transaction_id}"),
            now,
        )
    }
}

/// Error returned by a dispatcher. Only ever logged by the engine.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct DispatchError(pub String);

/// Fire-and-forget publisher for user facing notifications.
///
/// Implementations must tolerate receiving the same notification more than
/// once (same `idempotency_key`).
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn publish(&self, notification: &Notification) -> Result<(), DispatchError>;
}

/// Dispatcher that only logs. Used when no delivery channel is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDispatcher;

#[async_trait]
impl NotificationDispatcher for TracingDispatcher {
    async fn publish(&self, notification: &Notification) -> Result<(), DispatchError> {
        tracing::info!(
            user_id = %notification.user_id,
            kind = notification.kind.as_str(),
            ref_id = %notification.ref_id,
            "{}: {}",
            notification.title,
            notification.message
        );
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub ref_id: String,
    #[sea_orm(unique)]
    pub idempotency_key: String,
    pub attempts: i32,
    pub created_at: DateTimeUtc,
    pub delivered_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Notification> for ActiveModel {
    fn from(value: &Notification) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.clone()),
            title: ActiveValue::Set(value.title.clone()),
            message: ActiveValue::Set(value.message.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            ref_id: ActiveValue::Set(value.ref_id.clone()),
            idempotency_key: ActiveValue::Set(value.idempotency_key.clone()),
            attempts: ActiveValue::Set(0),
            created_at: ActiveValue::Set(value.created_at),
            delivered_at: ActiveValue::Set(None),
        }
    }
}

impl TryFrom<Model> for Notification {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "notification")?,
            user_id: model.user_id,
            title: model.title,
            message: model.message,
            kind: NotificationKind::try_from(model.kind.as_str())?,
            ref_id: model.ref_id,
            idempotency_key: model.idempotency_key,
            created_at: model.created_at,
        })
    }
}
