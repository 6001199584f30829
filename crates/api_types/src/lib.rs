use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod wallet {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletView {
        pub user_id: String,
        pub balance: i64,
        pub total_earned: i64,
        pub total_spent: i64,
        pub updated_at: DateTime<Utc>,
    }

    /// Request body for an admin credit or debit.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletAdjust {
        /// Coins, must be > 0. The route defines the direction.
        pub amount: i64,
        pub reason: String,
        pub booking_id: Option<Uuid>,
        /// Optional idempotency key for safely retrying the same request.
        pub idempotency_key: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceResponse {
        pub balance: i64,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Credit,
        Debit,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ListOrder {
        #[default]
        NewestFirst,
        OldestFirst,
    }

    /// Query string of `GET /wallet/transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        pub cursor: Option<String>,
        pub order: Option<ListOrder>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: TransactionKind,
        pub amount: i64,
        pub reason: String,
        pub booking_id: Option<Uuid>,
        pub balance_after: i64,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        /// Opaque cursor for fetching the next page.
        pub next_cursor: Option<String>,
    }
}

pub mod booking {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum BookingStatus {
        Pending,
        Confirmed,
        PaymentReceived,
        Completed,
        Cancelled,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentStatus {
        Unpaid,
        Received,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BookingNew {
        pub puja_id: String,
        pub puja_name: String,
        pub price: i64,
        pub discount_applied: Option<i64>,
        /// Coins to redeem at checkout.
        pub coins: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BookingView {
        pub id: Uuid,
        pub user_id: String,
        pub status: BookingStatus,
        pub puja_id: String,
        pub puja_name: String,
        pub price: i64,
        pub discount_applied: i64,
        pub coins_redeemed: i64,
        pub final_price: i64,
        pub redemption_transaction_id: Option<Uuid>,
        pub payment_status: PaymentStatus,
        pub review_requested: bool,
        pub has_review: bool,
        pub review_id: Option<String>,
        pub created_at: DateTime<Utc>,
        pub payment_received_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BookingListResponse {
        pub bookings: Vec<BookingView>,
    }

    /// Query string of `GET /admin/bookings`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BookingList {
        pub status: Option<BookingStatus>,
        pub user_id: Option<String>,
        pub limit: Option<u64>,
    }

    /// Request body for an admin status change.
    ///
    /// `expected` is the status the caller last saw; the server answers 409
    /// when the booking moved in the meantime.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BookingTransition {
        pub expected: BookingStatus,
        pub next: BookingStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RedeemCoins {
        pub coins: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReviewSubmit {
        pub review_id: String,
    }
}

pub mod notification {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct Flush {
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FlushResponse {
        pub delivered: usize,
        pub failed: usize,
    }
}
