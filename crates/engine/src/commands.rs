//! Command structs for engine operations.
//!
//! These types group parameters for write operations (credit/debit,
//! checkout, transitions, redemption), keeping call sites readable and
//! avoiding long argument lists.

use uuid::Uuid;

use crate::BookingStatus;

/// Add coins to a wallet.
#[derive(Clone, Debug)]
pub struct CreditCmd {
    pub user_id: String,
    pub amount: i64,
    pub reason: String,
    /// Admin authorizing a manual credit.
    pub admin_id: Option<String>,
    pub booking_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
}

impl CreditCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, amount: i64, reason: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            reason: reason.into(),
            admin_id: None,
            booking_id: None,
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn admin_id(mut self, admin_id: impl Into<String>) -> Self {
        self.admin_id = Some(admin_id.into());
        self
    }

    #[must_use]
    pub fn booking_id(mut self, booking_id: Uuid) -> Self {
        self.booking_id = Some(booking_id);
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Remove coins from a wallet.
#[derive(Clone, Debug)]
pub struct DebitCmd {
    pub user_id: String,
    pub amount: i64,
    pub reason: String,
    pub booking_id: Option<Uuid>,
    pub admin_id: Option<String>,
    pub idempotency_key: Option<String>,
}

impl DebitCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, amount: i64, reason: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            reason: reason.into(),
            booking_id: None,
            admin_id: None,
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn booking_id(mut self, booking_id: Uuid) -> Self {
        self.booking_id = Some(booking_id);
        self
    }

    #[must_use]
    pub fn admin_id(mut self, admin_id: impl Into<String>) -> Self {
        self.admin_id = Some(admin_id.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Create a booking at checkout.
#[derive(Clone, Debug)]
pub struct NewBookingCmd {
    pub user_id: String,
    pub puja_id: String,
    pub puja_name: String,
    pub price: i64,
    pub discount_applied: i64,
    /// Coins to redeem against the booking at checkout (0 for none).
    pub coins: i64,
}

impl NewBookingCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        puja_id: impl Into<String>,
        puja_name: impl Into<String>,
        price: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            puja_id: puja_id.into(),
            puja_name: puja_name.into(),
            price,
            discount_applied: 0,
            coins: 0,
        }
    }

    #[must_use]
    pub fn discount(mut self, discount_applied: i64) -> Self {
        self.discount_applied = discount_applied;
        self
    }

    #[must_use]
    pub fn coins(mut self, coins: i64) -> Self {
        self.coins = coins;
        self
    }
}

/// Move a booking from `expected` to `next`.
#[derive(Clone, Debug)]
pub struct TransitionCmd {
    pub booking_id: Uuid,
    /// Status the caller last observed. The transition is rejected with
    /// `ConcurrencyConflict` if the stored status differs.
    pub expected: BookingStatus,
    pub next: BookingStatus,
}

impl TransitionCmd {
    #[must_use]
    pub fn new(booking_id: Uuid, expected: BookingStatus, next: BookingStatus) -> Self {
        Self {
            booking_id,
            expected,
            next,
        }
    }
}

/// Redeem wallet coins against a pending booking.
#[derive(Clone, Debug)]
pub struct RedeemCoinsCmd {
    pub booking_id: Uuid,
    pub user_id: String,
    pub coins: i64,
}

impl RedeemCoinsCmd {
    #[must_use]
    pub fn new(booking_id: Uuid, user_id: impl Into<String>, coins: i64) -> Self {
        Self {
            booking_id,
            user_id: user_id.into(),
            coins,
        }
    }
}
