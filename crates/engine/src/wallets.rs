//! The module contains `Wallet` struct and its implementation.

use chrono::{DateTime, Utc};

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

/// A coin wallet.
///
/// Each user owns exactly one wallet, created lazily the first time it is
/// read or mutated. The balance is denormalized from the transaction log and
/// always equals `total_earned - total_spent`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: String,
    pub balance: i64,
    pub total_earned: i64,
    pub total_spent: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// An empty wallet for `user_id`.
    pub fn new(user_id: String, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            balance: 0,
            total_earned: 0,
            total_spent: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` when the denormalized totals agree with the balance.
    pub fn is_consistent(&self) -> bool {
        self.balance >= 0
            && self.total_earned >= 0
            && self.total_spent >= 0
            && self.balance == self.total_earned - self.total_spent
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub balance: i64,
    pub total_earned: i64,
    pub total_spent: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            user_id: ActiveValue::Set(value.user_id.clone()),
            balance: ActiveValue::Set(value.balance),
            total_earned: ActiveValue::Set(value.total_earned),
            total_spent: ActiveValue::Set(value.total_spent),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl From<Model> for Wallet {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            balance: model.balance,
            total_earned: model.total_earned,
            total_spent: model.total_spent,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn wallet() -> Wallet {
        Wallet::new(String::from("alice"), Utc.timestamp_opt(0, 0).unwrap())
    }

    #[test]
    fn new_wallet_is_empty() {
        let wallet = wallet();

        assert_eq!(wallet.user_id, "alice".to_string());
        assert_eq!(wallet.balance, 0);
        assert_eq!(wallet.total_earned, 0);
        assert_eq!(wallet.total_spent, 0);
        assert_eq!(wallet.created_at, wallet.updated_at);
        assert!(wallet.is_consistent());
    }

    #[test]
    fn totals_must_match_balance() {
        let mut wallet = wallet();
        wallet.total_earned = 100;
        wallet.total_spent = 40;
        wallet.balance = 60;
        assert!(wallet.is_consistent());

        wallet.balance = 61;
        assert!(!wallet.is_consistent());
    }

    #[test]
    fn negative_balance_is_inconsistent() {
        let mut wallet = wallet();
        wallet.total_spent = 10;
        wallet.balance = -10;
        assert!(!wallet.is_consistent());
    }
}
