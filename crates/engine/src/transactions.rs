//! Ledger primitives.
//!
//! A `Transaction` is an immutable record of one credit or debit applied to a
//! user's wallet. Records are only ever inserted.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    util::{corrupt_value, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    /// Sign applied to `amount` when replaying the ledger.
    pub fn signed(self, amount: i64) -> i64 {
        match self {
            Self::Credit => amount,
            Self::Debit => -amount,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            other => Err(corrupt_value(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// Transactions are written once they are final, so `Completed` is the only
/// status the ledger stores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Completed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "completed" => Ok(Self::Completed),
            other => Err(corrupt_value(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Position in the ledger. Assigned by the database on append, `0` until
    /// then.
    pub seq: i64,
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount: i64,
    pub reason: String,
    pub admin_id: Option<String>,
    pub booking_id: Option<Uuid>,
    /// Wallet balance right after this transaction was applied.
    pub balance_after: i64,
    pub idempotency_key: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user_id: String,
        kind: TransactionKind,
        amount: i64,
        reason: String,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount <= 0 {
            return Err(EngineError::InvalidAmount("amount must be > 0".to_string()));
        }
        if reason.trim().is_empty() {
            return Err(EngineError::InvalidAmount(
                "reason must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            seq: 0,
            user_id,
            kind,
            amount,
            reason,
            admin_id: None,
            booking_id: None,
            balance_after: 0,
            idempotency_key: None,
            status: TransactionStatus::Completed,
            created_at,
        })
    }

    /// Amount with the sign of its effect on the balance.
    pub fn signed_amount(&self) -> i64 {
        self.kind.signed(self.amount)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallet_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub seq: i64,
    #[sea_orm(unique)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount: i64,
    pub reason: String,
    pub admin_id: Option<String>,
    pub booking_id: Option<String>,
    pub balance_after: i64,
    pub idempotency_key: Option<String>,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::UserId",
        to = "super::wallets::Column::UserId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Wallets,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            seq: ActiveValue::NotSet,
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount: ActiveValue::Set(tx.amount),
            reason: ActiveValue::Set(tx.reason.clone()),
            admin_id: ActiveValue::Set(tx.admin_id.clone()),
            booking_id: ActiveValue::Set(tx.booking_id.map(|id| id.to_string())),
            balance_after: ActiveValue::Set(tx.balance_after),
            idempotency_key: ActiveValue::Set(tx.idempotency_key.clone()),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            seq: model.seq,
            user_id: model.user_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: model.amount,
            reason: model.reason,
            admin_id: model.admin_id,
            booking_id: model
                .booking_id
                .as_deref()
                .map(|id| parse_uuid(id, "booking"))
                .transpose()?,
            balance_after: model.balance_after,
            idempotency_key: model.idempotency_key,
            status: TransactionStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_amount() {
        let err = Transaction::new(
            "alice".to_string(),
            TransactionKind::Credit,
            0,
            "promo".to_string(),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidAmount("amount must be > 0".to_string())
        );
    }

    #[test]
    fn rejects_blank_reason() {
        let err = Transaction::new(
            "alice".to_string(),
            TransactionKind::Debit,
            10,
            "   ".to_string(),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidAmount("reason must not be empty".to_string())
        );
    }

    #[test]
    fn signed_amount_follows_kind() {
        let credit = Transaction::new(
            "alice".to_string(),
            TransactionKind::Credit,
            100,
            "promo".to_string(),
            Utc::now(),
        )
        .unwrap();
        let debit = Transaction::new(
            "alice".to_string(),
            TransactionKind::Debit,
            40,
            "redeem".to_string(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(credit.signed_amount() + debit.signed_amount(), 60);
        assert_eq!(credit.status, TransactionStatus::Completed);
    }

    #[test]
    fn kind_round_trips_through_storage_string() {
        for kind in [TransactionKind::Credit, TransactionKind::Debit] {
            assert_eq!(TransactionKind::try_from(kind.as_str()).unwrap(), kind);
        }
        assert!(matches!(
            TransactionKind::try_from("refund"),
            Err(EngineError::Database(_))
        ));
    }
}
