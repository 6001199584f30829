use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*,
    sea_query::{Expr, OnConflict},
};

use crate::{
    CreditCmd, DebitCmd, EngineError, Notification, ResultEngine, Transaction, TransactionKind,
    Wallet,
    util::{normalize_optional_text, normalize_required_text, require_positive},
    wallets,
};

use super::{Engine, normalize_user_id, with_tx};

/// A validated ledger mutation, ready to be applied inside a DB transaction.
#[derive(Clone, Debug)]
pub(in crate::ops) struct LedgerEntry {
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount: i64,
    pub reason: String,
    pub admin_id: Option<String>,
    pub booking_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
}

impl LedgerEntry {
    pub(in crate::ops) fn new(
        user_id: &str,
        kind: TransactionKind,
        amount: i64,
        reason: &str,
    ) -> ResultEngine<Self> {
        require_positive(amount, "amount")?;
        Ok(Self {
            user_id: normalize_user_id(user_id)?,
            kind,
            amount,
            reason: normalize_required_text(reason, "reason")?,
            admin_id: None,
            booking_id: None,
            idempotency_key: None,
        })
    }

    fn from_credit(cmd: &CreditCmd) -> ResultEngine<Self> {
        let mut entry = Self::new(&cmd.user_id, TransactionKind::Credit, cmd.amount, &cmd.reason)?;
        entry.admin_id = normalize_optional_text(cmd.admin_id.as_deref());
        entry.booking_id = cmd.booking_id;
        entry.idempotency_key = caller_key(cmd.idempotency_key.as_deref())?;
        Ok(entry)
    }

    fn from_debit(cmd: &DebitCmd) -> ResultEngine<Self> {
        let mut entry = Self::new(&cmd.user_id, TransactionKind::Debit, cmd.amount, &cmd.reason)?;
        entry.admin_id = normalize_optional_text(cmd.admin_id.as_deref());
        entry.booking_id = cmd.booking_id;
        entry.idempotency_key = caller_key(cmd.idempotency_key.as_deref())?;
        Ok(entry)
    }
}

/// Prefixes of keys the engine derives for booking redemptions and refunds.
const RESERVED_KEY_PREFIXES: [&str; 2] = ["redeem:", "refund:"];

fn caller_key(key: Option<&str>) -> ResultEngine<Option<String>> {
    let key = normalize_optional_text(key);
    if let Some(key) = key.as_deref()
        && RESERVED_KEY_PREFIXES
            .iter()
            .any(|prefix| key.starts_with(prefix))
    {
        return Err(EngineError::InvalidAmount(format!(
            "idempotency key '{key}' is reserved"
        )));
    }
    Ok(key)
}

/// Outcome of applying a [`LedgerEntry`].
#[derive(Clone, Debug)]
pub(in crate::ops) struct Applied {
    pub transaction: Transaction,
    /// Set for admin-initiated entries; already stored in the outbox.
    pub notification: Option<Notification>,
}

impl Engine {
    /// Return the user's wallet, creating an empty one on first access.
    pub async fn wallet(&self, user_id: &str) -> ResultEngine<Wallet> {
        let user_id = normalize_user_id(user_id)?;
        self.bounded("wallet", async {
            with_tx!(self, |db_tx| { self.ensure_wallet(&db_tx, &user_id).await })
        })
        .await
    }

    /// Add coins to a wallet and append one `credit` transaction.
    ///
    /// Returns the new balance. With an idempotency key, a repeated call
    /// returns the balance recorded by the first one without crediting again.
    pub async fn credit(&self, cmd: CreditCmd) -> ResultEngine<i64> {
        let entry = LedgerEntry::from_credit(&cmd)?;
        self.apply_and_notify("credit", entry).await
    }

    /// Remove coins from a wallet and append one `debit` transaction.
    ///
    /// Fails with [`EngineError::InsufficientBalance`] when `amount` exceeds
    /// the balance; nothing is written in that case.
    pub async fn debit(&self, cmd: DebitCmd) -> ResultEngine<i64> {
        let entry = LedgerEntry::from_debit(&cmd)?;
        self.apply_and_notify("debit", entry).await
    }

    async fn apply_and_notify(&self, operation: &str, entry: LedgerEntry) -> ResultEngine<i64> {
        let applied = self
            .bounded(operation, async {
                with_tx!(self, |db_tx| { self.apply_entry(&db_tx, &entry).await })
            })
            .await?;

        tracing::debug!(
            user_id = %applied.transaction.user_id,
            kind = applied.transaction.kind.as_str(),
            amount = applied.transaction.amount,
            balance = applied.transaction.balance_after,
            "wallet updated"
        );

        if let Some(notification) = &applied.notification {
            self.deliver(notification).await;
        }
        Ok(applied.transaction.balance_after)
    }

    pub(in crate::ops) async fn ensure_wallet(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Wallet> {
        if let Some(model) = wallets::Entity::find_by_id(user_id.to_string())
            .one(db_tx)
            .await?
        {
            return Ok(model.into());
        }

        let wallet = Wallet::new(user_id.to_string(), Utc::now());
        wallets::Entity::insert(wallets::ActiveModel::from(&wallet))
            .on_conflict(
                OnConflict::column(wallets::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db_tx)
            .await?;

        self.require_wallet(db_tx, user_id).await
    }

    async fn require_wallet(&self, db_tx: &DatabaseTransaction, user_id: &str) -> ResultEngine<Wallet> {
        wallets::Entity::find_by_id(user_id.to_string())
            .one(db_tx)
            .await?
            .map(Wallet::from)
            .ok_or_else(|| EngineError::KeyNotFound("wallet not exists".to_string()))
    }

    /// Apply one ledger entry: atomic balance update plus log append.
    ///
    /// Must run inside `db_tx`; the caller commits. Balance changes are
    /// expressed as `balance = balance ± amount` so concurrent writers on the
    /// same wallet never lose updates, and debits are guarded by
    /// `balance >= amount` in the same statement.
    pub(in crate::ops) async fn apply_entry(
        &self,
        db_tx: &DatabaseTransaction,
        entry: &LedgerEntry,
    ) -> ResultEngine<Applied> {
        let wallet = self.ensure_wallet(db_tx, &entry.user_id).await?;

        if let Some(booking_id) = entry.booking_id {
            let booking = self.require_booking(db_tx, booking_id).await?;
            if booking.user_id != entry.user_id {
                return Err(EngineError::KeyNotFound("booking not exists".to_string()));
            }
        }

        if let Some(key) = entry.idempotency_key.as_deref()
            && let Some(existing) = self
                .find_transaction_by_key(db_tx, &entry.user_id, key)
                .await?
        {
            if existing.kind != entry.kind || existing.amount != entry.amount {
                return Err(EngineError::InvalidAmount(format!(
                    "idempotency key '{key}' was used for a different operation"
                )));
            }
            return Ok(Applied {
                transaction: existing,
                notification: None,
            });
        }

        let overflows = match entry.kind {
            TransactionKind::Credit => {
                wallet.balance.checked_add(entry.amount).is_none()
                    || wallet.total_earned.checked_add(entry.amount).is_none()
            }
            TransactionKind::Debit => wallet.total_spent.checked_add(entry.amount).is_none(),
        };
        if overflows {
            return Err(EngineError::InvalidAmount(format!(
                "amount {} overflows the wallet of {}",
                entry.amount, entry.user_id
            )));
        }

        let now = Utc::now();
        let update = match entry.kind {
            TransactionKind::Credit => wallets::Entity::update_many()
                .col_expr(
                    wallets::Column::Balance,
                    Expr::col(wallets::Column::Balance).add(entry.amount),
                )
                .col_expr(
                    wallets::Column::TotalEarned,
                    Expr::col(wallets::Column::TotalEarned).add(entry.amount),
                )
                .col_expr(wallets::Column::UpdatedAt, Expr::value(now))
                .filter(wallets::Column::UserId.eq(entry.user_id.clone())),
            TransactionKind::Debit => wallets::Entity::update_many()
                .col_expr(
                    wallets::Column::Balance,
                    Expr::col(wallets::Column::Balance).sub(entry.amount),
                )
                .col_expr(
                    wallets::Column::TotalSpent,
                    Expr::col(wallets::Column::TotalSpent).add(entry.amount),
                )
                .col_expr(wallets::Column::UpdatedAt, Expr::value(now))
                .filter(wallets::Column::UserId.eq(entry.user_id.clone()))
                .filter(wallets::Column::Balance.gte(entry.amount)),
        };
        let result = update.exec(db_tx).await?;
        if result.rows_affected == 0 {
            return Err(EngineError::InsufficientBalance(entry.user_id.clone()));
        }

        let wallet = self.require_wallet(db_tx, &entry.user_id).await?;

        let mut tx = Transaction::new(
            entry.user_id.clone(),
            entry.kind,
            entry.amount,
            entry.reason.clone(),
            now,
        )?;
        tx.admin_id = entry.admin_id.clone();
        tx.booking_id = entry.booking_id;
        tx.idempotency_key = entry.idempotency_key.clone();
        tx.balance_after = wallet.balance;
        let transaction = self.append_transaction(db_tx, tx).await?;

        let notification = match entry.admin_id {
            Some(_) => {
                let notification = Notification::wallet_change(
                    &transaction.user_id,
                    transaction.id,
                    transaction.kind,
                    transaction.amount,
                    transaction.balance_after,
                    &transaction.reason,
                    now,
                );
                self.enqueue_notification(db_tx, &notification).await?;
                Some(notification)
            }
            None => None,
        };

        Ok(Applied {
            transaction,
            notification,
        })
    }
}
