use base64::Engine as _;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};

use crate::{EngineError, ResultEngine, Transaction, Wallet, transactions, wallets};

use super::{Engine, normalize_user_id, with_tx};

/// Ordering of a ledger listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Result of replaying a user's ledger against the stored wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerCheck {
    pub wallet: Wallet,
    pub transaction_count: u64,
    /// Signed sum of every transaction of the user.
    pub replayed_balance: i64,
    pub replayed_earned: i64,
    pub replayed_spent: i64,
}

impl LedgerCheck {
    /// `true` when the ledger and the denormalized wallet agree.
    pub fn is_consistent(&self) -> bool {
        self.wallet.is_consistent()
            && self.replayed_balance == self.wallet.balance
            && self.replayed_earned == self.wallet.total_earned
            && self.replayed_spent == self.wallet.total_spent
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    seq: i64,
}

impl TransactionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))
    }
}

impl Engine {
    /// Append an immutable ledger record. The only write path of the log.
    pub(in crate::ops) async fn append_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        tx: Transaction,
    ) -> ResultEngine<Transaction> {
        let model = transactions::ActiveModel::from(&tx).insert(db_tx).await?;
        Transaction::try_from(model)
    }

    pub(in crate::ops) async fn find_transaction_by_key(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        key: &str,
    ) -> ResultEngine<Option<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id.to_string()))
            .filter(transactions::Column::IdempotencyKey.eq(key.to_string()))
            .one(db_tx)
            .await?
            .map(Transaction::try_from)
            .transpose()
    }

    /// Returns a single ledger record.
    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        self.bounded("transaction", async {
            with_tx!(self, |db_tx| {
                transactions::Entity::find()
                    .filter(transactions::Column::Id.eq(transaction_id.to_string()))
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
                    .and_then(Transaction::try_from)
            })
        })
        .await
    }

    /// Lists a user's transactions.
    ///
    /// `limit = None` returns the whole history.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        order: ListOrder,
        limit: Option<u64>,
    ) -> ResultEngine<Vec<Transaction>> {
        match limit {
            Some(limit) => {
                let (items, _next) = self
                    .list_transactions_page(user_id, order, limit, None)
                    .await?;
                Ok(items)
            }
            None => {
                let mut items = Vec::new();
                let mut cursor: Option<String> = None;
                loop {
                    let (page, next) = self
                        .list_transactions_page(user_id, order, 500, cursor.as_deref())
                        .await?;
                    items.extend(page);
                    match next {
                        Some(next) => cursor = Some(next),
                        None => break,
                    }
                }
                Ok(items)
            }
        }
    }

    /// Lists a user's transactions with cursor-based pagination.
    ///
    /// The cursor is opaque and stays valid while new records are appended:
    /// a listing restarted from any cursor continues where it stopped.
    pub async fn list_transactions_page(
        &self,
        user_id: &str,
        order: ListOrder,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        if limit == 0 {
            return Err(EngineError::InvalidAmount("limit must be > 0".to_string()));
        }
        let user_id = normalize_user_id(user_id)?;
        let cursor = cursor.map(TransactionsCursor::decode).transpose()?;

        self.bounded("list_transactions", async {
            with_tx!(self, |db_tx| {
                let query = transactions::Entity::find()
                    .filter(transactions::Column::UserId.eq(user_id.clone()));
                let query = match (order, &cursor) {
                    (ListOrder::NewestFirst, Some(cursor)) => {
                        query.filter(transactions::Column::Seq.lt(cursor.seq))
                    }
                    (ListOrder::OldestFirst, Some(cursor)) => {
                        query.filter(transactions::Column::Seq.gt(cursor.seq))
                    }
                    (_, None) => query,
                };
                let query = match order {
                    ListOrder::NewestFirst => query.order_by_desc(transactions::Column::Seq),
                    ListOrder::OldestFirst => query.order_by_asc(transactions::Column::Seq),
                };

                let mut models = query
                    .limit(limit.saturating_add(1))
                    .all(&db_tx)
                    .await?;
                let has_more = models.len() as u64 > limit;
                if has_more {
                    models.truncate(limit as usize);
                }

                let items = models
                    .into_iter()
                    .map(Transaction::try_from)
                    .collect::<ResultEngine<Vec<_>>>()?;
                let next = match (has_more, items.last()) {
                    (true, Some(last)) => Some(TransactionsCursor { seq: last.seq }.encode()?),
                    _ => None,
                };
                Ok((items, next))
            })
        })
        .await
    }

    /// Transactions linked to a booking (redemption and refunds), oldest first.
    pub async fn transactions_for_booking(&self, booking_id: Uuid) -> ResultEngine<Vec<Transaction>> {
        self.bounded("transactions_for_booking", async {
            with_tx!(self, |db_tx| {
                transactions::Entity::find()
                    .filter(transactions::Column::BookingId.eq(booking_id.to_string()))
                    .order_by_asc(transactions::Column::Seq)
                    .all(&db_tx)
                    .await?
                    .into_iter()
                    .map(Transaction::try_from)
                    .collect::<ResultEngine<Vec<_>>>()
            })
        })
        .await
    }

    /// Replays the user's whole ledger and compares it with the wallet.
    ///
    /// Read only: a user without a wallet is reported as an empty wallet.
    pub async fn verify_ledger(&self, user_id: &str) -> ResultEngine<LedgerCheck> {
        let user_id = normalize_user_id(user_id)?;
        self.bounded("verify_ledger", async {
            with_tx!(self, |db_tx| {
                let wallet = wallets::Entity::find_by_id(user_id.clone())
                    .one(&db_tx)
                    .await?
                    .map(Wallet::from)
                    .unwrap_or_else(|| Wallet::new(user_id.clone(), chrono::Utc::now()));

                let models = transactions::Entity::find()
                    .filter(transactions::Column::UserId.eq(user_id.clone()))
                    .order_by_asc(transactions::Column::Seq)
                    .all(&db_tx)
                    .await?;

                let mut check = LedgerCheck {
                    wallet,
                    transaction_count: 0,
                    replayed_balance: 0,
                    replayed_earned: 0,
                    replayed_spent: 0,
                };
                for model in models {
                    let tx = Transaction::try_from(model)?;
                    check.transaction_count += 1;
                    check.replayed_balance += tx.signed_amount();
                    match tx.kind {
                        crate::TransactionKind::Credit => check.replayed_earned += tx.amount,
                        crate::TransactionKind::Debit => check.replayed_spent += tx.amount,
                    }
                }
                Ok(check)
            })
        })
        .await
    }
}
