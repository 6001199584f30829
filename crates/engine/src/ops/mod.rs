use std::{fmt, future::Future, sync::Arc, time::Duration};

use sea_orm::DatabaseConnection;

use crate::{
    EngineError, NotificationDispatcher, ResultEngine, RetryPolicy, TracingDispatcher,
    util::normalize_required_text,
};

mod bookings;
mod notifications;
mod redemption;
mod transactions;
mod wallets;

pub use bookings::BookingListFilter;
pub use notifications::FlushReport;
pub use transactions::{LedgerCheck, ListOrder};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Tunables for the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineOptions {
    /// Upper bound for a single engine operation, database work included.
    /// When it elapses the open database transaction is dropped (rolled back).
    pub operation_timeout: Duration,
    /// Share of a booking's price that can be paid with coins, in percent.
    pub max_redemption_percent: i64,
    /// Upper bound for a single `publish` call.
    pub notification_timeout: Duration,
    pub notification_retry: RetryPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(10),
            max_redemption_percent: 80,
            notification_timeout: Duration::from_secs(5),
            notification_retry: RetryPolicy::default(),
        }
    }
}

pub struct Engine {
    database: DatabaseConnection,
    dispatcher: Arc<dyn NotificationDispatcher>,
    options: EngineOptions,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Bound `operation` by `operation_timeout`.
    ///
    /// Dropping the future before its commit rolls back the database
    /// transaction it holds.
    async fn bounded<T, F>(&self, operation: &str, fut: F) -> ResultEngine<T>
    where
        F: Future<Output = ResultEngine<T>>,
    {
        match tokio::time::timeout(self.options.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, "engine operation timed out");
                Err(EngineError::Timeout(operation.to_string()))
            }
        }
    }
}

fn normalize_user_id(value: &str) -> ResultEngine<String> {
    normalize_required_text(value, "user id")
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    dispatcher: Option<Arc<dyn NotificationDispatcher>>,
    options: EngineOptions,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Where notifications are published. Defaults to [`TracingDispatcher`].
    pub fn dispatcher(mut self, dispatcher: Arc<dyn NotificationDispatcher>) -> EngineBuilder {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn options(mut self, options: EngineOptions) -> EngineBuilder {
        self.options = options;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if !(0..=100).contains(&self.options.max_redemption_percent) {
            return Err(EngineError::InvalidAmount(
                "max_redemption_percent must be between 0 and 100".to_string(),
            ));
        }
        Ok(Engine {
            database: self.database,
            dispatcher: self
                .dispatcher
                .unwrap_or_else(|| Arc::new(TracingDispatcher)),
            options: self.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{Database, TransactionTrait};

    use crate::TransactionKind;
    use migration::MigratorTrait;

    use super::*;

    #[tokio::test]
    async fn build_rejects_out_of_range_percent() {
        let err = Engine::builder()
            .options(EngineOptions {
                max_redemption_percent: 101,
                ..Default::default()
            })
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn timed_out_operation_rolls_back() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder()
            .database(db)
            .options(EngineOptions {
                operation_timeout: Duration::from_millis(50),
                ..Default::default()
            })
            .build()
            .await
            .unwrap();

        let err = engine
            .bounded("slow_credit", async {
                with_tx!(engine, |db_tx| {
                    let entry =
                        wallets::LedgerEntry::new("alice", TransactionKind::Credit, 10, "bonus")?;
                    engine.apply_entry(&db_tx, &entry).await?;
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                })
            })
            .await
            .unwrap_err();

        assert_eq!(err, EngineError::Timeout("slow_credit".to_string()));
        let wallet = engine.wallet("alice").await.unwrap();
        assert_eq!(wallet.balance, 0);
        assert!(engine.verify_ledger("alice").await.unwrap().is_consistent());
    }
}
