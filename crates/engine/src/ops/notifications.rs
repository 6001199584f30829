use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::{Expr, OnConflict},
};

use crate::{DispatchError, Notification, ResultEngine, notifications, retry::retry_with_backoff};

use super::{Engine, with_tx};

/// Outcome of [`Engine::flush_notifications`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub failed: usize,
}

impl Engine {
    /// Store `notification` in the outbox as part of `db_tx`.
    ///
    /// Returns `false` when a notification with the same idempotency key is
    /// already stored; the outbox never holds the same event twice.
    pub(in crate::ops) async fn enqueue_notification(
        &self,
        db_tx: &DatabaseTransaction,
        notification: &Notification,
    ) -> ResultEngine<bool> {
        let inserted = notifications::Entity::insert(notifications::ActiveModel::from(notification))
            .on_conflict(
                OnConflict::column(notifications::Column::IdempotencyKey)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db_tx)
            .await?;
        Ok(inserted > 0)
    }

    /// Publish a committed notification, retrying with backoff.
    ///
    /// Never fails: errors are logged and the outbox row stays pending for
    /// [`Engine::flush_notifications`].
    pub(in crate::ops) async fn deliver(&self, notification: &Notification) -> bool {
        let timeout = self.options.notification_timeout;
        let mut attempts: i32 = 0;

        let result = retry_with_backoff(&self.options.notification_retry, || {
            attempts = attempts.saturating_add(1);
            let dispatcher = Arc::clone(&self.dispatcher);
            async move {
                match tokio::time::timeout(timeout, dispatcher.publish(notification)).await {
                    Ok(result) => result,
                    Err(_) => Err(DispatchError(format!(
                        "publish timed out after {timeout:?}"
                    ))),
                }
            }
        })
        .await;

        let delivered = match &result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    notification_id = %notification.id,
                    key = %notification.idempotency_key,
                    attempts,
                    "notification delivery failed: {err}"
                );
                false
            }
        };

        let mut update = notifications::Entity::update_many().col_expr(
            notifications::Column::Attempts,
            Expr::col(notifications::Column::Attempts).add(attempts),
        );
        if delivered {
            update = update.col_expr(notifications::Column::DeliveredAt, Expr::value(Utc::now()));
        }
        if let Err(err) = update
            .filter(notifications::Column::Id.eq(notification.id.to_string()))
            .exec(&self.database)
            .await
        {
            tracing::warn!(
                notification_id = %notification.id,
                "failed to record notification delivery: {err}"
            );
        }

        delivered
    }

    /// Notifications not yet acknowledged by the dispatcher, oldest first.
    pub async fn pending_notifications(&self, limit: u64) -> ResultEngine<Vec<Notification>> {
        self.bounded("pending_notifications", async {
            with_tx!(self, |db_tx| {
                notifications::Entity::find()
                    .filter(notifications::Column::DeliveredAt.is_null())
                    .order_by_asc(notifications::Column::CreatedAt)
                    .limit(limit)
                    .all(&db_tx)
                    .await?
                    .into_iter()
                    .map(Notification::try_from)
                    .collect::<ResultEngine<Vec<_>>>()
            })
        })
        .await
    }

    /// Redeliver pending notifications.
    ///
    /// Safe to run repeatedly and concurrently with normal traffic: consumers
    /// deduplicate on the idempotency key.
    pub async fn flush_notifications(&self, limit: u64) -> ResultEngine<FlushReport> {
        let pending = self.pending_notifications(limit).await?;
        let mut report = FlushReport::default();
        for notification in &pending {
            if self.deliver(notification).await {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }
        if !pending.is_empty() {
            tracing::info!(
                delivered = report.delivered,
                failed = report.failed,
                "flushed notification outbox"
            );
        }
        Ok(report)
    }
}
