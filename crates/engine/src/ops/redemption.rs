use chrono::Utc;
use uuid::Uuid;

use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    Booking, BookingStatus, EngineError, RedeemCoinsCmd, ResultEngine, Transaction,
    TransactionKind, bookings, util::require_positive,
};

use super::{Engine, normalize_user_id, wallets::LedgerEntry, with_tx};

const REDEMPTION_REASON: &str = "booking_redemption";
const REFUND_REASON: &str = "booking_refund";

impl Engine {
    /// Most coins that can be redeemed against `booking`.
    ///
    /// The cap is `max_redemption_percent` of the price, and never more than
    /// what is still payable after other discounts.
    pub fn max_redeemable(&self, booking: &Booking) -> i64 {
        let cap = booking
            .price
            .saturating_mul(self.options.max_redemption_percent)
            / 100;
        cap.min(booking.payable_before_coins())
    }

    /// Pay part of a pending booking with wallet coins.
    ///
    /// The debit and the booking update are one database transaction: on any
    /// failure no coins move and the booking keeps its price.
    pub async fn redeem_coins(&self, cmd: RedeemCoinsCmd) -> ResultEngine<Booking> {
        let user_id = normalize_user_id(&cmd.user_id)?;
        require_positive(cmd.coins, "coins")?;

        let booking = self
            .bounded("redeem_coins", async {
                with_tx!(self, |db_tx| {
                    let booking = self.require_booking(&db_tx, cmd.booking_id).await?;
                    // Someone else's booking looks the same as a missing one.
                    if booking.user_id != user_id {
                        return Err(EngineError::KeyNotFound("booking not exists".to_string()));
                    }
                    self.redeem_in_tx(&db_tx, &booking, cmd.coins).await
                })
            })
            .await?;

        tracing::info!(
            booking_id = %booking.id,
            user_id = %booking.user_id,
            coins = booking.coins_redeemed,
            final_price = booking.final_price,
            "coins redeemed"
        );
        Ok(booking)
    }

    pub(in crate::ops) async fn redeem_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        booking: &Booking,
        coins: i64,
    ) -> ResultEngine<Booking> {
        require_positive(coins, "coins")?;
        if booking.status != BookingStatus::Pending {
            return Err(EngineError::InvalidTransition(format!(
                "coins can only be redeemed on a pending booking, found {}",
                booking.status
            )));
        }
        if booking.coins_redeemed > 0 {
            return Err(EngineError::RedemptionLimit(
                "coins were already redeemed for this booking".to_string(),
            ));
        }
        let max = self.max_redeemable(booking);
        if coins > max {
            return Err(EngineError::RedemptionLimit(format!(
                "at most {max} coins can be redeemed for this booking"
            )));
        }

        let mut entry = LedgerEntry::new(
            &booking.user_id,
            TransactionKind::Debit,
            coins,
            REDEMPTION_REASON,
        )?;
        entry.booking_id = Some(booking.id);
        entry.idempotency_key = Some(format!("redeem:{}", booking.id));
        let applied = self.apply_entry(db_tx, &entry).await?;

        let result = bookings::Entity::update_many()
            .col_expr(bookings::Column::CoinsRedeemed, Expr::value(coins))
            .col_expr(
                bookings::Column::FinalPrice,
                Expr::value(booking.payable_before_coins() - coins),
            )
            .col_expr(
                bookings::Column::RedemptionTransactionId,
                Expr::value(applied.transaction.id.to_string()),
            )
            .col_expr(bookings::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(bookings::Column::Id.eq(booking.id.to_string()))
            .filter(bookings::Column::Status.eq(BookingStatus::Pending.as_str()))
            .filter(bookings::Column::CoinsRedeemed.eq(0))
            .exec(db_tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::ConcurrencyConflict(
                "booking changed during redemption".to_string(),
            ));
        }

        self.require_booking(db_tx, booking.id).await
    }

    /// Give the coins redeemed on a cancelled booking back to its owner.
    ///
    /// Runs at most once per booking; repeated calls return the original
    /// refund transaction.
    pub async fn refund_redemption(
        &self,
        booking_id: Uuid,
        admin_id: &str,
    ) -> ResultEngine<Transaction> {
        let admin_id = normalize_user_id(admin_id)?;

        let applied = self
            .bounded("refund_redemption", async {
                with_tx!(self, |db_tx| {
                    let booking = self.require_booking(&db_tx, booking_id).await?;
                    if booking.status != BookingStatus::Cancelled {
                        return Err(EngineError::InvalidTransition(format!(
                            "only cancelled bookings can be refunded, found {}",
                            booking.status
                        )));
                    }
                    if booking.coins_redeemed == 0 {
                        return Err(EngineError::InvalidAmount(
                            "booking has no redeemed coins".to_string(),
                        ));
                    }

                    let mut entry = LedgerEntry::new(
                        &booking.user_id,
                        TransactionKind::Credit,
                        booking.coins_redeemed,
                        REFUND_REASON,
                    )?;
                    entry.admin_id = Some(admin_id.clone());
                    entry.booking_id = Some(booking.id);
                    entry.idempotency_key = Some(format!("refund:{}", booking.id));
                    self.apply_entry(&db_tx, &entry).await
                })
            })
            .await?;

        tracing::info!(
            booking_id = %booking_id,
            admin_id = %admin_id,
            amount = applied.transaction.amount,
            "redemption refunded"
        );
        if let Some(notification) = &applied.notification {
            self.deliver(notification).await;
        }
        Ok(applied.transaction)
    }
}
