//! Initial schema:
//!
//! - `wallets`: one row per user, denormalized balance and totals
//! - `wallet_transactions`: append-only coin ledger
//! - `bookings`: puja bookings and their lifecycle
//! - `notifications`: outbox of user notifications

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Wallets {
    Table,
    UserId,
    Balance,
    TotalEarned,
    TotalSpent,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum WalletTransactions {
    Table,
    Seq,
    Id,
    UserId,
    Kind,
    Amount,
    Reason,
    AdminId,
    BookingId,
    BalanceAfter,
    IdempotencyKey,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum Bookings {
    Table,
    Id,
    UserId,
    Status,
    PujaId,
    PujaName,
    Price,
    DiscountApplied,
    CoinsRedeemed,
    FinalPrice,
    RedemptionTransactionId,
    PaymentStatus,
    ReviewRequested,
    HasReview,
    ReviewId,
    CreatedAt,
    UpdatedAt,
    PaymentReceivedAt,
    ReviewRequestedAt,
    ReviewedAt,
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    UserId,
    Title,
    Message,
    Kind,
    RefId,
    IdempotencyKey,
    Attempts,
    CreatedAt,
    DeliveredAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Wallets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Wallets::UserId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Wallets::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Wallets::TotalEarned)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Wallets::TotalSpent)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Wallets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Wallets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(Wallets::Balance).gte(0))
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Ledger
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(WalletTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WalletTransactions::Seq)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WalletTransactions::Id).string().not_null())
                    .col(
                        ColumnDef::new(WalletTransactions::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WalletTransactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(WalletTransactions::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::Reason)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WalletTransactions::AdminId).string())
                    .col(ColumnDef::new(WalletTransactions::BookingId).string())
                    .col(
                        ColumnDef::new(WalletTransactions::BalanceAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WalletTransactions::IdempotencyKey).string())
                    .col(
                        ColumnDef::new(WalletTransactions::Status)
                            .string()
                            .not_null()
                            .default("completed"),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(WalletTransactions::Amount).gt(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-wallet_transactions-user_id")
                            .from(WalletTransactions::Table, WalletTransactions::UserId)
                            .to(Wallets::Table, Wallets::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-wallet_transactions-id")
                    .table(WalletTransactions::Table)
                    .col(WalletTransactions::Id)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-wallet_transactions-user_id-idempotency_key")
                    .table(WalletTransactions::Table)
                    .col(WalletTransactions::UserId)
                    .col(WalletTransactions::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-wallet_transactions-booking_id")
                    .table(WalletTransactions::Table)
                    .col(WalletTransactions::BookingId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Bookings
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bookings::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Bookings::UserId).string().not_null())
                    .col(ColumnDef::new(Bookings::Status).string().not_null())
                    .col(ColumnDef::new(Bookings::PujaId).string().not_null())
                    .col(ColumnDef::new(Bookings::PujaName).string().not_null())
                    .col(ColumnDef::new(Bookings::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(Bookings::DiscountApplied)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::CoinsRedeemed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Bookings::FinalPrice).big_integer().not_null())
                    .col(ColumnDef::new(Bookings::RedemptionTransactionId).string())
                    .col(
                        ColumnDef::new(Bookings::PaymentStatus)
                            .string()
                            .not_null()
                            .default("unpaid"),
                    )
                    .col(
                        ColumnDef::new(Bookings::ReviewRequested)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Bookings::HasReview)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Bookings::ReviewId).string())
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::PaymentReceivedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Bookings::ReviewRequestedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Bookings::ReviewedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-bookings-user_id")
                    .table(Bookings::Table)
                    .col(Bookings::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-bookings-status")
                    .table(Bookings::Table)
                    .col(Bookings::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Notification outbox
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::UserId).string().not_null())
                    .col(ColumnDef::new(Notifications::Title).string().not_null())
                    .col(ColumnDef::new(Notifications::Message).string().not_null())
                    .col(ColumnDef::new(Notifications::Kind).string().not_null())
                    .col(ColumnDef::new(Notifications::RefId).string().not_null())
                    .col(
                        ColumnDef::new(Notifications::IdempotencyKey)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notifications::DeliveredAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-notifications-idempotency_key")
                    .table(Notifications::Table)
                    .col(Notifications::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-notifications-delivered_at")
                    .table(Notifications::Table)
                    .col(Notifications::DeliveredAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WalletTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Wallets::Table).to_owned())
            .await?;
        Ok(())
    }
}
