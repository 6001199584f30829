use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{
    Booking, BookingStatus, CreditCmd, DebitCmd, Engine, ListOrder, Transaction, TransitionCmd,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "punya_admin")]
#[command(about = "Admin utilities for Punya (wallets, bookings, notifications)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./punya.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Wallet(Wallet),
    Booking(BookingArgs),
    Notifications(Notifications),
}

#[derive(Args, Debug)]
struct Wallet {
    #[command(subcommand)]
    command: WalletCommand,
}

#[derive(Subcommand, Debug)]
enum WalletCommand {
    /// Print balance and totals.
    Show { user_id: String },
    Credit(AdjustArgs),
    Debit(AdjustArgs),
    /// Print the ledger, newest first.
    History {
        user_id: String,
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },
    /// Replay the ledger and compare it with the wallet.
    Verify { user_id: String },
}

#[derive(Args, Debug)]
struct AdjustArgs {
    user_id: String,
    #[arg(long)]
    amount: i64,
    #[arg(long)]
    reason: String,
    /// Operator performing the change.
    #[arg(long, env = "PUNYA_ADMIN_ID")]
    admin: String,
    #[arg(long)]
    booking_id: Option<Uuid>,
    #[arg(long)]
    idempotency_key: Option<String>,
}

#[derive(Args, Debug)]
struct BookingArgs {
    #[command(subcommand)]
    command: BookingCommand,
}

#[derive(Subcommand, Debug)]
enum BookingCommand {
    Show {
        id: Uuid,
    },
    Transition {
        id: Uuid,
        #[arg(long, value_parser = parse_status)]
        from: BookingStatus,
        #[arg(long, value_parser = parse_status)]
        to: BookingStatus,
    },
    /// Give back the coins redeemed on a cancelled booking.
    Refund {
        id: Uuid,
        #[arg(long, env = "PUNYA_ADMIN_ID")]
        admin: String,
    },
}

#[derive(Args, Debug)]
struct Notifications {
    #[command(subcommand)]
    command: NotificationsCommand,
}

#[derive(Subcommand, Debug)]
enum NotificationsCommand {
    /// Redeliver notifications still pending in the outbox.
    Flush {
        #[arg(long, default_value_t = 100)]
        limit: u64,
    },
}

fn parse_status(raw: &str) -> Result<BookingStatus, String> {
    BookingStatus::try_from(raw.trim().to_ascii_lowercase().as_str())
        .map_err(|_| format!("unknown booking status '{raw}'"))
}

fn print_booking(booking: &Booking) {
    println!("booking {} ({})", booking.id, booking.status);
    println!("  user:     {}", booking.user_id);
    println!("  puja:     {} [{}]", booking.puja_name, booking.puja_id);
    println!(
        "  price:    {} - {} discount - {} coins = {}",
        booking.price, booking.discount_applied, booking.coins_redeemed, booking.final_price
    );
    println!("  payment:  {}", booking.payment_status.as_str());
    if let Some(tx) = booking.redemption_transaction_id {
        println!("  redeemed: {tx}");
    }
}

fn print_transaction(tx: &Transaction) {
    println!(
        "{:>6} {} {:<6} {:>8} -> {:>8}  {}{}",
        tx.seq,
        tx.created_at.format("%Y-%m-%d %H:%M"),
        tx.kind.as_str(),
        tx.amount,
        tx.balance_after,
        tx.reason,
        tx.admin_id
            .as_deref()
            .map(|admin| format!(" (by {admin})"))
            .unwrap_or_default()
    );
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Wallet(Wallet { command }) => match command {
            WalletCommand::Show { user_id } => {
                let wallet = engine.wallet(&user_id).await?;
                println!(
                    "{}: balance {} (earned {}, spent {})",
                    wallet.user_id, wallet.balance, wallet.total_earned, wallet.total_spent
                );
            }
            WalletCommand::Credit(args) => {
                let mut cmd =
                    CreditCmd::new(args.user_id, args.amount, args.reason).admin_id(args.admin);
                if let Some(booking_id) = args.booking_id {
                    cmd = cmd.booking_id(booking_id);
                }
                if let Some(key) = args.idempotency_key {
                    cmd = cmd.idempotency_key(key);
                }
                let balance = engine.credit(cmd).await?;
                println!("new balance: {balance}");
            }
            WalletCommand::Debit(args) => {
                let mut cmd =
                    DebitCmd::new(args.user_id, args.amount, args.reason).admin_id(args.admin);
                if let Some(booking_id) = args.booking_id {
                    cmd = cmd.booking_id(booking_id);
                }
                if let Some(key) = args.idempotency_key {
                    cmd = cmd.idempotency_key(key);
                }
                let balance = engine.debit(cmd).await?;
                println!("new balance: {balance}");
            }
            WalletCommand::History { user_id, limit } => {
                let history = engine
                    .list_transactions(&user_id, ListOrder::NewestFirst, Some(limit))
                    .await?;
                for tx in &history {
                    print_transaction(tx);
                }
            }
            WalletCommand::Verify { user_id } => {
                let check = engine.verify_ledger(&user_id).await?;
                println!(
                    "{} transactions, replayed balance {}, stored balance {}",
                    check.transaction_count, check.replayed_balance, check.wallet.balance
                );
                if !check.is_consistent() {
                    eprintln!("ledger mismatch for {user_id}");
                    std::process::exit(1);
                }
                println!("ledger consistent");
            }
        },
        Command::Booking(BookingArgs { command }) => match command {
            BookingCommand::Show { id } => {
                print_booking(&engine.booking(id).await?);
                for tx in engine.transactions_for_booking(id).await? {
                    print_transaction(&tx);
                }
            }
            BookingCommand::Transition { id, from, to } => {
                let booking = engine
                    .transition_booking(TransitionCmd::new(id, from, to))
                    .await?;
                print_booking(&booking);
            }
            BookingCommand::Refund { id, admin } => {
                let tx = engine.refund_redemption(id, &admin).await?;
                print_transaction(&tx);
            }
        },
        Command::Notifications(Notifications {
            command: NotificationsCommand::Flush { limit },
        }) => {
            let report = engine.flush_notifications(limit).await?;
            println!(
                "delivered {}, still pending {}",
                report.delivered, report.failed
            );
        }
    }

    Ok(())
}
