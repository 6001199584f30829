use std::{net::SocketAddr, sync::Arc};

use engine::{NotificationDispatcher, TracingDispatcher};
use migration::{Migrator, MigratorTrait};
use settings::Database;
use webhook::WebhookDispatcher;

mod settings;
mod webhook;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "punya={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no server settings found, nothing to run");
        return Ok(());
    };

    let dispatcher: Arc<dyn NotificationDispatcher> =
        match settings.engine.notification.webhook_url.as_deref() {
            Some(url) => {
                tracing::info!("publishing notifications to {url}");
                Arc::new(WebhookDispatcher::new(url))
            }
            None => Arc::new(TracingDispatcher),
        };
    let options = settings.engine.options();

    tasks.spawn(async move {
        tracing::info!("Found server settings...");
        let db = match parse_database(&server.database).await {
            Ok(db) => db,
            Err(err) => {
                tracing::error!("failed to initialize database: {err}");
                return;
            }
        };

        let engine = match engine::Engine::builder()
            .database(db)
            .dispatcher(dispatcher)
            .options(options)
            .build()
            .await
        {
            Ok(engine) => Arc::new(engine),
            Err(err) => {
                tracing::error!("failed to build engine: {err}");
                return;
            }
        };

        // Redeliver whatever the previous run left in the outbox.
        match engine.flush_notifications(1_000).await {
            Ok(report) if report.failed > 0 => {
                tracing::warn!(failed = report.failed, "undelivered notifications remain")
            }
            Ok(_) => {}
            Err(err) => tracing::warn!("failed to flush notifications: {err}"),
        }

        let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
        let addr: SocketAddr = match format!("{}:{}", bind, server.port).parse() {
            Ok(addr) => addr,
            Err(err) => {
                tracing::error!("invalid bind address: {err}");
                return;
            }
        };
        server::run(engine, addr).await;
    });

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
