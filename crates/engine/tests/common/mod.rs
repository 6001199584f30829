#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    CreditCmd, DispatchError, Engine, EngineOptions, Notification, NotificationDispatcher,
    RetryPolicy,
};
use migration::MigratorTrait;

pub async fn database() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

/// Options with short retry delays so failing dispatchers don't slow tests.
pub fn fast_options() -> EngineOptions {
    EngineOptions {
        notification_timeout: Duration::from_millis(200),
        notification_retry: RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        },
        ..Default::default()
    }
}

pub async fn engine_on(
    db: &DatabaseConnection,
    dispatcher: Arc<dyn NotificationDispatcher>,
) -> Engine {
    Engine::builder()
        .database(db.clone())
        .dispatcher(dispatcher)
        .options(fast_options())
        .build()
        .await
        .unwrap()
}

pub async fn engine_with_db() -> (Engine, Arc<RecordingDispatcher>, DatabaseConnection) {
    let db = database().await;
    let recorder = Arc::new(RecordingDispatcher::default());
    let engine = engine_on(&db, recorder.clone()).await;
    (engine, recorder, db)
}

pub async fn fund(engine: &Engine, user_id: &str, amount: i64) {
    engine
        .credit(CreditCmd::new(user_id, amount, "signup_bonus"))
        .await
        .unwrap();
}

#[derive(Default)]
pub struct RecordingDispatcher {
    published: Mutex<Vec<Notification>>,
}

impl RecordingDispatcher {
    pub fn published(&self) -> Vec<Notification> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn publish(&self, notification: &Notification) -> Result<(), DispatchError> {
        self.published.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Always fails, counting attempts.
#[derive(Default)]
pub struct FailingDispatcher {
    pub calls: AtomicUsize,
}

impl FailingDispatcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn publish(&self, _notification: &Notification) -> Result<(), DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DispatchError("push service unavailable".to_string()))
    }
}

/// Never answers within the publish timeout.
pub struct StalledDispatcher;

#[async_trait]
impl NotificationDispatcher for StalledDispatcher {
    async fn publish(&self, _notification: &Notification) -> Result<(), DispatchError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}
