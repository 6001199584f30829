mod common;

use std::sync::Arc;

use engine::{BookingStatus, CreditCmd, NewBookingCmd, NotificationKind};

use common::{FailingDispatcher, RecordingDispatcher, StalledDispatcher, database, engine_on};

#[tokio::test]
async fn failed_delivery_keeps_the_mutation() {
    let db = database().await;
    let failing = Arc::new(FailingDispatcher::default());
    let engine = engine_on(&db, failing.clone()).await;

    let booking = engine
        .create_booking(NewBookingCmd::new("alice", "puja-3", "Ganesh Puja", 500))
        .await
        .unwrap();
    let confirmed = engine.confirm_booking(booking.id).await.unwrap();

    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(
        engine.booking(booking.id).await.unwrap().status,
        BookingStatus::Confirmed
    );
    // one attempt plus two retries
    assert_eq!(failing.calls(), 3);

    let pending = engine.pending_notifications(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, NotificationKind::BookingStatus);
}

#[tokio::test]
async fn flush_redelivers_pending_notifications() {
    let db = database().await;
    let failing = engine_on(&db, Arc::new(FailingDispatcher::default())).await;
    failing
        .credit(CreditCmd::new("alice", 10, "goodwill").admin_id("admin-1"))
        .await
        .unwrap();
    failing
        .credit(CreditCmd::new("alice", 20, "goodwill").admin_id("admin-1"))
        .await
        .unwrap();

    let report = failing.flush_notifications(10).await.unwrap();
    assert_eq!((report.delivered, report.failed), (0, 2));

    let recorder = Arc::new(RecordingDispatcher::default());
    let engine = engine_on(&db, recorder.clone()).await;
    let report = engine.flush_notifications(10).await.unwrap();
    assert_eq!((report.delivered, report.failed), (2, 0));
    assert_eq!(recorder.published().len(), 2);
    assert!(engine.pending_notifications(10).await.unwrap().is_empty());

    let report = engine.flush_notifications(10).await.unwrap();
    assert_eq!((report.delivered, report.failed), (0, 0));
}

#[tokio::test]
async fn stalled_dispatcher_does_not_block_operations() {
    let db = database().await;
    let engine = engine_on(&db, Arc::new(StalledDispatcher)).await;

    let balance = engine
        .credit(CreditCmd::new("alice", 10, "goodwill").admin_id("admin-1"))
        .await
        .unwrap();

    assert_eq!(balance, 10);
    assert_eq!(engine.pending_notifications(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delivered_notifications_leave_the_outbox() {
    let db = database().await;
    let recorder = Arc::new(RecordingDispatcher::default());
    let engine = engine_on(&db, recorder.clone()).await;

    let booking = engine
        .create_booking(NewBookingCmd::new("alice", "puja-3", "Ganesh Puja", 500))
        .await
        .unwrap();
    engine.cancel_booking(booking.id).await.unwrap();

    let published = recorder.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].title, "Booking cancelled");
    assert!(engine.pending_notifications(10).await.unwrap().is_empty());
}
