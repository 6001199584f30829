mod common;

use uuid::Uuid;

use engine::{
    CreditCmd, DebitCmd, EngineError, ListOrder, NewBookingCmd, NotificationKind, TransactionKind,
};

use common::{engine_with_db, fund};

#[tokio::test]
async fn wallet_is_created_once_with_zero_balance() {
    let (engine, _recorder, _db) = engine_with_db().await;

    let first = engine.wallet("alice").await.unwrap();
    let second = engine.wallet("alice").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.balance, 0);
    assert_eq!(first.total_earned, 0);
    assert_eq!(first.total_spent, 0);
}

#[tokio::test]
async fn credit_then_debit_keeps_ledger_consistent() {
    let (engine, _recorder, _db) = engine_with_db().await;
    let booking_id = engine
        .create_booking(NewBookingCmd::new("alice", "puja-1", "Ganesh Puja", 1000))
        .await
        .unwrap()
        .id;

    let balance = engine
        .credit(CreditCmd::new("alice", 100, "signup_bonus"))
        .await
        .unwrap();
    assert_eq!(balance, 100);
    let balance = engine
        .debit(DebitCmd::new("alice", 40, "booking_redemption").booking_id(booking_id))
        .await
        .unwrap();
    assert_eq!(balance, 60);

    let wallet = engine.wallet("alice").await.unwrap();
    assert_eq!(
        (wallet.balance, wallet.total_earned, wallet.total_spent),
        (60, 100, 40)
    );

    let history = engine
        .list_transactions("alice", ListOrder::OldestFirst, None)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].kind, TransactionKind::Credit);
    assert_eq!(history[0].balance_after, 100);
    assert_eq!(history[1].kind, TransactionKind::Debit);
    assert_eq!(history[1].booking_id, Some(booking_id));
    assert_eq!(history[1].balance_after, 60);
    assert_eq!(history.iter().map(|tx| tx.signed_amount()).sum::<i64>(), 60);

    let check = engine.verify_ledger("alice").await.unwrap();
    assert!(check.is_consistent());
    assert_eq!(check.transaction_count, 2);
}

#[tokio::test]
async fn debit_beyond_balance_changes_nothing() {
    let (engine, _recorder, _db) = engine_with_db().await;
    fund(&engine, "alice", 50).await;

    let err = engine
        .debit(DebitCmd::new("alice", 51, "booking_redemption"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientBalance("alice".to_string()));

    let wallet = engine.wallet("alice").await.unwrap();
    assert_eq!(
        (wallet.balance, wallet.total_earned, wallet.total_spent),
        (50, 50, 0)
    );
    let history = engine
        .list_transactions("alice", ListOrder::NewestFirst, None)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn debit_of_whole_balance_is_allowed() {
    let (engine, _recorder, _db) = engine_with_db().await;
    fund(&engine, "alice", 50).await;

    let balance = engine
        .debit(DebitCmd::new("alice", 50, "booking_redemption"))
        .await
        .unwrap();
    assert_eq!(balance, 0);
}

#[tokio::test]
async fn debit_on_unknown_user_fails() {
    let (engine, _recorder, _db) = engine_with_db().await;

    let err = engine
        .debit(DebitCmd::new("bob", 1, "correction"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientBalance("bob".to_string()));
    assert_eq!(engine.wallet("bob").await.unwrap().balance, 0);
}

#[tokio::test]
async fn invalid_inputs_are_rejected() {
    let (engine, _recorder, _db) = engine_with_db().await;

    let err = engine
        .credit(CreditCmd::new("alice", 0, "bonus"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidAmount("amount must be > 0".to_string()));

    let err = engine
        .debit(DebitCmd::new("alice", -5, "bonus"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidAmount("amount must be > 0".to_string()));

    let err = engine
        .credit(CreditCmd::new("alice", 10, "   "))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidAmount("reason must not be empty".to_string())
    );

    let err = engine
        .credit(CreditCmd::new(" ", 10, "bonus"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidAmount("user id must not be empty".to_string())
    );

    let history = engine
        .list_transactions("alice", ListOrder::NewestFirst, None)
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_credits_are_not_lost() {
    let (engine, _recorder, _db) = engine_with_db().await;

    let (a, b) = tokio::join!(
        engine.credit(CreditCmd::new("alice", 50, "referral")),
        engine.credit(CreditCmd::new("alice", 50, "referral")),
    );
    a.unwrap();
    b.unwrap();

    let wallet = engine.wallet("alice").await.unwrap();
    assert_eq!(wallet.balance, 100);
    assert_eq!(wallet.total_earned, 100);
    let history = engine
        .list_transactions("alice", ListOrder::OldestFirst, None)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert!(engine.verify_ledger("alice").await.unwrap().is_consistent());
}

#[tokio::test]
async fn idempotency_key_replays_first_result() {
    let (engine, _recorder, _db) = engine_with_db().await;

    let first = engine
        .credit(CreditCmd::new("alice", 100, "festival_bonus").idempotency_key("fest-2026"))
        .await
        .unwrap();
    fund(&engine, "alice", 5).await;
    let replay = engine
        .credit(CreditCmd::new("alice", 100, "festival_bonus").idempotency_key("fest-2026"))
        .await
        .unwrap();

    assert_eq!(first, 100);
    assert_eq!(replay, 100);
    assert_eq!(engine.wallet("alice").await.unwrap().balance, 105);

    let err = engine
        .credit(CreditCmd::new("alice", 99, "festival_bonus").idempotency_key("fest-2026"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidAmount(
            "idempotency key 'fest-2026' was used for a different operation".to_string()
        )
    );
}

#[tokio::test]
async fn same_idempotency_key_is_independent_per_user() {
    let (engine, _recorder, _db) = engine_with_db().await;

    engine
        .credit(CreditCmd::new("alice", 10, "bonus").idempotency_key("k"))
        .await
        .unwrap();
    engine
        .credit(CreditCmd::new("bob", 10, "bonus").idempotency_key("k"))
        .await
        .unwrap();

    assert_eq!(engine.wallet("alice").await.unwrap().balance, 10);
    assert_eq!(engine.wallet("bob").await.unwrap().balance, 10);
}

#[tokio::test]
async fn cursor_listing_survives_appends() {
    let (engine, _recorder, _db) = engine_with_db().await;
    for amount in 1..=5 {
        fund(&engine, "alice", amount).await;
    }

    let (page, cursor) = engine
        .list_transactions_page("alice", ListOrder::NewestFirst, 2, None)
        .await
        .unwrap();
    assert_eq!(page.iter().map(|tx| tx.amount).collect::<Vec<_>>(), vec![5, 4]);
    let cursor = cursor.unwrap();

    fund(&engine, "alice", 6).await;

    let (page, cursor) = engine
        .list_transactions_page("alice", ListOrder::NewestFirst, 2, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(page.iter().map(|tx| tx.amount).collect::<Vec<_>>(), vec![3, 2]);
    let (page, cursor) = engine
        .list_transactions_page("alice", ListOrder::NewestFirst, 2, cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(page.iter().map(|tx| tx.amount).collect::<Vec<_>>(), vec![1]);
    assert!(cursor.is_none());

    let (page, _) = engine
        .list_transactions_page("alice", ListOrder::OldestFirst, 10, None)
        .await
        .unwrap();
    assert_eq!(
        page.iter().map(|tx| tx.amount).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5, 6]
    );
}

#[tokio::test]
async fn garbage_cursor_is_rejected() {
    let (engine, _recorder, _db) = engine_with_db().await;

    let err = engine
        .list_transactions_page("alice", ListOrder::NewestFirst, 10, Some("not a cursor!"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidCursor("invalid transactions cursor".to_string())
    );
}

#[tokio::test]
async fn transaction_lookup() {
    let (engine, _recorder, _db) = engine_with_db().await;
    fund(&engine, "alice", 10).await;
    let history = engine
        .list_transactions("alice", ListOrder::NewestFirst, Some(1))
        .await
        .unwrap();

    let tx = engine.transaction(history[0].id).await.unwrap();
    assert_eq!(tx, history[0]);

    let err = engine.transaction(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("transaction not exists".to_string())
    );
}

#[tokio::test]
async fn admin_adjustments_notify_the_user() {
    let (engine, recorder, _db) = engine_with_db().await;

    fund(&engine, "alice", 10).await;
    assert!(recorder.published().is_empty());

    engine
        .credit(CreditCmd::new("alice", 100, "goodwill").admin_id("admin-1"))
        .await
        .unwrap();
    engine
        .debit(DebitCmd::new("alice", 30, "correction").admin_id("admin-1"))
        .await
        .unwrap();

    let published = recorder.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].kind, NotificationKind::WalletCredit);
    assert_eq!(
        published[0].message,
        "100 coins were credited to your wallet (goodwill). Balance: 110."
    );
    assert_eq!(published[1].kind, NotificationKind::WalletDebit);
    assert_eq!(published[1].user_id, "alice");

    let history = engine
        .list_transactions("alice", ListOrder::NewestFirst, Some(1))
        .await
        .unwrap();
    assert_eq!(history[0].admin_id.as_deref(), Some("admin-1"));
}

#[tokio::test]
async fn verify_ledger_on_unknown_user_is_empty() {
    let (engine, _recorder, _db) = engine_with_db().await;

    let check = engine.verify_ledger("nobody").await.unwrap();
    assert!(check.is_consistent());
    assert_eq!(check.transaction_count, 0);
    assert_eq!(check.wallet.balance, 0);
}

#[tokio::test]
async fn booking_link_must_belong_to_the_wallet_owner() {
    let (engine, _recorder, _db) = engine_with_db().await;
    let booking = engine
        .create_booking(NewBookingCmd::new("alice", "puja-1", "Ganesh Puja", 1000))
        .await
        .unwrap();
    fund(&engine, "bob", 100).await;

    let err = engine
        .debit(
            DebitCmd::new("bob", 30, "correction")
                .admin_id("admin-1")
                .booking_id(booking.id),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("booking not exists".to_string()));

    let err = engine
        .credit(CreditCmd::new("bob", 30, "correction").booking_id(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("booking not exists".to_string()));

    assert_eq!(engine.wallet("bob").await.unwrap().balance, 100);
    assert!(
        engine
            .transactions_for_booking(booking.id)
            .await
            .unwrap()
            .is_empty()
    );
    let booking = engine.booking(booking.id).await.unwrap();
    assert_eq!((booking.coins_redeemed, booking.final_price), (0, 1000));
}

#[tokio::test]
async fn booking_keys_cannot_be_supplied_by_callers() {
    let (engine, _recorder, _db) = engine_with_db().await;
    fund(&engine, "alice", 100).await;
    let booking_key = format!("redeem:{}", Uuid::new_v4());

    let err = engine
        .debit(DebitCmd::new("alice", 30, "correction").idempotency_key(booking_key.clone()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidAmount(format!("idempotency key '{booking_key}' is reserved"))
    );

    let err = engine
        .credit(CreditCmd::new("alice", 30, "goodwill").idempotency_key(" refund:abc"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    assert_eq!(engine.wallet("alice").await.unwrap().balance, 100);
}

#[tokio::test]
async fn credit_past_the_coin_limit_is_rejected() {
    let (engine, _recorder, _db) = engine_with_db().await;
    fund(&engine, "alice", i64::MAX).await;

    let err = engine
        .credit(CreditCmd::new("alice", 1, "goodwill"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let wallet = engine.wallet("alice").await.unwrap();
    assert_eq!((wallet.balance, wallet.total_earned), (i64::MAX, i64::MAX));
    assert_eq!(
        engine
            .list_transactions("alice", ListOrder::NewestFirst, None)
            .await
            .unwrap()
            .len(),
        1
    );
}
