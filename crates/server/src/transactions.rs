//! Ledger API endpoints

use api_types::transaction::{
    ListOrder as ApiOrder, TransactionKind as ApiKind, TransactionList,
    TransactionListResponse, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};

use crate::{ServerError, UserId, server::ServerState};

const DEFAULT_PAGE_SIZE: u64 = 50;

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Credit => ApiKind::Credit,
        engine::TransactionKind::Debit => ApiKind::Debit,
    }
}

fn map_order(order: ApiOrder) -> engine::ListOrder {
    match order {
        ApiOrder::NewestFirst => engine::ListOrder::NewestFirst,
        ApiOrder::OldestFirst => engine::ListOrder::OldestFirst,
    }
}

pub(crate) fn transaction_view(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: map_kind(tx.kind),
        amount: tx.amount,
        reason: tx.reason,
        booking_id: tx.booking_id,
        balance_after: tx.balance_after,
        created_at: tx.created_at,
    }
}

pub async fn list(
    Extension(UserId(user_id)): Extension<UserId>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let order = map_order(query.order.unwrap_or_default());
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    let (txs, next_cursor) = state
        .engine
        .list_transactions_page(&user_id, order, limit, query.cursor.as_deref())
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: txs.into_iter().map(transaction_view).collect(),
        next_cursor,
    }))
}
