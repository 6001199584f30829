//! Wallet API endpoints.

use api_types::wallet::WalletView;
use axum::{Extension, Json, extract::State};

use crate::{ServerError, UserId, server::ServerState};

pub(crate) fn wallet_view(wallet: engine::Wallet) -> WalletView {
    WalletView {
        user_id: wallet.user_id,
        balance: wallet.balance,
        total_earned: wallet.total_earned,
        total_spent: wallet.total_spent,
        updated_at: wallet.updated_at,
    }
}

pub async fn get(
    Extension(UserId(user_id)): Extension<UserId>,
    State(state): State<ServerState>,
) -> Result<Json<WalletView>, ServerError> {
    let wallet = state.engine.wallet(&user_id).await?;
    Ok(Json(wallet_view(wallet)))
}
