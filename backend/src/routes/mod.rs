pub mod health;
pub mod transactions;
pub mod vault;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/price", get(vault::get_price))
        .route("/pool", get(vault::get_pool))
        .route("/stats", get(vault::get_stats))
        .route("/dashboard/:owner", get(vault::get_dashboard))
        .route("/vault/:owner", get(vault::get_positions))
        .route("/credit/:owner", get(vault::get_credit))
        .route("/quote/borrow", post(vault::quote_borrow))
        .route("/tx/open", post(transactions::tx_open))
        .route("/tx/deposit", post(transactions::tx_deposit))
        .route("/tx/borrow", post(transactions::tx_borrow))
        .route("/tx/repay", post(transactions::tx_repay))
        .route("/tx/repay-collateral", post(transactions::tx_repay_collateral))
        .route("/tx/provide", post(transactions::tx_provide))
        .route("/tx/withdraw", post(transactions::tx_withdraw))
        .route("/tx/claim", post(transactions::tx_claim))
        .route("/tx/faucet", post(transactions::tx_faucet))
        .route("/tx/submit", post(transactions::submit))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}
