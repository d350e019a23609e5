use axum::{extract::State, Json};

use crate::{
    error::Result,
    models::{
        AmountRequest, BorrowForm, BorrowRequest, ClaimRequest, DepositRequest,
        LiquidityRequest, RepayRequest, SignedTransaction, SubmitResponse,
    },
    tx::TransactionIntent,
    AppState,
};

pub async fn tx_open(
    State(state): State<AppState>,
    Json(form): Json<BorrowForm>,
) -> Result<Json<TransactionIntent>> {
    Ok(Json(state.dashboard.open_position_intent(&form).await?))
}

pub async fn tx_deposit(
    State(state): State<AppState>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<TransactionIntent>> {
    Ok(Json(state.dashboard.deposit_intent(&req).await?))
}

pub async fn tx_borrow(
    State(state): State<AppState>,
    Json(req): Json<BorrowRequest>,
) -> Result<Json<TransactionIntent>> {
    Ok(Json(state.dashboard.borrow_intent(&req).await?))
}

pub async fn tx_repay(
    State(state): State<AppState>,
    Json(req): Json<RepayRequest>,
) -> Result<Json<TransactionIntent>> {
    Ok(Json(state.dashboard.repay_intent(&req).await?))
}

pub async fn tx_repay_collateral(
    State(state): State<AppState>,
    Json(req): Json<RepayRequest>,
) -> Result<Json<TransactionIntent>> {
    Ok(Json(state.dashboard.repay_with_collateral_intent(&req).await?))
}

pub async fn tx_provide(
    State(state): State<AppState>,
    Json(req): Json<LiquidityRequest>,
) -> Result<Json<TransactionIntent>> {
    Ok(Json(state.dashboard.provide_intent(&req).await?))
}

pub async fn tx_withdraw(
    State(state): State<AppState>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<TransactionIntent>> {
    Ok(Json(state.dashboard.withdraw_intent(&req).await?))
}

pub async fn tx_claim(
    State(state): State<AppState>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<TransactionIntent>> {
    Ok(Json(state.dashboard.claim_intent(&req).await?))
}

pub async fn tx_faucet(
    State(state): State<AppState>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<TransactionIntent>> {
    Ok(Json(state.dashboard.faucet_intent(&req)?))
}

/// Forwards a wallet-signed transaction to the ledger.
pub async fn submit(
    State(state): State<AppState>,
    Json(signed): Json<SignedTransaction>,
) -> Result<Json<SubmitResponse>> {
    Ok(Json(state.dashboard.submit(&signed).await?))
}
