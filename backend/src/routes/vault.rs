use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    dashboard::{BorrowQuote, CreditScoreView, DashboardView, PositionView, ProtocolStats},
    error::Result,
    models::{BorrowForm, LiquidityPool},
    oracle::PriceQuote,
    AppState,
};

#[derive(Serialize)]
pub struct PriceResponse {
    pub quote: PriceQuote,
    pub valuation_price: Decimal,
}

pub async fn get_price(State(state): State<AppState>) -> Json<PriceResponse> {
    Json(PriceResponse {
        quote: state.dashboard.price_quote(),
        valuation_price: state.dashboard.valuation_price(),
    })
}

pub async fn get_pool(State(state): State<AppState>) -> Result<Json<LiquidityPool>> {
    Ok(Json(state.dashboard.pool().await?))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<ProtocolStats>> {
    Ok(Json(state.dashboard.stats().await?))
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<DashboardView>> {
    Ok(Json(state.dashboard.snapshot(&owner).await?))
}

pub async fn get_positions(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<Vec<PositionView>>> {
    Ok(Json(state.dashboard.position_views(&owner).await?))
}

pub async fn get_credit(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<CreditScoreView>> {
    Ok(Json(state.dashboard.credit(&owner).await?))
}

pub async fn quote_borrow(
    State(state): State<AppState>,
    Json(form): Json<BorrowForm>,
) -> Result<Json<BorrowQuote>> {
    Ok(Json(state.dashboard.quote_borrow(&form).await?))
}
