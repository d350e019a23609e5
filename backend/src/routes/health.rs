use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{config::SUI_NETWORK, AppState};

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let refresh = state.dashboard.refresh_generation();
    Json(json!({
        "status": "ok",
        "network": SUI_NETWORK,
        "refresh": refresh,
    }))
}
