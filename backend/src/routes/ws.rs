use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use serde_json::json;
use tokio::time::MissedTickBehavior;

use crate::AppState;

const PUSH_INTERVAL: Duration = Duration::from_secs(5);

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Pushes pool stats and the refresh generation whenever a refresh lands,
/// and at least every few seconds.
async fn handle_ws(mut socket: WebSocket, state: AppState) {
    let mut generation = state.dashboard.subscribe_refresh();
    let mut ticker = tokio::time::interval(PUSH_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = generation.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {}
        }

        let stats = match state.dashboard.stats().await {
            Ok(stats) => json!(stats),
            Err(error) => json!({ "error": error.to_string() }),
        };
        let refresh = *generation.borrow_and_update();
        let frame = json!({
            "refresh": refresh,
            "price": state.dashboard.price_quote(),
            "stats": stats,
        });

        if socket.send(Message::Text(frame.to_string())).await.is_err() {
            break;
        }
    }
}
