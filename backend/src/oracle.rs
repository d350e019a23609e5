use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::{
    error::{DashboardError, Result},
    sui::BoxFuture,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceOrigin {
    Live,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub price: Decimal,
    pub origin: PriceOrigin,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PriceQuote {
    pub fn live(price: Decimal) -> Self {
        Self {
            price,
            origin: PriceOrigin::Live,
            updated_at: Some(Utc::now()),
        }
    }

    pub fn fallback(price: Decimal) -> Self {
        Self {
            price,
            origin: PriceOrigin::Fallback,
            updated_at: None,
        }
    }
}

pub trait PriceSource: Send + Sync {
    fn fetch_price(&self) -> BoxFuture<'_, Result<Decimal>>;
}

/// GETs a JSON document and reads the price at a JSON pointer.
pub struct HttpPriceSource {
    http: reqwest::Client,
    url: String,
    pointer: String,
}

impl HttpPriceSource {
    pub fn new(url: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            pointer: pointer.into(),
        }
    }
}

impl PriceSource for HttpPriceSource {
    fn fetch_price(&self) -> BoxFuture<'_, Result<Decimal>> {
        Box::pin(async move {
            let body: Value = self
                .http
                .get(&self.url)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|e| DashboardError::Oracle(e.to_string()))?
                .json()
                .await
                .map_err(|e| DashboardError::Oracle(e.to_string()))?;
            extract_price(&body, &self.pointer)
        })
    }
}

/// Reads a finite, positive price from `body` at `pointer`.
pub fn extract_price(body: &Value, pointer: &str) -> Result<Decimal> {
    let raw = body
        .pointer(pointer)
        .and_then(Value::as_f64)
        .ok_or_else(|| DashboardError::Oracle(format!("no numeric price at `{pointer}`")))?;
    if !raw.is_finite() || raw <= 0.0 {
        return Err(DashboardError::Oracle(format!("unusable price {raw}")));
    }
    Decimal::try_from(raw).map_err(|e| DashboardError::Oracle(e.to_string()))
}

/// Last known reference price. Starts at the fallback and only moves on a
/// successful fetch.
pub struct PriceFeed {
    latest: watch::Sender<PriceQuote>,
}

impl PriceFeed {
    pub fn new(fallback: Decimal) -> Self {
        let (latest, _) = watch::channel(PriceQuote::fallback(fallback));
        Self { latest }
    }

    pub fn quote(&self) -> PriceQuote {
        *self.latest.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PriceQuote> {
        self.latest.subscribe()
    }

    pub fn record(&self, fetched: Result<Decimal>) {
        match fetched {
            Ok(price) => {
                self.latest.send_replace(PriceQuote::live(price));
                tracing::debug!(%price, "price updated");
            }
            Err(error) => {
                let kept = self.quote();
                tracing::warn!(
                    %error,
                    price = %kept.price,
                    "price feed unavailable, keeping last price"
                );
            }
        }
    }

    pub async fn poll_once(&self, source: &dyn PriceSource) {
        self.record(source.fetch_price().await);
    }

    pub fn spawn_poller(
        self: Arc<Self>,
        source: Arc<dyn PriceSource>,
        every: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.poll_once(source.as_ref()).await;
            }
        })
    }
}
