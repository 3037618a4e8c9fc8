use crate::config::AnalysisConfig;
use crate::market::{MarketDataSource, PricePoint, PriceSeries};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Historical klines from the Binance public REST API
///
/// Only public market data is read, so no API key is required. Each query
/// covers the configured lookback window at the configured candle interval.
pub struct BinanceMarketData {
    http: reqwest::Client,
    base_url: String,
    candle_interval: String,
    lookback_hours: i64,
}

impl BinanceMarketData {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self::with_base_url(config, "https://api.binance.com")
    }

    pub fn with_base_url(config: &AnalysisConfig, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            candle_interval: config.candle_interval.clone(),
            lookback_hours: config.lookback_hours,
        }
    }

    async fn klines(&self, symbol: &str) -> anyhow::Result<PriceSeries> {
        let end = Utc::now();
        let start = end - Duration::hours(self.lookback_hours);
        let url = format!("{}/api/v3/klines", self.base_url);
        let start_ms = start.timestamp_millis().to_string();
        let end_ms = end.timestamp_millis().to_string();

        let rows: Vec<Vec<Value>> = self
            .http
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", self.candle_interval.as_str()),
                ("startTime", start_ms.as_str()),
                ("endTime", end_ms.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Kline rows are positional arrays: open time at 0, close price
        // (as a decimal string) at 4.
        let mut points = Vec::with_capacity(rows.len());
        for row in &rows {
            let open_time = row.first().and_then(Value::as_i64);
            let close = row
                .get(4)
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<f64>().ok());
            match (open_time, close) {
                (Some(millis), Some(close)) => {
                    let Some(time) = Utc.timestamp_millis_opt(millis).single() else {
                        warn!(symbol = %symbol, millis, "kline timestamp out of range, skipped");
                        continue;
                    };
                    points.push(PricePoint { time, close });
                }
                _ => warn!(symbol = %symbol, "malformed kline row, skipped"),
            }
        }

        debug!(symbol = %symbol, candles = points.len(), "queried klines");
        Ok(PriceSeries::new(points))
    }
}

#[async_trait]
impl MarketDataSource for BinanceMarketData {
    async fn query(&self, symbols: &[String]) -> anyhow::Result<HashMap<String, PriceSeries>> {
        let mut result = HashMap::new();
        for symbol in symbols {
            match self.klines(symbol).await {
                Ok(series) if !series.is_empty() => {
                    result.insert(symbol.clone(), series);
                }
                Ok(_) => warn!(symbol = %symbol, "no candles in window"),
                // One unavailable symbol must not sink the whole cycle.
                Err(err) => warn!(symbol = %symbol, error = %err, "kline query failed"),
            }
        }
        Ok(result)
    }
}
