// Market-statistics worker: enriches analysis cycles with a bounded
// forecast-based signal per tracked symbol.

mod binance;
mod forecast;
mod handler;
mod scoring;


pub use binance::BinanceMarketData;
pub use forecast::DriftForecast;
pub use handler::MarketHandler;
pub use scoring::signal_score;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One observed price
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricePoint {
    pub time: DateTime<Utc>,
    pub close: f64,
}

/// Time-indexed price series for one symbol
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriceSeries {
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_close(&self) -> Option<f64> {
        self.points.iter().map(|p| p.close).reduce(f64::max)
    }

    pub fn min_close(&self) -> Option<f64> {
        self.points.iter().map(|p| p.close).reduce(f64::min)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }
}

/// Source of historical prices (exchange REST API, replay file, ...)
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Query one series per symbol; symbols the source cannot serve are
    /// simply absent from the result.
    async fn query(&self, symbols: &[String]) -> anyhow::Result<HashMap<String, PriceSeries>>;
}

/// A model forecast over a future horizon
#[derive(Clone, Debug, PartialEq)]
pub struct Forecast {
    pub values: Vec<f64>,
    pub max: f64,
    pub min: f64,
}

/// Price forecasting model
pub trait ForecastEngine: Send + Sync {
    fn forecast(&self, symbol: &str, series: &PriceSeries) -> anyhow::Result<Forecast>;
}
