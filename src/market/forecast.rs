use crate::market::{Forecast, ForecastEngine, PriceSeries};
use anyhow::bail;
use tracing::debug;

/// Drift-model forecast engine
///
/// Extrapolates the mean per-step drift of the observed series over the
/// horizon. A deliberately simple replaceable leaf: any real model (ARIMA,
/// gradient boosting, ...) slots in behind `ForecastEngine`.
pub struct DriftForecast {
    horizon: usize,
}

impl DriftForecast {
    pub fn new(horizon: usize) -> Self {
        Self { horizon }
    }
}

impl ForecastEngine for DriftForecast {
    fn forecast(&self, symbol: &str, series: &PriceSeries) -> anyhow::Result<Forecast> {
        if series.len() < 2 {
            bail!(
                "cannot forecast {} from {} observation(s)",
                symbol,
                series.len()
            );
        }
        if self.horizon == 0 {
            bail!("forecast horizon is zero");
        }

        let first = series.points.first().map(|p| p.close).unwrap_or_default();
        let last = series.points.last().map(|p| p.close).unwrap_or_default();
        let drift = (last - first) / (series.len() - 1) as f64;

        let values: Vec<f64> = (1..=self.horizon)
            .map(|step| last + drift * step as f64)
            .collect();
        let max = values.iter().copied().reduce(f64::max).unwrap_or(last);
        let min = values.iter().copied().reduce(f64::min).unwrap_or(last);

        debug!(symbol = %symbol, drift, max, min, "forecast computed");
        Ok(Forecast { values, max, min })
    }
}
