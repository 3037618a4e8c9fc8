use tracing::warn;

/// Bounded trading signal from historical extremes and forecast extremes
///
/// `current`, `forecast_max` and `forecast_min` are normalized into the
/// historical `[price_min, price_max]` range; the weighted spread rewards
/// upside potential while penalizing a current position already near the
/// local max. The result is clamped to the closed interval [-1, 1].
pub fn signal_score(
    price_min: f64,
    price_max: f64,
    current: f64,
    forecast_max: f64,
    forecast_min: f64,
    target_increase_pct: f64,
) -> f64 {
    let range = price_max - price_min;
    if range <= f64::EPSILON {
        warn!(price_min, price_max, "degenerate price history, scoring 0");
        return 0.0;
    }
    if target_increase_pct <= 0.0 {
        warn!(target_increase_pct, "non-positive target increase, scoring 0");
        return 0.0;
    }

    let norm = |value: f64| (value - price_min) / range;
    let current = norm(current);
    let forecast_max = norm(forecast_max);
    let forecast_min = norm(forecast_min);

    let weight = 100.0 / target_increase_pct;
    (weight * (forecast_max - current.min(forecast_min) - current - forecast_min))
        .clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_values_clamp_to_one() {
        // min=100, max=200, current=150, fmax=220, fmin=90, target=10%:
        // normalized fmax=1.2, fmin=-0.1, current=0.5, weight=10
        // 10 * (1.2 - min(0.5, -0.1) - 0.5 - (-0.1)) = 9.0 -> clamped to 1
        let score = signal_score(100.0, 200.0, 150.0, 220.0, 90.0, 10.0);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_interior_value_is_exact() {
        // weight=1, fmax=1.0, fmin=0.2, current=0.5:
        // 1 * (1.0 - min(0.5, 0.2) - 0.5 - 0.2) = 0.1
        let score = signal_score(100.0, 200.0, 150.0, 200.0, 120.0, 100.0);
        assert!((score - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_downside_clamps_to_minus_one() {
        // Current at the historical max with a collapsing forecast.
        let score = signal_score(100.0, 200.0, 200.0, 110.0, 90.0, 10.0);
        assert_eq!(score, -1.0);
    }

    #[test]
    fn test_score_is_always_in_bounds() {
        for (current, fmax, fmin) in [
            (100.0, 400.0, 50.0),
            (200.0, 100.0, 0.0),
            (150.0, 150.0, 150.0),
        ] {
            let score = signal_score(100.0, 200.0, current, fmax, fmin, 5.0);
            assert!((-1.0..=1.0).contains(&score), "score {} out of bounds", score);
        }
    }

    #[test]
    fn test_degenerate_history_scores_zero() {
        assert_eq!(signal_score(100.0, 100.0, 100.0, 120.0, 90.0, 10.0), 0.0);
    }
}
