use crate::aggregate::AggregateBucket;
use serde::Serialize;

/// Ratio metrics for one bucket.
///
/// `ctr` and `cvr` are in percent units (5.0 means 5%); `cpc` and `cpl` are
/// currency units. Every field is finite and zero when its denominator is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub ctr: f64,
    pub cpc: f64,
    pub cpl: f64,
    pub cvr: f64,
}

impl DerivedMetrics {
    pub fn derive(bucket: &AggregateBucket) -> Self {
        let impressions = bucket.impressions as f64;
        let clicks = bucket.clicks as f64;
        let cost = bucket.cost.as_units();
        let conversions = bucket.conversions.as_units();

        Self {
            ctr: guarded_div(clicks * 100.0, impressions),
            cpc: guarded_div(cost, clicks),
            cpl: guarded_div(cost, conversions),
            cvr: guarded_div(conversions * 100.0, clicks),
        }
    }
}

/// `numerator / denominator`, or 0 when the denominator is zero.
fn guarded_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricRow;

    fn bucket(impressions: u64, clicks: u64, cost: f64, conversions: f64) -> AggregateBucket {
        let mut b = AggregateBucket::default();
        b.add(&MetricRow::new("t").with_counts(impressions, clicks, cost, conversions));
        b
    }

    #[test]
    fn test_all_zero_bucket_is_guarded() {
        let m = DerivedMetrics::derive(&AggregateBucket::default());
        assert_eq!(m, DerivedMetrics::default());
    }

    #[test]
    fn test_scenario_values() {
        let m = DerivedMetrics::derive(&bucket(10_000, 500, 250.0, 25.0));
        assert!((m.ctr - 5.0).abs() < 1e-12);
        assert!((m.cpc - 0.5).abs() < 1e-12);
        assert!((m.cpl - 10.0).abs() < 1e-12);
        assert!((m.cvr - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_clicks_without_impressions() {
        let m = DerivedMetrics::derive(&bucket(0, 10, 5.0, 0.0));
        assert_eq!(m.ctr, 0.0);
        assert!((m.cpc - 0.5).abs() < 1e-12);
        assert_eq!(m.cpl, 0.0);
        assert_eq!(m.cvr, 0.0);
    }

    #[test]
    fn test_cost_without_clicks() {
        let m = DerivedMetrics::derive(&bucket(1000, 0, 12.0, 0.0));
        assert_eq!(m.cpc, 0.0);
        assert_eq!(m.cvr, 0.0);
    }

    #[test]
    fn test_fractional_conversions_keep_precision() {
        let m = DerivedMetrics::derive(&bucket(1000, 30, 10.0, 3.0));
        assert!((m.cpl - 3.333333).abs() < 1e-4);
        assert!((m.cpc - 0.333333).abs() < 1e-4);
    }

    #[test]
    fn test_guarded_div() {
        assert_eq!(guarded_div(1.0, 0.0), 0.0);
        assert_eq!(guarded_div(0.0, 0.0), 0.0);
        assert_eq!(guarded_div(3.0, 2.0), 1.5);
    }
}
