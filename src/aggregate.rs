// Aggregator: folds canonical rows into per-dimension buckets and totals

use crate::error::{ReportError, Result};
use crate::metrics::DerivedMetrics;
use crate::types::{Dimension, MetricRow, Micros};
use serde::Serialize;
use std::collections::BTreeMap;

/// Dimension-key tuple, one string per grouped dimension
pub type DimensionKey = Vec<String>;

/// Running sums of the additive counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateBucket {
    pub impressions: u64,
    pub clicks: u64,
    pub cost: Micros,
    pub conversions: Micros,
    pub all_conversions: Micros,
    pub rows: u64,
}

impl AggregateBucket {
    pub fn add(&mut self, row: &MetricRow) {
        self.impressions = self.impressions.saturating_add(row.impressions);
        self.clicks = self.clicks.saturating_add(row.clicks);
        self.cost = self.cost.saturating_add(row.cost);
        self.conversions = self.conversions.saturating_add(row.conversions);
        self.all_conversions = self.all_conversions.saturating_add(row.all_conversions);
        self.rows = self.rows.saturating_add(1);
    }

    pub fn merge(&mut self, other: &AggregateBucket) {
        self.impressions = self.impressions.saturating_add(other.impressions);
        self.clicks = self.clicks.saturating_add(other.clicks);
        self.cost = self.cost.saturating_add(other.cost);
        self.conversions = self.conversions.saturating_add(other.conversions);
        self.all_conversions = self.all_conversions.saturating_add(other.all_conversions);
        self.rows = self.rows.saturating_add(other.rows);
    }

    /// True when every counter is zero (rows may still have been seen).
    pub fn has_no_activity(&self) -> bool {
        self.impressions == 0
            && self.clicks == 0
            && self.cost.is_zero()
            && self.conversions.is_zero()
            && self.all_conversions.is_zero()
    }

    fn counters(&self) -> [(&'static str, i128); 6] {
        [
            ("impressions", self.impressions as i128),
            ("clicks", self.clicks as i128),
            ("cost", self.cost.0 as i128),
            ("conversions", self.conversions.0 as i128),
            ("all_conversions", self.all_conversions.0 as i128),
            ("rows", self.rows as i128),
        ]
    }
}

/// Buckets for one grouping (e.g. per campaign, or per campaign and date)
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    pub dimensions: Vec<Dimension>,
    pub buckets: BTreeMap<DimensionKey, AggregateBucket>,
}

impl Grouping {
    fn new(dimensions: Vec<Dimension>) -> Self {
        Self {
            dimensions,
            buckets: BTreeMap::new(),
        }
    }

    pub fn label(&self) -> String {
        if self.dimensions.is_empty() {
            return "all".to_string();
        }
        self.dimensions
            .iter()
            .map(|d| d.name())
            .collect::<Vec<_>>()
            .join("+")
    }

    fn key_for(&self, row: &MetricRow) -> DimensionKey {
        self.dimensions.iter().map(|d| row.dimension_key(*d)).collect()
    }

    /// Sum of every bucket in this grouping
    pub fn sum(&self) -> AggregateBucket {
        let mut total = AggregateBucket::default();
        for bucket in self.buckets.values() {
            total.merge(bucket);
        }
        total
    }
}

/// Aggregated view of one full period for one client
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSummary {
    pub groupings: Vec<Grouping>,
    pub totals: AggregateBucket,
    pub metrics: DerivedMetrics,
}

impl PeriodSummary {
    /// Summary with no rows, no groupings and all-zero metrics.
    pub fn empty() -> Self {
        Self {
            groupings: Vec::new(),
            totals: AggregateBucket::default(),
            metrics: DerivedMetrics::default(),
        }
    }

    /// Summary holding only a totals bucket, for callers that already have
    /// period totals (manual entry, single-row exports).
    pub fn from_totals(totals: AggregateBucket) -> Self {
        Self {
            groupings: Vec::new(),
            totals,
            metrics: DerivedMetrics::derive(&totals),
        }
    }

    pub fn grouping(&self, dimensions: &[Dimension]) -> Option<&Grouping> {
        self.groupings.iter().find(|g| g.dimensions == dimensions)
    }

    /// Check every grouping's bucket sums against the independently
    /// accumulated totals.
    pub fn verify_totals(&self) -> Result<()> {
        for grouping in &self.groupings {
            let summed = grouping.sum();
            for ((counter, buckets), (_, totals)) in
                summed.counters().into_iter().zip(self.totals.counters())
            {
                if buckets != totals {
                    return Err(ReportError::TotalsMismatch {
                        grouping: grouping.label(),
                        counter,
                        buckets,
                        totals,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Aggregator for period summaries
pub struct Aggregator;

impl Aggregator {
    /// Aggregate rows under a single dimension-key tuple.
    pub fn aggregate(rows: &[MetricRow], dimensions: &[Dimension]) -> PeriodSummary {
        Self::aggregate_many(rows, &[dimensions.to_vec()])
    }

    /// Per-campaign and per-date buckets from the same pass.
    pub fn campaign_and_daily(rows: &[MetricRow]) -> PeriodSummary {
        Self::aggregate_many(rows, &[vec![Dimension::Campaign], vec![Dimension::Date]])
    }

    /// Aggregate rows under several groupings in one traversal.
    /// Totals are accumulated directly from the rows, not from the buckets.
    pub fn aggregate_many(rows: &[MetricRow], groupings: &[Vec<Dimension>]) -> PeriodSummary {
        let mut maps: Vec<Grouping> = groupings.iter().cloned().map(Grouping::new).collect();
        let mut totals = AggregateBucket::default();

        for row in rows {
            for grouping in maps.iter_mut() {
                let key = grouping.key_for(row);
                grouping.buckets.entry(key).or_default().add(row);
            }
            totals.add(row);
        }

        PeriodSummary {
            groupings: maps,
            metrics: DerivedMetrics::derive(&totals),
            totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn row(campaign: &str, d: u32, impressions: u64, clicks: u64, cost: f64, conv: f64) -> MetricRow {
        MetricRow::new(campaign)
            .with_date(day(d))
            .with_counts(impressions, clicks, cost, conv)
    }

    fn sample_rows() -> Vec<MetricRow> {
        vec![
            row("Brand", 5, 1000, 50, 25.10, 2.5),
            row("Generic", 5, 4000, 120, 80.33, 4.0),
            row("Brand", 6, 1500, 70, 31.07, 0.333333),
            row("Generic", 6, 3500, 90, 60.0, 3.25),
            row("Retargeting", 7, 200, 5, 1.99, 0.0),
        ]
    }

    // ========== aggregate() ==========

    #[test]
    fn test_aggregate_empty_rows() {
        let summary = Aggregator::campaign_and_daily(&[]);
        assert_eq!(summary.totals, AggregateBucket::default());
        assert_eq!(summary.metrics, DerivedMetrics::default());
        assert!(summary.groupings.iter().all(|g| g.buckets.is_empty()));
        assert!(summary.verify_totals().is_ok());
    }

    #[test]
    fn test_aggregate_by_campaign() {
        let summary = Aggregator::aggregate(&sample_rows(), &[Dimension::Campaign]);
        let grouping = summary.grouping(&[Dimension::Campaign]).unwrap();

        assert_eq!(grouping.buckets.len(), 3);
        let brand = &grouping.buckets[&vec!["Brand".to_string()]];
        assert_eq!(brand.impressions, 2500);
        assert_eq!(brand.clicks, 120);
        assert_eq!(brand.cost, Micros(56_170_000));
        assert_eq!(brand.conversions, Micros(2_833_333));
        assert_eq!(brand.rows, 2);
    }

    #[test]
    fn test_campaign_and_daily_single_pass() {
        let summary = Aggregator::campaign_and_daily(&sample_rows());

        let daily = summary.grouping(&[Dimension::Date]).unwrap();
        let keys: Vec<&str> = daily.buckets.keys().map(|k| k[0].as_str()).collect();
        assert_eq!(keys, vec!["2026-01-05", "2026-01-06", "2026-01-07"]);
        assert_eq!(daily.buckets[&vec!["2026-01-05".to_string()]].clicks, 170);

        assert!(summary.grouping(&[Dimension::Campaign]).is_some());
        assert_eq!(summary.totals.rows, 5);
        assert_eq!(summary.totals.clicks, 335);
    }

    #[test]
    fn test_composite_key_grouping() {
        let summary =
            Aggregator::aggregate(&sample_rows(), &[Dimension::Campaign, Dimension::Date]);
        let grouping = summary
            .grouping(&[Dimension::Campaign, Dimension::Date])
            .unwrap();
        assert_eq!(grouping.buckets.len(), 5);
        assert_eq!(grouping.label(), "campaign+date");
        assert!(grouping
            .buckets
            .contains_key(&vec!["Generic".to_string(), "2026-01-06".to_string()]));
    }

    #[test]
    fn test_missing_counters_are_zero() {
        let rows = vec![MetricRow::new("Brand"), row("Brand", 5, 10, 1, 0.5, 0.0)];
        let summary = Aggregator::aggregate(&rows, &[Dimension::Campaign]);
        assert_eq!(summary.totals.impressions, 10);
        assert_eq!(summary.totals.rows, 2);
    }

    // ========== properties ==========

    #[test]
    fn test_order_independence() {
        let rows = sample_rows();
        let baseline = Aggregator::campaign_and_daily(&rows);

        let mut reversed = rows.clone();
        reversed.reverse();
        assert_eq!(Aggregator::campaign_and_daily(&reversed), baseline);

        for shift in 1..rows.len() {
            let mut rotated = rows.clone();
            rotated.rotate_left(shift);
            assert_eq!(Aggregator::campaign_and_daily(&rotated), baseline);
        }

        let mut swapped = rows.clone();
        swapped.swap(0, 3);
        swapped.swap(1, 4);
        assert_eq!(Aggregator::campaign_and_daily(&swapped), baseline);
    }

    #[test]
    fn test_totals_cross_check() {
        let summary = Aggregator::aggregate_many(
            &sample_rows(),
            &[
                vec![Dimension::Campaign],
                vec![Dimension::Date],
                vec![Dimension::Device],
                vec![Dimension::Campaign, Dimension::Date],
            ],
        );
        for grouping in &summary.groupings {
            assert_eq!(grouping.sum(), summary.totals);
        }
        assert!(summary.verify_totals().is_ok());
    }

    #[test]
    fn test_verify_totals_detects_mismatch() {
        let mut summary = Aggregator::campaign_and_daily(&sample_rows());
        let grouping = &mut summary.groupings[0];
        if let Some(bucket) = grouping.buckets.values_mut().next() {
            bucket.clicks += 1;
        }
        let err = summary.verify_totals().unwrap_err();
        assert!(matches!(
            err,
            ReportError::TotalsMismatch { counter: "clicks", .. }
        ));
    }

    #[test]
    fn test_from_totals_derives_metrics() {
        let mut totals = AggregateBucket::default();
        totals.add(&MetricRow::new("x").with_counts(1000, 50, 25.0, 5.0));
        let summary = PeriodSummary::from_totals(totals);
        assert!((summary.metrics.ctr - 5.0).abs() < 1e-9);
        assert!(summary.groupings.is_empty());
    }

    #[test]
    fn test_has_no_activity() {
        let mut bucket = AggregateBucket::default();
        bucket.add(&MetricRow::new("idle"));
        assert!(bucket.has_no_activity());
        assert_eq!(bucket.rows, 1);
    }
}
