use crate::aggregate::PeriodSummary;
use serde::Serialize;
use std::fmt;

/// Movement of a metric, already adjusted for polarity: `Up` is always the
/// favorable direction, so a cost decrease is `Up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

/// Compared metrics, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    Cost,
    Impressions,
    Clicks,
    Conversions,
    Ctr,
    Cpc,
    Cpl,
    Cvr,
}

impl MetricName {
    pub const ALL: [MetricName; 8] = [
        MetricName::Cost,
        MetricName::Impressions,
        MetricName::Clicks,
        MetricName::Conversions,
        MetricName::Ctr,
        MetricName::Cpc,
        MetricName::Cpl,
        MetricName::Cvr,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetricName::Cost => "Total Ad Spend",
            MetricName::Impressions => "Impressions",
            MetricName::Clicks => "Clicks",
            MetricName::Conversions => "Conversions",
            MetricName::Ctr => "Click-Through Rate (CTR)",
            MetricName::Cpc => "Average CPC",
            MetricName::Cpl => "Cost Per Lead",
            MetricName::Cvr => "Conversion Rate",
        }
    }

    /// Metrics where a decrease is the favorable outcome.
    pub fn lower_is_better(self) -> bool {
        matches!(self, MetricName::Cost | MetricName::Cpc | MetricName::Cpl)
    }

    pub fn value_of(self, summary: &PeriodSummary) -> f64 {
        let totals = &summary.totals;
        let metrics = &summary.metrics;
        match self {
            MetricName::Cost => totals.cost.as_units(),
            MetricName::Impressions => totals.impressions as f64,
            MetricName::Clicks => totals.clicks as f64,
            MetricName::Conversions => totals.conversions.as_units(),
            MetricName::Ctr => metrics.ctr,
            MetricName::Cpc => metrics.cpc,
            MetricName::Cpl => metrics.cpl,
            MetricName::Cvr => metrics.cvr,
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Percent change from `previous` to `current`.
///
/// A zero baseline reports `0` when the current value is also zero and a
/// flat `100` otherwise, never infinity.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current == 0.0 { 0.0 } else { 100.0 };
    }
    ((current - previous) / previous) * 100.0
}

/// Classify a percent change. `invert` flips polarity for metrics where a
/// decrease is favorable. Changes with `|change| < flat_pct` are flat; a
/// `flat_pct` of zero means only an exact zero is flat.
pub fn direction(change: f64, invert: bool, flat_pct: f64) -> Direction {
    if change == 0.0 || change.abs() < flat_pct {
        return Direction::Flat;
    }
    let favorable = if invert { change < 0.0 } else { change > 0.0 };
    if favorable {
        Direction::Up
    } else {
        Direction::Down
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Delta {
    pub metric: MetricName,
    pub current_value: f64,
    pub previous_value: f64,
    pub percent_change: f64,
    pub direction: Direction,
}

/// Every metric's delta between two periods
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub deltas: Vec<Delta>,
}

impl Comparison {
    pub fn get(&self, metric: MetricName) -> Option<&Delta> {
        self.deltas.iter().find(|d| d.metric == metric)
    }

    /// Percent change for `metric`, zero when it was not compared.
    pub fn change(&self, metric: MetricName) -> f64 {
        self.get(metric).map(|d| d.percent_change).unwrap_or(0.0)
    }
}

pub struct PeriodComparator {
    flat_pct: f64,
}

impl PeriodComparator {
    pub fn new(flat_pct: f64) -> Self {
        Self { flat_pct }
    }

    pub fn delta(&self, metric: MetricName, current: f64, previous: f64) -> Delta {
        let change = percent_change(current, previous);
        Delta {
            metric,
            current_value: current,
            previous_value: previous,
            percent_change: change,
            direction: direction(change, metric.lower_is_better(), self.flat_pct),
        }
    }

    pub fn compare(&self, current: &PeriodSummary, previous: &PeriodSummary) -> Comparison {
        let deltas = MetricName::ALL
            .iter()
            .map(|m| self.delta(*m, m.value_of(current), m.value_of(previous)))
            .collect();
        Comparison { deltas }
    }
}
