// View model for the report renderer.
//
// Everything here is presentation data: formatted values, change
// indicators, badges and sorted tables. Colors and glyphs are tokens; the
// renderer owns the markup.

use crate::aggregate::{AggregateBucket, DimensionKey, Grouping, PeriodSummary};
use crate::compare::{Comparison, Delta, Direction, MetricName};
use crate::config::{BadgeThresholds, ClientConfig, ReportConfig};
use crate::insights::{Analysis, ExecutiveSummary, Insight, InsightCategory, InsightKind};
use crate::metrics::DerivedMetrics;
use crate::period::ReportPeriod;
use crate::types::{CampaignRow, ChangeArrow, ChangeTone, DailyPoint, Dimension, MetricTableRow};
use crate::util::{
    format_count, format_currency, format_currency_exact, format_int, format_number,
    format_percent, format_signed_percent,
};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// KPI cards in display order; the first two are highlighted.
pub const KPI_CARDS: [MetricName; 7] = [
    MetricName::Cost,
    MetricName::Ctr,
    MetricName::Cpc,
    MetricName::Clicks,
    MetricName::Impressions,
    MetricName::Conversions,
    MetricName::Cpl,
];

#[derive(Debug, Clone, Serialize)]
pub struct ReportHeader {
    pub brand: String,
    pub title: String,
    pub client_name: String,
    pub client_slug: String,
    pub period_label: String,
    pub previous_label: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub report_id: String,
    pub generated_on: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeIndicator {
    pub arrow: ChangeArrow,
    pub tone: ChangeTone,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeLevel {
    Excellent,
    Good,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub level: BadgeLevel,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KpiCard {
    pub metric: MetricName,
    pub label: String,
    pub value: String,
    pub highlight: bool,
    pub change: ChangeIndicator,
    pub badge: Option<Badge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IconToken {
    Check,
    Alert,
    Arrow,
}

impl IconToken {
    pub fn for_category(category: InsightCategory) -> Self {
        match category {
            InsightCategory::Success => IconToken::Check,
            InsightCategory::Warning => IconToken::Alert,
            InsightCategory::Info => IconToken::Arrow,
        }
    }

    /// Plain-text glyph for console output
    pub fn glyph(self) -> &'static str {
        match self {
            IconToken::Check => "✓",
            IconToken::Alert => "!",
            IconToken::Arrow => "→",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightView {
    pub kind: InsightKind,
    pub category: InsightCategory,
    pub icon: IconToken,
    pub title: String,
    pub body: String,
}

impl From<&Insight> for InsightView {
    fn from(insight: &Insight) -> Self {
        Self {
            kind: insight.kind,
            category: insight.category,
            icon: IconToken::for_category(insight.category),
            title: insight.title.clone(),
            body: insight.body.clone(),
        }
    }
}

/// Everything the renderer needs for one client's report
#[derive(Debug, Clone, Serialize)]
pub struct ViewModel {
    pub header: ReportHeader,
    /// False when the current period recorded no activity at all.
    pub has_data: bool,
    pub summary: ExecutiveSummary,
    pub kpis: Vec<KpiCard>,
    pub metric_table: Vec<MetricTableRow>,
    pub campaigns: Vec<CampaignRow>,
    pub daily: Vec<DailyPoint>,
    pub insights: Vec<InsightView>,
    pub recommendations: Vec<String>,
    pub comparison: Comparison,
    pub totals: AggregateBucket,
    pub previous_totals: AggregateBucket,
    pub metrics: DerivedMetrics,
    pub previous_metrics: DerivedMetrics,
}

pub struct ViewModelBuilder<'a> {
    config: &'a ReportConfig,
    client: &'a ClientConfig,
    period: ReportPeriod,
    generated_on: NaiveDate,
}

impl<'a> ViewModelBuilder<'a> {
    pub fn new(config: &'a ReportConfig, client: &'a ClientConfig, period: ReportPeriod) -> Self {
        Self {
            config,
            client,
            period,
            generated_on: Local::now().date_naive(),
        }
    }

    pub fn generated_on(mut self, date: NaiveDate) -> Self {
        self.generated_on = date;
        self
    }

    pub fn build(
        &self,
        current: &PeriodSummary,
        previous: &PeriodSummary,
        analysis: &Analysis,
    ) -> ViewModel {
        let vs = if self.period.days() == 7 {
            " vs last week"
        } else {
            " vs previous period"
        };
        let comparison = &analysis.comparison;
        let badges = &self.config.thresholds.badges;

        let kpis = KPI_CARDS
            .iter()
            .enumerate()
            .filter_map(|(i, metric)| {
                let delta = comparison.get(*metric)?;
                Some(KpiCard {
                    metric: *metric,
                    label: kpi_label(*metric).to_string(),
                    value: kpi_value(*metric, delta.current_value),
                    highlight: i < 2,
                    change: change_indicator(delta, vs),
                    badge: badge(delta, current.totals.clicks, badges),
                })
            })
            .collect();

        ViewModel {
            header: self.header(),
            has_data: !current.totals.has_no_activity(),
            summary: analysis.summary.clone(),
            kpis,
            metric_table: metric_table(comparison),
            campaigns: campaign_rows(current),
            daily: daily_points(current, &self.period),
            insights: analysis.insights.iter().map(InsightView::from).collect(),
            recommendations: analysis.recommendations.numbered(),
            comparison: comparison.clone(),
            totals: current.totals,
            previous_totals: previous.totals,
            metrics: current.metrics,
            previous_metrics: previous.metrics,
        }
    }

    fn header(&self) -> ReportHeader {
        let title = if self.period.days() == 7 {
            "Weekly Ads Performance Report"
        } else {
            "Ads Performance Report"
        };
        ReportHeader {
            brand: self.config.brand.clone(),
            title: title.to_string(),
            client_name: self.client.name.clone(),
            client_slug: self.client.slug.clone(),
            period_label: self.period.label(),
            previous_label: self.period.previous().label(),
            period_start: self.period.start,
            period_end: self.period.end,
            report_id: self
                .period
                .report_id(&self.config.report_id_prefix, &self.client.slug),
            generated_on: self.generated_on.format("%B %-d, %Y").to_string(),
        }
    }
}

fn kpi_label(metric: MetricName) -> &'static str {
    match metric {
        MetricName::Cost => "Total Spend",
        MetricName::Ctr => "Click-Through Rate",
        MetricName::Cpc => "Avg. Cost Per Click",
        MetricName::Clicks => "Total Clicks",
        other => other.label(),
    }
}

fn kpi_value(metric: MetricName, value: f64) -> String {
    match metric {
        MetricName::Cost => format_currency(value),
        other => format_metric(other, value),
    }
}

/// Table formatting for one metric value.
pub fn format_metric(metric: MetricName, value: f64) -> String {
    match metric {
        MetricName::Cost => format_currency_exact(value),
        MetricName::Impressions | MetricName::Clicks => format_count(value),
        MetricName::Conversions => format_number(value, 1),
        MetricName::Ctr | MetricName::Cvr => format_percent(value),
        MetricName::Cpc | MetricName::Cpl => format_currency(value),
    }
}

fn change_tone(direction: Direction) -> ChangeTone {
    match direction {
        Direction::Up => ChangeTone::Positive,
        Direction::Down => ChangeTone::Negative,
        Direction::Flat => ChangeTone::Neutral,
    }
}

pub fn change_indicator(delta: &Delta, vs: &str) -> ChangeIndicator {
    let change = delta.percent_change;
    let arrow = match delta.direction {
        Direction::Flat => ChangeArrow::Flat,
        _ if change > 0.0 => ChangeArrow::Up,
        _ => ChangeArrow::Down,
    };
    let text = if delta.metric == MetricName::Ctr && delta.previous_value == 0.0 {
        "Industry avg: 2-3%".to_string()
    } else if delta.direction == Direction::Flat {
        "No change".to_string()
    } else {
        let suffix = match delta.metric {
            MetricName::Cost if change < 0.0 => " cost savings",
            MetricName::Cpc if change < 0.0 => " more efficient",
            _ => vs,
        };
        format!("{}{}", format_signed_percent(change, 1), suffix)
    };
    ChangeIndicator {
        arrow,
        tone: change_tone(delta.direction),
        text,
    }
}

/// Performance badge for a KPI card, if the metric earns one.
pub fn badge(delta: &Delta, clicks: u64, t: &BadgeThresholds) -> Option<Badge> {
    let make = |level, label: &str| {
        Some(Badge {
            level,
            label: label.to_string(),
        })
    };
    let value = delta.current_value;
    match delta.metric {
        MetricName::Ctr if value >= t.ctr_excellent => make(BadgeLevel::Excellent, "Excellent"),
        MetricName::Ctr if value >= t.ctr_good => make(BadgeLevel::Good, "Strong"),
        MetricName::Cpc if clicks == 0 && t.cpc_requires_clicks => None,
        MetricName::Cpc if value < t.cpc_excellent => make(BadgeLevel::Excellent, "Efficient"),
        MetricName::Cpc if value < t.cpc_good => make(BadgeLevel::Good, "Good"),
        MetricName::Clicks if delta.percent_change > t.clicks_surge => make(
            BadgeLevel::Excellent,
            &format!("+{:.0}%", delta.percent_change),
        ),
        MetricName::Clicks if delta.percent_change.abs() < t.clicks_stable => {
            make(BadgeLevel::Good, "Stable")
        }
        _ => None,
    }
}

/// Detailed metrics table, one row per compared metric.
pub fn metric_table(comparison: &Comparison) -> Vec<MetricTableRow> {
    comparison
        .deltas
        .iter()
        .map(|d| MetricTableRow {
            metric: d.metric.label().to_string(),
            current: format_metric(d.metric, d.current_value),
            previous: format_metric(d.metric, d.previous_value),
            change: format_signed_percent(d.percent_change, 2),
            tone: change_tone(d.direction),
        })
        .collect()
}

/// Buckets of a grouping ordered by cost descending, ties by key ascending.
pub fn ranked_buckets(grouping: &Grouping) -> Vec<(&DimensionKey, &AggregateBucket)> {
    let mut entries: Vec<_> = grouping.buckets.iter().collect();
    entries.sort_by(|a, b| b.1.cost.cmp(&a.1.cost).then_with(|| a.0.cmp(b.0)));
    entries
}

pub fn campaign_rows(summary: &PeriodSummary) -> Vec<CampaignRow> {
    let Some(grouping) = summary.grouping(&[Dimension::Campaign]) else {
        return Vec::new();
    };
    ranked_buckets(grouping)
        .into_iter()
        .map(|(key, bucket)| {
            let m = DerivedMetrics::derive(bucket);
            CampaignRow {
                campaign: key.join(" / "),
                spend: format_currency_exact(bucket.cost.as_units()),
                impressions: format_int(bucket.impressions),
                clicks: format_int(bucket.clicks),
                conversions: format_number(bucket.conversions.as_units(), 1),
                cpl: format_currency(m.cpl),
                cvr: format!("{}%", format_number(m.cvr, 1)),
            }
        })
        .collect()
}

/// Daily spend and conversions, ascending, with every day of the period
/// present (zero when nothing ran).
pub fn daily_points(summary: &PeriodSummary, period: &ReportPeriod) -> Vec<DailyPoint> {
    let by_date: BTreeMap<NaiveDate, AggregateBucket> = summary
        .grouping(&[Dimension::Date])
        .map(|g| {
            g.buckets
                .iter()
                .filter_map(|(key, bucket)| {
                    let date = NaiveDate::parse_from_str(key.first()?, "%Y-%m-%d").ok()?;
                    Some((date, *bucket))
                })
                .collect()
        })
        .unwrap_or_default();

    let dates: BTreeSet<NaiveDate> = period.dates().chain(by_date.keys().copied()).collect();
    dates
        .into_iter()
        .map(|date| {
            let bucket = by_date.get(&date).copied().unwrap_or_default();
            DailyPoint {
                date,
                label: date.format("%a %m/%d").to_string(),
                conversions: bucket.conversions.as_units(),
                spend: bucket.cost.as_units(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::insights::InsightEngine;
    use crate::types::MetricRow;

    fn date(m: u32, d: u32) -> NaiveDate {
        let y = if m == 12 { 2025 } else { 2026 };
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn client() -> ClientConfig {
        ClientConfig {
            slug: "acme".into(),
            name: "Acme Dental".into(),
            customer_id: String::new(),
            email: None,
            cc: Vec::new(),
        }
    }

    fn build(current_rows: &[MetricRow], previous_rows: &[MetricRow]) -> ViewModel {
        let config = ReportConfig::default();
        let client = client();
        let period = ReportPeriod::ending(date(1, 11), 7).unwrap();
        let current = Aggregator::campaign_and_daily(current_rows);
        let previous = Aggregator::campaign_and_daily(previous_rows);
        let analysis = InsightEngine::new(config.thresholds.clone()).analyze(&current, &previous);
        ViewModelBuilder::new(&config, &client, period)
            .generated_on(date(1, 12))
            .build(&current, &previous, &analysis)
    }

    fn scenario() -> ViewModel {
        let current = vec![
            MetricRow::new("Brand")
                .with_date(date(1, 5))
                .with_counts(6000, 300, 150.0, 15.0),
            MetricRow::new("Generic")
                .with_date(date(1, 6))
                .with_counts(4000, 200, 100.0, 10.0),
        ];
        let previous = vec![MetricRow::new("Brand")
            .with_date(date(12, 30))
            .with_counts(8000, 300, 300.0, 20.0)];
        build(&current, &previous)
    }

    fn card(vm: &ViewModel, metric: MetricName) -> &KpiCard {
        vm.kpis.iter().find(|k| k.metric == metric).unwrap()
    }

    // ========== header ==========

    #[test]
    fn test_header() {
        let vm = scenario();
        assert_eq!(vm.header.client_name, "Acme Dental");
        assert_eq!(vm.header.period_label, "January 5 - 11, 2026");
        assert_eq!(vm.header.previous_label, "December 29, 2025 - January 4, 2026");
        assert_eq!(vm.header.report_id, "RPT-ACM-2026-W02");
        assert_eq!(vm.header.generated_on, "January 12, 2026");
        assert_eq!(vm.header.title, "Weekly Ads Performance Report");
        assert!(vm.has_data);
    }

    // ========== KPI cards ==========

    #[test]
    fn test_kpi_change_indicators() {
        let vm = scenario();
        assert_eq!(vm.kpis.len(), KPI_CARDS.len());

        let spend = card(&vm, MetricName::Cost);
        assert_eq!(spend.value, "$250.00");
        assert!(spend.highlight);
        assert_eq!(spend.change.text, "-16.7% cost savings");
        assert_eq!(spend.change.arrow, ChangeArrow::Down);
        assert_eq!(spend.change.tone, ChangeTone::Positive);

        let clicks = card(&vm, MetricName::Clicks);
        assert_eq!(clicks.value, "500");
        assert_eq!(clicks.change.text, "+66.7% vs last week");
        assert_eq!(clicks.change.arrow, ChangeArrow::Up);

        let cpc = card(&vm, MetricName::Cpc);
        assert_eq!(cpc.value, "$0.50");
        assert_eq!(cpc.change.text, "-50.0% more efficient");
        assert_eq!(cpc.change.tone, ChangeTone::Positive);

        let ctr = card(&vm, MetricName::Ctr);
        assert_eq!(ctr.value, "5.00%");
        assert_eq!(ctr.change.text, "+33.3% vs last week");
    }

    #[test]
    fn test_kpi_badges() {
        let vm = scenario();
        assert_eq!(
            card(&vm, MetricName::Ctr).badge,
            Some(Badge {
                level: BadgeLevel::Good,
                label: "Strong".into()
            })
        );
        // $0.50 is not below the "good" limit.
        assert_eq!(card(&vm, MetricName::Cpc).badge, None);
        assert_eq!(
            card(&vm, MetricName::Clicks).badge,
            Some(Badge {
                level: BadgeLevel::Excellent,
                label: "+67%".into()
            })
        );
        assert_eq!(card(&vm, MetricName::Impressions).badge, None);
    }

    #[test]
    fn test_badge_thresholds() {
        let t = BadgeThresholds::default();
        let delta = |metric, current_value, percent_change| Delta {
            metric,
            current_value,
            previous_value: 1.0,
            percent_change,
            direction: Direction::Flat,
        };
        let level = |b: Option<Badge>| b.map(|b| b.level);

        assert_eq!(level(badge(&delta(MetricName::Ctr, 12.0, 0.0), 1, &t)), Some(BadgeLevel::Excellent));
        assert_eq!(level(badge(&delta(MetricName::Ctr, 4.9, 0.0), 1, &t)), None);
        assert_eq!(level(badge(&delta(MetricName::Cpc, 0.15, 0.0), 10, &t)), Some(BadgeLevel::Excellent));
        assert_eq!(level(badge(&delta(MetricName::Cpc, 0.35, 0.0), 10, &t)), Some(BadgeLevel::Good));
        assert_eq!(level(badge(&delta(MetricName::Cpc, 0.0, 0.0), 0, &t)), Some(BadgeLevel::Excellent));
        assert_eq!(level(badge(&delta(MetricName::Clicks, 10.0, 3.0), 10, &t)), Some(BadgeLevel::Good));
        assert_eq!(level(badge(&delta(MetricName::Clicks, 10.0, 20.0), 10, &t)), None);
    }

    #[test]
    fn test_cpc_badge_without_clicks() {
        let mut t = BadgeThresholds::default();
        let idle = Delta {
            metric: MetricName::Cpc,
            current_value: 0.0,
            previous_value: 0.0,
            percent_change: 0.0,
            direction: Direction::Flat,
        };
        assert_eq!(
            badge(&idle, 0, &t),
            Some(Badge {
                level: BadgeLevel::Excellent,
                label: "Efficient".into()
            })
        );
        t.cpc_requires_clicks = true;
        assert_eq!(badge(&idle, 0, &t), None);
        assert!(badge(&Delta { current_value: 0.1, ..idle }, 4, &t).is_some());
    }

    // ========== tables ==========

    #[test]
    fn test_metric_table() {
        let vm = scenario();
        assert_eq!(vm.metric_table.len(), MetricName::ALL.len());
        let spend = &vm.metric_table[0];
        assert_eq!(spend.metric, "Total Ad Spend");
        assert_eq!(spend.current, "$250.00");
        assert_eq!(spend.previous, "$300.00");
        assert_eq!(spend.change, "-16.67%");
        assert_eq!(spend.tone, ChangeTone::Positive);

        let clicks = vm
            .metric_table
            .iter()
            .find(|r| r.metric == "Clicks")
            .unwrap();
        assert_eq!(clicks.change, "+66.67%");
        assert_eq!(clicks.current, "500");
    }

    #[test]
    fn test_large_spend_formats() {
        let current = vec![MetricRow::new("Big").with_counts(10_000, 500, 1500.0, 25.0)];
        let vm = build(&current, &[]);
        assert_eq!(card(&vm, MetricName::Cost).value, "$1,500");
        let spend = vm
            .metric_table
            .iter()
            .find(|r| r.metric == MetricName::Cost.label())
            .unwrap();
        assert_eq!(spend.current, "$1,500.00");
        assert_eq!(vm.campaigns[0].spend, "$1,500.00");
        assert!(vm.summary.text.ends_with("Total investment of $1,500.00."));
    }

    #[test]
    fn test_campaign_rows_sorted_by_cost_then_name() {
        let rows = vec![
            MetricRow::new("Zeta").with_counts(100, 10, 50.0, 1.0),
            MetricRow::new("Alpha").with_counts(100, 10, 50.0, 2.0),
            MetricRow::new("Big").with_counts(1000, 100, 1500.0, 30.0),
            MetricRow::new("Small").with_counts(10, 1, 0.5, 0.0),
        ];
        let summary = Aggregator::campaign_and_daily(&rows);
        let campaigns = campaign_rows(&summary);
        let names: Vec<&str> = campaigns.iter().map(|c| c.campaign.as_str()).collect();
        assert_eq!(names, vec!["Big", "Alpha", "Zeta", "Small"]);

        assert_eq!(campaigns[0].spend, "$1,500.00");
        assert_eq!(campaigns[0].cpl, "$50.00");
        assert_eq!(campaigns[0].cvr, "30.0%");
        assert_eq!(campaigns[3].cpl, "$0.00");
    }

    #[test]
    fn test_daily_points_cover_period() {
        let vm = scenario();
        assert_eq!(vm.daily.len(), 7);
        assert_eq!(vm.daily[0].label, "Mon 01/05");
        assert!((vm.daily[0].spend - 150.0).abs() < 1e-9);
        assert!((vm.daily[1].conversions - 10.0).abs() < 1e-9);
        assert_eq!(vm.daily[6].spend, 0.0);
        assert!(vm.daily.windows(2).all(|w| w[0].date < w[1].date));
    }

    // ========== insights ==========

    #[test]
    fn test_insights_and_recommendations() {
        let vm = scenario();
        assert_eq!(vm.insights.len(), 2);
        assert_eq!(vm.insights[0].icon, IconToken::Check);
        assert_eq!(vm.insights[1].kind, InsightKind::ExceptionalScale);
        assert!(vm.recommendations[0].starts_with("1) "));
        assert!(vm.recommendations.len() <= 4);
    }

    // ========== degenerate input ==========

    #[test]
    fn test_empty_periods() {
        let vm = build(&[], &[]);
        assert!(!vm.has_data);
        assert!(vm.campaigns.is_empty());
        assert_eq!(vm.daily.len(), 7);
        assert_eq!(card(&vm, MetricName::Cost).change.text, "No change");
        assert_eq!(card(&vm, MetricName::Ctr).change.text, "Industry avg: 2-3%");
        assert_eq!(
            card(&vm, MetricName::Cpc).badge.as_ref().map(|b| b.level),
            Some(BadgeLevel::Excellent)
        );
        assert_eq!(vm.insights.len(), 1);
        assert_eq!(vm.insights[0].icon, IconToken::Alert);
        assert!(vm.recommendations.len() >= 2);
    }

    #[test]
    fn test_view_model_serializes() {
        let json = serde_json::to_value(scenario()).unwrap();
        assert_eq!(json["header"]["report_id"], "RPT-ACM-2026-W02");
        assert_eq!(json["kpis"][0]["change"]["tone"], "positive");
        assert_eq!(json["insights"][0]["icon"], "check");
    }
}
