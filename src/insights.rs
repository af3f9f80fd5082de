// Rule-based insight engine.
//
// Four rule tables read the same period deltas:
// - CTR tiers: first match wins, exactly one insight per report.
// - Secondary volume/efficiency rules: first match wins, at most one.
// - Recommendation rules: every rule that fires contributes lines.
// - Executive-summary tone: first match wins, evaluated on its own.
//
// Thresholds come from `Thresholds`; the tables only fix rule order.

use crate::aggregate::PeriodSummary;
use crate::compare::{Comparison, MetricName, PeriodComparator};
use crate::config::{
    CtrTierThresholds, RecommendationThresholds, SecondaryThresholds, Thresholds, ToneThresholds,
};
use crate::util::{format_count, format_currency, format_currency_exact, format_percent};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Success,
    Info,
    Warning,
}

/// Which rule produced an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    CtrOutstanding,
    CtrStrong,
    CtrSolid,
    CtrOpportunity,
    ExceptionalScale,
    ImprovedEfficiency,
    VolumeDecline,
    CostSavings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub category: InsightCategory,
    pub title: String,
    pub body: String,
}

/// The values every rule table reads, taken from one [`Comparison`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Signals {
    pub ctr: f64,
    pub prev_ctr: f64,
    pub cpc: f64,
    pub prev_cpc: f64,
    pub clicks: f64,
    pub spend: f64,
    pub clicks_change: f64,
    pub spend_change: f64,
    pub cpc_change: f64,
    pub ctr_change: f64,
}

impl Signals {
    pub fn from_comparison(cmp: &Comparison) -> Self {
        let current = |m| cmp.get(m).map(|d| d.current_value).unwrap_or(0.0);
        let previous = |m| cmp.get(m).map(|d| d.previous_value).unwrap_or(0.0);
        Self {
            ctr: current(MetricName::Ctr),
            prev_ctr: previous(MetricName::Ctr),
            cpc: current(MetricName::Cpc),
            prev_cpc: previous(MetricName::Cpc),
            clicks: current(MetricName::Clicks),
            spend: current(MetricName::Cost),
            clicks_change: cmp.change(MetricName::Clicks),
            spend_change: cmp.change(MetricName::Cost),
            cpc_change: cmp.change(MetricName::Cpc),
            ctr_change: cmp.change(MetricName::Ctr),
        }
    }

    /// CTR change as the insight and recommendation rules read it: zero
    /// when the previous period had no CTR to improve on.
    pub fn ctr_trend(&self) -> f64 {
        if self.prev_ctr > 0.0 {
            self.ctr_change
        } else {
            0.0
        }
    }
}

// CTR tiers

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CtrTier {
    Outstanding,
    Strong,
    Solid,
    Opportunity,
}

impl CtrTier {
    /// Highest tier first.
    pub const TABLE: [CtrTier; 4] = [
        CtrTier::Outstanding,
        CtrTier::Strong,
        CtrTier::Solid,
        CtrTier::Opportunity,
    ];

    fn lower_bound(self, t: &CtrTierThresholds) -> f64 {
        match self {
            CtrTier::Outstanding => t.outstanding,
            CtrTier::Strong => t.strong,
            CtrTier::Solid => t.solid,
            CtrTier::Opportunity => f64::NEG_INFINITY,
        }
    }

    pub fn classify(ctr: f64, t: &CtrTierThresholds) -> CtrTier {
        Self::TABLE
            .into_iter()
            .find(|tier| ctr >= tier.lower_bound(t))
            .unwrap_or(CtrTier::Opportunity)
    }

    fn insight(self, s: &Signals) -> Insight {
        let ctr = format_percent(s.ctr);
        let (kind, category, title, body) = match self {
            CtrTier::Outstanding => {
                let trend = s.ctr_trend();
                let follow_up = if trend > 5.0 {
                    format!(
                        "The +{:.1}% improvement over the previous period indicates strong ad relevance.",
                        trend
                    )
                } else {
                    "This indicates highly effective ad copy and targeting.".to_string()
                };
                (
                    InsightKind::CtrOutstanding,
                    InsightCategory::Success,
                    "Outstanding CTR Performance",
                    format!(
                        "A {} CTR is exceptional, approximately 5-7x the industry average. {}",
                        ctr, follow_up
                    ),
                )
            }
            CtrTier::Strong => (
                InsightKind::CtrStrong,
                InsightCategory::Success,
                "Strong Click-Through Rate",
                format!(
                    "A {} CTR is approximately 2x the industry average, indicating strong ad relevance and effective messaging.",
                    ctr
                ),
            ),
            CtrTier::Solid => (
                InsightKind::CtrSolid,
                InsightCategory::Info,
                "Solid CTR Performance",
                format!(
                    "A {} CTR is at or above industry average. Consider testing ad variations to improve engagement.",
                    ctr
                ),
            ),
            CtrTier::Opportunity => (
                InsightKind::CtrOpportunity,
                InsightCategory::Warning,
                "CTR Optimization Opportunity",
                format!(
                    "A {} CTR is below industry average (2-3%). Recommend testing new ad copy and reviewing keyword relevance.",
                    ctr
                ),
            ),
        };
        Insight {
            kind,
            category,
            title: title.to_string(),
            body,
        }
    }
}

// Secondary volume/efficiency rules

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryRule {
    ExceptionalScale,
    ImprovedEfficiency,
    VolumeDecline,
    CostSavings,
}

impl SecondaryRule {
    /// Priority order; the first rule that matches is the only one emitted.
    pub const TABLE: [SecondaryRule; 4] = [
        SecondaryRule::ExceptionalScale,
        SecondaryRule::ImprovedEfficiency,
        SecondaryRule::VolumeDecline,
        SecondaryRule::CostSavings,
    ];

    pub fn matches(self, s: &Signals, t: &SecondaryThresholds) -> bool {
        match self {
            SecondaryRule::ExceptionalScale => {
                s.clicks_change > t.scale_clicks_growth && s.cpc_change < 0.0
            }
            SecondaryRule::ImprovedEfficiency => s.cpc_change < t.efficiency_cpc_drop,
            SecondaryRule::VolumeDecline => s.clicks_change < t.decline_clicks_drop,
            SecondaryRule::CostSavings => {
                s.spend_change < t.savings_spend_drop
                    && s.clicks_change.abs() < t.savings_clicks_band
            }
        }
    }

    pub fn first_match(s: &Signals, t: &SecondaryThresholds) -> Option<SecondaryRule> {
        Self::TABLE.into_iter().find(|rule| rule.matches(s, t))
    }

    fn insight(self, s: &Signals) -> Insight {
        let (kind, category, title, body) = match self {
            SecondaryRule::ExceptionalScale => (
                InsightKind::ExceptionalScale,
                InsightCategory::Success,
                "Exceptional Scale Achievement",
                format!(
                    "Clicks increased {:.0}% while CPC decreased {:.0}%. The campaign successfully scaled with improved efficiency.",
                    s.clicks_change,
                    s.cpc_change.abs()
                ),
            ),
            SecondaryRule::ImprovedEfficiency => (
                InsightKind::ImprovedEfficiency,
                InsightCategory::Success,
                "Improved Cost Efficiency",
                format!(
                    "CPC dropped {:.0}% from {} to {}. This demonstrates excellent optimization results.",
                    s.cpc_change.abs(),
                    format_currency(s.prev_cpc),
                    format_currency(s.cpc)
                ),
            ),
            SecondaryRule::VolumeDecline => (
                InsightKind::VolumeDecline,
                InsightCategory::Warning,
                "Traffic Volume Decline",
                format!(
                    "Clicks decreased {:.0}% compared with the previous period. This may be due to seasonal factors, competitive pressure, or budget pacing. Recommend reviewing search impression share.",
                    s.clicks_change.abs()
                ),
            ),
            SecondaryRule::CostSavings => (
                InsightKind::CostSavings,
                InsightCategory::Success,
                "Cost Savings with Maintained Volume",
                format!(
                    "Spend decreased {:.0}% while maintaining click volume. The campaign is delivering the same traffic at lower cost.",
                    s.spend_change.abs()
                ),
            ),
        };
        Insight {
            kind,
            category,
            title: title.to_string(),
            body,
        }
    }
}

// Recommendations

/// Appended, in order, when too few rules fired.
pub const FALLBACK_RECOMMENDATIONS: [&str; 2] = [
    "Monitor competitive landscape for opportunities",
    "Test similar audiences to scale while maintaining efficiency",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationRule {
    ClickGrowth,
    ClickDecline,
    CtrDecline,
    CpcIncrease,
    CpcDecrease,
    LowCtr,
}

impl RecommendationRule {
    /// Priority order of the contributed lines.
    pub const TABLE: [RecommendationRule; 6] = [
        RecommendationRule::ClickGrowth,
        RecommendationRule::ClickDecline,
        RecommendationRule::CtrDecline,
        RecommendationRule::CpcIncrease,
        RecommendationRule::CpcDecrease,
        RecommendationRule::LowCtr,
    ];

    /// Rules fire independently, except that growth/decline and CPC
    /// increase/decrease are each an either-or pair.
    pub fn fires(self, s: &Signals, t: &RecommendationThresholds) -> bool {
        let growth = s.clicks_change > t.clicks_growth;
        let cpc_up = s.cpc_change > t.cpc_increase;
        match self {
            RecommendationRule::ClickGrowth => growth,
            RecommendationRule::ClickDecline => !growth && s.clicks_change < t.clicks_decline,
            RecommendationRule::CtrDecline => s.ctr_trend() < t.ctr_decline,
            RecommendationRule::CpcIncrease => cpc_up,
            RecommendationRule::CpcDecrease => !cpc_up && s.cpc_change < t.cpc_decrease,
            RecommendationRule::LowCtr => s.ctr < t.low_ctr,
        }
    }

    pub fn lines(self) -> &'static [&'static str] {
        match self {
            RecommendationRule::ClickGrowth => &[
                "Continue current strategy, the scaling approach is working well",
                "Monitor CTR trends as volume increases to ensure quality",
            ],
            RecommendationRule::ClickDecline => &[
                "Review search impression share to identify if budget or rank is limiting visibility",
                "Analyze search terms report for new keyword opportunities",
            ],
            RecommendationRule::CtrDecline => {
                &["Test new ad copy variations to improve click-through rate"]
            }
            RecommendationRule::CpcIncrease => {
                &["Review bid strategy and quality scores to improve efficiency"]
            }
            RecommendationRule::CpcDecrease => {
                &["Consider reinvesting cost savings to expand reach"]
            }
            RecommendationRule::LowCtr => {
                &["Test responsive search ads with more headline and description variations"]
            }
        }
    }
}

/// At most `max_lines` distinct recommendations, never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationList {
    items: Vec<String>,
}

impl RecommendationList {
    /// Deduplicate `candidates`, pad with fallbacks up to `min_lines`, then
    /// keep the first `max_lines`.
    pub fn build<I, S>(candidates: I, min_lines: usize, max_lines: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut items: Vec<String> = Vec::new();
        for line in candidates {
            let line = line.into();
            if !items.contains(&line) {
                items.push(line);
            }
        }
        for fallback in FALLBACK_RECOMMENDATIONS {
            if items.len() >= min_lines.max(1) {
                break;
            }
            if !items.iter().any(|l| l == fallback) {
                items.push(fallback.to_string());
            }
        }
        items.truncate(max_lines.max(1));
        Self { items }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `"1) ..."`, `"2) ..."` in priority order.
    pub fn numbered(&self) -> Vec<String> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{}) {}", i + 1, line))
            .collect()
    }
}

// Executive summary tone

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Outstanding,
    Strong,
    Soft,
    Solid,
}

impl Tone {
    pub const TABLE: [Tone; 4] = [Tone::Outstanding, Tone::Strong, Tone::Soft, Tone::Solid];

    fn matches(self, s: &Signals, t: &ToneThresholds) -> bool {
        match self {
            Tone::Outstanding => {
                s.clicks_change > t.outstanding_clicks
                    || (s.ctr_change > t.outstanding_ctr && s.cpc_change < t.outstanding_cpc)
            }
            Tone::Strong => s.clicks_change > t.strong_clicks || s.cpc_change < t.strong_cpc,
            Tone::Soft => s.clicks_change < t.soft_clicks || s.ctr_change < t.soft_ctr,
            Tone::Solid => true,
        }
    }

    pub fn select(s: &Signals, t: &ToneThresholds) -> Tone {
        Self::TABLE
            .into_iter()
            .find(|tone| tone.matches(s, t))
            .unwrap_or(Tone::Solid)
    }

    pub fn headline(self) -> &'static str {
        match self {
            Tone::Outstanding => "Outstanding period with exceptional performance.",
            Tone::Strong => "Strong performance this period.",
            Tone::Soft => "This period showed some softness in key metrics.",
            Tone::Solid => "Solid performance this period.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    pub tone: Tone,
    pub headline: String,
    pub highlights: Vec<String>,
    pub text: String,
}

// Engine

/// Everything the engine concludes about one pair of periods
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub comparison: Comparison,
    pub signals: Signals,
    pub summary: ExecutiveSummary,
    pub insights: Vec<Insight>,
    pub recommendations: RecommendationList,
}

#[derive(Debug, Clone, Default)]
pub struct InsightEngine {
    thresholds: Thresholds,
}

impl InsightEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn compare(&self, current: &PeriodSummary, previous: &PeriodSummary) -> Comparison {
        PeriodComparator::new(self.thresholds.flat_pct).compare(current, previous)
    }

    /// Ordered insights and recommendations for two periods.
    pub fn classify(
        &self,
        current: &PeriodSummary,
        previous: &PeriodSummary,
    ) -> (Vec<Insight>, RecommendationList) {
        let signals = Signals::from_comparison(&self.compare(current, previous));
        (self.insights(&signals), self.recommendations(&signals))
    }

    /// Comparison, tone, insights and recommendations in one call.
    pub fn analyze(&self, current: &PeriodSummary, previous: &PeriodSummary) -> Analysis {
        let comparison = self.compare(current, previous);
        let signals = Signals::from_comparison(&comparison);
        let summary = self.executive_summary(&signals);
        let insights = self.insights(&signals);
        let recommendations = self.recommendations(&signals);
        Analysis {
            comparison,
            signals,
            summary,
            insights,
            recommendations,
        }
    }

    pub fn insights(&self, s: &Signals) -> Vec<Insight> {
        let mut insights = vec![CtrTier::classify(s.ctr, &self.thresholds.ctr_tiers).insight(s)];
        if let Some(rule) = SecondaryRule::first_match(s, &self.thresholds.secondary) {
            insights.push(rule.insight(s));
        }
        insights
    }

    pub fn recommendations(&self, s: &Signals) -> RecommendationList {
        let t = &self.thresholds.recommendations;
        let candidates = RecommendationRule::TABLE
            .into_iter()
            .filter(|rule| rule.fires(s, t))
            .flat_map(|rule| rule.lines().iter().copied());
        RecommendationList::build(candidates, t.min_lines, t.max_lines)
    }

    pub fn tone(&self, s: &Signals) -> Tone {
        Tone::select(s, &self.thresholds.tone)
    }

    pub fn executive_summary(&self, s: &Signals) -> ExecutiveSummary {
        let tone = self.tone(s);
        let limit = self.thresholds.highlight_change;
        let mut highlights = Vec::new();

        if s.clicks_change.abs() > limit {
            let verb = if s.clicks_change > 0.0 { "increased" } else { "decreased" };
            highlights.push(format!(
                "Clicks {} {:.0}% to {}.",
                verb,
                s.clicks_change.abs(),
                format_count(s.clicks)
            ));
        }
        if s.ctr_change.abs() > limit {
            let verb = if s.ctr_change > 0.0 { "improved" } else { "declined" };
            highlights.push(format!("CTR {} to {}.", verb, format_percent(s.ctr)));
        }
        if s.cpc_change.abs() > limit {
            let verb = if s.cpc_change < 0.0 { "dropped" } else { "increased" };
            highlights.push(format!(
                "CPC {} {:.0}% to {}.",
                verb,
                s.cpc_change.abs(),
                format_currency(s.cpc)
            ));
        }
        highlights.push(format!(
            "Total investment of {}.",
            format_currency_exact(s.spend)
        ));

        let headline = tone.headline().to_string();
        let text = std::iter::once(headline.as_str())
            .chain(highlights.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        ExecutiveSummary {
            tone,
            headline,
            highlights,
            text,
        }
    }
}
