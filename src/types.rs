use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// Fixed-point quantity in millionths of a unit.
///
/// Currency and fractional conversions are stored this way so that sums are
/// exact integers and do not depend on the order rows arrive in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Micros(pub i64);

impl Micros {
    pub const PER_UNIT: i64 = 1_000_000;
    pub const ZERO: Micros = Micros(0);

    /// Convert a decimal amount (dollars, conversions) to micros.
    /// Non-finite input becomes zero.
    pub fn from_units(value: f64) -> Self {
        if !value.is_finite() {
            return Self::ZERO;
        }
        Micros((value * Self::PER_UNIT as f64).round() as i64)
    }

    pub fn as_units(self) -> f64 {
        self.0 as f64 / Self::PER_UNIT as f64
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: Micros) -> Micros {
        Micros(self.0.saturating_add(other.0))
    }
}

/// Grouping key for aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Campaign,
    Date,
    Device,
}

impl Dimension {
    pub fn name(self) -> &'static str {
        match self {
            Dimension::Campaign => "campaign",
            Dimension::Date => "date",
            Dimension::Device => "device",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical observation produced by the ingestion adapters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub campaign: String,
    pub date: Option<NaiveDate>,
    pub device: Option<String>,
    pub status: Option<String>,
    pub account: Option<String>,
    pub customer_id: Option<String>,
    pub impressions: u64,
    pub clicks: u64,
    pub cost: Micros,
    pub conversions: Micros,
    pub all_conversions: Micros,
}

impl MetricRow {
    /// Row for `campaign` with every counter at zero.
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            date: None,
            device: None,
            status: None,
            account: None,
            customer_id: None,
            impressions: 0,
            clicks: 0,
            cost: Micros::ZERO,
            conversions: Micros::ZERO,
            all_conversions: Micros::ZERO,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Set the four headline counters; `cost` and `conversions` in units.
    pub fn with_counts(mut self, impressions: u64, clicks: u64, cost: f64, conversions: f64) -> Self {
        self.impressions = impressions;
        self.clicks = clicks;
        self.cost = Micros::from_units(cost);
        self.conversions = Micros::from_units(conversions);
        self
    }

    /// Key string for one dimension. Missing values get a stable placeholder.
    pub fn dimension_key(&self, dimension: Dimension) -> String {
        match dimension {
            Dimension::Campaign => self.campaign.clone(),
            Dimension::Date => self
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "(no date)".to_string()),
            Dimension::Device => self
                .device
                .clone()
                .unwrap_or_else(|| "(not set)".to_string()),
        }
    }
}

/// One row of a spreadsheet export. Every field is optional; absent counters
/// default to zero in the loader.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Campaign", alias = "campaign", alias = "Campaign name")]
    pub campaign: Option<String>,
    #[serde(rename = "Day", alias = "Date", alias = "date", alias = "day")]
    pub date: Option<String>,
    #[serde(rename = "Device", alias = "device")]
    pub device: Option<String>,
    #[serde(rename = "Campaign status", alias = "Status", alias = "status")]
    pub status: Option<String>,
    #[serde(rename = "Account", alias = "account", alias = "Account name")]
    pub account: Option<String>,
    #[serde(rename = "Customer ID", alias = "customer_id")]
    pub customer_id: Option<String>,
    #[serde(rename = "Impressions", alias = "Impr.", alias = "impressions")]
    pub impressions: Option<String>,
    #[serde(rename = "Clicks", alias = "clicks")]
    pub clicks: Option<String>,
    #[serde(rename = "Cost", alias = "Spend", alias = "cost", alias = "spend")]
    pub cost: Option<String>,
    #[serde(rename = "Conversions", alias = "Conv.", alias = "conversions")]
    pub conversions: Option<String>,
    #[serde(
        rename = "All conv.",
        alias = "All conversions",
        alias = "all_conversions"
    )]
    pub all_conversions: Option<String>,
}

/// Numeric field as returned by the ads API: int64 values arrive as JSON
/// strings, doubles as numbers.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NumberLike {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberLike {
    pub fn as_text(&self) -> String {
        match self {
            NumberLike::Int(v) => v.to_string(),
            NumberLike::Float(v) => v.to_string(),
            NumberLike::Text(s) => s.clone(),
        }
    }
}

/// One result row of an ads API search, e.g.
/// `{"campaign": {"name": ..}, "segments": {"date": ..}, "metrics": {..}}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiRow {
    pub customer: ApiCustomer,
    pub campaign: ApiCampaign,
    pub segments: ApiSegments,
    pub metrics: ApiMetrics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiCustomer {
    pub id: Option<NumberLike>,
    #[serde(alias = "descriptiveName")]
    pub descriptive_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiCampaign {
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiSegments {
    pub date: Option<String>,
    pub device: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiMetrics {
    pub impressions: Option<NumberLike>,
    pub clicks: Option<NumberLike>,
    #[serde(alias = "costMicros")]
    pub cost_micros: Option<NumberLike>,
    pub conversions: Option<NumberLike>,
    #[serde(alias = "allConversions")]
    pub all_conversions: Option<NumberLike>,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CampaignRow {
    #[serde(rename = "Campaign")]
    #[tabled(rename = "Campaign")]
    pub campaign: String,
    #[serde(rename = "Spend")]
    #[tabled(rename = "Spend")]
    pub spend: String,
    #[serde(rename = "Impressions")]
    #[tabled(rename = "Impressions")]
    pub impressions: String,
    #[serde(rename = "Clicks")]
    #[tabled(rename = "Clicks")]
    pub clicks: String,
    #[serde(rename = "Conversions")]
    #[tabled(rename = "Conversions")]
    pub conversions: String,
    #[serde(rename = "CPL")]
    #[tabled(rename = "CPL")]
    pub cpl: String,
    #[serde(rename = "CVR")]
    #[tabled(rename = "CVR")]
    pub cvr: String,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MetricTableRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "ThisPeriod")]
    #[tabled(rename = "This Period")]
    pub current: String,
    #[serde(rename = "PreviousPeriod")]
    #[tabled(rename = "Previous Period")]
    pub previous: String,
    #[serde(rename = "Change")]
    #[tabled(rename = "Change")]
    pub change: String,
    #[serde(rename = "Tone")]
    #[tabled(skip)]
    pub tone: ChangeTone,
}

/// Raw sign of a change, for the arrow glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeArrow {
    Up,
    Down,
    Flat,
}

/// Whether a change is good news, for the renderer's color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTone {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub label: String,
    pub conversions: f64,
    pub spend: f64,
}
