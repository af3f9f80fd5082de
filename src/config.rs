// Report configuration: client catalogue, branding and rule thresholds.
//
// Loaded from a JSON file (`clients.json`). Every section has defaults, so
// a file holding only `{"clients": [...]}` is a complete configuration.

use crate::error::{ReportError, Result};
use crate::period::MAX_PERIOD_DAYS;
use crate::util::digits_only;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    #[serde(default = "default_brand")]
    pub brand: String,
    #[serde(default = "default_report_id_prefix")]
    pub report_id_prefix: String,
    #[serde(default = "default_period_days")]
    pub period_days: u32,
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
    #[serde(default)]
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ClientConfig {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub customer_id: String,
    /// Report recipient, passed through to delivery via the run summary.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub cc: Vec<String>,
}

impl ClientConfig {
    /// `email` first, then `cc`, without blanks or repeats.
    pub fn recipients(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for addr in self.email.iter().chain(self.cc.iter()) {
            let addr = addr.trim();
            if !addr.is_empty() && !out.iter().any(|a| a.eq_ignore_ascii_case(addr)) {
                out.push(addr.to_string());
            }
        }
        out
    }

    /// Whether a row's account fields identify this client.
    ///
    /// Matches when the account name contains the client name
    /// (case-insensitive) or the row's customer id contains this client's
    /// id digits. Rows carrying neither field match every client.
    pub fn matches(&self, account: Option<&str>, customer_id: Option<&str>) -> bool {
        let account = account.map(str::trim).filter(|s| !s.is_empty());
        let customer_id = customer_id.map(digits_only).filter(|s| !s.is_empty());
        if account.is_none() && customer_id.is_none() {
            return true;
        }
        if let Some(account) = account {
            if !self.name.is_empty() && account.to_lowercase().contains(&self.name.to_lowercase()) {
                return true;
            }
        }
        let own_id = digits_only(&self.customer_id);
        match customer_id {
            Some(id) if !own_id.is_empty() => id.contains(&own_id),
            _ => false,
        }
    }
}

/// All rule thresholds, in percent-change or percent units unless noted.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    /// Changes with an absolute value below this are reported as flat.
    /// Zero selects the strict law (flat only when exactly zero).
    pub flat_pct: f64,
    pub ctr_tiers: CtrTierThresholds,
    pub secondary: SecondaryThresholds,
    pub recommendations: RecommendationThresholds,
    pub tone: ToneThresholds,
    pub badges: BadgeThresholds,
    /// Executive summary mentions a metric once its change exceeds this.
    pub highlight_change: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            flat_pct: 0.5,
            ctr_tiers: CtrTierThresholds::default(),
            secondary: SecondaryThresholds::default(),
            recommendations: RecommendationThresholds::default(),
            tone: ToneThresholds::default(),
            badges: BadgeThresholds::default(),
            highlight_change: 10.0,
        }
    }
}

/// Lower bounds (inclusive) of the CTR tiers, in percent
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CtrTierThresholds {
    pub outstanding: f64,
    pub strong: f64,
    pub solid: f64,
}

impl Default for CtrTierThresholds {
    fn default() -> Self {
        Self {
            outstanding: 10.0,
            strong: 5.0,
            solid: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SecondaryThresholds {
    pub scale_clicks_growth: f64,
    pub efficiency_cpc_drop: f64,
    pub decline_clicks_drop: f64,
    pub savings_spend_drop: f64,
    pub savings_clicks_band: f64,
}

impl Default for SecondaryThresholds {
    fn default() -> Self {
        Self {
            scale_clicks_growth: 50.0,
            efficiency_cpc_drop: -15.0,
            decline_clicks_drop: -15.0,
            savings_spend_drop: -10.0,
            savings_clicks_band: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RecommendationThresholds {
    pub clicks_growth: f64,
    pub clicks_decline: f64,
    pub ctr_decline: f64,
    pub cpc_increase: f64,
    pub cpc_decrease: f64,
    /// Absolute CTR (percent) below which ad variants are suggested.
    pub low_ctr: f64,
    pub min_lines: usize,
    pub max_lines: usize,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            clicks_growth: 30.0,
            clicks_decline: -15.0,
            ctr_decline: -10.0,
            cpc_increase: 15.0,
            cpc_decrease: -10.0,
            low_ctr: 3.0,
            min_lines: 2,
            max_lines: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ToneThresholds {
    pub outstanding_clicks: f64,
    pub outstanding_ctr: f64,
    pub outstanding_cpc: f64,
    pub strong_clicks: f64,
    pub strong_cpc: f64,
    pub soft_clicks: f64,
    pub soft_ctr: f64,
}

impl Default for ToneThresholds {
    fn default() -> Self {
        Self {
            outstanding_clicks: 50.0,
            outstanding_ctr: 20.0,
            outstanding_cpc: -10.0,
            strong_clicks: 20.0,
            strong_cpc: -15.0,
            soft_clicks: -20.0,
            soft_ctr: -20.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BadgeThresholds {
    /// CPC (currency) below which the efficiency badge is "excellent".
    pub cpc_excellent: f64,
    pub cpc_good: f64,
    pub ctr_excellent: f64,
    pub ctr_good: f64,
    pub clicks_surge: f64,
    pub clicks_stable: f64,
    /// Withhold the CPC badge when there were no clicks, since a zero CPC
    /// then only reflects the division guard.
    pub cpc_requires_clicks: bool,
}

impl Default for BadgeThresholds {
    fn default() -> Self {
        Self {
            cpc_excellent: 0.20,
            cpc_good: 0.50,
            ctr_excellent: 10.0,
            ctr_good: 5.0,
            clicks_surge: 50.0,
            clicks_stable: 5.0,
            cpc_requires_clicks: false,
        }
    }
}

fn default_brand() -> String {
    "Performance Marketing".to_string()
}

fn default_report_id_prefix() -> String {
    "RPT".to_string()
}

fn default_period_days() -> u32 {
    7
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            brand: default_brand(),
            report_id_prefix: default_report_id_prefix(),
            period_days: default_period_days(),
            clients: Vec::new(),
            thresholds: Thresholds::default(),
        }
    }
}

impl ReportConfig {
    /// Load and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ReportConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for client in &self.clients {
            if client.slug.trim().is_empty() {
                return Err(ReportError::Config(format!(
                    "client '{}' has an empty slug",
                    client.name
                )));
            }
            if !seen.insert(client.slug.as_str()) {
                return Err(ReportError::Config(format!(
                    "duplicate client slug '{}'",
                    client.slug
                )));
            }
        }
        if self.period_days == 0 || self.period_days > MAX_PERIOD_DAYS {
            return Err(ReportError::Config(format!(
                "period_days must be between 1 and {}",
                MAX_PERIOD_DAYS
            )));
        }
        let t = &self.thresholds;
        if t.flat_pct < 0.0 {
            return Err(ReportError::Config("flat_pct must not be negative".into()));
        }
        let tiers = &t.ctr_tiers;
        if !(tiers.outstanding >= tiers.strong && tiers.strong >= tiers.solid) {
            return Err(ReportError::Config(
                "ctr tiers must satisfy outstanding >= strong >= solid".into(),
            ));
        }
        let recs = &t.recommendations;
        if recs.max_lines == 0 || recs.min_lines > recs.max_lines {
            return Err(ReportError::Config(
                "recommendations need 0 < min_lines <= max_lines".into(),
            ));
        }
        Ok(())
    }

    pub fn client(&self, slug: &str) -> Result<&ClientConfig> {
        self.clients
            .iter()
            .find(|c| c.slug == slug)
            .ok_or_else(|| ReportError::UnknownClient(slug.to_string()))
    }
}
