use crate::config::ClientConfig;
use crate::error::{ReportError, Result};
use crate::types::{ApiRow, MetricRow, Micros, NumberLike, RawRow};
use crate::util::{parse_date_safe, parse_number_or_zero};
use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// A row that could not be coerced, with its 1-based line (CSV) or record
/// number (JSON)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub total_rows: usize,
    pub accepted_rows: usize,
    /// Removed campaigns and export total lines.
    pub excluded_rows: usize,
    pub rejections: Vec<Rejection>,
}

impl LoadReport {
    pub fn rejected_rows(&self) -> usize {
        self.rejections.len()
    }

    pub fn merge(&mut self, other: LoadReport) {
        self.total_rows += other.total_rows;
        self.accepted_rows += other.accepted_rows;
        self.excluded_rows += other.excluded_rows;
        self.rejections.extend(other.rejections);
    }

    fn record(&mut self, line: u64, outcome: RowResult, rows: &mut Vec<MetricRow>) {
        match outcome {
            Ok(Some(row)) => {
                self.accepted_rows += 1;
                rows.push(row);
            }
            Ok(None) => self.excluded_rows += 1,
            Err(reason) => self.reject(line, reason),
        }
    }

    fn reject(&mut self, line: u64, reason: String) {
        debug!(line, reason = %reason, "rejected row");
        self.rejections.push(Rejection { line, reason });
    }
}

/// `Ok(None)` is an excluded row, `Err` a malformed one.
type RowResult = std::result::Result<Option<MetricRow>, String>;

/// Load rows from a `.csv` export or a `.json` API dump, by extension.
pub fn load_path(path: &Path) -> Result<(Vec<MetricRow>, LoadReport)> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("csv") => load_csv(path),
        Some("json") => load_api_json(path),
        _ => Err(ReportError::UnsupportedInput(format!(
            "{} (expected .csv or .json)",
            path.display()
        ))),
    }
}

pub fn load_csv(path: &Path) -> Result<(Vec<MetricRow>, LoadReport)> {
    read_csv(File::open(path)?)
}

/// Read a spreadsheet export. Malformed rows are skipped and reported,
/// never fatal; only an unreadable header fails the load.
pub fn read_csv<R: Read>(reader: R) -> Result<(Vec<MetricRow>, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let mut report = LoadReport::default();
    let mut rows = Vec::new();

    for result in rdr.records() {
        report.total_rows += 1;
        let fallback_line = report.total_rows as u64 + 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(fallback_line);
                report.reject(line, e.to_string());
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);
        let outcome = match record.deserialize::<RawRow>(Some(&headers)) {
            Ok(raw) => canonical_csv_row(raw),
            Err(e) => Err(e.to_string()),
        };
        report.record(line, outcome, &mut rows);
    }

    Ok((rows, report))
}

fn canonical_csv_row(raw: RawRow) -> RowResult {
    let campaign = match raw.campaign.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err("missing campaign name".to_string()),
    };
    if is_total_line(&campaign) || is_removed(raw.status.as_deref()) {
        return Ok(None);
    }

    let date = match raw.date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(parse_date_safe(Some(s)).ok_or_else(|| format!("invalid date '{}'", s))?),
    };

    let mut row = MetricRow::new(campaign);
    row.date = date;
    row.device = non_blank(raw.device);
    row.status = non_blank(raw.status);
    row.account = non_blank(raw.account);
    row.customer_id = non_blank(raw.customer_id);
    row.impressions = count_field("impressions", raw.impressions.as_deref())?;
    row.clicks = count_field("clicks", raw.clicks.as_deref())?;
    row.cost = Micros::from_units(amount_field("cost", raw.cost.as_deref())?);
    row.conversions = Micros::from_units(amount_field("conversions", raw.conversions.as_deref())?);
    row.all_conversions =
        Micros::from_units(amount_field("all conversions", raw.all_conversions.as_deref())?);
    Ok(Some(row))
}

pub fn load_api_json(path: &Path) -> Result<(Vec<MetricRow>, LoadReport)> {
    let text = std::fs::read_to_string(path)?;
    parse_api_json(&text)
}

/// Parse API search rows: either a bare array or an object with a
/// `results` array. Rows for `REMOVED` campaigns are excluded.
pub fn parse_api_json(text: &str) -> Result<(Vec<MetricRow>, LoadReport)> {
    let items = match serde_json::from_str::<Value>(text)? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ReportError::UnsupportedInput(
                    "json object without a `results` array".to_string(),
                ))
            }
        },
        _ => {
            return Err(ReportError::UnsupportedInput(
                "json input must be an array of rows".to_string(),
            ))
        }
    };

    let mut report = LoadReport::default();
    let mut rows = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        report.total_rows += 1;
        let outcome = match serde_json::from_value::<ApiRow>(item) {
            Ok(api) => canonical_api_row(api),
            Err(e) => Err(e.to_string()),
        };
        report.record(i as u64 + 1, outcome, &mut rows);
    }
    Ok((rows, report))
}

fn canonical_api_row(api: ApiRow) -> RowResult {
    let campaign = match api.campaign.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err("missing campaign name".to_string()),
    };
    if is_removed(api.campaign.status.as_deref()) {
        return Ok(None);
    }

    let date = match api.segments.date.as_deref() {
        None => None,
        Some(s) => Some(parse_date_safe(Some(s)).ok_or_else(|| format!("invalid date '{}'", s))?),
    };
    let metrics = &api.metrics;
    let impressions = number_field("impressions", metrics.impressions.as_ref())?;
    let clicks = number_field("clicks", metrics.clicks.as_ref())?;
    let cost_micros = number_field("cost_micros", metrics.cost_micros.as_ref())?;
    let conversions = number_field("conversions", metrics.conversions.as_ref())?;
    let all_conversions = number_field("all_conversions", metrics.all_conversions.as_ref())?;

    let mut row = MetricRow::new(campaign);
    row.date = date;
    row.device = non_blank(api.segments.device);
    row.status = non_blank(api.campaign.status);
    row.account = non_blank(api.customer.descriptive_name);
    row.customer_id = api.customer.id.as_ref().map(NumberLike::as_text);
    row.impressions = whole("impressions", impressions)?;
    row.clicks = whole("clicks", clicks)?;
    row.cost = Micros(cost_micros.round() as i64);
    row.conversions = Micros::from_units(conversions);
    row.all_conversions = Micros::from_units(all_conversions);
    Ok(Some(row))
}

/// Rows whose account name or customer id identify `client`.
pub fn rows_for_client(rows: &[MetricRow], client: &ClientConfig) -> Vec<MetricRow> {
    rows.iter()
        .filter(|r| client.matches(r.account.as_deref(), r.customer_id.as_deref()))
        .cloned()
        .collect()
}

fn is_removed(status: Option<&str>) -> bool {
    status.is_some_and(|s| s.trim().eq_ignore_ascii_case("removed"))
}

/// Spreadsheet exports end with `Total: ...` summary lines.
fn is_total_line(campaign: &str) -> bool {
    let lower = campaign.to_ascii_lowercase();
    lower == "total" || lower.starts_with("total:")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn amount_field(name: &str, value: Option<&str>) -> std::result::Result<f64, String> {
    let v = parse_number_or_zero(value)
        .ok_or_else(|| format!("invalid {}: '{}'", name, value.unwrap_or_default()))?;
    if v < 0.0 {
        return Err(format!("negative {}: {}", name, v));
    }
    Ok(v)
}

fn count_field(name: &str, value: Option<&str>) -> std::result::Result<u64, String> {
    whole(name, amount_field(name, value)?)
}

fn number_field(name: &str, value: Option<&NumberLike>) -> std::result::Result<f64, String> {
    let v = match value {
        None => 0.0,
        Some(NumberLike::Int(i)) => *i as f64,
        Some(NumberLike::Float(f)) => *f,
        Some(NumberLike::Text(s)) => parse_number_or_zero(Some(s))
            .ok_or_else(|| format!("invalid {}: '{}'", name, s))?,
    };
    if !v.is_finite() || v < 0.0 {
        return Err(format!("negative or non-finite {}: {}", name, v));
    }
    Ok(v)
}

fn whole(name: &str, v: f64) -> std::result::Result<u64, String> {
    if v.fract() != 0.0 {
        return Err(format!("fractional {}: {}", name, v));
    }
    Ok(v as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    const EXPORT: &str = "\
Campaign,Day,Impr.,Clicks,Spend,Conv.,Campaign status
Brand,2026-01-05,\"1,000\",50,$25.10,2.5,ENABLED
Generic,2026-01-05,4000,n/a,80.33,4,ENABLED
Brand,01/06/2026,1500,70,-3.00,0,ENABLED
Old,2026-01-06,10,1,0.5,0,REMOVED
,2026-01-06,10,1,0.5,0,ENABLED
Total: Account,,6510,121,105.93,6.5,
Brand,2026-01-07,—,—,,,
";

    fn temp_with(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    // ========== CSV ==========

    #[test]
    fn test_csv_counts_and_rejections() {
        let (rows, report) = read_csv(EXPORT.as_bytes()).unwrap();

        assert_eq!(report.total_rows, 7);
        assert_eq!(report.accepted_rows, 2);
        assert_eq!(report.excluded_rows, 2);
        assert_eq!(report.rejected_rows(), 3);
        assert_eq!(rows.len(), report.accepted_rows);

        let lines: Vec<u64> = report.rejections.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![3, 4, 6]);
        assert_eq!(report.rejections[0].reason, "invalid clicks: 'n/a'");
        assert!(report.rejections[1].reason.starts_with("negative cost"));
        assert_eq!(report.rejections[2].reason, "missing campaign name");
    }

    #[test]
    fn test_csv_row_values() {
        let (rows, _) = read_csv(EXPORT.as_bytes()).unwrap();
        let brand = &rows[0];
        assert_eq!(brand.campaign, "Brand");
        assert_eq!(brand.date, NaiveDate::from_ymd_opt(2026, 1, 5));
        assert_eq!(brand.impressions, 1000);
        assert_eq!(brand.clicks, 50);
        assert_eq!(brand.cost, Micros(25_100_000));
        assert_eq!(brand.conversions, Micros(2_500_000));
        assert_eq!(brand.status.as_deref(), Some("ENABLED"));

        let placeholder = &rows[1];
        assert_eq!(placeholder.impressions, 0);
        assert_eq!(placeholder.cost, Micros::ZERO);
    }

    #[test]
    fn test_csv_invalid_date_is_malformed() {
        let data = "Campaign,Date,Clicks\nBrand,someday,4\n";
        let (rows, report) = read_csv(data.as_bytes()).unwrap();
        assert!(rows.is_empty());
        assert_eq!(report.rejections[0].reason, "invalid date 'someday'");
    }

    #[test]
    fn test_csv_fractional_clicks_rejected() {
        let data = "Campaign,Clicks\nBrand,4.5\nBrand,4.0\n";
        let (rows, report) = read_csv(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].clicks, 4);
        assert_eq!(report.rejected_rows(), 1);
    }

    #[test]
    fn test_load_csv_from_file() {
        let file = temp_with(".csv", EXPORT);
        let (rows, report) = load_path(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(report.total_rows, 7);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_csv(Path::new("/nonexistent/export.csv")).unwrap_err();
        assert!(matches!(err, ReportError::Io(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = temp_with(".xlsx", "x");
        assert!(matches!(
            load_path(file.path()),
            Err(ReportError::UnsupportedInput(_))
        ));
    }

    // ========== API JSON ==========

    const API_ROWS: &str = r#"[
        {"customer": {"id": "9175974799", "descriptiveName": "Acme Co"},
         "campaign": {"name": "Brand", "status": "ENABLED"},
         "segments": {"date": "2026-01-05", "device": "MOBILE"},
         "metrics": {"impressions": "1000", "clicks": "50", "costMicros": "25100000", "conversions": 2.5}},
        {"campaign": {"name": "Gone", "status": "REMOVED"}, "metrics": {"impressions": 5}},
        {"campaign": {"name": "Bad"}, "metrics": {"clicks": "lots"}},
        "not an object"
    ]"#;

    #[test]
    fn test_api_rows() {
        let (rows, report) = parse_api_json(API_ROWS).unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.accepted_rows, 1);
        assert_eq!(report.excluded_rows, 1);
        let lines: Vec<u64> = report.rejections.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![3, 4]);

        let row = &rows[0];
        assert_eq!(row.cost, Micros(25_100_000));
        assert_eq!(row.impressions, 1000);
        assert_eq!(row.account.as_deref(), Some("Acme Co"));
        assert_eq!(row.customer_id.as_deref(), Some("9175974799"));
        assert_eq!(row.device.as_deref(), Some("MOBILE"));
    }

    #[test]
    fn test_api_results_wrapper_from_file() {
        let file = temp_with(
            ".json",
            r#"{"results": [{"campaign": {"name": "Brand"}, "metrics": {"clicks": 3}}]}"#,
        );
        let (rows, report) = load_path(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].clicks, 3);
        assert_eq!(report.rejected_rows(), 0);
    }

    #[test]
    fn test_api_scalar_is_unsupported() {
        assert!(matches!(
            parse_api_json("42"),
            Err(ReportError::UnsupportedInput(_))
        ));
    }

    // ========== client filter ==========

    #[test]
    fn test_rows_for_client() {
        let client = ClientConfig {
            slug: "acme".into(),
            name: "Acme".into(),
            customer_id: "917-597-4799".into(),
            email: None,
            cc: Vec::new(),
        };
        let mut other = MetricRow::new("x");
        other.account = Some("Other".into());
        let mut by_id = MetricRow::new("y");
        by_id.customer_id = Some("9175974799".into());
        let unlabeled = MetricRow::new("z");

        let rows = rows_for_client(&[other, by_id, unlabeled], &client);
        let names: Vec<&str> = rows.iter().map(|r| r.campaign.as_str()).collect();
        assert_eq!(names, vec!["y", "z"]);
    }

    #[test]
    fn test_merge_reports() {
        let mut a = LoadReport {
            total_rows: 2,
            accepted_rows: 2,
            ..LoadReport::default()
        };
        let (_, b) = read_csv(EXPORT.as_bytes()).unwrap();
        a.merge(b);
        assert_eq!(a.total_rows, 9);
        assert_eq!(a.rejected_rows(), 3);
    }
}
