use crate::error::Result;
use crate::reports::ViewModel;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::debug;

pub const REPORT_FILE: &str = "report.json";
pub const CAMPAIGNS_FILE: &str = "campaigns.csv";

/// Files written for one client report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrittenReport {
    pub dir: PathBuf,
    pub report: PathBuf,
    pub campaigns: PathBuf,
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write `report.json` and `campaigns.csv` into `dir`, creating it.
pub fn write_report(dir: &Path, view: &ViewModel) -> Result<WrittenReport> {
    std::fs::create_dir_all(dir)?;
    let written = WrittenReport {
        dir: dir.to_path_buf(),
        report: dir.join(REPORT_FILE),
        campaigns: dir.join(CAMPAIGNS_FILE),
    };
    write_json(&written.report, view)?;
    write_csv(&written.campaigns, &view.campaigns)?;
    debug!(dir = %dir.display(), "report files written");
    Ok(written)
}

/// Markdown table of the first `max_rows` rows, or `(no rows)`.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    println!("{}\n", render_table(rows, max_rows));
}

/// Console preview of one report: summary, metrics table, top campaigns,
/// insights and recommendations.
pub fn preview_report(view: &ViewModel, max_campaigns: usize) {
    let h = &view.header;
    println!("\n{} | {} | {}", h.client_name, h.period_label, h.report_id);
    println!("{}", view.summary.text);

    preview_table("Detailed Metrics", Some(&h.previous_label), &view.metric_table, usize::MAX);
    let note = format!(
        "Top {} of {} by spend",
        max_campaigns.min(view.campaigns.len()),
        view.campaigns.len()
    );
    preview_table("Campaigns", Some(&note), &view.campaigns, max_campaigns);

    for insight in &view.insights {
        println!("[{}] {}: {}", insight.icon.glyph(), insight.title, insight.body);
    }
    for line in &view.recommendations {
        println!("  {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CampaignRow, ChangeTone, MetricTableRow};
    use tempfile::TempDir;

    fn campaign(name: &str, spend: &str) -> CampaignRow {
        CampaignRow {
            campaign: name.into(),
            spend: spend.into(),
            impressions: "1,000".into(),
            clicks: "50".into(),
            conversions: "2.0".into(),
            cpl: "$12.50".into(),
            cvr: "4.0%".into(),
        }
    }

    // ========== writers ==========

    #[test]
    fn test_write_csv_headers_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("campaigns.csv");
        write_csv(&path, &[campaign("Brand", "$25.00"), campaign("Generic", "$10.00")]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Campaign,Spend,Impressions,Clicks,Conversions,CPL,CVR")
        );
        assert_eq!(lines.next(), Some("Brand,$25.00,\"1,000\",50,2.0,$12.50,4.0%"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_write_json_pretty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &campaign("Brand", "$1.00")).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["Campaign"], "Brand");
    }

    #[test]
    fn test_write_json_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.json");
        assert!(write_json(&path, &1).is_err());
    }

    // ========== tables ==========

    #[test]
    fn test_render_table_markdown() {
        let rows = vec![MetricTableRow {
            metric: "Clicks".into(),
            current: "500".into(),
            previous: "300".into(),
            change: "+66.67%".into(),
            tone: ChangeTone::Positive,
        }];
        let table = render_table(&rows, 5);
        assert!(table.contains("| Metric"));
        assert!(table.contains("This Period"));
        assert!(table.contains("+66.67%"));
        assert!(!table.contains("Positive"));
    }

    #[test]
    fn test_render_table_limits_and_empty() {
        let rows = vec![
            campaign("Alpha", "$3.00"),
            campaign("Beta", "$2.00"),
            campaign("Gamma", "$1.00"),
        ];
        let table = render_table(&rows, 2);
        assert!(table.contains("Beta"));
        assert!(!table.contains("Gamma"));
        assert_eq!(render_table::<CampaignRow>(&[], 5), "(no rows)");
    }
}
