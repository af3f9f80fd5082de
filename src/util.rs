// Utility helpers for parsing and display formatting.
//
// This module centralizes the "dirty" CSV/number/date handling and the
// number formats the report output promises, so the rest of the code can
// work with typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Date formats seen in spreadsheet exports, tried in order.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y", "%a, %b %d, %Y"];

/// Parse a spreadsheet cell into `f64`, being forgiving about the
/// decorations exports add (currency signs, thousands separators, percent).
///
/// - Missing, blank and placeholder cells (`—`, `--`) read as `0.0`.
/// - Strips `$`, `,` and `%` before parsing.
/// - Rejects values that contain alphabetic characters.
/// - Returns `None` only for values that are present but not numeric.
pub fn parse_number_or_zero(s: Option<&str>) -> Option<f64> {
    let Some(s) = s else {
        return Some(0.0);
    };
    let s = s.trim();
    if s.is_empty() || s == "—" || s == "--" || s == "-" {
        return Some(0.0);
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%' | ' '))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Keep only ASCII digits, so `"917-597-4799"` and `9175974799` compare equal.
pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed number of decimal places plus locale thousands separators,
    // e.g. `1,234,567.89`.
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    // No sign on values that round to zero.
    let rounds_to_zero = s.chars().all(|c| c == '0' || c == '.');
    if n.is_sign_negative() && !rounds_to_zero {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages (e.g. `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

/// Whole-number count with thousands separators: `12,345`.
pub fn format_count(n: f64) -> String {
    format_number(n, 0)
}

/// Currency: two decimals, or none once the amount reaches 1,000.
pub fn format_currency(amount: f64) -> String {
    let decimals = if amount.abs() >= 1000.0 { 0 } else { 2 };
    let body = format_number(amount.abs(), decimals);
    if amount < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-${}", body)
    } else {
        format!("${}", body)
    }
}

/// Currency with two decimals regardless of size: `$1,234.56`. Used for
/// spend in detail tables and summary text, where cents stay visible;
/// headline KPI values use `format_currency`.
pub fn format_currency_exact(amount: f64) -> String {
    let body = format_number(amount.abs(), 2);
    if amount < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-${}", body)
    } else {
        format!("${}", body)
    }
}

/// Percentage with two decimals: `5.00%`.
pub fn format_percent(value: f64) -> String {
    format!("{}%", format_number(value, 2))
}

/// Percentage with an explicit `+` on increases: `+66.67%`, `-16.67%`.
pub fn format_signed_percent(value: f64, decimals: usize) -> String {
    let body = format!("{:.*}", decimals, value);
    if value > 0.0 {
        format!("+{}%", body)
    } else {
        format!("{}%", body)
    }
}
