// Report periods: date ranges, labels, folder names and report ids.

use crate::error::{ReportError, Result};
use crate::types::MetricRow;
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

/// Inclusive date range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Rows partitioned against a current period and the one before it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodSplit {
    pub current: Vec<MetricRow>,
    pub previous: Vec<MetricRow>,
    /// Undated rows and rows outside both periods.
    pub out_of_period: usize,
}

/// Longest period a report may cover.
pub const MAX_PERIOD_DAYS: u32 = 366;

impl ReportPeriod {
    /// Fails on an inverted range, or when the equally long period before
    /// it would fall outside the calendar.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ReportError::Config(format!(
                "period start {} is after end {}",
                start, end
            )));
        }
        let period = Self { start, end };
        start
            .checked_sub_days(Days::new(u64::from(period.days())))
            .ok_or_else(|| out_of_range(start))?;
        Ok(period)
    }

    /// The most recent Monday-Sunday week that has fully elapsed, counting
    /// `today` as elapsed when it is a Sunday.
    pub fn last_full_week(today: NaiveDate) -> Result<Self> {
        let since_sunday = u64::from(today.weekday().num_days_from_sunday());
        let end = today
            .checked_sub_days(Days::new(since_sunday))
            .ok_or_else(|| out_of_range(today))?;
        Self::ending(end, 7)
    }

    /// `days`-long period ending on `end` (a zero length is read as one day).
    pub fn ending(end: NaiveDate, days: u32) -> Result<Self> {
        if days > MAX_PERIOD_DAYS {
            return Err(ReportError::Config(format!(
                "period of {} days exceeds the {}-day limit",
                days, MAX_PERIOD_DAYS
            )));
        }
        let span = u64::from(days.max(1) - 1);
        let start = end
            .checked_sub_days(Days::new(span))
            .ok_or_else(|| out_of_range(end))?;
        Self::new(start, end)
    }

    pub fn days(&self) -> u32 {
        (self.end - self.start).num_days() as u32 + 1
    }

    /// Equally long period ending the day before this one starts.
    /// Saturates at the earliest calendar date; periods built through
    /// [`ReportPeriod::new`] always have room.
    pub fn previous(&self) -> Self {
        let len = Days::new(u64::from(self.days()));
        let shift = |d: NaiveDate| d.checked_sub_days(len).unwrap_or(NaiveDate::MIN);
        Self {
            start: shift(self.start),
            end: shift(self.end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every date in the period, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// `"January 5 - 11, 2026"`, `"January 26 - February 1, 2026"` or
    /// `"December 29, 2025 - January 4, 2026"`.
    pub fn label(&self) -> String {
        let (s, e) = (self.start, self.end);
        if s.year() != e.year() {
            format!("{} - {}", s.format("%B %-d, %Y"), e.format("%B %-d, %Y"))
        } else if s.month() != e.month() {
            format!("{} - {}", s.format("%B %-d"), e.format("%B %-d, %Y"))
        } else {
            format!("{} - {}", s.format("%B %-d"), e.format("%-d, %Y"))
        }
    }

    /// Short folder suffix: `jan5-11`, `dec29-jan4`.
    pub fn folder_name(&self) -> String {
        let (s, e) = (self.start, self.end);
        let start = s.format("%b%-d").to_string().to_lowercase();
        if s.year() == e.year() && s.month() == e.month() {
            format!("{}-{}", start, e.day())
        } else {
            format!("{}-{}", start, e.format("%b%-d").to_string().to_lowercase())
        }
    }

    /// `RPT-ACM-2026-W02`: prefix, first three slug characters, then the ISO
    /// week the period ends in.
    pub fn report_id(&self, prefix: &str, slug: &str) -> String {
        let short: String = slug
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(3)
            .collect::<String>()
            .to_uppercase();
        let week = self.end.iso_week();
        format!("{}-{}-{}-W{:02}", prefix, short, week.year(), week.week())
    }

    /// Split one combined export into this period and the previous one.
    pub fn split(&self, rows: Vec<MetricRow>) -> PeriodSplit {
        let previous = self.previous();
        let mut split = PeriodSplit::default();
        for row in rows {
            match row.date {
                Some(d) if self.contains(d) => split.current.push(row),
                Some(d) if previous.contains(d) => split.previous.push(row),
                _ => split.out_of_period += 1,
            }
        }
        split
    }
}

fn out_of_range(date: NaiveDate) -> ReportError {
    ReportError::Config(format!("period ending near {} is outside the calendar", date))
}
