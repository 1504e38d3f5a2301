//! License date resolution
//!
//! The stamping core takes the license date as ready-made `YYYY-MM-DD` text.
//! This module turns what a caller typed into that text.

use chrono::{Duration, Local, NaiveDate};
use crate::error::{Error, Result};

/// Format used for the license date printed in the footer
pub const LICENSE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Resolve a date expression to `YYYY-MM-DD`
///
/// Supported formats:
/// - `None` or `""` → `today`
/// - `"today"` / `"yesterday"`
/// - `"2024-11-20"` (ISO)
/// - `"11/20/2024"` (US)
pub fn resolve_license_date(expr: Option<&str>, today: NaiveDate) -> Result<String> {
    let expr = expr.map(str::trim).unwrap_or("");

    let date = if expr.is_empty() || expr.eq_ignore_ascii_case("today") {
        today
    } else if expr.eq_ignore_ascii_case("yesterday") {
        today - Duration::days(1)
    } else if let Ok(date) = NaiveDate::parse_from_str(expr, LICENSE_DATE_FORMAT) {
        date
    } else if let Ok(date) = NaiveDate::parse_from_str(expr, "%m/%d/%Y") {
        date
    } else {
        return Err(Error::InvalidDateExpression(expr.to_string()));
    };

    Ok(format_license_date(&date))
}

/// Resolve against the local calendar date
pub fn resolve_license_date_today(expr: Option<&str>) -> Result<String> {
    resolve_license_date(expr, Local::now().date_naive())
}

/// Format a date the way the footer prints it
pub fn format_license_date(date: &NaiveDate) -> String {
    date.format(LICENSE_DATE_FORMAT).to_string()
}
