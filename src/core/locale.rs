//! Turkish numeric conventions at the input/output boundary.
//!
//! Amounts arrive as `5.000.000,00` (dot thousands, comma decimals) and are
//! displayed the same way with a lira sign. Start dates arrive as
//! `DD.MM.YYYY`; only the year matters to the engine.

use chrono::{Datelike, NaiveDate};

use super::error::ValidationError;

/// Parses a locale-formatted amount. Blank input means "not provided".
pub fn parse_amount(field: &'static str, raw: &str) -> Result<Option<f64>, ValidationError> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches("TL")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '₺' && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return Ok(None);
    }

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(ValidationError::MalformedAmount {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Reads an investment start date. The year must be the last four characters;
/// anything else is unreadable. Day and month are kept only when the whole
/// string is a valid `DD.MM.YYYY`, otherwise January 1st of that year is used.
pub fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let year = trailing_year(raw)?;
    NaiveDate::parse_from_str(raw, "%d.%m.%Y")
        .ok()
        .filter(|date| date.year() == year)
        .or_else(|| NaiveDate::from_ymd_opt(year, 1, 1))
}

fn trailing_year(raw: &str) -> Option<i32> {
    let start = raw.len().checked_sub(4)?;
    let suffix = raw.get(start..)?;
    if suffix.bytes().all(|b| b.is_ascii_digit()) {
        suffix.parse().ok()
    } else {
        None
    }
}

/// `1250000.0` → `1.250.000,00`
pub fn format_amount(amount: f64) -> String {
    let rounded = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 4);
    if amount < 0.0 && rounded != "0.00" {
        grouped.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped.push(',');
    grouped.push_str(frac_part);
    grouped
}

/// `1250000.0` → `1.250.000,00 ₺`
pub fn format_try(amount: f64) -> String {
    format!("{} ₺", format_amount(amount))
}

/// `12.5` → `%12,5`
pub fn format_rate(rate: f64) -> String {
    format!("%{}", rate).replace('.', ",")
}
