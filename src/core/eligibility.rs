use chrono::{Datelike, NaiveDate};

use super::types::{CompletionStatus, RegimeKind};

/// Under 2025/9903, investment-derived earnings stop qualifying after this many periods.
pub const DECREE_9903_INVESTMENT_PERIODS: i32 = 10;
/// Under 2025/9903, other earnings stop qualifying after this many periods.
pub const DECREE_9903_OTHER_PERIODS: i32 = 4;

/// Whole calendar years between the investment start and the as-of date.
/// Negative when the investment starts in a later year.
pub fn periods_elapsed(start: Option<NaiveDate>, as_of: NaiveDate) -> i32 {
    match start {
        Some(start) => as_of.year() - start.year(),
        None => 0,
    }
}

pub fn is_investment_earning_eligible(kind: RegimeKind, periods_elapsed: i32) -> bool {
    match kind {
        RegimeKind::Legacy => true,
        RegimeKind::Decree9903 => periods_elapsed < DECREE_9903_INVESTMENT_PERIODS,
    }
}

pub fn is_other_earning_eligible(
    kind: RegimeKind,
    completion: CompletionStatus,
    periods_elapsed: i32,
) -> bool {
    if completion == CompletionStatus::Operational {
        return false;
    }
    match kind {
        RegimeKind::Legacy => true,
        RegimeKind::Decree9903 => periods_elapsed < DECREE_9903_OTHER_PERIODS,
    }
}
