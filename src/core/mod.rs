mod eligibility;
mod engine;
mod error;
mod ledger;
mod locale;
mod rates;
mod types;
mod validate;

pub use eligibility::{is_investment_earning_eligible, is_other_earning_eligible, periods_elapsed};
pub use engine::compute;
pub use error::{ConfigError, ValidationError};
pub use locale::{format_amount, format_rate, format_try, parse_amount, parse_start_date};
pub use ledger::{ContributionLedger, earned_to_date, potential_cap, remaining};
pub use rates::{RateTable, legacy_key, other_activity_rate};
pub use types::{
    CalculationResult, Certificate, CompletionStatus, Decision, EarningsDeclaration,
    InvestmentFigures, LegacyDecision, OsbStatus, Program, RateResolution, Regime, RegimeKind,
    RegionTier, Warning,
};
pub use validate::{BASE_TOLERANCE, validate};
