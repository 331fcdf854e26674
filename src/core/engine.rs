use chrono::NaiveDate;

use super::eligibility::{is_investment_earning_eligible, is_other_earning_eligible, periods_elapsed};
use super::error::ValidationError;
use super::ledger::ContributionLedger;
use super::rates::{RateTable, other_activity_rate};
use super::types::{
    CalculationResult, Certificate, EarningsDeclaration, InvestmentFigures, LegacyDecision, Regime,
    RegimeKind, Warning,
};
use super::validate::validate;

#[derive(Debug, Clone, Copy)]
struct AdvantageSplit {
    investment: f64,
    other: f64,
    other_uncapped: f64,
}

impl AdvantageSplit {
    fn total(self) -> f64 {
        self.investment + self.other
    }
}

/// Payable corporate tax for one certificate and one filing period.
///
/// Rates are percentages (`25.0` for 25%). The as-of date only contributes its
/// calendar year to the eligibility windows.
pub fn compute(
    table: &RateTable,
    certificate: &Certificate,
    figures: &InvestmentFigures,
    earnings: &EarningsDeclaration,
    statutory_rate: f64,
    as_of: NaiveDate,
) -> Result<CalculationResult, ValidationError> {
    validate(figures, earnings)?;

    let mut warnings = Vec::new();
    let regime = &certificate.regime;
    let kind = regime.kind();

    if let Regime::Legacy {
        decision: LegacyDecision::Decision9495,
        ..
    } = regime
    {
        warnings.push(Warning::LegacyFallbackDecision {
            decision: regime.decision().code().to_string(),
        });
    }

    let (investment_earning, other_earning) = earnings.effective_split();
    let standard_tax = earnings.total_tax_base * statutory_rate / 100.0;

    let rates = table.resolve(regime, &mut warnings);
    let effective_rate = rates.effective_rate(statutory_rate);
    let rate_gap = statutory_rate - effective_rate;

    let periods = periods_elapsed(certificate.investment_start, as_of);
    if periods < 0 {
        warnings.push(Warning::StartDateInFuture {
            periods_elapsed: periods,
        });
    }

    let ledger = ContributionLedger::open(figures, rates.contribution_rate);

    let investment = if is_investment_earning_eligible(kind, periods) {
        investment_earning * rate_gap / 100.0
    } else {
        0.0
    };
    let other_uncapped = if is_other_earning_eligible(kind, certificate.completion, periods) {
        other_earning * rate_gap / 100.0
    } else {
        0.0
    };
    let other = match kind {
        RegimeKind::Decree9903 => other_uncapped.min(ledger.other_earning_budget()),
        RegimeKind::Legacy => other_uncapped,
    };
    let split = AdvantageSplit {
        investment,
        other,
        other_uncapped,
    };

    let total_advantage = ledger.clamp_to_earned(split.total());
    let payable_tax = standard_tax - total_advantage;
    let remaining_carry_forward = ledger.remaining_after(total_advantage);
    if remaining_carry_forward < 0.0 {
        warnings.push(Warning::CarryForwardOverdrawn {
            shortfall: -remaining_carry_forward,
        });
    }

    let activity_rate = other_activity_rate(regime, certificate.completion);
    if kind == RegimeKind::Decree9903 {
        warnings.push(Warning::OtherActivityRateUnused {
            rate: activity_rate,
        });
    }

    for warning in &warnings {
        tracing::debug!(%warning, "permissive default applied");
    }
    tracing::debug!(
        decision = regime.decision().code(),
        periods,
        standard_tax,
        total_advantage,
        payable_tax,
        "computed reduced corporate tax"
    );

    Ok(CalculationResult {
        earned_contribution_to_date: ledger.earned_to_date,
        standard_tax,
        total_advantage_applied: total_advantage,
        payable_tax,
        remaining_carry_forward,
        investment_earning_used: investment_earning,
        other_earning_used: other_earning,
        contribution_rate: rates.contribution_rate,
        reduction_rate: rates.reduction_rate,
        effective_rate,
        other_activity_rate: activity_rate,
        periods_elapsed: periods,
        potential_cap: ledger.potential_cap,
        investment_advantage: split.investment,
        other_advantage: split.other,
        other_advantage_uncapped: split.other_uncapped,
        warnings,
    })
}
