use super::error::ValidationError;
use super::types::{EarningsDeclaration, InvestmentFigures};

/// Slack allowed when earnings are reconciled against the tax base.
pub const BASE_TOLERANCE: f64 = 1.0;

pub fn validate(
    figures: &InvestmentFigures,
    earnings: &EarningsDeclaration,
) -> Result<(), ValidationError> {
    validate_earnings(earnings)?;
    validate_figures(figures)
}

pub fn validate_earnings(earnings: &EarningsDeclaration) -> Result<(), ValidationError> {
    if !earnings.total_tax_base.is_finite() || earnings.total_tax_base <= 0.0 {
        return Err(ValidationError::NonPositiveBase);
    }
    non_negative("investmentEarning", earnings.investment_earning)?;
    non_negative("otherEarning", earnings.other_earning)?;

    if earnings.investment_earning + earnings.other_earning
        > earnings.total_tax_base + BASE_TOLERANCE
    {
        return Err(ValidationError::BaseExceeded {
            investment: earnings.investment_earning,
            other: earnings.other_earning,
            base: earnings.total_tax_base,
        });
    }
    Ok(())
}

pub fn validate_figures(figures: &InvestmentFigures) -> Result<(), ValidationError> {
    let Some(total_pledged) = figures.total_pledged else {
        return Err(ValidationError::MissingPledgedAmount);
    };
    non_negative("totalPledged", total_pledged)?;
    if let Some(realized) = figures.actual_realized {
        non_negative("actualRealized", realized)?;
    }
    non_negative("carriedForward", figures.carried_forward)?;
    non_negative("previouslyUsed", figures.previously_used)
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NegativeAmount { field })
    }
}
