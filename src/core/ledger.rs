use super::types::InvestmentFigures;

/// Share of the lifetime cap that other-activity earnings may consume under 2025/9903.
pub const DECREE_9903_OTHER_EARNING_SHARE: f64 = 0.5;

pub fn potential_cap(total_pledged: f64, contribution_rate: f64) -> f64 {
    total_pledged * contribution_rate / 100.0
}

pub fn earned_to_date(actual_realized: f64, contribution_rate: f64, carried_forward: f64) -> f64 {
    actual_realized * contribution_rate / 100.0 + carried_forward
}

/// Not clamped: a negative balance means the entitlement is over-drawn.
pub fn remaining(cap: f64, previously_used: f64, current_advantage: f64) -> f64 {
    cap - (previously_used + current_advantage)
}

/// Contribution entitlement of one certificate for the current period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContributionLedger {
    pub potential_cap: f64,
    pub earned_to_date: f64,
    pub previously_used: f64,
}

impl ContributionLedger {
    pub fn open(figures: &InvestmentFigures, contribution_rate: f64) -> Self {
        Self {
            potential_cap: potential_cap(figures.total_pledged.unwrap_or(0.0), contribution_rate),
            earned_to_date: earned_to_date(
                figures.realized_or_pledged(),
                contribution_rate,
                figures.carried_forward,
            ),
            previously_used: figures.previously_used,
        }
    }

    pub fn other_earning_budget(&self) -> f64 {
        self.potential_cap * DECREE_9903_OTHER_EARNING_SHARE
    }

    /// Usage can never run ahead of what realized spending has earned.
    pub fn clamp_to_earned(&self, advantage: f64) -> f64 {
        advantage.min(self.earned_to_date)
    }

    pub fn remaining_after(&self, advantage: f64) -> f64 {
        remaining(self.potential_cap, self.previously_used, advantage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figures(pledged: f64, realized: Option<f64>) -> InvestmentFigures {
        InvestmentFigures {
            total_pledged: Some(pledged),
            actual_realized: realized,
            carried_forward: 0.0,
            previously_used: 0.0,
        }
    }

    #[test]
    fn cap_and_earned_follow_contribution_rate() {
        assert_eq!(potential_cap(50_000_000.0, 15.0), 7_500_000.0);
        assert_eq!(earned_to_date(15_000_000.0, 15.0, 0.0), 2_250_000.0);
        assert_eq!(earned_to_date(15_000_000.0, 15.0, 100_000.0), 2_350_000.0);
    }

    #[test]
    fn remaining_may_go_negative() {
        assert_eq!(remaining(1_000.0, 800.0, 150.0), 50.0);
        assert_eq!(remaining(1_000.0, 800.0, 300.0), -100.0);
    }

    #[test]
    fn realized_defaults_to_pledged() {
        let ledger = ContributionLedger::open(&figures(10_000_000.0, None), 20.0);
        assert_eq!(ledger.potential_cap, 2_000_000.0);
        assert_eq!(ledger.earned_to_date, 2_000_000.0);
    }

    #[test]
    fn clamps_usage_to_earned_entitlement() {
        let ledger = ContributionLedger::open(&figures(10_000_000.0, Some(1_000_000.0)), 20.0);
        assert_eq!(ledger.earned_to_date, 200_000.0);
        assert_eq!(ledger.clamp_to_earned(350_000.0), 200_000.0);
        assert_eq!(ledger.clamp_to_earned(50_000.0), 50_000.0);
        assert_eq!(ledger.other_earning_budget(), 1_000_000.0);
        assert_eq!(ledger.remaining_after(200_000.0), 1_800_000.0);
    }
}
