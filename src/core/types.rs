use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

/// Regional incentive tier (bölge) used by the legacy schedule, 1 through 6.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RegionTier(u8);

impl RegionTier {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;
    pub const FIRST: RegionTier = RegionTier(Self::MIN);

    pub fn new(tier: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&tier).then_some(Self(tier))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = RegionTier> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl fmt::Display for RegionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the facility sits inside an organized industrial zone.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum OsbStatus {
    #[serde(rename = "var")]
    Inside,
    #[serde(rename = "yok")]
    Outside,
}

impl OsbStatus {
    pub const ALL: [OsbStatus; 2] = [OsbStatus::Inside, OsbStatus::Outside];

    /// Literal used in the legacy rate table key.
    pub fn key(self) -> &'static str {
        match self {
            OsbStatus::Inside => "var",
            OsbStatus::Outside => "yok",
        }
    }
}

impl FromStr for OsbStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "var" | "inside" | "osb" | "yes" | "true" => Ok(OsbStatus::Inside),
            "yok" | "outside" | "no" | "false" => Ok(OsbStatus::Outside),
            other => Err(format!("unknown OSB status '{other}' (expected var or yok)")),
        }
    }
}

/// Program types introduced by Presidential Decree 2025/9903.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Program {
    TechnologyMove,
    LocalDevelopmentMove,
    StrategicMove,
    PriorityInvestments,
    TargetInvestments,
}

impl Program {
    pub const ALL: [Program; 5] = [
        Program::TechnologyMove,
        Program::LocalDevelopmentMove,
        Program::StrategicMove,
        Program::PriorityInvestments,
        Program::TargetInvestments,
    ];

    /// Official program name as it appears on the certificate and in the rate table.
    pub fn label(self) -> &'static str {
        match self {
            Program::TechnologyMove => "Teknoloji Hamlesi Programı",
            Program::LocalDevelopmentMove => "Yerel Kalkınma Hamlesi Programı",
            Program::StrategicMove => "Stratejik Hamle Programı",
            Program::PriorityInvestments => "Öncelikli Yatırımlar Teşvik Sistemi",
            Program::TargetInvestments => "Hedef Yatırımlar Teşvik Sistemi",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            Program::TechnologyMove => "technology-move",
            Program::LocalDevelopmentMove => "local-development-move",
            Program::StrategicMove => "strategic-move",
            Program::PriorityInvestments => "priority-investments",
            Program::TargetInvestments => "target-investments",
        }
    }
}

impl FromStr for Program {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Program::ALL
            .into_iter()
            .find(|p| p.label() == trimmed || p.slug().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown 2025/9903 program '{trimmed}'"))
    }
}

/// Decisions that resolve through the regional legacy schedule.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum LegacyDecision {
    #[serde(rename = "2012/3305")]
    Decision3305,
    /// Accepted as a selector but has no schedule of its own.
    #[serde(rename = "2016/9495")]
    Decision9495,
}

/// Incentive decision printed on the certificate, before selectors are attached.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Decision {
    #[serde(rename = "2012/3305")]
    Decision3305,
    #[serde(rename = "2016/9495")]
    Decision9495,
    #[serde(rename = "2025/9903")]
    Decree9903,
}

impl Decision {
    pub const ALL: [Decision; 3] = [
        Decision::Decision3305,
        Decision::Decree9903,
        Decision::Decision9495,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Decision::Decision3305 => "2012/3305",
            Decision::Decision9495 => "2016/9495",
            Decision::Decree9903 => "2025/9903",
        }
    }

    pub fn kind(self) -> RegimeKind {
        match self {
            Decision::Decision3305 | Decision::Decision9495 => RegimeKind::Legacy,
            Decision::Decree9903 => RegimeKind::Decree9903,
        }
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Decision::ALL
            .into_iter()
            .find(|d| d.code() == trimmed)
            .ok_or_else(|| {
                format!("unknown decision '{trimmed}' (expected 2012/3305, 2025/9903 or 2016/9495)")
            })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RegimeKind {
    Legacy,
    Decree9903,
}

/// Regulatory regime together with the selectors that regime consults.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Regime {
    Legacy {
        decision: LegacyDecision,
        tier: RegionTier,
        osb: OsbStatus,
    },
    Decree9903 {
        program: Program,
    },
}

impl Regime {
    pub fn kind(&self) -> RegimeKind {
        match self {
            Regime::Legacy { .. } => RegimeKind::Legacy,
            Regime::Decree9903 { .. } => RegimeKind::Decree9903,
        }
    }

    pub fn decision(&self) -> Decision {
        match self {
            Regime::Legacy {
                decision: LegacyDecision::Decision3305,
                ..
            } => Decision::Decision3305,
            Regime::Legacy {
                decision: LegacyDecision::Decision9495,
                ..
            } => Decision::Decision9495,
            Regime::Decree9903 { .. } => Decision::Decree9903,
        }
    }
}

/// Completion-visa status (vize durumu).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionStatus {
    InProgress,
    Operational,
}

#[derive(Debug, Clone)]
pub struct Certificate {
    pub regime: Regime,
    pub completion: CompletionStatus,
    /// `None` when the start date could not be read; periods then count as zero.
    pub investment_start: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct InvestmentFigures {
    pub total_pledged: Option<f64>,
    pub actual_realized: Option<f64>,
    pub carried_forward: f64,
    pub previously_used: f64,
}

impl InvestmentFigures {
    pub fn realized_or_pledged(&self) -> f64 {
        self.actual_realized
            .or(self.total_pledged)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct EarningsDeclaration {
    pub total_tax_base: f64,
    pub investment_earning: f64,
    pub other_earning: f64,
}

impl EarningsDeclaration {
    /// Earnings actually fed to the calculation: when neither category is
    /// declared, the whole base counts as investment-derived.
    pub fn effective_split(&self) -> (f64, f64) {
        if self.investment_earning == 0.0 && self.other_earning == 0.0 {
            (self.total_tax_base, 0.0)
        } else {
            (self.investment_earning, self.other_earning)
        }
    }
}

/// Contribution and tax-reduction percentages resolved for a regime.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RateResolution {
    pub contribution_rate: f64,
    pub reduction_rate: f64,
}

impl RateResolution {
    pub fn effective_rate(self, statutory_rate: f64) -> f64 {
        statutory_rate * (1.0 - self.reduction_rate / 100.0)
    }
}

/// Permissive defaults the engine applied instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    #[serde(rename_all = "camelCase")]
    UnknownRateKey { key: String },
    #[serde(rename_all = "camelCase")]
    UnknownProgramRate { program: String },
    #[serde(rename_all = "camelCase")]
    UnknownProvince { province: String, assumed_tier: u8 },
    #[serde(rename_all = "camelCase")]
    LegacyFallbackDecision { decision: String },
    UnparsedStartDate,
    #[serde(rename_all = "camelCase")]
    StartDateInFuture { periods_elapsed: i32 },
    #[serde(rename_all = "camelCase")]
    CarryForwardOverdrawn { shortfall: f64 },
    #[serde(rename_all = "camelCase")]
    OtherActivityRateUnused { rate: f64 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnknownRateKey { key } => {
                write!(f, "no legacy rate for key {key}; rate 0 applied")
            }
            Warning::UnknownProgramRate { program } => {
                write!(f, "no contribution rate for program {program}; rate 0 applied")
            }
            Warning::UnknownProvince {
                province,
                assumed_tier,
            } => write!(f, "unknown province {province}; tier {assumed_tier} assumed"),
            Warning::LegacyFallbackDecision { decision } => write!(
                f,
                "decision {decision} has no schedule of its own; legacy regional rates applied"
            ),
            Warning::UnparsedStartDate => {
                write!(f, "investment start year not readable; no period decay applied")
            }
            Warning::StartDateInFuture { periods_elapsed } => write!(
                f,
                "investment starts after the as-of year ({periods_elapsed} periods)"
            ),
            Warning::CarryForwardOverdrawn { shortfall } => write!(
                f,
                "contribution usage exceeds the certificate cap by {shortfall:.2}"
            ),
            Warning::OtherActivityRateUnused { rate } => write!(
                f,
                "other-activity rate {rate}% is computed but not applied under 2025/9903"
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub earned_contribution_to_date: f64,
    pub standard_tax: f64,
    pub total_advantage_applied: f64,
    pub payable_tax: f64,
    pub remaining_carry_forward: f64,
    pub investment_earning_used: f64,
    pub other_earning_used: f64,
    pub contribution_rate: f64,
    pub reduction_rate: f64,
    pub effective_rate: f64,
    pub other_activity_rate: f64,
    pub periods_elapsed: i32,
    pub potential_cap: f64,
    pub investment_advantage: f64,
    pub other_advantage: f64,
    pub other_advantage_uncapped: f64,
    pub warnings: Vec<Warning>,
}
