use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::error::ConfigError;
use super::types::{
    CompletionStatus, OsbStatus, Program, RateResolution, Regime, RegimeKind, RegionTier, Warning,
};

const BUILTIN_RATES_JSON: &str = include_str!("../../data/rates.json");

/// Other-activity rate shown for 2025/9903 certificates.
const DECREE_9903_OTHER_ACTIVITY_RATE: f64 = 50.0;
/// Other-activity rate shown for legacy certificates still under investment.
const LEGACY_OTHER_ACTIVITY_RATE: f64 = 80.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateTableFile {
    legacy: LegacyFile,
    decree9903: Decree9903File,
    provinces: ProvincesFile,
}

#[derive(Debug, Deserialize)]
struct LegacyFile {
    contribution: BTreeMap<String, f64>,
    reduction: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Decree9903File {
    reduction_rate: f64,
    programs: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct ProvincesFile {
    legacy: BTreeMap<String, u8>,
    decree9903: BTreeMap<String, u8>,
}

/// Read-only rate configuration. Loaded once at startup and shared.
#[derive(Debug, Clone)]
pub struct RateTable {
    legacy_contribution: HashMap<String, f64>,
    legacy_reduction: HashMap<String, f64>,
    program_contribution: HashMap<Program, f64>,
    decree9903_reduction: f64,
    legacy_provinces: BTreeMap<String, RegionTier>,
    decree9903_provinces: BTreeMap<String, RegionTier>,
}

pub fn legacy_key(tier: RegionTier, osb: OsbStatus) -> String {
    format!("{}_{}", tier, osb.key())
}

impl RateTable {
    /// Table shipped with the binary.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json_str(BUILTIN_RATES_JSON)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json_str(&raw)?;
        tracing::info!(path = %path.display(), "loaded rate table");
        Ok(table)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let file: RateTableFile = serde_json::from_str(raw)?;
        Self::from_file(file)
    }

    fn from_file(file: RateTableFile) -> Result<Self, ConfigError> {
        let legacy_contribution =
            validate_legacy_section("legacy.contribution", file.legacy.contribution)?;
        let legacy_reduction = validate_legacy_section("legacy.reduction", file.legacy.reduction)?;

        check_rate("decree9903.reductionRate", file.decree9903.reduction_rate)?;
        if file.decree9903.programs.is_empty() {
            return Err(ConfigError::EmptySection("decree9903.programs"));
        }
        let mut program_contribution = HashMap::new();
        for (name, rate) in file.decree9903.programs {
            let program: Program = name
                .parse()
                .map_err(|_| ConfigError::UnknownProgram(name.clone()))?;
            check_rate(&name, rate)?;
            program_contribution.insert(program, rate);
        }
        for program in Program::ALL {
            if !program_contribution.contains_key(&program) {
                tracing::warn!(program = program.label(), "program missing from rate table");
            }
        }

        let legacy_provinces = validate_provinces("provinces.legacy", file.provinces.legacy)?;
        let decree9903_provinces =
            validate_provinces("provinces.decree9903", file.provinces.decree9903)?;

        Ok(Self {
            legacy_contribution,
            legacy_reduction,
            program_contribution,
            decree9903_reduction: file.decree9903.reduction_rate,
            legacy_provinces,
            decree9903_provinces,
        })
    }

    /// Contribution and reduction rates for the regime. Unknown keys resolve to
    /// zero and are reported in `warnings`.
    pub fn resolve(&self, regime: &Regime, warnings: &mut Vec<Warning>) -> RateResolution {
        match *regime {
            Regime::Legacy { tier, osb, .. } => {
                let key = legacy_key(tier, osb);
                let contribution = self.legacy_contribution.get(&key).copied();
                let reduction = self.legacy_reduction.get(&key).copied();
                if contribution.is_none() || reduction.is_none() {
                    tracing::warn!(%key, "legacy rate key not in table");
                    warnings.push(Warning::UnknownRateKey { key });
                }
                RateResolution {
                    contribution_rate: contribution.unwrap_or(0.0),
                    reduction_rate: reduction.unwrap_or(0.0),
                }
            }
            Regime::Decree9903 { program } => {
                let contribution = self.program_rate(program);
                if contribution.is_none() {
                    tracing::warn!(program = program.label(), "program rate not in table");
                    warnings.push(Warning::UnknownProgramRate {
                        program: program.label().to_string(),
                    });
                }
                RateResolution {
                    contribution_rate: contribution.unwrap_or(0.0),
                    reduction_rate: self.decree9903_reduction,
                }
            }
        }
    }

    pub fn legacy_rates(&self, tier: RegionTier, osb: OsbStatus) -> Option<RateResolution> {
        let key = legacy_key(tier, osb);
        Some(RateResolution {
            contribution_rate: *self.legacy_contribution.get(&key)?,
            reduction_rate: *self.legacy_reduction.get(&key)?,
        })
    }

    pub fn program_rate(&self, program: Program) -> Option<f64> {
        self.program_contribution.get(&program).copied()
    }

    pub fn decree9903_reduction_rate(&self) -> f64 {
        self.decree9903_reduction
    }

    /// Region tier of a province under the given regime's own map.
    pub fn province_tier(&self, kind: RegimeKind, province: &str) -> Option<RegionTier> {
        let map = self.province_map(kind);
        let wanted = province.trim();
        map.get(wanted).copied().or_else(|| {
            let folded = wanted.to_lowercase();
            map.iter()
                .find(|(name, _)| name.to_lowercase() == folded)
                .map(|(_, tier)| *tier)
        })
    }

    pub fn provinces(&self, kind: RegimeKind) -> impl Iterator<Item = (&str, RegionTier)> {
        self.province_map(kind)
            .iter()
            .map(|(name, tier)| (name.as_str(), *tier))
    }

    fn province_map(&self, kind: RegimeKind) -> &BTreeMap<String, RegionTier> {
        match kind {
            RegimeKind::Legacy => &self.legacy_provinces,
            RegimeKind::Decree9903 => &self.decree9903_provinces,
        }
    }
}

/// Other-activity rate the certificate form displays. It never enters the
/// advantage arithmetic.
pub fn other_activity_rate(regime: &Regime, completion: CompletionStatus) -> f64 {
    match (regime, completion) {
        (Regime::Decree9903 { .. }, _) => DECREE_9903_OTHER_ACTIVITY_RATE,
        (Regime::Legacy { .. }, CompletionStatus::InProgress) => LEGACY_OTHER_ACTIVITY_RATE,
        (Regime::Legacy { .. }, CompletionStatus::Operational) => 0.0,
    }
}

fn check_rate(key: &str, rate: f64) -> Result<(), ConfigError> {
    if rate.is_finite() && (0.0..=100.0).contains(&rate) {
        Ok(())
    } else {
        Err(ConfigError::RateOutOfRange {
            key: key.to_string(),
            rate,
        })
    }
}

fn validate_legacy_section(
    section: &'static str,
    entries: BTreeMap<String, f64>,
) -> Result<HashMap<String, f64>, ConfigError> {
    if entries.is_empty() {
        return Err(ConfigError::EmptySection(section));
    }
    for (key, rate) in &entries {
        parse_legacy_key(key).ok_or_else(|| ConfigError::InvalidKey(key.clone()))?;
        check_rate(key, *rate)?;
    }
    for tier in RegionTier::all() {
        for osb in OsbStatus::ALL {
            let key = legacy_key(tier, osb);
            if !entries.contains_key(&key) {
                tracing::warn!(section, %key, "legacy schedule entry missing; resolves to 0");
            }
        }
    }
    Ok(entries.into_iter().collect())
}

fn parse_legacy_key(key: &str) -> Option<(RegionTier, OsbStatus)> {
    let (tier, osb) = key.split_once('_')?;
    let tier = RegionTier::new(tier.parse().ok()?)?;
    let osb = match osb {
        "var" => OsbStatus::Inside,
        "yok" => OsbStatus::Outside,
        _ => return None,
    };
    Some((tier, osb))
}

fn validate_provinces(
    section: &'static str,
    entries: BTreeMap<String, u8>,
) -> Result<BTreeMap<String, RegionTier>, ConfigError> {
    if entries.is_empty() {
        return Err(ConfigError::EmptySection(section));
    }
    entries
        .into_iter()
        .map(|(province, tier)| match RegionTier::new(tier) {
            Some(t) => Ok((province, t)),
            None => Err(ConfigError::InvalidTier { province, tier }),
        })
        .collect()
}
