use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    CalculationResult, Certificate, CompletionStatus, ConfigError, Decision, EarningsDeclaration,
    InvestmentFigures, LegacyDecision, OsbStatus, Program, RateTable, Regime, RegimeKind,
    RegionTier, ValidationError, Warning, compute, format_rate, format_try, parse_amount,
    parse_start_date,
};

/// Tier assumed when a province is missing from the decision's map.
const FALLBACK_TIER: RegionTier = RegionTier::FIRST;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCompletionStatus {
    #[value(alias = "yatirim")]
    InProgress,
    #[value(alias = "isletme")]
    Operational,
}

impl From<CliCompletionStatus> for CompletionStatus {
    fn from(value: CliCompletionStatus) -> Self {
        match value {
            CliCompletionStatus::InProgress => CompletionStatus::InProgress,
            CliCompletionStatus::Operational => CompletionStatus::Operational,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiCompletionStatus {
    #[serde(alias = "inProgress", alias = "in_progress", alias = "yatirim")]
    InProgress,
    #[serde(alias = "isletme")]
    Operational,
}

impl From<ApiCompletionStatus> for CliCompletionStatus {
    fn from(value: ApiCompletionStatus) -> Self {
        match value {
            ApiCompletionStatus::InProgress => CliCompletionStatus::InProgress,
            ApiCompletionStatus::Operational => CliCompletionStatus::Operational,
        }
    }
}

/// Amount as typed into a form (`"5.000.000,00"`) or sent as a JSON number.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
enum AmountInput {
    Text(String),
    Number(f64),
}

impl FromStr for AmountInput {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AmountInput::Text(s.to_string()))
    }
}

impl AmountInput {
    fn resolve(&self, field: &'static str) -> Result<Option<f64>, ValidationError> {
        match self {
            AmountInput::Text(raw) => parse_amount(field, raw),
            AmountInput::Number(value) => Ok(Some(*value)),
        }
    }
}

fn resolve_amount(
    field: &'static str,
    input: Option<&AmountInput>,
) -> Result<Option<f64>, ValidationError> {
    match input {
        Some(input) => input.resolve(field),
        None => Ok(None),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CalculatePayload {
    decision: Option<String>,
    province: Option<String>,
    region: Option<u8>,
    osb: Option<String>,
    program: Option<String>,
    completion: Option<ApiCompletionStatus>,
    start_date: Option<String>,

    total_pledged: Option<AmountInput>,
    actual_realized: Option<AmountInput>,
    carried_forward: Option<AmountInput>,
    previously_used: Option<AmountInput>,

    total_tax_base: Option<AmountInput>,
    investment_earning: Option<AmountInput>,
    other_earning: Option<AmountInput>,

    statutory_rate: Option<f64>,
    as_of_year: Option<i32>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ikv",
    about = "Reduced corporate tax (indirimli kurumlar vergisi) calculator for investment incentive certificates"
)]
pub struct Cli {
    #[arg(
        long,
        default_value = "2012/3305",
        help = "Incentive decision: 2012/3305, 2025/9903 or 2016/9495"
    )]
    decision: String,
    #[arg(long, help = "Province of the investment; resolves the region tier")]
    province: Option<String>,
    #[arg(long, help = "Legacy region tier 1-6; takes precedence over --province")]
    region: Option<u8>,
    #[arg(long, default_value = "yok", help = "Organized industrial zone: var or yok")]
    osb: String,
    #[arg(long, help = "2025/9903 program, e.g. \"Stratejik Hamle Programı\"")]
    program: Option<String>,
    #[arg(long, value_enum, default_value_t = CliCompletionStatus::InProgress)]
    completion: CliCompletionStatus,
    #[arg(long, help = "Investment start date, DD.MM.YYYY")]
    start_date: Option<String>,

    #[arg(long, help = "Total investment amount on the certificate, e.g. 50.000.000,00")]
    total_pledged: Option<AmountInput>,
    #[arg(long, help = "Investment actually realized to date; defaults to --total-pledged")]
    actual_realized: Option<AmountInput>,
    #[arg(long, help = "Indexed contribution carried forward from earlier periods")]
    carried_forward: Option<AmountInput>,
    #[arg(long, help = "Contribution already used in earlier periods")]
    previously_used: Option<AmountInput>,

    #[arg(long, help = "Corporate tax base for the period")]
    total_tax_base: Option<AmountInput>,
    #[arg(long, help = "Earnings derived from the incentivized investment")]
    investment_earning: Option<AmountInput>,
    #[arg(long, help = "Earnings from other activities")]
    other_earning: Option<AmountInput>,

    #[arg(
        long,
        default_value_t = 25.0,
        help = "Statutory corporate tax rate in percent"
    )]
    statutory_rate: f64,
    #[arg(long, help = "Filing year; defaults to the current year")]
    as_of_year: Option<i32>,

    #[arg(long, env = "IKV_RATES", help = "Rate table JSON; defaults to the built-in table")]
    rates: Option<PathBuf>,
    #[arg(long, help = "Print the result as JSON")]
    json: bool,
}

#[derive(Debug)]
struct CalculationRequest {
    certificate: Certificate,
    figures: InvestmentFigures,
    earnings: EarningsDeclaration,
    statutory_rate: f64,
    as_of: NaiveDate,
    warnings: Vec<Warning>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to render result: {0}")]
    Render(#[from] serde_json::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.code()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR"),
            ApiError::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, "RENDER_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        error_response(status, code, &self.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DisplayAmounts {
    standard_tax: String,
    total_advantage_applied: String,
    payable_tax: String,
    remaining_carry_forward: String,
    earned_contribution_to_date: String,
    effective_rate: String,
}

impl DisplayAmounts {
    fn from_result(result: &CalculationResult) -> Self {
        Self {
            standard_tax: format_try(result.standard_tax),
            total_advantage_applied: format_try(result.total_advantage_applied),
            payable_tax: format_try(result.payable_tax),
            remaining_carry_forward: format_try(result.remaining_carry_forward),
            earned_contribution_to_date: format_try(result.earned_contribution_to_date),
            effective_rate: format_rate(result.effective_rate),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalculateResponse {
    decision: Decision,
    regime: RegimeKind,
    region_tier: Option<RegionTier>,
    osb: Option<OsbStatus>,
    program: Option<&'static str>,
    completion: CompletionStatus,
    statutory_rate: f64,
    as_of_year: i32,
    result: CalculationResult,
    display: DisplayAmounts,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRateRow {
    tier: RegionTier,
    osb: OsbStatus,
    contribution_rate: f64,
    reduction_rate: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgramRateRow {
    program: &'static str,
    contribution_rate: Option<f64>,
    reduction_rate: f64,
}

#[derive(Debug, Serialize)]
struct ProvinceTiers<'a> {
    legacy: BTreeMap<&'a str, RegionTier>,
    decree9903: BTreeMap<&'a str, RegionTier>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RatesResponse<'a> {
    decisions: Vec<&'static str>,
    legacy: Vec<LegacyRateRow>,
    programs: Vec<ProgramRateRow>,
    provinces: ProvinceTiers<'a>,
}

#[derive(Clone)]
struct AppState {
    table: Arc<RateTable>,
}

pub fn load_rate_table(path: Option<&Path>) -> Result<RateTable, ConfigError> {
    match path {
        Some(path) => RateTable::load(path),
        None => {
            let table = RateTable::builtin()?;
            tracing::debug!("using built-in rate table");
            Ok(table)
        }
    }
}

fn parse_decision(raw: &str) -> Result<Decision, ApiError> {
    raw.parse().map_err(ApiError::BadRequest)
}

fn resolve_regime(
    table: &RateTable,
    cli: &Cli,
    warnings: &mut Vec<Warning>,
) -> Result<Regime, ApiError> {
    let decision = parse_decision(&cli.decision)?;
    if decision.kind() == RegimeKind::Decree9903 {
        let Some(name) = cli.program.as_deref() else {
            return Err(ApiError::BadRequest(
                "--program is required for decision 2025/9903".to_string(),
            ));
        };
        let program: Program = name.parse().map_err(ApiError::BadRequest)?;
        return Ok(Regime::Decree9903 { program });
    }

    let tier = match (cli.region, cli.province.as_deref()) {
        (Some(region), _) => RegionTier::new(region).ok_or_else(|| {
            ApiError::BadRequest("--region must be between 1 and 6".to_string())
        })?,
        (None, Some(province)) => match table.province_tier(RegimeKind::Legacy, province) {
            Some(tier) => tier,
            None => {
                tracing::warn!(province, "province not in legacy region map");
                warnings.push(Warning::UnknownProvince {
                    province: province.to_string(),
                    assumed_tier: FALLBACK_TIER.get(),
                });
                FALLBACK_TIER
            }
        },
        (None, None) => {
            return Err(ApiError::BadRequest(
                "--region or --province is required for legacy decisions".to_string(),
            ));
        }
    };
    let osb: OsbStatus = cli.osb.parse().map_err(ApiError::BadRequest)?;
    let decision = match decision {
        Decision::Decision9495 => LegacyDecision::Decision9495,
        _ => LegacyDecision::Decision3305,
    };

    Ok(Regime::Legacy {
        decision,
        tier,
        osb,
    })
}

fn build_request(table: &RateTable, cli: &Cli) -> Result<CalculationRequest, ApiError> {
    if !(0.0..=100.0).contains(&cli.statutory_rate) {
        return Err(ApiError::BadRequest(
            "--statutory-rate must be between 0 and 100".to_string(),
        ));
    }

    let as_of_year = cli.as_of_year.unwrap_or_else(|| Local::now().year());
    let as_of = NaiveDate::from_ymd_opt(as_of_year, 1, 1)
        .ok_or_else(|| ApiError::BadRequest(format!("--as-of-year {as_of_year} is not valid")))?;

    let mut warnings = Vec::new();
    let regime = resolve_regime(table, cli, &mut warnings)?;

    let investment_start = match cli.start_date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            let parsed = parse_start_date(raw);
            if parsed.is_none() {
                tracing::warn!(start_date = raw, "investment start year not readable");
                warnings.push(Warning::UnparsedStartDate);
            }
            parsed
        }
        _ => None,
    };

    let total_pledged = resolve_amount("totalPledged", cli.total_pledged.as_ref())?;
    let actual_realized = resolve_amount("actualRealized", cli.actual_realized.as_ref())?
        .filter(|realized| *realized != 0.0);
    let figures = InvestmentFigures {
        total_pledged,
        actual_realized,
        carried_forward: resolve_amount("carriedForward", cli.carried_forward.as_ref())?
            .unwrap_or(0.0),
        previously_used: resolve_amount("previouslyUsed", cli.previously_used.as_ref())?
            .unwrap_or(0.0),
    };

    let earnings = EarningsDeclaration {
        total_tax_base: resolve_amount("totalTaxBase", cli.total_tax_base.as_ref())?
            .unwrap_or(0.0),
        investment_earning: resolve_amount("investmentEarning", cli.investment_earning.as_ref())?
            .unwrap_or(0.0),
        other_earning: resolve_amount("otherEarning", cli.other_earning.as_ref())?
            .unwrap_or(0.0),
    };

    Ok(CalculationRequest {
        certificate: Certificate {
            regime,
            completion: cli.completion.into(),
            investment_start,
        },
        figures,
        earnings,
        statutory_rate: cli.statutory_rate,
        as_of,
        warnings,
    })
}

fn run_request(table: &RateTable, request: CalculationRequest) -> Result<CalculateResponse, ApiError> {
    let mut result = compute(
        table,
        &request.certificate,
        &request.figures,
        &request.earnings,
        request.statutory_rate,
        request.as_of,
    )?;
    let mut warnings = request.warnings;
    warnings.append(&mut result.warnings);
    result.warnings = warnings;

    let regime = request.certificate.regime;
    let (region_tier, osb, program) = match regime {
        Regime::Legacy { tier, osb, .. } => (Some(tier), Some(osb), None),
        Regime::Decree9903 { program } => (None, None, Some(program.label())),
    };

    Ok(CalculateResponse {
        decision: regime.decision(),
        regime: regime.kind(),
        region_tier,
        osb,
        program,
        completion: request.certificate.completion,
        statutory_rate: request.statutory_rate,
        as_of_year: request.as_of.year(),
        display: DisplayAmounts::from_result(&result),
        result,
    })
}

fn render_summary(response: &CalculateResponse) -> String {
    let result = &response.result;
    let selector = match (response.region_tier, response.osb, response.program) {
        (Some(tier), Some(osb), _) => format!("region {tier}, OSB {}", osb.key()),
        (_, _, Some(program)) => program.to_string(),
        _ => String::new(),
    };

    let mut lines = vec![
        format!("Decision:                   {} ({selector})", response.decision.code()),
        format!(
            "Contribution / reduction:   {} / {}",
            format_rate(result.contribution_rate),
            format_rate(result.reduction_rate)
        ),
        format!("Reduced tax rate:           {}", response.display.effective_rate),
        format!("Periods elapsed:            {}", result.periods_elapsed),
        format!("Standard corporate tax:     {}", response.display.standard_tax),
        format!(
            "Investment advantage:       {}",
            format_try(result.investment_advantage)
        ),
        format!("Other-activity advantage:   {}", format_try(result.other_advantage)),
        format!(
            "Advantage applied:          {}",
            response.display.total_advantage_applied
        ),
        format!("Payable tax:                {}", response.display.payable_tax),
        format!("Contribution cap:           {}", format_try(result.potential_cap)),
        format!(
            "Earned contribution:        {}",
            response.display.earned_contribution_to_date
        ),
        format!(
            "Remaining carry-forward:    {}",
            response.display.remaining_carry_forward
        ),
    ];
    for warning in &result.warnings {
        lines.push(format!("warning: {warning}"));
    }
    lines.join("\n")
}

pub fn run_cli() -> Result<String, ApiError> {
    run_cli_with(Cli::parse())
}

fn run_cli_with(cli: Cli) -> Result<String, ApiError> {
    let table = load_rate_table(cli.rates.as_deref())?;
    let request = build_request(&table, &cli)?;
    let response = run_request(&table, request)?;
    if cli.json {
        Ok(serde_json::to_string_pretty(&response)?)
    } else {
        Ok(render_summary(&response))
    }
}

pub async fn run_http_server(port: u16, table: RateTable) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let state = AppState {
        table: Arc::new(table),
    };
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/rates", get(rates_handler))
        .route(
            "/api/calculate",
            get(calculate_get_handler).post(calculate_post_handler),
        )
        .fallback(not_found_handler)
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "reduced corporate tax API listening");

    axum::serve(listener, app).await
}

async fn health_handler() -> impl IntoResponse {
    with_cache_control("ok")
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "NOT_FOUND", "Not found")
}

async fn rates_handler(State(state): State<AppState>) -> Response {
    json_response(StatusCode::OK, build_rates_response(&state.table))
}

async fn calculate_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<CalculatePayload>,
) -> Response {
    calculate_handler_impl(&state, payload)
}

async fn calculate_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<CalculatePayload>,
) -> Response {
    calculate_handler_impl(&state, payload)
}

fn calculate_handler_impl(state: &AppState, payload: CalculatePayload) -> Response {
    let outcome = api_request_from_payload(&state.table, payload)
        .and_then(|request| run_request(&state.table, request));
    match outcome {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => {
            tracing::info!(error = %err, "calculation request rejected");
            err.into_response()
        }
    }
}

fn build_rates_response(table: &RateTable) -> RatesResponse<'_> {
    let legacy = RegionTier::all()
        .flat_map(|tier| OsbStatus::ALL.into_iter().map(move |osb| (tier, osb)))
        .filter_map(|(tier, osb)| {
            table.legacy_rates(tier, osb).map(|rates| LegacyRateRow {
                tier,
                osb,
                contribution_rate: rates.contribution_rate,
                reduction_rate: rates.reduction_rate,
            })
        })
        .collect();
    let programs = Program::ALL
        .into_iter()
        .map(|program| ProgramRateRow {
            program: program.label(),
            contribution_rate: table.program_rate(program),
            reduction_rate: table.decree9903_reduction_rate(),
        })
        .collect();

    RatesResponse {
        decisions: Decision::ALL.into_iter().map(Decision::code).collect(),
        legacy,
        programs,
        provinces: ProvinceTiers {
            legacy: table.provinces(RegimeKind::Legacy).collect(),
            decree9903: table.provinces(RegimeKind::Decree9903).collect(),
        },
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, code: &'static str, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            code,
        },
    )
}

#[cfg(test)]
fn api_request_from_json(table: &RateTable, json: &str) -> Result<CalculationRequest, ApiError> {
    let payload = serde_json::from_str::<CalculatePayload>(json)
        .map_err(|e| ApiError::BadRequest(format!("Invalid API JSON payload: {e}")))?;
    api_request_from_payload(table, payload)
}

fn api_request_from_payload(
    table: &RateTable,
    payload: CalculatePayload,
) -> Result<CalculationRequest, ApiError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.decision {
        cli.decision = v;
    }
    if let Some(v) = payload.province {
        cli.province = Some(v);
    }
    if let Some(v) = payload.region {
        cli.region = Some(v);
    }
    if let Some(v) = payload.osb {
        cli.osb = v;
    }
    if let Some(v) = payload.program {
        cli.program = Some(v);
    }
    if let Some(v) = payload.completion {
        cli.completion = v.into();
    }
    if let Some(v) = payload.start_date {
        cli.start_date = Some(v);
    }

    if let Some(v) = payload.total_pledged {
        cli.total_pledged = Some(v);
    }
    if let Some(v) = payload.actual_realized {
        cli.actual_realized = Some(v);
    }
    if let Some(v) = payload.carried_forward {
        cli.carried_forward = Some(v);
    }
    if let Some(v) = payload.previously_used {
        cli.previously_used = Some(v);
    }

    if let Some(v) = payload.total_tax_base {
        cli.total_tax_base = Some(v);
    }
    if let Some(v) = payload.investment_earning {
        cli.investment_earning = Some(v);
    }
    if let Some(v) = payload.other_earning {
        cli.other_earning = Some(v);
    }

    if let Some(v) = payload.statutory_rate {
        cli.statutory_rate = v;
    }
    if let Some(v) = payload.as_of_year {
        cli.as_of_year = Some(v);
    }

    build_request(table, &cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        decision: Decision::Decision3305.code().to_string(),
        province: Some("Ankara".to_string()),
        region: None,
        osb: OsbStatus::Outside.key().to_string(),
        program: None,
        completion: CliCompletionStatus::InProgress,
        start_date: None,
        total_pledged: None,
        actual_realized: None,
        carried_forward: None,
        previously_used: None,
        total_tax_base: None,
        investment_earning: None,
        other_earning: None,
        statutory_rate: 25.0,
        as_of_year: None,
        rates: None,
        json: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;
    use std::fs;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn table() -> RateTable {
        RateTable::builtin().expect("builtin table is valid")
    }

    fn sample_cli() -> Cli {
        let mut cli = default_cli_for_api();
        cli.region = Some(1);
        cli.start_date = Some("01.01.2025".to_string());
        cli.total_pledged = Some(AmountInput::Text("50.000.000".to_string()));
        cli.actual_realized = Some(AmountInput::Text("15.000.000".to_string()));
        cli.total_tax_base = Some(AmountInput::Text("5.000.000,00".to_string()));
        cli.investment_earning = Some(AmountInput::Text("3.000.000".to_string()));
        cli.other_earning = Some(AmountInput::Text("2.000.000".to_string()));
        cli.as_of_year = Some(2025);
        cli
    }

    fn assert_golden_snapshot(path: &str, actual: &str) {
        let update = matches!(
            std::env::var("UPDATE_GOLDEN").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE")
        );
        let snapshot_path = Path::new(path);

        if update {
            if let Some(parent) = snapshot_path.parent() {
                fs::create_dir_all(parent).expect("failed to create snapshot directory");
            }
            fs::write(snapshot_path, actual).expect("failed to write golden snapshot");
            return;
        }

        let expected = fs::read_to_string(snapshot_path).unwrap_or_else(|_| {
            panic!("missing golden snapshot at {path}; run with UPDATE_GOLDEN=1 to generate")
        });
        assert_eq!(
            actual, expected,
            "snapshot mismatch for {path}; run with UPDATE_GOLDEN=1 to refresh if expected"
        );
    }

    #[test]
    fn build_request_parses_locale_amounts() {
        let request = build_request(&table(), &sample_cli()).expect("valid request");

        assert_eq!(request.figures.total_pledged, Some(50_000_000.0));
        assert_eq!(request.figures.actual_realized, Some(15_000_000.0));
        assert_approx(request.figures.carried_forward, 0.0);
        assert_approx(request.earnings.total_tax_base, 5_000_000.0);
        assert_approx(request.earnings.investment_earning, 3_000_000.0);
        assert_approx(request.earnings.other_earning, 2_000_000.0);
        assert_eq!(request.as_of, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(request.warnings.is_empty());
    }

    #[test]
    fn build_request_treats_zero_realized_as_unspecified() {
        let mut cli = sample_cli();
        cli.actual_realized = Some(AmountInput::Text("0".to_string()));

        let request = build_request(&table(), &cli).expect("valid request");
        assert_eq!(request.figures.actual_realized, None);
        assert_approx(request.figures.realized_or_pledged(), 50_000_000.0);
    }

    #[test]
    fn build_request_resolves_province_through_legacy_map() {
        let mut cli = sample_cli();
        cli.region = None;
        cli.province = Some("Van".to_string());
        cli.osb = "var".to_string();

        let request = build_request(&table(), &cli).expect("valid request");
        match request.certificate.regime {
            Regime::Legacy { tier, osb, .. } => {
                assert_eq!(tier.get(), 6);
                assert_eq!(osb, OsbStatus::Inside);
            }
            other => panic!("expected legacy regime, got {other:?}"),
        }
    }

    #[test]
    fn build_request_warns_on_unknown_province() {
        let mut cli = sample_cli();
        cli.region = None;
        cli.province = Some("Atlantis".to_string());

        let request = build_request(&table(), &cli).expect("valid request");
        assert_eq!(
            request.warnings,
            vec![Warning::UnknownProvince {
                province: "Atlantis".to_string(),
                assumed_tier: 1
            }]
        );
        match request.certificate.regime {
            Regime::Legacy { tier, .. } => assert_eq!(tier, RegionTier::FIRST),
            other => panic!("expected legacy regime, got {other:?}"),
        }
    }

    #[test]
    fn build_request_requires_program_for_decree_9903() {
        let mut cli = sample_cli();
        cli.decision = "2025/9903".to_string();

        let err = build_request(&table(), &cli).expect_err("program is required");
        assert!(err.to_string().contains("--program"));

        cli.program = Some("Stratejik Hamle Programı".to_string());
        let request = build_request(&table(), &cli).expect("valid request");
        assert_eq!(
            request.certificate.regime,
            Regime::Decree9903 {
                program: Program::StrategicMove
            }
        );
    }

    #[test]
    fn build_request_rejects_invalid_selectors() {
        let mut cli = sample_cli();
        cli.decision = "2030/1".to_string();
        let err = build_request(&table(), &cli).expect_err("unknown decision");
        assert!(matches!(err, ApiError::BadRequest(_)));

        let mut cli = sample_cli();
        cli.region = Some(7);
        let err = build_request(&table(), &cli).expect_err("tier 7");
        assert!(err.to_string().contains("--region"));

        let mut cli = sample_cli();
        cli.osb = "belki".to_string();
        assert!(build_request(&table(), &cli).is_err());

        let mut cli = sample_cli();
        cli.statutory_rate = 120.0;
        let err = build_request(&table(), &cli).expect_err("rate above 100");
        assert!(err.to_string().contains("--statutory-rate"));
    }

    #[test]
    fn build_request_flags_unreadable_start_date() {
        let mut cli = sample_cli();
        cli.start_date = Some("geçen yıl".to_string());

        let request = build_request(&table(), &cli).expect("valid request");
        assert_eq!(request.certificate.investment_start, None);
        assert_eq!(request.warnings, vec![Warning::UnparsedStartDate]);
    }

    #[test]
    fn short_or_iso_start_year_does_not_decay_eligibility() {
        for raw in ["01.01.25", "01.01.999", "2019-03-01"] {
            let mut cli = sample_cli();
            cli.decision = "2025/9903".to_string();
            cli.program = Some("Teknoloji Hamlesi Programı".to_string());
            cli.start_date = Some(raw.to_string());

            let table = table();
            let request = build_request(&table, &cli).expect("valid request");
            assert_eq!(request.certificate.investment_start, None, "{raw}");

            let response = run_request(&table, request).expect("valid calculation");
            let result = &response.result;
            assert_eq!(result.periods_elapsed, 0, "{raw}");
            assert_approx(result.investment_advantage, 450_000.0);
            assert_approx(result.other_advantage, 300_000.0);
            assert_approx(result.payable_tax, 500_000.0);
            assert!(result.warnings.contains(&Warning::UnparsedStartDate), "{raw}");
        }
    }

    #[test]
    fn malformed_amount_maps_to_unprocessable_entity() {
        let mut cli = sample_cli();
        cli.total_tax_base = Some(AmountInput::Text("çok".to_string()));

        let err = build_request(&table(), &cli).expect_err("malformed amount");
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "MALFORMED_AMOUNT");
    }

    #[test]
    fn validation_errors_surface_from_engine() {
        let mut cli = sample_cli();
        cli.other_earning = Some(AmountInput::Text("2.000.002".to_string()));
        let request = build_request(&table(), &cli).expect("parsing succeeds");

        let err = run_request(&table(), request).expect_err("earnings exceed base");
        assert_eq!(err.status_and_code().1, "BASE_EXCEEDED");

        let mut cli = sample_cli();
        cli.total_pledged = None;
        let request = build_request(&table(), &cli).expect("parsing succeeds");
        let err = run_request(&table(), request).expect_err("pledged amount missing");
        assert_eq!(err.status_and_code().1, "MISSING_PLEDGED_AMOUNT");
    }

    #[test]
    fn api_request_from_json_accepts_strings_and_numbers() {
        let json = r#"{
          "decision": "2025/9903",
          "program": "Teknoloji Hamlesi Programı",
          "completion": "yatirim",
          "startDate": "15.03.2023",
          "totalPledged": 50000000,
          "actualRealized": "15.000.000,00",
          "carriedForward": 125000.5,
          "totalTaxBase": "5.000.000",
          "investmentEarning": 3000000,
          "otherEarning": "2.000.000",
          "statutoryRate": 25,
          "asOfYear": 2025
        }"#;
        let request = api_request_from_json(&table(), json).expect("json should parse");

        assert_eq!(
            request.certificate.regime,
            Regime::Decree9903 {
                program: Program::TechnologyMove
            }
        );
        assert_eq!(request.certificate.completion, CompletionStatus::InProgress);
        assert_eq!(request.figures.total_pledged, Some(50_000_000.0));
        assert_eq!(request.figures.actual_realized, Some(15_000_000.0));
        assert_approx(request.figures.carried_forward, 125_000.5);
        assert_approx(request.earnings.investment_earning, 3_000_000.0);
        assert_approx(request.earnings.other_earning, 2_000_000.0);
    }

    #[test]
    fn api_request_from_query_string() {
        let uri: Uri = "http://localhost/api/calculate?decision=2012/3305&region=2&osb=var\
                        &completion=operational&totalPledged=10.000.000&totalTaxBase=1.000.000\
                        &asOfYear=2025"
            .parse()
            .expect("valid uri");
        let Query(payload) =
            Query::<CalculatePayload>::try_from_uri(&uri).expect("query should parse");
        let request = api_request_from_payload(&table(), payload).expect("valid request");

        assert_eq!(
            request.certificate.completion,
            CompletionStatus::Operational
        );
        assert_eq!(request.figures.total_pledged, Some(10_000_000.0));
        assert_approx(request.earnings.total_tax_base, 1_000_000.0);
        match request.certificate.regime {
            Regime::Legacy { tier, osb, .. } => {
                assert_eq!(tier.get(), 2);
                assert_eq!(osb, OsbStatus::Inside);
            }
            other => panic!("expected legacy regime, got {other:?}"),
        }
    }

    #[test]
    fn summary_renders_lira_amounts() {
        let table = table();
        let request = build_request(&table, &sample_cli()).expect("valid request");
        let response = run_request(&table, request).expect("valid calculation");
        let summary = render_summary(&response);

        assert!(summary.contains("2012/3305 (region 1, OSB yok)"));
        assert!(summary.contains("Payable tax:                625.000,00 ₺"));
        assert!(summary.contains("Remaining carry-forward:    6.875.000,00 ₺"));
        assert!(!summary.contains("warning:"));
    }

    #[test]
    fn cli_json_output_contains_result_fields() {
        let mut cli = sample_cli();
        cli.json = true;
        let output = run_cli_with(cli).expect("cli run succeeds");

        assert!(output.contains("\"payableTax\": 625000.0"));
        assert!(output.contains("\"earnedContributionToDate\": 2250000.0"));
    }

    #[test]
    fn rates_response_lists_every_schedule_entry() {
        let table = table();
        let response = build_rates_response(&table);
        assert_eq!(response.decisions, vec!["2012/3305", "2025/9903", "2016/9495"]);
        assert_eq!(response.legacy.len(), 12);
        assert_eq!(response.programs.len(), 5);
        assert!(response.programs.iter().all(|p| p.reduction_rate == 60.0));

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"contributionRate\""));
        assert!(json.contains("\"osb\":\"var\""));
        assert_eq!(response.provinces.legacy.get("Adana").map(|t| t.get()), Some(2));
        assert_eq!(response.provinces.decree9903.get("Adana").map(|t| t.get()), Some(3));
    }

    #[test]
    fn golden_snapshot_legacy_tier_one_json() {
        let json = r#"{
          "decision": "2012/3305",
          "region": 1,
          "osb": "yok",
          "completion": "in-progress",
          "startDate": "01.01.2025",
          "totalPledged": "50.000.000",
          "actualRealized": "15.000.000",
          "totalTaxBase": "5.000.000,00",
          "investmentEarning": "3.000.000",
          "otherEarning": "2.000.000",
          "statutoryRate": 25,
          "asOfYear": 2025
        }"#;
        let table = table();
        let request = api_request_from_json(&table, json).expect("json should parse");
        let response = run_request(&table, request).expect("valid calculation");
        let json = format!(
            "{}\n",
            serde_json::to_string(&response).expect("response should serialize")
        );

        assert_golden_snapshot("tests/golden/legacy_tier1_in_progress.json", &json);
    }
}
