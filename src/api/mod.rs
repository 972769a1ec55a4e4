use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::core::{ProjectionEngine, ProjectionInput};
use crate::store::{InMemoryProjectionStore, ProjectionStore};

pub const DEFAULT_PRE_RETIREMENT_RETURN: f64 = 4.0;
pub const DEFAULT_POST_RETIREMENT_RETURN: f64 = 4.0;
pub const DEFAULT_INFLATION_RATE: f64 = 3.0;
pub const DEFAULT_EPF_CONTRIBUTION_RATE: f64 = 23.0;
pub const DEFAULT_EMPLOYEE_EPF_CONTRIBUTION_RATE: f64 = 11.0;
pub const DEFAULT_ENABLE_SALARY_INCREMENTS: bool = true;
pub const DEFAULT_SALARY_INCREMENT_RATE: f64 = 3.0;

/// Oldest age accepted for any of the three age inputs.
pub const MAX_AGE: u32 = 150;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    life_expectancy: Option<u32>,
    current_salary: Option<f64>,

    epf_balance: Option<f64>,
    prs_balance: Option<f64>,
    monthly_contribution_prs: Option<f64>,
    monthly_contribution_prs_percentage: Option<f64>,
    monthly_epf_contribution_rate: Option<f64>,
    employee_epf_contribution_rate: Option<f64>,

    target_monthly_income_input: Option<f64>,
    pre_retirement_return: Option<f64>,
    post_retirement_return: Option<f64>,
    inflation_rate: Option<f64>,
    enable_salary_increments: Option<bool>,
    salary_increment_rate: Option<f64>,
}

/// Projection parameters as command-line flags. Also carries the defaults
/// applied to HTTP payloads.
#[derive(Args, Debug, Clone)]
pub struct Cli {
    #[arg(long)]
    pub current_age: u32,
    #[arg(long)]
    pub retirement_age: u32,
    #[arg(long)]
    pub life_expectancy: u32,
    #[arg(long, help = "Current gross monthly salary")]
    pub current_salary: f64,
    #[arg(long, default_value_t = 0.0)]
    pub epf_balance: f64,
    #[arg(long, default_value_t = 0.0)]
    pub prs_balance: f64,
    #[arg(long, default_value_t = 0.0, help = "Fixed monthly PRS contribution")]
    pub monthly_contribution_prs: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Monthly PRS contribution as percent of salary; overrides the fixed amount when > 0"
    )]
    pub monthly_contribution_prs_percentage: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_EPF_CONTRIBUTION_RATE,
        help = "Total employer + employee EPF contribution rate in percent"
    )]
    pub monthly_epf_contribution_rate: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_EMPLOYEE_EPF_CONTRIBUTION_RATE,
        help = "Employee-only EPF contribution rate in percent"
    )]
    pub employee_epf_contribution_rate: f64,
    #[arg(
        long,
        help = "Target monthly retirement income; defaults to two thirds of the last drawn salary"
    )]
    pub target_monthly_income: Option<f64>,
    #[arg(
        long,
        default_value_t = DEFAULT_PRE_RETIREMENT_RETURN,
        help = "Annual return before retirement in percent"
    )]
    pub pre_retirement_return: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_POST_RETIREMENT_RETURN,
        help = "Annual return after retirement in percent"
    )]
    pub post_retirement_return: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_INFLATION_RATE,
        help = "Annual inflation in percent"
    )]
    pub inflation_rate: f64,
    #[arg(long, default_value_t = DEFAULT_ENABLE_SALARY_INCREMENTS, action = ArgAction::Set)]
    pub enable_salary_increments: bool,
    #[arg(
        long,
        default_value_t = DEFAULT_SALARY_INCREMENT_RATE,
        help = "Annual salary increment in percent"
    )]
    pub salary_increment_rate: f64,
}

#[derive(Clone)]
pub struct AppState {
    engine: ProjectionEngine,
    store: Arc<dyn ProjectionStore>,
}

impl AppState {
    pub fn new(engine: ProjectionEngine, store: Arc<dyn ProjectionStore>) -> Self {
        Self { engine, store }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: Cli) -> Result<ProjectionInput, String> {
    if cli.retirement_age <= cli.current_age {
        return Err("--retirement-age must be > --current-age".to_string());
    }

    if cli.life_expectancy <= cli.retirement_age {
        return Err("--life-expectancy must be > --retirement-age".to_string());
    }

    if cli.life_expectancy > MAX_AGE {
        return Err(format!("--life-expectancy must be <= {MAX_AGE}"));
    }

    if !cli.current_salary.is_finite() || cli.current_salary <= 0.0 {
        return Err("--current-salary must be > 0".to_string());
    }

    for (name, amount) in [
        ("--epf-balance", cli.epf_balance),
        ("--prs-balance", cli.prs_balance),
        ("--monthly-contribution-prs", cli.monthly_contribution_prs),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    if !(0.0..=30.0).contains(&cli.monthly_epf_contribution_rate) {
        return Err("--monthly-epf-contribution-rate must be between 0 and 30".to_string());
    }

    if !(0.0..=11.0).contains(&cli.employee_epf_contribution_rate) {
        return Err("--employee-epf-contribution-rate must be between 0 and 11".to_string());
    }

    if !(0.0..=20.0).contains(&cli.monthly_contribution_prs_percentage) {
        return Err("--monthly-contribution-prs-percentage must be between 0 and 20".to_string());
    }

    if cli.enable_salary_increments && !(0.0..=20.0).contains(&cli.salary_increment_rate) {
        return Err("--salary-increment-rate must be between 0 and 20".to_string());
    }

    if let Some(target) = cli.target_monthly_income {
        if !target.is_finite() || target < 0.0 {
            return Err("--target-monthly-income must be >= 0".to_string());
        }
    }

    for (name, rate) in [
        ("--pre-retirement-return", cli.pre_retirement_return),
        ("--post-retirement-return", cli.post_retirement_return),
        ("--inflation-rate", cli.inflation_rate),
    ] {
        if !(0.0..=100.0).contains(&rate) {
            return Err(format!("{name} must be between 0 and 100"));
        }
    }

    Ok(ProjectionInput {
        current_age: cli.current_age,
        retirement_age: cli.retirement_age,
        life_expectancy: cli.life_expectancy,
        current_salary: cli.current_salary,
        epf_balance: cli.epf_balance,
        prs_balance: cli.prs_balance,
        monthly_contribution_prs: cli.monthly_contribution_prs,
        monthly_contribution_prs_percentage: cli.monthly_contribution_prs_percentage,
        monthly_epf_contribution_rate: cli.monthly_epf_contribution_rate,
        employee_epf_contribution_rate: cli.employee_epf_contribution_rate,
        target_monthly_income_input: cli.target_monthly_income,
        pre_retirement_return: cli.pre_retirement_return,
        post_retirement_return: cli.post_retirement_return,
        inflation_rate: cli.inflation_rate,
        enable_salary_increments: cli.enable_salary_increments,
        salary_increment_rate: cli.salary_increment_rate,
    })
}

/// Validates the flags, runs one projection and renders it as JSON.
pub fn run_projection_cli(cli: Cli, engine: &ProjectionEngine) -> Result<String, String> {
    let inputs = build_inputs(cli)?;
    let result = engine.compute(&inputs).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&result).map_err(|e| format!("Failed to render result: {e}"))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/retirement/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route(
            "/api/users/:user_id/retirement-plan",
            get(latest_plan_handler).post(save_plan_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, engine: ProjectionEngine) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let state = AppState::new(engine, Arc::new(InMemoryProjectionStore::new()));
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    log::info!("Retirement projection API listening on http://{addr}");
    log::info!(
        "EPF dividend assumption: {}% per year",
        engine.epf_dividend_rate()
    );

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<ProjectionPayload>,
) -> Response {
    projection_handler_impl(&state, payload)
}

async fn projection_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<ProjectionPayload>,
) -> Response {
    projection_handler_impl(&state, payload)
}

fn projection_handler_impl(state: &AppState, payload: ProjectionPayload) -> Response {
    let inputs = match api_request_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => {
            log::warn!("Rejected projection request: {msg}");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match state.engine.compute(&inputs) {
        Ok(result) => {
            log::debug!(
                "Projection computed: funds needed {:.2}, gap {:.2}",
                result.total_funds_needed,
                result.funding_gap
            );
            json_response(StatusCode::OK, result)
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

async fn save_plan_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<ProjectionPayload>,
) -> Response {
    let inputs = match api_request_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => {
            log::warn!("Rejected retirement plan for {user_id}: {msg}");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let result = match state.engine.compute(&inputs) {
        Ok(result) => result,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    match state.store.upsert(&user_id, inputs, result) {
        Ok(record) => {
            log::info!(
                "Saved retirement plan for {user_id}: gap {:.2}",
                record.result.funding_gap
            );
            json_response(StatusCode::OK, record)
        }
        Err(e) => {
            log::error!("Failed to save retirement plan for {user_id}: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save projection")
        }
    }
}

async fn latest_plan_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    match state.store.latest(&user_id) {
        Ok(Some(record)) => json_response(StatusCode::OK, record),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "No retirement plan saved"),
        Err(e) => {
            log::error!("Failed to load retirement plan for {user_id}: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load projection")
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ProjectionInput, String> {
    let payload = serde_json::from_str::<ProjectionPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectionPayload) -> Result<ProjectionInput, String> {
    let Some(current_age) = payload.current_age else {
        return Err("currentAge is required".to_string());
    };
    let Some(retirement_age) = payload.retirement_age else {
        return Err("retirementAge is required".to_string());
    };
    let Some(life_expectancy) = payload.life_expectancy else {
        return Err("lifeExpectancy is required".to_string());
    };
    let Some(current_salary) = payload.current_salary else {
        return Err("currentSalary is required".to_string());
    };

    let mut cli = default_cli_for_api(current_age, retirement_age, life_expectancy, current_salary);

    if let Some(v) = payload.epf_balance {
        cli.epf_balance = v;
    }
    if let Some(v) = payload.prs_balance {
        cli.prs_balance = v;
    }
    if let Some(v) = payload.monthly_contribution_prs {
        cli.monthly_contribution_prs = v;
    }
    if let Some(v) = payload.monthly_contribution_prs_percentage {
        cli.monthly_contribution_prs_percentage = v;
    }
    if let Some(v) = payload.monthly_epf_contribution_rate {
        cli.monthly_epf_contribution_rate = v;
    }
    if let Some(v) = payload.employee_epf_contribution_rate {
        cli.employee_epf_contribution_rate = v;
    }

    if let Some(v) = payload.target_monthly_income_input {
        cli.target_monthly_income = Some(v);
    }
    if let Some(v) = payload.pre_retirement_return {
        cli.pre_retirement_return = v;
    }
    if let Some(v) = payload.post_retirement_return {
        cli.post_retirement_return = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.enable_salary_increments {
        cli.enable_salary_increments = v;
    }
    if let Some(v) = payload.salary_increment_rate {
        cli.salary_increment_rate = v;
    }

    build_inputs(cli)
}

fn default_cli_for_api(
    current_age: u32,
    retirement_age: u32,
    life_expectancy: u32,
    current_salary: f64,
) -> Cli {
    Cli {
        current_age,
        retirement_age,
        life_expectancy,
        current_salary,
        epf_balance: 0.0,
        prs_balance: 0.0,
        monthly_contribution_prs: 0.0,
        monthly_contribution_prs_percentage: 0.0,
        monthly_epf_contribution_rate: DEFAULT_EPF_CONTRIBUTION_RATE,
        employee_epf_contribution_rate: DEFAULT_EMPLOYEE_EPF_CONTRIBUTION_RATE,
        target_monthly_income: None,
        pre_retirement_return: DEFAULT_PRE_RETIREMENT_RETURN,
        post_retirement_return: DEFAULT_POST_RETIREMENT_RETURN,
        inflation_rate: DEFAULT_INFLATION_RATE,
        enable_salary_increments: DEFAULT_ENABLE_SALARY_INCREMENTS,
        salary_increment_rate: DEFAULT_SALARY_INCREMENT_RATE,
    }
}
