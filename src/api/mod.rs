use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    CalculationResults, Inputs, YearBreakdown, run_yearly_breakdown, simulate, solve,
};

/// Bounds the simulated horizon, which allocates one balance per month.
const MAX_LIFE_EXPECTANCY: f64 = 150.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{flag} must be a finite number")]
    NotFinite { flag: &'static str },
    #[error("{flag} {reason}")]
    OutOfRange {
        flag: &'static str,
        reason: &'static str,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CalculatePayload {
    current_age: Option<u32>,
    current_age_months: Option<u32>,
    current_savings: Option<f64>,
    retirement_age: Option<f64>,
    life_expectancy: Option<f64>,
    living_expense_per_month: Option<f64>,
    roi_rate: Option<f64>,
    income_per_month_after_retirement: Option<f64>,
    living_expense_per_month_after_retirement: Option<f64>,

    monthly_savings_override: Option<f64>,
}

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "spenddown",
    about = "Die-with-zero planner: earnings needed to spend savings down to zero by life expectancy"
)]
struct Cli {
    #[arg(long, default_value_t = 25, help = "Current age in whole years")]
    current_age: u32,
    #[arg(
        long,
        default_value_t = 6,
        help = "Months past the current age in whole years (0-11)"
    )]
    current_age_months: u32,
    #[arg(long, default_value_t = 100_000.0)]
    current_savings: f64,
    #[arg(long, default_value_t = 50.0)]
    retirement_age: f64,
    #[arg(long, default_value_t = 80.0, help = "Age at which savings should reach zero")]
    life_expectancy: f64,
    #[arg(
        long,
        default_value_t = 3_000.0,
        help = "Monthly living expense before retirement"
    )]
    living_expense_per_month: f64,
    #[arg(
        long,
        default_value_t = 4.0,
        allow_negative_numbers = true,
        help = "Expected annual investment return in percent, e.g. 4"
    )]
    roi_rate: f64,
    #[arg(
        long,
        default_value_t = 500.0,
        help = "Passive monthly income during retirement"
    )]
    income_per_month_after_retirement: f64,
    #[arg(
        long,
        default_value_t = 3_000.0,
        help = "Monthly living expense during retirement"
    )]
    living_expense_per_month_after_retirement: f64,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Chart with this monthly savings amount instead of the solved one"
    )]
    monthly_savings_override: Option<f64>,
    #[arg(long, help = "Include the per-age income and expense breakdown")]
    breakdown: bool,
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct ApiOptions {
    monthly_savings_override: Option<f64>,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: Inputs,
    options: ApiOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalculateResponse {
    inputs: Inputs,
    #[serde(skip_serializing_if = "Option::is_none")]
    monthly_savings_override: Option<f64>,
    results: CalculationResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    breakdown: Option<Vec<YearBreakdown>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn build_inputs(cli: &Cli) -> Result<Inputs, InputError> {
    for (flag, value) in [
        ("--current-savings", cli.current_savings),
        ("--retirement-age", cli.retirement_age),
        ("--life-expectancy", cli.life_expectancy),
        ("--living-expense-per-month", cli.living_expense_per_month),
        ("--roi-rate", cli.roi_rate),
        (
            "--income-per-month-after-retirement",
            cli.income_per_month_after_retirement,
        ),
        (
            "--living-expense-per-month-after-retirement",
            cli.living_expense_per_month_after_retirement,
        ),
    ] {
        if !value.is_finite() {
            return Err(InputError::NotFinite { flag });
        }
    }

    if cli.current_age_months > 11 {
        return Err(InputError::OutOfRange {
            flag: "--current-age-months",
            reason: "must be between 0 and 11",
        });
    }

    if cli.roi_rate <= -100.0 {
        return Err(InputError::OutOfRange {
            flag: "--roi-rate",
            reason: "must be > -100",
        });
    }

    if cli.retirement_age < 0.0 {
        return Err(InputError::OutOfRange {
            flag: "--retirement-age",
            reason: "must be >= 0",
        });
    }

    if cli.life_expectancy > MAX_LIFE_EXPECTANCY {
        return Err(InputError::OutOfRange {
            flag: "--life-expectancy",
            reason: "must be <= 150",
        });
    }

    if cli.life_expectancy < cli.retirement_age {
        return Err(InputError::OutOfRange {
            flag: "--life-expectancy",
            reason: "must be >= --retirement-age",
        });
    }

    if let Some(v) = cli.monthly_savings_override {
        if !v.is_finite() {
            return Err(InputError::NotFinite {
                flag: "--monthly-savings-override",
            });
        }
    }

    Ok(Inputs {
        current_age: cli.current_age,
        current_age_months: cli.current_age_months,
        current_savings: cli.current_savings,
        retirement_age: cli.retirement_age,
        life_expectancy: cli.life_expectancy,
        living_expense_per_month: cli.living_expense_per_month,
        roi_rate: cli.roi_rate,
        income_per_month_after_retirement: cli.income_per_month_after_retirement,
        living_expense_per_month_after_retirement: cli.living_expense_per_month_after_retirement,
    })
}

/// Parses command-line flags, runs one calculation and returns the response
/// as pretty-printed JSON. Flag errors, `--help` and `--version` come back as
/// a [`clap::Error`].
pub fn run_cli<I, T>(args: I) -> anyhow::Result<String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    let inputs = build_inputs(&cli)?;
    let options = ApiOptions {
        monthly_savings_override: cli.monthly_savings_override,
    };
    let response = build_calculate_response(inputs, options, cli.breakdown);
    Ok(serde_json::to_string_pretty(&response)?)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/calculate",
            get(calculate_get_handler).post(calculate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "spenddown HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/calculate");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn calculate_get_handler(Query(payload): Query<CalculatePayload>) -> Response {
    calculate_handler_impl(payload).await
}

async fn calculate_post_handler(Json(payload): Json<CalculatePayload>) -> Response {
    calculate_handler_impl(payload).await
}

async fn calculate_handler_impl(payload: CalculatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "rejected calculation request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let response = build_calculate_response(request.inputs, request.options, true);
    debug!(
        outcome = ?response.results.outcome,
        monthly_earnings_needed = response.results.monthly_earnings_needed,
        is_achievable = response.results.is_achievable,
        "calculated plan"
    );
    json_response(StatusCode::OK, response)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
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
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<CalculatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload).map_err(|e| e.to_string())
}

fn api_request_from_payload(payload: CalculatePayload) -> Result<ApiRequest, InputError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.current_age_months {
        cli.current_age_months = v;
    }
    if let Some(v) = payload.current_savings {
        cli.current_savings = v;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = v;
    }
    if let Some(v) = payload.life_expectancy {
        cli.life_expectancy = v;
    }
    if let Some(v) = payload.living_expense_per_month {
        cli.living_expense_per_month = v;
    }
    if let Some(v) = payload.roi_rate {
        cli.roi_rate = v;
    }
    if let Some(v) = payload.income_per_month_after_retirement {
        cli.income_per_month_after_retirement = v;
    }
    if let Some(v) = payload.living_expense_per_month_after_retirement {
        cli.living_expense_per_month_after_retirement = v;
    }
    if let Some(v) = payload.monthly_savings_override {
        cli.monthly_savings_override = Some(v);
    }

    let inputs = build_inputs(&cli)?;
    let options = ApiOptions {
        monthly_savings_override: cli.monthly_savings_override,
    };
    Ok(ApiRequest { inputs, options })
}

fn default_cli_for_api() -> Cli {
    Cli {
        current_age: 25,
        current_age_months: 6,
        current_savings: 100_000.0,
        retirement_age: 50.0,
        life_expectancy: 80.0,
        living_expense_per_month: 3_000.0,
        roi_rate: 4.0,
        income_per_month_after_retirement: 500.0,
        living_expense_per_month_after_retirement: 3_000.0,
        monthly_savings_override: None,
        breakdown: false,
    }
}

fn build_calculate_response(
    inputs: Inputs,
    options: ApiOptions,
    include_breakdown: bool,
) -> CalculateResponse {
    let mut results = solve(&inputs);
    if let Some(monthly_savings) = options.monthly_savings_override {
        results.wealth_chart =
            simulate(&inputs, monthly_savings, results.figures.exact_current_age);
    }
    let breakdown = include_breakdown.then(|| run_yearly_breakdown(&inputs, &results));

    CalculateResponse {
        inputs,
        monthly_savings_override: options.monthly_savings_override,
        results,
        breakdown,
    }
}
