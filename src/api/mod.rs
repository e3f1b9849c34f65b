use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::core::{
    ChartSeries, ConditionInput, GrowthConditionSequence, MAX_ADDITIONAL_CONDITIONS,
    MAX_TOTAL_YEARS, ProjectionError, ProjectionSummary, TableRow, YearlyResult,
    build_conditions, chart_series, parse_seed_text, project_sequence, summarize, table_rows,
    validate_seed,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Parser, Debug)]
#[command(
    name = "compound-growth",
    about = "Year-by-year compound growth across sequential rate periods"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the calculator page and JSON API
    Serve(ServeArgs),
    /// Print a projection table
    Project(ProjectArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(long, help = "Starting amount; digit grouping such as 1,000,000 is accepted")]
    seed: String,
    #[arg(long, help = "Annual rate of the first period in percent, e.g. 5")]
    rate: Option<f64>,
    #[arg(long, help = "Length of the first period in years")]
    years: Option<u32>,
    #[arg(
        long = "step",
        value_parser = parse_step,
        help = "Additional period as RATE:YEARS in percent and years, repeatable"
    )]
    steps: Vec<StepArg>,
    #[arg(long, help = "Print the full JSON response instead of a table")]
    json: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
struct StepArg {
    rate: Option<f64>,
    years: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StepPayload {
    rate: Option<f64>,
    years: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedField {
    Amount(f64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    seed: Option<SeedField>,
    rate: Option<f64>,
    years: Option<u32>,
    steps: Vec<StepPayload>,
}

/// Query string form: only the first period fits in a flat query.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectQuery {
    seed: Option<String>,
    rate: Option<f64>,
    years: Option<u32>,
}

impl From<ProjectQuery> for ProjectPayload {
    fn from(value: ProjectQuery) -> Self {
        ProjectPayload {
            seed: value.seed.map(SeedField::Text),
            rate: value.rate,
            years: value.years,
            steps: Vec::new(),
        }
    }
}

/// Raw form values, rates still in percent.
#[derive(Debug, Clone, Default)]
struct FormInput {
    seed: Option<f64>,
    base: ConditionInput,
    steps: Vec<ConditionInput>,
}

#[derive(Debug)]
struct ProjectRequest {
    seed: f64,
    conditions: GrowthConditionSequence,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    seed: f64,
    conditions: GrowthConditionSequence,
    years: Vec<YearlyResult>,
    chart: ChartSeries,
    table: Vec<TableRow>,
    summary: ProjectionSummary,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

fn parse_step(raw: &str) -> Result<StepArg, String> {
    let Some((rate, years)) = raw.split_once(':') else {
        return Err(format!("expected RATE:YEARS, got '{raw}'"));
    };
    let rate = match rate.trim() {
        "" => None,
        text => Some(
            text.parse::<f64>()
                .map_err(|e| format!("invalid rate '{text}': {e}"))?,
        ),
    };
    let years = match years.trim() {
        "" => None,
        text => Some(
            text.parse::<u32>()
                .map_err(|e| format!("invalid years '{text}': {e}"))?,
        ),
    };
    Ok(StepArg { rate, years })
}

fn percent_row(rate: Option<f64>, years: Option<u32>) -> ConditionInput {
    ConditionInput::new(rate.map(|pct| pct / 100.0), years)
}

fn build_request(form: FormInput) -> Result<ProjectRequest, ProjectionError> {
    let seed = validate_seed(form.seed)?;

    let filled_steps = form.steps.iter().filter(|step| !step.is_blank()).count();
    if filled_steps > MAX_ADDITIONAL_CONDITIONS {
        return Err(ProjectionError::TooManyConditions {
            max: MAX_ADDITIONAL_CONDITIONS,
            got: filled_steps,
        });
    }

    let conditions = build_conditions(form.base, &form.steps)?;
    let total_years = conditions.total_years();
    if total_years > MAX_TOTAL_YEARS {
        return Err(ProjectionError::TooManyYears {
            max: MAX_TOTAL_YEARS,
            got: total_years,
        });
    }
    Ok(ProjectRequest { seed, conditions })
}

fn form_from_payload(payload: ProjectPayload) -> FormInput {
    let seed = payload.seed.and_then(|field| match field {
        SeedField::Amount(value) => Some(value),
        SeedField::Text(text) => parse_seed_text(&text),
    });

    FormInput {
        seed,
        base: percent_row(payload.rate, payload.years),
        steps: payload
            .steps
            .into_iter()
            .map(|step| percent_row(step.rate, step.years))
            .collect(),
    }
}

fn form_from_args(args: &ProjectArgs) -> FormInput {
    FormInput {
        seed: parse_seed_text(&args.seed),
        base: percent_row(args.rate, args.years),
        steps: args
            .steps
            .iter()
            .map(|step| percent_row(step.rate, step.years))
            .collect(),
    }
}

fn build_project_response(request: &ProjectRequest) -> Result<ProjectResponse, ProjectionError> {
    let years = project_sequence(request.seed, &request.conditions)?;
    Ok(ProjectResponse {
        seed: request.seed,
        conditions: request.conditions.clone(),
        chart: chart_series(request.seed, &years),
        table: table_rows(&years),
        summary: summarize(request.seed, &years),
        years,
    })
}

fn render_table(rows: &[TableRow]) -> String {
    let total_width = rows
        .iter()
        .map(|row| row.total.len())
        .chain(["Total".len()])
        .max()
        .unwrap_or(0);
    let increase_width = rows
        .iter()
        .map(|row| row.increase.len())
        .chain(["Increase".len()])
        .max()
        .unwrap_or(0);

    let mut out = format!(
        "{:>4}  {:>total_width$}  {:>increase_width$}\n",
        "Year", "Total", "Increase"
    );
    for row in rows {
        out.push_str(&format!(
            "{:>4}  {:>total_width$}  {:>increase_width$}\n",
            row.year, row.total, row.increase
        ));
    }
    out
}

/// Runs one projection from command-line arguments and renders the output.
pub fn run_project_command(args: ProjectArgs) -> Result<String, String> {
    let request = build_request(form_from_args(&args)).map_err(|e| e.to_string())?;
    let response = build_project_response(&request).map_err(|e| e.to_string())?;
    info!(
        seed = request.seed,
        periods = request.conditions.len(),
        years = response.summary.total_years,
        "projection finished"
    );

    if args.json {
        let json = serde_json::to_string_pretty(&response)
            .map_err(|e| format!("failed to serialize response: {e}"))?;
        return Ok(format!("{json}\n"));
    }
    Ok(render_table(&response.table))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "compound growth HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, router()).await
}

fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler)
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found", None)
}

async fn project_get_handler(query: Result<Query<ProjectQuery>, QueryRejection>) -> Response {
    match query {
        Ok(Query(query)) => project_handler_impl(query.into()).await,
        Err(rejection) => rejection_response(rejection.status(), &rejection.body_text()),
    }
}

async fn project_post_handler(payload: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => project_handler_impl(payload).await,
        Err(rejection) => rejection_response(rejection.status(), &rejection.body_text()),
    }
}

fn rejection_response(status: StatusCode, detail: &str) -> Response {
    warn!(%status, detail, "rejected unreadable projection payload");
    error_response(status, &format!("Invalid request: {detail}"), Some("input"))
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match build_request(form_from_payload(payload)) {
        Ok(request) => request,
        Err(err) => {
            warn!(field = err.field(), %err, "rejected projection request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string(), Some(err.field()));
        }
    };

    match build_project_response(&request) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err @ ProjectionError::AmountOutOfRange { .. }) => {
            warn!(%err, "projection left the reportable range");
            error_response(StatusCode::BAD_REQUEST, &err.to_string(), Some(err.field()))
        }
        Err(err) => {
            error!(%err, "projection failed on validated input");
            error_response(StatusCode::BAD_REQUEST, &err.to_string(), Some(err.field()))
        }
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str, field: Option<&'static str>) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            field,
        },
    )
}

#[cfg(test)]
fn project_request_from_json(json: &str) -> Result<ProjectRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    build_request(form_from_payload(payload)).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    const EPS: f64 = 1e-12;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> ProjectArgs {
        ProjectArgs {
            seed: "100".to_string(),
            rate: Some(10.0),
            years: Some(1),
            steps: vec![StepArg {
                rate: Some(20.0),
                years: Some(1),
            }],
            json: false,
        }
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

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    #[test]
    fn project_request_from_json_parses_web_keys_and_converts_percent() {
        let json = r#"{
          "seed": "1,000,000",
          "rate": 5,
          "years": 10,
          "steps": [
            { "rate": 3, "years": 5 },
            {},
            { "rate": 1.5, "years": 2 }
          ]
        }"#;
        let request = project_request_from_json(json).expect("json should parse");

        assert_approx(request.seed, 1_000_000.0);
        let conditions = request.conditions.as_slice();
        assert_eq!(conditions.len(), 3);
        assert_approx(conditions[0].rate(), 0.05);
        assert_eq!(conditions[0].years(), 10);
        assert_approx(conditions[1].rate(), 0.03);
        assert_approx(conditions[2].rate(), 0.015);
        assert_eq!(request.conditions.total_years(), 17);
    }

    #[test]
    fn project_request_accepts_numeric_seed() {
        let request = project_request_from_json(r#"{ "seed": 2500, "rate": 4, "years": 3 }"#)
            .expect("json should parse");
        assert_approx(request.seed, 2_500.0);
    }

    #[test]
    fn project_request_rejects_zero_seed() {
        let err = project_request_from_json(r#"{ "seed": 0, "rate": 5, "years": 2 }"#)
            .expect_err("must reject zero seed");
        assert!(err.contains("starting amount"));
    }

    #[test]
    fn build_request_rejects_missing_base_years() {
        let form = FormInput {
            seed: Some(1_000.0),
            base: percent_row(Some(5.0), None),
            steps: Vec::new(),
        };
        let err = build_request(form).expect_err("must reject missing years");
        assert_eq!(err, ProjectionError::MissingBaseInput);
    }

    #[test]
    fn build_request_checks_seed_before_periods() {
        let form = FormInput {
            seed: None,
            base: ConditionInput::default(),
            steps: Vec::new(),
        };
        let err = build_request(form).expect_err("must reject missing seed");
        assert_eq!(err, ProjectionError::InvalidSeed);
    }

    #[test]
    fn build_request_limits_additional_periods() {
        let form = FormInput {
            seed: Some(1_000.0),
            base: percent_row(Some(5.0), Some(1)),
            steps: vec![percent_row(Some(1.0), Some(1)); MAX_ADDITIONAL_CONDITIONS + 1],
        };
        let err = build_request(form).expect_err("must reject seven extra periods");
        assert_eq!(
            err,
            ProjectionError::TooManyConditions {
                max: MAX_ADDITIONAL_CONDITIONS,
                got: MAX_ADDITIONAL_CONDITIONS + 1,
            }
        );
    }

    #[test]
    fn build_request_ignores_blank_rows_when_counting_periods() {
        let mut steps = vec![ConditionInput::default(); MAX_ADDITIONAL_CONDITIONS + 1];
        steps.push(percent_row(Some(2.0), Some(3)));
        let form = FormInput {
            seed: Some(1_000.0),
            base: percent_row(Some(5.0), Some(1)),
            steps,
        };
        let request = build_request(form).expect("blank rows are not periods");
        assert_eq!(request.conditions.len(), 2);
    }

    #[test]
    fn build_request_limits_total_years() {
        let form = FormInput {
            seed: Some(1_000.0),
            base: percent_row(Some(5.0), Some(4_000_000_000)),
            steps: vec![percent_row(Some(1.0), Some(4_000_000_000))],
        };
        let err = build_request(form).expect_err("must reject a multi-billion year span");
        assert_eq!(
            err,
            ProjectionError::TooManyYears {
                max: MAX_TOTAL_YEARS,
                got: 8_000_000_000,
            }
        );
        assert_eq!(err.field(), "years");

        let form = FormInput {
            seed: Some(1_000.0),
            base: percent_row(Some(5.0), Some(MAX_TOTAL_YEARS as u32)),
            steps: Vec::new(),
        };
        assert!(build_request(form).is_ok());
    }

    #[test]
    fn project_request_rejects_negative_seed_text() {
        let err = project_request_from_json(r#"{ "seed": "-500", "rate": 5, "years": 2 }"#)
            .expect_err("must reject negative seed");
        assert!(err.contains("starting amount"));
    }

    #[test]
    fn query_payload_keeps_base_period_only() {
        let payload: ProjectPayload = ProjectQuery {
            seed: Some("1,000".to_string()),
            rate: Some(5.0),
            years: Some(2),
        }
        .into();
        let request = build_request(form_from_payload(payload)).expect("valid query");
        assert_approx(request.seed, 1_000.0);
        assert_eq!(request.conditions.len(), 1);
    }

    #[test]
    fn parse_step_accepts_partial_rows() {
        assert_eq!(
            parse_step("5:10"),
            Ok(StepArg {
                rate: Some(5.0),
                years: Some(10),
            })
        );
        assert_eq!(
            parse_step("2.5:"),
            Ok(StepArg {
                rate: Some(2.5),
                years: None,
            })
        );
        assert_eq!(parse_step(":"), Ok(StepArg::default()));
        assert!(parse_step("5").is_err());
        assert!(parse_step("x:3").is_err());
    }

    #[test]
    fn cli_parses_project_subcommand() {
        let cli = Cli::try_parse_from([
            "compound-growth",
            "project",
            "--seed",
            "1,000,000",
            "--rate",
            "5",
            "--years",
            "2",
            "--step",
            "3:4",
        ])
        .expect("arguments should parse");
        let Command::Project(args) = cli.command else {
            panic!("expected project subcommand");
        };
        assert_eq!(args.seed, "1,000,000");
        assert_eq!(args.steps.len(), 1);
        assert!(!args.json);
    }

    #[test]
    fn run_project_command_renders_table() {
        let output = run_project_command(sample_args()).expect("valid projection");
        assert_eq!(
            output,
            "Year  Total  Increase\n   1    110        10\n   2    132        22\n"
        );
    }

    #[test]
    fn run_project_command_reports_partial_step() {
        let mut args = sample_args();
        args.steps.push(StepArg {
            rate: None,
            years: Some(3),
        });
        let err = run_project_command(args).expect_err("must reject partial step");
        assert!(err.contains("additional growth period 2"));
    }

    #[test]
    fn project_response_serialization_contains_expected_fields() {
        let request = build_request(form_from_args(&sample_args())).expect("valid request");
        let response = build_project_response(&request).expect("valid projection");
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"conditions\""));
        assert!(json.contains("\"years\""));
        assert!(json.contains("\"priorGrowth\""));
        assert!(json.contains("\"currentGrowth\""));
        assert!(json.contains("\"table\""));
        assert!(json.contains("\"finalTotal\""));
    }

    #[test]
    fn golden_snapshot_two_period_json() {
        let request = build_request(form_from_args(&sample_args())).expect("valid request");
        let response = build_project_response(&request).expect("valid projection");
        let json = format!(
            "{}\n",
            serde_json::to_string(&response).expect("response should serialize")
        );

        assert_golden_snapshot("tests/golden/two_period_projection.json", &json);
    }

    #[tokio::test]
    async fn handler_returns_field_level_error() {
        let payload = ProjectPayload {
            seed: Some(SeedField::Amount(1_000.0)),
            rate: Some(5.0),
            years: Some(2),
            steps: vec![StepPayload {
                rate: Some(3.0),
                years: None,
            }],
        };
        let response = project_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response_json(response).await;
        assert_eq!(body["field"], "steps");
        assert!(body.get("years").is_none());
    }

    #[tokio::test]
    async fn handler_reports_out_of_range_growth_as_bad_request() {
        let payload = ProjectPayload {
            seed: Some(SeedField::Amount(100.0)),
            rate: Some(-300.0),
            years: Some(61),
            steps: Vec::new(),
        };
        let response = project_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response_json(response).await;
        assert_eq!(body["field"], "input");
        assert!(body["error"].as_str().is_some_and(|msg| msg.contains("year 46")));
    }

    #[tokio::test]
    async fn unreadable_json_body_gets_error_json() {
        use axum::extract::FromRequest;

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/project")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(r#"{ "seed": 1000, "rate": 5, "years": 2.5 }"#))
            .expect("request should build");
        let payload = Json::<ProjectPayload>::from_request(request, &()).await;
        assert!(payload.is_err());

        let response = project_post_handler(payload).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = response_json(response).await;
        assert_eq!(body["field"], "input");
        assert!(body["error"].as_str().is_some_and(|msg| msg.starts_with("Invalid request")));
    }

    #[tokio::test]
    async fn handler_returns_projection_for_valid_payload() {
        let payload = ProjectPayload {
            seed: Some(SeedField::Text("1,000,000".to_string())),
            rate: Some(5.0),
            years: Some(2),
            steps: Vec::new(),
        };
        let response = project_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&header::HeaderValue::from_static("no-store"))
        );

        let body = response_json(response).await;
        assert_eq!(body["years"][1]["total"], 1_102_500);
        assert_eq!(body["years"][1]["increase"], 52_500);
        assert_eq!(body["table"][0]["total"], "1,050,000");
    }
}
