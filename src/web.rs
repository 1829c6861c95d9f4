use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard};

use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::schedule::{
    plan_coverage_with, summarize, CoverageInput, DayGaps, DaySchedule, DayLoad, DutyPlan, Options,
    PlanSettings,
};

/// Latest computed plan, kept in memory between requests
pub struct AppState {
    pub latest: Mutex<Option<StoredPlan>>,
    pub default_options: Options,
}

impl AppState {
    pub fn new(default_options: Options) -> Self {
        Self {
            latest: Mutex::new(None),
            default_options,
        }
    }

    fn latest(&self) -> Result<MutexGuard<'_, Option<StoredPlan>>, AppError> {
        self.latest.lock().map_err(|_| AppError::StatePoisoned)
    }
}

/// A plan together with the input it was computed from
#[derive(Debug, Clone)]
pub struct StoredPlan {
    pub input: CoverageInput,
    pub options: Options,
    pub plan: DutyPlan,
}

#[derive(Debug, Deserialize)]
pub struct CoverageRequest {
    #[serde(flatten)]
    pub input: CoverageInput,
    #[serde(default)]
    pub options: Option<Options>,
    #[serde(default = "default_fairness")]
    pub fairness: bool,
}

fn default_fairness() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct PlanResponse<'a> {
    pub options: Options,
    pub assignments: usize,
    pub uncovered: usize,
    #[serde(flatten)]
    pub plan: &'a DutyPlan,
}

#[derive(Debug, Serialize)]
pub struct DayResponse<'a> {
    pub day: &'a str,
    pub schedule: Option<&'a DaySchedule>,
    pub gaps: Option<&'a DayGaps>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub days: Vec<DayLoad>,
}

fn plan_response(stored: &StoredPlan) -> PlanResponse<'_> {
    PlanResponse {
        options: stored.options,
        assignments: stored.plan.assignment_count(),
        uncovered: stored.plan.gap_count(),
        plan: &stored.plan,
    }
}

// Compute a plan from posted input and keep it as the latest
async fn create_plan(
    req: web::Json<CoverageRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let request = req.into_inner();
    let options = request.options.unwrap_or(state.default_options);
    let settings = PlanSettings {
        fairness: request.fairness,
        ..PlanSettings::default()
    };

    let plan = plan_coverage_with(&request.input, &options, &settings);
    info!(
        staff = request.input.roster.len(),
        assignments = plan.assignment_count(),
        uncovered = plan.gap_count(),
        "plan computed over http"
    );

    let stored = StoredPlan {
        input: request.input,
        options,
        plan,
    };
    let response = HttpResponse::Ok().json(plan_response(&stored));
    *state.latest()? = Some(stored);
    Ok(response)
}

async fn get_plan(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let latest = state.latest()?;
    let stored = latest.as_ref().ok_or(AppError::NoPlan)?;
    Ok(HttpResponse::Ok().json(plan_response(stored)))
}

async fn get_day(day: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let latest = state.latest()?;
    let stored = latest.as_ref().ok_or(AppError::NoPlan)?;
    let day = day.into_inner();

    let schedule = stored.plan.day_schedule(&day);
    let gaps = stored.plan.day_gaps(&day);
    if schedule.is_none() && gaps.is_none() && stored.input.availability.day(&day).is_none() {
        return Err(AppError::UnknownDay(day));
    }

    Ok(HttpResponse::Ok().json(DayResponse {
        day: &day,
        schedule,
        gaps,
    }))
}

async fn get_stats(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let latest = state.latest()?;
    let stored = latest.as_ref().ok_or(AppError::NoPlan)?;
    Ok(HttpResponse::Ok().json(StatsResponse {
        days: summarize(&stored.plan, &stored.input),
    }))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Registers the JSON routes; shared by the server and the tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/api/plan", web::post().to(create_plan))
        .route("/api/plan", web::get().to(get_plan))
        .route("/api/plan/{day}", web::get().to(get_day))
        .route("/api/stats", web::get().to(get_stats));
}

pub async fn start_server(addr: SocketAddr, default_options: Options) -> std::io::Result<()> {
    let app_state = web::Data::new(AppState::new(default_options));
    info!(%addr, "starting duty cover service");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::JsonConfig::default().limit(4 * 1024 * 1024))
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(addr)?
    .run()
    .await
}
