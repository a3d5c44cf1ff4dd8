// Energy Prices Dashboard - Web Layer
// Axum routes over the read-only observation table

use axum::{
    extract::{OriginalUri, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::chart::{build_chart, ChartSpec};
use crate::page::render_page;
use crate::selection::{YearSelection, YEAR_OPTIONS};
use crate::table::{Observation, ObservationTable};

/// Shared application state
///
/// The table is loaded before the listener binds and never written again,
/// so handlers only ever borrow it.
#[derive(Clone)]
pub struct AppState {
    table: Arc<ObservationTable>,
    page: Arc<str>,
}

impl AppState {
    pub fn new(table: ObservationTable, dataset: &str) -> Self {
        Self {
            table: Arc::new(table),
            page: render_page(dataset, &YEAR_OPTIONS).into(),
        }
    }

    pub fn table(&self) -> &ObservationTable {
        &self.table
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

/// Errors surfaced to API clients
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "not_found: {path}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        };
        let body = ApiResponse {
            success: false,
            data: (),
            error: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

/// `?years=2019,2020` - absent ⇒ every offered year, empty ⇒ no years
#[derive(Debug, Default, Deserialize)]
pub struct YearsQuery {
    years: Option<String>,
}

impl YearsQuery {
    fn selection(&self) -> YearSelection {
        match &self.years {
            Some(raw) => YearSelection::parse(raw),
            None => YearSelection::all_options(),
        }
    }
}

#[derive(Serialize)]
struct YearsResponse {
    options: Vec<i32>,
    available: BTreeSet<i32>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / - Serve the dashboard page
async fn serve_index(State(state): State<AppState>) -> Html<String> {
    Html(state.page.to_string())
}

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

fn chart_for(state: &AppState, query: &YearsQuery) -> ChartSpec {
    let selection = query.selection();
    let chart = build_chart(&state.table, &selection);
    debug!(years = ?selection, points = chart.point_count(), "chart rendered");
    chart
}

/// GET /api/figure?years= - Plotly figure for the selected years
async fn get_figure(
    State(state): State<AppState>,
    Query(query): Query<YearsQuery>,
) -> impl IntoResponse {
    Json(ApiResponse::ok(chart_for(&state, &query).to_plotly()))
}

/// GET /api/chart?years= - Chart specification for the selected years
async fn get_chart(
    State(state): State<AppState>,
    Query(query): Query<YearsQuery>,
) -> impl IntoResponse {
    Json(ApiResponse::ok(chart_for(&state, &query)))
}

/// GET /api/observations?years= - Loaded rows for the selected years
async fn get_observations(
    State(state): State<AppState>,
    Query(query): Query<YearsQuery>,
) -> impl IntoResponse {
    let rows: Vec<&Observation> = state.table.filter_years(&query.selection());
    Json(ApiResponse::ok(rows)).into_response()
}

/// GET /api/years - Offered options and years present in the table
async fn get_years(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(YearsResponse {
        options: YEAR_OPTIONS.to_vec(),
        available: state.table.years(),
    }))
}

async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/figure", get(get_figure))
        .route("/chart", get(get_chart))
        .route("/observations", get(get_observations))
        .route("/years", get(get_years));

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
