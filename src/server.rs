use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use log::{error, info, warn};
use std::sync::Arc;

use crate::config::{ServerConfig, SolverConfig};
use crate::data::{SchedulingInput, SchedulingOutput};
use crate::error::SetupError;
use crate::solver;

type ApiResult = Result<Json<SchedulingOutput>, (StatusCode, String)>;

/// Runs a solver entry point off the async runtime and maps its errors to HTTP.
async fn run_blocking<F>(task: F) -> ApiResult
where
    F: FnOnce() -> Result<SchedulingOutput, SetupError> + Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(Ok(output)) => Ok(Json(output)),
        Ok(Err(e)) => {
            warn!("Rejected scheduling input: {}", e);
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e) => {
            error!("Solver task failed: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "solver task failed".to_string()))
        }
    }
}

async fn solve_handler(
    State(defaults): State<Arc<SolverConfig>>,
    Json(input): Json<SchedulingInput>,
) -> ApiResult {
    run_blocking(move || solver::solve(&input, &defaults)).await
}

async fn analyze_handler(Json(input): Json<SchedulingInput>) -> ApiResult {
    run_blocking(move || solver::analyze(&input)).await
}

async fn defragment_handler(
    State(defaults): State<Arc<SolverConfig>>,
    Json(input): Json<SchedulingInput>,
) -> ApiResult {
    run_blocking(move || solver::repair(&input, &defaults)).await
}

pub fn router(defaults: SolverConfig) -> Router {
    Router::new()
        .route("/v1/schedule/solve", post(solve_handler))
        .route("/v1/schedule/analyze", post(analyze_handler))
        .route("/v1/schedule/defragment", post(defragment_handler))
        .with_state(Arc::new(defaults))
}

pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let app = router(config.solver);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
