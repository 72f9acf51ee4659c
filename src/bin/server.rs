use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use cut_planner::settings::CuttingSettings;
use cut_planner::types::{CuttingItem, CuttingResult, Material};
use cut_planner::{EfficiencyReport, Planner, efficiency_report};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanRequest {
    #[serde(default)]
    materials: Vec<Material>,
    #[serde(default)]
    items: Vec<CuttingItem>,
    #[serde(default)]
    selected_material: Option<Material>,
    #[serde(default)]
    settings: CuttingSettings,
}

#[derive(Serialize)]
struct PlanResponse {
    results: Vec<CuttingResult>,
    report: EfficiencyReport,
}

async fn plan(Json(req): Json<PlanRequest>) -> Result<Json<PlanResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /plan"
    );

    let results = tokio::task::spawn_blocking(move || {
        let mut planner = Planner::new(req.settings);
        planner.plan(&req.materials, &req.items, req.selected_material.as_ref())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| {
        tracing::warn!(error = %e, "plan rejected");
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    let report = efficiency_report(&results);
    Ok(Json(PlanResponse { results, report }))
}

#[tokio::main]
async fn main() {
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/plan", post(plan))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
