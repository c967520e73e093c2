pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, state::AppState, telemetry, time::SystemClock};
use crate::repositories::grading::PgGradingBackend;
use crate::services::grading::{GradingRules, GradingService};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let grading = GradingService::new(
        Arc::new(PgGradingBackend::new(db_pool.clone())),
        Arc::new(SystemClock),
        GradingRules::from_settings(settings.grading()),
    );
    let state = AppState::new(settings, db_pool, grading);

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        enforce_exam_end_time = state.settings().grading().enforce_exam_end_time,
        "LMS grading API listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await?;

    state.db().close().await;
    tracing::info!("database pool closed");

    Ok(())
}
