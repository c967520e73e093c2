use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe_grading_metrics();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe_grading_metrics() {
    metrics::describe_counter!(
        "grading_attempts_started_total",
        "Exam attempts created by a start call"
    );
    metrics::describe_counter!(
        "grading_submissions_total",
        "Completed submit operations by resulting status"
    );
    metrics::describe_counter!(
        "grading_rejections_total",
        "Grading operations rejected by a precondition"
    );
    metrics::describe_counter!("grading_overrides_total", "Teacher grade overrides applied");
}
