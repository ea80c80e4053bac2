use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

pub(crate) const ATTEMPTS_STARTED: &str = "examify_attempts_started_total";
pub(crate) const ATTEMPTS_FAILED: &str = "examify_attempts_failed_total";
pub(crate) const SUBMISSIONS: &str = "examify_submissions_total";
pub(crate) const SUBMISSION_FAILURES: &str = "examify_submission_failures_total";

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
