use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

pub const TIMING_TARGET: &str = "sketchify.timing";

/// Tracks one inbound generation request from receipt to response.
#[derive(Debug)]
pub struct RequestTimer {
    route: String,
    theme: String,
    pipeline: String,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    completed: bool,
}

impl RequestTimer {
    pub fn start(route: &str, theme: &str, pipeline: &str) -> Self {
        let timer = RequestTimer {
            route: route.to_string(),
            theme: theme.to_string(),
            pipeline: pipeline.to_string(),
            started_at: Utc::now(),
            started_perf: Instant::now(),
            completed: false,
        };
        info!(
            target: TIMING_TARGET,
            "event=request_received route={} theme={} pipeline={} received_at={}",
            timer.route,
            timer.theme,
            timer.pipeline,
            timer.started_at.to_rfc3339()
        );
        timer
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.started_perf.elapsed().as_secs_f64()
    }

    pub fn complete(&mut self, status: &str, detail: Option<&str>) {
        if self.completed {
            return;
        }
        self.completed = true;
        info!(
            target: TIMING_TARGET,
            "event=request_completed route={} theme={} pipeline={} started_at={} completed_at={} duration_s={:.3} status={} detail={}",
            self.route,
            self.theme,
            self.pipeline,
            self.started_at.to_rfc3339(),
            Utc::now().to_rfc3339(),
            self.elapsed_seconds(),
            status,
            detail.unwrap_or_default()
        );
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        self.complete("dropped", None);
    }
}

/// Seconds rounded to millisecond precision.
pub fn round_latency(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

pub async fn log_model_timing<T, F, Fut>(
    provider: &str,
    model: &str,
    operation: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> Result<T, anyhow::Error>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let started_at = Utc::now();
    let started_perf = Instant::now();
    let metadata_text = metadata
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "{}".to_string());
    info!(
        target: TIMING_TARGET,
        "event=model_request provider={} model={} operation={} started_at={} metadata={}",
        provider,
        model,
        operation,
        started_at.to_rfc3339(),
        metadata_text
    );

    let result = call().await;
    let status = if result.is_err() { "error" } else { "success" };

    info!(
        target: TIMING_TARGET,
        "event=model_response provider={} model={} operation={} completed_at={} duration_s={:.3} status={} metadata={}",
        provider,
        model,
        operation,
        Utc::now().to_rfc3339(),
        started_perf.elapsed().as_secs_f64(),
        status,
        metadata_text
    );

    result
}
