//! Metrics definitions for the streamer.
//!
//! All metrics follow Prometheus naming conventions:
//! - `streamer_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms

use crate::errors::StreamerError;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder, optionally with a scrape listener.
///
/// Must be called from within a tokio runtime when `listen` is set, and
/// before any metric is recorded.
///
/// # Errors
///
/// - [`StreamerError::Config`] if the histogram buckets are rejected
/// - [`StreamerError::Internal`] if the recorder fails to install (e.g., already installed)
pub fn init_metrics_recorder(listen: Option<SocketAddr>) -> Result<(), StreamerError> {
    let builder = PrometheusBuilder::new()
        // Event handling is in-memory work; buckets start well below a millisecond
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "streamer_event_duration_seconds".to_string(),
            ),
            &[
                0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.010, 0.050,
            ],
        )
        .map_err(|e| StreamerError::Config(format!("event duration buckets: {e}")))?;

    match listen {
        Some(addr) => builder
            .with_http_listener(addr)
            .install()
            .map_err(|e| StreamerError::Internal(format!("Prometheus exporter: {e}"))),
        None => builder
            .install_recorder()
            .map(|_handle| ())
            .map_err(|e| StreamerError::Internal(format!("Prometheus recorder: {e}"))),
    }
}

/// Record one handled engine event.
///
/// Metrics: `streamer_events_total`, `streamer_event_duration_seconds`
/// Labels: `event_type`
///
/// Cardinality: 10 (bounded by `EngineEvent` variants)
pub fn record_event(event_type: &'static str, duration: Duration) {
    counter!("streamer_events_total", "event_type" => event_type).increment(1);
    histogram!("streamer_event_duration_seconds", "event_type" => event_type)
        .record(duration.as_secs_f64());
}

/// Set the number of bound slots.
///
/// Metric: `streamer_slots_bound`
pub fn set_slots_bound(count: usize) {
    // usize to f64 conversion is safe for slot counts
    #[allow(clippy::cast_precision_loss)]
    gauge!("streamer_slots_bound").set(count as f64);
}

/// Set the number of participants with a track record.
///
/// Metric: `streamer_participants_known`
pub fn set_participants_known(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("streamer_participants_known").set(count as f64);
}

/// Record a render call that found no target.
///
/// Metric: `streamer_render_noop_total`
/// Labels: `operation` (attach, detach, set_volume)
pub fn record_render_noop(operation: &'static str) {
    counter!("streamer_render_noop_total", "operation" => operation).increment(1);
}

/// Record a dropped MIDI message.
///
/// Metric: `streamer_midi_ignored_total`
/// Labels: `reason` (disabled, malformed, not_control_change, slot_out_of_range)
pub fn record_midi_ignored(reason: &'static str) {
    counter!("streamer_midi_ignored_total", "reason" => reason).increment(1);
}
