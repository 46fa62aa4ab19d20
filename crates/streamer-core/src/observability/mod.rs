//! Observability module for the streamer.
//!
//! # Privacy by Default
//!
//! Participant ids and display names appear in logs only. Metric labels are
//! bounded so cardinality stays fixed no matter who joins:
//! - `event_type`: one value per `EngineEvent` variant
//! - `operation`: attach, detach, set_volume
//! - `reason`: bounded MIDI ignore reasons
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `streamer_events_total` | Counter | `event_type` | Events handled by the engine |
//! | `streamer_event_duration_seconds` | Histogram | `event_type` | Time spent handling one event |
//! | `streamer_slots_bound` | Gauge | none | Slots currently showing a participant |
//! | `streamer_participants_known` | Gauge | none | Track records held |
//! | `streamer_render_noop_total` | Counter | `operation` | Render calls whose target was missing |
//! | `streamer_midi_ignored_total` | Counter | `reason` | MIDI messages dropped |

pub mod metrics;

// Re-exports for convenience
pub use metrics::{
    init_metrics_recorder, record_event, record_midi_ignored, record_render_noop,
    set_participants_known, set_slots_bound,
};
