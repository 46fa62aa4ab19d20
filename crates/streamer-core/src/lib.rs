//! Streamer View Core
//!
//! Maps the participants of a conference onto a fixed set of named on-screen
//! slots for a broadcast operator:
//!
//! - Each slot expects a display name; the first participant using that name
//!   is bound to it and their audio/video are attached to the slot
//! - Renames on either side (slot or participant) move bindings around
//! - Per-slot volume from the operator surface or a MIDI fader bank
//! - The transport is told which participants are on screen so it only
//!   forwards full-resolution video for those
//!
//! # Architecture
//!
//! ```text
//! StreamerSession (actor, one per streamer)
//! ├── AssignmentEngine (pure: EngineEvent -> Vec<Command>)
//! │   ├── SlotRegistry (slot names, occupants, volumes)
//! │   ├── TrackStore (per-participant handles, join order)
//! │   └── MidiMapper (control change -> slot volume)
//! ├── Conference (transport seam)
//! ├── RenderSurface (per-slot audio/video targets)
//! └── SlotNameStore (persisted slot-name table)
//! ```
//!
//! # Modules
//!
//! - [`engine`] - Slot assignment state machine
//! - [`session`] - Actor that serializes inputs and applies commands
//! - [`config`] - Configuration from environment
//! - [`errors`] - Error types
//! - [`replay`] - NDJSON driver used by the `streamer` binary

#![warn(clippy::pedantic)]

pub mod config;
pub mod engine;
pub mod errors;
pub mod messages;
pub mod midi;
pub mod observability;
pub mod persistence;
pub mod render;
pub mod replay;
pub mod session;
pub mod slots;
pub mod tracks;
pub mod transport;
