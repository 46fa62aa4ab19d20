//! # Streamer Test Utilities
//!
//! Mocks and fixtures for testing the streamer core without a conferencing
//! backend or a rendering surface.
//!
//! ## Modules
//!
//! - `mock_conference` - Transport mock that records every outbound call
//! - `mock_surface` - Rendering surface mock with per-slot targets
//! - `mock_store` - In-memory slot-name store
//! - `fixtures` - Event constructors and test configuration
//! - `assertions` - Attachment model and binding invariant checks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use streamer_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let conference = MockConference::builder().build();
//!     let calls = conference.calls();
//!     let surface = MockRenderSurface::new(4);
//!     let probe = surface.probe();
//!
//!     let (handle, _task) = StreamerSession::spawn(
//!         &test_config(&["alpha", "beta"]),
//!         Box::new(conference),
//!         Box::new(surface),
//!         Box::new(MemorySlotNameStore::new()),
//!         CancellationToken::new(),
//!     );
//!
//!     handle.dispatch(joined("p1", "alpha")).await.unwrap();
//!     // Inspect `calls` and `probe`...
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock_conference;
pub mod mock_store;
pub mod mock_surface;

pub use assertions::*;
pub use fixtures::*;
pub use mock_conference::*;
pub use mock_store::*;
pub use mock_surface::*;
