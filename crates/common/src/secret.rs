//! Secret types for values that must never reach a log line.
//!
//! The conference password is the only secret the streamer handles. It is
//! carried as a [`SecretString`] from configuration through the session actor
//! into the transport call, so `{:?}` and `tracing` fields on any struct that
//! holds it print a redacted placeholder.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct RoomCredentials {
//!     room: String,
//!     password: SecretString,
//! }
//!
//! let creds = RoomCredentials {
//!     room: "stage-left".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("hunter2"));
//! assert_eq!(creds.password.expose_secret(), "hunter2");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("room-password");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("room-password"));
    }

    #[test]
    fn test_deserialize_join_request() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct JoinRequest {
            room: String,
            password: Option<SecretString>,
        }

        let json = r#"{"room": "tt-test2", "password": "letmein"}"#;
        let request: JoinRequest = serde_json::from_str(json).expect("deserialize");

        assert_eq!(
            request.password.as_ref().map(|p| p.expose_secret()),
            Some("letmein")
        );
        assert!(!format!("{request:?}").contains("letmein"));
    }
}
