// ── Core error types ──
//
// User-facing errors from tuyalink-core. The `From<tuyalink_api::Error>`
// impl translates transport-layer errors into domain-appropriate variants
// while keeping the cloud payload for callers that want to inspect it.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the cloud API: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Cloud request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        message: String,
        payload: serde_json::Value,
    },

    // ── API errors ───────────────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// The cloud's numeric error code, if it sent one.
        code: Option<i64>,
        payload: serde_json::Value,
    },

    /// The cloud replied with something that is not the expected JSON.
    #[error("Unexpected response: {message}")]
    Protocol { message: String, body: String },

    // ── Scheduler ────────────────────────────────────────────────────
    /// A scheduled refresh failed; the previous snapshot is still served.
    #[error("Update failed: {source}")]
    UpdateFailed { source: Box<CoreError> },

    /// The coordinator was stopped.
    #[error("Coordinator stopped")]
    Stopped,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// The cloud payload attached to this error, if any.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Api { payload, .. } | Self::AuthenticationFailed { payload, .. } => {
                Some(payload)
            }
            Self::UpdateFailed { source } => source.payload(),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tuyalink_api::Error> for CoreError {
    fn from(err: tuyalink_api::Error) -> Self {
        match err {
            tuyalink_api::Error::Authentication { message, payload } => {
                CoreError::AuthenticationFailed { message, payload }
            }
            // Timeouts with a known budget arrive as `Error::Timeout`.
            tuyalink_api::Error::Transport(e) => CoreError::ConnectionFailed {
                reason: e.to_string(),
            },
            tuyalink_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            tuyalink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            tuyalink_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                reason: format!("TLS error: {msg}"),
            },
            tuyalink_api::Error::Api {
                code,
                message,
                payload,
            } => CoreError::Api {
                message,
                code,
                payload,
            },
            tuyalink_api::Error::Deserialization { message, body } => {
                CoreError::Protocol { message, body }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn raw_transport_timeout_is_a_connection_failure() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_millis(500)))
            .mount(&server)
            .await;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(20))
            .build()
            .unwrap();
        let raw = http.get(server.uri()).send().await.unwrap_err();
        assert!(raw.is_timeout());

        let err = CoreError::from(tuyalink_api::Error::Transport(raw));
        assert!(matches!(err, CoreError::ConnectionFailed { .. }), "{err:?}");
        assert!(!err.to_string().contains("0s"));
    }

    #[test]
    fn api_error_keeps_payload() {
        let err: CoreError = tuyalink_api::Error::Api {
            code: Some(2009),
            message: "device is offline".into(),
            payload: json!({"success": false, "code": 2009}),
        }
        .into();

        assert!(matches!(err, CoreError::Api { code: Some(2009), .. }));
        assert_eq!(err.payload().map(|p| p["code"].clone()), Some(json!(2009)));
    }

    #[test]
    fn update_failed_delegates_to_source() {
        let inner: CoreError = tuyalink_api::Error::Authentication {
            message: "rejected".into(),
            payload: json!({"code": 1106}),
        }
        .into();
        let err = CoreError::UpdateFailed {
            source: Box::new(inner),
        };

        assert!(matches!(
            err,
            CoreError::UpdateFailed { ref source } if matches!(**source, CoreError::AuthenticationFailed { .. })
        ));
        assert_eq!(err.payload().map(|p| p["code"].clone()), Some(json!(1106)));
        assert!(err.to_string().starts_with("Update failed: Authentication failed"));
    }
}
