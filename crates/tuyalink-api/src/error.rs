use thiserror::Error;

/// Cloud error code meaning "signature rejected": the project expects the
/// other nonce mode.
pub const CODE_SIGNATURE_INVALID: i64 = 1004;

/// Top-level error type for the `tuyalink-api` crate.
///
/// Covers every failure mode of the signed cloud client: transport,
/// protocol (non-JSON replies), token discovery, and cloud-reported
/// failures. `tuyalink-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Every endpoint / nonce-mode combination was rejected by the token
    /// endpoint. Carries the last failure payload observed.
    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
        payload: serde_json::Value,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Cloud API ───────────────────────────────────────────────────
    /// The cloud answered `success: false`.
    #[error("Cloud API error (code {}): {message}", code.map_or_else(|| "none".to_owned(), |c| c.to_string()))]
    Api {
        code: Option<i64>,
        message: String,
        payload: serde_json::Value,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the cloud rejected the request signature.
    pub fn is_signature_rejected(&self) -> bool {
        self.api_error_code() == Some(CODE_SIGNATURE_INVALID)
    }

    /// Extract the cloud error code, if available.
    pub fn api_error_code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => *code,
            _ => None,
        }
    }

    /// The raw cloud payload attached to this error, if any.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Api { payload, .. } | Self::Authentication { payload, .. } => Some(payload),
            _ => None,
        }
    }
}
