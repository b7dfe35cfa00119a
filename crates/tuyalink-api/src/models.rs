// Cloud API wire types
//
// Every OpenAPI response is wrapped in the same envelope. Fields use
// `#[serde(default)]` liberally because error replies omit `result` and
// success replies omit `code`/`msg`.

use serde::{Deserialize, Serialize};

// ── Response Envelope ────────────────────────────────────────────────

/// Standard OpenAPI response envelope.
///
/// ```json
/// { "success": true, "result": ..., "t": 1700000000000 }
/// { "success": false, "code": 1004, "msg": "sign invalid", "t": ... }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
    /// Server timestamp in milliseconds.
    #[serde(default)]
    pub t: Option<i64>,
}

// ── Token ────────────────────────────────────────────────────────────

/// `result` of `GET /v1.0/token?grant_type=1`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default = "default_expire_time")]
    pub expire_time: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
}

fn default_expire_time() -> u64 {
    7200
}

// ── Device ───────────────────────────────────────────────────────────

/// One declared capability from the functions endpoint.
///
/// `values` is a JSON document encoded as a string (ranges, enum members).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub code: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub values: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
}

/// `result` of the functions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionList {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
}

/// One `{code, value}` entry of the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusItem {
    pub code: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// A data-point write: `{code, value}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub code: String,
    pub value: serde_json::Value,
}

impl DeviceCommand {
    pub fn new(code: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            code: code.into(),
            value: value.into(),
        }
    }
}

/// Request body of the commands endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct CommandBatch<'a> {
    pub commands: &'a [DeviceCommand],
}
