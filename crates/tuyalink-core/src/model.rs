// ── Data-point model ──
//
// Typed data-point values and the status snapshot published to
// consumers. Raw `{code, value}` pairs from the cloud are validated into
// `DpValue` here, at the boundary, so nothing downstream handles
// untyped JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tuyalink_api::{FunctionSpec, StatusItem};

/// Every data point of the S6 alarm panel (product category `qt`).
pub const S6_DATA_POINTS: &[&str] = &[
    "system_arm_type",
    "gsm_status",
    "language",
    "dc_status",
    "bat_status",
    "arm_delay",
    "alarm_delay",
    "alarm_sound_duration",
    "ring_times",
    "tel_alarm_cycle",
    "inside_siren_sound",
    "gsm_en",
    "tel_ctrl_en",
    "arm_sms_en",
    "disarm_sms_en",
    "keyboard_tone_en",
    "arm_delay_tone_en",
    "alarm_delay_tone_en",
    "arm_disarm_tone_en",
    "inside_siren_en",
    "wireless_siren_en",
    "password",
    "tel_num",
    "device_info",
    "sub_device",
    "alarm_msg",
    "history_msg",
    "cmd_ctrl",
];

// ── DpValue ──────────────────────────────────────────────────────────

/// A data-point value as reported by the cloud.
///
/// `Empty` marks a known data point the cloud did not report (or reported
/// as `null`). Values that are neither bool, integer nor string (floats,
/// objects) are kept as `Other`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DpValue {
    #[default]
    Empty,
    Bool(bool),
    Integer(i64),
    Text(String),
    Other(serde_json::Value),
}

impl DpValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for DpValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Empty,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Other(serde_json::Value::Number(n)),
            },
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Other(other),
        }
    }
}

impl From<bool> for DpValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for DpValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<&str> for DpValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for DpValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl fmt::Display for DpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("-"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Other(v) => write!(f, "{v}"),
        }
    }
}

static EMPTY: DpValue = DpValue::Empty;

// ── Expectation ──────────────────────────────────────────────────────

/// Data-point values a command is expected to produce, checked by
/// verification.
pub type Expectation = BTreeMap<String, DpValue>;

// ── Snapshot ─────────────────────────────────────────────────────────

/// Last-known device status: data-point code → value.
///
/// Built through [`Snapshot::from_status`], which guarantees every known
/// code is present (as [`DpValue::Empty`] if the cloud omitted it).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: BTreeMap<String, DpValue>,
}

impl Snapshot {
    /// Build from a status read, filling every code in `known` that the
    /// cloud did not report.
    pub fn from_status<'a>(
        items: Vec<StatusItem>,
        known: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut values: BTreeMap<String, DpValue> = items
            .into_iter()
            .map(|item| (item.code, DpValue::from(item.value)))
            .collect();
        for code in known {
            values.entry(code.to_owned()).or_default();
        }
        Self { values }
    }

    /// Value of a data point; [`DpValue::Empty`] for codes not in the
    /// snapshot.
    pub fn value(&self, code: &str) -> &DpValue {
        self.values.get(code).unwrap_or(&EMPTY)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.values.contains_key(code)
    }

    /// `true` if every expected pair has an equal value. Codes missing
    /// from the snapshot compare as [`DpValue::Empty`].
    pub fn satisfies(&self, expected: &Expectation) -> bool {
        expected
            .iter()
            .all(|(code, want)| self.value(code) == want)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DpValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ── Function catalog ─────────────────────────────────────────────────

/// Declared capabilities keyed by data-point code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionCatalog {
    functions: BTreeMap<String, FunctionSpec>,
}

impl FunctionCatalog {
    pub fn get(&self, code: &str) -> Option<&FunctionSpec> {
        self.functions.get(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Specs in code order.
    pub fn iter(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl FromIterator<FunctionSpec> for FunctionCatalog {
    fn from_iter<I: IntoIterator<Item = FunctionSpec>>(iter: I) -> Self {
        Self {
            functions: iter.into_iter().map(|f| (f.code.clone(), f)).collect(),
        }
    }
}
