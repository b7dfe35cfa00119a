//! Configuration for the tuyalink CLI.
//!
//! TOML profiles, access-secret resolution (env + keyring + plaintext),
//! validation, and translation to `tuyalink_core::CoordinatorConfig`.
//! Core never reads config files; it receives a pre-built config.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use tuyalink_core::{CoordinatorConfig, Credentials, Region, RegionSelector};

const KEYRING_SERVICE: &str = "tuyalink";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no access secret configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: Vec<String> },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is requested.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Scheduled refresh period in seconds.
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            poll_seconds: default_poll_seconds(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    15
}
fn default_poll_seconds() -> u64 {
    30
}
fn default_region() -> String {
    "auto".into()
}

/// One cloud project + device.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// `auto`, a region code (`eu`, `us`, `in`, `cn`), or an explicit
    /// `https://` API base.
    #[serde(default = "default_region")]
    pub region: String,

    /// Cloud project access id.
    #[serde(default)]
    pub access_id: String,

    /// Access secret (plaintext, prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_secret: Option<String>,

    /// Environment variable holding the access secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_secret_env: Option<String>,

    #[serde(default)]
    pub device_id: String,

    /// Override the scheduled refresh period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_seconds: Option<u64>,

    /// Override the HTTP timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Extra CA certificate (TLS-intercepting proxies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Data points every snapshot must carry. Defaults to the S6 panel set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_points: Option<Vec<String>>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "tuyalink", "tuyalink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tuyalink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (if it exists), then `TUYALINK_*` env vars.
///
/// Nested keys use a double underscore:
/// `TUYALINK_PROFILES__HOME__DEVICE_ID=...`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TUYALINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile selection ───────────────────────────────────────────────

/// Requested name, else the file's `default_profile`, else `"default"`.
pub fn active_profile_name(requested: Option<&str>, cfg: &Config) -> String {
    requested
        .map(str::to_owned)
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Look up a profile by name.
pub fn find_profile<'a>(cfg: &'a Config, name: &str) -> Result<&'a Profile, ConfigError> {
    cfg.profiles.get(name).ok_or_else(|| {
        let mut available: Vec<String> = cfg.profiles.keys().cloned().collect();
        available.sort();
        ConfigError::ProfileNotFound {
            name: name.into(),
            available,
        }
    })
}

// ── Secret resolution ───────────────────────────────────────────────

/// Resolve the access secret: named env var, then the system keyring
/// entry `tuyalink/<profile>/access-secret`, then plaintext in the file.
pub fn resolve_access_secret(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    resolve_access_secret_with(
        profile,
        profile_name,
        |var| std::env::var(var).ok(),
        keyring_secret,
    )
}

/// Store the access secret in the system keyring.
pub fn store_access_secret(profile_name: &str, secret: &SecretString) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))
        .and_then(|entry| entry.set_password(secret.expose_secret()))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/access-secret")
}

fn keyring_secret(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))
        .ok()?
        .get_password()
        .ok()
}

fn resolve_access_secret_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    let non_blank = |s: String| (!s.trim().is_empty()).then_some(s);

    // 1. Profile's access_secret_env → env var lookup
    if let Some(secret) = profile
        .access_secret_env
        .as_deref()
        .and_then(&env)
        .and_then(non_blank)
    {
        debug!(profile = profile_name, "access secret from environment");
        return Ok(SecretString::from(secret));
    }

    // 2. System keyring
    if let Some(secret) = keyring(profile_name).and_then(non_blank) {
        debug!(profile = profile_name, "access secret from keyring");
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    if let Some(secret) = profile.access_secret.clone().and_then(non_blank) {
        return Ok(SecretString::from(secret));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Validation ──────────────────────────────────────────────────────

/// Check a profile and return its parsed region selector.
pub fn validate_profile(profile: &Profile) -> Result<RegionSelector, ConfigError> {
    let region: RegionSelector = profile
        .region
        .parse()
        .unwrap_or_else(|_| RegionSelector::Unrecognized(profile.region.clone()));
    if !region.is_recognized() {
        return Err(invalid(
            "region",
            format!(
                "expected 'auto', one of {}, or an https:// URL, got '{}'",
                Region::codes().join("/"),
                profile.region.trim()
            ),
        ));
    }

    if profile.access_id.trim().is_empty() {
        return Err(invalid("access_id", "must not be empty".into()));
    }
    if profile.device_id.trim().is_empty() {
        return Err(invalid("device_id", "must not be empty".into()));
    }
    if profile.poll_seconds == Some(0) {
        return Err(invalid("poll_seconds", "must be at least 1".into()));
    }

    Ok(region)
}

fn invalid(field: &str, reason: String) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason,
    }
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `CoordinatorConfig` from a validated profile, resolving its
/// access secret.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    let region = validate_profile(profile)?;
    let secret = resolve_access_secret(profile, profile_name)?;
    build_coordinator_config(profile, defaults, region, &secret)
}

/// Poll period and HTTP timeout after `[defaults]` fill-in, both at least
/// one second.
fn effective_timing(profile: &Profile, defaults: &Defaults) -> Result<(u64, u64), ConfigError> {
    let poll = profile.poll_seconds.unwrap_or(defaults.poll_seconds);
    if poll == 0 {
        return Err(invalid("poll_seconds", "must be at least 1".into()));
    }
    let timeout = profile.timeout.unwrap_or(defaults.timeout);
    if timeout == 0 {
        return Err(invalid("timeout", "must be at least 1".into()));
    }
    Ok((poll, timeout))
}

fn build_coordinator_config(
    profile: &Profile,
    defaults: &Defaults,
    region: RegionSelector,
    secret: &SecretString,
) -> Result<CoordinatorConfig, ConfigError> {
    let (poll, timeout) = effective_timing(profile, defaults)?;
    let credentials = Credentials::new(&profile.access_id, secret.expose_secret(), region);

    let mut config = CoordinatorConfig::new(credentials, &profile.device_id)
        .with_poll_interval(Duration::from_secs(poll));
    config.timeout = Duration::from_secs(timeout);
    config.ca_cert.clone_from(&profile.ca_cert);
    if let Some(ref codes) = profile.data_points {
        config = config.with_known_data_points(codes.iter().map(|c| c.trim().to_owned()));
    }
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tuyalink_core::S6_DATA_POINTS;

    fn profile() -> Profile {
        Profile {
            region: "auto".into(),
            access_id: "abc123".into(),
            access_secret: Some("plain-secret".into()),
            access_secret_env: None,
            device_id: "dev1".into(),
            poll_seconds: None,
            timeout: None,
            ca_cert: None,
            data_points: None,
        }
    }

    #[test]
    fn load_from_file_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "home"

[profiles.home]
access_id = "abc123"
access_secret_env = "HOME_TUYA_SECRET"
device_id = "bf0123"
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();

        assert_eq!(active_profile_name(None, &cfg), "home");
        assert_eq!(active_profile_name(Some("lab"), &cfg), "lab");
        let home = find_profile(&cfg, "home").unwrap();
        assert_eq!(home.region, "auto");
        assert_eq!(home.device_id, "bf0123");
        assert_eq!(cfg.defaults.poll_seconds, 30);
        assert_eq!(cfg.defaults.timeout, 15);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
        assert!(matches!(
            find_profile(&cfg, "home"),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert("home".into(), profile());

        save_config_to(&cfg, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();

        let home = find_profile(&loaded, "home").unwrap();
        assert_eq!(home.access_id, "abc123");
        assert_eq!(home.access_secret.as_deref(), Some("plain-secret"));
    }

    #[test]
    fn validation_accepts_known_forms() {
        for region in ["auto", "EU", " us ", "https://openapi.example.com"] {
            let mut p = profile();
            p.region = region.into();
            assert!(validate_profile(&p).is_ok(), "rejected {region}");
        }

        let mut p = profile();
        p.region = "Us".into();
        assert_eq!(
            validate_profile(&p).unwrap(),
            RegionSelector::Region(Region::Us)
        );
    }

    #[test]
    fn validation_rejects_bad_fields() {
        let cases: [(&str, fn(&mut Profile)); 4] = [
            ("region", |p| p.region = "mars".into()),
            ("access_id", |p| p.access_id = "   ".into()),
            ("device_id", |p| p.device_id = String::new()),
            ("poll_seconds", |p| p.poll_seconds = Some(0)),
        ];

        for (field, mutate) in cases {
            let mut p = profile();
            mutate(&mut p);
            match validate_profile(&p) {
                Err(ConfigError::Validation { field: got, .. }) => assert_eq!(got, field),
                other => panic!("expected {field} validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn secret_resolution_order() {
        let mut p = profile();
        p.access_secret_env = Some("TUYA_SECRET".into());

        let from_env = resolve_access_secret_with(
            &p,
            "home",
            |var| (var == "TUYA_SECRET").then(|| "env-secret".into()),
            |_| Some("keyring-secret".into()),
        )
        .unwrap();
        assert_eq!(from_env.expose_secret(), "env-secret");

        let from_keyring =
            resolve_access_secret_with(&p, "home", |_| None, |_| Some("keyring-secret".into()))
                .unwrap();
        assert_eq!(from_keyring.expose_secret(), "keyring-secret");

        let from_file = resolve_access_secret_with(&p, "home", |_| None, |_| None).unwrap();
        assert_eq!(from_file.expose_secret(), "plain-secret");

        p.access_secret = Some("  ".into());
        assert!(matches!(
            resolve_access_secret_with(&p, "home", |_| None, |_| None),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn builds_coordinator_config() {
        let mut p = profile();
        p.poll_seconds = Some(10);
        p.timeout = Some(5);
        p.device_id = " dev1 ".into();
        let region = validate_profile(&p).unwrap();

        let cfg = build_coordinator_config(
            &p,
            &Defaults::default(),
            region,
            &SecretString::from(" s3cret\n".to_owned()),
        )
        .unwrap();

        assert_eq!(cfg.device_id, "dev1");
        assert_eq!(cfg.poll_interval, Duration::from_secs(10));
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert_eq!(cfg.credentials.access_secret.expose_secret(), "s3cret");
        assert_eq!(cfg.credentials.region, RegionSelector::Auto);
        assert_eq!(cfg.known_data_points.len(), S6_DATA_POINTS.len());

        p.data_points = Some(vec!["system_arm_type".into()]);
        let cfg = build_coordinator_config(
            &p,
            &Defaults::default(),
            RegionSelector::Auto,
            &SecretString::from("x".to_owned()),
        )
        .unwrap();
        assert_eq!(cfg.known_data_points, vec!["system_arm_type".to_owned()]);
    }

    #[test]
    fn zero_timing_from_defaults_is_rejected() {
        let p = profile();
        let secret = SecretString::from("x".to_owned());

        let defaults = Defaults {
            poll_seconds: 0,
            ..Defaults::default()
        };
        let err = build_coordinator_config(&p, &defaults, RegionSelector::Auto, &secret).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "poll_seconds"));

        let defaults = Defaults {
            timeout: 0,
            ..Defaults::default()
        };
        let err = build_coordinator_config(&p, &defaults, RegionSelector::Auto, &secret).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "timeout"));

        // A profile override wins over a zero default.
        let mut p = profile();
        p.timeout = Some(5);
        let cfg = build_coordinator_config(&p, &defaults, RegionSelector::Auto, &secret).unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(5));
    }
}
