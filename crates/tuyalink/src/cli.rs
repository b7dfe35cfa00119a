//! Clap derive structures for the `tuyalink` CLI.
//!
//! Defines the command tree, global flags, and shared argument parsers.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tuyalink -- read and command a Tuya cloud alarm panel
#[derive(Debug, Parser)]
#[command(
    name = "tuyalink",
    version,
    about = "Read and command Tuya cloud alarm panels from the command line",
    long_about = "Talks to the Tuya IoT cloud OpenAPI with signed requests.\n\n\
        Region and signing mode are discovered automatically; commands can\n\
        wait until the device confirms the new values.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config profile to use
    #[arg(long, short = 'p', env = "TUYALINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device id (overrides profile)
    #[arg(long, short = 'd', env = "TUYALINK_DEVICE", global = true)]
    pub device: Option<String>,

    /// Region: auto, eu, us, in, cn, or an API base URL (overrides profile)
    #[arg(long, short = 'r', env = "TUYALINK_REGION", global = true)]
    pub region: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TUYALINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// HTTP request timeout in seconds (overrides profile)
    #[arg(long, env = "TUYALINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain `code=value` lines (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show every data point of the device
    #[command(alias = "st")]
    Status,

    /// List the data points the device accepts commands for
    #[command(alias = "fn")]
    Functions,

    /// Send data-point commands, optionally waiting for confirmation
    Send(SendArgs),

    /// Poll the device and print changes until interrupted
    Watch(WatchArgs),

    /// Verify credentials, region and device access
    Check,

    /// Inspect configuration
    Config(ConfigArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SEND
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Commands as CODE=VALUE (value parsed as JSON, else taken as text)
    #[arg(required = true, value_name = "CODE=VALUE", value_parser = parse_assignment)]
    pub commands: Vec<(String, serde_json::Value)>,

    /// Wait until the device reports every sent value
    #[arg(long)]
    pub verify: bool,

    /// Wait until the device reports CODE=VALUE (repeatable, implies --verify)
    #[arg(long = "expect", value_name = "CODE=VALUE", value_parser = parse_assignment)]
    pub expect: Vec<(String, serde_json::Value)>,

    /// Give up verifying after this many seconds
    #[arg(long, value_name = "SECS")]
    pub verify_timeout: Option<f64>,

    /// Pause between verify polls, in milliseconds
    #[arg(long, value_name = "MS")]
    pub verify_interval: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll period in seconds (overrides profile)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Create or replace a profile (region and device from --region / --device)
    Init(InitArgs),

    /// Display the active profile (secrets redacted)
    Show,

    /// Make a profile the default
    Use {
        /// Profile name
        name: String,
    },

    /// Store the access secret in the system keyring (read from stdin)
    SetSecret,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Cloud project access id
    #[arg(long)]
    pub access_id: String,

    /// Environment variable holding the access secret
    #[arg(long, value_name = "VAR")]
    pub access_secret_env: Option<String>,

    /// Also make this the default profile
    #[arg(long)]
    pub default: bool,
}

// ── Parsers ──────────────────────────────────────────────────────────

/// Parse `code=value`. The value is JSON when it parses as JSON
/// (`true`, `30`, `"arm"`), otherwise a plain string.
pub fn parse_assignment(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (code, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CODE=VALUE, got '{raw}'"))?;
    let code = code.trim();
    if code.is_empty() {
        return Err(format!("missing data-point code in '{raw}'"));
    }
    let value = serde_json::from_str(value.trim())
        .unwrap_or_else(|_| serde_json::Value::String(value.to_owned()));
    Ok((code.to_owned(), value))
}
