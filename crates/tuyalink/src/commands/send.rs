//! Send command: data-point writes with optional cloud confirmation.

use std::time::Duration;

use serde::Serialize;
use tuyalink_core::{
    CommandOutcome, Coordinator, DeviceCommand, DpValue, Expectation, FollowUp, Snapshot,
};

use crate::cli::{GlobalOpts, SendArgs};
use crate::error::CliError;
use crate::output;

/// Serializable summary for `--output json`.
#[derive(Serialize)]
struct SendReport<'a> {
    result: &'a serde_json::Value,
    follow_up: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<&'a Snapshot>,
}

impl<'a> SendReport<'a> {
    fn new(outcome: &'a CommandOutcome) -> Self {
        let (follow_up, message, snapshot) = match &outcome.follow_up {
            FollowUp::Refreshed(s) => ("refreshed", None, Some(s.as_ref())),
            FollowUp::RefreshFailed(msg) => ("refresh_failed", Some(msg.as_str()), None),
            FollowUp::Verified(s) => ("verified", None, Some(s.as_ref())),
            FollowUp::TimedOut(s) => ("timed_out", None, Some(s.as_ref())),
            FollowUp::Cancelled => ("cancelled", None, None),
        };
        Self {
            result: &outcome.result,
            follow_up,
            message,
            snapshot,
        }
    }
}

/// Expected values the device did not report.
fn mismatches(expected: &Expectation, snapshot: &Snapshot) -> Vec<String> {
    expected
        .iter()
        .filter(|(code, want)| snapshot.value(code) != *want)
        .map(|(code, want)| {
            format!(
                "{code}: wanted {want}, device reports {}",
                snapshot.value(code)
            )
        })
        .collect()
}

fn describe(
    outcome: &CommandOutcome,
    expected: &Expectation,
    timeout: Duration,
    color: bool,
) -> String {
    let mut lines = vec![format!("Command accepted (result: {})", outcome.result)];
    match &outcome.follow_up {
        FollowUp::Refreshed(_) => lines.push(output::muted("Status refreshed", color)),
        FollowUp::RefreshFailed(msg) => {
            lines.push(output::muted(&format!("Status refresh failed: {msg}"), color));
        }
        FollowUp::Verified(_) => {
            let pairs: Vec<String> = expected
                .iter()
                .map(|(code, value)| format!("{code}={value}"))
                .collect();
            lines.push(output::success(
                &format!("Device confirmed {}", pairs.join(", ")),
                color,
            ));
        }
        FollowUp::TimedOut(snapshot) => {
            lines.push(output::warning(
                &format!("Not confirmed within {:.1}s", timeout.as_secs_f64()),
                color,
            ));
            lines.extend(mismatches(expected, snapshot).into_iter().map(|m| format!("  {m}")));
        }
        FollowUp::Cancelled => lines.push(output::warning("Verification cancelled", color)),
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    coordinator: &Coordinator,
    args: SendArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let commands: Vec<DeviceCommand> = args
        .commands
        .iter()
        .map(|(code, value)| DeviceCommand::new(code.clone(), value.clone()))
        .collect();

    let mut expected = Expectation::new();
    if args.verify {
        for (code, value) in &args.commands {
            expected.insert(code.clone(), DpValue::from(value.clone()));
        }
    }
    for (code, value) in args.expect {
        expected.insert(code, DpValue::from(value));
    }

    let mut options = coordinator.config().command_defaults;
    if let Some(secs) = args.verify_timeout {
        options.timeout =
            Duration::try_from_secs_f64(secs).map_err(|e| CliError::Validation {
                field: "verify-timeout".into(),
                reason: e.to_string(),
            })?;
    }
    if let Some(ms) = args.verify_interval {
        options.interval = Duration::from_millis(ms);
    }

    let verify = (!expected.is_empty()).then_some(&expected);
    let outcome = coordinator
        .send_commands_with(&commands, verify, options)
        .await?;

    let color = output::should_color(&global.color);
    let out = output::render_single(&global.output, &SendReport::new(&outcome), |_| {
        describe(&outcome, &expected, options.timeout, color)
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
