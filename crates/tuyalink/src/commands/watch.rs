//! Watch command: start the poll loop and print changes as they arrive.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tokio::sync::broadcast::error::RecvError;
use tuyalink_core::{Coordinator, Snapshot};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::status::render_snapshot;

/// `code: old -> new` for every data point whose value moved.
fn changes(previous: &Snapshot, current: &Snapshot) -> Vec<String> {
    current
        .iter()
        .filter(|(code, value)| previous.value(code) != *value)
        .map(|(code, value)| format!("{code}: {} -> {value}", previous.value(code)))
        .collect()
}

fn render_update(
    previous: &Snapshot,
    current: &Snapshot,
    published_at: Option<DateTime<Utc>>,
    global: &GlobalOpts,
) -> String {
    match global.output {
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(current),
        OutputFormat::Table | OutputFormat::Plain => {
            let stamp = published_at
                .map_or_else(Local::now, |t| t.with_timezone(&Local))
                .format("%H:%M:%S");
            changes(previous, current)
                .into_iter()
                .map(|line| format!("[{stamp}] {line}"))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let mut previous: Arc<Snapshot> = coordinator.start().await?;
    let mut updates = coordinator.updates();
    let mut availability = coordinator.availability();
    let color = output::should_color(&global.color);
    let structured = matches!(global.output, OutputFormat::Json | OutputFormat::JsonCompact);

    let initial = if structured {
        output::render_json_compact(previous.as_ref())
    } else {
        render_snapshot(&previous, global)
    };
    output::print_output(&initial, global.quiet);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,

            changed = availability.changed() => {
                if changed.is_err() {
                    break;
                }
                let available = *availability.borrow_and_update();
                if !structured {
                    let line = if available {
                        output::success("Device reachable again", color)
                    } else {
                        output::warning("Device unreachable, keeping last known values", color)
                    };
                    output::print_output(&line, global.quiet);
                }
            }

            update = updates.recv() => match update {
                Ok(current) => {
                    let out = render_update(&previous, &current, coordinator.last_update(), global);
                    output::print_output(&out, global.quiet);
                    previous = current;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "watch output fell behind, some updates were skipped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    coordinator.stop().await;
    Ok(())
}
