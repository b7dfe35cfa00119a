//! Status command: one scheduled-style refresh, then the full snapshot.

use tabled::Tabled;
use tuyalink_core::{Coordinator, DpValue, Snapshot};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DataPointRow {
    #[tabled(rename = "Data point")]
    code: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Value as a script would want it: empty for unreported data points.
pub(super) fn plain_value(value: &DpValue) -> String {
    if value.is_empty() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Render a whole snapshot in the selected format.
pub(super) fn render_snapshot(snapshot: &Snapshot, global: &GlobalOpts) -> String {
    let color = output::should_color(&global.color);
    match global.output {
        OutputFormat::Table | OutputFormat::Plain => {
            let entries: Vec<(&str, &DpValue)> = snapshot.iter().collect();
            output::render_list(
                &global.output,
                &entries,
                |&(code, value)| DataPointRow {
                    code: code.to_owned(),
                    value: if value.is_empty() {
                        output::muted("-", color)
                    } else {
                        value.to_string()
                    },
                },
                |&(code, value)| format!("{code}={}", plain_value(value)),
            )
        }
        OutputFormat::Json | OutputFormat::JsonCompact => {
            output::render_single(&global.output, snapshot, |_| String::new())
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = coordinator.refresh().await?;
    output::print_output(&render_snapshot(&snapshot, global), global.quiet);
    Ok(())
}
