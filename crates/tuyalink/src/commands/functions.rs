//! Functions command: the device's declared writable data points.

use tabled::Tabled;
use tuyalink_core::{Coordinator, FunctionSpec};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct FunctionRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Values")]
    values: String,
}

impl From<&FunctionSpec> for FunctionRow {
    fn from(f: &FunctionSpec) -> Self {
        Self {
            code: f.code.clone(),
            kind: f.kind.clone().unwrap_or_default(),
            name: f.name.clone().unwrap_or_default(),
            values: f.values.clone().unwrap_or_default(),
        }
    }
}

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let catalog = coordinator.functions().await?;
    let specs: Vec<&FunctionSpec> = catalog.iter().collect();

    let out = output::render_list(
        &global.output,
        &specs,
        |f| FunctionRow::from(*f),
        |f| f.code.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
