//! Check command: prove credentials, region and device access end to end.

use serde::Serialize;
use tuyalink_core::Coordinator;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct CheckReport<'a> {
    ok: bool,
    device_id: &'a str,
    endpoint: Option<String>,
    nonce_signing: Option<bool>,
    functions: usize,
}

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    // The catalog fetch walks token discovery and touches the device.
    let functions = coordinator.functions().await?.len();
    let binding = coordinator.backend().binding().await;

    let report = CheckReport {
        ok: true,
        device_id: coordinator.device_id(),
        endpoint: binding.as_ref().map(|b| b.base_url.clone()),
        nonce_signing: binding.as_ref().map(|b| b.use_nonce),
        functions,
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(&global.output, &report, |r| {
        let mut lines = vec![output::success("Cloud access OK", color)];
        lines.push(format!("  Device:     {}", r.device_id));
        if let Some(ref endpoint) = r.endpoint {
            lines.push(format!("  Endpoint:   {endpoint}"));
        }
        if let Some(nonce) = r.nonce_signing {
            let mode = if nonce { "with nonce" } else { "without nonce" };
            lines.push(format!("  Signing:    {mode}"));
        }
        lines.push(format!("  Functions:  {}", r.functions));
        lines.join("\n")
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
