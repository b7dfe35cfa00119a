//! Command dispatch: bridges CLI args -> coordinator calls -> output formatting.

pub mod check;
pub mod config_cmd;
pub mod functions;
pub mod send;
pub mod status;
pub mod watch;

use tuyalink_core::Coordinator;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    coordinator: &Coordinator,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(coordinator, global).await,
        Command::Functions => functions::handle(coordinator, global).await,
        Command::Send(args) => send::handle(coordinator, args, global).await,
        Command::Watch(_) => watch::handle(coordinator, global).await,
        Command::Check => check::handle(coordinator, global).await,
        // Config is handled before dispatch
        Command::Config(_) => unreachable!(),
    }
}
