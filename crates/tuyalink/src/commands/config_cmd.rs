//! Config command: profile setup, redacted view, keyring secret storage.

use std::io::BufRead;

use secrecy::SecretString;
use serde::Serialize;
use tuyalink_config::Profile;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, InitArgs};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

/// A profile as shown to the user, secrets replaced.
#[derive(Serialize)]
struct ProfileView<'a> {
    name: &'a str,
    #[serde(flatten)]
    profile: Profile,
}

fn redact(profile: &Profile) -> Profile {
    let mut profile = profile.clone();
    if profile.access_secret.is_some() {
        profile.access_secret = Some(REDACTED.into());
    }
    profile
}

fn secret_source(profile: &Profile) -> String {
    match (&profile.access_secret_env, &profile.access_secret) {
        (Some(var), _) => format!("env ${var}"),
        (None, Some(_)) => format!("config file ({REDACTED})"),
        (None, None) => "keyring".into(),
    }
}

fn detail(view: &ProfileView<'_>) -> String {
    let p = &view.profile;
    let mut lines = vec![
        format!("Profile:      {}", view.name),
        format!("  Region:     {}", p.region),
        format!("  Access id:  {}", p.access_id),
        format!("  Secret:     {}", secret_source(p)),
        format!("  Device:     {}", p.device_id),
    ];
    if let Some(secs) = p.poll_seconds {
        lines.push(format!("  Poll:       {secs}s"));
    }
    if let Some(secs) = p.timeout {
        lines.push(format!("  Timeout:    {secs}s"));
    }
    if let Some(ref path) = p.ca_cert {
        lines.push(format!("  CA cert:    {}", path.display()));
    }
    if let Some(ref points) = p.data_points {
        lines.push(format!("  Data points: {}", points.join(", ")));
    }
    lines.join("\n")
}

fn init_profile(args: InitArgs, global: &GlobalOpts) -> Profile {
    Profile {
        region: global.region.clone().unwrap_or_else(|| "auto".into()),
        access_id: args.access_id,
        access_secret: None,
        access_secret_env: args.access_secret_env,
        device_id: global.device.clone().unwrap_or_default(),
        poll_seconds: None,
        timeout: global.timeout,
        ca_cert: None,
        data_points: None,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = tuyalink_config::config_path();
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init(args) => {
            let mut cfg = tuyalink_config::load_config()?;
            let name = global.profile.clone().unwrap_or_else(|| "default".into());
            let make_default = args.default || cfg.profiles.is_empty();

            let profile = init_profile(args, global);
            tuyalink_config::validate_profile(&profile)?;
            let needs_secret = profile.access_secret_env.is_none();

            cfg.profiles.insert(name.clone(), profile);
            if make_default {
                cfg.default_profile = Some(name.clone());
            }
            tuyalink_config::save_config(&cfg)?;

            if !global.quiet {
                eprintln!(
                    "Profile '{name}' written to {}",
                    tuyalink_config::config_path().display()
                );
                if needs_secret {
                    eprintln!("Store its access secret with: tuyalink config set-secret -p {name}");
                }
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = tuyalink_config::load_config()?;
            if cfg.profiles.is_empty() {
                return Err(CliError::NoConfig {
                    path: tuyalink_config::config_path().display().to_string(),
                });
            }
            let name = tuyalink_config::active_profile_name(global.profile.as_deref(), &cfg);
            let profile = tuyalink_config::find_profile(&cfg, &name)?;
            let view = ProfileView {
                name: &name,
                profile: redact(profile),
            };
            let out = output::render_single(&global.output, &view, detail);
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = tuyalink_config::load_config()?;
            tuyalink_config::find_profile(&cfg, &name)?;
            cfg.default_profile = Some(name.clone());
            tuyalink_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::SetSecret => {
            let cfg = tuyalink_config::load_config()?;
            let name = tuyalink_config::active_profile_name(global.profile.as_deref(), &cfg);

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            let secret = line.trim();
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "access secret".into(),
                    reason: "nothing was read from stdin".into(),
                });
            }

            tuyalink_config::store_access_secret(&name, &SecretString::from(secret.to_owned()))?;
            if !global.quiet {
                eprintln!("Access secret stored in the keyring for profile '{name}'");
            }
            Ok(())
        }
    }
}
