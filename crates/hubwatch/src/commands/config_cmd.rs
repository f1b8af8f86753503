//! Config subcommand handlers.

use std::fmt::Write as _;
use std::io::BufRead;

use hubwatch_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(
        out,
        "refresh_interval_secs = {}",
        cfg.defaults.refresh_interval_secs
    );

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "api_url = \"{}\"", p.api_url);
        if let Some(ref sse) = p.sse_url {
            let _ = writeln!(out, "sse_url = \"{sse}\"");
        }
        if let Some(ref login) = p.login {
            let _ = writeln!(out, "login = \"{login}\"");
        }
        if p.password_hash.is_some() {
            let _ = writeln!(out, "password_hash = \"****\"");
        }
        if p.api_key.is_some() {
            let _ = writeln!(out, "api_key = \"****\"");
        }
        if let Some(ref env) = p.api_key_env {
            let _ = writeln!(out, "api_key_env = \"{env}\"");
        }
        if !p.hubs.is_empty() {
            let hubs: Vec<String> = p.hubs.iter().map(|h| format!("\"{h}\"")).collect();
            let _ = writeln!(out, "hubs = [{}]", hubs.join(", "));
        }
        if let Some(secs) = p.refresh_interval_secs {
            let _ = writeln!(out, "refresh_interval_secs = {secs}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(ref user) = p.rtsp_username {
            let _ = writeln!(out, "rtsp_username = \"{user}\"");
        }
        if p.rtsp_password.is_some() {
            let _ = writeln!(out, "rtsp_password = \"****\"");
        }
    }

    out
}

fn read_secret_from_stdin() -> Result<String, CliError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = hubwatch_config::load_config()?;
            output::print_output(format_config_redacted(&cfg).trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(
                &hubwatch_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = hubwatch_config::load_config()?;
            // Fails with the list of known profiles
            cfg.profile(Some(name.as_str()))?;
            cfg.default_profile = Some(name.clone());
            hubwatch_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::SetSecret { kind, value } => {
            let cfg = hubwatch_config::load_config()?;
            let profile = global
                .profile
                .clone()
                .or_else(|| cfg.default_profile.clone())
                .unwrap_or_else(|| "default".into());

            let secret = match value {
                Some(v) => v,
                None => read_secret_from_stdin()?,
            };
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "secret".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            hubwatch_config::store_secret(&profile, kind.keyring_key(), &secret)?;
            if !global.quiet {
                eprintln!("Stored {} for profile '{profile}'", kind.keyring_key());
            }
            Ok(())
        }
    }
}
