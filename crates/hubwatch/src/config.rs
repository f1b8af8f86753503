//! Profile resolution with CLI flag overrides layered on top.
//!
//! Core never sees profiles -- it receives pre-built `CloudConfig` and
//! `ControllerConfig` values.

use std::time::Duration;

use hubwatch_config::Config;
use hubwatch_core::camera::RtspCredentials;
use hubwatch_core::{CloudConfig, ControllerConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a connected command needs.
pub struct Session {
    pub profile_name: String,
    pub cloud: CloudConfig,
    pub controller: ControllerConfig,
    pub rtsp: Option<RtspCredentials>,
}

/// Load the config file and resolve the active profile.
pub fn resolve_session(global: &GlobalOpts) -> Result<Session, CliError> {
    let cfg = hubwatch_config::load_config()?;
    session_from(&cfg, global)
}

fn session_from(cfg: &Config, global: &GlobalOpts) -> Result<Session, CliError> {
    let (name, profile) = cfg.profile(global.profile.as_deref())?;
    let mut cloud = hubwatch_config::profile_to_cloud_config(profile, name, &cfg.defaults)?;

    if global.insecure {
        cloud.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        cloud.timeout = Duration::from_secs(secs);
    }

    tracing::debug!(profile = name, api_url = %cloud.api_url, "resolved profile");
    Ok(Session {
        profile_name: name.to_owned(),
        controller: hubwatch_config::profile_to_controller_config(profile, &cfg.defaults),
        rtsp: hubwatch_config::rtsp_credentials(profile, name),
        cloud,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn config() -> Config {
        toml::from_str(
            r#"
default_profile = "home"

[profiles.home]
login = "owner@example.com"
password_hash = "5f4dcc3b5aa765d61d8327deb882cf99"
api_key = "plain-key"
timeout = 20
"#,
        )
        .unwrap()
    }

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["hubwatch"];
        argv.extend_from_slice(args);
        argv.push("status");
        Cli::try_parse_from(argv).unwrap().global
    }

    #[test]
    fn flags_override_profile() {
        let session = session_from(&config(), &global(&["-k", "--timeout", "5"])).unwrap();
        assert_eq!(session.profile_name, "home");
        assert_eq!(session.cloud.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(session.cloud.timeout, Duration::from_secs(5));
    }

    #[test]
    fn profile_values_apply_without_flags() {
        let session = session_from(&config(), &global(&[])).unwrap();
        assert_eq!(session.cloud.tls, TlsVerification::SystemDefaults);
        assert_eq!(session.cloud.timeout, Duration::from_secs(20));
        assert!(session.rtsp.is_none());
    }

    #[test]
    fn unknown_profile_is_not_found() {
        let err = session_from(&config(), &global(&["-p", "cabin"]))
            .err()
            .unwrap();
        assert!(matches!(err, CliError::ProfileNotFound { .. }));
    }
}
