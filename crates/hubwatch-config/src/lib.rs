//! Configuration for hubwatch.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `hubwatch_core::{CloudConfig, ControllerConfig}`. The
//! CLI layers its flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use hubwatch_core::camera::RtspCredentials;
use hubwatch_core::{CloudConfig, ControllerConfig, TlsVerification};

const KEYRING_SERVICE: &str = "hubwatch";
pub const DEFAULT_API_URL: &str = "https://api.ajax.systems/api";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("no {what} configured for profile '{profile}'")]
    NoCredentials { profile: String, what: &'static str },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// The named profile, or the default one.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name, p))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_refresh_interval() -> u64 {
    60
}
fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

/// A named cloud account profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Push endpoint. Absent disables the event stream.
    pub sse_url: Option<String>,

    pub login: Option<String>,

    /// Password hash (plaintext -- prefer keyring or env var).
    pub password_hash: Option<String>,

    /// API key (plaintext -- prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Hub ids to mirror. Empty mirrors every hub on the account.
    #[serde(default)]
    pub hubs: Vec<String>,

    pub refresh_interval_secs: Option<u64>,
    pub timeout: Option<u64>,
    pub insecure: Option<bool>,
    pub ca_cert: Option<PathBuf>,

    pub rtsp_username: Option<String>,
    pub rtsp_password: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("systems", "hubwatch", "hubwatch").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("hubwatch");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing is fine) with `HUBWATCH_` env overrides,
/// e.g. `HUBWATCH_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HUBWATCH_").split("__"))
        .extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str, what: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/{what}"),
    )?)
}

/// Env var, then system keyring, then plaintext.
fn resolve_secret(
    env_name: Option<&str>,
    profile_name: &str,
    keyring_key: &str,
    plaintext: Option<&String>,
) -> Option<SecretString> {
    if let Some(env_name) = env_name {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }
    if let Ok(entry) = keyring_entry(profile_name, keyring_key) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }
    plaintext.map(|s| SecretString::from(s.clone()))
}

pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    let env_name = profile.api_key_env.as_deref().unwrap_or("HUBWATCH_API_KEY");
    resolve_secret(Some(env_name), profile_name, "api-key", profile.api_key.as_ref()).ok_or_else(
        || ConfigError::NoCredentials {
            profile: profile_name.into(),
            what: "API key",
        },
    )
}

pub fn resolve_login(
    profile: &Profile,
    profile_name: &str,
) -> Result<(String, SecretString), ConfigError> {
    let login = profile
        .login
        .clone()
        .or_else(|| std::env::var("HUBWATCH_LOGIN").ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
            what: "login",
        })?;
    let hash = resolve_secret(
        Some("HUBWATCH_PASSWORD_HASH"),
        profile_name,
        "password-hash",
        profile.password_hash.as_ref(),
    )
    .ok_or_else(|| ConfigError::NoCredentials {
        profile: profile_name.into(),
        what: "password hash",
    })?;
    Ok((login, hash))
}

/// Store a secret (`api-key`, `password-hash`, `rtsp-password`) in the
/// system keyring.
pub fn store_secret(profile_name: &str, what: &str, secret: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name, what)?.set_password(secret)?;
    Ok(())
}

/// RTSP credentials, when a username is configured.
pub fn rtsp_credentials(profile: &Profile, profile_name: &str) -> Option<RtspCredentials> {
    let username = profile.rtsp_username.clone()?;
    let password = resolve_secret(
        Some("HUBWATCH_RTSP_PASSWORD"),
        profile_name,
        "rtsp-password",
        profile.rtsp_password.as_ref(),
    )
    .unwrap_or_else(|| SecretString::from(String::new()));
    Some(RtspCredentials { username, password })
}

// ── Translation to core config ──────────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Build a `CloudConfig` from a profile, resolving credentials.
pub fn profile_to_cloud_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<CloudConfig, ConfigError> {
    let api_url = parse_url("api_url", &profile.api_url)?;
    let sse_url = profile
        .sse_url
        .as_deref()
        .map(|raw| parse_url("sse_url", raw))
        .transpose()?;

    let api_key = resolve_api_key(profile, profile_name)?;
    let (login, password_hash) = resolve_login(profile, profile_name)?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(CloudConfig {
        api_url,
        sse_url,
        api_key,
        login,
        password_hash,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        hubs: profile.hubs.clone(),
    })
}

/// Controller pacing for a profile. Timings other than the refresh
/// interval keep their built-in values.
pub fn profile_to_controller_config(profile: &Profile, defaults: &Defaults) -> ControllerConfig {
    ControllerConfig {
        refresh_interval_secs: profile
            .refresh_interval_secs
            .unwrap_or(defaults.refresh_interval_secs),
        ..ControllerConfig::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "home"

[defaults]
timeout = 15

[profiles.home]
login = "owner@example.com"
password_hash = "5f4dcc3b5aa765d61d8327deb882cf99"
api_key = "plain-key"
sse_url = "https://events.example.com/stream"
hubs = ["0001A2B3"]
refresh_interval_secs = 120

[profiles.cabin]
api_url = "not a url"
"#;

    fn sample() -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        load_config_from(&path).unwrap()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.timeout, 30);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn profile_selection() {
        let cfg = sample();
        assert_eq!(cfg.profile(None).unwrap().0, "home");
        assert_eq!(cfg.profile(Some("cabin")).unwrap().0, "cabin");
        assert!(matches!(
            cfg.profile(Some("boat")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn cloud_config_from_profile() {
        let cfg = sample();
        let (name, profile) = cfg.profile(None).unwrap();
        let cloud = profile_to_cloud_config(profile, name, &cfg.defaults).unwrap();

        assert_eq!(cloud.api_url.as_str(), DEFAULT_API_URL);
        assert_eq!(
            cloud.sse_url.as_ref().map(url::Url::as_str),
            Some("https://events.example.com/stream")
        );
        assert_eq!(cloud.login, "owner@example.com");
        assert_eq!(cloud.hubs, vec!["0001A2B3".to_owned()]);
        assert_eq!(cloud.timeout, Duration::from_secs(15));
        assert_eq!(cloud.tls, TlsVerification::SystemDefaults);
        assert!(!cloud.api_key.expose_secret().is_empty());
    }

    #[test]
    fn invalid_url_is_a_validation_error() {
        let cfg = sample();
        let (name, profile) = cfg.profile(Some("cabin")).unwrap();
        let err = profile_to_cloud_config(profile, name, &cfg.defaults).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "api_url"));
    }

    #[test]
    fn controller_config_uses_profile_interval() {
        let cfg = sample();
        let (_, home) = cfg.profile(None).unwrap();
        assert_eq!(
            profile_to_controller_config(home, &cfg.defaults).refresh_interval_secs,
            120
        );
        let (_, cabin) = cfg.profile(Some("cabin")).unwrap();
        let controller = profile_to_controller_config(cabin, &cfg.defaults);
        assert_eq!(controller.refresh_interval_secs, 60);
        assert_eq!(controller.doorbell_reset, Duration::from_secs(10));
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                api_url: DEFAULT_API_URL.into(),
                login: Some("me".into()),
                hubs: vec!["H1".into(), "H2".into()],
                ..Profile::default()
            },
        );

        save_config_to(&path, &cfg).unwrap();
        let loaded = load_config_from(&path).unwrap();
        let (_, profile) = loaded.profile(None).unwrap();
        assert_eq!(profile.login.as_deref(), Some("me"));
        assert_eq!(profile.hubs, vec!["H1".to_owned(), "H2".to_owned()]);
    }
}
