// ── Runtime configuration ──
//
// These types describe how to reach the cloud and how the controller
// paces its background work. They never touch disk; hubwatch-config
// builds them from profiles and hands them in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-hosted event proxies with self-signed certs).
    DangerAcceptInvalid,
}

/// Credentials and endpoints for the vendor cloud.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// REST API root, e.g. `https://api.ajax.systems/api`.
    pub api_url: Url,
    /// Push endpoint. `None` disables the event stream.
    pub sse_url: Option<Url>,
    pub api_key: SecretString,
    pub login: String,
    /// Password hash as expected by the login endpoint.
    pub password_hash: SecretString,
    pub tls: TlsVerification,
    pub timeout: Duration,
    /// Hubs to mirror. Empty means every hub bound to the account.
    pub hubs: Vec<String>,
}

/// Pacing of the controller's background work.
///
/// Defaults mirror the vendor app's observed behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Full refresh period in seconds. 0 disables periodic refresh.
    pub refresh_interval_secs: u64,
    /// Identical events inside this window are dropped.
    pub dedup_window: Duration,
    /// How often stale dedup keys are swept, and how old they must be.
    pub dedup_sweep_interval: Duration,
    pub doorbell_reset: Duration,
    pub video_reset: Duration,
    /// Delay before the metadata refresh that follows an arm/disarm event.
    pub security_refresh_delay: Duration,
    /// A pushed security state survives polls for this long.
    pub state_protection: Duration,
    /// Security events this soon after a local arm/disarm are attributed to `local`.
    pub local_action_window: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
            dedup_window: Duration::from_secs(5),
            dedup_sweep_interval: Duration::from_secs(60),
            doorbell_reset: Duration::from_secs(10),
            video_reset: Duration::from_secs(30),
            security_refresh_delay: Duration::from_millis(300),
            state_protection: Duration::from_secs(5),
            local_action_window: Duration::from_secs(10),
        }
    }
}
