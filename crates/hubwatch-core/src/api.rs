// ── Cloud API seam ──
//
// The controller talks to the vendor cloud through `HubApi`, so the event
// and write paths can run against a scripted implementation in tests.
// `CloudApi` is the real one, backed by `hubwatch_api::AjaxClient`.

use std::future::Future;

use futures_util::future::{try_join, try_join_all};
use hubwatch_api::transport::{TlsMode, TransportConfig};
use hubwatch_api::{AjaxClient, ReconnectConfig, SseHandle};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::SecurityMode;
use crate::config::{CloudConfig, TlsVerification};
use crate::convert::space_from_records;
use crate::error::CoreError;
use crate::model::Space;

/// Everything the controller needs from the cloud.
pub trait HubApi: Send + Sync + 'static {
    /// Poll every mirrored hub. `bypass_cache` asks the server for fresh data.
    fn fetch_spaces(
        &self,
        bypass_cache: bool,
    ) -> impl Future<Output = Result<Vec<Space>, CoreError>> + Send;

    /// Partial settings update, merged server-side.
    fn update_device(
        &self,
        hub_id: &str,
        device_id: &str,
        patch: &Value,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn set_switch_state(
        &self,
        hub_id: &str,
        device_id: &str,
        on: bool,
        raw_type: &str,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn set_channel_state(
        &self,
        hub_id: &str,
        device_id: &str,
        channel: u8,
        on: bool,
        raw_type: &str,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn set_valve_state(
        &self,
        hub_id: &str,
        device_id: &str,
        open: bool,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Dimmer level in percent; `0` switches the light off.
    fn set_brightness(
        &self,
        hub_id: &str,
        device_id: &str,
        brightness: u8,
        raw_type: &str,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Arm, disarm or night mode, hub-wide or for one group.
    fn set_security_mode(
        &self,
        hub_id: &str,
        mode: SecurityMode,
        group_id: Option<&str>,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

// ── CloudApi ─────────────────────────────────────────────────────────

/// `HubApi` over the vendor REST API.
pub struct CloudApi {
    client: AjaxClient,
    config: CloudConfig,
}

impl CloudApi {
    /// Build the client and log in.
    pub async fn connect(config: CloudConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let client = AjaxClient::new(config.api_url.clone(), &config.api_key, &transport)?;
        client.login(&config.login, &config.password_hash).await?;
        info!(login = %config.login, "logged in to cloud API");
        Ok(Self { client, config })
    }

    /// Open the push stream, if one is configured.
    pub fn open_event_stream(
        &self,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<Option<SseHandle>, CoreError> {
        let Some(url) = self.config.sse_url.clone() else {
            debug!("no push endpoint configured, relying on polling");
            return Ok(None);
        };
        let transport = build_transport(&self.config);
        let handle = self.client.open_event_stream(
            url,
            &self.config.api_key,
            &transport,
            reconnect,
            cancel,
        )?;
        Ok(Some(handle))
    }

    pub fn logout(&self) {
        self.client.logout();
    }

    fn mirrors(&self, hub_id: &str) -> bool {
        self.config.hubs.is_empty() || self.config.hubs.iter().any(|h| h == hub_id)
    }

    async fn fetch_space(&self, hub_id: &str, bypass_cache: bool) -> Result<Space, CoreError> {
        let client = &self.client;
        let hub = client.get_hub(hub_id, bypass_cache).await?;
        let (devices, groups) = try_join(
            client.list_devices(hub_id, bypass_cache),
            client.list_groups(hub_id, bypass_cache),
        )
        .await?;

        // Video edges are optional; many accounts have none and some
        // hubs answer 404.
        let video_edges = match client.list_video_edges(hub_id, bypass_cache).await {
            Ok(edges) => edges,
            Err(ref e) if e.is_not_found() => {
                debug!(hub_id, "video edges not available (404), treating as empty");
                Vec::new()
            }
            Err(e) => {
                warn!(hub_id, error = %e, "video edge fetch failed, treating as empty");
                Vec::new()
            }
        };

        Ok(space_from_records(hub, devices, groups, video_edges))
    }
}

impl HubApi for CloudApi {
    async fn fetch_spaces(&self, bypass_cache: bool) -> Result<Vec<Space>, CoreError> {
        let hubs = self.client.list_hubs().await?;
        let wanted: Vec<String> = hubs
            .into_iter()
            .map(|h| h.hub_id)
            .filter(|id| self.mirrors(id))
            .collect();
        debug!(count = wanted.len(), bypass_cache, "polling hubs");

        try_join_all(wanted.iter().map(|id| self.fetch_space(id, bypass_cache))).await
    }

    async fn update_device(
        &self,
        hub_id: &str,
        device_id: &str,
        patch: &Value,
    ) -> Result<(), CoreError> {
        Ok(self.client.update_device(hub_id, device_id, patch).await?)
    }

    async fn set_switch_state(
        &self,
        hub_id: &str,
        device_id: &str,
        on: bool,
        raw_type: &str,
    ) -> Result<(), CoreError> {
        Ok(self
            .client
            .set_switch_state(hub_id, device_id, on, raw_type)
            .await?)
    }

    async fn set_channel_state(
        &self,
        hub_id: &str,
        device_id: &str,
        channel: u8,
        on: bool,
        raw_type: &str,
    ) -> Result<(), CoreError> {
        Ok(self
            .client
            .set_channel_state(hub_id, device_id, channel, on, raw_type)
            .await?)
    }

    async fn set_valve_state(
        &self,
        hub_id: &str,
        device_id: &str,
        open: bool,
    ) -> Result<(), CoreError> {
        Ok(self
            .client
            .set_waterstop_state(hub_id, device_id, open)
            .await?)
    }

    async fn set_brightness(
        &self,
        hub_id: &str,
        device_id: &str,
        brightness: u8,
        raw_type: &str,
    ) -> Result<(), CoreError> {
        Ok(self
            .client
            .set_dimmer_brightness(hub_id, device_id, brightness, raw_type)
            .await?)
    }

    async fn set_security_mode(
        &self,
        hub_id: &str,
        mode: SecurityMode,
        group_id: Option<&str>,
    ) -> Result<(), CoreError> {
        Ok(self
            .client
            .set_arming(hub_id, mode.as_arming(), group_id)
            .await?)
    }
}

/// Build a [`TransportConfig`] from the cloud configuration.
fn build_transport(config: &CloudConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: Some(config.timeout),
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
