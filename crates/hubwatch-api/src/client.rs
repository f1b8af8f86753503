// Ajax cloud REST client
//
// Wraps `reqwest::Client` with session handling, user-scoped URL
// construction, and status-code mapping. Every request carries the API
// key; calls after `login()` also carry the session token.

use std::sync::{PoisonError, RwLock};

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, trace};
use url::Url;

use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::models::{
    DeviceRecord, GroupRecord, HubRecord, HubSummary, LoginResponse, VideoEdgeRecord,
};
use crate::sse::{ReconnectConfig, SseHandle};
use crate::transport::TransportConfig;

const API_KEY_HEADER: &str = "X-Api-Key";
const SESSION_HEADER: &str = "X-Session-Token";

/// Arming commands accepted by `PUT .../commands/arming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmingCommand {
    Arm,
    Disarm,
    NightModeOn,
}

impl ArmingCommand {
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Arm => "ARM",
            Self::Disarm => "DISARM",
            Self::NightModeOn => "NIGHT_MODE_ON",
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    token: String,
    user_id: String,
}

/// Raw HTTP client for the Ajax cloud API.
pub struct AjaxClient {
    http: reqwest::Client,
    base_url: Url,
    session: RwLock<Option<Session>>,
}

impl AjaxClient {
    /// Create a client for `base_url` (e.g. `https://api.ajax.systems/api`).
    pub fn new(
        base_url: Url,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client_with_headers(api_key_headers(api_key)?)?;
        Ok(Self {
            http,
            base_url,
            session: RwLock::new(None),
        })
    }

    /// The API root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether `login()` has succeeded.
    pub fn is_logged_in(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The current session token, for the push stream's handshake.
    pub fn session_token(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.token.clone())
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Authenticate with a login and the pre-hashed password.
    pub async fn login(&self, login: &str, password_hash: &SecretString) -> Result<(), Error> {
        let url = self.url("login")?;
        debug!("logging in at {url}");

        let body = json!({
            "login": login,
            "passwordHash": password_hash.expose_secret(),
            "userRole": "USER",
        });
        let resp = self.http.post(url).json(&body).send().await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED
            || resp.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Authentication {
                message: "invalid login or password".into(),
            });
        }

        let login: LoginResponse = parse_response(resp, false).await?;
        info!(user_id = %login.user_id, "session established");
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(Session {
            token: login.session_token,
            user_id: login.user_id,
        });
        Ok(())
    }

    /// Drop the session locally.
    pub fn logout(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn list_hubs(&self) -> Result<Vec<HubSummary>, Error> {
        let url = self.user_url("hubs")?;
        self.get(url, false).await
    }

    pub async fn get_hub(&self, hub_id: &str, bypass_cache: bool) -> Result<HubRecord, Error> {
        let url = self.user_url(&format!("hubs/{hub_id}"))?;
        self.get(url, bypass_cache).await
    }

    pub async fn list_devices(
        &self,
        hub_id: &str,
        bypass_cache: bool,
    ) -> Result<Vec<DeviceRecord>, Error> {
        let mut url = self.user_url(&format!("hubs/{hub_id}/devices"))?;
        url.query_pairs_mut().append_pair("enrich", "true");
        self.get(url, bypass_cache).await
    }

    pub async fn list_groups(
        &self,
        hub_id: &str,
        bypass_cache: bool,
    ) -> Result<Vec<GroupRecord>, Error> {
        let url = self.user_url(&format!("hubs/{hub_id}/groups"))?;
        self.get(url, bypass_cache).await
    }

    pub async fn list_video_edges(
        &self,
        hub_id: &str,
        bypass_cache: bool,
    ) -> Result<Vec<VideoEdgeRecord>, Error> {
        let url = self.user_url(&format!("hubs/{hub_id}/videoEdges"))?;
        self.get(url, bypass_cache).await
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Partially update device settings. `patch` is merged server-side.
    pub async fn update_device(
        &self,
        hub_id: &str,
        device_id: &str,
        patch: &Value,
    ) -> Result<(), Error> {
        let url = self.user_url(&format!("hubs/{hub_id}/devices/{device_id}"))?;
        self.send_json(reqwest::Method::PUT, url, patch).await
    }

    /// Switch a relay, socket or wall switch. `device_type` is the vendor model name.
    pub async fn set_switch_state(
        &self,
        hub_id: &str,
        device_id: &str,
        on: bool,
        device_type: &str,
    ) -> Result<(), Error> {
        let body = json!({
            "command": if on { "SWITCH_ON" } else { "SWITCH_OFF" },
            "deviceType": device_type,
        });
        self.device_command(hub_id, device_id, &body).await
    }

    /// Switch one gang of a multi-gang switch. Channels are 1-based on the wire.
    pub async fn set_channel_state(
        &self,
        hub_id: &str,
        device_id: &str,
        channel: u8,
        on: bool,
        device_type: &str,
    ) -> Result<(), Error> {
        let body = json!({
            "command": if on { "SWITCH_ON" } else { "SWITCH_OFF" },
            "deviceType": device_type,
            "additionalParam": { "channel": channel },
        });
        self.device_command(hub_id, device_id, &body).await
    }

    /// Open or close a WaterStop valve.
    pub async fn set_waterstop_state(
        &self,
        hub_id: &str,
        device_id: &str,
        open: bool,
    ) -> Result<(), Error> {
        let body = json!({
            "command": if open { "SWITCH_ON" } else { "SWITCH_OFF" },
            "deviceType": "WaterStop",
        });
        self.device_command(hub_id, device_id, &body).await
    }

    /// Set a dimmer's first channel to `brightness` percent; `0` switches it off.
    pub async fn set_dimmer_brightness(
        &self,
        hub_id: &str,
        device_id: &str,
        brightness: u8,
        device_type: &str,
    ) -> Result<(), Error> {
        let body = json!({
            "command": if brightness == 0 { "SWITCH_OFF" } else { "SWITCH_ON" },
            "deviceType": device_type,
            "additionalParam": { "channel": 1, "brightness": brightness.min(100) },
        });
        self.device_command(hub_id, device_id, &body).await
    }

    /// Arm, disarm or enter night mode, hub-wide or for one group.
    pub async fn set_arming(
        &self,
        hub_id: &str,
        command: ArmingCommand,
        group_id: Option<&str>,
    ) -> Result<(), Error> {
        let path = match group_id {
            Some(group) => format!("hubs/{hub_id}/groups/{group}/commands/arming"),
            None => format!("hubs/{hub_id}/commands/arming"),
        };
        let url = self.user_url(&path)?;
        let body = json!({ "command": command.as_wire(), "ignoreProblems": true });
        self.send_json(reqwest::Method::PUT, url, &body).await
    }

    async fn device_command(&self, hub_id: &str, device_id: &str, body: &Value) -> Result<(), Error> {
        let url = self.user_url(&format!("hubs/{hub_id}/devices/{device_id}/command"))?;
        self.send_json(reqwest::Method::POST, url, body).await
    }

    // ── Push stream ──────────────────────────────────────────────────

    /// Open the push stream at `url`, authenticated with the API key and the
    /// current session. Uses a separate client without a request timeout.
    pub fn open_event_stream(
        &self,
        url: Url,
        api_key: &SecretString,
        transport: &TransportConfig,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<SseHandle, Error> {
        let session = self.session()?;
        let http = transport
            .streaming()
            .build_client_with_headers(api_key_headers(api_key)?)?;

        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(&session.token).map_err(|e| Error::Authentication {
            message: format!("invalid session token header value: {e}"),
        })?;
        token.set_sensitive(true);
        headers.insert(SESSION_HEADER, token);

        info!(%url, "opening push stream");
        Ok(SseHandle::spawn(http, url, headers, reconnect, cancel))
    }

    // ── URL builders ─────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// `{base}/user/{user_id}/{path}`; requires a session.
    fn user_url(&self, path: &str) -> Result<Url, Error> {
        let user_id = self.session()?.user_id;
        self.url(&format!("user/{user_id}/{path}"))
    }

    fn session(&self) -> Result<Session, Error> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::NotLoggedIn)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url, bypass_cache: bool) -> Result<T, Error> {
        debug!(bypass_cache, "GET {url}");
        let session = self.session()?;
        let mut builder = self.http.get(url).header(SESSION_HEADER, &session.token);
        if bypass_cache {
            builder = builder.header(reqwest::header::CACHE_CONTROL, "no-cache");
        }
        let resp = builder.send().await?;
        parse_response(resp, true).await
    }

    async fn send_json(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<(), Error> {
        debug!("{method} {url}");
        let session = self.session()?;
        let resp = self
            .http
            .request(method, url)
            .header(SESSION_HEADER, &session.token)
            .json(body)
            .send()
            .await?;
        check_status(resp, true).await.map(|_| ())
    }
}

fn api_key_headers(api_key: &SecretString) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    let mut value = HeaderValue::from_str(api_key.expose_secret())
        .map_err(|e| Error::Authentication {
            message: format!("invalid API key header value: {e}"),
        })?;
    value.set_sensitive(true);
    headers.insert(API_KEY_HEADER, value);
    Ok(headers)
}

/// Map non-success statuses onto `Error` variants.
async fn check_status(resp: reqwest::Response, has_session: bool) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(if has_session {
            Error::SessionExpired
        } else {
            Error::Authentication {
                message: "unauthorized".into(),
            }
        });
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        return Err(Error::RateLimited { retry_after_secs });
    }

    let body = resp.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        message: preview(&body).to_owned(),
    })
}

async fn parse_response<T: DeserializeOwned>(
    resp: reqwest::Response,
    has_session: bool,
) -> Result<T, Error> {
    let resp = check_status(resp, has_session).await?;
    let body = resp.text().await?;
    trace!(len = body.len(), "response body");

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body: body.clone(),
    })
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
