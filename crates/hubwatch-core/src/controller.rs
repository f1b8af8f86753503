// ── Controller ──
//
// Lifecycle of one cloud account mirror: initial poll, periodic refresh,
// push event ingestion, auto-reset timers and the command processor.
// Consumers read the store and subscribe to notifications; every write
// goes through `execute`.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::HubApi;
use crate::command::{
    self, Command, CommandEnvelope, CommandResult, SecurityMode, WritePlan, WriteRequest,
};
use crate::config::ControllerConfig;
use crate::dedup::Deduplicator;
use crate::error::CoreError;
use crate::event::{EventClass, PushEvent, classify};
use crate::model::Space;
use crate::notify::{Notification, Notifier};
use crate::reconcile::{self, ApplyContext, Followup};
use crate::store::{DataStore, RefreshReport};
use crate::stream::EntityStream;
use crate::timers::{TimerKey, TimerRegistry};

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── ConnectionState ──────────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// How a refresh treats caches and notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Ask the cloud for fresh data instead of its cached view.
    pub bypass_cache: bool,
    /// Do not announce security changes found by this poll.
    pub suppress_state_events: bool,
}

impl RefreshOptions {
    /// The refresh that follows an arm/disarm event.
    pub fn metadata() -> Self {
        Self {
            bypass_cache: true,
            suppress_state_events: true,
        }
    }
}

/// What `ingest` did with a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    Applied,
    Duplicate,
    Malformed,
    Unhandled,
    UnknownHub,
}

// ── Controller ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable. Generic over the cloud seam so tests can drive the
/// full event and write paths without a network.
pub struct Controller<A: HubApi> {
    inner: Arc<ControllerInner<A>>,
}

impl<A: HubApi> Clone for Controller<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<A> {
    config: ControllerConfig,
    api: A,
    store: Arc<DataStore>,
    notifier: Notifier,
    timers: TimerRegistry,
    dedup: std::sync::Mutex<Deduplicator>,
    /// hub id → when a security command was last sent from here.
    local_actions: DashMap<String, Instant>,
    connection_state: watch::Sender<ConnectionState>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<A: HubApi> Controller<A> {
    /// Create a controller. Does not poll -- call [`start()`](Self::start).
    pub fn new(api: A, config: ControllerConfig) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let dedup = Deduplicator::new(config.dedup_window);

        Self {
            inner: Arc::new(ControllerInner {
                config,
                api,
                store: Arc::new(DataStore::new()),
                notifier: Notifier::default(),
                timers: TimerRegistry::new(),
                dedup: std::sync::Mutex::new(dedup),
                local_actions: DashMap::new(),
                connection_state,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn api(&self) -> &A {
        &self.inner.api
    }

    /// Access the underlying DataStore.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    /// Pending auto-reset timers.
    pub fn timers(&self) -> &TimerRegistry {
        &self.inner.timers
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Poll once, then spawn the command processor, periodic refresh and
    /// dedup sweep.
    pub async fn start(&self) -> Result<(), CoreError> {
        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        if let Err(e) = self.full_refresh(RefreshOptions::default()).await {
            self.inner.connection_state.send_replace(ConnectionState::Failed);
            return Err(e);
        }

        let cancel = self.inner.cancel.clone();
        let mut handles = self.inner.task_handles.lock().await;

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let ctrl = self.clone();
            handles.push(tokio::spawn(command_processor_task(ctrl, rx, cancel.clone())));
        }

        let interval_secs = self.inner.config.refresh_interval_secs;
        if interval_secs > 0 {
            let ctrl = self.clone();
            handles.push(tokio::spawn(refresh_task(ctrl, interval_secs, cancel.clone())));
        }

        let ctrl = self.clone();
        handles.push(tokio::spawn(dedup_sweep_task(ctrl, cancel)));

        self.inner
            .connection_state
            .send_replace(ConnectionState::Connected);
        info!(
            spaces = self.inner.store.space_count(),
            refresh_interval_secs = interval_secs,
            "controller started"
        );
        Ok(())
    }

    /// Consume a push payload stream until it closes or the controller
    /// shuts down.
    pub async fn attach_stream(&self, rx: broadcast::Receiver<Arc<Value>>) {
        let ctrl = self.clone();
        let cancel = self.inner.cancel.clone();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(ingest_task(ctrl, rx, cancel)));
    }

    /// Stop background work and cancel pending timers.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let cancelled = self.inner.timers.cancel_all();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!(cancelled_timers = cancelled, "controller stopped");
    }

    /// One-shot: start, run closure, shut down.
    ///
    /// Periodic refresh is disabled since only one request-response cycle
    /// is needed.
    pub async fn oneshot<F, Fut, T>(api: A, config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller<A>) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.refresh_interval_secs = 0;

        let controller = Controller::new(api, cfg);
        controller.start().await?;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.inner.notifier.subscribe()
    }

    pub fn spaces(&self) -> EntityStream<Space> {
        self.inner.store.subscribe_spaces()
    }

    pub fn spaces_snapshot(&self) -> Arc<Vec<Arc<Space>>> {
        self.inner.store.spaces_snapshot()
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Poll every hub and merge the result into the store.
    pub async fn full_refresh(&self, options: RefreshOptions) -> Result<RefreshReport, CoreError> {
        let spaces = self.inner.api.fetch_spaces(options.bypass_cache).await?;
        let report = self.inner.store.apply_refresh(spaces);
        self.cancel_timers_for(&report);

        if !options.suppress_state_events {
            for change in &report.security_changes {
                self.inner.notifier.send(Notification::SecurityChanged {
                    space_id: change.space_id.clone(),
                    space_name: change.space_name.clone(),
                    action: change.new,
                    source_name: None,
                });
            }
        }
        for space in self.inner.store.spaces_snapshot().iter() {
            self.notify_updated(&space.id);
        }

        debug!(
            added = report.added_spaces.len(),
            removed = report.removed_spaces.len(),
            security_changes = report.security_changes.len(),
            bypass_cache = options.bypass_cache,
            "refresh applied"
        );
        Ok(report)
    }

    fn cancel_timers_for(&self, report: &RefreshReport) {
        let timers = &self.inner.timers;
        let mut cancelled = 0;
        for space_id in &report.removed_spaces {
            cancelled += timers.cancel_where(|k| k.space_id == *space_id);
        }
        for (space_id, entity_id) in report
            .removed_devices
            .iter()
            .chain(&report.removed_video_edges)
        {
            cancelled += timers.cancel_where(|k| k.targets(space_id, entity_id));
        }
        if cancelled > 0 {
            debug!(cancelled, "reset timers cancelled for removed entities");
        }
    }

    /// Refresh in the background after `delay`. Failures are logged.
    fn spawn_refresh(&self, options: RefreshOptions, delay: Duration) {
        let ctrl = self.clone();
        let cancel = self.inner.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    if let Err(e) = ctrl.full_refresh(options).await {
                        error!(error = %e, ?options, "background refresh failed");
                    }
                }
            }
        });
    }

    // ── Event ingestion ──────────────────────────────────────────────

    /// Run one push payload through parse, dedup, classify and reconcile.
    pub fn ingest(&self, payload: &Value) -> Ingested {
        let event = match PushEvent::from_payload(payload) {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "ignoring malformed push payload");
                return Ingested::Malformed;
            }
        };

        let fresh = self
            .inner
            .dedup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .should_process(
                &event.source_id,
                &event.tag,
                event.transition_label(),
                event.group_id.as_deref(),
            );
        if !fresh {
            return Ingested::Duplicate;
        }

        let class = classify(&event.tag, event.transition, &event.event_type_v2);
        if class == EventClass::Unhandled {
            warn!(tag = %event.tag, %payload, "unhandled event tag");
            return Ingested::Unhandled;
        }

        let store = &self.inner.store;
        let Some(space_id) = store.space_id_for_hub(&event.hub_id) else {
            warn!(hub_id = %event.hub_id, tag = %event.tag, "event for unknown hub dropped");
            return Ingested::UnknownHub;
        };

        let ctx = ApplyContext {
            now: Utc::now(),
            local_action: matches!(class, EventClass::Security { .. })
                && self.is_local_action(&event.hub_id),
        };
        let Some(outcome) =
            store.update_space(&space_id, |space| reconcile::apply(space, &event, class, &ctx))
        else {
            return Ingested::UnknownHub;
        };
        store.mark_push_event();

        if outcome.security_set {
            store.protect_security_state(&space_id, self.inner.config.state_protection);
        }
        for notification in outcome.notifications {
            self.inner.notifier.send(notification);
        }
        if outcome.mutated {
            self.notify_updated(&space_id);
        }
        for followup in outcome.followups {
            self.schedule_followup(&space_id, followup);
        }
        Ingested::Applied
    }

    /// `ingest`, with panics contained so the stream keeps flowing.
    fn ingest_guarded(&self, payload: &Value) {
        if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| self.ingest(payload))) {
            let reason = panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            error!(%payload, reason, "event processing failed");
        }
    }

    fn schedule_followup(&self, space_id: &str, followup: Followup) {
        let config = &self.inner.config;
        match followup {
            Followup::RefreshMetadata => {
                self.spawn_refresh(RefreshOptions::metadata(), config.security_refresh_delay);
            }
            Followup::ResetDoorbell { device_id } => {
                let key = TimerKey::doorbell(space_id, &device_id);
                let reset = reset_action(&self.inner, space_id, move |space| {
                    reconcile::reset_doorbell(space, &device_id)
                });
                self.inner.timers.schedule(key, config.doorbell_reset, reset);
            }
            Followup::ResetVideoDetection {
                edge_id,
                channel_id,
                detection_type,
            } => {
                let key =
                    TimerKey::video(space_id, &edge_id, channel_id.as_deref(), &detection_type);
                let reset = reset_action(&self.inner, space_id, move |space| {
                    reconcile::reset_video_detection(
                        space,
                        &edge_id,
                        channel_id.as_deref(),
                        &detection_type,
                    )
                });
                self.inner.timers.schedule(key, config.video_reset, reset);
            }
        }
    }

    fn is_local_action(&self, hub_id: &str) -> bool {
        self.inner
            .local_actions
            .get(hub_id)
            .is_some_and(|at| at.elapsed() < self.inner.config.local_action_window)
    }

    fn notify_updated(&self, space_id: &str) {
        self.inner.notifier.send(Notification::StateUpdated {
            space_id: space_id.to_owned(),
        });
    }

    // ── Command execution ────────────────────────────────────────────

    /// Execute a command through the command processor and await the result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if *self.inner.connection_state.borrow() != ConnectionState::Connected {
            return Err(CoreError::ControllerStopped);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerStopped)?;

        rx.await.map_err(|_| CoreError::ControllerStopped)?
    }
}

/// Timer callback: apply `reset` and announce it. A space that no longer
/// exists is a no-op.
fn reset_action<A, F>(inner: &ControllerInner<A>, space_id: &str, reset: F) -> Box<dyn FnOnce() + Send>
where
    F: FnOnce(&mut Space) -> bool + Send + 'static,
{
    let store = Arc::clone(&inner.store);
    let notifier = inner.notifier.clone();
    let space_id = space_id.to_owned();
    Box::new(move || {
        if store.update_space(&space_id, reset) == Some(true) {
            notifier.send(Notification::StateUpdated { space_id });
        }
    })
}

// ── Background tasks ─────────────────────────────────────────────────

/// Periodically refresh data from the cloud.
async fn refresh_task<A: HubApi>(controller: Controller<A>, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = controller.full_refresh(RefreshOptions::default()).await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

/// Forget dedup keys older than the sweep interval.
async fn dedup_sweep_task<A: HubApi>(controller: Controller<A>, cancel: CancellationToken) {
    let period = controller.inner.config.dedup_sweep_interval;
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let dropped = controller
                    .inner
                    .dedup
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .sweep(period);
                if dropped > 0 {
                    debug!(dropped, "dedup keys swept");
                }
            }
        }
    }
}

async fn ingest_task<A: HubApi>(
    controller: Controller<A>,
    mut rx: broadcast::Receiver<Arc<Value>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            payload = rx.recv() => match payload {
                Ok(payload) => controller.ingest_guarded(&payload),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event consumer lagged, payloads dropped");
                }
                Err(RecvError::Closed) => {
                    debug!("push stream closed");
                    break;
                }
            }
        }
    }
}

/// Process commands from the mpsc channel one at a time.
async fn command_processor_task<A: HubApi>(
    controller: Controller<A>,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&controller, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────────

async fn route_command<A: HubApi>(
    controller: &Controller<A>,
    cmd: Command,
) -> Result<CommandResult, CoreError> {
    let space = controller
        .inner
        .store
        .find_space(cmd.space_id())
        .ok_or_else(|| CoreError::SpaceNotFound {
            identifier: cmd.space_id().to_owned(),
        })?;

    match cmd {
        Command::SetSecurityMode { mode, group_id, .. } => {
            set_security_mode(controller, &space, mode, group_id.as_deref()).await
        }
        other => {
            let plan = command::plan(&space, &other)?;
            write_device(controller, plan).await
        }
    }
}

async fn set_security_mode<A: HubApi>(
    controller: &Controller<A>,
    space: &Space,
    mode: SecurityMode,
    group_id: Option<&str>,
) -> Result<CommandResult, CoreError> {
    let inner = &controller.inner;
    let previous = inner
        .local_actions
        .insert(space.hub_id.clone(), Instant::now());

    if let Err(e) = inner
        .api
        .set_security_mode(&space.hub_id, mode, group_id)
        .await
    {
        match previous {
            Some(at) => {
                inner.local_actions.insert(space.hub_id.clone(), at);
            }
            None => {
                inner.local_actions.remove(&space.hub_id);
            }
        }
        return Err(e);
    }

    info!(space = %space.name, %mode, group = ?group_id, "security mode requested");
    controller.spawn_refresh(RefreshOptions::metadata(), inner.config.security_refresh_delay);
    Ok(CommandResult::Ok)
}

/// Optimistic write: apply locally, call the API, roll back on failure.
async fn write_device<A: HubApi>(
    controller: &Controller<A>,
    plan: WritePlan,
) -> Result<CommandResult, CoreError> {
    let store = &controller.inner.store;
    let undo = store
        .update_space(&plan.space_id, |space| {
            space
                .devices
                .get_mut(&plan.device_id)
                .map(|device| command::apply_changes(device, &plan.changes))
        })
        .flatten()
        .ok_or_else(|| CoreError::DeviceNotFound {
            identifier: plan.device_id.clone(),
        })?;
    controller.notify_updated(&plan.space_id);

    if let Err(e) = send_write(&controller.inner.api, &plan).await {
        warn!(device_id = %plan.device_id, error = %e, "write failed, rolling back");
        store.update_space(&plan.space_id, |space| {
            if let Some(device) = space.devices.get_mut(&plan.device_id) {
                command::apply_changes(device, &undo);
            }
        });
        controller.notify_updated(&plan.space_id);
        controller.spawn_refresh(
            RefreshOptions {
                bypass_cache: true,
                suppress_state_events: false,
            },
            Duration::ZERO,
        );
        return Err(e);
    }

    debug!(device_id = %plan.device_id, "write applied");
    store
        .space(&plan.space_id)
        .and_then(|space| space.devices.get(&plan.device_id).cloned())
        .map(CommandResult::Device)
        .ok_or(CoreError::DeviceNotFound {
            identifier: plan.device_id,
        })
}

async fn send_write<A: HubApi>(api: &A, plan: &WritePlan) -> Result<(), CoreError> {
    let (hub, device) = (plan.hub_id.as_str(), plan.device_id.as_str());
    match &plan.request {
        WriteRequest::Update(patch) => api.update_device(hub, device, patch).await,
        WriteRequest::Switch { on, raw_type } => {
            api.set_switch_state(hub, device, *on, raw_type).await
        }
        WriteRequest::Channel {
            channel,
            on,
            raw_type,
        } => {
            api.set_channel_state(hub, device, *channel, *on, raw_type)
                .await
        }
        WriteRequest::Valve { open } => api.set_valve_state(hub, device, *open).await,
        WriteRequest::Brightness {
            brightness,
            raw_type,
        } => {
            api.set_brightness(hub, device, *brightness, raw_type)
                .await
        }
    }
}
