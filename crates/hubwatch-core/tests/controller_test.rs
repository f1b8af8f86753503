#![allow(clippy::unwrap_used)]
// Controller-level tests against a scripted in-process cloud.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hubwatch_core::{
    Command, CommandResult, Controller, ControllerConfig, CoreError, Device, HubApi, Ingested,
    Notification, RefreshOptions, SecurityMode, SecurityState, Space, VideoChannel, VideoEdge,
    VideoEdgeType,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::sync::broadcast;

// ── Fake cloud ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Fetch { bypass_cache: bool },
    Update { device_id: String, patch: Value },
    Switch { device_id: String, on: bool },
    Channel { device_id: String, channel: u8, on: bool },
    Valve { device_id: String, open: bool },
    Brightness { device_id: String, brightness: u8 },
    Security { hub_id: String, mode: SecurityMode, group_id: Option<String> },
}

#[derive(Default)]
struct FakeApi {
    spaces: Mutex<Vec<Space>>,
    calls: Mutex<Vec<Call>>,
    fail_writes: AtomicBool,
}

impl FakeApi {
    fn with(spaces: Vec<Space>) -> Self {
        Self {
            spaces: Mutex::new(spaces),
            ..Self::default()
        }
    }

    fn set_spaces(&self, spaces: Vec<Space>) {
        *self.spaces.lock().unwrap() = spaces;
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn fetches(&self) -> Vec<bool> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Fetch { bypass_cache } => Some(bypass_cache),
                _ => None,
            })
            .collect()
    }

    fn write(&self, call: Call) -> Result<(), CoreError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Api {
                message: "hub did not answer".into(),
                status: Some(502),
            });
        }
        Ok(())
    }
}

impl HubApi for FakeApi {
    async fn fetch_spaces(&self, bypass_cache: bool) -> Result<Vec<Space>, CoreError> {
        self.calls.lock().unwrap().push(Call::Fetch { bypass_cache });
        Ok(self.spaces.lock().unwrap().clone())
    }

    async fn update_device(
        &self,
        _hub_id: &str,
        device_id: &str,
        patch: &Value,
    ) -> Result<(), CoreError> {
        self.write(Call::Update {
            device_id: device_id.into(),
            patch: patch.clone(),
        })
    }

    async fn set_switch_state(
        &self,
        _hub_id: &str,
        device_id: &str,
        on: bool,
        _raw_type: &str,
    ) -> Result<(), CoreError> {
        self.write(Call::Switch {
            device_id: device_id.into(),
            on,
        })
    }

    async fn set_channel_state(
        &self,
        _hub_id: &str,
        device_id: &str,
        channel: u8,
        on: bool,
        _raw_type: &str,
    ) -> Result<(), CoreError> {
        self.write(Call::Channel {
            device_id: device_id.into(),
            channel,
            on,
        })
    }

    async fn set_valve_state(
        &self,
        _hub_id: &str,
        device_id: &str,
        open: bool,
    ) -> Result<(), CoreError> {
        self.write(Call::Valve {
            device_id: device_id.into(),
            open,
        })
    }

    async fn set_brightness(
        &self,
        _hub_id: &str,
        device_id: &str,
        brightness: u8,
        _raw_type: &str,
    ) -> Result<(), CoreError> {
        self.write(Call::Brightness {
            device_id: device_id.into(),
            brightness,
        })
    }

    async fn set_security_mode(
        &self,
        hub_id: &str,
        mode: SecurityMode,
        group_id: Option<&str>,
    ) -> Result<(), CoreError> {
        self.write(Call::Security {
            hub_id: hub_id.into(),
            mode,
            group_id: group_id.map(Into::into),
        })
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

fn home(state: SecurityState) -> Space {
    let mut space = Space::new("S1", "Home", "H1");
    space.security_state = state;

    let mut motion = Device::new("D1", "Hall", "MotionProtect");
    motion.set_attr("alwaysActive", false);
    let mut dimmer = Device::new("L1", "Ceiling", "LightSwitchDimmer");
    dimmer.set_attr("actualBrightnessCh1", 60);
    dimmer.set_attr("channelStatuses", json!(["CHANNEL_1_ON"]));
    let devices = [
        dimmer,
        motion,
        Device::new("T1", "Front door", "DoorProtect"),
        Device::new("F1", "Kitchen", "FireProtect2"),
        Device::new("D2", "Porch bell", "Doorbell"),
        Device::new("W1", "Lamp", "Socket"),
    ];
    for device in devices {
        space.devices.insert(device.id.clone(), device);
    }

    space.video_edges.insert(
        "E1".into(),
        VideoEdge {
            id: "E1".into(),
            name: "Driveway".into(),
            edge_type: VideoEdgeType::Camera,
            ip: Some("10.0.0.7".into()),
            mac: Some("aabbcc001122".into()),
            channels: vec![VideoChannel::new("0")],
        },
    );
    space
}

async fn started(state: SecurityState) -> Controller<FakeApi> {
    let controller = Controller::new(FakeApi::with(vec![home(state)]), ControllerConfig::default());
    controller.start().await.unwrap();
    controller
}

fn space(controller: &Controller<FakeApi>) -> Arc<Space> {
    controller.store().space("S1").unwrap()
}

fn attr(controller: &Controller<FakeApi>, device_id: &str, key: &str) -> Option<Value> {
    space(controller).devices[device_id].attr(key).cloned()
}

fn drain(rx: &mut broadcast::Receiver<Arc<Notification>>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push((*n).clone());
    }
    out
}

fn security_notifications(notifications: &[Notification]) -> Vec<&Notification> {
    notifications
        .iter()
        .filter(|n| matches!(n, Notification::SecurityChanged { .. }))
        .collect()
}

// ── Security events ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn arm_event_sets_state_and_survives_followup_poll() {
    let controller = started(SecurityState::Disarmed).await;
    let mut rx = controller.notifications();

    let status = controller.ingest(&json!({
        "eventTag": "Arm",
        "hubId": "H1",
        "sourceObjectName": "Alice",
    }));
    assert_eq!(status, Ingested::Applied);
    assert_eq!(space(&controller).security_state, SecurityState::Armed);

    let notes = drain(&mut rx);
    assert_eq!(
        security_notifications(&notes),
        vec![&Notification::SecurityChanged {
            space_id: "S1".into(),
            space_name: "Home".into(),
            action: SecurityState::Armed,
            source_name: Some("Alice".into()),
        }]
    );

    // The metadata refresh still reports DISARMED; the pushed state wins.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(controller.api().fetches(), vec![false, true]);
    assert_eq!(space(&controller).security_state, SecurityState::Armed);
    assert!(security_notifications(&drain(&mut rx)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn group_arm_waits_for_refresh() {
    let controller = started(SecurityState::Disarmed).await;
    let mut rx = controller.notifications();

    let status = controller.ingest(&json!({
        "event": {
            "eventTag": "grouparm",
            "hubId": "H1",
            "sourceObjectName": "Bob",
            "additionalData": { "relatedGroupsInfo": [{ "id": "G1" }] },
        }
    }));
    assert_eq!(status, Ingested::Applied);
    assert_eq!(space(&controller).security_state, SecurityState::Disarmed);
    assert_eq!(security_notifications(&drain(&mut rx)).len(), 1);

    controller
        .api()
        .set_spaces(vec![home(SecurityState::PartiallyArmed)]);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(controller.api().fetches(), vec![false, true]);
    assert_eq!(space(&controller).security_state, SecurityState::PartiallyArmed);
    // The follow-up poll does not announce the change a second time.
    assert!(security_notifications(&drain(&mut rx)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn polled_security_change_is_announced() {
    let controller = started(SecurityState::Disarmed).await;
    let mut rx = controller.notifications();

    controller.api().set_spaces(vec![home(SecurityState::NightMode)]);
    let report = controller
        .full_refresh(RefreshOptions::default())
        .await
        .unwrap();

    assert_eq!(report.security_changes.len(), 1);
    assert_eq!(
        security_notifications(&drain(&mut rx)),
        vec![&Notification::SecurityChanged {
            space_id: "S1".into(),
            space_name: "Home".into(),
            action: SecurityState::NightMode,
            source_name: None,
        }]
    );
}

// ── Dedup and classification ────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn duplicate_tamper_inside_window_is_dropped() {
    let controller = started(SecurityState::Disarmed).await;
    let tamper = json!({
        "eventTag": "tampered",
        "hubId": "H1",
        "sourceObjectId": "T1",
        "transition": "TRIGGERED",
    });

    assert_eq!(controller.ingest(&tamper), Ingested::Applied);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(controller.ingest(&tamper), Ingested::Duplicate);
    assert_eq!(attr(&controller, "T1", "tampered"), Some(json!(true)));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.ingest(&tamper), Ingested::Applied);
}

#[tokio::test(start_paused = true)]
async fn recovered_transition_overrides_table_default() {
    let controller = started(SecurityState::Disarmed).await;
    controller.ingest(&json!({
        "eventTag": "tamperopened",
        "hubId": "H1",
        "sourceObjectId": "T1",
        "transition": "RECOVERED",
    }));
    assert_eq!(attr(&controller, "T1", "tampered"), Some(json!(false)));
}

#[tokio::test(start_paused = true)]
async fn rejected_payloads_leave_state_alone() {
    let controller = started(SecurityState::Disarmed).await;
    let version = controller.store().version();

    assert_eq!(controller.ingest(&json!({ "hubId": "H1" })), Ingested::Malformed);
    assert_eq!(controller.ingest(&json!("arm")), Ingested::Malformed);
    assert_eq!(
        controller.ingest(&json!({ "eventTag": "firmwareupdated", "hubId": "H1" })),
        Ingested::Unhandled
    );
    assert_eq!(
        controller.ingest(&json!({ "eventTag": "arm", "hubId": "H9" })),
        Ingested::UnknownHub
    );
    assert_eq!(controller.store().version(), version);
}

// ── Escalation ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn smoke_escalates_even_when_disarmed() {
    let controller = started(SecurityState::Disarmed).await;
    controller.ingest(&json!({
        "eventTag": "smokedetected",
        "hubId": "H1",
        "sourceObjectId": "F1",
    }));
    assert_eq!(attr(&controller, "F1", "smoke_detected"), Some(json!(true)));
    assert_eq!(space(&controller).security_state, SecurityState::Triggered);
}

#[tokio::test(start_paused = true)]
async fn motion_escalates_only_when_armed() {
    let disarmed = started(SecurityState::Disarmed).await;
    let motion = json!({
        "eventTag": "motiondetected",
        "hubId": "H1",
        "sourceObjectId": "D1",
    });

    disarmed.ingest(&motion);
    assert_eq!(attr(&disarmed, "D1", "motion_detected"), Some(json!(true)));
    assert_eq!(space(&disarmed).security_state, SecurityState::Disarmed);

    let armed = started(SecurityState::Armed).await;
    armed.ingest(&motion);
    assert_eq!(attr(&armed, "D1", "motion_detected"), Some(json!(true)));
    assert_eq!(space(&armed).security_state, SecurityState::Triggered);
}

// ── Auto-reset timers ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn doorbell_ring_resets_after_timeout() {
    let controller = started(SecurityState::Disarmed).await;
    let mut rx = controller.notifications();

    controller.ingest(&json!({
        "eventTag": "doorbellring",
        "hubId": "H1",
        "sourceObjectId": "D2",
    }));
    assert_eq!(attr(&controller, "D2", "doorbell_ring"), Some(json!(true)));
    assert!(drain(&mut rx).iter().any(|n| matches!(
        n,
        Notification::DoorbellRing { device_id, .. } if device_id == "D2"
    )));

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(attr(&controller, "D2", "doorbell_ring"), Some(json!(true)));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(attr(&controller, "D2", "doorbell_ring"), Some(json!(false)));
    assert!(controller.timers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn removed_doorbell_cancels_its_timer() {
    let controller = started(SecurityState::Disarmed).await;
    controller.ingest(&json!({
        "eventTag": "doorbellring",
        "hubId": "H1",
        "sourceObjectId": "D2",
    }));
    assert_eq!(controller.timers().len(), 1);

    let mut without_bell = home(SecurityState::Disarmed);
    without_bell.devices.remove("D2");
    controller.api().set_spaces(vec![without_bell]);
    let report = controller
        .full_refresh(RefreshOptions::default())
        .await
        .unwrap();

    assert_eq!(report.removed_devices, vec![("S1".to_owned(), "D2".to_owned())]);
    assert!(controller.timers().is_empty());
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(!space(&controller).devices.contains_key("D2"));
}

#[tokio::test(start_paused = true)]
async fn video_detection_resets_after_timeout() {
    let controller = started(SecurityState::Disarmed).await;
    controller.ingest(&json!({
        "eventTag": "videohumandetected",
        "hubId": "H1",
        "sourceObjectId": "E1",
    }));
    let detecting = |c: &Controller<FakeApi>| {
        space(c).video_edges["E1"].channels[0].is_detecting("VIDEO_HUMAN")
    };
    assert!(detecting(&controller));

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(!detecting(&controller));
}

// ── Write path ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn relay_write_returns_updated_device() {
    let controller = started(SecurityState::Armed).await;
    let result = controller
        .execute(Command::SetRelay {
            space_id: "S1".into(),
            device_id: "W1".into(),
            on: true,
        })
        .await
        .unwrap();

    let CommandResult::Device(device) = result else {
        panic!("expected the device back");
    };
    assert_eq!(device.attr("is_on"), Some(&json!(true)));
    assert!(controller.api().calls().contains(&Call::Switch {
        device_id: "W1".into(),
        on: true
    }));
}

#[tokio::test(start_paused = true)]
async fn failed_write_rolls_back_and_refreshes() {
    let controller = started(SecurityState::Disarmed).await;
    controller.api().fail_writes.store(true, Ordering::SeqCst);

    let err = controller
        .execute(Command::SetSwitch {
            space_id: "S1".into(),
            device_id: "D1".into(),
            key: "always_active".into(),
            on: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Api { status: Some(502), .. }));
    assert_eq!(attr(&controller, "D1", "alwaysActive"), Some(json!(false)));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(controller.api().fetches(), vec![false, true]);
}

#[tokio::test(start_paused = true)]
async fn dimmer_off_rolls_back_when_hub_rejects_it() {
    let controller = started(SecurityState::Disarmed).await;
    controller.api().fail_writes.store(true, Ordering::SeqCst);

    let err = controller
        .execute(Command::SetBrightness {
            space_id: "S1".into(),
            device_id: "L1".into(),
            brightness: 0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Api { .. }));
    assert!(controller.api().calls().contains(&Call::Brightness {
        device_id: "L1".into(),
        brightness: 0
    }));
    assert_eq!(attr(&controller, "L1", "actualBrightnessCh1"), Some(json!(60)));
    assert_eq!(attr(&controller, "L1", "channelStatuses"), Some(json!(["CHANNEL_1_ON"])));
}

#[tokio::test(start_paused = true)]
async fn dimmer_brightness_is_clamped_and_applied() {
    let controller = started(SecurityState::Armed).await;
    let result = controller
        .execute(Command::SetBrightness {
            space_id: "S1".into(),
            device_id: "L1".into(),
            brightness: 180,
        })
        .await
        .unwrap();

    let CommandResult::Device(device) = result else {
        panic!("expected the device back");
    };
    assert_eq!(device.attr("actualBrightnessCh1"), Some(&json!(100)));
    assert!(controller.api().calls().contains(&Call::Brightness {
        device_id: "L1".into(),
        brightness: 100
    }));
}

#[tokio::test(start_paused = true)]
async fn armed_space_refuses_security_setting_without_network() {
    let controller = started(SecurityState::Armed).await;

    let err = controller
        .execute(Command::SetSwitch {
            space_id: "Home".into(),
            device_id: "D1".into(),
            key: "always_active".into(),
            on: true,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::SystemArmed { ref state } if state == "armed"));
    assert_eq!(controller.api().calls(), vec![Call::Fetch { bypass_cache: false }]);
}

#[tokio::test(start_paused = true)]
async fn local_arm_is_attributed_to_local() {
    let controller = started(SecurityState::Disarmed).await;
    let mut rx = controller.notifications();

    controller
        .execute(Command::SetSecurityMode {
            space_id: "S1".into(),
            mode: SecurityMode::Arm,
            group_id: None,
        })
        .await
        .unwrap();
    assert!(controller.api().calls().contains(&Call::Security {
        hub_id: "H1".into(),
        mode: SecurityMode::Arm,
        group_id: None,
    }));

    controller.ingest(&json!({
        "eventTag": "arm",
        "hubId": "H1",
        "sourceObjectName": "Alice",
    }));
    let notes = drain(&mut rx);
    assert!(matches!(
        security_notifications(&notes).as_slice(),
        [Notification::SecurityChanged { source_name: Some(name), .. }] if name == "local"
    ));
}

#[tokio::test(start_paused = true)]
async fn stopped_controller_rejects_commands() {
    let controller = started(SecurityState::Disarmed).await;
    controller.shutdown().await;

    let err = controller
        .execute(Command::SetValve {
            space_id: "S1".into(),
            device_id: "W1".into(),
            open: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ControllerStopped));
}

// ── Stream attachment ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn attached_stream_feeds_events() {
    let controller = started(SecurityState::Disarmed).await;
    let (tx, rx) = broadcast::channel(8);
    controller.attach_stream(rx).await;

    tx.send(Arc::new(json!({ "no": "tag" }))).unwrap();
    tx.send(Arc::new(json!({
        "eventTag": "leakdetected",
        "hubId": "H1",
        "sourceObjectName": "Kitchen",
    })))
    .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(attr(&controller, "F1", "leak_detected"), Some(json!(true)));
    assert_eq!(space(&controller).security_state, SecurityState::Triggered);
    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn events_pushed_during_first_poll_are_applied() {
    let (tx, rx) = broadcast::channel(8);
    let controller = Controller::new(
        FakeApi::with(vec![home(SecurityState::Disarmed)]),
        ControllerConfig::default(),
    );

    tx.send(Arc::new(json!({
        "eventTag": "leakdetected",
        "hubId": "H1",
        "sourceObjectName": "Kitchen",
    })))
    .unwrap();
    controller.start().await.unwrap();
    controller.attach_stream(rx).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(attr(&controller, "F1", "leak_detected"), Some(json!(true)));
    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn oneshot_runs_closure_against_fresh_store() {
    let spaces = Controller::oneshot(
        FakeApi::with(vec![home(SecurityState::Disarmed)]),
        ControllerConfig::default(),
        |c| async move { Ok(c.spaces_snapshot().len()) },
    )
    .await
    .unwrap();
    assert_eq!(spaces, 1);
}
