//! Event ingestion, state reconciliation and write path between
//! `hubwatch-api` and its consumers (the `hubwatch` CLI, or any host).
//!
//! - **[`Controller`]**: Central facade: [`start()`](Controller::start)
//!   polls every hub once, then spawns the periodic refresh, dedup sweep and
//!   command processor. [`attach_stream()`](Controller::attach_stream) feeds
//!   push payloads through parse → dedup → classify → reconcile.
//!   [`Controller::oneshot()`](Controller::oneshot) serves single CLI calls.
//!
//! - **[`DataStore`]**: Reactive storage for [`Space`]s (`DashMap` +
//!   `tokio::sync::watch`). Polls merge into it without clobbering
//!   event-owned attributes or freshly pushed security states.
//!
//! - **[`Notifier`]**: Broadcast of [`Notification`]s: state updates,
//!   security changes, doorbell rings, scenarios, new smart locks.
//!
//! - **[`Command`]**: Typed writes routed through an `mpsc` channel.
//!   Device writes are applied optimistically and rolled back on failure;
//!   security-relevant ones are refused while the space is armed.
//!
//! - **[`descriptors`]**: Per-device-type tables of binary sensors,
//!   switches, numbers and selects.
//!
//! - **[`HubApi`]**: The seam to the vendor cloud; [`CloudApi`] is the
//!   real implementation.

pub mod api;
pub mod camera;
pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod dedup;
pub mod descriptors;
pub mod error;
pub mod event;
pub mod model;
pub mod notify;
pub mod reconcile;
pub mod store;
pub mod stream;
pub mod timers;

// ── Primary re-exports ──────────────────────────────────────────────
pub use api::{CloudApi, HubApi};
pub use command::{Command, CommandResult, SecurityMode};
pub use config::{CloudConfig, ControllerConfig, TlsVerification};
pub use controller::{ConnectionState, Controller, Ingested, RefreshOptions};
pub use error::CoreError;
pub use notify::{Notification, Notifier};
pub use store::{DataStore, RefreshReport};
pub use stream::EntityStream;

pub use model::{
    ChannelSource, Detection, Device, DeviceType, Group, SecurityState, SmartLock, Space,
    VideoChannel, VideoEdge, VideoEdgeType,
};
