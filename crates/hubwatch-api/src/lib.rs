// hubwatch-api: Async Rust client for the Ajax security cloud API (REST + SSE)

pub mod client;
pub mod error;
pub mod models;
pub mod sse;
pub mod transport;

pub use client::{AjaxClient, ArmingCommand};
pub use error::Error;
pub use models::{DeviceRecord, GroupRecord, HubRecord, HubSummary, LoginResponse, VideoEdgeRecord};
pub use sse::{ReconnectConfig, SseFrame, SseHandle, SseParser};
pub use transport::{TlsMode, TransportConfig};
