// ── Domain model ──
//
// Canonical in-memory types. A `Space` owns everything bound to one hub.

mod device;
mod lock;
mod space;
mod video;

pub use device::{Device, DeviceType};
pub use lock::SmartLock;
pub use space::{Group, SecurityState, Space};
pub use video::{ChannelSource, Detection, VideoChannel, VideoEdge, VideoEdgeType};
