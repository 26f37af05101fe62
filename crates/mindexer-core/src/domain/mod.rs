pub mod device;
pub mod media_item;
pub mod media_type;

pub use device::{Counters, Device, DeviceMeta, DeviceState};
pub use media_item::{Attribute, AttributeValue, MediaItem};
pub use media_type::{ExtractorKind, MediaType};
