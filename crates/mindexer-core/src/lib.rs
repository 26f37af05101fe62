pub mod domain;
pub mod errors;
pub mod ports;

pub use domain::{Attribute, AttributeValue, Counters, Device, DeviceMeta, DeviceState, ExtractorKind, MediaItem, MediaType};
pub use errors::CoreError;
