mod dispatch;
mod image_extractor;
mod pipeline_extractor;
mod tag_extractor;
mod tag_keys;

pub use dispatch::ExtractorPool;
pub use image_extractor::ImageExtractor;
pub use pipeline_extractor::{AudioPipelineExtractor, VideoPipelineExtractor};
pub use tag_extractor::TagExtractor;
