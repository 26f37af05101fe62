use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of media categories the indexer understands. Replaces the
/// original's `Type` enum-plus-EOL-sentinel idiom with a plain Rust enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
  Audio,
  Video,
  Image,
}

impl MediaType {
  pub const ALL: [MediaType; 3] = [MediaType::Audio, MediaType::Video, MediaType::Image];

  /// The stable identifier used to namespace rows in the document database.
  pub fn kind_id(self) -> &'static str {
    match self {
      MediaType::Audio => "audio",
      MediaType::Video => "video",
      MediaType::Image => "image",
    }
  }
}

impl fmt::Display for MediaType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.kind_id())
  }
}

/// Which concrete extractor handles a given extension once its `MediaType`
/// is known. `TagExtractor` is the fast path for formats that carry their
/// metadata in a container-level tag block (mp3, ogg); everything else goes
/// through the slower decode-based pipeline, and images get their own
/// format+EXIF reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractorKind {
  TagExtractor,
  PipelineExtractor,
  ImageExtractor,
}
