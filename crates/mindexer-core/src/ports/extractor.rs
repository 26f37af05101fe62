use crate::domain::MediaItem;
use crate::errors::CoreError;
use std::path::Path;

/// A type-specific metadata reader. Synchronous and `Send + Sync`: callers
/// run it inside `spawn_blocking`, since every real implementation ends up
/// doing blocking I/O (container probing, tag parsing, image decode).
pub trait MetadataExtractor: Send + Sync {
  /// `expand = false` fills only what list views need (title, duration,
  /// thumbnail, geometry); `expand = true` fills every attribute the
  /// extractor knows how to read. `thumbnail_dir` is where an extracted
  /// cover/frame, if any, gets written under `item.thumbnail_name`.
  fn extract(
    &self,
    path: &Path,
    thumbnail_dir: &Path,
    item: &mut MediaItem,
    expand: bool,
  ) -> Result<(), CoreError>;
}
