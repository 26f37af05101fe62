use crate::image_extractor::ImageExtractor;
use crate::pipeline_extractor::{AudioPipelineExtractor, VideoPipelineExtractor};
use crate::tag_extractor::TagExtractor;
use mindexer_core::ports::MetadataExtractor;
use mindexer_core::{CoreError, ExtractorKind, MediaItem, MediaType};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// One stateless extractor instance per `(MediaType, ExtractorKind)` pair,
/// shared across every dispatched job. Extraction itself is blocking, so
/// each job runs on the blocking pool behind a `Semaphore` that caps how
/// many decodes run at once regardless of how many devices are scanning
/// concurrently.
pub struct ExtractorPool {
  tag: Arc<TagExtractor>,
  audio_pipeline: Arc<AudioPipelineExtractor>,
  video_pipeline: Arc<VideoPipelineExtractor>,
  image: Arc<ImageExtractor>,
  permits: Arc<Semaphore>,
}

impl ExtractorPool {
  pub fn new(max_concurrent: usize, force_sw_decoders: bool) -> Self {
    Self {
      tag: Arc::new(TagExtractor),
      audio_pipeline: Arc::new(AudioPipelineExtractor),
      video_pipeline: Arc::new(VideoPipelineExtractor::new(force_sw_decoders)),
      image: Arc::new(ImageExtractor),
      permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
    }
  }

  /// Dispatches one file to whichever extractor its `(media_type,
  /// extractor_kind)` selects, filling `item` in place. `thumbnail_dir` is
  /// the device-specific directory a cover/frame, if any, gets written
  /// under. Blocks on a permit if every slot in the pool is busy.
  pub async fn extract(
    &self,
    path: impl AsRef<Path>,
    thumbnail_dir: impl AsRef<Path>,
    item: &mut MediaItem,
    expand: bool,
  ) -> Result<(), CoreError> {
    let extractor = self.select(item.media_type, item.extractor_kind);
    let path = path.as_ref().to_path_buf();
    let thumbnail_dir = thumbnail_dir.as_ref().to_path_buf();

    let _permit = self.permits.clone().acquire_owned().await.map_err(|_| CoreError::Extract("pool closed".into()))?;

    let mut owned_item = item.clone();
    let result = tokio::task::spawn_blocking(move || {
      extractor.extract(&path, &thumbnail_dir, &mut owned_item, expand)?;
      Ok::<_, CoreError>(owned_item)
    })
    .await
    .map_err(|e| CoreError::Extract(format!("extraction task panicked: {e}")))??;

    *item = result;
    Ok(())
  }

  fn select(&self, media_type: MediaType, kind: ExtractorKind) -> Arc<dyn MetadataExtractor> {
    match (media_type, kind) {
      (_, ExtractorKind::TagExtractor) => self.tag.clone(),
      (MediaType::Video, ExtractorKind::PipelineExtractor) => self.video_pipeline.clone(),
      (_, ExtractorKind::PipelineExtractor) => self.audio_pipeline.clone(),
      (_, ExtractorKind::ImageExtractor) => self.image.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn selects_tag_extractor_for_tag_kind_regardless_of_media_type() {
    let pool = ExtractorPool::new(2, false);
    let extractor = pool.select(MediaType::Audio, ExtractorKind::TagExtractor);
    assert!(Arc::ptr_eq(&extractor, &(pool.tag.clone() as Arc<dyn MetadataExtractor>)));
  }

  #[test]
  fn selects_video_pipeline_for_video_media_type() {
    let pool = ExtractorPool::new(2, false);
    let extractor = pool.select(MediaType::Video, ExtractorKind::PipelineExtractor);
    assert!(Arc::ptr_eq(&extractor, &(pool.video_pipeline.clone() as Arc<dyn MetadataExtractor>)));
  }
}
