use crate::paths::ConfigError;
use mindexer_core::{ExtractorKind, MediaType};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Deserialize, Default)]
struct RawExtensionConfig {
  #[serde(rename = "force-sw-decoders")]
  force_sw_decoders: Option<bool>,
  #[serde(rename = "supportedMediaExtension")]
  supported_media_extension: Option<RawSupportedExtensions>,
}

#[derive(Debug, Deserialize, Default)]
struct RawSupportedExtensions {
  audio: Option<Vec<String>>,
  video: Option<Vec<String>>,
  image: Option<Vec<String>>,
}

/// Extensions whose tag block is cheap to parse directly, bypassing the
/// decode pipeline entirely.
const TAG_EXTRACTOR_EXTS: [&str; 2] = ["mp3", "ogg"];

/// Immutable-after-load extension -> (media type, extractor kind) table.
/// Queried both case-sensitive and case-folded, original case taking
/// precedence — mirrors the original's exact-match-then-`toLower()` probe.
pub struct Configurator {
  force_sw_decoders: bool,
  table: RwLock<HashMap<String, (MediaType, ExtractorKind)>>,
}

impl Configurator {
  /// Loads `extensions.json`. A missing `supportedMediaExtension` category
  /// is simply skipped; a missing `force-sw-decoders` key defaults to
  /// `false` and is logged, matching the original's tolerant parse.
  pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let raw: RawExtensionConfig = serde_json::from_str(&content)?;
    Ok(Self::from_raw(raw))
  }

  fn from_raw(raw: RawExtensionConfig) -> Self {
    let force_sw_decoders = raw.force_sw_decoders.unwrap_or_else(|| {
      tracing::warn!("extensions config missing `force-sw-decoders`, defaulting to false");
      false
    });

    let mut table = HashMap::new();
    if let Some(exts) = raw.supported_media_extension {
      if let Some(audio) = exts.audio {
        for ext in audio {
          let kind =
            if TAG_EXTRACTOR_EXTS.contains(&ext.as_str()) { ExtractorKind::TagExtractor } else { ExtractorKind::PipelineExtractor };
          table.insert(ext, (MediaType::Audio, kind));
        }
      } else {
        tracing::warn!("extensions config missing `supportedMediaExtension.audio`");
      }
      if let Some(video) = exts.video {
        for ext in video {
          table.insert(ext, (MediaType::Video, ExtractorKind::PipelineExtractor));
        }
      } else {
        tracing::warn!("extensions config missing `supportedMediaExtension.video`");
      }
      if let Some(image) = exts.image {
        for ext in image {
          table.insert(ext, (MediaType::Image, ExtractorKind::ImageExtractor));
        }
      } else {
        tracing::warn!("extensions config missing `supportedMediaExtension.image`");
      }
    } else {
      tracing::warn!("extensions config missing `supportedMediaExtension` entirely");
    }

    Self { force_sw_decoders, table: RwLock::new(table) }
  }

  pub fn force_sw_decoders(&self) -> bool {
    self.force_sw_decoders
  }

  /// Exact match first, then case-folded.
  pub fn type_info(&self, extension: &str) -> Option<(MediaType, ExtractorKind)> {
    let table = self.table.read().unwrap();
    if let Some(info) = table.get(extension) {
      return Some(*info);
    }
    let lower = extension.to_lowercase();
    table.iter().find(|(k, _)| k.to_lowercase() == lower).map(|(_, v)| *v)
  }

  pub fn is_supported(&self, extension: &str) -> bool {
    self.type_info(extension).is_some()
  }

  pub fn insert_extension(&self, extension: impl Into<String>, media_type: MediaType, kind: ExtractorKind) {
    self.table.write().unwrap().insert(extension.into(), (media_type, kind));
  }

  pub fn remove_extension(&self, extension: &str) {
    self.table.write().unwrap().remove(extension);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Configurator {
    Configurator::from_raw(RawExtensionConfig {
      force_sw_decoders: Some(true),
      supported_media_extension: Some(RawSupportedExtensions {
        audio: Some(vec!["mp3".into(), "flac".into()]),
        video: Some(vec!["mp4".into()]),
        image: Some(vec!["JPG".into()]),
      }),
    })
  }

  #[test]
  fn mp3_and_ogg_use_the_tag_extractor() {
    let cfg = sample();
    assert_eq!(cfg.type_info("mp3"), Some((MediaType::Audio, ExtractorKind::TagExtractor)));
  }

  #[test]
  fn other_audio_uses_the_pipeline_extractor() {
    let cfg = sample();
    assert_eq!(cfg.type_info("flac"), Some((MediaType::Audio, ExtractorKind::PipelineExtractor)));
  }

  #[test]
  fn lookup_falls_back_to_case_folded_match() {
    let cfg = sample();
    assert_eq!(cfg.type_info("jpg"), Some((MediaType::Image, ExtractorKind::ImageExtractor)));
  }

  #[test]
  fn unknown_extension_is_unsupported() {
    let cfg = sample();
    assert!(!cfg.is_supported("xyz"));
  }

  #[test]
  fn dynamic_mutation_is_visible_immediately() {
    let cfg = sample();
    cfg.insert_extension("wav", MediaType::Audio, ExtractorKind::PipelineExtractor);
    assert!(cfg.is_supported("wav"));
    cfg.remove_extension("wav");
    assert!(!cfg.is_supported("wav"));
  }
}
