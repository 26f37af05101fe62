use super::media_type::{ExtractorKind, MediaType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed set of attribute names a media item can carry. Dynamic typing in
/// the original (a property bag keyed by string) is replaced by an enum key
/// plus a small value union, so a caller can never ask for an attribute that
/// does not exist in the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
  Title,
  Genre,
  Album,
  Artist,
  AlbumArtist,
  Track,
  TotalTracks,
  Duration,
  Thumbnail,
  LastModifiedDate,
  FileSize,
  Width,
  Height,
  DateOfCreation,
  Year,
  GeoLocLongitude,
  GeoLocLatitude,
  GeoLocCountry,
  GeoLocCity,
  VideoCodec,
  AudioCodec,
  SampleRate,
  Channels,
  BitRate,
  BitPerSample,
  Lyric,
  FrameRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
  Text(String),
  Integer(i64),
  Float(f64),
}

impl From<&str> for AttributeValue {
  fn from(v: &str) -> Self {
    AttributeValue::Text(v.to_string())
  }
}
impl From<String> for AttributeValue {
  fn from(v: String) -> Self {
    AttributeValue::Text(v)
  }
}
impl From<i64> for AttributeValue {
  fn from(v: i64) -> Self {
    AttributeValue::Integer(v)
  }
}
impl From<u32> for AttributeValue {
  fn from(v: u32) -> Self {
    AttributeValue::Integer(v as i64)
  }
}
impl From<u64> for AttributeValue {
  fn from(v: u64) -> Self {
    AttributeValue::Integer(v as i64)
  }
}
impl From<f64> for AttributeValue {
  fn from(v: f64) -> Self {
    AttributeValue::Float(v)
  }
}

/// A single discovered file, uniquely owned at each pipeline stage: created
/// by the plugin's walk, moved into the extractor pool, moved into the DB
/// write, dropped on acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
  /// `<device_uri>/<relative_path>`
  pub uri: String,
  pub device_uri: String,
  pub extension: String,
  pub media_type: MediaType,
  pub extractor_kind: ExtractorKind,
  pub mime: String,
  /// Last-modified time in nanoseconds, or a content fingerprint for sources
  /// that do not report modification times. Used to short-circuit rescans.
  pub fingerprint: u64,
  pub file_size: u64,
  pub thumbnail_name: String,
  pub parsed: bool,
  pub attributes: HashMap<Attribute, AttributeValue>,
}

impl MediaItem {
  pub fn new(
    uri: impl Into<String>,
    device_uri: impl Into<String>,
    extension: impl Into<String>,
    media_type: MediaType,
    extractor_kind: ExtractorKind,
    fingerprint: u64,
    file_size: u64,
  ) -> Self {
    let thumbnail_name = format!("{}.jpg", uuid::Uuid::new_v4());
    Self {
      uri: uri.into(),
      device_uri: device_uri.into(),
      extension: extension.into(),
      media_type,
      extractor_kind,
      mime: String::new(),
      fingerprint,
      file_size,
      thumbnail_name,
      parsed: false,
      attributes: HashMap::new(),
    }
  }

  pub fn set(&mut self, attr: Attribute, value: impl Into<AttributeValue>) {
    self.attributes.insert(attr, value.into());
  }

  pub fn get(&self, attr: Attribute) -> Option<&AttributeValue> {
    self.attributes.get(&attr)
  }
}
