use mindexer_core::ports::MetadataExtractor;
use mindexer_core::{Attribute, CoreError, MediaItem};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Still-image metadata via `image` (format/geometry decode) and
/// `kamadak-exif` (capture-time EXIF tags). The two crates are read
/// independently since `image`'s decode doesn't surface EXIF and a raw EXIF
/// parse doesn't need a full pixel decode.
#[derive(Default)]
pub struct ImageExtractor;

impl MetadataExtractor for ImageExtractor {
  fn extract(
    &self,
    path: &Path,
    thumbnail_dir: &Path,
    item: &mut MediaItem,
    expand: bool,
  ) -> Result<(), CoreError> {
    let dimensions = image::image_dimensions(path).map_err(|e| CoreError::Extract(e.to_string()))?;
    item.set(Attribute::Width, dimensions.0 as i64);
    item.set(Attribute::Height, dimensions.1 as i64);

    if let Some(exif) = read_exif(path) {
      apply_exif(&exif, item);
    }

    if !expand {
      return Ok(());
    }

    self.write_thumbnail(path, thumbnail_dir, item)?;
    Ok(())
  }
}

impl ImageExtractor {
  fn write_thumbnail(&self, path: &Path, thumbnail_dir: &Path, item: &mut MediaItem) -> Result<(), CoreError> {
    const THUMBNAIL_EDGE: u32 = 256;

    let img = image::open(path).map_err(|e| CoreError::Extract(e.to_string()))?;
    let thumbnail = img.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE);

    std::fs::create_dir_all(thumbnail_dir).map_err(|e| CoreError::Extract(e.to_string()))?;
    let out_path = thumbnail_dir.join(&item.thumbnail_name);
    thumbnail.save(&out_path).map_err(|e| CoreError::Extract(e.to_string()))?;
    item.set(Attribute::Thumbnail, out_path.to_string_lossy().to_string());
    Ok(())
  }
}

fn read_exif(path: &Path) -> Option<exif::Exif> {
  let file = File::open(path).ok()?;
  let mut reader = BufReader::new(file);
  exif::Reader::new().read_from_container(&mut reader).ok()
}

fn apply_exif(exif: &exif::Exif, item: &mut MediaItem) {
  use exif::{In, Tag};

  if let Some(field) = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY) {
    item.set(Attribute::DateOfCreation, field.display_value().to_string());
  }

  if let Some(lat) = gps_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b"S") {
    item.set(Attribute::GeoLocLatitude, lat);
  }
  if let Some(lon) = gps_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b"W") {
    item.set(Attribute::GeoLocLongitude, lon);
  }
}

/// Converts an EXIF degrees/minutes/seconds rational triplet into signed
/// decimal degrees.
fn gps_coordinate(exif: &exif::Exif, coord_tag: exif::Tag, ref_tag: exif::Tag, negative_ref: &[u8]) -> Option<f64> {
  use exif::{In, Value};

  let coord_field = exif.get_field(coord_tag, In::PRIMARY)?;
  let Value::Rational(ref rationals) = coord_field.value else { return None };
  if rationals.len() < 3 {
    return None;
  }

  let degrees = rationals[0].to_f64();
  let minutes = rationals[1].to_f64();
  let seconds = rationals[2].to_f64();
  let mut decimal = degrees + minutes / 60.0 + seconds / 3600.0;

  if let Some(ref_field) = exif.get_field(ref_tag, In::PRIMARY) {
    if let Value::Ascii(ref ascii) = ref_field.value {
      if ascii.first().map(|bytes| bytes.as_slice() == negative_ref).unwrap_or(false) {
        decimal = -decimal;
      }
    }
  }

  Some(decimal)
}
