use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::{Accessor, ItemKey, TaggedItemExt};
use lofty::probe::Probe;
use mindexer_core::ports::MetadataExtractor;
use mindexer_core::{Attribute, CoreError, MediaItem};
use std::fs;
use std::path::Path;

/// Reads metadata straight from a container's tag block (ID3/Vorbis
/// comment/etc.) via `lofty` — the fast path for mp3/ogg, which never has
/// to touch a decoder.
#[derive(Default)]
pub struct TagExtractor;

impl MetadataExtractor for TagExtractor {
  fn extract(
    &self,
    path: &Path,
    thumbnail_dir: &Path,
    item: &mut MediaItem,
    expand: bool,
  ) -> Result<(), CoreError> {
    let tagged_file =
      Probe::open(path).map_err(|e| CoreError::Extract(e.to_string()))?.read().map_err(|e| CoreError::Extract(e.to_string()))?;

    item.set(Attribute::Duration, tagged_file.properties().duration().as_secs() as i64);
    if let Some(rate) = tagged_file.properties().sample_rate() {
      item.set(Attribute::SampleRate, rate as i64);
    }
    if let Some(channels) = tagged_file.properties().channels() {
      item.set(Attribute::Channels, channels as i64);
    }
    if let Some(bitrate) = tagged_file.properties().audio_bitrate() {
      item.set(Attribute::BitRate, bitrate as i64);
    }

    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
      return Ok(());
    };

    if let Some(title) = tag.title() {
      item.set(Attribute::Title, title.to_string());
    }
    if !expand {
      self.maybe_write_cover(tag, thumbnail_dir, item)?;
      return Ok(());
    }

    if let Some(artist) = tag.artist() {
      item.set(Attribute::Artist, artist.to_string());
    }
    if let Some(album) = tag.album() {
      item.set(Attribute::Album, album.to_string());
    }
    if let Some(genre) = tag.genre() {
      item.set(Attribute::Genre, genre.to_string());
    }
    if let Some(track) = tag.track() {
      item.set(Attribute::Track, track as i64);
    }
    if let Some(total) = tag.track_total() {
      item.set(Attribute::TotalTracks, total as i64);
    }
    if let Some(year) = tag.year() {
      item.set(Attribute::Year, year as i64);
    }
    if let Some(album_artist) = tag.get_string(&ItemKey::AlbumArtist) {
      item.set(Attribute::AlbumArtist, album_artist.to_string());
    }
    if let Some(lyrics) = tag.get_string(&ItemKey::Lyrics) {
      item.set(Attribute::Lyric, lyrics.to_string());
    }

    self.maybe_write_cover(tag, thumbnail_dir, item)?;
    Ok(())
  }
}

impl TagExtractor {
  fn maybe_write_cover(
    &self,
    tag: &lofty::tag::Tag,
    thumbnail_dir: &Path,
    item: &mut MediaItem,
  ) -> Result<(), CoreError> {
    let Some(picture) = tag.pictures().first() else { return Ok(()) };

    fs::create_dir_all(thumbnail_dir).map_err(|e| CoreError::Extract(e.to_string()))?;
    let out_path = thumbnail_dir.join(&item.thumbnail_name);
    fs::write(&out_path, picture.data()).map_err(|e| CoreError::Extract(e.to_string()))?;
    item.set(Attribute::Thumbnail, out_path.to_string_lossy().to_string());
    Ok(())
  }
}
