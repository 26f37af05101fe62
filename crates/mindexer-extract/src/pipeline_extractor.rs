use crate::tag_keys::{self, KEYS_ALBUM, KEYS_ALBUM_ARTIST, KEYS_ARTIST, KEYS_DATE, KEYS_GENRE, KEYS_TITLE, KEYS_TRACK_NUMBER};
use ffmpeg_next as ffmpeg;
use mindexer_core::ports::MetadataExtractor;
use mindexer_core::{Attribute, CoreError, MediaItem};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Audio probing for every extension that isn't handled by `TagExtractor`
/// (anything but mp3/ogg) — a full container/codec decode via `symphonia`
/// rather than a tag-block read, since these formats don't reliably carry
/// one.
#[derive(Default)]
pub struct AudioPipelineExtractor;

impl MetadataExtractor for AudioPipelineExtractor {
  fn extract(
    &self,
    path: &Path,
    _thumbnail_dir: &Path,
    item: &mut MediaItem,
    expand: bool,
  ) -> Result<(), CoreError> {
    let file = File::open(path).map_err(|e| CoreError::Extract(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
      hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
      .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
      .map_err(|e| CoreError::Extract(format!("symphonia probe failed: {e}")))?;

    let mut format = probed.format;

    let track = format.default_track().ok_or_else(|| CoreError::Extract("no default track".into()))?;
    let params = &track.codec_params;

    if let Some(rate) = params.sample_rate {
      item.set(Attribute::SampleRate, rate as i64);
    }
    if let Some(channels) = &params.channels {
      item.set(Attribute::Channels, channels.count() as i64);
    }
    if let (Some(tb), Some(n_frames)) = (params.time_base, params.n_frames) {
      let time = tb.calc_time(n_frames);
      item.set(Attribute::Duration, time.seconds as i64);
    }
    item.set(Attribute::AudioCodec, format!("{:?}", params.codec));

    let tags: HashMap<String, String> = format
      .metadata()
      .current()
      .map(|rev| {
        rev.tags().iter().map(|t| (t.key.to_lowercase(), t.value.to_string())).collect()
      })
      .unwrap_or_default();

    if let Some(title) = tag_keys::find_tag_value(&tags, KEYS_TITLE) {
      item.set(Attribute::Title, title.to_string());
    }
    if !expand {
      return Ok(());
    }

    if let Some(artist) = tag_keys::find_tag_value(&tags, KEYS_ARTIST) {
      item.set(Attribute::Artist, artist.to_string());
    }
    if let Some(album) = tag_keys::find_tag_value(&tags, KEYS_ALBUM) {
      item.set(Attribute::Album, album.to_string());
    }
    if let Some(album_artist) = tag_keys::find_tag_value(&tags, KEYS_ALBUM_ARTIST) {
      item.set(Attribute::AlbumArtist, album_artist.to_string());
    }
    if let Some(genre) = tag_keys::find_tag_value(&tags, KEYS_GENRE) {
      item.set(Attribute::Genre, genre.to_string());
    }
    if let Some(track_no) = tag_keys::find_tag_number(&tags, KEYS_TRACK_NUMBER) {
      item.set(Attribute::Track, track_no as i64);
    }
    if let Some(date) = tag_keys::find_tag_value(&tags, KEYS_DATE) {
      if let Ok(year) = date[..4.min(date.len())].parse::<i64>() {
        item.set(Attribute::Year, year);
      }
    }

    Ok(())
  }
}

/// Video (and, as a fallback, exotic audio) probing via `ffmpeg-next`. Best
/// effort throughout: a container with no decodable video stream still
/// yields whatever audio/container-level attributes are available rather
/// than failing the whole extraction.
pub struct VideoPipelineExtractor {
  force_sw_decoders: bool,
}

impl VideoPipelineExtractor {
  pub fn new(force_sw_decoders: bool) -> Self {
    if let Err(e) = ffmpeg::init() {
      tracing::warn!("ffmpeg init failed, video probing will be degraded: {e}");
    }
    Self { force_sw_decoders }
  }
}

impl Default for VideoPipelineExtractor {
  fn default() -> Self {
    Self::new(false)
  }
}

impl MetadataExtractor for VideoPipelineExtractor {
  fn extract(
    &self,
    path: &Path,
    thumbnail_dir: &Path,
    item: &mut MediaItem,
    expand: bool,
  ) -> Result<(), CoreError> {
    let context = ffmpeg::format::input(&path).map_err(|e| CoreError::Extract(format!("ffmpeg open failed: {e}")))?;

    let tags: HashMap<String, String> =
      context.metadata().iter().map(|(k, v)| (k.to_lowercase(), v.to_string())).collect();

    if let Some(title) = tag_keys::find_tag_value(&tags, KEYS_TITLE) {
      item.set(Attribute::Title, title.to_string());
    }

    let duration_micros = context.duration();
    if duration_micros > 0 {
      item.set(Attribute::Duration, duration_micros / 1_000_000);
    }
    if context.bit_rate() > 0 {
      item.set(Attribute::BitRate, (context.bit_rate() / 1000) as i64);
    }

    if let Some(stream) = context.streams().best(ffmpeg::media::Type::Video) {
      if let Ok(ctx) = ffmpeg::codec::context::Context::from_parameters(stream.parameters()) {
        if let Ok(decoder) = ctx.decoder().video() {
          item.set(Attribute::Width, decoder.width() as i64);
          item.set(Attribute::Height, decoder.height() as i64);
          item.set(Attribute::VideoCodec, format!("{:?}", decoder.id()));
          let frame_rate = stream.rate();
          if frame_rate.denominator() > 0 {
            item.set(Attribute::FrameRate, (frame_rate.numerator() / frame_rate.denominator()) as i64);
          }
        }
      }
    }

    if let Some(stream) = context.streams().best(ffmpeg::media::Type::Audio) {
      if let Ok(ctx) = ffmpeg::codec::context::Context::from_parameters(stream.parameters()) {
        if let Ok(decoder) = ctx.decoder().audio() {
          item.set(Attribute::SampleRate, decoder.rate() as i64);
          item.set(Attribute::Channels, decoder.channels() as i64);
        }
      }
    }

    if !expand {
      return Ok(());
    }

    if let Some(artist) = tag_keys::find_tag_value(&tags, KEYS_ARTIST) {
      item.set(Attribute::Artist, artist.to_string());
    }
    if let Some(genre) = tag_keys::find_tag_value(&tags, KEYS_GENRE) {
      item.set(Attribute::Genre, genre.to_string());
    }

    // Thumbnailing (a decoded frame snapshot) is a further decode step this
    // baseline extractor does not attempt; `force_sw_decoders` governs that
    // future decoder selection once it's added.
    let _ = (thumbnail_dir, self.force_sw_decoders);

    Ok(())
  }
}
