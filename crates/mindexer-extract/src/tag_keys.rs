use std::collections::HashMap;

pub const KEYS_TITLE: &[&str] = &["title", "tit2", "inam", "\u{a9}nam", "name"];
pub const KEYS_ALBUM: &[&str] = &["album", "talb", "iprd", "\u{a9}alb"];
pub const KEYS_ARTIST: &[&str] = &["artist", "tpe1", "iart", "\u{a9}art", "auth"];
pub const KEYS_ALBUM_ARTIST: &[&str] = &["album_artist", "album artist", "albumartist", "tpe2", "aart"];
pub const KEYS_DATE: &[&str] =
  &["date", "year", "original_year", "originalyear", "releasedate", "tdrc", "tyer", "tdor", "\u{a9}day", "icrd"];
pub const KEYS_GENRE: &[&str] = &["genre", "tcon", "ignr", "\u{a9}gen"];
pub const KEYS_TRACK_NUMBER: &[&str] = &["track", "trck", "iprt", "itrk", "trkn"];
pub const KEYS_DISC_NUMBER: &[&str] = &["disc", "tpos", "disk"];

/// First non-empty value among `keys`. Assumes `tags` keys are lowercased.
pub fn find_tag_value<'a>(tags: &'a HashMap<String, String>, keys: &[&str]) -> Option<&'a str> {
  keys.iter().find_map(|key| tags.get(*key).map(|v| v.trim())).filter(|v| !v.is_empty())
}

/// Parses an integer tag that may come as `"1/12"` (track/disc style).
pub fn find_tag_number(tags: &HashMap<String, String>, keys: &[&str]) -> Option<u32> {
  find_tag_value(tags, keys).and_then(|raw| raw.split('/').next()).and_then(|token| token.trim().parse::<u32>().ok())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_track_over_total_format() {
    let mut tags = HashMap::new();
    tags.insert("track".to_string(), "3/12".to_string());
    assert_eq!(find_tag_number(&tags, KEYS_TRACK_NUMBER), Some(3));
  }

  #[test]
  fn blank_values_are_skipped_in_favor_of_the_next_key() {
    let mut tags = HashMap::new();
    tags.insert("title".to_string(), "  ".to_string());
    tags.insert("name".to_string(), "Real Title".to_string());
    assert_eq!(find_tag_value(&tags, KEYS_TITLE), Some("Real Title"));
  }
}
