use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Writes `contents` to `path` via a sibling temp file plus rename, so a
/// reader never observes a partially written file.
pub fn atomic_write_str(path: &Path, contents: &str) -> io::Result<()> {
  let tmp_path = path.with_extension("tmp");

  {
    let mut tmp_file = fs::File::create(&tmp_path)?;
    tmp_file.write_all(contents.as_bytes())?;
    tmp_file.sync_all()?;
  }

  fs::rename(&tmp_path, path)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn overwrites_existing_file_without_truncation_window() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cache.json");

    atomic_write_str(&path, "one").unwrap();
    atomic_write_str(&path, "two").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "two");
    assert!(!path.with_extension("tmp").exists());
  }
}
