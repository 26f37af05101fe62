use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use futures::stream::{self, Stream};
use tokio::fs::{self, ReadDir};

// Platform-specific file identity, used to break symlink cycles.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FileId(u64, u64);

#[cfg(unix)]
fn get_file_id(meta: &std::fs::Metadata) -> FileId {
  use std::os::unix::fs::MetadataExt;
  FileId(meta.dev(), meta.ino())
}

#[cfg(windows)]
fn get_file_id(meta: &std::fs::Metadata) -> FileId {
  use std::os::windows::fs::MetadataExt;
  FileId(meta.volume_serial_number().unwrap_or(0) as u64, meta.file_index().unwrap_or(0))
}

#[cfg(not(any(unix, windows)))]
fn get_file_id(_meta: &std::fs::Metadata) -> FileId {
  FileId(0, 0)
}

#[derive(Debug, Clone)]
pub struct WalkConfig {
  pub follow_symlinks: bool,
  pub max_depth: usize,
  /// Dedup visited directories; should be true whenever follow_symlinks is.
  pub dedup_dirs: bool,
}

impl Default for WalkConfig {
  fn default() -> Self {
    Self { follow_symlinks: false, max_depth: 100, dedup_dirs: true }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filtering {
  /// Skip this entry, but still descend if it is a directory.
  Ignore,
  /// Skip this entry and do not descend into it.
  IgnoreDir,
  Continue,
}

#[derive(Debug)]
pub struct WalkEntry {
  pub path: PathBuf,
  pub depth: usize,
  /// File type from `lstat` — a symlink reports as a symlink.
  pub file_type: std::fs::FileType,
}

impl WalkEntry {
  pub fn path(&self) -> &Path {
    &self.path
  }
}

enum Frame {
  /// About to open a directory.
  Pending { path: PathBuf, depth: usize, id_hint: Option<FileId> },
  /// Iterating an already-open directory.
  Open { rd: ReadDir, depth: usize },
}

/// Recursively walks `root`, emitting every entry unfiltered.
pub fn walk(
  root: impl Into<PathBuf>,
  cfg: WalkConfig,
) -> impl Stream<Item = io::Result<WalkEntry>> {
  walk_filtered(root, cfg, |_| async { Filtering::Continue })
}

/// Recursively walks `root`, applying `filter` to each entry before it is
/// yielded. The filter also controls whether directories are descended into.
pub fn walk_filtered<F, Fut>(
  root: impl Into<PathBuf>,
  cfg: WalkConfig,
  filter: F,
) -> impl Stream<Item = io::Result<WalkEntry>>
where
  F: FnMut(&WalkEntry) -> Fut + Send + 'static,
  Fut: Future<Output = Filtering> + Send,
{
  let root = root.into();
  let mut stack = Vec::with_capacity(16);
  stack.push(Frame::Pending { path: root, depth: 0, id_hint: None });

  let visited = HashSet::new();
  let state = (stack, visited, cfg, filter);

  stream::unfold(state, |(mut stack, mut visited, cfg, mut filter)| async move {
    loop {
      let top = stack.last_mut()?;

      match top {
        Frame::Pending { path, depth, id_hint } => {
          let path = path.clone();
          let depth = *depth;
          let id_hint = *id_hint;

          stack.pop();

          if depth > cfg.max_depth {
            continue;
          }

          if cfg.dedup_dirs {
            let file_id = match id_hint {
              Some(id) => Some(id),
              None => match fs::metadata(&path).await {
                Ok(m) => {
                  if m.is_dir() {
                    Some(get_file_id(&m))
                  } else {
                    None
                  }
                }
                Err(e) => {
                  return Some((Err(e), (stack, visited, cfg, filter)));
                }
              },
            };

            if let Some(id) = file_id {
              if !visited.insert(id) {
                continue;
              }
            }
          }

          match fs::read_dir(&path).await {
            Ok(rd) => {
              stack.push(Frame::Open { rd, depth });
            }
            Err(e) => {
              return Some((Err(e), (stack, visited, cfg, filter)));
            }
          }
        }

        Frame::Open { rd, depth } => {
          let depth = *depth;

          match rd.next_entry().await {
            Ok(Some(entry)) => {
              let path = entry.path();

              let ft = match entry.file_type().await {
                Ok(ft) => ft,
                Err(e) => return Some((Err(e), (stack, visited, cfg, filter))),
              };

              let entry_depth = depth + 1;
              let walk_entry = WalkEntry { path: path.clone(), depth: entry_depth, file_type: ft };

              let filtering = filter(&walk_entry).await;

              let recurse = filtering != Filtering::IgnoreDir && entry_depth <= cfg.max_depth;
              let mut pending_frame = None;

              if recurse {
                if ft.is_dir() {
                  pending_frame = Some(Frame::Pending { path, depth: entry_depth, id_hint: None });
                } else if ft.is_symlink() && cfg.follow_symlinks {
                  match fs::metadata(&walk_entry.path).await {
                    Ok(m) if m.is_dir() => {
                      let id = if cfg.dedup_dirs { Some(get_file_id(&m)) } else { None };
                      pending_frame =
                        Some(Frame::Pending { path, depth: entry_depth, id_hint: id });
                    }
                    _ => {}
                  }
                }
              }

              if let Some(frame) = pending_frame {
                stack.push(frame);
              }

              match filtering {
                Filtering::Continue => {
                  return Some((Ok(walk_entry), (stack, visited, cfg, filter)));
                }
                _ => continue,
              }
            }
            Ok(None) => {
              stack.pop();
            }
            Err(e) => {
              stack.pop();
              return Some((Err(e), (stack, visited, cfg, filter)));
            }
          }
        }
      }
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::StreamExt;

  #[tokio::test]
  async fn walks_nested_directories() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("a/b")).unwrap();
    std::fs::write(tmp.path().join("a/b/song.mp3"), b"x").unwrap();
    std::fs::write(tmp.path().join("a/.hidden"), b"x").unwrap();

    let entries: Vec<_> = walk(tmp.path(), WalkConfig::default())
      .filter_map(|r| async move { r.ok() })
      .collect()
      .await;

    assert!(entries.iter().any(|e| e.path.ends_with("a/b/song.mp3")));
  }

  #[tokio::test]
  async fn ignore_dir_skips_subtree() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("skip/inner")).unwrap();
    std::fs::write(tmp.path().join("skip/inner/f.txt"), b"x").unwrap();

    let entries: Vec<_> = walk_filtered(tmp.path(), WalkConfig::default(), |e| async move {
      if e.path.ends_with("skip") { Filtering::IgnoreDir } else { Filtering::Continue }
    })
    .filter_map(|r| async move { r.ok() })
    .collect()
    .await;

    assert!(!entries.iter().any(|e| e.path.ends_with("inner/f.txt")));
  }
}
