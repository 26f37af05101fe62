use mindexer_core::ports::{DocumentDb, WhereClause};
use mindexer_core::{CoreError, Device, MediaItem, MediaType};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

fn kind_id(t: MediaType) -> &'static str {
  t.kind_id()
}

fn item_to_row(item: &MediaItem) -> Value {
  let mut attrs = serde_json::Map::new();
  for (attr, value) in &item.attributes {
    attrs.insert(format!("{attr:?}"), serde_json::to_value(value).unwrap_or(Value::Null));
  }
  json!({
    "uri": item.uri,
    "device_uri": item.device_uri,
    "hash": item.fingerprint,
    "mime": item.mime,
    "thumbnail": item.thumbnail_name,
    "file_size": item.file_size,
    "dirty": false,
    "attributes": attrs,
  })
}

#[derive(Default)]
struct DeviceBuffers {
  /// Rows queued for `put`, grouped by kind, for a device still on its
  /// first scan.
  first_scan: HashMap<&'static str, Vec<Value>>,
  /// Uris queued for an unflag-dirty merge during a rescan.
  rescan_unflag: Vec<(&'static str, String)>,
  /// Uris queued for deletion.
  remove: Vec<(&'static str, String)>,
}

/// Batches writes to the external document database per device, flushing
/// at a fixed batch size or on an explicit signal from the device (it has
/// enough dirty/pending-removal rows buffered to warrant not waiting).
pub struct DbSyncLayer {
  db: Arc<dyn DocumentDb>,
  flush_count: usize,
  buffers: Mutex<HashMap<String, DeviceBuffers>>,
}

impl DbSyncLayer {
  pub fn new(db: Arc<dyn DocumentDb>, flush_count: usize) -> Self {
    Self { db, flush_count, buffers: Mutex::new(HashMap::new()) }
  }

  pub async fn ensure_kinds(&self) -> Result<(), CoreError> {
    for t in MediaType::ALL {
      self.db.ensure_kind(kind_id(t), &["uri", "device_uri", "dirty"]).await?;
    }
    Ok(())
  }

  /// Marks every row belonging to `device` dirty — the pre-pass run before
  /// a rescan starts, so anything not re-confirmed by the walk is left
  /// flagged for cleanup.
  pub async fn mark_dirty(&self, device: &Device) -> Result<(), CoreError> {
    for t in MediaType::ALL {
      self
        .db
        .merge(kind_id(t), &[WhereClause::like("device_uri", device.uri.clone())], json!({"dirty": true}))
        .await?;
    }
    Ok(())
  }

  /// Buffers `item` for write. New-mounted devices buffer into the
  /// first-scan `put` batch; rescans instead queue an unflag-dirty merge,
  /// since the row already exists and has just been confirmed unchanged or
  /// been re-extracted.
  pub async fn put_meta(&self, device: &Device, item: &MediaItem) -> Result<(), CoreError> {
    let flush_now;
    {
      let mut buffers = self.buffers.lock().unwrap();
      let buf = buffers.entry(device.uri.clone()).or_default();
      if device.new_mounted() {
        buf.first_scan.entry(kind_id(item.media_type)).or_default().push(item_to_row(item));
        flush_now = buf.first_scan.values().map(Vec::len).sum::<usize>() >= self.flush_count;
      } else {
        buf.rescan_unflag.push((kind_id(item.media_type), item.uri.clone()));
        flush_now = buf.rescan_unflag.len() >= self.flush_count;
      }
    }
    if flush_now {
      self.flush_put(device).await?;
      self.flush_unflag_dirty(device).await?;
    }
    Ok(())
  }

  /// Queues `item_uri` for deletion. Counted against the device's
  /// request-side removal counter immediately, at buffer time — the
  /// matching ack-side counter only advances once the batch this falls
  /// into is actually flushed, in `flush_delete_items`.
  pub async fn queue_remove(&self, device: &Device, item_uri: String, t: MediaType) -> Result<(), CoreError> {
    let flush_now;
    {
      let mut buffers = self.buffers.lock().unwrap();
      let buf = buffers.entry(device.uri.clone()).or_default();
      buf.remove.push((kind_id(t), item_uri));
      flush_now = buf.remove.len() >= self.flush_count;
    }
    device.increment_remove_requested(1);
    if flush_now {
      self.flush_delete_items(device).await?;
    }
    Ok(())
  }

  /// Buffers an unflag-dirty merge for a single uri re-confirmed unchanged
  /// during a rescan, without a full `MediaItem` to hand `put_meta`.
  pub async fn confirm_unchanged(&self, device: &Device, item_uri: String, t: MediaType) -> Result<(), CoreError> {
    let flush_now;
    {
      let mut buffers = self.buffers.lock().unwrap();
      let buf = buffers.entry(device.uri.clone()).or_default();
      buf.rescan_unflag.push((kind_id(t), item_uri));
      flush_now = buf.rescan_unflag.len() >= self.flush_count;
    }
    if flush_now {
      self.flush_unflag_dirty(device).await?;
    }
    Ok(())
  }

  pub async fn flush_put(&self, device: &Device) -> Result<(), CoreError> {
    let batch = {
      let mut buffers = self.buffers.lock().unwrap();
      let buf = buffers.entry(device.uri.clone()).or_default();
      std::mem::take(&mut buf.first_scan)
    };

    let mut total = 0u64;
    for (kind, rows) in batch {
      if rows.is_empty() {
        continue;
      }
      total += rows.len() as u64;
      self.db.put(kind, rows).await?;
    }
    if total > 0 {
      device.increment_put(total);
    }
    Ok(())
  }

  pub async fn flush_unflag_dirty(&self, device: &Device) -> Result<(), CoreError> {
    let batch = {
      let mut buffers = self.buffers.lock().unwrap();
      let buf = buffers.entry(device.uri.clone()).or_default();
      std::mem::take(&mut buf.rescan_unflag)
    };

    for (kind, uri) in &batch {
      self.db.merge(kind, &[WhereClause::eq("uri", uri.clone())], json!({"dirty": false})).await?;
    }
    if !batch.is_empty() {
      device.increment_dirty_cleared(batch.len() as u64);
    }
    Ok(())
  }

  pub async fn flush_delete_items(&self, device: &Device) -> Result<(), CoreError> {
    let batch = {
      let mut buffers = self.buffers.lock().unwrap();
      let buf = buffers.entry(device.uri.clone()).or_default();
      std::mem::take(&mut buf.remove)
    };

    for (kind, uri) in &batch {
      self.db.del(kind, &[WhereClause::eq("uri", uri.clone())]).await?;
    }
    if !batch.is_empty() {
      device.increment_removed_total(batch.len() as u64);
    }
    Ok(())
  }

  /// Searches every kind for rows still marked dirty under `device`'s uri —
  /// the set the cleanup task deletes once a scan has fully settled.
  pub async fn find_dirty(&self, device: &Device) -> Result<Vec<(MediaType, Value)>, CoreError> {
    let mut out = Vec::new();
    for t in MediaType::ALL {
      let rows = self
        .db
        .find(kind_id(t), &[WhereClause::like("device_uri", device.uri.clone()), WhereClause::eq("dirty", true)])
        .await?;
      out.extend(rows.into_iter().map(|r| (t, r)));
    }
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory_adapter::InMemoryDocumentDb;
  use mindexer_core::{Attribute, ExtractorKind};

  fn sample_item(uri: &str) -> MediaItem {
    let mut item = MediaItem::new(uri, "storage:///mnt/x", "mp3", MediaType::Audio, ExtractorKind::TagExtractor, 1, 10);
    item.set(Attribute::Title, "song");
    item
  }

  #[tokio::test]
  async fn first_scan_items_flush_as_a_put_batch() {
    let db = Arc::new(InMemoryDocumentDb::new());
    let sync = DbSyncLayer::new(db.clone(), 2);
    let device = Device::new("storage:///mnt/x", "/mnt/x", "uuid-1");

    sync.put_meta(&device, &sample_item("storage:///mnt/x/a.mp3")).await.unwrap();
    sync.put_meta(&device, &sample_item("storage:///mnt/x/b.mp3")).await.unwrap();

    assert_eq!(device.with_counters(|c| c.total_put), 2);
  }

  #[tokio::test]
  async fn rescan_items_flush_as_unflag_dirty() {
    let db = Arc::new(InMemoryDocumentDb::new());
    let sync = DbSyncLayer::new(db.clone(), 1);
    let device = Device::new("storage:///mnt/x", "/mnt/x", "uuid-2");
    device.begin_scan();
    device.begin_parsing();

    sync.put_meta(&device, &sample_item("storage:///mnt/x/a.mp3")).await.unwrap();
    assert_eq!(device.with_counters(|c| c.total_dirty_cleared), 1);
  }

  #[tokio::test]
  async fn confirm_unchanged_clears_the_dirty_flag_without_a_full_item() {
    let db = Arc::new(InMemoryDocumentDb::new());
    let sync = DbSyncLayer::new(db.clone(), 1);
    let device = Device::new("storage:///mnt/x", "/mnt/x", "uuid-3");

    sync.put_meta(&device, &sample_item("storage:///mnt/x/a.mp3")).await.unwrap();
    db.merge(
      kind_id(MediaType::Audio),
      &[WhereClause::eq("uri", "storage:///mnt/x/a.mp3".to_string())],
      json!({"dirty": true}),
    )
    .await
    .unwrap();

    sync.confirm_unchanged(&device, "storage:///mnt/x/a.mp3".to_string(), MediaType::Audio).await.unwrap();
    assert_eq!(device.with_counters(|c| c.total_dirty_cleared), 1);

    let dirty = sync.find_dirty(&device).await.unwrap();
    assert!(dirty.is_empty(), "confirmed-unchanged row should no longer be dirty");
  }

  #[tokio::test]
  async fn queue_remove_counts_the_request_immediately_but_the_ack_only_on_flush() {
    let db = Arc::new(InMemoryDocumentDb::new());
    let sync = DbSyncLayer::new(db, 100);
    let device = Device::new("storage:///mnt/x", "/mnt/x", "uuid-4");
    device.begin_scan();
    device.begin_parsing();

    sync.queue_remove(&device, "storage:///mnt/x/b.mp3".to_string(), MediaType::Audio).await.unwrap();
    assert_eq!(device.with_counters(|c| c.total_remove_requested), 1);
    assert!(!device.processing_done(), "removal requested but not yet acknowledged");

    sync.flush_delete_items(&device).await.unwrap();
    assert!(device.processing_done());
  }
}
