use mindexer_core::ports::{BatchOp, DocumentDb, Grant, SearchQuery, SearchResult, WhereClause, WhereOp};
use mindexer_core::CoreError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory `DocumentDb` double used by orchestrator and integration tests.
/// Rows are plain JSON objects keyed by a generated id; `where` matching
/// supports the same two operators the real service does.
#[derive(Default)]
pub struct InMemoryDocumentDb {
  kinds: Mutex<HashMap<String, HashMap<String, Value>>>,
}

impl InMemoryDocumentDb {
  pub fn new() -> Self {
    Self::default()
  }

  fn matches(row: &Value, where_: &[WhereClause]) -> bool {
    where_.iter().all(|clause| {
      let Some(field) = row.get(&clause.prop) else { return false };
      match clause.op {
        WhereOp::Eq => field == &clause.val,
        WhereOp::Like => match (field.as_str(), clause.val.as_str()) {
          (Some(f), Some(v)) => f.contains(v),
          _ => false,
        },
      }
    })
  }
}

#[async_trait::async_trait]
impl DocumentDb for InMemoryDocumentDb {
  async fn ensure_kind(&self, kind_id: &str, _indexes: &[&str]) -> Result<(), CoreError> {
    self.kinds.lock().unwrap().entry(kind_id.to_string()).or_default();
    Ok(())
  }

  async fn find(&self, kind_id: &str, where_: &[WhereClause]) -> Result<Vec<Value>, CoreError> {
    let kinds = self.kinds.lock().unwrap();
    let Some(rows) = kinds.get(kind_id) else { return Ok(Vec::new()) };
    Ok(rows.values().filter(|r| Self::matches(r, where_)).cloned().collect())
  }

  async fn merge(&self, kind_id: &str, where_: &[WhereClause], props: Value) -> Result<usize, CoreError> {
    let mut kinds = self.kinds.lock().unwrap();
    let rows = kinds.entry(kind_id.to_string()).or_default();
    let mut count = 0;
    for row in rows.values_mut() {
      if Self::matches(row, where_) {
        if let (Value::Object(row_map), Value::Object(patch)) = (row, &props) {
          for (k, v) in patch {
            row_map.insert(k.clone(), v.clone());
          }
        }
        count += 1;
      }
    }
    Ok(count)
  }

  async fn put(&self, kind_id: &str, rows: Vec<Value>) -> Result<Vec<String>, CoreError> {
    let mut kinds = self.kinds.lock().unwrap();
    let table = kinds.entry(kind_id.to_string()).or_default();
    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
      let id = uuid::Uuid::new_v4().to_string();
      table.insert(id.clone(), row);
      ids.push(id);
    }
    Ok(ids)
  }

  async fn batch(&self, ops: Vec<BatchOp>) -> Result<(), CoreError> {
    for op in ops {
      match op {
        BatchOp::Merge { kind_id, where_, props } => {
          self.merge(&kind_id, &where_, props).await?;
        }
        BatchOp::Del { kind_id, where_ } => {
          self.del(&kind_id, &where_).await?;
        }
      }
    }
    Ok(())
  }

  async fn search(&self, kind_id: &str, query: SearchQuery) -> Result<SearchResult, CoreError> {
    let rows = self.find(kind_id, &query.where_).await?;
    let rows = match query.limit {
      Some(limit) => rows.into_iter().take(limit as usize).collect(),
      None => rows,
    };
    Ok(SearchResult { rows, next_page: None })
  }

  async fn del(&self, kind_id: &str, where_: &[WhereClause]) -> Result<usize, CoreError> {
    let mut kinds = self.kinds.lock().unwrap();
    let Some(rows) = kinds.get_mut(kind_id) else { return Ok(0) };
    let to_remove: Vec<String> =
      rows.iter().filter(|(_, r)| Self::matches(r, where_)).map(|(k, _)| k.clone()).collect();
    let count = to_remove.len();
    for id in to_remove {
      rows.remove(&id);
    }
    Ok(count)
  }

  async fn put_permissions(&self, _kind_id: &str, _grants: &[Grant]) -> Result<(), CoreError> {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test]
  async fn put_then_find_round_trips() {
    let db = InMemoryDocumentDb::new();
    db.put("audio", vec![json!({"uri": "a", "dirty": false})]).await.unwrap();

    let found = db.find("audio", &[WhereClause::eq("uri", "a")]).await.unwrap();
    assert_eq!(found.len(), 1);
  }

  #[tokio::test]
  async fn merge_updates_matching_rows_only() {
    let db = InMemoryDocumentDb::new();
    db.put("audio", vec![json!({"uri": "a", "dirty": false}), json!({"uri": "b", "dirty": false})])
      .await
      .unwrap();

    let count =
      db.merge("audio", &[WhereClause::eq("uri", "a")], json!({"dirty": true})).await.unwrap();
    assert_eq!(count, 1);

    let dirty = db.find("audio", &[WhereClause::eq("dirty", true)]).await.unwrap();
    assert_eq!(dirty.len(), 1);
  }

  #[tokio::test]
  async fn like_matches_substrings() {
    let db = InMemoryDocumentDb::new();
    db.put("audio", vec![json!({"uri": "storage:///mnt/x/a.mp3"})]).await.unwrap();

    let found = db.find("audio", &[WhereClause::like("uri", "mnt/x")]).await.unwrap();
    assert_eq!(found.len(), 1);
  }
}
