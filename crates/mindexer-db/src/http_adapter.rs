use mindexer_core::ports::{BatchOp, DocumentDb, Grant, SearchQuery, SearchResult, WhereClause};
use mindexer_core::CoreError;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Production `DocumentDb` adapter. Speaks JSON over HTTP against the
/// external document database — the single "DB connector event loop" of the
/// original becomes, idiomatically, a plain async client on the shared
/// tokio runtime rather than a hand-rolled callback table.
pub struct HttpDocumentDb {
  client: reqwest::Client,
  base_url: String,
  timeout: Duration,
}

#[derive(Serialize)]
struct FindRequest<'a> {
  from: &'a str,
  #[serde(rename = "where")]
  where_: &'a [WhereClause],
}

#[derive(Serialize)]
struct MergeRequest<'a> {
  from: &'a str,
  #[serde(rename = "where")]
  where_: &'a [WhereClause],
  props: &'a Value,
}

#[derive(Serialize)]
struct PutRequest<'a> {
  objects: &'a [Value],
}

#[derive(Serialize)]
struct DelRequest<'a> {
  from: &'a str,
  #[serde(rename = "where")]
  where_: &'a [WhereClause],
}

impl HttpDocumentDb {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
    Self { client: reqwest::Client::new(), base_url: base_url.into(), timeout }
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url.trim_end_matches('/'), path)
  }

  async fn request_timed<T: serde::de::DeserializeOwned>(
    &self,
    path: &str,
    body: impl Serialize,
  ) -> Result<T, CoreError> {
    let fut = self.client.post(self.url(path)).json(&body).send();
    let resp = tokio::time::timeout(self.timeout, fut)
      .await
      .map_err(|_| CoreError::Db(format!("request to {path} timed out")))?
      .map_err(|e| CoreError::Db(e.to_string()))?;

    resp.error_for_status_ref().map_err(|e| CoreError::Db(e.to_string()))?;
    resp.json::<T>().await.map_err(|e| CoreError::Db(format!("decode response from {path}: {e}")))
  }
}

#[async_trait::async_trait]
impl DocumentDb for HttpDocumentDb {
  async fn ensure_kind(&self, kind_id: &str, indexes: &[&str]) -> Result<(), CoreError> {
    #[derive(Serialize)]
    struct Req<'a> {
      id: &'a str,
      index: &'a [&'a str],
    }
    let _: Value = self.request_timed("kind/ensure", Req { id: kind_id, index: indexes }).await?;
    Ok(())
  }

  async fn find(&self, kind_id: &str, where_: &[WhereClause]) -> Result<Vec<Value>, CoreError> {
    #[derive(serde::Deserialize)]
    struct Resp {
      results: Vec<Value>,
    }
    let resp: Resp = self.request_timed("find", FindRequest { from: kind_id, where_ }).await?;
    Ok(resp.results)
  }

  async fn merge(&self, kind_id: &str, where_: &[WhereClause], props: Value) -> Result<usize, CoreError> {
    #[derive(serde::Deserialize)]
    struct Resp {
      count: usize,
    }
    let resp: Resp =
      self.request_timed("merge", MergeRequest { from: kind_id, where_, props: &props }).await?;
    Ok(resp.count)
  }

  async fn put(&self, kind_id: &str, rows: Vec<Value>) -> Result<Vec<String>, CoreError> {
    #[derive(serde::Deserialize)]
    struct Resp {
      ids: Vec<String>,
    }
    let tagged: Vec<Value> = rows
      .into_iter()
      .map(|mut row| {
        if let Value::Object(map) = &mut row {
          map.insert("_kind".to_string(), Value::String(kind_id.to_string()));
        }
        row
      })
      .collect();
    let resp: Resp = self.request_timed("put", PutRequest { objects: &tagged }).await?;
    Ok(resp.ids)
  }

  async fn batch(&self, ops: Vec<BatchOp>) -> Result<(), CoreError> {
    let _: Value = self.request_timed("batch", ops).await?;
    Ok(())
  }

  async fn search(&self, kind_id: &str, query: SearchQuery) -> Result<SearchResult, CoreError> {
    #[derive(Serialize)]
    struct Req<'a> {
      from: &'a str,
      #[serde(flatten)]
      query: SearchQuery,
    }
    self.request_timed("search", Req { from: kind_id, query }).await
  }

  async fn del(&self, kind_id: &str, where_: &[WhereClause]) -> Result<usize, CoreError> {
    #[derive(serde::Deserialize)]
    struct Resp {
      count: usize,
    }
    let resp: Resp = self.request_timed("del", DelRequest { from: kind_id, where_ }).await?;
    Ok(resp.count)
  }

  async fn put_permissions(&self, kind_id: &str, grants: &[Grant]) -> Result<(), CoreError> {
    #[derive(Serialize)]
    struct Req<'a> {
      kind: &'a str,
      grants: &'a [Grant],
    }
    let _: Value = self.request_timed("permissions", Req { kind: kind_id, grants }).await?;
    Ok(())
  }
}
