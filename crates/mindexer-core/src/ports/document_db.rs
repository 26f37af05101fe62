use crate::errors::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{prop, op, val}` — the only two comparisons the external document
/// database understands: equality and substring/prefix match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
  pub prop: String,
  pub op: WhereOp,
  pub val: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhereOp {
  #[serde(rename = "=")]
  Eq,
  #[serde(rename = "%")]
  Like,
}

impl WhereClause {
  pub fn eq(prop: impl Into<String>, val: impl Into<Value>) -> Self {
    Self { prop: prop.into(), op: WhereOp::Eq, val: val.into() }
  }

  pub fn like(prop: impl Into<String>, val: impl Into<Value>) -> Self {
    Self { prop: prop.into(), op: WhereOp::Like, val: val.into() }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
  pub where_: Vec<WhereClause>,
  pub select: Option<Vec<String>>,
  pub limit: Option<u32>,
  pub page: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
  pub rows: Vec<Value>,
  pub next_page: Option<String>,
}

/// One operation inside an atomic `batch` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchOp {
  Merge { kind_id: String, where_: Vec<WhereClause>, props: Value },
  Del { kind_id: String, where_: Vec<WhereClause> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
  pub caller_id: String,
  pub read: bool,
  pub update: bool,
}

/// Contract of the external JSON document database. The DB service itself,
/// its transport, and its persistence are out of scope — this crate only
/// needs the shape of the calls it makes against it.
#[async_trait::async_trait]
pub trait DocumentDb: Send + Sync {
  /// Idempotent: declares a kind and the properties it should be indexed by.
  async fn ensure_kind(&self, kind_id: &str, indexes: &[&str]) -> Result<(), CoreError>;

  async fn find(&self, kind_id: &str, where_: &[WhereClause]) -> Result<Vec<Value>, CoreError>;

  /// Updates matching rows in place; a no-op (not an error) if nothing
  /// matches.
  async fn merge(
    &self,
    kind_id: &str,
    where_: &[WhereClause],
    props: Value,
  ) -> Result<usize, CoreError>;

  /// Bulk create; returns the assigned row ids.
  async fn put(&self, kind_id: &str, rows: Vec<Value>) -> Result<Vec<String>, CoreError>;

  /// Applies every operation as a single atomic sequence.
  async fn batch(&self, ops: Vec<BatchOp>) -> Result<(), CoreError>;

  async fn search(&self, kind_id: &str, query: SearchQuery) -> Result<SearchResult, CoreError>;

  async fn del(&self, kind_id: &str, where_: &[WhereClause]) -> Result<usize, CoreError>;

  async fn put_permissions(&self, kind_id: &str, grants: &[Grant]) -> Result<(), CoreError>;
}
