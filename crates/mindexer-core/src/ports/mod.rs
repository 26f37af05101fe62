pub mod document_db;
pub mod extractor;
pub mod observer;
pub mod plugin;

pub use document_db::{BatchOp, DocumentDb, Grant, SearchQuery, SearchResult, WhereClause, WhereOp};
pub use extractor::MetadataExtractor;
pub use observer::{DeviceObserver, MediaItemObserver};
pub use plugin::Plugin;
