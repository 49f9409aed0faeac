//! Remote record store contract.

use crate::remote::document::Document;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Document collection addressed by the session core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    Users,
    Households,
    Categories,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Households => "households",
            Self::Categories => "categories",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transient transport failure.
    Network(String),
    /// `update_record` on a document that does not exist.
    NotFound { kind: RecordKind, id: String },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(f, "record store unreachable: {message}"),
            Self::NotFound { kind, id } => {
                write!(f, "record not found: {}/{id}", kind.as_str())
            }
        }
    }
}

impl Error for StoreError {}

/// Document store keyed by `(kind, id)`.
///
/// No transactions: multi-document writes are sequential independent calls.
pub trait RecordStore: Send + Sync {
    fn get_record(&self, kind: RecordKind, id: &str) -> StoreResult<Option<Document>>;
    /// Creates or replaces the whole document.
    fn set_record(&self, kind: RecordKind, id: &str, fields: Document) -> StoreResult<()>;
    /// Merges top-level fields into an existing document.
    fn update_record(&self, kind: RecordKind, id: &str, partial_fields: Document)
        -> StoreResult<()>;
    /// Documents of `kind` whose string `field` equals `value`, as `(id, document)`.
    fn query_records(
        &self,
        kind: RecordKind,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<(String, Document)>>;
}
