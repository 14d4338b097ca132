use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};

use super::Collection;


/// Error returned by all store operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DbError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("failed to decode document: {0}")]
    Decode(#[from] mongodb::bson::de::Error),

    #[error("store returned a document without ObjectId `_id` (got {0})")]
    InvalidId(Bson),

    #[error("operation rejected by store: {0}")]
    Rejected(String),
}

/// Selects documents of a collection.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Filter {
    /// Every document.
    All,

    /// The document with this `_id`.
    Id(ObjectId),

    /// All documents whose `_id` is contained in the list.
    IdIn(Vec<ObjectId>),
}

/// Modification applied to a single document.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Update {
    /// Overwrites the given top-level fields, leaving all others untouched.
    Set(Document),

    /// Appends `value` to the array `field`, even if it is already contained.
    Push { field: &'static str, value: Bson },

    /// Removes the first occurrence of `value` from the array `field`. Other
    /// occurrences are kept.
    PullOne { field: &'static str, value: Bson },
}

/// A document database holding independent collections of records, addressed
/// by `ObjectId`.
///
/// Every method is a single, atomic store operation. Nothing spans more than
/// one document.
#[async_trait]
pub(crate) trait DocumentStore: Send + Sync {
    /// Returns all matching documents in the natural order of the store.
    async fn find(&self, collection: Collection, filter: Filter) -> Result<Vec<Document>, DbError>;

    async fn find_one(
        &self,
        collection: Collection,
        filter: Filter,
    ) -> Result<Option<Document>, DbError>;

    /// Inserts the document and returns the `_id` assigned by the store.
    async fn insert_one(&self, collection: Collection, doc: Document) -> Result<ObjectId, DbError>;

    /// Applies `update` to the document with the given id and returns the
    /// document as it is after the update, or `None` if it does not exist.
    async fn find_one_and_update(
        &self,
        collection: Collection,
        id: ObjectId,
        update: Update,
    ) -> Result<Option<Document>, DbError>;

    /// Returns `true` if a document was deleted.
    async fn delete_one(&self, collection: Collection, id: ObjectId) -> Result<bool, DbError>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<(), DbError>;
}
