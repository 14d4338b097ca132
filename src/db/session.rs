use mongodb::bson::{self, oid::ObjectId, Document};
use serde::de::DeserializeOwned;
use std::sync::{Arc, atomic::{AtomicU32, Ordering}};

use crate::prelude::*;
use super::{Collection, DbError, DocumentStore, Filter, Update};


/// A type stored as one document in a specific collection.
pub(crate) trait Record: DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;
}

/// Store access for one API request.
///
/// All requests share the same underlying store. The session only adds
/// logging, decoding into [`Record`] types and counting of store operations.
pub(crate) struct Session {
    store: Arc<dyn DocumentStore>,
    num_ops: AtomicU32,
}

impl Session {
    pub(crate) fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store, num_ops: AtomicU32::new(0) }
    }

    pub(crate) fn num_ops(&self) -> u32 {
        self.num_ops.load(Ordering::SeqCst)
    }

    fn increase_num_ops(&self) {
        self.num_ops.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns every record of `T`'s collection.
    pub(crate) async fn load_all<T: Record>(&self) -> Result<Vec<T>, DbError> {
        self.find(T::COLLECTION, Filter::All).await?
            .into_iter()
            .map(|doc| bson::from_document(doc).map_err(DbError::from))
            .collect()
    }

    pub(crate) async fn load_by_id<T: Record>(&self, id: ObjectId) -> Result<Option<T>, DbError> {
        trace!(collection = %T::COLLECTION, %id, "Executing find_one");
        self.increase_num_ops();
        self.store.find_one(T::COLLECTION, Filter::Id(id)).await?
            .map(bson::from_document)
            .transpose()
            .map_err(DbError::from)
    }

    /// Returns all records whose id is in `ids`, in store order. Ids without
    /// matching record are skipped.
    pub(crate) async fn load_by_ids<T: Record>(&self, ids: &[ObjectId]) -> Result<Vec<T>, DbError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.find(T::COLLECTION, Filter::IdIn(ids.to_vec())).await?
            .into_iter()
            .map(|doc| bson::from_document(doc).map_err(DbError::from))
            .collect()
    }

    /// Inserts a new document into `T`'s collection and returns its id.
    pub(crate) async fn insert<T: Record>(&self, doc: Document) -> Result<ObjectId, DbError> {
        trace!(collection = %T::COLLECTION, ?doc, "Executing insert_one");
        self.increase_num_ops();
        self.store.insert_one(T::COLLECTION, doc).await
    }

    /// Applies `update` and returns the record after the update, or `None`
    /// if no record with `id` exists. An empty `Set` just loads the record.
    pub(crate) async fn update<T: Record>(
        &self,
        id: ObjectId,
        update: Update,
    ) -> Result<Option<T>, DbError> {
        if matches!(&update, Update::Set(fields) if fields.is_empty()) {
            return self.load_by_id(id).await;
        }

        trace!(collection = %T::COLLECTION, %id, ?update, "Executing find_one_and_update");
        self.increase_num_ops();
        self.store.find_one_and_update(T::COLLECTION, id, update).await?
            .map(bson::from_document)
            .transpose()
            .map_err(DbError::from)
    }

    /// Returns whether a record was deleted.
    pub(crate) async fn delete<T: Record>(&self, id: ObjectId) -> Result<bool, DbError> {
        trace!(collection = %T::COLLECTION, %id, "Executing delete_one");
        self.increase_num_ops();
        self.store.delete_one(T::COLLECTION, id).await
    }

    async fn find(&self, collection: Collection, filter: Filter) -> Result<Vec<Document>, DbError> {
        trace!(%collection, ?filter, "Executing find");
        self.increase_num_ops();
        self.store.find(collection, filter).await
    }
}
