//! In-memory `DocumentStore` used by the tests. Keeps documents of each
//! collection in insertion order, which serves as the "natural" order.

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Collection, DbError, DocumentStore, Filter, Update};


#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

fn matches(doc: &Document, filter: &Filter) -> bool {
    let id = doc.get_object_id("_id").ok();
    match filter {
        Filter::All => true,
        Filter::Id(expected) => id == Some(*expected),
        Filter::IdIn(ids) => id.is_some_and(|id| ids.contains(&id)),
    }
}

fn array_field<'a>(doc: &'a mut Document, field: &str) -> Result<&'a mut Vec<Bson>, DbError> {
    if !doc.contains_key(field) {
        doc.insert(field, Bson::Array(vec![]));
    }
    match doc.get_mut(field) {
        Some(Bson::Array(arr)) => Ok(arr),
        _ => Err(DbError::Rejected(format!("field '{field}' is not an array"))),
    }
}

fn apply(doc: &mut Document, update: Update) -> Result<(), DbError> {
    match update {
        Update::Set(fields) => {
            if fields.contains_key("_id") {
                return Err(DbError::Rejected("field '_id' is immutable".into()));
            }
            for (key, value) in fields {
                doc.insert(key, value);
            }
        }
        Update::Push { field, value } => array_field(doc, field)?.push(value),
        Update::PullOne { field, value } => {
            let arr = array_field(doc, field)?;
            if let Some(pos) = arr.iter().position(|v| *v == value) {
                arr.remove(pos);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: Collection, filter: Filter) -> Result<Vec<Document>, DbError> {
        let collections = self.collections.read().await;
        let docs = collections.get(&collection)
            .map(|docs| docs.iter().filter(|d| matches(d, &filter)).cloned().collect())
            .unwrap_or_default();
        Ok(docs)
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: Filter,
    ) -> Result<Option<Document>, DbError> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).and_then(|docs| {
            docs.iter().find(|d| matches(d, &filter)).cloned()
        }))
    }

    async fn insert_one(
        &self,
        collection: Collection,
        mut doc: Document,
    ) -> Result<ObjectId, DbError> {
        let id = match doc.get("_id") {
            None => ObjectId::new(),
            Some(Bson::ObjectId(id)) => *id,
            Some(other) => return Err(DbError::InvalidId(other.clone())),
        };
        doc.insert("_id", id);

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        if docs.iter().any(|d| matches(d, &Filter::Id(id))) {
            return Err(DbError::Rejected(format!("duplicate key: {id}")));
        }
        docs.push(doc);

        Ok(id)
    }

    async fn find_one_and_update(
        &self,
        collection: Collection,
        id: ObjectId,
        update: Update,
    ) -> Result<Option<Document>, DbError> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections.get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| matches(d, &Filter::Id(id))))
        else {
            return Ok(None);
        };

        // Apply to a copy so that a rejected update leaves the stored document
        // unchanged.
        let mut updated = doc.clone();
        apply(&mut updated, update)?;
        *doc = updated.clone();

        Ok(Some(updated))
    }

    async fn delete_one(&self, collection: Collection, id: ObjectId) -> Result<bool, DbError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(false);
        };

        match docs.iter().position(|d| matches(d, &Filter::Id(id))) {
            Some(pos) => {
                docs.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use mongodb::bson::{doc, oid::ObjectId, Bson};

    use crate::db::{Collection, DbError, DocumentStore, Filter, Update};
    use super::MemoryStore;

    #[tokio::test]
    async fn insert_assigns_ids_and_keeps_order() -> Result<(), DbError> {
        let store = MemoryStore::default();
        let a = store.insert_one(Collection::Post, doc! { "content": "a" }).await?;
        let b = store.insert_one(Collection::Post, doc! { "content": "b" }).await?;
        assert_ne!(a, b);

        let all = store.find(Collection::Post, Filter::All).await?;
        let contents = all.iter().map(|d| d.get_str("content").unwrap()).collect::<Vec<_>>();
        assert_eq!(contents, ["a", "b"]);

        // Collections are independent.
        assert!(store.find(Collection::User, Filter::All).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn id_in_skips_missing() -> Result<(), DbError> {
        let store = MemoryStore::default();
        let a = store.insert_one(Collection::Comment, doc! { "text": "a" }).await?;
        let b = store.insert_one(Collection::Comment, doc! { "text": "b" }).await?;

        let found = store.find(Collection::Comment, Filter::IdIn(vec![b, ObjectId::new(), a])).await?;
        assert_eq!(found.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn pull_one_removes_single_occurrence() -> Result<(), DbError> {
        let store = MemoryStore::default();
        let post = store.insert_one(Collection::Post, doc! { "likes": [] }).await?;
        let user = Bson::ObjectId(ObjectId::new());

        for _ in 0..2 {
            let push = Update::Push { field: "likes", value: user.clone() };
            store.find_one_and_update(Collection::Post, post, push).await?;
        }
        let pull = Update::PullOne { field: "likes", value: user.clone() };
        let after = store.find_one_and_update(Collection::Post, post, pull).await?.unwrap();
        assert_eq!(after.get_array("likes").unwrap(), &vec![user]);
        Ok(())
    }

    #[tokio::test]
    async fn update_and_delete_missing() -> Result<(), DbError> {
        let store = MemoryStore::default();
        let id = ObjectId::new();
        let set = Update::Set(doc! { "text": "x" });
        assert_eq!(store.find_one_and_update(Collection::Comment, id, set).await?, None);
        assert!(!store.delete_one(Collection::Comment, id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn set_rejects_id() -> Result<(), DbError> {
        let store = MemoryStore::default();
        let id = store.insert_one(Collection::User, doc! { "name": "a" }).await?;
        let set = Update::Set(doc! { "_id": ObjectId::new(), "name": "b" });
        assert!(store.find_one_and_update(Collection::User, id, set).await.is_err());

        let stored = store.find_one(Collection::User, Filter::Id(id)).await?.unwrap();
        assert_eq!(stored.get_str("name").unwrap(), "a");
        Ok(())
    }
}
