use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    options::{ReturnDocument, UpdateModifications},
    Database,
};

use super::{Collection, DbError, DocumentStore, Filter, Update};


/// The production store, backed by a MongoDB database. Cheap to clone: the
/// underlying client is an internally pooled handle.
#[derive(Debug, Clone)]
pub(crate) struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub(crate) fn new(db: Database) -> Self {
        Self { db }
    }

    fn coll(&self, collection: Collection) -> mongodb::Collection<Document> {
        self.db.collection(collection.name())
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(&self, collection: Collection, filter: Filter) -> Result<Vec<Document>, DbError> {
        let docs = self.coll(collection)
            .find(filter_doc(&filter))
            .await?
            .try_collect()
            .await?;
        Ok(docs)
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: Filter,
    ) -> Result<Option<Document>, DbError> {
        Ok(self.coll(collection).find_one(filter_doc(&filter)).await?)
    }

    async fn insert_one(&self, collection: Collection, doc: Document) -> Result<ObjectId, DbError> {
        let result = self.coll(collection).insert_one(doc).await?;
        result.inserted_id.as_object_id().ok_or(DbError::InvalidId(result.inserted_id))
    }

    async fn find_one_and_update(
        &self,
        collection: Collection,
        id: ObjectId,
        update: Update,
    ) -> Result<Option<Document>, DbError> {
        let out = self.coll(collection)
            .find_one_and_update(filter_doc(&Filter::Id(id)), update_modifications(update))
            .return_document(ReturnDocument::After)
            .await?;
        Ok(out)
    }

    async fn delete_one(&self, collection: Collection, id: ObjectId) -> Result<bool, DbError> {
        let result = self.coll(collection).delete_one(filter_doc(&Filter::Id(id))).await?;
        Ok(result.deleted_count > 0)
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

fn filter_doc(filter: &Filter) -> Document {
    match filter {
        Filter::All => doc! {},
        Filter::Id(id) => doc! { "_id": *id },
        Filter::IdIn(ids) => doc! { "_id": { "$in": ids.clone() } },
    }
}

fn update_modifications(update: Update) -> UpdateModifications {
    match update {
        Update::Set(fields) => UpdateModifications::Document(doc! { "$set": fields }),
        Update::Push { field, value } => {
            let mut push = Document::new();
            push.insert(field, value);
            UpdateModifications::Document(doc! { "$push": push })
        }
        Update::PullOne { field, value } => {
            UpdateModifications::Pipeline(vec![pull_one_stage(field, value)])
        }
    }
}

/// `$pull` removes every occurrence, so removing just the first one needs an
/// aggregation pipeline update. Still a single atomic operation.
fn pull_one_stage(field: &str, value: Bson) -> Document {
    let without_first = doc! {
        "$let": {
            "vars": { "idx": { "$indexOfArray": ["$$arr", value] } },
            "in": {
                "$cond": [
                    { "$eq": ["$$idx", -1] },
                    "$$arr",
                    { "$concatArrays": [
                        { "$slice": ["$$arr", "$$idx"] },
                        { "$slice": ["$$arr", { "$add": ["$$idx", 1] }, { "$size": "$$arr" }] },
                    ] },
                ],
            },
        },
    };

    let mut set = Document::new();
    set.insert(field, doc! {
        "$let": {
            "vars": { "arr": { "$ifNull": [format!("${field}"), []] } },
            "in": without_first,
        },
    });
    doc! { "$set": set }
}
