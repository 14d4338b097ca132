use juniper::graphql_object;
use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::Deserialize;

use crate::{
    api::{Context, Id, err::{ApiResult, not_found}},
    db::{Collection, Record, Update},
};
use super::{post::Post, user::User};


#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Comment {
    #[serde(rename = "_id")]
    pub(crate) id: ObjectId,
    pub(crate) text: String,
    pub(crate) author: ObjectId,
    pub(crate) post: ObjectId,
}

impl Record for Comment {
    const COLLECTION: Collection = Collection::Comment;
}

#[graphql_object(Context = Context)]
impl Comment {
    fn id(&self) -> Id {
        self.id.into()
    }

    fn text(&self) -> &str {
        &self.text
    }

    async fn author(&self, context: &Context) -> ApiResult<Option<User>> {
        Ok(context.db.load_by_id(self.author).await?)
    }

    /// The post this comment was written on or `null` if it was deleted.
    async fn post(&self, context: &Context) -> ApiResult<Option<Post>> {
        Ok(context.db.load_by_id(self.post).await?)
    }
}

impl Comment {
    pub(crate) async fn load_all(context: &Context) -> ApiResult<Vec<Self>> {
        Ok(context.db.load_all().await?)
    }

    pub(crate) async fn load_by_id(id: Id, context: &Context) -> ApiResult<Self> {
        context.db.load_by_id(id.object_id()).await?
            .ok_or_else(|| not_found!(key = "comment.not-found", "Comment not found"))
    }

    /// Inserts a new comment. Neither the post nor the author get the comment
    /// added to their `comments` lists.
    ///
    /// The returned value is built from the arguments and is not re-read from
    /// the store.
    pub(crate) async fn create(
        text: String,
        author: Id,
        post: Id,
        context: &Context,
    ) -> ApiResult<Self> {
        let (author, post) = (author.object_id(), post.object_id());
        let id = context.db.insert::<Self>(doc! {
            "text": text.clone(),
            "author": author,
            "post": post,
        }).await?;

        Ok(Self { id, text, author, post })
    }

    pub(crate) async fn update(id: Id, set: CommentPatch, context: &Context) -> ApiResult<Self> {
        context.db.update(id.object_id(), Update::Set(set.into_document())).await?
            .ok_or_else(|| not_found!(key = "comment.not-found", "Comment not found"))
    }

    pub(crate) async fn delete(id: Id, context: &Context) -> ApiResult<bool> {
        Ok(context.db.delete::<Self>(id.object_id()).await?)
    }
}

/// Fields of a comment that can be changed. `None` fields are left untouched.
#[derive(Debug)]
pub(crate) struct CommentPatch {
    pub(crate) text: Option<String>,
}

impl CommentPatch {
    fn into_document(self) -> Document {
        let mut out = Document::new();
        if let Some(text) = self.text {
            out.insert("text", text);
        }
        out
    }
}
