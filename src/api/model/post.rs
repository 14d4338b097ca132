use juniper::graphql_object;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use serde::Deserialize;

use crate::{
    api::{Context, Id, err::{ApiResult, not_found}},
    db::{Collection, Record, Update},
};
use super::{comment::Comment, user::User};


#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Post {
    #[serde(rename = "_id")]
    pub(crate) id: ObjectId,
    pub(crate) content: String,
    pub(crate) author: ObjectId,
    #[serde(default)]
    pub(crate) comments: Vec<ObjectId>,
    #[serde(default)]
    pub(crate) likes: Vec<ObjectId>,
}

impl Record for Post {
    const COLLECTION: Collection = Collection::Post;
}

#[graphql_object(Context = Context)]
impl Post {
    fn id(&self) -> Id {
        self.id.into()
    }

    fn content(&self) -> &str {
        &self.content
    }

    /// The author of this post or `null` if that user does not exist anymore.
    async fn author(&self, context: &Context) -> ApiResult<Option<User>> {
        Ok(context.db.load_by_id(self.author).await?)
    }

    /// Comments referenced by this post. Note that creating a comment does
    /// not add it here.
    async fn comments(&self, context: &Context) -> ApiResult<Vec<Comment>> {
        Ok(context.db.load_by_ids(&self.comments).await?)
    }

    /// Users that liked this post. A user liking the post multiple times is
    /// only returned once.
    async fn likes(&self, context: &Context) -> ApiResult<Vec<User>> {
        Ok(context.db.load_by_ids(&self.likes).await?)
    }
}

impl Post {
    pub(crate) async fn load_all(context: &Context) -> ApiResult<Vec<Self>> {
        Ok(context.db.load_all().await?)
    }

    pub(crate) async fn load_by_id(id: Id, context: &Context) -> ApiResult<Self> {
        context.db.load_by_id(id.object_id()).await?
            .ok_or_else(Self::not_found)
    }

    pub(crate) async fn create(content: String, author: Id, context: &Context) -> ApiResult<Self> {
        let id = context.db.insert::<Self>(doc! {
            "content": content,
            "author": author.object_id(),
            "comments": [],
            "likes": [],
        }).await?;

        Self::load_by_id(id.into(), context).await
    }

    pub(crate) async fn update(id: Id, set: PostPatch, context: &Context) -> ApiResult<Self> {
        Self::modify(id, Update::Set(set.into_document()), context).await
    }

    pub(crate) async fn delete(id: Id, context: &Context) -> ApiResult<bool> {
        Ok(context.db.delete::<Self>(id.object_id()).await?)
    }

    /// Appends `user` to the likes, even if it is already contained.
    pub(crate) async fn add_like(post: Id, user: Id, context: &Context) -> ApiResult<Self> {
        let update = Update::Push { field: "likes", value: Bson::ObjectId(user.object_id()) };
        Self::modify(post, update, context).await
    }

    /// Removes one occurrence of `user` from the likes. Does nothing if the
    /// user did not like the post.
    pub(crate) async fn remove_like(post: Id, user: Id, context: &Context) -> ApiResult<Self> {
        let update = Update::PullOne { field: "likes", value: Bson::ObjectId(user.object_id()) };
        Self::modify(post, update, context).await
    }

    async fn modify(id: Id, update: Update, context: &Context) -> ApiResult<Self> {
        context.db.update(id.object_id(), update).await?
            .ok_or_else(Self::not_found)
    }

    fn not_found() -> crate::api::err::ApiError {
        not_found!(key = "post.not-found", "Post not found")
    }
}

/// Fields of a post that can be changed. `None` fields are left untouched.
#[derive(Debug)]
pub(crate) struct PostPatch {
    pub(crate) content: Option<String>,
}

impl PostPatch {
    fn into_document(self) -> Document {
        let mut out = Document::new();
        if let Some(content) = self.content {
            out.insert("content", content);
        }
        out
    }
}
