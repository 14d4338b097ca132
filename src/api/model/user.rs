use juniper::graphql_object;
use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::Deserialize;

use crate::{
    api::{Context, Id, err::{ApiResult, not_found}},
    db::{Collection, Record, Update},
};
use super::{comment::Comment, post::Post};


#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct User {
    #[serde(rename = "_id")]
    pub(crate) id: ObjectId,
    pub(crate) name: String,
    pub(crate) password: String,
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) posts: Vec<ObjectId>,
    #[serde(default)]
    pub(crate) comments: Vec<ObjectId>,
    #[serde(default)]
    pub(crate) liked_posts: Vec<ObjectId>,
}

impl Record for User {
    const COLLECTION: Collection = Collection::User;
}

#[graphql_object(Context = Context)]
impl User {
    fn id(&self) -> Id {
        self.id.into()
    }

    fn name(&self) -> &str {
        &self.name
    }

    /// Stored and returned as given on creation.
    fn password(&self) -> &str {
        &self.password
    }

    fn email(&self) -> &str {
        &self.email
    }

    /// Posts referenced by this user. Entries that no longer exist are
    /// skipped.
    async fn posts(&self, context: &Context) -> ApiResult<Vec<Post>> {
        Ok(context.db.load_by_ids(&self.posts).await?)
    }

    async fn comments(&self, context: &Context) -> ApiResult<Vec<Comment>> {
        Ok(context.db.load_by_ids(&self.comments).await?)
    }

    async fn liked_posts(&self, context: &Context) -> ApiResult<Vec<Post>> {
        Ok(context.db.load_by_ids(&self.liked_posts).await?)
    }
}

impl User {
    pub(crate) async fn load_all(context: &Context) -> ApiResult<Vec<Self>> {
        Ok(context.db.load_all().await?)
    }

    pub(crate) async fn load_by_id(id: Id, context: &Context) -> ApiResult<Self> {
        context.db.load_by_id(id.object_id()).await?
            .ok_or_else(|| not_found!(key = "user.not-found", "User not found"))
    }

    pub(crate) async fn create(
        name: String,
        password: String,
        email: String,
        context: &Context,
    ) -> ApiResult<Self> {
        let id = context.db.insert::<Self>(doc! {
            "name": name,
            "password": password,
            "email": email,
            "posts": [],
            "comments": [],
            "likedPosts": [],
        }).await?;

        Self::load_by_id(id.into(), context).await
    }

    pub(crate) async fn update(id: Id, set: UserPatch, context: &Context) -> ApiResult<Self> {
        context.db.update(id.object_id(), Update::Set(set.into_document())).await?
            .ok_or_else(|| not_found!(key = "user.not-found", "User not found"))
    }

    pub(crate) async fn delete(id: Id, context: &Context) -> ApiResult<bool> {
        Ok(context.db.delete::<Self>(id.object_id()).await?)
    }
}

/// Fields of a user that can be changed. `None` fields are left untouched.
#[derive(Debug)]
pub(crate) struct UserPatch {
    pub(crate) name: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) email: Option<String>,
}

impl UserPatch {
    fn into_document(self) -> Document {
        let mut out = Document::new();
        if let Some(name) = self.name {
            out.insert("name", name);
        }
        if let Some(password) = self.password {
            out.insert("password", password);
        }
        if let Some(email) = self.email {
            out.insert("email", email);
        }
        out
    }
}
