use juniper::graphql_object;

use super::{
    Context,
    Id,
    err::ApiResult,
    model::{comment::Comment, post::Post, user::User},
};


/// The root query object.
pub(crate) struct Query;

#[graphql_object(Context = Context)]
impl Query {
    /// Returns all users.
    async fn users(context: &Context) -> ApiResult<Vec<User>> {
        User::load_all(context).await
    }

    /// Returns the user with the given ID. Errors if there is no such user.
    async fn user(id: Id, context: &Context) -> ApiResult<User> {
        User::load_by_id(id, context).await
    }

    /// Returns all posts.
    async fn posts(context: &Context) -> ApiResult<Vec<Post>> {
        Post::load_all(context).await
    }

    /// Returns the post with the given ID. Errors if there is no such post.
    async fn post(id: Id, context: &Context) -> ApiResult<Post> {
        Post::load_by_id(id, context).await
    }

    /// Returns all comments.
    async fn comments(context: &Context) -> ApiResult<Vec<Comment>> {
        Comment::load_all(context).await
    }

    /// Returns the comment with the given ID. Errors if there is no such
    /// comment.
    async fn comment(id: Id, context: &Context) -> ApiResult<Comment> {
        Comment::load_by_id(id, context).await
    }
}
