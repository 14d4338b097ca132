use juniper::graphql_object;

use super::{
    Context,
    Id,
    err::ApiResult,
    model::{
        comment::{Comment, CommentPatch},
        post::{Post, PostPatch},
        user::{User, UserPatch},
    },
};


/// The root mutation object.
///
/// None of these mutations check that referenced users or posts exist, and
/// none of them maintain the reference lists of other objects.
pub(crate) struct Mutation;

#[graphql_object(Context = Context)]
impl Mutation {
    /// Creates a new user without any posts, comments or liked posts.
    async fn create_user(
        name: String,
        password: String,
        email: String,
        context: &Context,
    ) -> ApiResult<User> {
        User::create(name, password, email, context).await
    }

    /// Changes the given fields of a user. Fields that are not specified stay
    /// unchanged.
    async fn update_user(
        id: Id,
        name: Option<String>,
        password: Option<String>,
        email: Option<String>,
        context: &Context,
    ) -> ApiResult<User> {
        User::update(id, UserPatch { name, password, email }, context).await
    }

    /// Deletes a user. Returns `false` if the user did not exist. References
    /// to the user held by posts and comments are not removed.
    async fn delete_user(id: Id, context: &Context) -> ApiResult<bool> {
        User::delete(id, context).await
    }

    /// Creates a new post by `author` without comments and likes.
    async fn create_post(content: String, author: Id, context: &Context) -> ApiResult<Post> {
        Post::create(content, author, context).await
    }

    async fn update_post(
        id: Id,
        content: Option<String>,
        context: &Context,
    ) -> ApiResult<Post> {
        Post::update(id, PostPatch { content }, context).await
    }

    /// Deletes a post. Returns `false` if the post did not exist.
    async fn delete_post(id: Id, context: &Context) -> ApiResult<bool> {
        Post::delete(id, context).await
    }

    /// Adds `userId` to the likes of the post. Liking a post twice adds the
    /// user twice.
    async fn add_like_to_post(post_id: Id, user_id: Id, context: &Context) -> ApiResult<Post> {
        Post::add_like(post_id, user_id, context).await
    }

    /// Removes one like of `userId` from the post.
    async fn remove_like_from_post(
        post_id: Id,
        user_id: Id,
        context: &Context,
    ) -> ApiResult<Post> {
        Post::remove_like(post_id, user_id, context).await
    }

    /// Creates a comment by `author` on `post`.
    async fn create_comment(
        text: String,
        author: Id,
        post: Id,
        context: &Context,
    ) -> ApiResult<Comment> {
        Comment::create(text, author, post, context).await
    }

    async fn update_comment(
        id: Id,
        text: Option<String>,
        context: &Context,
    ) -> ApiResult<Comment> {
        Comment::update(id, CommentPatch { text }, context).await
    }

    /// Deletes a comment. Returns `false` if the comment did not exist.
    async fn delete_comment(id: Id, context: &Context) -> ApiResult<bool> {
        Comment::delete(id, context).await
    }
}
