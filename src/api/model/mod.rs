//! The object types of the API: one record type per collection, together with
//! the store operations on it.

pub(crate) mod comment;
pub(crate) mod post;
pub(crate) mod user;
