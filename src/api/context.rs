use crate::db::Session;


/// The context that is accessible to every resolver in our API. Created
/// per request from the store handle that is shared by all requests.
pub(crate) struct Context {
    pub(crate) db: Session,
}

impl juniper::Context for Context {}
