//! Database related things.

use mongodb::options::ClientOptions;
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, sync::Arc};

use crate::prelude::*;


mod mongo;
mod session;
mod store;

#[cfg(test)]
pub(crate) mod memory;

pub(crate) use self::{
    mongo::MongoStore,
    session::{Record, Session},
    store::{DbError, DocumentStore, Filter, Update},
};


#[derive(Debug, confique::Config)]
pub(crate) struct DbConfig {
    /// The MongoDB connection string, e.g. "mongodb://user:pw@localhost:27017".
    /// Required. Can also be set via the `MONGO_URL` environment variable.
    #[config(env = "MONGO_URL")]
    pub(crate) uri: SecretString,

    /// The name of the database holding the `User`, `Post` and `Comment`
    /// collections.
    #[config(default = "SocialMedia")]
    pub(crate) database: String,

    /// The application name reported to the MongoDB server.
    #[config(default = "social-api")]
    pub(crate) app_name: String,
}

/// The three collections of records this application works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Collection {
    User,
    Post,
    Comment,
}

impl Collection {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Post => "Post",
            Self::Comment => "Comment",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}


/// Connects to MongoDB and makes sure the server is reachable. The returned
/// store is shared by all requests.
pub(crate) async fn connect(config: &DbConfig) -> Result<Arc<dyn DocumentStore>> {
    let mut options = ClientOptions::parse(config.uri.expose_secret()).await
        .context("failed to parse `db.uri` as MongoDB connection string")?;
    options.app_name = Some(config.app_name.clone());

    debug!(
        "Connecting to MongoDB at {:?} (database '{}')",
        options.hosts.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
        config.database,
    );

    let client = mongodb::Client::with_options(options)
        .context("failed to create MongoDB client")?;
    let store = MongoStore::new(client.database(&config.database));

    store.ping().await.context("failed to ping MongoDB server")?;
    info!("Connected to MongoDB (database '{}')", config.database);

    Ok(Arc::new(store))
}
