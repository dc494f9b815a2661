//! Connection establishment.
//!
//! The driver's `Client` is lazy: building one validates the URI and options
//! but opens no sockets, so initialization stays cheap and offline-testable.
//! All connection failures surface later, from the first operation that
//! actually hits the server.

use crate::config::{Config, ConnectionSettings};
use crate::error::{Error, Result};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use std::collections::HashMap;

/// One live connection: the pooled client plus the selected database handle.
#[derive(Clone)]
pub struct Connection {
    pub client: Client,
    pub database: Database,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("database", &self.database.name())
            .finish_non_exhaustive()
    }
}

pub(crate) async fn create_connections(config: &Config) -> Result<HashMap<String, Connection>> {
    if config.is_empty() {
        return Err(Error::Config("no connections configured".into()));
    }

    let mut connections = HashMap::with_capacity(config.connections.len());
    for (alias, settings) in &config.connections {
        connections.insert(alias.clone(), connect(alias, settings).await?);
    }

    Ok(connections)
}

async fn connect(alias: &str, settings: &ConnectionSettings) -> Result<Connection> {
    let options = ClientOptions::parse(&settings.uri).await.map_err(|err| {
        Error::Config(format!("invalid connection uri for alias `{alias}`: {err}"))
    })?;

    let default_database = options.default_database.clone();
    let client = Client::with_options(options)
        .map_err(|err| Error::Config(format!("cannot build client for alias `{alias}`: {err}")))?;

    let name = settings
        .database
        .clone()
        .or(default_database)
        .ok_or_else(|| {
            Error::Config(format!(
                "no database name for alias `{alias}`: set `database` or put one in the uri path"
            ))
        })?;

    let database = client.database(&name);
    tracing::debug!(alias, database = %name, "established mongodb connection");

    Ok(Connection { client, database })
}
