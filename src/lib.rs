//! Ordo integrates the `MongoDB` document mapper with web applications: it
//! binds named database connections to an application instance at startup,
//! adds pagination and HTTP-404 semantics to query results, and keeps mapped
//! documents and page views JSON-serializable by the response layer.
//!
//! Query execution, schema validation, and connection pooling stay fully
//! delegated to the driver; this crate is the lifecycle and convenience
//! layer above it.
//!
//! ## Example
//!
//! ```no_run
//! use mongodb::bson::doc;
//! use mongodb::bson::oid::ObjectId;
//! use ordo::{App, Config, Entity, Mongo, Order, by_id};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Ticket {
//!     #[serde(rename = "_id")]
//!     id: ObjectId,
//!     title: String,
//!     open: bool,
//! }
//!
//! impl Entity for Ticket {
//!     type Id = ObjectId;
//!     const COLLECTION_NAME: &'static str = "ticket";
//! }
//!
//! # async fn example(ticket_id: ObjectId) -> ordo::Result<()> {
//! // Bind a connection to the application at startup
//! let app = App::new(Config::from_uri("mongodb://localhost:27017/helpdesk"));
//! let mongo = Mongo::new();
//! mongo.init_app(&app, None).await?;
//!
//! // Resolve the database against the application current for this request
//! let db = mongo.database(&app)?;
//!
//! // A miss renders as an HTTP 404 at the response boundary
//! let ticket = Ticket::objects(&db)
//!     .filter(by_id(ticket_id))
//!     .get_or_404()
//!     .await?;
//!
//! // One page of open tickets, newest first
//! let page = Ticket::objects(&db)
//!     .filter(doc! { "open": true })
//!     .order_by("title", Order::Asc)
//!     .paginate(1, 20)
//!     .await?;
//! # let _ = (ticket, page);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_errors_doc
)]

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod config;
pub mod connection;
pub mod error;
pub mod pagination;
pub mod query;

pub use config::{Config, ConnectionSettings, DEFAULT_CONNECTION_ALIAS};
pub use connection::Connection;
pub use error::{Error, Result};
pub use pagination::{ListField, Pagination};
pub use query::{Entity, Filter, Order, QuerySet, by_id};

/// Application context: the host application's own configuration plus a
/// registry of extension state, keyed by extension identity so distinct
/// extensions on one application never collide.
///
/// Cheap to clone (`Arc` inner), so it can live in router state and be
/// passed explicitly to connection lookups instead of being discovered from
/// ambient global state.
#[derive(Clone, Debug, Default)]
pub struct App {
    inner: Arc<AppInner>,
}

#[derive(Debug, Default)]
struct AppInner {
    config: Config,
    extensions: DashMap<ExtensionId, ExtensionState>,
}

#[derive(Debug)]
struct ExtensionState {
    connections: HashMap<String, Connection>,
}

/// Process-unique identity of one extension instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExtensionId(u64);

impl ExtensionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(AppInner {
                config,
                extensions: DashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    fn register(&self, id: ExtensionId, state: ExtensionState) -> Result<()> {
        match self.inner.extensions.entry(id) {
            Entry::Occupied(_) => Err(Error::AlreadyInitialized),
            Entry::Vacant(slot) => {
                slot.insert(state);
                Ok(())
            }
        }
    }
}

/// Extension instance: one logical database setup, bindable to an [`App`]
/// exactly once.
#[derive(Debug)]
pub struct Mongo {
    id: ExtensionId,
    config: Option<Config>,
}

impl Mongo {
    pub fn new() -> Self {
        Self {
            id: ExtensionId::next(),
            config: None,
        }
    }

    /// Carries a construction-time config, used when `init_app` gets none.
    pub fn with_config(config: Config) -> Self {
        Self {
            id: ExtensionId::next(),
            config: Some(config),
        }
    }

    pub fn id(&self) -> ExtensionId {
        self.id
    }

    /// Binds this extension to `app`: resolves the effective configuration
    /// (passed > construction-time > the application's own), establishes the
    /// configured connections, and stores them in the application's registry
    /// under this extension's identity.
    ///
    /// Initializing the same instance twice on one application is an
    /// [`Error::AlreadyInitialized`]; a reused instance is never silently
    /// reconfigured.
    pub async fn init_app(&self, app: &App, config: Option<Config>) -> Result<()> {
        if app.inner.extensions.contains_key(&self.id) {
            return Err(Error::AlreadyInitialized);
        }

        let resolved = config::resolve(config.as_ref(), self.config.as_ref(), app.config());
        let connections = connection::create_connections(resolved).await?;

        tracing::debug!(
            extension = self.id.0,
            aliases = connections.len(),
            "registered mongodb extension"
        );

        app.register(self.id, ExtensionState { connections })
    }

    pub fn is_initialized(&self, app: &App) -> bool {
        app.inner.extensions.contains_key(&self.id)
    }

    /// Connection registered under `alias` on `app`. Resolves against the
    /// passed application, never one captured at construction, so one
    /// extension can serve several applications in a process.
    pub fn connection(&self, app: &App, alias: &str) -> Result<Connection> {
        let state = app
            .inner
            .extensions
            .get(&self.id)
            .ok_or(Error::NotInitialized)?;

        state
            .connections
            .get(alias)
            .cloned()
            .ok_or_else(|| Error::Config(format!("unknown connection alias `{alias}`")))
    }

    /// Database handle of the default-alias connection on `app`.
    pub fn database(&self, app: &App) -> Result<mongodb::Database> {
        Ok(self.connection(app, DEFAULT_CONNECTION_ALIAS)?.database)
    }
}

impl Default for Mongo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{App, Config, ConnectionSettings, Error, Mongo};

    fn app(uri: &str) -> App {
        App::new(Config::from_uri(uri))
    }

    #[tokio::test]
    async fn init_app_registers_the_default_connection() {
        let app = app("mongodb://localhost:27017/helpdesk");
        let mongo = Mongo::new();

        assert!(!mongo.is_initialized(&app));
        mongo.init_app(&app, None).await.unwrap();
        assert!(mongo.is_initialized(&app));
        assert_eq!(mongo.database(&app).unwrap().name(), "helpdesk");
    }

    #[tokio::test]
    async fn double_initialization_fails() {
        let app = app("mongodb://localhost:27017/helpdesk");
        let mongo = Mongo::new();

        mongo.init_app(&app, None).await.unwrap();
        let err = mongo.init_app(&app, None).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized));

        // The first registration stays intact.
        assert_eq!(mongo.database(&app).unwrap().name(), "helpdesk");
    }

    #[tokio::test]
    async fn distinct_extensions_on_one_app_are_independent() {
        let app = app("mongodb://localhost:27017/main");
        let primary = Mongo::new();
        let analytics = Mongo::with_config(Config::from_uri("mongodb://localhost:27017/analytics"));

        primary.init_app(&app, None).await.unwrap();
        analytics.init_app(&app, None).await.unwrap();

        assert_ne!(primary.id(), analytics.id());
        assert_eq!(primary.database(&app).unwrap().name(), "main");
        assert_eq!(analytics.database(&app).unwrap().name(), "analytics");
    }

    #[tokio::test]
    async fn passed_config_wins_over_construction_config() {
        let app = App::default();
        let mongo = Mongo::with_config(Config::from_uri("mongodb://localhost:27017/fromctor"));

        mongo
            .init_app(
                &app,
                Some(Config::from_uri("mongodb://localhost:27017/frompassed")),
            )
            .await
            .unwrap();

        assert_eq!(mongo.database(&app).unwrap().name(), "frompassed");
    }

    #[tokio::test]
    async fn one_extension_serves_several_apps() {
        let first = app("mongodb://localhost:27017/first");
        let second = app("mongodb://localhost:27017/second");
        let mongo = Mongo::new();

        mongo.init_app(&first, None).await.unwrap();
        mongo.init_app(&second, None).await.unwrap();

        assert_eq!(mongo.database(&first).unwrap().name(), "first");
        assert_eq!(mongo.database(&second).unwrap().name(), "second");
    }

    #[tokio::test]
    async fn lookup_before_init_fails() {
        let app = app("mongodb://localhost:27017/helpdesk");
        let mongo = Mongo::new();

        let err = mongo.database(&app).unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
    }

    #[tokio::test]
    async fn unknown_alias_is_a_config_error() {
        let app = app("mongodb://localhost:27017/helpdesk");
        let mongo = Mongo::new();
        mongo.init_app(&app, None).await.unwrap();

        let err = mongo.connection(&app, "archive").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn multiple_aliases_resolve_separately() {
        let config = Config::from_uri("mongodb://localhost:27017/app").with_connection(
            "archive",
            ConnectionSettings {
                uri: "mongodb://localhost:27018".into(),
                database: Some("archive".into()),
            },
        );
        let app = App::new(config);
        let mongo = Mongo::new();
        mongo.init_app(&app, None).await.unwrap();

        assert_eq!(
            mongo.connection(&app, "archive").unwrap().database.name(),
            "archive"
        );
        assert_eq!(mongo.database(&app).unwrap().name(), "app");
    }

    #[tokio::test]
    async fn empty_effective_config_is_rejected() {
        let app = App::default();
        let mongo = Mongo::new();

        let err = mongo.init_app(&app, None).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!mongo.is_initialized(&app));
    }
}
