use std::{
    future::IntoFuture,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use bson::doc;
use mongodb::{
    event::{sdam::SdamEvent, EventHandler},
    options::ClientOptions,
    Client,
};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::{
    config::DatabaseConfig,
    users::{MongoUserStore, UserDocument, USERS_COLLECTION},
};

pub const DEFAULT_DATABASE: &str = "calesync";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid MongoDB connection string")]
    InvalidUri(#[source] mongodb::error::Error),
    #[error("MongoDB connection error")]
    Connect(#[source] mongodb::error::Error),
    #[error("MongoDB error")]
    Mongo(#[from] mongodb::error::Error),
    #[error("closing MongoDB connection timed out after {0:?}")]
    CloseTimedOut(Duration),
}

/// What a heartbeat outcome means for the link as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChange {
    Unchanged,
    Lost,
    Restored,
}

/// Tracks reachability from the driver's heartbeats. Logging only; the
/// driver's monitor does the reconnecting. Silent until `arm` is called
/// after the first successful connect.
#[derive(Debug)]
pub struct ConnectionMonitor {
    armed: AtomicBool,
    healthy: AtomicBool,
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self {
            armed: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
        }
    }
}

impl ConnectionMonitor {
    pub fn arm(&self) {
        self.healthy.store(true, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    pub fn heartbeat_failed(&self) -> LinkChange {
        if !self.is_armed() {
            return LinkChange::Unchanged;
        }
        if self.healthy.swap(false, Ordering::SeqCst) {
            LinkChange::Lost
        } else {
            LinkChange::Unchanged
        }
    }

    pub fn heartbeat_succeeded(&self) -> LinkChange {
        if !self.is_armed() {
            return LinkChange::Unchanged;
        }
        if self.healthy.swap(true, Ordering::SeqCst) {
            LinkChange::Unchanged
        } else {
            LinkChange::Restored
        }
    }

    fn observe(&self, event: SdamEvent) {
        if !self.is_armed() {
            return;
        }
        match event {
            SdamEvent::ServerHeartbeatFailed(ev) => {
                error!(server = %ev.server_address, error = %ev.failure, "MongoDB connection error");
                if self.heartbeat_failed() == LinkChange::Lost {
                    error!(server = %ev.server_address, "MongoDB disconnected");
                }
            }
            SdamEvent::ServerHeartbeatSucceeded(ev) => {
                if self.heartbeat_succeeded() == LinkChange::Restored {
                    info!(server = %ev.server_address, "MongoDB reachable again");
                }
            }
            SdamEvent::TopologyClosed(_) => debug!("MongoDB topology closed"),
            _ => {}
        }
    }
}

/// Process-wide MongoDB handle. Owned by `main`; components receive
/// collection handles from it.
pub struct Database {
    client: Client,
    db: mongodb::Database,
}

impl Database {
    /// Connects and verifies with a `ping`. No retries.
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbError> {
        let mut options = ClientOptions::parse(config.uri.as_str())
            .await
            .map_err(DbError::InvalidUri)?;
        options.server_selection_timeout = Some(config.server_selection_timeout);
        options.app_name.get_or_insert_with(|| "calesync".into());

        let monitor = Arc::new(ConnectionMonitor::default());
        let listener = monitor.clone();
        options.sdam_event_handler = Some(EventHandler::callback(move |ev| listener.observe(ev)));

        let client = Client::with_options(options).map_err(DbError::InvalidUri)?;
        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));

        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(DbError::Connect)?;
        monitor.arm();
        info!(database = %db.name(), "connected to MongoDB");

        let database = Self { client, db };
        database.users().ensure_indexes().await?;
        Ok(database)
    }

    pub fn users(&self) -> MongoUserStore {
        MongoUserStore::new(self.db.collection::<UserDocument>(USERS_COLLECTION))
    }

    /// Closes the client. Exceeding `timeout` counts as a failed close.
    pub async fn close(self, timeout: Duration) -> Result<(), DbError> {
        tokio::time::timeout(timeout, self.client.shutdown().into_future())
            .await
            .map_err(|_| DbError::CloseTimedOut(timeout))?;
        info!("MongoDB connection closed through app termination");
        Ok(())
    }
}
