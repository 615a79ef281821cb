//! Mobile-app VPN configuration kept in the per-platform remote stores.

pub mod firebase;
pub mod reconciliation;
pub mod schema;
pub mod service;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::{EntryFlags, Platform};

pub use firebase::{FirebaseAuth, FirebaseConfigStore, FirebaseDatabase, ServiceAccountKey};
pub use reconciliation::{Inconsistency, IpIndex};
pub use service::{ConfigEntryView, ConfigSnapshot, MobileConfigService, PlatformLoad, UpdateOutcome};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Remote store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Remote store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Remote store rejected the credentials: {0}")]
    Unauthorized(String),
    #[error("Invalid remote store credentials: {0}")]
    Credentials(String),
    #[error("Remote store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("No remote store configured for {0}")]
    PlatformNotConfigured(Platform),
}

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("Invalid refPath for this platform: {0}")]
    InvalidRefPath(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Access to the raw platform trees.
#[async_trait]
pub trait RemoteConfigStore: Send + Sync {
    /// Returns the whole platform tree, `None` when it does not exist.
    async fn read_all(&self, platform: Platform) -> Result<Option<Value>, StoreError>;

    /// Returns the record stored at `path`, `None` when nothing is there.
    ///
    /// The default walks the whole platform tree; stores that can address a
    /// single node should override it.
    async fn read_record(&self, platform: Platform, path: &str) -> Result<Option<Value>, StoreError> {
        let tree = self.read_all(platform).await?;
        let relative = path.strip_prefix(schema::platform_root(platform)).unwrap_or(path);
        Ok(tree.and_then(|tree| schema::lookup(&tree, relative).cloned()))
    }

    /// Overwrites the two flags of the record at `path`, leaving its other
    /// fields untouched.
    async fn update_fields(&self, platform: Platform, path: &str, flags: EntryFlags) -> Result<(), StoreError>;
}
