use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::reconciliation::{build_index, enrich_servers, IpIndex};
use super::schema::{validate_ref_path, ParsedTree, StoredRecord};
use super::{RemoteConfigStore, StoreError, UpdateError};
use crate::models::{EntryFlags, Platform, Server};

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// How one platform tree came back from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformLoad {
    Loaded(ParsedTree),
    /// The tree does not exist.
    Empty,
    /// Read failed or timed out; treated as an empty tree.
    Degraded(String),
}

impl PlatformLoad {
    pub fn tree(&self) -> Option<&ParsedTree> {
        match self {
            PlatformLoad::Loaded(tree) => Some(tree),
            PlatformLoad::Empty | PlatformLoad::Degraded(_) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, PlatformLoad::Degraded(_))
    }
}

/// Flattened record as shown on the configuration page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntryView {
    pub id: String,
    pub name: String,
    pub ip_address: Option<String>,
    pub is_premium: bool,
    pub is_available: bool,
    pub profile_type: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub ref_path: String,
}

impl ConfigEntryView {
    pub fn from_record(platform: Platform, stored: &StoredRecord) -> Self {
        let record = &stored.record;
        let fallback_name = match platform {
            Platform::Ios => stored.ip().unwrap_or(&stored.key).to_string(),
            Platform::Android => stored.key.clone(),
        };
        Self {
            id: record
                .id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| stored.key.clone()),
            name: record.city.clone().unwrap_or(fallback_name),
            ip_address: stored.ip().map(str::to_string),
            is_premium: record.ispremium.0,
            is_available: record.isavailable.0,
            profile_type: record.profiletype.as_ref().map(ToString::to_string),
            country: stored.country.clone().or_else(|| record.country.clone()),
            city: record.city.clone(),
            ref_path: stored.ref_path.clone(),
        }
    }
}

/// Both platform trees as read at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    pub ios: PlatformLoad,
    pub android: PlatformLoad,
}

impl ConfigSnapshot {
    pub fn platform(&self, platform: Platform) -> &PlatformLoad {
        match platform {
            Platform::Ios => &self.ios,
            Platform::Android => &self.android,
        }
    }

    pub fn index(&self, platform: Platform) -> IpIndex {
        self.platform(platform)
            .tree()
            .map(|tree| build_index(platform, tree))
            .unwrap_or_default()
    }

    pub fn enrich(&self, servers: Vec<Server>) -> Vec<Server> {
        enrich_servers(servers, &self.index(Platform::Ios), &self.index(Platform::Android))
    }

    pub fn entries_view(&self, platform: Platform) -> Vec<ConfigEntryView> {
        self.platform(platform)
            .tree()
            .map(|tree| {
                tree.records
                    .iter()
                    .map(|record| ConfigEntryView::from_record(platform, record))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated { ref_path: String },
    NotFound,
}

/// Reads, joins and updates the mobile configuration of both platforms.
pub struct MobileConfigService {
    store: Arc<dyn RemoteConfigStore>,
    read_timeout: Duration,
}

impl MobileConfigService {
    pub fn new(store: Arc<dyn RemoteConfigStore>) -> Self {
        Self {
            store,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    async fn read_tree(&self, platform: Platform) -> Result<Option<ParsedTree>, StoreError> {
        let value = tokio::time::timeout(self.read_timeout, self.store.read_all(platform))
            .await
            .map_err(|_| StoreError::Timeout(self.read_timeout))??;
        Ok(value.map(|v| {
            let tree = ParsedTree::parse(platform, &v);
            if !tree.quarantined.is_empty() {
                warn!(%platform, quarantined = tree.quarantined.len(), "Some mobile-config records were skipped.");
            }
            tree
        }))
    }

    async fn read_record(&self, platform: Platform, path: &str) -> Result<Option<Value>, StoreError> {
        tokio::time::timeout(self.read_timeout, self.store.read_record(platform, path))
            .await
            .map_err(|_| StoreError::Timeout(self.read_timeout))?
    }

    async fn load_platform(&self, platform: Platform) -> PlatformLoad {
        match self.read_tree(platform).await {
            Ok(Some(tree)) => {
                debug!(%platform, records = tree.records.len(), "Loaded mobile-config tree.");
                PlatformLoad::Loaded(tree)
            }
            Ok(None) => PlatformLoad::Empty,
            Err(e) => {
                warn!(%platform, error = %e, "Mobile-config tree unavailable, continuing without it.");
                PlatformLoad::Degraded(e.to_string())
            }
        }
    }

    /// Reads both platforms concurrently. A failure on one side never
    /// affects the other.
    pub async fn load_snapshot(&self) -> ConfigSnapshot {
        let (ios, android) = tokio::join!(
            self.load_platform(Platform::Ios),
            self.load_platform(Platform::Android)
        );
        ConfigSnapshot { ios, android }
    }

    pub async fn enrich(&self, servers: Vec<Server>) -> Vec<Server> {
        self.load_snapshot().await.enrich(servers)
    }

    /// Writes `flags` to one record.
    ///
    /// With `ref_path` the write goes to that exact record, provided it exists;
    /// otherwise the first record registered for `ip` on `platform` is targeted.
    pub async fn update_entry(
        &self,
        ip: &str,
        platform: Platform,
        ref_path: Option<&str>,
        flags: EntryFlags,
    ) -> Result<UpdateOutcome, UpdateError> {
        let target = match ref_path {
            Some(path) => {
                let path = validate_ref_path(platform, path).ok_or_else(|| UpdateError::InvalidRefPath(path.to_string()))?;
                if self.read_record(platform, &path).await?.is_none() {
                    debug!(%platform, ip, ref_path = %path, "No mobile-config record at this path.");
                    return Ok(UpdateOutcome::NotFound);
                }
                path
            }
            None => {
                let found = self
                    .read_tree(platform)
                    .await?
                    .and_then(|tree| tree.find_first_by_ip(ip).map(|r| r.ref_path.clone()));
                match found {
                    Some(path) => path,
                    None => {
                        debug!(%platform, ip, "No mobile-config record for this IP.");
                        return Ok(UpdateOutcome::NotFound);
                    }
                }
            }
        };

        self.store.update_fields(platform, &target, flags).await?;
        info!(
            %platform,
            ip,
            ref_path = %target,
            is_premium = flags.is_premium,
            is_available = flags.is_available,
            "Updated mobile-config record."
        );
        Ok(UpdateOutcome::Updated { ref_path: target })
    }
}
