//! Pushes bandwidth-derived availability back into the mobile configuration.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{AlertConfig, EntryFlags, Platform, Server};
use crate::remote_config::{MobileConfigService, UpdateOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub updated: usize,
    pub not_found: usize,
    pub failed: usize,
}

/// Flags a server should carry given its bandwidth usage. Servers without a
/// finite cap are left alone.
pub fn target_flags(server: &Server, config: &AlertConfig) -> Option<EntryFlags> {
    let percent = server.bandwidth.usage_percent()?;
    Some(if percent >= config.bandwidth.critical {
        EntryFlags::UNAVAILABLE
    } else {
        EntryFlags::PREMIUM
    })
}

/// Applies [`target_flags`] to both platforms, one update at a time. A failed
/// update is counted and skipped.
pub async fn sync_availability(service: &MobileConfigService, servers: &[Server], config: &AlertConfig) -> SyncSummary {
    let mut summary = SyncSummary::default();

    for server in servers {
        let Some(flags) = target_flags(server, config) else {
            continue;
        };
        for platform in Platform::ALL {
            match service.update_entry(&server.ip, platform, None, flags).await {
                Ok(UpdateOutcome::Updated { .. }) => summary.updated += 1,
                Ok(UpdateOutcome::NotFound) => {
                    debug!(server_id = %server.id, %platform, "Server not present in mobile config.");
                    summary.not_found += 1;
                }
                Err(e) => {
                    warn!(server_id = %server.id, %platform, error = %e, "Availability sync failed for server.");
                    summary.failed += 1;
                }
            }
        }
    }

    info!(
        updated = summary.updated,
        not_found = summary.not_found,
        failed = summary.failed,
        "Availability sync finished."
    );
    summary
}
