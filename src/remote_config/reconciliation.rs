use serde::Serialize;
use std::collections::HashMap;

use super::schema::ParsedTree;
use crate::models::{Platform, Server, VpnConfig, VpnEntry};

/// IP address to every record registered for it, in source-tree order.
pub type IpIndex = HashMap<String, Vec<VpnEntry>>;

pub fn build_index(platform: Platform, tree: &ParsedTree) -> IpIndex {
    let mut index = IpIndex::new();
    for record in &tree.records {
        if let Some(ip) = record.ip() {
            index
                .entry(ip.to_string())
                .or_default()
                .push(record.to_vpn_entry(platform));
        }
    }
    index
}

/// Attaches the matching mobile-config entries to each server.
///
/// Any `vpn_config` the server already carried is replaced. Servers with no
/// match on either platform end up with `vpn_config = None`.
pub fn enrich_servers(servers: Vec<Server>, ios: &IpIndex, android: &IpIndex) -> Vec<Server> {
    servers
        .into_iter()
        .map(|mut server| {
            let ios_matches = ios.get(&server.ip).cloned().unwrap_or_default();
            let android_matches = android.get(&server.ip).cloned().unwrap_or_default();
            server.vpn_config = VpnConfig::from_matches(ios_matches, android_matches);
            server
        })
        .collect()
}

/// A server whose mobile configuration needs attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inconsistency {
    pub server_id: String,
    pub ip: String,
    pub duplicate: bool,
    pub platform_mismatch: bool,
}

pub fn find_inconsistencies(servers: &[Server]) -> Vec<Inconsistency> {
    servers
        .iter()
        .filter_map(|server| {
            let config = server.vpn_config.as_ref()?;
            let duplicate = config.has_duplicates();
            let platform_mismatch = config.has_platform_difference();
            (duplicate || platform_mismatch).then(|| Inconsistency {
                server_id: server.id.clone(),
                ip: server.ip.clone(),
                duplicate,
                platform_mismatch,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bandwidth, Provider, ServerStatus};
    use serde_json::json;

    fn server(id: &str, ip: &str) -> Server {
        Server {
            id: id.into(),
            name: id.into(),
            ip: ip.into(),
            provider: Provider::OneProvider,
            status: ServerStatus::Online,
            cpu: 1,
            ram: 1024,
            disk: 20,
            disk_usage: None,
            bandwidth: Bandwidth { used: 0.0, total: 1000.0 },
            price: 3.6,
            currency: "USD".into(),
            location: None,
            renewal_date: None,
            vpn_config: None,
        }
    }

    fn indexes() -> (IpIndex, IpIndex) {
        let ios = ParsedTree::parse(
            Platform::Ios,
            &json!([
                {"ipaddress": "10.0.0.5", "ispremium": 1, "isavailable": 1},
                {"ipaddress": "10.0.0.9", "ispremium": 0, "isavailable": 1},
                {"city": "no ip"}
            ]),
        );
        let android = ParsedTree::parse(
            Platform::Android,
            &json!({
                "de": {"servers": {"first": {"ipaddress": "10.0.0.5", "ispremium": 1, "isavailable": 1}}},
                "fr": {"servers": {"second": {"ipaddress": "10.0.0.5", "ispremium": 0, "isavailable": 0}}}
            }),
        );
        (build_index(Platform::Ios, &ios), build_index(Platform::Android, &android))
    }

    #[test]
    fn duplicated_android_ip_keeps_both_entries_in_order() {
        let (ios, android) = indexes();
        let enriched = enrich_servers(vec![server("op-1", "10.0.0.5")], &ios, &android);
        let config = enriched[0].vpn_config.as_ref().unwrap();

        let android_entries = config.entries(Platform::Android);
        assert_eq!(android_entries.len(), 2);
        assert_eq!(android_entries[0].ref_path.as_deref(), Some("/countries/de/servers/first"));
        assert_eq!(android_entries[1].ref_path.as_deref(), Some("/countries/fr/servers/second"));
        assert_eq!(config.android.as_ref(), android_entries.first());
        assert_eq!(config.entries(Platform::Ios).len(), 1);
        assert!(config.has_duplicates());
    }

    #[test]
    fn unmatched_server_has_no_vpn_config() {
        let (ios, android) = indexes();
        let mut stale = server("op-2", "192.168.1.1");
        stale.vpn_config = VpnConfig::from_matches(vec![], vec![]);
        let enriched = enrich_servers(vec![stale], &ios, &android);
        assert!(enriched[0].vpn_config.is_none());
    }

    #[test]
    fn single_platform_match_omits_other_platform() {
        let (ios, android) = indexes();
        let enriched = enrich_servers(vec![server("op-3", "10.0.0.9")], &ios, &android);
        let config = enriched[0].vpn_config.as_ref().unwrap();
        assert!(config.android.is_none());
        assert!(config.android_multiple.is_none());
        assert!(config.has_platform_difference());
    }

    #[test]
    fn enrichment_is_stable_across_runs() {
        let (ios, android) = indexes();
        let servers = vec![server("a", "10.0.0.5"), server("b", "10.0.0.9"), server("c", "1.1.1.1")];
        let first = enrich_servers(servers, &ios, &android);
        let second = enrich_servers(first.clone(), &ios, &android);
        assert_eq!(first, second);
    }

    #[test]
    fn inconsistencies_flag_duplicates_and_mismatches() {
        let (ios, android) = indexes();
        let enriched = enrich_servers(
            vec![server("dup", "10.0.0.5"), server("ios-only", "10.0.0.9"), server("none", "8.8.8.8")],
            &ios,
            &android,
        );
        let flagged = find_inconsistencies(&enriched);
        assert_eq!(flagged.len(), 2);
        assert_eq!(flagged[0].server_id, "dup");
        assert!(flagged[0].duplicate);
        assert!(!flagged[0].platform_mismatch);
        assert_eq!(flagged[1].server_id, "ios-only");
        assert!(!flagged[1].duplicate);
        assert!(flagged[1].platform_mismatch);
    }
}
