//! Typed view of the records kept in the mobile-config databases.
//!
//! Raw JSON trees are validated here, at the boundary. Records that do not
//! match the expected shape are quarantined (skipped and logged) instead of
//! flowing into reconciliation.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use tracing::warn;

use crate::models::{EntryFlags, Platform, VpnEntry};

/// Root of each platform's tree. iOS keeps a flat indexed list, Android nests
/// servers under their country.
pub fn platform_root(platform: Platform) -> &'static str {
    match platform {
        Platform::Ios => "/servers",
        Platform::Android => "/countries",
    }
}

/// Follows `/`-separated keys (array indices included) below `tree`.
/// `null` nodes count as absent.
pub fn lookup<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .try_fold(tree, |node, segment| match node {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Value::Object(map) => map.get(segment),
            _ => None,
        })
        .filter(|node| !node.is_null())
}

/// Integer boolean used by the store: `1` is true, `0` is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreFlag(pub bool);

impl Serialize for StoreFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(self.0))
    }
}

impl<'de> Deserialize<'de> for StoreFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u64::deserialize(deserializer)? {
            0 => Ok(StoreFlag(false)),
            1 => Ok(StoreFlag(true)),
            other => Err(de::Error::custom(format!("expected 0 or 1, got {other}"))),
        }
    }
}

/// Scalar fields that the apps have written both as strings and numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TextOrNumber {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for TextOrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextOrNumber::Text(s) => f.write_str(s),
            TextOrNumber::Integer(i) => write!(f, "{i}"),
            TextOrNumber::Float(x) => write!(f, "{x}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerRecord {
    #[serde(default)]
    pub ipaddress: Option<String>,
    #[serde(default)]
    pub ispremium: StoreFlag,
    #[serde(default)]
    pub isavailable: StoreFlag,
    #[serde(default)]
    pub profiletype: Option<TextOrNumber>,
    #[serde(default)]
    pub id: Option<TextOrNumber>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Body of a targeted update: exactly the two flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlagUpdate {
    pub ispremium: StoreFlag,
    pub isavailable: StoreFlag,
}

impl From<EntryFlags> for FlagUpdate {
    fn from(flags: EntryFlags) -> Self {
        Self {
            ispremium: StoreFlag(flags.is_premium),
            isavailable: StoreFlag(flags.is_available),
        }
    }
}

/// A validated record with its exact location in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub ref_path: String,
    /// List index (iOS) or server key (Android).
    pub key: String,
    /// Country key, Android only.
    pub country: Option<String>,
    pub position: usize,
    pub record: ServerRecord,
}

impl StoredRecord {
    pub fn ip(&self) -> Option<&str> {
        self.record.ipaddress.as_deref().filter(|ip| !ip.is_empty())
    }

    pub fn to_vpn_entry(&self, platform: Platform) -> VpnEntry {
        let record = &self.record;
        let name = record
            .city
            .clone()
            .or_else(|| match platform {
                Platform::Ios => record.ipaddress.clone(),
                Platform::Android => Some(self.key.clone()),
            });
        let (id, order) = match platform {
            Platform::Ios => (
                record
                    .id
                    .as_ref()
                    .map(ToString::to_string)
                    .or_else(|| record.order.map(|o| o.to_string()))
                    .unwrap_or_else(|| self.key.clone()),
                Some(record.order.unwrap_or(self.position as i64)),
            ),
            Platform::Android => (
                record
                    .id
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| self.key.clone()),
                record.order,
            ),
        };

        VpnEntry {
            available: record.isavailable.0,
            is_premium: record.ispremium.0,
            profile_type: record.profiletype.as_ref().map(ToString::to_string),
            ref_path: Some(self.ref_path.clone()),
            id: Some(id),
            order,
            country: self.country.clone(),
            name,
        }
    }
}

/// Result of validating one platform tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTree {
    /// Records in source-tree order.
    pub records: Vec<StoredRecord>,
    /// Locations of records that failed validation.
    pub quarantined: Vec<String>,
}

impl ParsedTree {
    pub fn parse(platform: Platform, value: &Value) -> Self {
        match platform {
            Platform::Ios => parse_ios_tree(value),
            Platform::Android => parse_android_tree(value),
        }
    }

    pub fn find_first_by_ip(&self, ip: &str) -> Option<&StoredRecord> {
        self.records.iter().find(|r| r.ip() == Some(ip))
    }
}

fn push_record(tree: &mut ParsedTree, ref_path: String, key: String, country: Option<String>, value: &Value) {
    if value.is_null() {
        return;
    }
    match ServerRecord::deserialize(value) {
        Ok(record) => {
            let position = tree.records.len();
            tree.records.push(StoredRecord {
                ref_path,
                key,
                country,
                position,
                record,
            });
        }
        Err(e) => {
            warn!(ref_path = %ref_path, error = %e, "Quarantining malformed mobile-config record.");
            tree.quarantined.push(ref_path);
        }
    }
}

/// `/servers` is a list. Sparse lists come back from the REST API as an
/// object keyed by index.
fn parse_ios_tree(value: &Value) -> ParsedTree {
    let mut tree = ParsedTree::default();
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                push_record(&mut tree, format!("/servers/{index}"), index.to_string(), None, item);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                if key.parse::<usize>().is_err() {
                    warn!(key = %key, "Quarantining iOS entry with a non-numeric index.");
                    tree.quarantined.push(format!("/servers/{key}"));
                    continue;
                }
                push_record(&mut tree, format!("/servers/{key}"), key.clone(), None, item);
            }
        }
        Value::Null => {}
        _ => {
            warn!("iOS server tree is neither a list nor an object, ignoring it.");
            tree.quarantined.push("/servers".to_string());
        }
    }
    // Positions follow the list index for the iOS layout.
    for record in &mut tree.records {
        if let Ok(index) = record.key.parse::<usize>() {
            record.position = index;
        }
    }
    tree
}

fn parse_android_tree(value: &Value) -> ParsedTree {
    let mut tree = ParsedTree::default();
    let countries = match value {
        Value::Object(map) => map,
        Value::Null => return tree,
        _ => {
            warn!("Android country tree is not an object, ignoring it.");
            tree.quarantined.push("/countries".to_string());
            return tree;
        }
    };

    for (country_key, country) in countries {
        let Some(servers) = country.get("servers") else {
            continue;
        };
        let Value::Object(servers) = servers else {
            warn!(country = %country_key, "Quarantining country whose servers are not an object.");
            tree.quarantined.push(format!("/countries/{country_key}/servers"));
            continue;
        };
        for (server_key, item) in servers {
            push_record(
                &mut tree,
                format!("/countries/{country_key}/servers/{server_key}"),
                server_key.clone(),
                Some(country_key.clone()),
                item,
            );
        }
    }
    tree
}

/// Checks that `ref_path` addresses a single record inside the platform's
/// tree and returns it normalised with a leading slash.
pub fn validate_ref_path(platform: Platform, ref_path: &str) -> Option<String> {
    let segments: Vec<&str> = ref_path.split('/').filter(|s| !s.is_empty()).collect();
    let valid = match platform {
        Platform::Ios => {
            matches!(segments.as_slice(), ["servers", index] if index.parse::<usize>().is_ok())
        }
        Platform::Android => matches!(segments.as_slice(), ["countries", _, "servers", _]),
    };
    valid.then(|| format!("/{}", segments.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ios_list_keeps_index_paths_and_order() {
        let tree = ParsedTree::parse(
            Platform::Ios,
            &json!([
                {"ipaddress": "10.0.0.1", "ispremium": 1, "isavailable": 1, "city": "Paris"},
                null,
                {"ipaddress": "10.0.0.2", "ispremium": 0, "isavailable": 1, "profiletype": 2}
            ]),
        );
        assert_eq!(tree.records.len(), 2);
        assert_eq!(tree.records[0].ref_path, "/servers/0");
        assert_eq!(tree.records[1].ref_path, "/servers/2");
        let entry = tree.records[1].to_vpn_entry(Platform::Ios);
        assert_eq!(entry.order, Some(2));
        assert_eq!(entry.profile_type.as_deref(), Some("2"));
        assert_eq!(entry.name.as_deref(), Some("10.0.0.2"));
        assert!(!entry.is_premium);
    }

    #[test]
    fn android_tree_paths_include_country_and_key() {
        let tree = ParsedTree::parse(
            Platform::Android,
            &json!({
                "france": {"servers": {"srv-a": {"ipaddress": "10.0.0.5", "ispremium": 1, "isavailable": 0}}},
                "empty": {"name": "no servers here"}
            }),
        );
        assert_eq!(tree.records.len(), 1);
        let record = &tree.records[0];
        assert_eq!(record.ref_path, "/countries/france/servers/srv-a");
        let entry = record.to_vpn_entry(Platform::Android);
        assert_eq!(entry.country.as_deref(), Some("france"));
        assert_eq!(entry.id.as_deref(), Some("srv-a"));
        assert!(entry.is_premium);
        assert!(!entry.available);
    }

    #[test]
    fn malformed_records_are_quarantined() {
        let tree = ParsedTree::parse(
            Platform::Ios,
            &json!([
                {"ipaddress": "10.0.0.1", "ispremium": true, "isavailable": 1},
                {"ipaddress": "10.0.0.2", "ispremium": 2, "isavailable": 1},
                "not a record",
                {"ipaddress": "10.0.0.3", "ispremium": 1, "isavailable": 1}
            ]),
        );
        assert_eq!(tree.records.len(), 1);
        assert_eq!(tree.records[0].ref_path, "/servers/3");
        assert_eq!(tree.quarantined, vec!["/servers/0", "/servers/1", "/servers/2"]);
    }

    #[test]
    fn flag_update_serializes_as_integers() {
        let body = serde_json::to_value(FlagUpdate::from(EntryFlags {
            is_premium: true,
            is_available: false,
        }))
        .unwrap();
        assert_eq!(body, json!({"ispremium": 1, "isavailable": 0}));
    }

    #[test]
    fn ref_paths_must_stay_inside_the_platform_tree() {
        assert_eq!(validate_ref_path(Platform::Ios, "/servers/4").as_deref(), Some("/servers/4"));
        assert_eq!(validate_ref_path(Platform::Ios, "servers/4/").as_deref(), Some("/servers/4"));
        assert_eq!(validate_ref_path(Platform::Ios, "/servers/abc"), None);
        assert_eq!(validate_ref_path(Platform::Ios, "/countries/fr/servers/a"), None);
        assert_eq!(
            validate_ref_path(Platform::Android, "/countries/fr/servers/a").as_deref(),
            Some("/countries/fr/servers/a")
        );
        assert_eq!(validate_ref_path(Platform::Android, "/countries/fr"), None);
        assert_eq!(validate_ref_path(Platform::Android, "/"), None);
    }

    #[test]
    fn lookup_follows_indices_and_keys() {
        let ios = json!([{"ipaddress": "10.0.0.1"}, null]);
        assert_eq!(lookup(&ios, "/0").and_then(|r| r.get("ipaddress")), Some(&json!("10.0.0.1")));
        assert_eq!(lookup(&ios, "/1"), None);
        assert_eq!(lookup(&ios, "/7"), None);

        let android = json!({"de": {"servers": {"k1": {"ispremium": 1}}}});
        assert!(lookup(&android, "/de/servers/k1").is_some());
        assert_eq!(lookup(&android, "/de/servers/k2"), None);
        assert_eq!(lookup(&android, "/fr/servers/k1"), None);
    }
}
