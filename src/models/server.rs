use serde::{Deserialize, Serialize};
use std::fmt;

/// Bandwidth caps at or above this value mean "unlimited".
pub const UNLIMITED_BANDWIDTH: f64 = 999_999_999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Mvps,
    #[serde(rename = "oneprovider")]
    OneProvider,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Mvps => "mvps",
            Provider::OneProvider => "oneprovider",
        }
    }

    /// Label shown to humans (email badges, logs).
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Mvps => "MVPS",
            Provider::OneProvider => "OneProvider",
        }
    }

    /// Whether the provider reports an explicit contract renewal date.
    /// OneProvider bills monthly and its renewal date is derived, not reported.
    pub fn tracks_renewals(&self) -> bool {
        matches!(self, Provider::Mvps)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Offline,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bandwidth {
    /// GB consumed in the current cycle.
    pub used: f64,
    /// GB allowed per cycle, or [`UNLIMITED_BANDWIDTH`].
    pub total: f64,
}

impl Bandwidth {
    pub fn is_unlimited(&self) -> bool {
        self.total >= UNLIMITED_BANDWIDTH
    }

    /// Usage percentage, `None` when the cap is unlimited or unknown.
    pub fn usage_percent(&self) -> Option<f64> {
        if self.is_unlimited() || self.total <= 0.0 {
            return None;
        }
        Some(self.used * 100.0 / self.total)
    }
}

/// A virtual server as reported by a hosting provider, optionally enriched
/// with the mobile-app configuration that references its IP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub provider: Provider,
    pub status: ServerStatus,
    pub cpu: u32,
    pub ram: u32,
    pub disk: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_usage: Option<f64>,
    pub bandwidth: Bandwidth,
    pub price: f64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpn_config: Option<VpnConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Ios, Platform::Android];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            other => Err(format!("Unknown platform: {other}")),
        }
    }
}

/// Mobile-app facing classification of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Premium,
    Free,
    Unavailable,
}

impl Tier {
    pub fn flags(&self) -> EntryFlags {
        EntryFlags {
            is_premium: matches!(self, Tier::Premium),
            is_available: !matches!(self, Tier::Unavailable),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "premium" => Ok(Tier::Premium),
            "free" | "gratuit" => Ok(Tier::Free),
            "unavailable" | "indisponible" => Ok(Tier::Unavailable),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

/// The two mutable fields of a mobile-config record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryFlags {
    pub is_premium: bool,
    pub is_available: bool,
}

impl EntryFlags {
    pub const UNAVAILABLE: EntryFlags = EntryFlags {
        is_premium: false,
        is_available: false,
    };
    pub const PREMIUM: EntryFlags = EntryFlags {
        is_premium: true,
        is_available: true,
    };
}

/// One mobile-config record matched to a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnEntry {
    pub available: bool,
    pub is_premium: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Per-server view of the mobile configuration.
///
/// `ios` / `android` mirror the first element of `ios_multiple` /
/// `android_multiple`. The lists hold more than one entry only when the store
/// registers the same IP several times on that platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<VpnEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<VpnEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios_multiple: Option<Vec<VpnEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android_multiple: Option<Vec<VpnEntry>>,
}

impl VpnConfig {
    /// Builds the config from matched lists; `None` when both are empty.
    pub fn from_matches(ios: Vec<VpnEntry>, android: Vec<VpnEntry>) -> Option<Self> {
        if ios.is_empty() && android.is_empty() {
            return None;
        }
        let (ios, ios_multiple) = split_primary(ios);
        let (android, android_multiple) = split_primary(android);
        Some(Self {
            ios,
            android,
            ios_multiple,
            android_multiple,
        })
    }

    pub fn entries(&self, platform: Platform) -> &[VpnEntry] {
        let list = match platform {
            Platform::Ios => &self.ios_multiple,
            Platform::Android => &self.android_multiple,
        };
        list.as_deref().unwrap_or(&[])
    }

    pub fn has_duplicates(&self) -> bool {
        self.entries(Platform::Ios).len() > 1 || self.entries(Platform::Android).len() > 1
    }

    /// True when the primary iOS and Android entries disagree.
    ///
    /// Two unavailable entries agree regardless of tier; an entry present on
    /// one platform only always counts as a difference.
    pub fn has_platform_difference(&self) -> bool {
        match (&self.ios, &self.android) {
            (Some(ios), Some(android)) => {
                if !ios.available && !android.available {
                    return false;
                }
                ios.is_premium != android.is_premium || ios.available != android.available
            }
            (Some(_), None) | (None, Some(_)) => true,
            (None, None) => false,
        }
    }
}

fn split_primary(list: Vec<VpnEntry>) -> (Option<VpnEntry>, Option<Vec<VpnEntry>>) {
    match list.first() {
        Some(first) => (Some(first.clone()), Some(list)),
        None => (None, None),
    }
}
