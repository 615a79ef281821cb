pub mod alert;
pub mod server;

pub use alert::{
    Alert, AlertConfig, AlertDetails, AlertType, BandwidthThresholds, RenewalBands, Severity,
};
pub use server::{
    Bandwidth, EntryFlags, Platform, Provider, Server, ServerStatus, Tier, VpnConfig, VpnEntry,
    UNLIMITED_BANDWIDTH,
};
