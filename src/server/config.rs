use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::notifications::senders::resend::{DEFAULT_API_URL, DEFAULT_FROM};
use crate::remote_config::firebase::DEFAULT_TOKEN_URI;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    pub listen_addr: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    pub admin_username: String,
    /// bcrypt hash of the admin password.
    pub admin_password_hash: String,
    pub jwt_secret: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MvpsConfig {
    pub api_key: String,
    pub api_user: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OneProviderConfig {
    pub api_key: String,
    pub client_key: String,
    pub base_url: Option<String>,
    pub unlimited_ips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FirebaseConfig {
    pub ios_database_url: Option<String>,
    pub android_database_url: Option<String>,
    pub client_email: Option<String>,
    /// PEM key with real newlines.
    pub private_key: Option<String>,
    pub database_secret: Option<String>,
    pub token_uri: String,
}

impl FirebaseConfig {
    pub fn is_configured(&self) -> bool {
        self.ios_database_url.is_some() || self.android_database_url.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailConfig {
    pub resend_api_key: Option<String>,
    pub to: Option<String>,
    pub from: String,
    pub api_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertsConfig {
    /// 0 disables the periodic evaluation.
    pub check_interval_seconds: u64,
    pub sync_availability: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub mvps: Option<MvpsConfig>,
    pub oneprovider: Option<OneProviderConfig>,
    pub firebase: FirebaseConfig,
    pub email: EmailConfig,
    pub alerts: AlertsConfig,
    pub data_dir: String,
    pub log_dir: String,
}

// Partial config for layering. The file is sectioned, the environment flat.

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
pub struct PartialServerConfig {
    http: PartialHttp,
    auth: PartialAuth,
    mvps: PartialMvps,
    oneprovider: PartialOneProvider,
    firebase: PartialFirebase,
    email: PartialEmail,
    alerts: PartialAlerts,
    data_dir: Option<String>,
    log_dir: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct PartialHttp {
    listen_addr: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct PartialAuth {
    admin_username: Option<String>,
    admin_password_hash: Option<String>,
    jwt_secret: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct PartialMvps {
    api_key: Option<String>,
    api_user: Option<String>,
    base_url: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct PartialOneProvider {
    api_key: Option<String>,
    client_key: Option<String>,
    base_url: Option<String>,
    unlimited_ips: Option<Vec<String>>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct PartialFirebase {
    ios_database_url: Option<String>,
    android_database_url: Option<String>,
    client_email: Option<String>,
    private_key: Option<String>,
    database_secret: Option<String>,
    token_uri: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct PartialEmail {
    resend_api_key: Option<String>,
    to: Option<String>,
    from: Option<String>,
    api_url: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct PartialAlerts {
    check_interval_seconds: Option<u64>,
    sync_availability: Option<bool>,
}

/// Environment overrides, read with `envy` (`JWT_SECRET`, `MVPS_API_KEY`, ...).
#[derive(Deserialize, Default, Debug)]
pub struct EnvOverrides {
    listen_addr: Option<String>,
    admin_username: Option<String>,
    admin_password_hash: Option<String>,
    jwt_secret: Option<String>,
    mvps_api_key: Option<String>,
    mvps_api_user: Option<String>,
    mvps_base_url: Option<String>,
    oneprovider_api_key: Option<String>,
    oneprovider_client_key: Option<String>,
    oneprovider_base_url: Option<String>,
    oneprovider_unlimited_ips: Option<Vec<String>>,
    firebase_ios_database_url: Option<String>,
    firebase_android_database_url: Option<String>,
    firebase_client_email: Option<String>,
    firebase_private_key: Option<String>,
    firebase_database_secret: Option<String>,
    firebase_token_uri: Option<String>,
    resend_api_key: Option<String>,
    email_to: Option<String>,
    email_from: Option<String>,
    resend_api_url: Option<String>,
    alert_check_interval_seconds: Option<u64>,
    alert_sync_availability: Option<bool>,
    data_dir: Option<String>,
    log_dir: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

const DEFAULT_CHECK_INTERVAL_SECONDS: u64 = 3600;

/// Empty strings count as unset.
fn pick(env: Option<String>, file: Option<String>) -> Option<String> {
    env.filter(|v| !v.trim().is_empty())
        .or(file.filter(|v| !v.trim().is_empty()))
}

/// Keys pasted from a service-account JSON file keep their `\n` escapes.
fn unescape_private_key(key: String) -> String {
    key.replace("\\n", "\n")
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str).map_err(|source| ConfigError::Read {
                    path: path_str.to_string(),
                    source,
                })?;
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path_str.to_string(),
                    source,
                })?
            }
            _ => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: EnvOverrides = envy::from_env()?;

        // 3. Merge: environment overrides file
        Self::from_layers(file_config, env_config)
    }

    pub fn from_layers(file: PartialServerConfig, env: EnvOverrides) -> Result<Self, ConfigError> {
        let auth = AuthConfig {
            admin_username: pick(env.admin_username, file.auth.admin_username).unwrap_or_else(|| "admin".to_string()),
            admin_password_hash: pick(env.admin_password_hash, file.auth.admin_password_hash)
                .ok_or(ConfigError::Missing("ADMIN_PASSWORD_HASH"))?,
            jwt_secret: pick(env.jwt_secret, file.auth.jwt_secret).ok_or(ConfigError::Missing("JWT_SECRET"))?,
        };

        let mvps = match (
            pick(env.mvps_api_key, file.mvps.api_key),
            pick(env.mvps_api_user, file.mvps.api_user),
        ) {
            (Some(api_key), Some(api_user)) => Some(MvpsConfig {
                api_key,
                api_user,
                base_url: pick(env.mvps_base_url, file.mvps.base_url),
            }),
            _ => None,
        };

        let oneprovider = match (
            pick(env.oneprovider_api_key, file.oneprovider.api_key),
            pick(env.oneprovider_client_key, file.oneprovider.client_key),
        ) {
            (Some(api_key), Some(client_key)) => Some(OneProviderConfig {
                api_key,
                client_key,
                base_url: pick(env.oneprovider_base_url, file.oneprovider.base_url),
                unlimited_ips: env
                    .oneprovider_unlimited_ips
                    .or(file.oneprovider.unlimited_ips)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|ip| ip.trim().to_string())
                    .filter(|ip| !ip.is_empty())
                    .collect(),
            }),
            _ => None,
        };

        let firebase = FirebaseConfig {
            ios_database_url: pick(env.firebase_ios_database_url, file.firebase.ios_database_url),
            android_database_url: pick(env.firebase_android_database_url, file.firebase.android_database_url),
            client_email: pick(env.firebase_client_email, file.firebase.client_email),
            private_key: pick(env.firebase_private_key, file.firebase.private_key).map(unescape_private_key),
            database_secret: pick(env.firebase_database_secret, file.firebase.database_secret),
            token_uri: pick(env.firebase_token_uri, file.firebase.token_uri)
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        };

        let email = EmailConfig {
            resend_api_key: pick(env.resend_api_key, file.email.resend_api_key),
            to: pick(env.email_to, file.email.to),
            from: pick(env.email_from, file.email.from).unwrap_or_else(|| DEFAULT_FROM.to_string()),
            api_url: pick(env.resend_api_url, file.email.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        };

        let alerts = AlertsConfig {
            check_interval_seconds: env
                .alert_check_interval_seconds
                .or(file.alerts.check_interval_seconds)
                .unwrap_or(DEFAULT_CHECK_INTERVAL_SECONDS),
            sync_availability: env
                .alert_sync_availability
                .or(file.alerts.sync_availability)
                .unwrap_or(false),
        };

        Ok(ServerConfig {
            http: HttpConfig {
                listen_addr: pick(env.listen_addr, file.http.listen_addr).unwrap_or_else(default_listen_addr),
            },
            auth,
            mvps,
            oneprovider,
            firebase,
            email,
            alerts,
            data_dir: pick(env.data_dir, file.data_dir).unwrap_or_else(default_data_dir),
            log_dir: pick(env.log_dir, file.log_dir).unwrap_or_else(default_log_dir),
        })
    }
}
