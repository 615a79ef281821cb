//! Client for the Firebase Realtime Database REST API.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::schema::{platform_root, FlagUpdate};
use super::{RemoteConfigStore, StoreError};
use crate::models::{EntryFlags, Platform};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DATABASE_SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Access tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    pub token_uri: String,
}

#[derive(Debug, Clone)]
pub enum FirebaseAuth {
    /// No credentials (emulator or open rules).
    None,
    /// Legacy database secret, sent as the `auth` query parameter.
    DatabaseSecret(String),
    /// OAuth2 access token obtained with a signed service-account assertion.
    ServiceAccount(ServiceAccountKey),
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// One Realtime Database instance.
#[derive(Debug)]
pub struct FirebaseDatabase {
    client: Client,
    base_url: String,
    auth: FirebaseAuth,
    token: RwLock<Option<CachedToken>>,
}

impl FirebaseDatabase {
    pub fn new(base_url: &str, auth: FirebaseAuth) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}.json", self.base_url, encoded.join("/"))
    }

    /// Reads the value at `path`; `None` when nothing is stored there.
    pub async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let request = self.authorize(self.client.get(self.url_for(path))).await?;
        let response = check_status(request.send().await?).await?;
        let value: Option<Value> = response.json().await?;
        Ok(value.filter(|v| !v.is_null()))
    }

    /// Merges `body` into the object at `path`, leaving other fields untouched.
    pub async fn patch<B: Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> Result<(), StoreError> {
        let request = self.authorize(self.client.patch(self.url_for(path))).await?;
        check_status(request.json(body).send().await?).await?;
        Ok(())
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        match &self.auth {
            FirebaseAuth::None => Ok(request),
            FirebaseAuth::DatabaseSecret(secret) => Ok(request.query(&[("auth", secret.as_str())])),
            FirebaseAuth::ServiceAccount(key) => {
                let token = self.access_token(key).await?;
                Ok(request.bearer_auth(token))
            }
        }
    }

    async fn access_token(&self, key: &ServiceAccountKey) -> Result<String, StoreError> {
        let now = Utc::now();
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.expires_at - ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now {
                return Ok(cached.value.clone());
            }
        }

        let mut guard = self.token.write().await;
        // Another request may have refreshed it while we waited for the lock.
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at - ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now {
                return Ok(cached.value.clone());
            }
        }

        debug!(client_email = %key.client_email, "Requesting a new database access token.");
        let fresh = self.exchange_assertion(key, now).await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    async fn exchange_assertion(&self, key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<CachedToken, StoreError> {
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: DATABASE_SCOPES,
            aud: &key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + 3600,
        };
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| StoreError::Credentials(format!("Invalid service account private key: {e}")))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| StoreError::Credentials(format!("Failed to sign token assertion: {e}")))?;

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = check_status(response).await?.json().await?;

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + ChronoDuration::seconds(token.expires_in),
        })
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(StoreError::Unauthorized(body));
    }
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

/// The iOS and Android mobile-config databases.
#[derive(Debug)]
pub struct FirebaseConfigStore {
    ios: Option<FirebaseDatabase>,
    android: Option<FirebaseDatabase>,
}

impl FirebaseConfigStore {
    pub fn new(ios: Option<FirebaseDatabase>, android: Option<FirebaseDatabase>) -> Self {
        if let Some(db) = &ios {
            info!(url = %db.base_url(), "iOS mobile-config database configured.");
        }
        if let Some(db) = &android {
            info!(url = %db.base_url(), "Android mobile-config database configured.");
        }
        Self { ios, android }
    }

    fn database(&self, platform: Platform) -> Result<&FirebaseDatabase, StoreError> {
        let db = match platform {
            Platform::Ios => self.ios.as_ref(),
            Platform::Android => self.android.as_ref(),
        };
        db.ok_or(StoreError::PlatformNotConfigured(platform))
    }
}

#[async_trait]
impl RemoteConfigStore for FirebaseConfigStore {
    async fn read_all(&self, platform: Platform) -> Result<Option<Value>, StoreError> {
        self.database(platform)?.get(platform_root(platform)).await
    }

    async fn read_record(&self, platform: Platform, path: &str) -> Result<Option<Value>, StoreError> {
        self.database(platform)?.get(path).await
    }

    async fn update_fields(&self, platform: Platform, path: &str, flags: EntryFlags) -> Result<(), StoreError> {
        self.database(platform)?.patch(path, &FlagUpdate::from(flags)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_encode_each_segment() {
        let db = FirebaseDatabase::new("https://example.firebaseio.com/", FirebaseAuth::None).unwrap();
        assert_eq!(db.url_for("/servers"), "https://example.firebaseio.com/servers.json");
        assert_eq!(
            db.url_for("/countries/United Kingdom/servers/-Nx1"),
            "https://example.firebaseio.com/countries/United%20Kingdom/servers/-Nx1.json"
        );
        assert_eq!(db.url_for("/"), "https://example.firebaseio.com/.json");
    }
}
