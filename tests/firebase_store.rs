use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hypernet_monitor::models::{EntryFlags, Platform};
use hypernet_monitor::remote_config::{
    FirebaseAuth, FirebaseConfigStore, FirebaseDatabase, RemoteConfigStore, ServiceAccountKey, StoreError,
};

const TEST_KEY: &str = include_str!("fixtures/service_account_key.pem");

fn store(ios: Option<&MockServer>, android: Option<&MockServer>, auth: FirebaseAuth) -> FirebaseConfigStore {
    FirebaseConfigStore::new(
        ios.map(|s| FirebaseDatabase::new(&s.uri(), auth.clone()).unwrap()),
        android.map(|s| FirebaseDatabase::new(&s.uri(), auth.clone()).unwrap()),
    )
}

#[tokio::test]
async fn reads_each_platform_root() {
    let ios = MockServer::start().await;
    let android = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/servers.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"ipaddress": "10.0.0.1", "ispremium": 1}])))
        .expect(1)
        .mount(&ios)
        .await;
    Mock::given(method("GET"))
        .and(path("/countries.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .expect(1)
        .mount(&android)
        .await;

    let store = store(Some(&ios), Some(&android), FirebaseAuth::None);
    let ios_tree = store.read_all(Platform::Ios).await.unwrap().unwrap();
    assert_eq!(ios_tree[0]["ipaddress"], "10.0.0.1");
    assert!(store.read_all(Platform::Android).await.unwrap().is_none());
}

#[tokio::test]
async fn update_patches_only_the_integer_flags() {
    let android = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/countries/de/servers/k1.json"))
        .and(query_param("auth", "db-secret"))
        .and(body_json(json!({"ispremium": 0, "isavailable": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ispremium": 0, "isavailable": 0})))
        .expect(1)
        .mount(&android)
        .await;

    let store = store(None, Some(&android), FirebaseAuth::DatabaseSecret("db-secret".into()));
    store
        .update_fields(Platform::Android, "/countries/de/servers/k1", EntryFlags::UNAVAILABLE)
        .await
        .unwrap();
}

#[tokio::test]
async fn rejected_credentials_are_reported_as_unauthorized() {
    let ios = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/servers.json"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Permission denied"})))
        .mount(&ios)
        .await;

    let store = store(Some(&ios), None, FirebaseAuth::DatabaseSecret("wrong".into()));
    let err = store.read_all(Platform::Ios).await.unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized(_)));
}

#[tokio::test]
async fn unconfigured_platform_is_an_error() {
    let ios = MockServer::start().await;
    let store = store(Some(&ios), None, FirebaseAuth::None);
    let err = store.read_all(Platform::Android).await.unwrap_err();
    assert!(matches!(err, StoreError::PlatformNotConfigured(Platform::Android)));
}

#[tokio::test]
async fn service_account_token_is_exchanged_once_and_reused() {
    let oauth = MockServer::start().await;
    let ios = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&oauth)
        .await;
    Mock::given(method("GET"))
        .and(path("/servers.json"))
        .and(header("authorization", "Bearer ya29.test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&ios)
        .await;

    let auth = FirebaseAuth::ServiceAccount(ServiceAccountKey {
        client_email: "monitor@project.iam.gserviceaccount.com".into(),
        private_key: TEST_KEY.into(),
        token_uri: format!("{}/token", oauth.uri()),
    });
    let store = store(Some(&ios), None, auth);
    store.read_all(Platform::Ios).await.unwrap();
    store.read_all(Platform::Ios).await.unwrap();
}

#[tokio::test]
async fn invalid_private_key_is_a_credentials_error() {
    let ios = MockServer::start().await;
    let auth = FirebaseAuth::ServiceAccount(ServiceAccountKey {
        client_email: "monitor@project.iam.gserviceaccount.com".into(),
        private_key: "not a key".into(),
        token_uri: format!("{}/token", ios.uri()),
    });
    let store = store(Some(&ios), None, auth);
    let err = store.read_all(Platform::Ios).await.unwrap_err();
    assert!(matches!(err, StoreError::Credentials(_)));
}

#[tokio::test]
async fn record_reads_address_a_single_node() {
    let android = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/countries/de/servers/k1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ipaddress": "10.0.0.2", "ispremium": 1})))
        .expect(1)
        .mount(&android)
        .await;
    Mock::given(method("GET"))
        .and(path("/countries/de/servers/gone.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .expect(1)
        .mount(&android)
        .await;

    let store = store(None, Some(&android), FirebaseAuth::None);
    let record = store
        .read_record(Platform::Android, "/countries/de/servers/k1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record["ipaddress"], "10.0.0.2");
    assert!(store
        .read_record(Platform::Android, "/countries/de/servers/gone")
        .await
        .unwrap()
        .is_none());
}
