use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hypernet_monitor::models::{Provider, ServerStatus};
use hypernet_monitor::providers::{Inventory, MvpsClient, OneProviderClient, ProviderAdapter, ProviderError};

async fn mvps_mock() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vps/"))
        .and(header("X_API_KEY", "key"))
        .and(header("X_API_USER", "user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": [
                {"id": 1, "label": "FR-Paris", "ips": ["10.0.0.1"], "status": "active", "package": "7"},
                {"id": 2, "label": "DE-Berlin", "ips": ["10.0.0.2"], "status": "pending", "package": "7"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": [{"id": 7, "cpu": 2, "ram": 2048, "disk": 40, "bandwidth": "1"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vps/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": {"bandwidth_usage": "256", "price": "30", "billing_term": 3, "expiration": 1767225600}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vps/2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn mvps_merges_details_and_keeps_servers_whose_detail_failed() {
    let mock = mvps_mock().await;
    let client = MvpsClient::new("key", "user", Some(&mock.uri()));
    let servers = client.fetch_servers().await.unwrap();
    assert_eq!(servers.len(), 2);

    let paris = &servers[0];
    assert_eq!(paris.id, "mvps-1");
    assert_eq!(paris.ip, "10.0.0.1");
    assert_eq!(paris.status, ServerStatus::Online);
    assert_eq!(paris.bandwidth.total, 1024.0);
    assert_eq!(paris.bandwidth.used, 256.0);
    assert_eq!(paris.price, 10.0);
    assert_eq!(paris.currency, "EUR");
    assert_eq!(paris.location.as_deref(), Some("France - Paris"));
    assert!(paris.renewal_date.is_some());

    let berlin = &servers[1];
    assert_eq!(berlin.id, "mvps-2");
    assert_eq!(berlin.cpu, 2);
    assert_eq!(berlin.status, ServerStatus::Offline);
}

#[tokio::test]
async fn mvps_list_failure_is_an_error() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vps/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "error", "message": "bad key"})))
        .mount(&mock)
        .await;
    let client = MvpsClient::new("key", "user", Some(&mock.uri()));
    let err = client.fetch_servers().await.unwrap_err();
    assert!(matches!(err, ProviderError::UnexpectedResponse { provider: Provider::Mvps, .. }));
}

#[tokio::test]
async fn oneprovider_looks_up_each_vm_by_ip() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/server/list"))
        .and(header("Api-Key", "api"))
        .and(header("Client-Key", "client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"servers": [
                {"server_id": 11, "ip_addr": "64.31.63.246", "hostname": "paris-1", "status": "Active"},
                {"server_id": 12, "ip_addr": "64.31.63.247", "hostname": "paris-2", "status": "Active", "recurring_amount": "0.005"}
            ]}
        })))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/vm/search"))
        .and(query_param("ip", "64.31.63.246"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {
                "server_info": {"cpus": 2, "ram_mb": 4096, "space_gb": 50, "city": "Paris", "country": "FR"},
                "server_state": {"state": "online"},
                "server_bandwidth": {"used": 300, "limit": 2000},
                "server_billing": {"recurring_amount": "0.01"}
            }
        })))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/vm/search"))
        .and(query_param("ip", "64.31.63.247"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock)
        .await;

    let client = OneProviderClient::new("api", "client", Some(&mock.uri()), Vec::new());
    let servers = client.fetch_servers().await.unwrap();
    assert_eq!(servers.len(), 2);

    assert_eq!(servers[0].id, "oneprovider-11");
    assert_eq!(servers[0].bandwidth.total, 2000.0);
    assert_eq!(servers[0].price, 7.2);
    assert_eq!(servers[0].status, ServerStatus::Online);

    assert_eq!(servers[1].id, "oneprovider-12");
    assert_eq!(servers[1].cpu, 0);
    assert_eq!(servers[1].price, 3.6);
    assert_eq!(servers[1].status, ServerStatus::Online);
}

#[tokio::test]
async fn inventory_keeps_healthy_providers_when_one_fails() {
    let mvps = mvps_mock().await;
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/server/list"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken)
        .await;

    let inventory = Inventory::new(vec![
        Arc::new(MvpsClient::new("key", "user", Some(&mvps.uri()))),
        Arc::new(OneProviderClient::new("api", "client", Some(&broken.uri()), Vec::new())),
    ]);
    let servers = inventory.fetch_all_servers().await;
    assert_eq!(servers.len(), 2);
    assert!(servers.iter().all(|s| s.provider == Provider::Mvps));

    let only = inventory.fetch_servers(Some(Provider::OneProvider)).await;
    assert!(only.is_empty());
}
