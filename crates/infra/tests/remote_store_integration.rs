//! End-to-end tests for the remote tenant store against a mock tenant service

use std::time::Duration;

use serde_json::json;
use tenantlink_core::TenantStore;
use tenantlink_domain::{
    CacheSettings, CircuitBreakerSettings, ErrorKind, PolicySettings, RemoteStoreConfig,
    RemoteTenantPayload, RetrySettings, StoreOperation, TenantItems, TenantRecord,
    TenantStoreError,
};
use tenantlink_infra::RemoteStore;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Store = RemoteStore<RemoteTenantPayload>;

fn acme() -> serde_json::Value {
    json!({
        "id": "t1",
        "identifier": "acme",
        "name": "Acme",
        "connectionString": "",
        "items": {},
    })
}

fn fast_policy() -> PolicySettings {
    PolicySettings {
        retry: RetrySettings { max_attempts: 3, initial_backoff_ms: 1, max_backoff_ms: 5 },
        ..PolicySettings::default()
    }
}

fn store(config: RemoteStoreConfig) -> Store {
    RemoteStore::from_config(config.with_policy(fast_policy())).expect("store")
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

#[tokio::test]
async fn blank_inputs_never_reach_the_network() {
    let server = MockServer::start().await;
    let store = store(RemoteStoreConfig::new(server.uri()));

    for blank in ["", " ", "   ", "\t", "\r\n"] {
        assert_eq!(store.try_get(blank).await.unwrap(), None);
        assert_eq!(store.try_get_by_identifier(blank).await.unwrap(), None);
    }

    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn favicon_requests_never_reach_the_network() {
    let server = MockServer::start().await;
    let store = store(RemoteStoreConfig::new(server.uri()));

    for identifier in ["favicon.ico", "FAVICON.ICO", "Favicon.Ico"] {
        assert_eq!(store.try_get_by_identifier(identifier).await.unwrap(), None);
    }

    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn get_by_id_maps_payload_to_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/id/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(acme()))
        .expect(1)
        .mount(&server)
        .await;

    let record = store(RemoteStoreConfig::new(server.uri())).try_get("t1").await.unwrap().unwrap();

    assert_eq!(record.id(), "t1");
    assert_eq!(record.identifier(), "acme");
    assert_eq!(record.name(), "Acme");
    assert_eq!(record.connection_string(), "");
    assert!(record.items().is_empty());
}

#[tokio::test]
async fn empty_body_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identifier/unknown"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(RemoteStoreConfig::new(server.uri()));
    assert_eq!(store.try_get_by_identifier("unknown").await.unwrap(), None);
}

#[tokio::test]
async fn writes_fail_regardless_of_input() {
    let server = MockServer::start().await;
    let store = store(RemoteStoreConfig::new(server.uri()));

    let mut items = TenantItems::new();
    items.insert("region".into(), json!("eu"));
    let records = [
        TenantRecord::new("", "", "", "", TenantItems::new()),
        TenantRecord::new("t1", "acme", "Acme", "Server=db", items),
    ];

    for record in &records {
        let err = store.try_add(record).await.unwrap_err();
        assert_eq!(err, TenantStoreError::unsupported(StoreOperation::Add));
        let err = store.try_update(record).await.unwrap_err();
        assert_eq!(err, TenantStoreError::unsupported(StoreOperation::Update));
    }
    for identifier in ["", "acme"] {
        let err = store.try_remove(identifier).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        assert_eq!(err.to_string(), "A remote store should not be able to delete tenants");
    }

    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn incomplete_authentication_fails_before_any_request() {
    let server = MockServer::start().await;
    let config = RemoteStoreConfig::new(server.uri()).with_authentication(
        server.uri(),
        "",
        "s3cret",
        "tenants.read",
    );
    let store = store(config);

    let by_id = store.try_get("t1").await.unwrap_err();
    let by_identifier = store.try_get_by_identifier("acme").await.unwrap_err();

    for err in [by_id, by_identifier] {
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("ClientId"));
    }
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn repeated_identifier_lookups_hit_upstream_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identifier/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(acme()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/identifier/nobody"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(RemoteStoreConfig::new(server.uri()));

    let first = store.try_get_by_identifier("acme").await.unwrap();
    for _ in 0..5 {
        let again = store.try_get_by_identifier("acme").await.unwrap();
        assert_eq!(again, first);
        assert_eq!(
            serde_json::to_vec(&again).unwrap(),
            serde_json::to_vec(&first).unwrap()
        );
        assert_eq!(store.try_get_by_identifier("nobody").await.unwrap(), None);
    }

    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn id_lookups_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/id/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(acme()))
        .expect(3)
        .mount(&server)
        .await;

    let store = store(RemoteStoreConfig::new(server.uri()));
    for _ in 0..3 {
        assert!(store.try_get("t1").await.unwrap().is_some());
    }
}

#[tokio::test]
async fn payload_survives_record_round_trip() {
    let server = MockServer::start().await;
    let wire = json!({
        "id": "t7",
        "identifier": "globex",
        "name": "Globex Corporation",
        "connectionString": "Server=db;Database=globex",
        "items": { "plan": "enterprise", "seats": 250, "features": ["sso", "audit"] },
    });
    Mock::given(method("GET"))
        .and(path("/identifier/globex"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wire.clone()))
        .mount(&server)
        .await;

    let store = store(RemoteStoreConfig::new(server.uri()));
    let record = store.try_get_by_identifier("globex").await.unwrap().unwrap();

    let expected: RemoteTenantPayload = serde_json::from_value(wire).unwrap();
    assert_eq!(RemoteTenantPayload::from(record), expected);
}

#[tokio::test]
async fn authenticated_lookup_uses_discovered_token_endpoint() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": server.uri(),
            "token_endpoint": format!("{}/connect/token", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=tenant-reader"))
        .and(body_string_contains("scope=tenants.read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-123",
            "token_type": "Bearer",
            "expires_in": 300,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tenants/identifier/acme"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(acme()))
        .expect(1)
        .mount(&server)
        .await;

    let config = RemoteStoreConfig::new(format!("{}/tenants", server.uri())).with_authentication(
        server.uri(),
        "tenant-reader",
        "s3cret",
        "tenants.read",
    );
    let record = store(config).try_get_by_identifier("acme").await.unwrap().unwrap();

    assert_eq!(record.id(), "t1");
}

#[tokio::test]
async fn refused_token_exchange_is_authentication_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": server.uri(),
            "token_endpoint": format!("{}/connect/token", server.uri()),
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_scope",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/identifier/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(acme()))
        .expect(0)
        .mount(&server)
        .await;

    let config = RemoteStoreConfig::new(server.uri()).with_authentication(
        server.uri(),
        "tenant-reader",
        "s3cret",
        "tenants.read",
    );
    let err = store(config).try_get_by_identifier("acme").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert!(err.to_string().contains("invalid_scope"));
}

#[tokio::test]
async fn transient_failure_is_retried() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identifier/acme"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/identifier/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(acme()))
        .mount(&server)
        .await;

    let store = store(RemoteStoreConfig::new(server.uri()));
    let record = store.try_get_by_identifier("acme").await.unwrap();

    assert_eq!(record.map(|r| r.identifier().to_string()), Some("acme".into()));
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn unexpected_status_surfaces_as_network_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identifier/acme"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let store = store(RemoteStoreConfig::new(server.uri()));
    let err = store.try_get_by_identifier("acme").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("database unavailable"));
    assert_eq!(request_count(&server).await, 3);

    // Failures are not cached
    assert!(store.try_get_by_identifier("acme").await.is_err());
    assert!(request_count(&server).await > 3);
}

#[tokio::test]
async fn circuit_opens_after_repeated_failures() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let policy = PolicySettings {
        cache: CacheSettings { enabled: false, ..CacheSettings::default() },
        retry: RetrySettings { max_attempts: 1, ..RetrySettings::default() },
        circuit_breaker: CircuitBreakerSettings {
            enabled: true,
            failure_threshold: 2,
            open_timeout_secs: 60,
        },
    };
    let store =
        RemoteStore::<RemoteTenantPayload>::from_config(RemoteStoreConfig::new(server.uri()).with_policy(policy))
            .unwrap();

    for _ in 0..2 {
        let err = store.try_get_by_identifier("acme").await.unwrap_err();
        assert_eq!(err.status(), Some(502));
    }
    let err = store.try_get_by_identifier("acme").await.unwrap_err();
    assert_eq!(err, TenantStoreError::CircuitOpen);
    assert_eq!(request_count(&server).await, 2);

    // The id path has no policy and still reaches the service
    assert!(store.try_get("t1").await.is_err());
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn misconfiguration_is_reported_on_every_lookup() {
    let server = MockServer::start().await;
    let config = RemoteStoreConfig::new(server.uri()).with_authentication(
        server.uri(),
        "",
        "s3cret",
        "tenants.read",
    );
    let store = store(config);
    let threshold = CircuitBreakerSettings::default().failure_threshold;

    for _ in 0..threshold + 2 {
        let err = store.try_get_by_identifier("acme").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn non_transient_errors_pass_through_the_default_policies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identifier/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let store = store(RemoteStoreConfig::new(server.uri()));
    let threshold = CircuitBreakerSettings::default().failure_threshold;
    let lookups = usize::try_from(threshold * 2).unwrap();

    for _ in 0..lookups {
        let err = store.try_get_by_identifier("acme").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Deserialization);
    }

    // Each lookup reaches the service exactly once
    assert_eq!(request_count(&server).await, lookups);
}

#[tokio::test]
async fn caller_deadline_does_not_poison_later_lookups() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identifier/acme"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(acme()).set_delay(Duration::from_secs(5)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/identifier/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(acme()))
        .mount(&server)
        .await;

    let store = store(RemoteStoreConfig::new(server.uri()));

    let slow = tokio::time::timeout(
        Duration::from_millis(100),
        store.try_get_by_identifier("acme"),
    )
    .await;
    assert!(slow.is_err());

    let record = store.try_get_by_identifier("acme").await.unwrap().unwrap();
    assert_eq!(record.identifier(), "acme");
}

#[tokio::test]
async fn circuit_recovers_after_cancelled_trial_lookup() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identifier/acme"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(acme()).set_delay(Duration::from_secs(5)),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/identifier/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(acme()))
        .mount(&server)
        .await;

    let policy = PolicySettings {
        cache: CacheSettings { enabled: false, ..CacheSettings::default() },
        retry: RetrySettings { max_attempts: 1, ..RetrySettings::default() },
        circuit_breaker: CircuitBreakerSettings {
            enabled: true,
            failure_threshold: 1,
            open_timeout_secs: 1,
        },
    };
    let store = RemoteStore::<RemoteTenantPayload>::from_config(
        RemoteStoreConfig::new(server.uri()).with_policy(policy),
    )
    .unwrap();
    let deadline = Duration::from_millis(100);

    // Timed out lookup trips the breaker
    assert!(tokio::time::timeout(deadline, store.try_get_by_identifier("acme")).await.is_err());
    let err = store.try_get_by_identifier("acme").await.unwrap_err();
    assert_eq!(err, TenantStoreError::CircuitOpen);

    // Timed out trial lookup re-opens it
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(tokio::time::timeout(deadline, store.try_get_by_identifier("acme")).await.is_err());
    let err = store.try_get_by_identifier("acme").await.unwrap_err();
    assert_eq!(err, TenantStoreError::CircuitOpen);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let record = store.try_get_by_identifier("acme").await.unwrap().unwrap();
    assert_eq!(record.id(), "t1");
    assert_eq!(request_count(&server).await, 3);
}
