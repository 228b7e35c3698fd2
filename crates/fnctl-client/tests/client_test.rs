use async_trait::async_trait;
use fnctl_client::{Client, Provider};
use fnctl_core::{
    ApiUrl, App, BufferDiagnostics, ErrorKind, FnError, HttpTransport, RoundTrip, Scope,
    SharedTransport, Trigger,
};
use fnctl_oci::provider::SIGNED_BASE_HEADERS;
use fnctl_oci::{OracleProvider, RequestSigner};
use fnctl_oss::OssProvider;
use rsa::RsaPrivateKey;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn base_transport() -> SharedTransport {
    HttpTransport::new(Duration::from_secs(30), false)
        .unwrap()
        .shared()
}

fn oss_client(server: &MockServer) -> (Client, BufferDiagnostics) {
    let provider = OssProvider::new(ApiUrl::parse(&server.uri()).unwrap(), "", base_transport());
    let diagnostics = BufferDiagnostics::new();
    let client = Client::new(provider.into(), Arc::new(diagnostics.clone())).unwrap();
    (client, diagnostics)
}

fn oracle_provider(api_url: &str, transport: SharedTransport) -> Provider {
    let key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
    let signer = RequestSigner::new("tenancy/user/fp", key).with_base_headers(SIGNED_BASE_HEADERS);
    OracleProvider::new(
        ApiUrl::parse(api_url).unwrap(),
        "ocid1.compartment.oc1..test",
        signer,
        transport,
    )
    .into()
}

/// Counts round trips and fails every one of them
#[derive(Default)]
struct CountingTransport {
    calls: AtomicUsize,
}

#[async_trait]
impl RoundTrip for CountingTransport {
    async fn round_trip(&self, _request: reqwest::Request) -> fnctl_core::Result<reqwest::Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FnError::Transport("no network in this test".into()))
    }
}

#[tokio::test]
async fn test_create_then_get_by_name() {
    let server = MockServer::start().await;
    let stored = json!({
        "id": "01",
        "name": "hello",
        "config": {"LOG_LEVEL": "debug"},
        "created_at": "2024-01-01T00:00:00Z"
    });
    Mock::given(method("POST"))
        .and(path("/v2/apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/apps"))
        .and(query_param("name", "hello"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [stored]})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = oss_client(&server);
    let ctx = client.context();
    let app = App {
        name: "hello".into(),
        config: BTreeMap::from([("LOG_LEVEL".to_string(), "debug".to_string())]),
        ..Default::default()
    };

    let created = client.apps().create(&ctx, &app).await.unwrap();
    assert_eq!(created.id, "01");

    let found = client
        .apps()
        .get_by_name(&ctx, &Scope::root(), "hello")
        .await
        .unwrap();
    assert_eq!(found.name, app.name);
    assert_eq!(found.config, app.config);
    assert_eq!(found.annotations, app.annotations);
    assert_eq!(found.syslog_url, app.syslog_url);
}

#[tokio::test]
async fn test_invalid_name_is_rejected_before_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = oss_client(&server);
    let app = App {
        name: "not a name!".into(),
        ..Default::default()
    };
    let err = client
        .apps()
        .create(&client.context(), &app)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_list_follows_cursor_until_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/apps"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "1", "name": "a"}, {"id": "2", "name": "b"}],
            "next_cursor": "x"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/apps"))
        .and(query_param("cursor", "x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "3", "name": "c"}, {"id": "4", "name": "d"}],
            "next_cursor": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = oss_client(&server);
    let apps = client
        .apps()
        .list(&client.context(), &Scope::root(), 3)
        .await
        .unwrap();
    let names: Vec<&str> = apps.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_empty_list_hint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/fns"))
        .and(query_param("app_id", "app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    let (client, diagnostics) = oss_client(&server);
    let fns = client
        .functions()
        .list(&client.context(), &Scope::app("app1"), 30)
        .await
        .unwrap();
    assert!(fns.is_empty());
    assert_eq!(diagnostics.contents(), "No functions found\n");
}

#[tokio::test]
async fn test_delete_twice() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v2/apps/01"))
        .respond_with(ResponseTemplate::new(204))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v2/apps/01"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "App not found"})))
        .mount(&server)
        .await;

    let (client, _) = oss_client(&server);
    let ctx = client.context();

    client.apps().delete(&ctx, "01", false).await.unwrap();
    let err = client.apps().delete(&ctx, "01", false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.exit_code(), 1);

    client.apps().delete(&ctx, "01", true).await.unwrap();
}

#[tokio::test]
async fn test_oracle_triggers_make_no_calls() {
    let counting = Arc::new(CountingTransport::default());
    let provider = oracle_provider("https://functions.example.com", counting.clone());
    assert!(
        provider
            .unavailable_resources()
            .contains(&fnctl_core::ResourceType::Trigger)
    );

    let client = Client::new(provider, Arc::new(BufferDiagnostics::new())).unwrap();
    let ctx = client.context();
    let scope = Scope::function("app", "");

    let err = client.triggers().list(&ctx, &scope, 100).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
    assert_eq!(err.to_string(), "HTTP Triggers are not supported on this provider");
    assert_eq!(err.exit_code(), 3);

    let trigger = Trigger {
        name: "t".into(),
        source: "/t".into(),
        ..Default::default()
    };
    assert!(client.triggers().create(&ctx, &trigger).await.is_err());
    assert!(client.triggers().get_by_name(&ctx, &scope, "t").await.is_err());
    assert!(client.triggers().update(&ctx, "t1", &trigger).await.is_err());
    assert!(client.triggers().delete(&ctx, "t1", true).await.is_err());

    assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oracle_update_retry_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/20181201/applications/a1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "stale")
                .set_body_json(json!({"id": "a1", "displayName": "one", "config": {}})),
        )
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/20181201/applications/a1"))
        .respond_with(ResponseTemplate::new(412).set_body_json(json!({
            "code": "PreconditionFailed",
            "message": "The If-Match header does not match the current etag"
        })))
        .expect(3)
        .mount(&server)
        .await;

    let client = Client::new(
        oracle_provider(&server.uri(), base_transport()),
        Arc::new(BufferDiagnostics::new()),
    )
    .unwrap();
    let changes = App {
        config: BTreeMap::from([("K".to_string(), "V".to_string())]),
        ..Default::default()
    };
    let err = client
        .apps()
        .update(&client.context(), "a1", &changes)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
}

#[tokio::test]
async fn test_oracle_update_recovers_after_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/20181201/applications/a1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "v2")
                .set_body_json(json!({"id": "a1", "displayName": "one", "config": {"A": "1"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/20181201/applications/a1"))
        .respond_with(ResponseTemplate::new(412))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/20181201/applications/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a1",
            "displayName": "one",
            "config": {"A": "1", "K": "V"}
        })))
        .mount(&server)
        .await;

    let client = Client::new(
        oracle_provider(&server.uri(), base_transport()),
        Arc::new(BufferDiagnostics::new()),
    )
    .unwrap();
    let changes = App {
        config: BTreeMap::from([("K".to_string(), "V".to_string())]),
        ..Default::default()
    };
    let updated = client
        .apps()
        .update(&client.context(), "a1", &changes)
        .await
        .unwrap();
    assert_eq!(updated.config.len(), 2);
}
