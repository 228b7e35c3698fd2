use fnctl_core::{
    ApiUrl, App, CallContext, ErrorKind, FnError, Function, HttpTransport, ListQuery, Scope,
    Trigger, TriggerType,
};
use fnctl_oss::OssProvider;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer, token: &str) -> OssProvider {
    let transport = HttpTransport::new(Duration::from_secs(30), false)
        .unwrap()
        .shared();
    OssProvider::new(ApiUrl::parse(&server.uri()).unwrap(), token, transport)
}

#[tokio::test]
async fn test_create_app() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/apps"))
        .and(body_json(json!({"name": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "01",
            "name": "hello",
            "created_at": "2024-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = provider(&server, "").api_client_v2().unwrap();
    let app = App {
        name: "hello".into(),
        ..Default::default()
    };
    let created = api.apps.create(&CallContext::default(), &app).await.unwrap();

    assert_eq!(created.id, "01");
    assert_eq!(created.name, "hello");
    assert!(created.created_at.is_some());
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/apps/01"))
        .and(header("authorization", "Bearer t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "01", "name": "a"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = provider(&server, "t0ken").api_client_v2().unwrap();
    let app = api.apps.get(&CallContext::default(), "01").await.unwrap();
    assert_eq!(app.value.name, "a");
    assert_eq!(app.etag, None);
}

#[tokio::test]
async fn test_list_sends_filters_and_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/fns"))
        .and(query_param("app_id", "app1"))
        .and(query_param("name", "hello"))
        .and(query_param("cursor", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "f1", "name": "hello", "app_id": "app1", "image": "fnproject/hello:0.0.1"}],
            "next_cursor": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = provider(&server, "").api_client_v2().unwrap();
    let query = ListQuery::new(Scope::app("app1"))
        .with_name("hello")
        .with_cursor(Some("c1".into()));
    let page = api
        .functions
        .list(&CallContext::default(), &query)
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].image, "fnproject/hello:0.0.1");
    assert_eq!(page.next_cursor, None);
}

#[tokio::test]
async fn test_list_missing_items_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/triggers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let api = provider(&server, "").api_client_v2().unwrap();
    let page = api
        .triggers
        .list(
            &CallContext::default(),
            &ListQuery::new(Scope::function("app1", "fn1")),
        )
        .await
        .unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_update_puts_changes_only() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v2/fns/f1"))
        .and(body_json(json!({"memory": 256})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "f1",
            "name": "hello",
            "image": "fnproject/hello:0.0.1",
            "memory": 256
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = provider(&server, "").api_client_v2().unwrap();
    let changes = Function {
        memory: 256,
        ..Default::default()
    };
    let updated = api
        .functions
        .update(&CallContext::default(), "f1", &changes)
        .await
        .unwrap();
    assert_eq!(updated.memory, 256);
    assert_eq!(updated.image, "fnproject/hello:0.0.1");
}

#[tokio::test]
async fn test_trigger_update_leaves_type_alone() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v2/triggers/t1"))
        .and(body_json(json!({"source": "/new"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t1",
            "name": "nightly",
            "source": "/new",
            "type": "schedule"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = provider(&server, "").api_client_v2().unwrap();
    let changes = Trigger {
        source: "/new".into(),
        ..Default::default()
    };
    let updated = api
        .triggers
        .update(&CallContext::default(), "t1", &changes)
        .await
        .unwrap();
    assert_eq!(updated.trigger_type, Some(TriggerType::Schedule));
}

#[tokio::test]
async fn test_bad_request_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/triggers"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"message": "Trigger source must begin with a '/'"})),
        )
        .mount(&server)
        .await;

    let api = provider(&server, "").api_client_v2().unwrap();
    let trigger = Trigger {
        name: "t".into(),
        app_id: "app1".into(),
        fn_id: "fn1".into(),
        source: "nope".into(),
        trigger_type: Some(TriggerType::Http),
        ..Default::default()
    };
    let err = api
        .triggers
        .create(&CallContext::default(), &trigger)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(err.to_string(), "Trigger source must begin with a '/'");
}

#[tokio::test]
async fn test_conflict_and_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/apps"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({"error": {"message": "App already exists"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v2/apps/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = provider(&server, "").api_client_v2().unwrap();
    let ctx = CallContext::default();

    let app = App {
        name: "dup".into(),
        ..Default::default()
    };
    let err = api.apps.create(&ctx, &app).await.unwrap_err();
    assert!(matches!(err, FnError::Conflict(ref m) if m == "App already exists"));

    let err = api.apps.delete(&ctx, "missing").await.unwrap_err();
    assert_eq!(err.to_string(), "app missing not found");
}

#[tokio::test]
async fn test_server_error_maps_to_internal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/apps/01"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let api = provider(&server, "").api_client_v2().unwrap();
    let err = api.apps.get(&CallContext::default(), "01").await.unwrap_err();
    assert!(matches!(err, FnError::Internal { status: 503, ref message } if message == "upstream down"));
}
