#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `fn` with an empty home directory and no ambient overrides
fn fn_cmd(home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("fn").unwrap();
    cmd.env("HOME", home.path())
        .env_remove("FN_CONTEXT")
        .env_remove("FN_TOKEN")
        .env_remove("FN_PROVIDER")
        .env_remove("API_URL")
        .env_remove("RUST_LOG");
    cmd
}

/// Run `args` against `api_url` on the blocking pool
async fn run_against(api_url: String, args: &'static [&'static str]) -> assert_cmd::assert::Assert {
    run_with_stdin(api_url, args, "").await
}

async fn run_with_stdin(
    api_url: String,
    args: &'static [&'static str],
    stdin: &'static str,
) -> assert_cmd::assert::Assert {
    tokio::task::spawn_blocking(move || {
        let home = tempfile::tempdir().unwrap();
        fn_cmd(&home)
            .env("API_URL", api_url)
            .args(args)
            .write_stdin(stdin)
            .assert()
    })
    .await
    .unwrap()
}

#[test]
fn test_cli_help() {
    let home = tempfile::tempdir().unwrap();
    fn_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("invoke"));
}

#[test]
fn test_invoke_help() {
    let home = tempfile::tempdir().unwrap();
    fn_cmd(&home)
        .args(["invoke", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--env"))
        .stdout(predicate::str::contains("--content-type"));
}

#[test]
fn test_negative_limit_is_user_error() {
    let home = tempfile::tempdir().unwrap();
    fn_cmd(&home)
        .args(["list", "apps", "--limit", "-1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("limit must not be negative"));
}

#[test]
fn test_unknown_provider() {
    let home = tempfile::tempdir().unwrap();
    fn_cmd(&home)
        .env("FN_PROVIDER", "bogus")
        .args(["list", "apps"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "No provider with id 'bogus' is registered",
        ));
}

#[tokio::test]
async fn test_list_apps_prints_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "01", "name": "hello"}]
        })))
        .mount(&server)
        .await;

    run_against(server.uri(), &["list", "apps"])
        .await
        .success()
        .stdout(predicate::str::contains("\"name\": \"hello\""));
}

#[tokio::test]
async fn test_empty_list_hint_goes_to_stderr() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    run_against(server.uri(), &["list", "apps"])
        .await
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No apps found"));
}

#[tokio::test]
async fn test_missing_app_exits_with_user_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/apps"))
        .and(query_param("name", "missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    run_against(server.uri(), &["get", "app", "missing"])
        .await
        .code(1)
        .stderr(predicate::str::contains("app missing not found"));
}

#[tokio::test]
async fn test_delete_missing_app_with_ignore_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    run_against(server.uri(), &["delete", "app", "gone", "--ignore-missing"])
        .await
        .success();
}

#[tokio::test]
async fn test_server_error_exits_with_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/apps"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "db down"})))
        .mount(&server)
        .await;

    run_against(server.uri(), &["create", "app", "hello"])
        .await
        .code(2)
        .stderr(predicate::str::contains("db down"));
}

#[tokio::test]
async fn test_invoke_by_function_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/fns/f1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "f1",
            "name": "hello",
            "app_id": "a1",
            "image": "fnproject/hello:0.0.1",
            "annotations": {
                "fnproject.io/fn/invokeEndpoint": format!("{}/invoke/f1", server.uri())
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/invoke/f1"))
        .and(body_string("Bob"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Fn_call_id", "01CALL")
                .set_body_string("Hello Bob\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    run_with_stdin(server.uri(), &["invoke", "--fn-id", "f1"], "Bob")
        .await
        .success()
        .stdout("Hello Bob\n");
}

#[tokio::test]
async fn test_invoke_route_uses_call_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/r/myapp/hello"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Fn_call_id", "01CALL")
                .set_body_string("routed"),
        )
        .expect(1)
        .mount(&server)
        .await;

    run_with_stdin(server.uri(), &["invoke", "myapp", "--route", "/hello"], "{}")
        .await
        .success()
        .stdout("routed");
}

#[test]
fn test_invoke_needs_a_target() {
    let home = tempfile::tempdir().unwrap();
    fn_cmd(&home).args(["invoke"]).assert().code(2);
}
