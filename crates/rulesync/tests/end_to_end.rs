//! Runs the `rulesync` binary against stub router and list servers

use rulesync_stub_http::{StubResponse, StubServer};
use std::path::Path;
use std::process::Output;
use tempfile::TempDir;
use tokio::process::Command;

fn write_config(dir: &TempDir, router: &str, list: &str, row_ids: Option<&str>) -> std::path::PathBuf {
    let mut text = format!(
        "# router\n\
         server_address: {router}\n\
         username: admin\n\
         password: admin\n\
         domain_list_url: {list}/list.txt\n\
         domain_interface: wan2\n\
         domain_src_addr: \"\"\n\
         domain_comment: gfw\n"
    );
    if let Some(ids) = row_ids {
        text.push_str(&format!("domain_row_ids: {ids} # managed\n"));
    }

    let path = dir.path().join("config.yml");
    std::fs::write(&path, text).unwrap();
    path
}

async fn run(config: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rulesync"))
        .env("RULESYNC_CONFIG", config)
        .env("RULESYNC_LOG_LEVEL", "debug")
        .env_remove("RULESYNC_MODE")
        .output()
        .await
        .unwrap()
}

fn domains(n: usize) -> String {
    (0..n).map(|i| format!("d{}.example.com\n", i)).collect()
}

#[tokio::test]
async fn full_sync_replaces_tracked_rules() {
    let router = StubServer::start(vec![
        StubResponse::login("abc123"),
        StubResponse::ok(r#"{"Result":30000,"ErrMsg":"Success"}"#),
        StubResponse::ok(r#"{"Result":30000,"ErrMsg":"Success","RowId":11}"#),
        StubResponse::ok(r#"{"Result":30000,"ErrMsg":"Success","RowId":12}"#),
    ])
    .await;
    let list = StubServer::start(vec![StubResponse::ok(domains(1500))]).await;

    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &router.url(), &list.url(), Some("[1, 2]"));

    let output = run(&config).await;
    assert_eq!(output.status.code(), Some(0));

    let requests = router.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[0].path, "/Action/login");
    assert_eq!(requests[1].json()["param"]["id"], "1,2");

    let sizes: Vec<usize> = requests[2..]
        .iter()
        .map(|r| {
            r.json()["param"]["domain"]
                .as_str()
                .unwrap()
                .split(',')
                .count()
        })
        .collect();
    assert_eq!(sizes, vec![1000, 500]);
    assert_eq!(requests[3].json()["param"]["comment"], "gfw-2");

    let text = std::fs::read_to_string(&config).unwrap();
    assert!(text.contains("domain_row_ids: [11, 12] # managed\n"));
    assert!(text.starts_with("# router\n"));
}

#[tokio::test]
async fn login_without_session_key_stops_before_fetch() {
    let router = StubServer::start(vec![StubResponse::ok(
        r#"{"Result":10001,"ErrMsg":"bad password"}"#,
    )])
    .await;
    let list = StubServer::start(vec![StubResponse::ok(domains(3))]).await;

    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &router.url(), &list.url(), Some("[1, 2]"));
    let before = std::fs::read_to_string(&config).unwrap();

    let output = run(&config).await;
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(router.requests().len(), 1);
    assert!(list.requests().is_empty());
    assert_eq!(std::fs::read_to_string(&config).unwrap(), before);
}

#[tokio::test]
async fn missing_list_makes_no_rule_calls() {
    let router = StubServer::start(vec![StubResponse::login("abc123")]).await;
    let list = StubServer::start(vec![StubResponse::new(404, "not found")]).await;

    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &router.url(), &list.url(), Some("[1, 2]"));
    let before = std::fs::read_to_string(&config).unwrap();

    let output = run(&config).await;
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(router.requests().len(), 1);
    assert_eq!(list.requests().len(), 1);
    assert_eq!(std::fs::read_to_string(&config).unwrap(), before);
}

#[tokio::test]
async fn missing_config_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let output = run(&dir.path().join("absent.yml")).await;
    assert_eq!(output.status.code(), Some(1));
}

#[tokio::test]
async fn invalid_config_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "192.168.9.1", "http://127.0.0.1:1", None);

    let output = run(&config).await;
    assert_eq!(output.status.code(), Some(1));
}

#[tokio::test]
async fn unreachable_router_is_a_runtime_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let router = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &router, "http://127.0.0.1:1", None);

    let output = run(&config).await;
    assert_eq!(output.status.code(), Some(2));
}
