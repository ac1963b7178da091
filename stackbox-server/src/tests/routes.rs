use crate::build_router;

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;
use stackbox_config::{DirectoryLayout, StackConfig};
use stackbox_supervisor::{ControlPanel, SystemProber};
use tempfile::TempDir;

fn test_server() -> (TempDir, TestServer) {
    let temp = TempDir::new().unwrap();
    let config = StackConfig::default();
    let layout = DirectoryLayout::new(temp.path());
    let panel = ControlPanel::new(config, layout, Arc::new(SystemProber)).unwrap();
    let server = TestServer::new(build_router(Arc::new(panel))).unwrap();
    (temp, server)
}

#[tokio::test]
async fn test_health_reports_healthy() {
    let (_temp, server) = test_server();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_services_lists_full_catalog() {
    let (_temp, server) = test_server();

    let response = server.get("/services").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let services = body["services"].as_array().unwrap();
    assert_eq!(services.len(), 6);
    assert_eq!(services[0]["key"], "web-server");
    assert_eq!(services[0]["phase"], "stopped");
    assert_eq!(body["active_interpreter"], "8.2");
}

#[tokio::test]
async fn test_single_service_status() {
    let (_temp, server) = test_server();

    let response = server.get("/services/database").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["key"], "database");
    assert_eq!(body["port"], 3306);
}

#[tokio::test]
async fn test_unknown_service_is_404_with_hint() {
    let (_temp, server) = test_server();

    let response = server.get("/services/mailserver").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("mailserver"));
    assert!(body["hint"].is_string());
}

#[tokio::test]
async fn test_toggle_without_binary_is_412() {
    let (_temp, server) = test_server();

    let response = server.post("/services/web-server/toggle").await;

    assert_eq!(response.status_code(), StatusCode::PRECONDITION_FAILED);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("httpd"));
}

#[tokio::test]
async fn test_backup_without_running_database_is_412() {
    let (_temp, server) = test_server();

    let response = server.post("/backup").await;

    assert_eq!(response.status_code(), StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_bootstrap_creates_tree_and_binaries_report_missing() {
    let (temp, server) = test_server();

    let response = server.post("/bootstrap").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(temp.path().join("config").join("httpd.conf").is_file());
    assert!(temp.path().join("www").is_dir());

    let response = server.get("/binaries").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let binaries = body["binaries"].as_array().unwrap();
    assert_eq!(binaries.len(), 10);
    assert!(binaries.iter().all(|b| b["found"] == false));
}

#[tokio::test]
async fn test_interpreters_list_and_activation() {
    let (temp, server) = test_server();

    let response = server.get("/interpreters").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["interpreters"].as_array().unwrap().len(), 4);

    let response = server.post("/interpreters/8.3/activate").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["active"], "8.3");
    let persisted = std::fs::read_to_string(temp.path().join("stackbox.toml")).unwrap();
    assert!(persisted.contains("active = \"8.3\""));
}

#[tokio::test]
async fn test_activating_unknown_version_is_404() {
    let (_temp, server) = test_server();

    let response = server.post("/interpreters/7.4/activate").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_debug_paths_resolves_installation() {
    let (temp, server) = test_server();

    let response = server.get("/debug/paths").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(
        body["base_dir"].as_str().unwrap(),
        temp.path().to_str().unwrap()
    );
    assert_eq!(body["binaries"].as_array().unwrap().len(), 6);
}
