use crate::commands::ControlPanel;
use crate::error::SupervisorError;
use crate::tests::{FakeProber, setup_base_dir};

use std::sync::Arc;

use googletest::assert_that;
use googletest::prelude::{anything, eq, ok};
use stackbox_config::{DirectoryLayout, ServiceKey, StackConfig};
use tempfile::TempDir;

fn setup_panel() -> (TempDir, ControlPanel, Arc<FakeProber>) {
    let temp = setup_base_dir();
    let config = StackConfig::default();
    let layout = DirectoryLayout::new(temp.path());
    let prober = FakeProber::new();
    let panel = ControlPanel::new(config, layout, prober.clone()).unwrap();
    (temp, panel, prober)
}

// =========================================================================
// Binary Checks and Bootstrap
// =========================================================================

#[test]
fn given_empty_installation_when_check_binaries_then_everything_missing() {
    // Given
    let (_temp, panel, _prober) = setup_panel();

    // When
    let reports = panel.check_binaries();

    // Then: 2 daemons + 4 interpreter daemons + 4 interpreter CLIs
    assert_that!(reports.len(), eq(10));
    assert_that!(reports.iter().all(|r| !r.found), eq(true));
}

#[tokio::test]
async fn given_empty_base_when_create_directory_structure_then_tree_and_configs_written() {
    // Given
    let (temp, panel, _prober) = setup_panel();

    // When
    let report = panel.create_directory_structure().await.unwrap();

    // Then
    assert_that!(report.created_directories.is_empty(), eq(false));
    assert_that!(temp.path().join("config").join("httpd.conf").is_file(), eq(true));
    assert_that!(temp.path().join("config").join("my.cnf").is_file(), eq(true));
    assert_that!(temp.path().join("www").join("index.html").is_file(), eq(true));
    assert_that!(temp.path().join("php").join("8.4").is_dir(), eq(true));
}

#[tokio::test]
async fn given_bootstrapped_base_when_bootstrap_again_then_user_files_untouched() {
    // Given
    let (temp, panel, _prober) = setup_panel();
    panel.create_directory_structure().await.unwrap();
    let marker = "# user edit\n";
    let conf = temp.path().join("config").join("httpd.conf");
    std::fs::write(&conf, marker).unwrap();

    // When
    let report = panel.create_directory_structure().await.unwrap();

    // Then: only the regenerated FastCGI include is touched
    assert_that!(report.created_directories.is_empty(), eq(true));
    assert_that!(report.written_files.len(), eq(1));
    assert_that!(std::fs::read_to_string(&conf).unwrap().as_str(), eq(marker));
}

#[tokio::test]
async fn given_generated_web_config_when_read_then_carries_port_and_docroot() {
    // Given
    let (temp, panel, _prober) = setup_panel();

    // When
    panel.create_directory_structure().await.unwrap();

    // Then
    let content = std::fs::read_to_string(temp.path().join("config").join("httpd.conf")).unwrap();
    assert_that!(content.contains("Listen 8080"), eq(true));
    assert_that!(content.contains("www"), eq(true));
    assert_that!(content.contains("fastcgi-active.conf"), eq(true));

    // Default active interpreter 8.2 sits at base port + 1
    let include =
        std::fs::read_to_string(temp.path().join("config").join("fastcgi-active.conf")).unwrap();
    assert_that!(include.contains("fcgi://127.0.0.1:9001"), eq(true));
}

// =========================================================================
// Status and Toggle
// =========================================================================

#[tokio::test]
async fn given_fresh_panel_when_status_all_then_all_services_stopped() {
    let (_temp, panel, _prober) = setup_panel();

    let stack = panel.status_all().await;

    assert_that!(stack.services.len(), eq(6));
    assert_that!(
        stack.services.iter().all(|s| !s.state.is_running()),
        eq(true)
    );
    assert_that!(stack.active_interpreter.as_str(), eq("8.2"));
}

#[tokio::test]
async fn given_missing_binaries_when_toggle_then_binary_missing() {
    let (_temp, panel, _prober) = setup_panel();

    let result = panel.toggle(&ServiceKey::WebServer).await;

    assert_that!(
        matches!(result, Err(SupervisorError::BinaryMissing { .. })),
        eq(true)
    );
}

// =========================================================================
// Backup
// =========================================================================

#[tokio::test]
async fn given_database_not_running_when_backup_then_service_not_running() {
    let (_temp, panel, _prober) = setup_panel();

    let result = panel.backup_database().await;

    assert_that!(
        matches!(result, Err(SupervisorError::ServiceNotRunning { .. })),
        eq(true)
    );
}

// =========================================================================
// Interpreters
// =========================================================================

#[tokio::test]
async fn given_default_config_when_interpreters_then_four_versions_with_active_flag() {
    let (_temp, panel, _prober) = setup_panel();

    let infos = panel.interpreters().await;

    assert_that!(infos.len(), eq(4));
    let active: Vec<_> = infos.iter().filter(|i| i.active).collect();
    assert_that!(active.len(), eq(1));
    assert_that!(active[0].version.as_str(), eq("8.2"));
    assert_that!(active[0].fastcgi_port, eq(9001));
}

#[tokio::test]
async fn given_installed_version_when_activate_then_persisted_to_config_file() {
    // Given
    let (temp, panel, _prober) = setup_panel();

    // When
    let result = panel.activate_interpreter("8.4").await;

    // Then
    assert_that!(result, ok(anything()));
    let persisted = std::fs::read_to_string(temp.path().join("stackbox.toml")).unwrap();
    assert_that!(persisted.contains("active = \"8.4\""), eq(true));

    let infos = panel.interpreters().await;
    let active: Vec<_> = infos.iter().filter(|i| i.active).collect();
    assert_that!(active[0].version.as_str(), eq("8.4"));
}

#[tokio::test]
async fn given_unknown_version_when_activate_then_version_not_installed() {
    let (_temp, panel, _prober) = setup_panel();

    let result = panel.activate_interpreter("7.4").await;

    assert_that!(
        matches!(result, Err(SupervisorError::VersionNotInstalled { .. })),
        eq(true)
    );
}

#[tokio::test]
async fn given_interpreter_not_running_when_open_shell_then_service_not_running() {
    // The shell talks to the running FastCGI instance's installation;
    // a stopped interpreter has nothing to talk to
    let (_temp, panel, _prober) = setup_panel();

    let result = panel.open_interpreter_shell("8.2").await;

    assert_that!(
        matches!(result, Err(SupervisorError::ServiceNotRunning { .. })),
        eq(true)
    );
}

#[tokio::test]
async fn given_activated_version_when_web_server_start_prepared_then_fastcgi_include_updated() {
    // Given: a bootstrapped base whose include points at 8.2
    let (temp, panel, _prober) = setup_panel();
    panel.create_directory_structure().await.unwrap();
    panel.activate_interpreter("8.4").await.unwrap();

    // When: a start attempt runs the on-disk preparation before it
    // fails on the missing binary
    let result = panel.toggle(&ServiceKey::WebServer).await;

    // Then: the include now carries 8.4's port
    assert_that!(
        matches!(result, Err(SupervisorError::BinaryMissing { .. })),
        eq(true)
    );
    let include =
        std::fs::read_to_string(temp.path().join("config").join("fastcgi-active.conf")).unwrap();
    assert_that!(include.contains("fcgi://127.0.0.1:9003"), eq(true));
    assert_that!(include.contains("9001"), eq(false));
}

// =========================================================================
// Diagnostics
// =========================================================================

#[tokio::test]
async fn given_empty_installation_when_debug_paths_then_paths_resolved_nothing_exists() {
    let (temp, panel, _prober) = setup_panel();

    let report = panel.debug_paths().await;

    assert_that!(report.base_dir.as_path(), eq(temp.path()));
    assert_that!(report.binaries.len(), eq(6));
    assert_that!(report.binaries.iter().all(|b| !b.exists), eq(true));
    assert_that!(report.binaries.iter().all(|b| b.version.is_none()), eq(true));
}
