#![cfg(unix)]

use crate::registry::ServiceRegistry;
use crate::reporter::StatusReporter;
use crate::state::{FailureReason, ServiceState};
use crate::tests::{FakeProber, setup_base_dir, sleeper_definition};

use std::sync::Arc;
use std::time::Duration;

use googletest::assert_that;
use googletest::prelude::eq;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use stackbox_config::{ServiceKey, VersionTag};

fn setup(
    defs: Vec<stackbox_config::ServiceDefinition>,
    prober: Arc<FakeProber>,
) -> (Arc<ServiceRegistry>, StatusReporter) {
    let registry = Arc::new(ServiceRegistry::new(
        defs,
        VersionTag::new("8.2").unwrap(),
        prober,
    ));
    let reporter = StatusReporter::new(Arc::clone(&registry));
    (registry, reporter)
}

#[tokio::test]
async fn given_stopped_service_when_snapshot_then_stopped_and_no_conflict() {
    // Given
    let temp = setup_base_dir();
    let prober = FakeProber::new();
    let def = sleeper_definition(ServiceKey::WebServer, 42821, temp.path());
    let (_registry, reporter) = setup(vec![def], prober);

    // When
    let snapshot = reporter.snapshot(&ServiceKey::WebServer).unwrap();

    // Then
    assert_that!(snapshot.state, eq(&ServiceState::Stopped));
    assert_that!(snapshot.port_conflict, eq(false));
    assert_that!(snapshot.key.as_str(), eq("web-server"));
    assert_that!(snapshot.port, eq(42821));
}

#[tokio::test]
async fn given_stopped_service_with_foreign_listener_when_snapshot_then_conflict_flagged() {
    // Given
    let temp = setup_base_dir();
    let prober = FakeProber::new();
    let def = sleeper_definition(ServiceKey::WebServer, 42822, temp.path());
    let (_registry, reporter) = setup(vec![def], prober.clone());
    prober.set_bound(42822, true);

    // When
    let snapshot = reporter.snapshot(&ServiceKey::WebServer).unwrap();

    // Then: still Stopped, with the conflict surfaced alongside
    assert_that!(snapshot.state, eq(&ServiceState::Stopped));
    assert_that!(snapshot.port_conflict, eq(true));
}

#[tokio::test]
async fn given_externally_killed_service_when_snapshot_then_healed_to_failed() {
    // Given: a running service whose process dies behind our back
    let temp = setup_base_dir();
    let prober = FakeProber::new();
    let key = ServiceKey::Database;
    let def = sleeper_definition(key.clone(), 42823, temp.path());
    let (registry, reporter) = setup(vec![def], prober.clone());
    prober.bind_after(42823, 1);
    let state = registry.toggle(&key).await.unwrap();
    let pid = state.pid().unwrap();

    kill(Pid::from_raw(pid as i32), Signal::SIGKILL).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    prober.set_bound(42823, false);

    // When
    let snapshot = reporter.snapshot(&key).unwrap();

    // Then: killed by signal, so no exit code to report
    assert_that!(
        snapshot.state,
        eq(&ServiceState::Failed {
            reason: FailureReason::UnexpectedExit { exit_code: None }
        })
    );

    // And: the healed state sticks
    assert_that!(
        registry.state(&key).unwrap(),
        eq(&ServiceState::Failed {
            reason: FailureReason::UnexpectedExit { exit_code: None }
        })
    );
}

#[tokio::test]
async fn given_healthy_running_service_when_snapshot_then_still_running() {
    // Given
    let temp = setup_base_dir();
    let prober = FakeProber::new();
    let key = ServiceKey::WebServer;
    let def = sleeper_definition(key.clone(), 42824, temp.path());
    let (registry, reporter) = setup(vec![def], prober.clone());
    prober.bind_after(42824, 1);
    registry.toggle(&key).await.unwrap();

    // When
    let snapshot = reporter.snapshot(&key).unwrap();

    // Then
    assert_that!(snapshot.state.is_running(), eq(true));
    assert_that!(snapshot.port_conflict, eq(false));

    // Cleanup
    prober.set_bound(42824, false);
    let _ = registry.toggle(&key).await;
}

#[tokio::test]
async fn given_full_catalog_when_snapshot_all_then_every_service_reported() {
    // Given
    let temp = setup_base_dir();
    let prober = FakeProber::new();
    let defs = vec![
        sleeper_definition(ServiceKey::WebServer, 42825, temp.path()),
        sleeper_definition(ServiceKey::Database, 42826, temp.path()),
        sleeper_definition(crate::tests::interpreter_key("8.2"), 42827, temp.path()),
    ];
    let (_registry, reporter) = setup(defs, prober);

    // When
    let stack = reporter.snapshot_all().await;

    // Then
    assert_that!(stack.services.len(), eq(3));
    assert_that!(stack.services[0].key.as_str(), eq("web-server"));
    assert_that!(stack.services[1].key.as_str(), eq("database"));
    assert_that!(stack.services[2].key.as_str(), eq("interpreter-8.2"));
    assert_that!(stack.active_interpreter.as_str(), eq("8.2"));
}
