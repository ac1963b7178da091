use crate::state::{FailureReason, ServiceState};

use chrono::Utc;
use googletest::assert_that;
use googletest::prelude::eq;

#[test]
fn given_each_phase_when_classified_then_flags_match() {
    let running = ServiceState::Running {
        pid: 42,
        port: 8080,
        since: Utc::now(),
    };
    let failed = ServiceState::Failed {
        reason: FailureReason::ForcedTermination,
    };

    assert_that!(ServiceState::Stopped.is_startable(), eq(true));
    assert_that!(failed.is_startable(), eq(true));
    assert_that!(running.is_startable(), eq(false));

    assert_that!(running.is_running(), eq(true));
    assert_that!(ServiceState::Starting { pid: None }.is_transitioning(), eq(true));
    assert_that!(ServiceState::Stopping { pid: 42 }.is_transitioning(), eq(true));
    assert_that!(ServiceState::Stopped.is_transitioning(), eq(false));
}

#[test]
fn given_each_phase_when_pid_then_present_only_with_a_process() {
    assert_that!(ServiceState::Stopped.pid(), eq(None));
    assert_that!(ServiceState::Starting { pid: Some(7) }.pid(), eq(Some(7)));
    assert_that!(ServiceState::Stopping { pid: 7 }.pid(), eq(Some(7)));
    assert_that!(
        ServiceState::Failed {
            reason: FailureReason::UnexpectedExit { exit_code: Some(1) }
        }
        .pid(),
        eq(None)
    );
}
