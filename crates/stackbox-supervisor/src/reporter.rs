//! Read-only, self-healing status snapshots.
//!
//! Snapshots never spawn or signal anything and never wait on a busy
//! slot; a wedged service still produces an answer in bounded time.

use crate::error::SupervisorResult;
use crate::registry::{ServiceRegistry, Slot};
use crate::state::{FailureReason, ServiceSnapshot, ServiceState, StackSnapshot};

use std::sync::Arc;

use chrono::Utc;
use stackbox_config::ServiceKey;
use tracing::warn;

pub struct StatusReporter {
    registry: Arc<ServiceRegistry>,
}

impl StatusReporter {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    pub fn snapshot(&self, key: &ServiceKey) -> SupervisorResult<ServiceSnapshot> {
        let slot = self.registry.slot(key)?;
        Ok(self.observe(slot))
    }

    pub async fn snapshot_all(&self) -> StackSnapshot {
        let services = self
            .registry
            .slots()
            .map(|(_, slot)| self.observe(slot))
            .collect();

        StackSnapshot {
            services,
            active_interpreter: self.registry.active_interpreter().await.to_string(),
            generated_at: Utc::now(),
        }
    }

    /// Observe one slot, correcting stale `Running` bookkeeping against
    /// reality. The correction reaps through the slot guard when it is
    /// free; a guard held by an in-flight transition means the state is
    /// about to change anyway, so the recorded value is reported as-is.
    fn observe(&self, slot: &Slot) -> ServiceSnapshot {
        let def = &slot.definition;
        let state = match slot.state() {
            ServiceState::Running { pid, port, since } => {
                self.heal_running(slot, pid, port, since)
            }
            other => other,
        };

        // A foreign listener on our port while we are down is worth
        // surfacing before the user hits PortConflict on start
        let prober = self.registry.prober();
        let port_conflict = !matches!(
            state,
            ServiceState::Running { .. } | ServiceState::Starting { .. }
        ) && prober.port_bound(def.port);
        let port_owner_pid = if port_conflict {
            prober.listener_pid(def.port)
        } else {
            None
        };

        ServiceSnapshot {
            key: def.key.to_string(),
            display_name: def.display_name.clone(),
            port: def.port,
            state,
            port_conflict,
            port_owner_pid,
            observed_at: Utc::now(),
        }
    }

    fn heal_running(
        &self,
        slot: &Slot,
        pid: u32,
        port: u16,
        since: chrono::DateTime<Utc>,
    ) -> ServiceState {
        let running = ServiceState::Running { pid, port, since };

        // Reaping is authoritative: an exited child of ours stays a
        // zombie until waited on, so the pid probe alone would keep
        // reporting it alive
        if let Ok(mut inner) = slot.guard.try_lock() {
            if let Some(handle) = inner.handle.as_mut() {
                if let Some(exit_code) = handle.try_reap() {
                    inner.handle = None;
                    let failed = ServiceState::Failed {
                        reason: FailureReason::UnexpectedExit { exit_code },
                    };
                    warn!(
                        service = %slot.definition.key,
                        pid,
                        ?exit_code,
                        "Service exited while marked Running, correcting status"
                    );
                    slot.set_state(failed.clone());
                    return failed;
                }
                return running;
            }

            // No handle of our own; the pid probe is all we have
            if self.registry.prober().pid_alive(pid) {
                return running;
            }
            let failed = ServiceState::Failed {
                reason: FailureReason::UnexpectedExit { exit_code: None },
            };
            warn!(
                service = %slot.definition.key,
                pid,
                "Recorded process is gone, correcting status"
            );
            slot.set_state(failed.clone());
            return failed;
        }

        running
    }
}
