//! Slot bookkeeping and the toggle state machine.

use crate::error::{SupervisorError, SupervisorResult};
use crate::handle::{ServiceHandle, StopOutcome};
use crate::locator;
use crate::probe::Prober;
use crate::state::{FailureReason, ServiceState};

use std::collections::BTreeMap;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use error_location::ErrorLocation;
use stackbox_config::{ServiceDefinition, ServiceKey, VersionTag};
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{info, warn};

const START_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub(crate) struct SlotInner {
    pub(crate) handle: Option<ServiceHandle>,
}

/// One supervised service: its immutable launch description, the child
/// handle behind the transition guard, and the broadcast state.
///
/// The guard mutex is held across an entire start or stop; `try_lock`
/// on it is what turns a concurrent toggle into `OperationInProgress`
/// instead of a queued double-spawn.
pub(crate) struct Slot {
    pub(crate) definition: ServiceDefinition,
    pub(crate) guard: Mutex<SlotInner>,
    state_tx: watch::Sender<ServiceState>,
    // Kept so the channel always has a receiver; snapshots read through it
    state_rx: watch::Receiver<ServiceState>,
}

impl Slot {
    fn new(definition: ServiceDefinition) -> Self {
        let (state_tx, state_rx) = watch::channel(ServiceState::Stopped);
        Self {
            definition,
            guard: Mutex::new(SlotInner { handle: None }),
            state_tx,
            state_rx,
        }
    }

    pub(crate) fn state(&self) -> ServiceState {
        self.state_rx.borrow().clone()
    }

    pub(crate) fn set_state(&self, state: ServiceState) {
        self.state_tx.send_replace(state);
    }
}

/// Owns every service slot. All lifecycle mutation goes through here.
pub struct ServiceRegistry {
    slots: BTreeMap<ServiceKey, Arc<Slot>>,
    prober: Arc<dyn Prober>,
    active_interpreter: RwLock<VersionTag>,
}

impl ServiceRegistry {
    pub fn new(
        catalog: Vec<ServiceDefinition>,
        active_interpreter: VersionTag,
        prober: Arc<dyn Prober>,
    ) -> Self {
        let slots = catalog
            .into_iter()
            .map(|def| (def.key.clone(), Arc::new(Slot::new(def))))
            .collect();
        Self {
            slots,
            prober,
            active_interpreter: RwLock::new(active_interpreter),
        }
    }

    pub(crate) fn slot(&self, key: &ServiceKey) -> SupervisorResult<&Arc<Slot>> {
        self.slots.get(key).ok_or_else(|| {
            // Keys parse structurally, so a miss means the interpreter
            // version is simply not part of this installation
            if let ServiceKey::Interpreter(tag) = key {
                SupervisorError::VersionNotInstalled {
                    version: tag.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                }
            } else {
                SupervisorError::UnknownService {
                    key: key.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                }
            }
        })
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = (&ServiceKey, &Arc<Slot>)> {
        self.slots.iter()
    }

    pub(crate) fn prober(&self) -> &Arc<dyn Prober> {
        &self.prober
    }

    pub fn definition(&self, key: &ServiceKey) -> SupervisorResult<&ServiceDefinition> {
        self.slot(key).map(|slot| &slot.definition)
    }

    pub fn definitions(&self) -> Vec<&ServiceDefinition> {
        self.slots.values().map(|slot| &slot.definition).collect()
    }

    pub fn state(&self, key: &ServiceKey) -> SupervisorResult<ServiceState> {
        self.slot(key).map(|slot| slot.state())
    }

    pub async fn active_interpreter(&self) -> VersionTag {
        self.active_interpreter.read().await.clone()
    }

    /// Point the web server at a different interpreter version. Only
    /// updates the pointer; running processes are never touched.
    pub async fn set_active_interpreter(&self, tag: VersionTag) -> SupervisorResult<VersionTag> {
        let key = ServiceKey::Interpreter(tag.clone());
        if !self.slots.contains_key(&key) {
            return Err(SupervisorError::VersionNotInstalled {
                version: tag.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        let mut active = self.active_interpreter.write().await;
        *active = tag.clone();
        info!(version = %tag, "Active interpreter changed");
        Ok(tag)
    }

    /// Flip one service: start it when stopped or failed, stop it when
    /// running. At most one transition runs per slot; a toggle landing
    /// mid-transition is rejected, never queued.
    pub async fn toggle(&self, key: &ServiceKey) -> SupervisorResult<ServiceState> {
        let slot = self.slot(key)?;

        let Ok(mut inner) = slot.guard.try_lock() else {
            return Err(SupervisorError::OperationInProgress {
                service: key.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let current = slot.state();
        if current.is_running() {
            self.stop_locked(slot, &mut inner).await
        } else if current.is_startable() {
            self.start_locked(slot, &mut inner).await
        } else {
            // Bookkeeping says a transition is in flight even though
            // the guard was free; reject rather than guess
            Err(SupervisorError::OperationInProgress {
                service: key.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
        }
    }

    /// `Stopped/Failed -> Starting -> Running`, caller holds the guard.
    async fn start_locked(
        &self,
        slot: &Slot,
        inner: &mut SlotInner,
    ) -> SupervisorResult<ServiceState> {
        let def = &slot.definition;
        let service = def.key.to_string();

        // Preconditions fail before any state change; the slot stays
        // in its current Stopped/Failed phase
        locator::require(def)?;
        if self.prober.port_bound(def.port) {
            return Err(SupervisorError::PortConflict {
                service,
                port: def.port,
                owner_pid: self.prober.listener_pid(def.port),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // A handle left over from an earlier failure dies here
        inner.handle = None;

        slot.set_state(ServiceState::Starting { pid: None });

        let mut handle = match ServiceHandle::spawn(def) {
            Ok(handle) => handle,
            Err(e) => {
                slot.set_state(ServiceState::Failed {
                    reason: FailureReason::SpawnFailed {
                        message: e.to_string(),
                    },
                });
                return Err(e);
            }
        };
        slot.set_state(ServiceState::Starting {
            pid: Some(handle.pid()),
        });

        let deadline = tokio::time::Instant::now() + def.start_grace;
        loop {
            if let Some(exit_code) = handle.try_reap() {
                warn!(%service, ?exit_code, "Service exited during startup");
                slot.set_state(ServiceState::Failed {
                    reason: FailureReason::UnexpectedExit { exit_code },
                });
                return Err(SupervisorError::UnexpectedExit {
                    service,
                    exit_code,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            if self.prober.port_bound(def.port) {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                // Kill the half-started child so nothing is orphaned
                handle.terminate(Duration::ZERO).await;
                let timeout_secs = def.start_grace.as_secs();
                warn!(%service, timeout_secs, "Service never bound its port");
                slot.set_state(ServiceState::Failed {
                    reason: FailureReason::StartupTimeout { timeout_secs },
                });
                return Err(SupervisorError::StartupTimeout {
                    service,
                    timeout_secs,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            tokio::time::sleep(START_POLL_INTERVAL).await;
        }

        let state = ServiceState::Running {
            pid: handle.pid(),
            port: def.port,
            since: handle.started_at(),
        };
        info!(%service, pid = handle.pid(), port = def.port, "Service is running");
        inner.handle = Some(handle);
        slot.set_state(state.clone());
        Ok(state)
    }

    /// `Running -> Stopping -> Stopped`, caller holds the guard. A stop
    /// that escalates to a kill ends in `Failed(ForcedTermination)` and
    /// reports the escalation; the slot is usable again either way.
    async fn stop_locked(
        &self,
        slot: &Slot,
        inner: &mut SlotInner,
    ) -> SupervisorResult<ServiceState> {
        let def = &slot.definition;
        let service = def.key.to_string();

        let Some(mut handle) = inner.handle.take() else {
            // Running without a child cannot be stopped; correct the books
            warn!(%service, "Running state had no process handle, correcting to Stopped");
            slot.set_state(ServiceState::Stopped);
            return Ok(ServiceState::Stopped);
        };

        let pid = handle.pid();
        slot.set_state(ServiceState::Stopping { pid });

        match handle.terminate(def.stop_grace).await {
            StopOutcome::Graceful { exit_code } => {
                info!(%service, pid, ?exit_code, "Service stopped");
                slot.set_state(ServiceState::Stopped);
                Ok(ServiceState::Stopped)
            }
            StopOutcome::Forced => {
                slot.set_state(ServiceState::Failed {
                    reason: FailureReason::ForcedTermination,
                });
                Err(SupervisorError::ForcedTermination {
                    service,
                    pid,
                    location: ErrorLocation::from(Location::caller()),
                })
            }
        }
    }
}
