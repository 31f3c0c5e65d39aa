//! Control-plane state machine.
//!
//! The controller is the single owner of `SystemState` and the audit log.
//! Every operation verifies the administrator credential first, computes its
//! complete next state, and commits under the write lock, so a failed
//! precondition never leaves a partial mutation behind. Scheduler ticks go
//! through the same lock and can never interleave with an operation.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use failsafe_common::audit::{AuditLog, LogEntry, LogSeverity};
use failsafe_common::component;
use failsafe_common::error::ControlError;
use failsafe_common::protocol;
use failsafe_common::state::{IncidentRecord, OverallStatus, RecoveryMode, SystemState};

use crate::auth::CredentialVerifier;
use crate::dispatch::{ComponentDirective, DirectiveSink};
use crate::persist::StateStore;

pub struct Controller {
    state: Arc<RwLock<SystemState>>,
    log: Arc<RwLock<AuditLog>>,
    store: Arc<StateStore>,
    verifier: Arc<dyn CredentialVerifier>,
    sink: Arc<dyn DirectiveSink>,
    require_reason: bool,
    progressive_step_minutes: u32,
    persist_dirty: Arc<AtomicBool>,
    // serializes disk writes so overlapping saves cannot reorder
    persist_gate: Arc<Mutex<()>>,
}

impl Controller {
    pub fn new(
        store: StateStore,
        verifier: Arc<dyn CredentialVerifier>,
        sink: Arc<dyn DirectiveSink>,
        require_reason: bool,
        progressive_step_minutes: u32,
    ) -> Self {
        Self::with_state(
            SystemState::default(),
            AuditLog::new(),
            store,
            verifier,
            sink,
            require_reason,
            progressive_step_minutes,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn with_state(
        state: SystemState,
        log: AuditLog,
        store: StateStore,
        verifier: Arc<dyn CredentialVerifier>,
        sink: Arc<dyn DirectiveSink>,
        require_reason: bool,
        progressive_step_minutes: u32,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            log: Arc::new(RwLock::new(log)),
            store: Arc::new(store),
            verifier,
            sink,
            require_reason,
            progressive_step_minutes,
            persist_dirty: Arc::new(AtomicBool::new(false)),
            persist_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Build a controller, restoring persisted state and log where present.
    /// A corrupt or unreadable store falls back to defaults; the daemon must
    /// come up either way.
    pub async fn restore(
        store: StateStore,
        verifier: Arc<dyn CredentialVerifier>,
        sink: Arc<dyn DirectiveSink>,
        require_reason: bool,
        progressive_step_minutes: u32,
    ) -> Self {
        let state = match store.load_state().await {
            Ok(Some(mut state)) => {
                state.normalize_components();
                state
            }
            Ok(None) => SystemState::default(),
            Err(e) => {
                warn!("Failed to load persisted state, starting from defaults: {e:#}");
                SystemState::default()
            }
        };
        let log = match store.load_log().await {
            Ok(entries) => AuditLog::from_entries(entries),
            Err(e) => {
                warn!("Failed to load audit log, starting empty: {e:#}");
                AuditLog::new()
            }
        };

        Self::with_state(
            state,
            log,
            store,
            verifier,
            sink,
            require_reason,
            progressive_step_minutes,
        )
    }

    // ── Read-only surface ───────────────────────────────────────────────

    /// Snapshot of the current system state.
    pub async fn state(&self) -> SystemState {
        self.state.read().await.clone()
    }

    /// Snapshot of the audit log, newest first.
    pub async fn log_entries(&self) -> Vec<LogEntry> {
        self.log.read().await.all().to_vec()
    }

    // ── Mutating operations ─────────────────────────────────────────────

    /// Execute an emergency protocol.
    pub async fn execute_protocol(
        &self,
        credential: &str,
        protocol_id: &str,
        reason: &str,
        mode: RecoveryMode,
        window_minutes: u32,
    ) -> Result<IncidentRecord, ControlError> {
        self.authorize(credential)?;
        let protocol = protocol::lookup(protocol_id)
            .ok_or_else(|| ControlError::ProtocolNotFound(protocol_id.to_string()))?;

        let mut state = self.state.write().await;
        let mut log = self.log.write().await;

        if let Some(active) = &state.active_protocol {
            return Err(ControlError::AlreadyInEmergency(active.clone()));
        }
        if self.require_reason && reason.trim().is_empty() {
            return Err(ControlError::ReasonRequired);
        }

        let now = Utc::now();
        let mut next = state.clone();
        next.overall_status = protocol.severity.overall_status();
        for c in component::registry() {
            if protocol.disables(c.id) {
                next.component_status.insert(c.id.to_string(), false);
            }
        }
        next.active_protocol = Some(protocol.id.to_string());
        next.recovery_mode = mode;
        let incident = IncidentRecord {
            timestamp: now,
            protocol_id: protocol.id.to_string(),
            reason: reason.to_string(),
            recovery_window_minutes: window_minutes,
        };
        next.incident = Some(incident.clone());
        if mode != RecoveryMode::Manual {
            next.arm_schedule(now, window_minutes);
        } else {
            next.disarm_schedule();
        }

        let flips = flips_between(&state, &next);
        *state = next;
        log.append(LogEntry::new(
            "execute_protocol",
            format!(
                "{} activated ({} severity, {} recovery): {}",
                protocol.name, protocol.severity, mode, reason
            ),
            protocol.severity.log_severity(),
        ));

        info!(
            protocol = protocol.id,
            status = %state.overall_status,
            "Protocol executed"
        );

        self.dispatch_all(flips);
        self.persist();
        Ok(incident)
    }

    /// Restore all components at once and return to operational.
    pub async fn recover_full(&self, credential: &str) -> Result<SystemState, ControlError> {
        self.authorize(credential)?;

        let mut state = self.state.write().await;
        let mut log = self.log.write().await;

        if state.active_protocol.is_none() {
            return Err(ControlError::NoActiveProtocol);
        }

        let flips = apply_recover_full(&mut state, &mut log);
        info!("Full recovery complete");

        self.dispatch_all(flips);
        self.persist();
        Ok(state.clone())
    }

    /// Restore the next inactive component in registry order.
    pub async fn recover_progressive_step(
        &self,
        credential: &str,
    ) -> Result<SystemState, ControlError> {
        self.authorize(credential)?;

        let mut state = self.state.write().await;
        let mut log = self.log.write().await;

        let flips = apply_progressive_step(&mut state, &mut log, self.progressive_step_minutes)?;

        self.dispatch_all(flips);
        self.persist();
        Ok(state.clone())
    }

    /// Restore factory defaults, clearing incident history. Unconditional.
    pub async fn reset_to_default(&self, credential: &str) -> Result<SystemState, ControlError> {
        self.authorize(credential)?;

        let mut state = self.state.write().await;
        let mut log = self.log.write().await;

        let next = SystemState::default();
        let flips = flips_between(&state, &next);
        *state = next;
        log.append(LogEntry::new(
            "reset",
            "System restored to default configuration",
            LogSeverity::Info,
        ));

        info!("System reset to defaults");

        self.dispatch_all(flips);
        self.persist();
        Ok(state.clone())
    }

    /// Empty the audit log.
    pub async fn clear_log(&self, credential: &str) -> Result<(), ControlError> {
        self.authorize(credential)?;

        let mut log = self.log.write().await;
        log.clear();

        info!("Audit log cleared");

        self.persist();
        Ok(())
    }

    // ── Scheduler entry point ───────────────────────────────────────────

    /// One scheduler tick. Retries a failed persistence write, then
    /// decrements the recovery counter and fires the scheduled recovery when
    /// it reaches zero. The timer is not a session, so no credential check.
    pub async fn tick_minute(&self) {
        if self.persist_dirty.swap(false, Ordering::SeqCst) {
            if let Err(e) = self.flush().await {
                warn!("Persistence retry failed (will retry next tick): {e}");
                self.persist_dirty.store(true, Ordering::SeqCst);
            }
        }

        let mut state = self.state.write().await;
        let mut log = self.log.write().await;

        let Some(remaining) = state.remaining_minutes else {
            return;
        };

        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            state.remaining_minutes = Some(remaining);
            self.persist();
            return;
        }

        let flips = match state.recovery_mode {
            RecoveryMode::Automatic => {
                info!("Recovery window elapsed, running full recovery");
                apply_recover_full(&mut state, &mut log)
            }
            RecoveryMode::Progressive => {
                info!("Progressive step due");
                match apply_progressive_step(&mut state, &mut log, self.progressive_step_minutes) {
                    Ok(flips) => flips,
                    Err(e) => {
                        warn!("Scheduled progressive step had nothing to do: {e}");
                        state.disarm_schedule();
                        Vec::new()
                    }
                }
            }
            RecoveryMode::Manual => {
                // a schedule must never be armed in manual mode
                state.disarm_schedule();
                Vec::new()
            }
        };

        self.dispatch_all(flips);
        self.persist();
    }

    /// Write state and log to disk, awaiting the result.
    pub async fn flush(&self) -> Result<(), ControlError> {
        let _gate = self.persist_gate.lock().await;
        let state = self.state.read().await.clone();
        let entries = self.log.read().await.all().to_vec();
        self.store
            .save_state(&state)
            .await
            .map_err(|e| ControlError::Persistence(format!("{e:#}")))?;
        self.store
            .save_log(&entries)
            .await
            .map_err(|e| ControlError::Persistence(format!("{e:#}")))?;
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn authorize(&self, credential: &str) -> Result<(), ControlError> {
        if self.verifier.verify(credential) {
            Ok(())
        } else {
            Err(ControlError::Unauthorized)
        }
    }

    fn dispatch_all(&self, flips: Vec<ComponentDirective>) {
        for directive in flips {
            self.sink.dispatch(directive);
        }
    }

    /// Fire-and-forget persistence. The spawned task snapshots the state at
    /// write time, under the gate, so a write landing late never puts an
    /// older snapshot on disk. A failed write sets the dirty flag and gets
    /// retried on the next tick; the in-memory state stays authoritative
    /// either way.
    fn persist(&self) {
        let store = Arc::clone(&self.store);
        let dirty = Arc::clone(&self.persist_dirty);
        let gate = Arc::clone(&self.persist_gate);
        let state = Arc::clone(&self.state);
        let log = Arc::clone(&self.log);
        tokio::spawn(async move {
            let _gate = gate.lock().await;
            let snapshot = state.read().await.clone();
            let entries = log.read().await.all().to_vec();
            let result = async {
                store.save_state(&snapshot).await?;
                store.save_log(&entries).await
            }
            .await;
            if let Err(e) = result {
                warn!("Persistence write failed (will retry): {e:#}");
                dirty.store(true, Ordering::SeqCst);
            }
        });
    }
}

/// Directives for every component whose logical status differs between the
/// two states, in registry order.
fn flips_between(old: &SystemState, new: &SystemState) -> Vec<ComponentDirective> {
    component::registry()
        .iter()
        .filter(|c| old.is_active(c.id) != new.is_active(c.id))
        .map(|c| ComponentDirective {
            component: c.id.to_string(),
            active: new.is_active(c.id),
        })
        .collect()
}

/// Full recovery: all components active, operational, protocol cleared,
/// schedule disarmed. The incident record stays as history.
fn apply_recover_full(state: &mut SystemState, log: &mut AuditLog) -> Vec<ComponentDirective> {
    let flips: Vec<ComponentDirective> = component::registry()
        .iter()
        .filter(|c| !state.is_active(c.id))
        .map(|c| ComponentDirective {
            component: c.id.to_string(),
            active: true,
        })
        .collect();

    for c in component::registry() {
        state.component_status.insert(c.id.to_string(), true);
    }
    state.overall_status = OverallStatus::Operational;
    state.active_protocol = None;
    state.disarm_schedule();

    log.append(LogEntry::new(
        "recover_full",
        "All components restored; system operational",
        LogSeverity::Success,
    ));
    flips
}

/// One progressive step: reactivate the first inactive component in registry
/// order. Re-arms the step timer while components remain; the final step is
/// a full recovery.
fn apply_progressive_step(
    state: &mut SystemState,
    log: &mut AuditLog,
    step_minutes: u32,
) -> Result<Vec<ComponentDirective>, ControlError> {
    if state.recovery_mode != RecoveryMode::Progressive {
        return Err(ControlError::NothingToRecover);
    }
    let Some(next_id) = state.first_inactive_component() else {
        return Err(ControlError::NothingToRecover);
    };

    state.component_status.insert(next_id.to_string(), true);
    let flips = vec![ComponentDirective {
        component: next_id.to_string(),
        active: true,
    }];

    let remaining = state.inactive_count();
    if remaining > 0 {
        state.overall_status = OverallStatus::Degraded;
        state.arm_schedule(Utc::now(), step_minutes);
        log.append(LogEntry::new(
            "recover_step",
            format!("Restored {}; {} component(s) still offline", next_id, remaining),
            LogSeverity::Info,
        ));
    } else {
        state.overall_status = OverallStatus::Operational;
        state.active_protocol = None;
        state.disarm_schedule();
        log.append(LogEntry::new(
            "recover_step",
            format!("Restored {}; all components online, system operational", next_id),
            LogSeverity::Success,
        ));
    }
    Ok(flips)
}
