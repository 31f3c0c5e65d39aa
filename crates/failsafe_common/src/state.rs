//! System state model.
//!
//! `SystemState` is the singleton the controller mutates. It is created once
//! at daemon start (or restored from disk), reset to defaults on demand, and
//! never destroyed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::component;

/// Overall platform status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Operational,
    Degraded,
    Maintenance,
    Emergency,
    Offline,
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OverallStatus::Operational => "operational",
            OverallStatus::Degraded => "degraded",
            OverallStatus::Maintenance => "maintenance",
            OverallStatus::Emergency => "emergency",
            OverallStatus::Offline => "offline",
        };
        write!(f, "{}", s)
    }
}

/// Policy for restoring disabled components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryMode {
    /// Persists until an explicit recover or reset.
    Manual,
    /// One scheduled full recovery when the window elapses.
    Automatic,
    /// Components restored one at a time at a fixed interval.
    Progressive,
}

impl std::fmt::Display for RecoveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecoveryMode::Manual => "manual",
            RecoveryMode::Automatic => "automatic",
            RecoveryMode::Progressive => "progressive",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for RecoveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(RecoveryMode::Manual),
            "automatic" => Ok(RecoveryMode::Automatic),
            "progressive" => Ok(RecoveryMode::Progressive),
            other => Err(format!("unknown recovery mode: {}", other)),
        }
    }
}

/// Record of the most recently executed protocol.
///
/// Retained through full and progressive recovery as incident history;
/// cleared only by a reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub timestamp: DateTime<Utc>,
    pub protocol_id: String,
    pub reason: String,
    pub recovery_window_minutes: u32,
}

/// The mutable control-plane state singleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub overall_status: OverallStatus,
    /// One entry per registered component: id -> logically active.
    pub component_status: HashMap<String, bool>,
    /// Id of the protocol currently in force, if any.
    pub active_protocol: Option<String>,
    pub incident: Option<IncidentRecord>,
    pub recovery_mode: RecoveryMode,
    /// Deadline for the next scheduled recovery action. Present exactly when
    /// `remaining_minutes` is present.
    pub scheduled_recovery_at: Option<DateTime<Utc>>,
    pub remaining_minutes: Option<u32>,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            overall_status: OverallStatus::Operational,
            component_status: component::default_component_status(),
            active_protocol: None,
            incident: None,
            recovery_mode: RecoveryMode::Manual,
            scheduled_recovery_at: None,
            remaining_minutes: None,
        }
    }
}

impl SystemState {
    /// Whether the given component is logically active. Unknown ids read as
    /// inactive.
    pub fn is_active(&self, component_id: &str) -> bool {
        self.component_status.get(component_id).copied().unwrap_or(false)
    }

    /// First inactive component in registry order, if any.
    pub fn first_inactive_component(&self) -> Option<&'static str> {
        component::registry()
            .iter()
            .find(|c| !self.is_active(c.id))
            .map(|c| c.id)
    }

    /// Number of inactive components.
    pub fn inactive_count(&self) -> usize {
        component::registry()
            .iter()
            .filter(|c| !self.is_active(c.id))
            .count()
    }

    /// Arm the recovery schedule: deadline and counter move together.
    pub fn arm_schedule(&mut self, now: DateTime<Utc>, window_minutes: u32) {
        self.scheduled_recovery_at = Some(now + Duration::minutes(window_minutes as i64));
        self.remaining_minutes = Some(window_minutes);
    }

    /// Disarm the recovery schedule.
    pub fn disarm_schedule(&mut self) {
        self.scheduled_recovery_at = None;
        self.remaining_minutes = None;
    }

    /// Whether a recovery is currently scheduled.
    pub fn schedule_armed(&self) -> bool {
        self.remaining_minutes.is_some()
    }

    /// Drop unknown component ids and fill in missing ones at their default
    /// activity. Applied when restoring persisted state, so the map always
    /// holds exactly one entry per registered component.
    pub fn normalize_components(&mut self) {
        let mut status = component::default_component_status();
        for (id, active) in &self.component_status {
            if let Some(slot) = status.get_mut(id.as_str()) {
                *slot = *active;
            }
        }
        self.component_status = status;
    }
}
