//! Shared types for the Failsafe control plane.
//!
//! Everything the daemon and the CLI agree on lives here: the component
//! registry, the protocol catalog, the system state model, the audit log,
//! error types, and the IPC protocol.

pub mod audit;
pub mod component;
pub mod error;
pub mod ipc;
pub mod protocol;
pub mod state;

pub use audit::{AuditLog, LogEntry, LogSeverity};
pub use component::Component;
pub use error::ControlError;
pub use protocol::{Protocol, Severity};
pub use state::{IncidentRecord, OverallStatus, RecoveryMode, SystemState};
