//! Error types for the Failsafe control plane.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Administrator credential rejected")]
    Unauthorized,

    #[error("Unknown protocol: {0}")]
    ProtocolNotFound(String),

    #[error("Protocol {0} is already active; recover or reset first")]
    AlreadyInEmergency(String),

    #[error("A non-empty reason is required to execute this protocol")]
    ReasonRequired,

    #[error("No protocol is active; nothing to recover from")]
    NoActiveProtocol,

    #[error("All components are already active")]
    NothingToRecover,

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ControlError {
    /// JSON-RPC style error code for the IPC surface.
    pub fn code(&self) -> i32 {
        match self {
            ControlError::Unauthorized => -32010,
            ControlError::ProtocolNotFound(_) => -32011,
            ControlError::AlreadyInEmergency(_) => -32012,
            ControlError::ReasonRequired => -32013,
            ControlError::NoActiveProtocol => -32014,
            ControlError::NothingToRecover => -32015,
            ControlError::Persistence(_) => -32016,
            ControlError::Io(_) => -32006,
            ControlError::Json(_) => -32700,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_distinct() {
        let errors = [
            ControlError::Unauthorized,
            ControlError::ProtocolNotFound("x".into()),
            ControlError::AlreadyInEmergency("x".into()),
            ControlError::ReasonRequired,
            ControlError::NoActiveProtocol,
            ControlError::NothingToRecover,
            ControlError::Persistence("x".into()),
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
