//! IPC protocol between `failsafectl` and `failsafed`.
//!
//! Newline-delimited JSON over a Unix socket. Mutating methods carry the
//! administrator credential; read-only methods do not.

use serde::{Deserialize, Serialize};

use crate::audit::LogEntry;
use crate::state::{IncidentRecord, RecoveryMode, SystemState};

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: Method,
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub result: Result<ResponseData, RpcError>,
}

/// Error payload carried back over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

/// Request methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Method {
    /// Health check.
    Ping,

    /// Current system state snapshot.
    Status,

    /// Audit log snapshot, newest first.
    Log {
        /// Cap the number of entries returned.
        limit: Option<usize>,
    },

    /// Execute an emergency protocol.
    Execute {
        credential: String,
        protocol: String,
        reason: String,
        mode: RecoveryMode,
        window_minutes: u32,
    },

    /// Restore everything at once.
    RecoverFull { credential: String },

    /// Restore the next component in registry order.
    RecoverStep { credential: String },

    /// Restore factory defaults, clearing incident history.
    Reset { credential: String },

    /// Empty the audit log.
    ClearLog { credential: String },
}

/// Response payload variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ResponseData {
    Ok,
    State(SystemState),
    Log(Vec<LogEntry>),
    Incident(IncidentRecord),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_round_trip() {
        let request = Request {
            id: 7,
            method: Method::Execute {
                credential: "hunter2".to_string(),
                protocol: "maintenance-mode".to_string(),
                reason: "quarterly drill".to_string(),
                mode: RecoveryMode::Automatic,
                window_minutes: 30,
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, 7);
        match parsed.method {
            Method::Execute { protocol, window_minutes, .. } => {
                assert_eq!(protocol, "maintenance-mode");
                assert_eq!(window_minutes, 30);
            }
            other => panic!("unexpected method: {:?}", other),
        }
    }

    #[test]
    fn test_error_response_round_trip() {
        let response = Response {
            id: 3,
            result: Err(RpcError {
                code: -32010,
                message: "Administrator credential rejected".to_string(),
            }),
        };

        let json = serde_json::to_string(&response).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed.result, Err(ref e) if e.code == -32010));
    }

    #[test]
    fn test_state_response_round_trip() {
        let response = Response {
            id: 1,
            result: Ok(ResponseData::State(SystemState::default())),
        };

        let json = serde_json::to_string(&response).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();
        match parsed.result {
            Ok(ResponseData::State(state)) => assert_eq!(state, SystemState::default()),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
