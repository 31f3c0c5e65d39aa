//! RPC server — Unix socket surface for `failsafectl`.
//!
//! Newline-delimited JSON, one request per line, one response per line.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{error, info, warn};

use failsafe_common::error::ControlError;
use failsafe_common::ipc::{Method, Request, Response, ResponseData, RpcError};

use crate::controller::Controller;

/// Start the RPC server. Runs until the process exits.
pub async fn start_server(controller: Arc<Controller>, socket_path: &Path) -> Result<()> {
    if let Some(socket_dir) = socket_path.parent() {
        tokio::fs::create_dir_all(socket_dir)
            .await
            .context("Failed to create socket directory")?;
    }

    // Remove a stale socket from a previous run
    let _ = tokio::fs::remove_file(socket_path).await;

    let listener = UnixListener::bind(socket_path).context("Failed to bind Unix socket")?;
    info!("RPC server listening on {}", socket_path.display());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o660))?;
    }

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, controller).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, controller: Arc<Controller>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .context("Failed to read from socket")?;

        if bytes_read == 0 {
            break;
        }

        let request: Request = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                warn!("Invalid request JSON: {}", e);
                // the request id is unreadable, so answer with id 0
                let response = Response {
                    id: 0,
                    result: Err(to_rpc_error(ControlError::Json(e))),
                };
                let response_json = serde_json::to_string(&response)? + "\n";
                writer
                    .write_all(response_json.as_bytes())
                    .await
                    .context("Failed to write response")?;
                continue;
            }
        };

        let response = handle_request(request, &controller).await;

        let response_json = serde_json::to_string(&response)? + "\n";
        writer
            .write_all(response_json.as_bytes())
            .await
            .context("Failed to write response")?;
    }

    Ok(())
}

/// Handle a single request.
pub async fn handle_request(request: Request, controller: &Controller) -> Response {
    let id = request.id;
    let result = match request.method {
        Method::Ping => Ok(ResponseData::Ok),

        Method::Status => Ok(ResponseData::State(controller.state().await)),

        Method::Log { limit } => {
            let mut entries = controller.log_entries().await;
            if let Some(limit) = limit {
                entries.truncate(limit);
            }
            Ok(ResponseData::Log(entries))
        }

        Method::Execute {
            credential,
            protocol,
            reason,
            mode,
            window_minutes,
        } => controller
            .execute_protocol(&credential, &protocol, &reason, mode, window_minutes)
            .await
            .map(ResponseData::Incident)
            .map_err(to_rpc_error),

        Method::RecoverFull { credential } => controller
            .recover_full(&credential)
            .await
            .map(ResponseData::State)
            .map_err(to_rpc_error),

        Method::RecoverStep { credential } => controller
            .recover_progressive_step(&credential)
            .await
            .map(ResponseData::State)
            .map_err(to_rpc_error),

        Method::Reset { credential } => controller
            .reset_to_default(&credential)
            .await
            .map(ResponseData::State)
            .map_err(to_rpc_error),

        Method::ClearLog { credential } => controller
            .clear_log(&credential)
            .await
            .map(|()| ResponseData::Ok)
            .map_err(to_rpc_error),
    };

    Response { id, result }
}

fn to_rpc_error(e: ControlError) -> RpcError {
    RpcError {
        code: e.code(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DigestVerifier;
    use crate::dispatch::{DirectiveSink, LoggingSink};
    use crate::persist::StateStore;
    use failsafe_common::state::{OverallStatus, RecoveryMode, SystemState};

    const CREDENTIAL: &str = "ops-override";

    fn build(dir: &tempfile::TempDir) -> Controller {
        let verifier = Arc::new(DigestVerifier::new(DigestVerifier::digest_of(CREDENTIAL)));
        Controller::new(
            StateStore::new(dir.path()),
            verifier,
            Arc::new(LoggingSink) as Arc<dyn DirectiveSink>,
            true,
            5,
        )
    }

    fn request(id: u64, method: Method) -> Request {
        Request { id, method }
    }

    #[tokio::test]
    async fn test_ping() {
        let dir = tempfile::tempdir().unwrap();
        let controller = build(&dir);

        let response = handle_request(request(1, Method::Ping), &controller).await;
        assert_eq!(response.id, 1);
        assert!(matches!(response.result, Ok(ResponseData::Ok)));
    }

    #[tokio::test]
    async fn test_status_reads_without_credential() {
        let dir = tempfile::tempdir().unwrap();
        let controller = build(&dir);

        let response = handle_request(request(2, Method::Status), &controller).await;
        match response.result {
            Ok(ResponseData::State(state)) => assert_eq!(state, SystemState::default()),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_then_status() {
        let dir = tempfile::tempdir().unwrap();
        let controller = build(&dir);

        let response = handle_request(
            request(
                3,
                Method::Execute {
                    credential: CREDENTIAL.to_string(),
                    protocol: "security-alert".to_string(),
                    reason: "drill".to_string(),
                    mode: RecoveryMode::Manual,
                    window_minutes: 0,
                },
            ),
            &controller,
        )
        .await;
        match response.result {
            Ok(ResponseData::Incident(incident)) => {
                assert_eq!(incident.protocol_id, "security-alert");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let response = handle_request(request(4, Method::Status), &controller).await;
        match response.result {
            Ok(ResponseData::State(state)) => {
                assert_eq!(state.overall_status, OverallStatus::Emergency);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_credential_maps_to_unauthorized_code() {
        let dir = tempfile::tempdir().unwrap();
        let controller = build(&dir);

        let response = handle_request(
            request(
                5,
                Method::Reset {
                    credential: "wrong".to_string(),
                },
            ),
            &controller,
        )
        .await;
        match response.result {
            Err(e) => assert_eq!(e.code, ControlError::Unauthorized.code()),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_log_limit() {
        let dir = tempfile::tempdir().unwrap();
        let controller = build(&dir);

        controller
            .execute_protocol(CREDENTIAL, "soft-restart", "one", RecoveryMode::Manual, 0)
            .await
            .unwrap();
        controller.recover_full(CREDENTIAL).await.unwrap();

        let response =
            handle_request(request(6, Method::Log { limit: Some(1) }), &controller).await;
        match response.result {
            Ok(ResponseData::Log(entries)) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].action, "recover_full");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_request_gets_parse_error_response() {
        let dir = tempfile::tempdir().unwrap();
        let controller = Arc::new(build(&dir));

        let (client, server) = UnixStream::pair().unwrap();
        tokio::spawn(handle_connection(server, Arc::clone(&controller)));

        let (reader, mut writer) = client.into_split();
        let mut reader = BufReader::new(reader);

        writer.write_all(b"{not json}\n").await.unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let response: Response = serde_json::from_str(&line).unwrap();
        assert_eq!(response.id, 0);
        match response.result {
            Err(e) => assert_eq!(e.code, -32700),
            other => panic!("unexpected result: {:?}", other),
        }

        // the connection stays usable after a bad line
        let ping = serde_json::to_string(&request(7, Method::Ping)).unwrap() + "\n";
        writer.write_all(ping.as_bytes()).await.unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        let response: Response = serde_json::from_str(&line).unwrap();
        assert_eq!(response.id, 7);
        assert!(matches!(response.result, Ok(ResponseData::Ok)));
    }
}
