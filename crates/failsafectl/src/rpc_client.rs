//! RPC client - Unix socket client for the failsafed control socket.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use failsafe_common::ipc::{Method, Request, Response, ResponseData};

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

const DEFAULT_SOCKET: &str = "/run/failsafe/failsafe.sock";

pub struct RpcClient {
    reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    writer: tokio::net::unix::OwnedWriteHalf,
}

impl RpcClient {
    /// Socket path resolution: explicit flag, then $FAILSAFED_SOCKET, then
    /// the default.
    pub fn discover_socket_path(explicit_path: Option<&str>) -> String {
        if let Some(path) = explicit_path {
            return path.to_string();
        }
        if let Ok(path) = std::env::var("FAILSAFED_SOCKET") {
            return path;
        }
        DEFAULT_SOCKET.to_string()
    }

    pub async fn connect(socket_path: Option<&str>) -> Result<Self> {
        let path = Self::discover_socket_path(socket_path);

        match tokio::time::timeout(Duration::from_millis(500), UnixStream::connect(&path)).await {
            Ok(Ok(stream)) => {
                let (reader, writer) = stream.into_split();
                Ok(Self {
                    reader: BufReader::new(reader),
                    writer,
                })
            }
            Ok(Err(e)) => Err(anyhow::anyhow!(
                "Cannot reach failsafed at {}: {}. Is the daemon running?",
                path,
                e
            )),
            Err(_) => Err(anyhow::anyhow!("Connection to {} timed out", path)),
        }
    }

    /// Send one request and wait for the matching response.
    pub async fn call(&mut self, method: Method) -> Result<ResponseData> {
        let request = Request {
            id: REQUEST_ID.fetch_add(1, Ordering::SeqCst),
            method,
        };

        let json = serde_json::to_string(&request)? + "\n";
        self.writer
            .write_all(json.as_bytes())
            .await
            .context("Failed to send request")?;

        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .await
            .context("Failed to read response")?;

        let response: Response =
            serde_json::from_str(&line).context("Failed to parse response")?;
        if response.id != request.id {
            anyhow::bail!("Response id mismatch");
        }

        match response.result {
            Ok(data) => Ok(data),
            Err(e) => anyhow::bail!("{} (code {})", e.message, e.code),
        }
    }
}
