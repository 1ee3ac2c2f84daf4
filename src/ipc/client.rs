//! IPC client used by the CLI to talk to a running daemon.

use crate::error::{Result, TabscribeError};
use crate::ipc::protocol::{Command, Event, Response};
use crate::ipc::server::IpcServer;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

fn resolve_socket(socket: Option<PathBuf>) -> PathBuf {
    socket.unwrap_or_else(IpcServer::default_socket_path)
}

async fn connect(path: &Path) -> Result<UnixStream> {
    UnixStream::connect(path)
        .await
        .map_err(|e| TabscribeError::IpcConnection {
            message: format!(
                "Failed to connect to daemon at {}: {} (is the daemon running?)",
                path.display(),
                e
            ),
        })
}

/// Sends one command and returns the daemon's response.
pub async fn send_command(socket: Option<PathBuf>, command: Command) -> Result<Response> {
    let path = resolve_socket(socket);
    let stream = connect(&path).await?;
    let (reader, mut writer) = stream.into_split();

    let command_json = command.to_json().map_err(|e| TabscribeError::IpcProtocol {
        message: format!("Failed to serialize command: {}", e),
    })?;

    writer
        .write_all(format!("{command_json}\n").as_bytes())
        .await
        .map_err(|e| TabscribeError::IpcConnection {
            message: format!("Failed to send command: {}", e),
        })?;
    writer
        .flush()
        .await
        .map_err(|e| TabscribeError::IpcConnection {
            message: format!("Failed to flush command: {}", e),
        })?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .await
        .map_err(|e| TabscribeError::IpcConnection {
            message: format!("Failed to read response: {}", e),
        })?;

    Response::from_json(line.trim()).map_err(|e| TabscribeError::IpcProtocol {
        message: format!("Failed to parse response: {}", e),
    })
}

/// Subscribes to the daemon's event stream and invokes `on_event` for each
/// received event until the daemon closes the connection.
pub async fn follow_events<F>(socket: Option<PathBuf>, mut on_event: F) -> Result<()>
where
    F: FnMut(Event),
{
    let path = resolve_socket(socket);
    let stream = connect(&path).await?;
    let (reader, mut writer) = stream.into_split();

    let command_json = Command::Follow
        .to_json()
        .map_err(|e| TabscribeError::IpcProtocol {
            message: format!("Failed to serialize command: {}", e),
        })?;
    writer
        .write_all(format!("{command_json}\n").as_bytes())
        .await
        .map_err(|e| TabscribeError::IpcConnection {
            message: format!("Failed to send follow command: {}", e),
        })?;
    writer
        .flush()
        .await
        .map_err(|e| TabscribeError::IpcConnection {
            message: format!("Failed to flush follow command: {}", e),
        })?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| TabscribeError::IpcConnection {
                message: format!("Failed to read event: {}", e),
            })?;
        if read == 0 {
            // Daemon closed the stream.
            return Ok(());
        }
        match Event::from_json(line.trim()) {
            Ok(event) => on_event(event),
            Err(e) => {
                eprintln!("tabscribe: skipping malformed event: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_socket_prefers_explicit_path() {
        let explicit = PathBuf::from("/tmp/custom.sock");
        assert_eq!(resolve_socket(Some(explicit.clone())), explicit);
    }

    #[test]
    fn resolve_socket_falls_back_to_default() {
        assert_eq!(resolve_socket(None), IpcServer::default_socket_path());
    }

    #[tokio::test]
    async fn send_command_fails_without_daemon() {
        let result = send_command(
            Some(PathBuf::from("/tmp/tabscribe-test-no-daemon.sock")),
            Command::Status,
        )
        .await;

        match result {
            Err(TabscribeError::IpcConnection { message }) => {
                assert!(message.contains("is the daemon running?"));
            }
            _ => panic!("Expected IpcConnection error"),
        }
    }
}
