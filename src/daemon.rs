//! Daemon composition root: wires the orchestrator, capture contexts, the
//! inference engine factory, and the IPC server together.

use crate::capture::{CaptureConfig, CaptureContext, MediaHost};
use crate::config::Config;
use crate::engine::{InferenceParams, TranscriberFactory, WhisperConfig, WhisperTranscriberFactory};
use crate::error::Result;
use crate::ipc::protocol::{Command, Response, SessionStatus};
use crate::ipc::server::{CommandHandler, IpcServer};
use crate::messages::TargetId;
use crate::orchestrator::{
    BroadcastSink, CaptureSpawner, LogIndicator, Orchestrator, OrchestratorCommand,
    TranscriptHistory,
};
use crossbeam_channel::Sender;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Builds the inference parameters from config.
fn inference_params(config: &Config) -> InferenceParams {
    InferenceParams {
        language: config.engine.language.clone(),
        window_secs: config.engine.window_secs,
        stride_secs: config.engine.stride_secs,
        threads: config.engine.threads,
    }
}

/// Builds the per-context capture configuration from config.
fn capture_config(config: &Config) -> CaptureConfig {
    CaptureConfig {
        chunk_ms: config.capture.chunk_ms,
        poll_interval: Duration::from_millis(config.capture.poll_interval_ms),
        heartbeat_interval: Duration::from_secs(config.heartbeat.interval_secs),
        inference: inference_params(config),
        inference_timeout: Duration::from_secs(config.engine.inference_timeout_secs),
    }
}

fn build_host(config: &Config) -> Result<Arc<dyn MediaHost>> {
    #[cfg(feature = "cpal-audio")]
    {
        Ok(Arc::new(crate::capture::SystemMediaHost::new(
            config.capture.device.clone(),
        )))
    }
    #[cfg(not(feature = "cpal-audio"))]
    {
        let _ = config;
        Err(crate::error::TabscribeError::AudioCapture {
            message: "built without a capture backend (enable the cpal-audio feature)".to_string(),
        })
    }
}

/// Command handler bridging IPC commands to orchestrator commands.
struct DaemonCommandHandler {
    commands_tx: Sender<OrchestratorCommand>,
    shutdown: Arc<Notify>,
}

impl DaemonCommandHandler {
    fn forward(&self, command: OrchestratorCommand) -> Response {
        match self.commands_tx.send(command) {
            Ok(()) => Response::Ok,
            Err(_) => Response::Error {
                message: "orchestrator is not running".to_string(),
            },
        }
    }

    async fn status(&self) -> Response {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        if self
            .commands_tx
            .send(OrchestratorCommand::Status { reply: reply_tx })
            .is_err()
        {
            return Response::Error {
                message: "orchestrator is not running".to_string(),
            };
        }

        let reply = tokio::task::spawn_blocking(move || {
            reply_rx.recv_timeout(Duration::from_secs(2))
        })
        .await;

        match reply {
            Ok(Ok(snapshot)) => Response::Status {
                sessions: snapshot
                    .into_iter()
                    .map(|(target, state)| SessionStatus {
                        target: target.0,
                        state,
                    })
                    .collect(),
            },
            _ => Response::Error {
                message: "orchestrator did not answer".to_string(),
            },
        }
    }
}

#[async_trait::async_trait]
impl CommandHandler for DaemonCommandHandler {
    async fn handle(&self, command: Command) -> Response {
        match command {
            Command::Toggle { target } => self.forward(OrchestratorCommand::Trigger {
                target: TargetId(target),
            }),
            Command::Stop { target } => self.forward(OrchestratorCommand::Stop {
                target: TargetId(target),
            }),
            Command::TargetRemoved { target } => {
                self.forward(OrchestratorCommand::TargetRemoved {
                    target: TargetId(target),
                })
            }
            Command::TargetNavigated { target } => {
                self.forward(OrchestratorCommand::TargetNavigated {
                    target: TargetId(target),
                })
            }
            Command::Status => self.status().await,
            Command::Shutdown => {
                self.shutdown.notify_one();
                Response::Ok
            }
            // Follow never reaches the handler; the server streams it.
            Command::Follow => Response::Ok,
        }
    }
}

/// Runs the daemon until a Shutdown command arrives.
pub async fn run_daemon(config: Config, socket: Option<PathBuf>, quiet: bool) -> Result<()> {
    let host = build_host(&config)?;
    let factory: Arc<dyn TranscriberFactory> =
        Arc::new(WhisperTranscriberFactory::new(WhisperConfig {
            model_path: config.engine.model.clone(),
            params: inference_params(&config),
        }));

    let (events_broadcast_tx, _) = tokio::sync::broadcast::channel(256);

    let spawner: CaptureSpawner = {
        let host = Arc::clone(&host);
        let factory = Arc::clone(&factory);
        let capture_config = capture_config(&config);
        Box::new(move |target, events_tx| {
            CaptureContext::spawn(
                target,
                Arc::clone(&host),
                Arc::clone(&factory),
                events_tx,
                capture_config.clone(),
            )
        })
    };

    let history = TranscriptHistory::new(
        config.history.max_entries,
        Duration::from_secs(config.history.max_age_secs),
    );

    let (orchestrator, commands_tx) = Orchestrator::new(
        host,
        spawner,
        Box::new(LogIndicator),
        Box::new(BroadcastSink::new(events_broadcast_tx.clone())),
        history,
    );
    let orchestrator_handle = orchestrator.spawn();

    let socket_path = socket.unwrap_or_else(IpcServer::default_socket_path);
    let server = IpcServer::new(socket_path.clone(), events_broadcast_tx);
    let shutdown = Arc::new(Notify::new());

    let handler = DaemonCommandHandler {
        commands_tx: commands_tx.clone(),
        shutdown: Arc::clone(&shutdown),
    };

    if !quiet {
        eprintln!("tabscribe: daemon listening on {}", socket_path.display());
    }

    tokio::select! {
        result = server.start(handler) => {
            result?;
        }
        _ = shutdown.notified() => {
            server.stop().await?;
        }
    }

    // Stop the orchestrator (which stops every active session) and wait for
    // it to drain.
    let _ = commands_tx.send(OrchestratorCommand::Shutdown);
    let _ = tokio::task::spawn_blocking(move || orchestrator_handle.join()).await;

    if !quiet {
        eprintln!("tabscribe: daemon stopped");
    }

    Ok(())
}
