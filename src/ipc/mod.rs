//! IPC layer: JSON-lines protocol over a Unix socket between the daemon and
//! its clients (CLI commands and `follow` consumers).

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{follow_events, send_command};
pub use protocol::{Command, Event, Response, SessionStatus};
pub use server::{CommandHandler, IpcServer};
