//! Protocol client for one connected worker process.
//!
//! A [`Process`] exclusively owns the TCP stream to its worker. Commands are
//! serialized by a tokio `Mutex` around the connection slot, so exactly one
//! request/reply exchange is in flight per process at any time.
//!
//! # Connection replacement
//!
//! Every installed connection is tagged with a generation number published on
//! a `watch` channel. Replacing or closing the connection bumps the
//! generation first, which makes any exchange still running on the old stream
//! fail with [`BrokerError::NoReply`] and release the lock. The new stream is
//! installed once the lock is free.
//!
//! A process whose connection is gone for good is *retired*: it refuses new
//! connections, so a reconnecting worker gets a fresh registry entry instead.

use crate::error::{BrokerError, Result};
use crate::protocol::{decode_reply, read_reply, write_command, Command};
use crate::types::ProcessType;
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

struct Channel {
    stream: TcpStream,
    generation: u64,
    changes: watch::Receiver<u64>,
}

struct Slot {
    channel: Option<Channel>,
    retired: bool,
}

/// A connected worker process.
pub struct Process {
    kind: ProcessType,
    id: u32,
    conn: Mutex<Slot>,
    generation: watch::Sender<u64>,
    command_timeout: Duration,
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("generation", &*self.generation.borrow())
            .finish()
    }
}

impl Process {
    /// Wrap an identified connection.
    pub fn new(kind: ProcessType, id: u32, stream: TcpStream, command_timeout: Duration) -> Self {
        let (generation, changes) = watch::channel(0);
        Self {
            kind,
            id,
            conn: Mutex::new(Slot {
                channel: Some(Channel {
                    stream,
                    generation: 0,
                    changes,
                }),
                retired: false,
            }),
            generation,
            command_timeout,
        }
    }

    pub fn kind(&self) -> ProcessType {
        self.kind
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Label used in logs and errors, e.g. `primary` or `vf(2)`.
    pub fn label(&self) -> String {
        match self.kind {
            ProcessType::Primary => self.kind.to_string(),
            kind => format!("{}({})", kind, self.id),
        }
    }

    /// Run a command and return its decoded reply.
    ///
    /// Fails with `Unsupported` before touching the socket when the command is
    /// not part of this process type's vocabulary.
    pub async fn execute(&self, command: &Command) -> Result<Value> {
        if !command.supported_by(self.kind) {
            return Err(BrokerError::Unsupported {
                process: self.label(),
                command: command.verb().to_string(),
            });
        }
        let line = command.to_string();
        info!("{}: {}", self.label(), line);
        self.send(command.verb(), &line).await
    }

    pub async fn status(&self) -> Result<Value> {
        self.execute(&Command::Status).await
    }

    pub async fn exit(&self) -> Result<Value> {
        self.execute(&Command::Exit).await
    }

    async fn send(&self, verb: &str, line: &str) -> Result<Value> {
        let mut slot = self.conn.lock().await;
        let Some(channel) = slot.channel.as_mut() else {
            return Err(self.no_reply(verb, "connection closed"));
        };
        if *channel.changes.borrow() != channel.generation {
            return Err(self.no_reply(verb, "connection replaced"));
        }

        let Channel {
            stream,
            generation,
            changes,
        } = channel;
        let exchange = async {
            write_command(stream, line).await?;
            read_reply(stream).await
        };

        let outcome = tokio::select! {
            outcome = tokio::time::timeout(self.command_timeout, exchange) => outcome,
            _ = superseded(changes, *generation) => {
                return Err(self.no_reply(verb, "connection replaced"));
            }
        };

        let raw = match outcome {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => return Err(self.drop_channel(&mut slot, verb, "connection closed")),
            Ok(Err(e)) => return Err(self.drop_channel(&mut slot, verb, &e.to_string())),
            Err(_) => return Err(self.drop_channel(&mut slot, verb, "timed out")),
        };
        drop(slot);

        debug!("{}: reply to {}: {}", self.label(), verb, String::from_utf8_lossy(&raw));
        decode_reply(&raw)
    }

    /// Forget a stream that failed mid-exchange; a late reply would desync it.
    fn drop_channel(&self, slot: &mut Slot, verb: &str, reason: &str) -> BrokerError {
        slot.channel.take();
        self.no_reply(verb, reason)
    }

    fn no_reply(&self, verb: &str, reason: &str) -> BrokerError {
        BrokerError::NoReply {
            process: self.label(),
            command: verb.to_string(),
            reason: reason.to_string(),
        }
    }

    fn next_generation(&self) -> u64 {
        let mut next = 0;
        self.generation.send_modify(|generation| {
            *generation += 1;
            next = *generation;
        });
        next
    }

    /// Swap in a new connection for this process.
    ///
    /// A command in flight on the old connection fails with `NoReply`. The
    /// old stream is closed. A retired process hands the stream back.
    pub async fn replace_connection(&self, stream: TcpStream) -> std::result::Result<(), TcpStream> {
        let generation = self.next_generation();
        let mut slot = self.conn.lock().await;
        if slot.retired {
            return Err(stream);
        }
        if *self.generation.borrow() != generation {
            warn!("{}: connection superseded before install", self.label());
            return Ok(());
        }
        slot.channel = Some(Channel {
            stream,
            generation,
            changes: self.generation.subscribe(),
        });
        Ok(())
    }

    /// Close the connection and retire the process. Pending and later
    /// commands fail with `NoReply`.
    pub async fn close(&self) {
        self.next_generation();
        let mut slot = self.conn.lock().await;
        slot.retired = true;
        if slot.channel.take().is_some() {
            info!("{}: connection closed", self.label());
        }
    }

    /// Retire the process if its connection failed and nothing replaced it.
    ///
    /// Returns `false` when a connection is installed, e.g. the worker
    /// reconnected while the failed command was in flight.
    pub async fn retire_if_disconnected(&self) -> bool {
        let mut slot = self.conn.lock().await;
        if slot.channel.is_some() {
            return false;
        }
        slot.retired = true;
        true
    }

    /// Whether a connection is installed.
    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.channel.is_some()
    }
}

/// Resolves once the published generation moves past `installed`.
async fn superseded(changes: &mut watch::Receiver<u64>, installed: u64) {
    let _ = changes.wait_for(|current| *current != installed).await;
}
