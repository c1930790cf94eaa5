//! Accept loops for the primary and secondary listening sockets.
//!
//! Each loop runs in its own task and hands every accepted connection to a
//! spawned task, so a slow handshake never blocks further accepts.

use super::Controller;
use crate::config::{BrokerConfig, ProtocolConfig};
use crate::error::{BrokerError, Result};
use crate::process::Process;
use crate::protocol::{decode_reply, identify, read_reply, write_command, Command};
use crate::types::ProcessType;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Which worker listener accepted a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Primary,
    Secondary,
}

/// Handle to the running accept loops. Dropping stops accepting.
pub struct ListenerHandle {
    pub primary_addr: SocketAddr,
    pub secondary_addr: SocketAddr,
    shutdown_tx: Vec<oneshot::Sender<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Stop both accept loops. Registered processes stay connected.
    pub fn shutdown(&mut self) {
        for tx in self.shutdown_tx.drain(..) {
            let _ = tx.send(());
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Controller {
    /// Bind the primary and secondary listeners and start accepting.
    pub async fn listen(self: &Arc<Self>, config: &BrokerConfig) -> Result<ListenerHandle> {
        let primary = bind(&config.bind_addr, config.primary_port).await?;
        let secondary = bind(&config.bind_addr, config.secondary_port).await?;
        let primary_addr = primary.local_addr()?;
        let secondary_addr = secondary.local_addr()?;

        info!("Waiting for primary on {}", primary_addr);
        info!("Waiting for secondaries on {}", secondary_addr);

        let mut shutdown_tx = Vec::new();
        let mut tasks = Vec::new();
        for (listener, slot) in [(primary, Slot::Primary), (secondary, Slot::Secondary)] {
            let (tx, rx) = oneshot::channel();
            shutdown_tx.push(tx);
            tasks.push(tokio::spawn(self.clone().accept_loop(listener, slot, rx)));
        }

        Ok(ListenerHandle {
            primary_addr,
            secondary_addr,
            shutdown_tx,
            tasks,
        })
    }

    async fn accept_loop(
        self: Arc<Self>,
        listener: TcpListener,
        slot: Slot,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("{:?} listener shutting down", slot);
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr)) => {
                            let controller = self.clone();
                            tokio::spawn(async move {
                                match slot {
                                    Slot::Primary => controller.register_primary(stream, peer_addr).await,
                                    Slot::Secondary => controller.register_secondary(stream, peer_addr).await,
                                }
                            });
                        }
                        Err(e) => {
                            error!("{:?} accept error: {}", slot, e);
                        }
                    }
                }
            }
        }
    }

    async fn register_primary(&self, stream: TcpStream, peer_addr: SocketAddr) {
        info!("Primary connected from {}", peer_addr);
        let stream = match self.registry.primary().await {
            Ok(primary) => {
                warn!("Primary reconnected; all secondaries must be restarted");
                match primary.replace_connection(stream).await {
                    Ok(()) => return,
                    Err(stream) => stream,
                }
            }
            Err(_) => stream,
        };
        self.install(ProcessType::Primary, ProtocolConfig::PRIMARY_ID, stream)
            .await;
    }

    async fn register_secondary(&self, mut stream: TcpStream, peer_addr: SocketAddr) {
        let (kind, id) = match self.identify(&mut stream).await {
            Ok(identity) => identity,
            Err(e) => {
                error!("Secondary from {} not identified: {}", peer_addr, e);
                return;
            }
        };
        info!("{}({}) connected from {}", kind, id, peer_addr);

        let stream = match self.registry.get(id).await {
            Some(proc) if proc.kind() == kind => {
                warn!("{} reconnected; replacing its connection", proc.label());
                match proc.replace_connection(stream).await {
                    Ok(()) => return,
                    Err(stream) => stream,
                }
            }
            _ => stream,
        };
        self.install(kind, id, stream).await;
    }

    /// Register a new process, closing any entry it displaces.
    async fn install(&self, kind: ProcessType, id: u32, stream: TcpStream) {
        let proc = Arc::new(Process::new(kind, id, stream, self.command_timeout));
        if let Some(old) = self.registry.insert(proc).await {
            warn!("{} replaced by {}({})", old.label(), kind, id);
            old.close().await;
        }
    }

    /// Run the `_get_client_id` handshake on a fresh connection.
    async fn identify(&self, stream: &mut TcpStream) -> Result<(ProcessType, u32)> {
        let exchange = async {
            write_command(stream, &Command::GetClientId.to_string()).await?;
            read_reply(stream).await
        };
        let no_reply = |reason: String| BrokerError::NoReply {
            process: "secondary".to_string(),
            command: Command::GetClientId.verb().to_string(),
            reason,
        };

        let raw = tokio::time::timeout(self.command_timeout, exchange)
            .await
            .map_err(|_| no_reply("timed out".to_string()))?
            .map_err(|e| no_reply(e.to_string()))?
            .ok_or_else(|| no_reply("connection closed".to_string()))?;

        let reply = decode_reply(&raw)?;
        match identify(&reply) {
            Some((_, id)) if id == ProtocolConfig::PRIMARY_ID => {
                Err(BrokerError::key_invalid("client_id", id))
            }
            Some(identity) => Ok(identity),
            None => Err(BrokerError::Other(format!("unknown process: {}", reply))),
        }
    }
}

async fn bind(addr: &str, port: u16) -> Result<TcpListener> {
    TcpListener::bind((addr, port)).await.map_err(|e| BrokerError::Io {
        message: format!("cannot bind {}:{}: {}", addr, port, e),
        source: Some(e),
    })
}
