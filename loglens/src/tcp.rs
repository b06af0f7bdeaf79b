//! TCP line transport.
//!
//! Listens on a TCP address and forwards every newline-delimited payload,
//! verbatim, to the registered sink. Multiple producers may connect at
//! once; each connection gets its own reader task and the sink channel
//! serializes their payloads into one arrival order.

use loglens_core::error::{Error, Result};
use loglens_core::transport::{RawPayloadSender, Transport};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// [`Transport`] over newline-delimited TCP.
pub struct TcpLineTransport {
    sink: Arc<Mutex<Option<RawPayloadSender>>>,
    accept_task: Option<JoinHandle<()>>,
    bound_addr: Option<String>,
}

impl TcpLineTransport {
    pub fn new() -> Self {
        Self {
            sink: Arc::new(Mutex::new(None)),
            accept_task: None,
            bound_addr: None,
        }
    }
}

impl Default for TcpLineTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TcpLineTransport {
    async fn start(&mut self, addr: &str) -> Result<String> {
        if self.accept_task.is_some() {
            return Ok(format!(
                "Already listening on {}",
                self.bound_addr.as_deref().unwrap_or(addr)
            ));
        }

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Transport(format!("failed to bind {}: {}", addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| addr.to_string());

        let sink = Arc::clone(&self.sink);
        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "Producer connected");
                        let sink = Arc::clone(&sink);
                        tokio::spawn(async move {
                            let mut lines = BufReader::new(stream).lines();
                            loop {
                                match lines.next_line().await {
                                    Ok(Some(line)) => {
                                        let sender =
                                            sink.lock().expect("lock poisoned").clone();
                                        if let Some(sender) = sender {
                                            // Receiver gone means shutdown in progress
                                            if sender.send(line).is_err() {
                                                break;
                                            }
                                        }
                                    }
                                    Ok(None) => break,
                                    Err(e) => {
                                        tracing::warn!(%peer, error = %e, "Producer read failed");
                                        break;
                                    }
                                }
                            }
                            tracing::debug!(%peer, "Producer disconnected");
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                    }
                }
            }
        });

        self.accept_task = Some(task);
        self.bound_addr = Some(local_addr.clone());
        tracing::info!(addr = %local_addr, "Ingest listener started");
        Ok(format!("Listening on {}", local_addr))
    }

    async fn stop(&mut self) -> Result<String> {
        match self.accept_task.take() {
            Some(task) => {
                task.abort();
                let addr = self.bound_addr.take().unwrap_or_default();
                tracing::info!(%addr, "Ingest listener stopped");
                Ok(format!("Stopped listening on {}", addr))
            }
            None => Ok("Not listening".to_string()),
        }
    }

    fn is_running(&self) -> bool {
        self.accept_task.is_some()
    }

    fn register(&mut self, sink: RawPayloadSender) {
        *self.sink.lock().expect("lock poisoned") = Some(sink);
    }
}
