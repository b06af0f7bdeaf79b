//! Transport — the ingest boundary.
//!
//! A transport owns a network listener and forwards every received payload,
//! verbatim and in arrival order, into a registered sink channel. The core
//! never parses inside the transport; normalization happens downstream so a
//! malformed payload can still become a raw record.
//!
//! Status strings returned by `start`/`stop` are shown to the user as-is.

use crate::error::Result;
use tokio::sync::mpsc;

/// Sink half handed to a transport; payloads arrive on the receiver side in
/// the order the transport observed them.
pub type RawPayloadSender = mpsc::UnboundedSender<String>;

/// An ingest source that can be started and stopped at runtime.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Bind to the address and begin forwarding payloads to the registered
    /// sink. Returns a status message on success; binding failures are
    /// errors (address in use, permission denied).
    async fn start(&mut self, addr: &str) -> Result<String>;

    /// Stop listening. Payloads already forwarded stay in the sink;
    /// stopping an idle transport succeeds with a status message.
    async fn stop(&mut self) -> Result<String>;

    /// Whether the transport currently holds a live listener.
    fn is_running(&self) -> bool;

    /// Install the sink for forwarded payloads, replacing any previous one.
    fn register(&mut self, sink: RawPayloadSender);
}
