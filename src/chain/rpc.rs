//! JSON-RPC transport to the settlement ledger.
//!
//! [`WsRpc`] keeps one WebSocket open and multiplexes requests over it by
//! id. A writer task drains an outgoing queue into the socket; a reader task
//! routes each response to the waiting caller. Once the reader sees the
//! connection end, every waiting and later request fails with
//! [`TransportError::Closed`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::chain::protocol::{RpcRequest, RpcResponse};

/// Transport-level failures.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Could not open the connection.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Connection went away before a response arrived.
    #[error("connection closed")]
    Closed,

    /// Frame could not be encoded or decoded.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The ledger answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Reason.
        message: String,
    },
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::Malformed(e.to_string())
    }
}

/// Request/response channel to the settlement ledger.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Issue one JSON-RPC call and wait for its result.
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError>;
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, TransportError>>>>>;

/// Removes a pending entry when the caller stops waiting.
struct PendingGuard {
    pending: Pending,
    id: u64,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

/// JSON-RPC over a single WebSocket connection.
pub struct WsRpc {
    url: String,
    next_id: AtomicU64,
    outgoing: mpsc::Sender<String>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl WsRpc {
    /// Connect to `url` and start the I/O tasks.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        info!("Connected to settlement ledger at {}", url);

        let (mut ws_sink, mut ws_source) = ws_stream.split();
        let (outgoing, mut outgoing_rx) = mpsc::channel::<String>(64);
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let writer = tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                if let Err(e) = ws_sink.send(Message::Text(frame)).await {
                    error!("Failed to send frame: {}", e);
                    break;
                }
            }
            let _ = ws_sink.close().await;
        });

        let writer_abort = writer.abort_handle();
        let reader_pending = pending.clone();
        let reader_closed = closed.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_source.next().await {
                match msg {
                    Ok(Message::Text(text)) => dispatch(&reader_pending, &text),
                    Ok(Message::Binary(data)) => match std::str::from_utf8(&data) {
                        Ok(text) => dispatch(&reader_pending, text),
                        Err(_) => warn!("Dropping non-UTF-8 binary frame"),
                    },
                    Ok(Message::Close(_)) => {
                        debug!("Ledger closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }

            // Later requests see the flag; earlier ones are drained here
            reader_closed.store(true, Ordering::SeqCst);
            writer_abort.abort();
            let waiters: Vec<_> = reader_pending.lock().drain().collect();
            for (_, tx) in waiters {
                let _ = tx.send(Err(TransportError::Closed));
            }
        });

        Ok(Self {
            url: url.to_string(),
            next_id: AtomicU64::new(1),
            outgoing,
            pending,
            closed,
            writer,
            reader,
        })
    }

    /// Endpoint this transport is connected to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The connection has ended.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Requests awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }
}

#[async_trait]
impl LedgerRpc for WsRpc {
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = serde_json::to_string(&RpcRequest::new(id, method, params))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        let _guard = PendingGuard {
            pending: self.pending.clone(),
            id,
        };
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        debug!(id, method, "rpc request");
        self.outgoing
            .send(frame)
            .await
            .map_err(|_| TransportError::Closed)?;

        rx.await.map_err(|_| TransportError::Closed)?
    }
}

impl Drop for WsRpc {
    fn drop(&mut self) {
        self.writer.abort();
        self.reader.abort();
    }
}

/// Route one response frame to its waiter.
fn dispatch(pending: &Pending, text: &str) {
    let response: RpcResponse = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!("Malformed response frame: {}", e);
            return;
        }
    };

    let Some(tx) = pending.lock().remove(&response.id) else {
        debug!(id = response.id, "response for unknown or abandoned request");
        return;
    };

    let _ = tx.send(into_result(response));
}

/// Collapse a response into the caller's result.
pub(crate) fn into_result(response: RpcResponse) -> Result<Value, TransportError> {
    match response.error {
        Some(err) => Err(TransportError::Rpc {
            code: err.code,
            message: err.message,
        }),
        None => Ok(response.result.unwrap_or(Value::Null)),
    }
}
