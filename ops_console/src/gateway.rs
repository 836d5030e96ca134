use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{trace, warn};

use mission_proto::{
    decode_server_message, encode_client_message, ClientMessage, MessageError, ServerMessage,
    ServerMessageKind,
};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("channel closed")]
    ChannelClosed,
    #[error("message codec failed: {0}")]
    Codec(#[from] MessageError),
    #[error("a request of this kind is already in flight")]
    RequestInFlight,
    #[error("message has no reply kind")]
    NotARequest,
}

type CloseCallback = Box<dyn Fn() + Send + 'static>;

struct CloseHooks {
    closed: bool,
    callbacks: Vec<CloseCallback>,
}

type PendingReplies = Arc<Mutex<HashMap<ServerMessageKind, oneshot::Sender<ServerMessage>>>>;

/// Client side of the mission channel: one TCP connection carrying
/// length-prefixed JSON frames both ways.
///
/// Replies are routed to the matching [`Gateway::request`] waiter; everything
/// else (broadcasts, unclaimed replies) flows to the update stream read with
/// [`Gateway::next_update`].
pub struct Gateway {
    outgoing: mpsc::UnboundedSender<ClientMessage>,
    pending: PendingReplies,
    close_hooks: Arc<Mutex<CloseHooks>>,
    updates: mpsc::UnboundedReceiver<ServerMessage>,
}

// Not derivable: the close hooks hold `dyn Fn` callbacks.
impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway").finish_non_exhaustive()
    }
}

impl Gateway {
    pub async fn open(host: &str, port: u16) -> Result<Self, GatewayError> {
        let addr = format!("{host}:{port}");
        let stream =
            TcpStream::connect(&addr)
                .await
                .map_err(|source| GatewayError::Connect {
                    addr: addr.clone(),
                    source,
                })?;
        if let Err(err) = stream.set_nodelay(true) {
            warn!(target: "tauntaun::client", error = %err, "channel.nodelay_failed");
        }
        let (read_half, write_half) = stream.into_split();

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));
        let close_hooks = Arc::new(Mutex::new(CloseHooks {
            closed: false,
            callbacks: Vec::new(),
        }));

        tokio::spawn(write_frames(write_half, outgoing_rx));
        tokio::spawn(read_frames(
            read_half,
            updates_tx,
            Arc::clone(&pending),
            Arc::clone(&close_hooks),
        ));

        Ok(Self {
            outgoing: outgoing_tx,
            pending,
            close_hooks,
            updates: updates_rx,
        })
    }

    /// Register a callback that runs when the channel ends. Fires
    /// immediately when the channel is already gone, so a late registration
    /// cannot miss the event.
    pub fn on_close(&self, callback: impl Fn() + Send + 'static) {
        let mut hooks = self.close_hooks.lock().expect("close hook mutex poisoned");
        if hooks.closed {
            drop(hooks);
            callback();
        } else {
            hooks.callbacks.push(Box::new(callback));
        }
    }

    /// Fire-and-forget command dispatch.
    pub fn send(&self, message: ClientMessage) -> Result<(), GatewayError> {
        self.outgoing
            .send(message)
            .map_err(|_| GatewayError::ChannelClosed)
    }

    /// Send a request and wait for the reply of its kind.
    pub async fn request(&self, message: ClientMessage) -> Result<ServerMessage, GatewayError> {
        let kind = message.expected_reply().ok_or(GatewayError::NotARequest)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().expect("pending reply mutex poisoned");
            if pending.contains_key(&kind) {
                return Err(GatewayError::RequestInFlight);
            }
            pending.insert(kind, reply_tx);
        }
        if let Err(err) = self.send(message) {
            self.pending
                .lock()
                .expect("pending reply mutex poisoned")
                .remove(&kind);
            return Err(err);
        }
        reply_rx.await.map_err(|_| GatewayError::ChannelClosed)
    }

    /// Next server message that no request claimed. `None` once the channel
    /// is closed and drained.
    pub async fn next_update(&mut self) -> Option<ServerMessage> {
        self.updates.recv().await
    }
}

async fn write_frames(
    mut writer: OwnedWriteHalf,
    mut outgoing: mpsc::UnboundedReceiver<ClientMessage>,
) {
    while let Some(message) = outgoing.recv().await {
        let frame = match encode_client_message(&message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(target: "tauntaun::client", error = %err, "frame.encode_failed");
                continue;
            }
        };
        let mut buffer = Vec::with_capacity(4 + frame.len());
        buffer.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        buffer.extend_from_slice(&frame);
        if let Err(err) = writer.write_all(&buffer).await {
            warn!(target: "tauntaun::client", error = %err, "frame.write_failed");
            break;
        }
    }
}

async fn read_frames(
    mut reader: OwnedReadHalf,
    updates: mpsc::UnboundedSender<ServerMessage>,
    pending: PendingReplies,
    close_hooks: Arc<Mutex<CloseHooks>>,
) {
    let mut len_buf = [0u8; 4];
    loop {
        if reader.read_exact(&mut len_buf).await.is_err() {
            break;
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut payload = vec![0u8; len];
        if reader.read_exact(&mut payload).await.is_err() {
            break;
        }
        let message = match decode_server_message(&payload) {
            Ok(message) => message,
            Err(err) => {
                warn!(target: "tauntaun::client", error = %err, "frame.rejected");
                continue;
            }
        };
        trace!(target: "tauntaun::client", kind = ?message.kind(), "frame.received");
        let waiter = pending
            .lock()
            .expect("pending reply mutex poisoned")
            .remove(&message.kind());
        match waiter {
            Some(waiter) => {
                let _ = waiter.send(message);
            }
            None => {
                if updates.send(message).is_err() {
                    break;
                }
            }
        }
    }

    // Dropping the waiters fails any request still in flight.
    pending
        .lock()
        .expect("pending reply mutex poisoned")
        .clear();
    let callbacks = {
        let mut hooks = close_hooks.lock().expect("close hook mutex poisoned");
        hooks.closed = true;
        std::mem::take(&mut hooks.callbacks)
    };
    for callback in &callbacks {
        callback();
    }
}
