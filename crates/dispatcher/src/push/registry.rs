//! ConnectionRegistry - live WebSocket clients

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

pub type ClientId = u64;

/// Frames a client may have pending before new ones are dropped for it
pub const CLIENT_QUEUE_DEPTH: usize = 4;

#[derive(Debug)]
struct ClientHandle {
    peer: SocketAddr,
    tx: mpsc::Sender<Message>,
}

/// Result of one [`ConnectionRegistry::broadcast`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Clients the frame was queued for
    pub queued: usize,
    /// Clients still connected whose queue was full
    pub dropped: usize,
}

impl BroadcastOutcome {
    /// Connected clients at broadcast time, slow ones included
    pub fn audience(&self) -> usize {
        self.queued + self.dropped
    }
}

/// Set of connected clients, each reached through its writer task's queue.
///
/// Connect, disconnect and broadcast may run concurrently from different
/// tasks. Queues are bounded: a client that stops reading misses frames
/// instead of accumulating them.
#[derive(Debug)]
pub struct ConnectionRegistry {
    channel: String,
    clients: DashMap<ClientId, ClientHandle>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            clients: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Queue for a new client, sized to [`CLIENT_QUEUE_DEPTH`]
    pub fn client_queue() -> (mpsc::Sender<Message>, mpsc::Receiver<Message>) {
        mpsc::channel(CLIENT_QUEUE_DEPTH)
    }

    /// Register a client; messages for it go to `tx`
    pub fn on_connect(&self, peer: SocketAddr, tx: mpsc::Sender<Message>) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.clients.insert(id, ClientHandle { peer, tx });
        let clients = self.len();
        observability::record_connected_clients(&self.channel, clients);
        debug!(client = id, %peer, clients, "Client registered");
        id
    }

    /// Remove a client; returns false if it was already gone
    pub fn on_disconnect(&self, id: ClientId) -> bool {
        match self.clients.remove(&id) {
            Some((_, handle)) => {
                let clients = self.len();
                observability::record_connected_clients(&self.channel, clients);
                debug!(client = id, peer = %handle.peer, clients, "Client removed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Queue `message` for every client without waiting.
    ///
    /// A client with a full queue skips this frame. Clients whose writer has
    /// gone away are dropped from the registry.
    pub fn broadcast(&self, message: &Message) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();
        let mut dead = Vec::new();

        for entry in self.clients.iter() {
            match entry.tx.try_send(message.clone()) {
                Ok(()) => outcome.queued += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(client = *entry.key(), "Client queue full, frame dropped");
                    outcome.dropped += 1;
                }
                Err(TrySendError::Closed(_)) => dead.push(*entry.key()),
            }
        }

        // removal must happen after the iterator released its shard locks
        for id in dead {
            self.on_disconnect(id);
        }
        outcome
    }
}

/// Close frame sent to clients when the server stops
pub(crate) fn going_away(reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::Away,
        reason: reason.to_string().into(),
    }))
}
