//! PushServer - WebSocket accept loop and per-client connection tasks

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, Stream, StreamExt};
use scheduler::ShutdownSignal;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::registry::{going_away, ClientId, ConnectionRegistry};
use crate::DispatcherError;

/// How long stop waits for clients to receive their close frames
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Back-off after a failed accept
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// WebSocket server feeding a [`ConnectionRegistry`].
///
/// Stops when [`stop`](Self::stop) is called or the process-wide shutdown
/// signal fires, whichever comes first. Every connected client then gets a
/// "going away" close frame.
pub struct PushServer {
    name: String,
    local_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    stop: CancellationToken,
    accept_task: Option<JoinHandle<()>>,
}

impl PushServer {
    /// Bind `addr` and start accepting clients
    #[instrument(name = "push_server_start", skip(shutdown))]
    pub async fn start(
        name: &str,
        addr: SocketAddr,
        shutdown: &ShutdownSignal,
    ) -> Result<Self, DispatcherError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| DispatcherError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let registry = Arc::new(ConnectionRegistry::new(name));
        let stop = shutdown.token().child_token();

        let accept_task = tokio::spawn(accept_loop(
            name.to_string(),
            listener,
            Arc::clone(&registry),
            stop.clone(),
        ));

        info!(server = name, %local_addr, "Push server listening");

        Ok(Self {
            name: name.to_string(),
            local_addr,
            registry,
            stop,
            accept_task: Some(accept_task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Stop accepting and close every client. Safe to call more than once.
    #[instrument(name = "push_server_stop", skip(self), fields(server = %self.name))]
    pub async fn stop(&mut self) {
        self.stop.cancel();

        if let Some(task) = self.accept_task.take() {
            if let Err(e) = task.await {
                error!(server = %self.name, error = ?e, "Accept task panicked");
            }
        }
    }
}

impl Drop for PushServer {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

async fn accept_loop(
    name: String,
    listener: TcpListener,
    registry: Arc<ConnectionRegistry>,
    stop: CancellationToken,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(server = %name, %peer, error = %e, "Failed to set TCP_NODELAY");
                    }
                    connections.spawn(handle_connection(
                        stream,
                        peer,
                        Arc::clone(&registry),
                        stop.clone(),
                    ));
                }
                Err(e) => {
                    warn!(server = %name, error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }

        // reap finished connection tasks
        while connections.try_join_next().is_some() {}
    }

    drop(listener);

    let drained = tokio::time::timeout(CLOSE_GRACE, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!(server = %name, remaining = connections.len(), "Clients did not close in time");
        connections.abort_all();
    }

    info!(server = %name, "Push server stopped");
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    stop: CancellationToken,
) {
    let ws_stream = tokio::select! {
        biased;
        _ = stop.cancelled() => return,
        handshake = accept_async(stream) => match handshake {
            Ok(ws) => ws,
            Err(e) => {
                debug!(%peer, error = %e, "WebSocket handshake failed");
                return;
            }
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = ConnectionRegistry::client_queue();
    let id = registry.on_connect(peer, tx.clone());
    info!(%peer, client = id, clients = registry.len(), "Client connected");

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if let Err(e) = ws_sender.send(message).await {
                debug!(client = id, error = %e, "WebSocket send failed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    read_loop(id, &mut ws_receiver, &tx, &stop).await;

    registry.on_disconnect(id);
    drop(tx);
    if let Err(e) = writer.await {
        error!(client = id, error = ?e, "Writer task panicked");
    }
    info!(%peer, client = id, "Client disconnected");
}

async fn read_loop<S>(
    id: ClientId,
    ws_receiver: &mut S,
    tx: &mpsc::Sender<Message>,
    stop: &CancellationToken,
) where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                // a stalled writer gets the drain grace period to take it
                let _ = tokio::time::timeout(CLOSE_GRACE, tx.send(going_away("server shutdown"))).await;
                return;
            }
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    debug!(client = id, %text, "Client message");
                    let _ = tx.try_send(Message::Text(format!("Server received: {text}")));
                }
                Some(Ok(Message::Close(_))) | None => return,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(client = id, error = %e, "WebSocket read failed");
                    return;
                }
            }
        }
    }
}
