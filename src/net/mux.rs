//! TCP listener multiplexer.
//!
//! # Responsibilities
//! - Accept connections on one bound socket
//! - Read a single header byte per connection
//! - Hand each stream to the logical listener registered for its byte
//! - Graceful handling of accept errors and shutdown

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};

/// Header byte reserved for consensus traffic of the metadata service.
pub const RAFT_MUX_HEADER: u8 = 8;

/// How long a connection may take to send its header byte before it is
/// dropped.
const HEADER_TIMEOUT: Duration = Duration::from_secs(30);

/// Queue depth per logical listener. Accepted streams wait here until the
/// consumer calls `accept`.
const LISTENER_BACKLOG: usize = 32;

/// Demultiplexes a single bound socket into logical listeners keyed by a
/// header byte.
///
/// Consumers register with [`Mux::listen`] before the accept loop starts;
/// [`Mux::serve`] then owns the socket for its lifetime. When the loop
/// exits, the registry is dropped and every logical listener observes
/// end-of-stream.
pub struct Mux {
    registry: HashMap<u8, mpsc::Sender<TcpStream>>,
}

impl Mux {
    /// Create an empty multiplexer.
    pub fn new() -> Self {
        Self {
            registry: HashMap::new(),
        }
    }

    /// Register a logical listener for a header byte.
    ///
    /// Registering the same byte twice replaces the earlier listener; its
    /// consumer observes end-of-stream.
    pub fn listen(&mut self, header: u8) -> MuxListener {
        let (tx, rx) = mpsc::channel(LISTENER_BACKLOG);
        self.registry.insert(header, tx);
        MuxListener { header, rx }
    }

    /// Run the accept loop until `shutdown` fires or the socket fails.
    ///
    /// Consumes the mux: no registration is possible once serving starts.
    /// The header byte of each connection is read in a spawned task so a
    /// slow client cannot stall the accept loop.
    pub async fn serve(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) {
        let registry = Arc::new(self.registry);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::debug!("mux accept loop stopping");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            tracing::trace!(peer_addr = %peer, "connection accepted");
                            tokio::spawn(route(stream, Arc::clone(&registry)));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed, mux stopping");
                            break;
                        }
                    }
                }
            }
        }
        // Dropping `listener` closes the socket; dropping `registry` closes
        // every logical listener.
    }
}

impl Default for Mux {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the header byte and hand the stream to its registered listener.
async fn route(mut stream: TcpStream, registry: Arc<HashMap<u8, mpsc::Sender<TcpStream>>>) {
    let mut header = [0u8; 1];
    let read = tokio::time::timeout(HEADER_TIMEOUT, stream.read_exact(&mut header)).await;
    match read {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "dropping connection: header read failed");
            return;
        }
        Err(_) => {
            tracing::debug!("dropping connection: header read timed out");
            return;
        }
    }

    match registry.get(&header[0]) {
        Some(tx) => {
            // Consumer gone means its channel was replaced or it shut down.
            if tx.send(stream).await.is_err() {
                tracing::debug!(header = header[0], "dropping connection: listener closed");
            }
        }
        None => {
            tracing::debug!(header = header[0], "dropping connection: unregistered header");
        }
    }
}

/// A logical listener for one header byte, produced by [`Mux::listen`].
pub struct MuxListener {
    header: u8,
    rx: mpsc::Receiver<TcpStream>,
}

impl MuxListener {
    /// Accept the next demuxed stream.
    ///
    /// Returns `None` once the underlying socket has closed.
    pub async fn accept(&mut self) -> Option<TcpStream> {
        self.rx.recv().await
    }

    /// The header byte this listener is registered for.
    pub fn header(&self) -> u8 {
        self.header
    }
}
