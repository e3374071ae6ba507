//! Collaborator contracts for the metadata service and client.
//!
//! # Design Decisions
//! - The consensus-backed store and its client are external collaborators;
//!   this crate orchestrates their lifecycle but owns none of their
//!   internals
//! - Contracts are async traits so embedders can plug in real
//!   implementations and tests can plug in mocks
//! - Collaborator errors are opaque boxed errors; the server forwards
//!   them, it never interprets them

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::net::MuxListener;

/// Opaque error surfaced by a collaborator.
pub type MetaError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The consensus-backed metadata store.
///
/// Consumes a demuxed listener carrying its consensus traffic and emits
/// out-of-band errors on a channel the server fans in.
#[async_trait]
pub trait MetaService: Send + 'static {
    /// Open the service against its demuxed consensus listener.
    async fn open(&mut self, raft_listener: MuxListener) -> Result<(), MetaError>;

    /// Shut the service down.
    async fn close(&mut self) -> Result<(), MetaError>;

    /// Take the out-of-band error stream. Yields `None` after the first
    /// call; the server takes it exactly once during open.
    fn take_error_stream(&mut self) -> Option<mpsc::UnboundedReceiver<MetaError>>;
}

/// A client synchronizing a local view of cluster metadata from the
/// metadata service.
#[async_trait]
pub trait MetaClient: Send + 'static {
    /// Set the list of metadata servers the client targets.
    fn set_meta_servers(&mut self, servers: Vec<String>);

    /// Set whether the client uses TLS.
    fn set_tls(&mut self, enabled: bool);

    /// Whether a transport has been configured on the client.
    fn has_transport(&self) -> bool;

    /// Replace the client's transport with a default one.
    fn set_default_transport(&mut self);

    /// Open the client.
    async fn open(&mut self) -> Result<(), MetaError>;

    /// Close the client.
    async fn close(&mut self) -> Result<(), MetaError>;

    /// Block until the client's view of cluster metadata is synchronized.
    ///
    /// Returns on success or on the client's own internal failure. Callers
    /// needing a bound wrap this in a timeout.
    async fn wait_for_data_changed(&mut self) -> Result<(), MetaError>;
}
