//! Server lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! open():
//!     start profiler → bind socket → register mux listeners → start
//!     accept loop → open meta service → spawn error forwarder →
//!     configure + open meta client → wait for metadata sync
//!
//! close():
//!     stop profiler → stop accept loop (socket closed) → close client
//!     → close service → broadcast closing signal
//!
//! States:
//!     Closed → Opening → Open → Closing → Closed
//! ```
//!
//! # Design Decisions
//! - Ordered startup: the service's demuxed listener is registered before
//!   the accept loop delivers, and the client is opened only after the
//!   service
//! - Close is best-effort: every step runs, the first error is reported
//! - No rollback inside open(); a failed open leaves a state close() can
//!   tear down
//! - Open/close take `&mut self`; concurrent lifecycle calls are ruled
//!   out by the borrow checker

pub mod build_info;
pub mod forwarder;
pub mod shutdown;

pub use build_info::BuildInfo;
pub use shutdown::Shutdown;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::MetaConfig;
use crate::meta::{MetaClient, MetaError, MetaService};
use crate::net::{Mux, RAFT_MUX_HEADER};
use crate::node::{self, NodeError, Reconciliation};
use crate::profile::{ProfileError, Profiler};
use forwarder::forward_errors;

/// Error type for server lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("creating data directory {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("node descriptor: {0}")]
    Node(#[from] NodeError),

    #[error("profiler: {0}")]
    Profile(#[from] ProfileError),

    #[error("binding {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("opening meta service: {0}")]
    ServiceOpen(#[source] MetaError),

    #[error("closing meta service: {0}")]
    ServiceClose(#[source] MetaError),

    #[error("opening meta client: {0}")]
    ClientOpen(#[source] MetaError),

    #[error("closing meta client: {0}")]
    ClientClose(#[source] MetaError),

    #[error("waiting for cluster metadata sync: {0}")]
    Readiness(#[source] MetaError),

    #[error("cluster metadata sync timed out after {0:?}")]
    ReadinessTimeout(Duration),

    #[error("server is already open")]
    AlreadyOpen,
}

/// Lifecycle states of the server. `Opening` and `Closing` are transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// Container for the metadata services of one cluster node.
///
/// Owns the single bound socket, fans it out to the metadata service via
/// the [`Mux`], drives the metadata client to readiness, and aggregates
/// every collaborator's out-of-band errors onto one stream.
///
/// The lifecycle is single-owner: `open` and `close` take `&mut self` and
/// must not be interleaved. `close` is idempotent; `open` is not.
pub struct Server<S, C> {
    build_info: BuildInfo,
    state: ServerState,

    config: Arc<MetaConfig>,

    err_tx: mpsc::UnboundedSender<MetaError>,
    err_rx: Option<mpsc::UnboundedReceiver<MetaError>>,
    closing: Shutdown,

    accept_shutdown: Shutdown,
    mux_task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,

    service: Option<S>,
    client: C,

    profiler: Profiler,
}

impl<S, C> Server<S, C>
where
    S: MetaService,
    C: MetaClient,
{
    /// Build a server from a config and its collaborators.
    ///
    /// Ensures the data directory exists (`node.json` always lives there,
    /// even if the meta store never starts) and reconciles any persisted
    /// node descriptor with the configured path. Never binds the socket;
    /// that happens in [`open`](Self::open).
    pub fn new(
        config: MetaConfig,
        build_info: BuildInfo,
        service: Option<S>,
        client: C,
    ) -> Result<Self, ServerError> {
        std::fs::create_dir_all(&config.dir).map_err(|source| ServerError::Io {
            path: config.dir.clone(),
            source,
        })?;

        match node::reconcile(&config.dir, &config.dir)? {
            Reconciliation::Absent | Reconciliation::Current => {}
            Reconciliation::Repaired => {
                tracing::warn!(dir = %config.dir.display(), "stale node descriptor re-saved");
            }
        }

        let (err_tx, err_rx) = mpsc::unbounded_channel();

        Ok(Self {
            build_info,
            state: ServerState::Closed,
            config: Arc::new(config),
            err_tx,
            err_rx: Some(err_rx),
            closing: Shutdown::new(),
            accept_shutdown: Shutdown::new(),
            mux_task: None,
            local_addr: None,
            service,
            client,
            profiler: Profiler::new(),
        })
    }

    /// Open the meta services.
    ///
    /// Not idempotent: opening an already-open (or half-open) server
    /// returns [`ServerError::AlreadyOpen`]. On any failure the already
    /// acquired resources are left for [`close`](Self::close) to release;
    /// no rollback happens here.
    pub async fn open(&mut self) -> Result<(), ServerError> {
        if self.state != ServerState::Closed {
            return Err(ServerError::AlreadyOpen);
        }
        self.state = ServerState::Opening;

        tracing::info!(build = %self.build_info, "opening server for meta service");

        // Fresh signals for this lifecycle; each may fire at most once.
        self.closing = Shutdown::new();
        self.accept_shutdown = Shutdown::new();

        self.profiler.start(&self.config.profile)?;

        // Shared TCP socket all logical services multiplex over.
        let listener = TcpListener::bind(&self.config.bind_address)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.config.bind_address.clone(),
                source,
            })?;
        self.local_addr = listener.local_addr().ok();
        tracing::info!(
            address = %self.config.bind_address,
            "cluster listener bound"
        );

        // Register demuxed listeners before the accept loop starts so no
        // tagged connection arrives unrouted.
        let mut mux = Mux::new();
        let mut raft_listener = None;
        if self.service.is_some() {
            raft_listener = Some(mux.listen(RAFT_MUX_HEADER));
        }
        self.mux_task = Some(tokio::spawn(
            mux.serve(listener, self.accept_shutdown.subscribe()),
        ));

        if let (Some(service), Some(raft_listener)) = (self.service.as_mut(), raft_listener) {
            service
                .open(raft_listener)
                .await
                .map_err(ServerError::ServiceOpen)?;

            if let Some(errors) = service.take_error_stream() {
                tokio::spawn(forward_errors(
                    errors,
                    self.err_tx.clone(),
                    self.closing.subscribe(),
                ));
            }
        }

        self.initialize_meta_client();
        self.client.open().await.map_err(ServerError::ClientOpen)?;
        self.wait_for_metadata_sync().await?;

        self.state = ServerState::Open;
        Ok(())
    }

    fn initialize_meta_client(&mut self) {
        let meta_servers = vec![self.config.remote_hostname.clone()];
        self.client.set_meta_servers(meta_servers);
        self.client.set_tls(self.config.https_enabled);
        // Only an already-configured transport is replaced with the
        // default; a caller that injected none keeps whatever the client
        // installs on open.
        if self.client.has_transport() {
            self.client.set_default_transport();
        }
    }

    /// Block until the client reports its view of cluster metadata
    /// synchronized, bounded by `readiness_timeout_secs` when configured.
    async fn wait_for_metadata_sync(&mut self) -> Result<(), ServerError> {
        match self.config.readiness_timeout() {
            Some(limit) => {
                match tokio::time::timeout(limit, self.client.wait_for_data_changed()).await {
                    Ok(res) => res.map_err(ServerError::Readiness),
                    Err(_) => Err(ServerError::ReadinessTimeout(limit)),
                }
            }
            None => self
                .client
                .wait_for_data_changed()
                .await
                .map_err(ServerError::Readiness),
        }
    }

    /// Shut down the meta services.
    ///
    /// Idempotent: a second call is a no-op success. Every step is
    /// attempted even when an earlier one fails; the first error is the
    /// one returned. Order: profiler → listener → client → service →
    /// closing signal.
    pub async fn close(&mut self) -> Result<(), ServerError> {
        if self.state == ServerState::Closed {
            return Ok(());
        }
        self.state = ServerState::Closing;

        let mut first_err: Option<ServerError> = None;

        if let Err(e) = self.profiler.stop().await {
            tracing::warn!(error = %e, "profiler stop failed");
            first_err.get_or_insert(e.into());
        }

        // Stop accepting new connections. Awaiting the mux task guarantees
        // the socket is closed before collaborators are torn down.
        self.accept_shutdown.trigger();
        if let Some(task) = self.mux_task.take() {
            let _ = task.await;
        }
        self.local_addr = None;

        if let Err(e) = self.client.close().await {
            tracing::warn!(error = %e, "meta client close failed");
            first_err.get_or_insert(ServerError::ClientClose(e));
        }

        if let Some(service) = self.service.as_mut() {
            if let Err(e) = service.close().await {
                tracing::warn!(error = %e, "meta service close failed");
                first_err.get_or_insert(ServerError::ServiceClose(e));
            }
        }

        // Release every forwarder still waiting on its source.
        self.closing.trigger();

        self.state = ServerState::Closed;
        tracing::info!("server closed");

        first_err.map_or(Ok(()), Err)
    }

    /// Take the stream multiplexing all out-of-band errors from the owned
    /// services. Yields `Some` exactly once; the external reader owns it
    /// from then on and is responsible for draining or dropping it.
    pub fn take_error_stream(&mut self) -> Option<mpsc::UnboundedReceiver<MetaError>> {
        self.err_rx.take()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Address the cluster listener is bound to, while open.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// The HTTP API address peers should use for this node.
    pub fn http_addr(&self) -> &str {
        &self.config.http_bind_address
    }

    /// Build details this server was compiled with.
    pub fn build_info(&self) -> &BuildInfo {
        &self.build_info
    }
}
