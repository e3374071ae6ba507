//! Shared mock collaborators for integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metad::net::MuxListener;
use metad::{MetaClient, MetaError, MetaService};
use tokio::sync::mpsc;

/// Install a tracing subscriber for test debugging. Safe to call from
/// every test; only the first call installs one.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metad=debug".into()),
        )
        .try_init();
}

/// Observable state of a [`MockMetaService`].
#[derive(Debug, Default)]
pub struct ServiceState {
    pub opened: bool,
    pub closed: bool,
    pub listener_header: Option<u8>,
}

/// Test-side handle to drive a [`MockMetaService`] after the server owns it.
pub struct ServiceHandle {
    pub errors: mpsc::UnboundedSender<MetaError>,
    pub state: Arc<Mutex<ServiceState>>,
}

/// Metadata service stand-in: records lifecycle calls and emits errors the
/// test injects through its handle.
pub struct MockMetaService {
    fail_open: bool,
    fail_close: bool,
    errors_rx: Option<mpsc::UnboundedReceiver<MetaError>>,
    state: Arc<Mutex<ServiceState>>,
    listener: Option<MuxListener>,
}

impl MockMetaService {
    pub fn new() -> (Self, ServiceHandle) {
        let (errors, errors_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(ServiceState::default()));
        let service = Self {
            fail_open: false,
            fail_close: false,
            errors_rx: Some(errors_rx),
            state: Arc::clone(&state),
            listener: None,
        };
        (service, ServiceHandle { errors, state })
    }

    #[allow(dead_code)]
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    #[allow(dead_code)]
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

#[async_trait]
impl MetaService for MockMetaService {
    async fn open(&mut self, raft_listener: MuxListener) -> Result<(), MetaError> {
        let mut state = self.state.lock().unwrap();
        state.listener_header = Some(raft_listener.header());
        if self.fail_open {
            return Err("mock service open failed".into());
        }
        state.opened = true;
        drop(state);
        self.listener = Some(raft_listener);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), MetaError> {
        self.state.lock().unwrap().closed = true;
        self.listener = None;
        if self.fail_close {
            return Err("mock service close failed".into());
        }
        Ok(())
    }

    fn take_error_stream(&mut self) -> Option<mpsc::UnboundedReceiver<MetaError>> {
        self.errors_rx.take()
    }
}

/// Observable state of a [`MockMetaClient`].
#[derive(Debug, Default)]
pub struct ClientState {
    pub meta_servers: Vec<String>,
    pub tls: Option<bool>,
    pub transport_replaced: bool,
    pub opened: bool,
    pub closed: bool,
}

/// Metadata client stand-in. Synchronizes immediately unless configured to
/// never sync.
pub struct MockMetaClient {
    has_transport: bool,
    fail_open: bool,
    fail_close: bool,
    never_syncs: bool,
    state: Arc<Mutex<ClientState>>,
}

impl MockMetaClient {
    pub fn new() -> (Self, Arc<Mutex<ClientState>>) {
        let state = Arc::new(Mutex::new(ClientState::default()));
        let client = Self {
            has_transport: false,
            fail_open: false,
            fail_close: false,
            never_syncs: false,
            state: Arc::clone(&state),
        };
        (client, state)
    }

    #[allow(dead_code)]
    pub fn with_transport(mut self) -> Self {
        self.has_transport = true;
        self
    }

    #[allow(dead_code)]
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    #[allow(dead_code)]
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    #[allow(dead_code)]
    pub fn never_syncing(mut self) -> Self {
        self.never_syncs = true;
        self
    }
}

#[async_trait]
impl MetaClient for MockMetaClient {
    fn set_meta_servers(&mut self, servers: Vec<String>) {
        self.state.lock().unwrap().meta_servers = servers;
    }

    fn set_tls(&mut self, enabled: bool) {
        self.state.lock().unwrap().tls = Some(enabled);
    }

    fn has_transport(&self) -> bool {
        self.has_transport
    }

    fn set_default_transport(&mut self) {
        self.state.lock().unwrap().transport_replaced = true;
    }

    async fn open(&mut self) -> Result<(), MetaError> {
        if self.fail_open {
            return Err("mock client open failed".into());
        }
        self.state.lock().unwrap().opened = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), MetaError> {
        self.state.lock().unwrap().closed = true;
        if self.fail_close {
            return Err("mock client close failed".into());
        }
        Ok(())
    }

    async fn wait_for_data_changed(&mut self) -> Result<(), MetaError> {
        if self.never_syncs {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}
