//! Lifecycle orchestrator for a metadata cluster node.
//!
//! One bound socket is fanned out to the logical services of the node: the
//! consensus-backed metadata service takes its demuxed listener, the
//! metadata client is driven to readiness against it, and every
//! collaborator's out-of-band errors are aggregated onto a single stream.
//! The embedder constructs a [`Server`], opens it, reads its error stream,
//! and closes it; everything else is orchestration detail.

pub mod config;
pub mod meta;
pub mod net;
pub mod node;
pub mod profile;
pub mod server;

pub use config::{load_config, MetaConfig, ProfileConfig};
pub use meta::{MetaClient, MetaError, MetaService};
pub use net::{Mux, MuxListener, RAFT_MUX_HEADER};
pub use node::NodeDescriptor;
pub use profile::Profiler;
pub use server::{BuildInfo, Server, ServerError, ServerState};
