//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → mux.rs (accept loop on the single bound socket)
//!     → one header byte read from the stream
//!     → routed to the logical listener registered for that byte
//!     → consumer (e.g., the metadata service) accepts the stream
//!
//! Unknown header byte → connection dropped
//! ```
//!
//! # Design Decisions
//! - One physical socket, many logical listeners keyed by header byte
//! - Registration happens before the accept loop starts (enforced by
//!   `serve` consuming the mux)
//! - Closing the socket ends every logical listener with end-of-stream

pub mod mux;

pub use mux::{Mux, MuxListener, RAFT_MUX_HEADER};
