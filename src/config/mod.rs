//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MetaConfig (validated, immutable)
//!     → shared via Arc with the Server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the Server holds it by Arc
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{MetaConfig, ProfileConfig};
