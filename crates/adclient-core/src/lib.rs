//! adclient core library
//!
//! Leaf types for the adclient directory client: the error taxonomy,
//! connection parameters, the attribute codec, account-control flags and
//! DN/value utilities. Nothing in here talks to the network.

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::{ConnParams, LoginMethod, TransportSecurity};
pub use error::{AdError, ErrorKind, Result};

/// adclient version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default page size for the simple paged results control
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Attribute selector that returns no attributes, only DNs
pub const NO_ATTRIBUTES: &str = "1.1";

/// Attribute selector for all user attributes
pub const ALL_ATTRIBUTES: &str = "*";
