//! Shared vocabulary of the cartographer workspace.
//!
//! Everything the other crates agree on lives here: the data model
//! ([`network`], [`ranges`], [`clients`]), the configuration tree ([`config`]),
//! the ports implemented by adapters ([`sources`], [`storage`]) and the
//! immutable [`registry`] of known clients.

pub mod clients;
pub mod config;
pub mod log;
pub mod network;
pub mod ranges;
pub mod registry;
pub mod sources;
pub mod storage;
pub mod utils;

pub use tracing::{debug, error, info, warn};
