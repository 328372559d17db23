//! Codecs for the documents the cartographer reads from upstream systems.
//!
//! * [`inventory`]: the sectioned `key=value` host inventory text format.
//! * [`dora`]: JSON payloads of the client-listing API.

pub mod dora;
pub mod inventory;
