//! Engine of the cartographer.
//!
//! * [`discovery`]: scheduled fan-out over source adapters and the result handlers.
//! * [`ranges`]: validator-range parsing, aggregation and publication.
//! * [`liveness`]: bounded DNS and HTTPS checks of client endpoints.
//! * [`inventory`]: client inventory generation gated by [`liveness`].
//! * [`storage`]: object store backends and the retry wrapper.

pub mod discovery;
pub mod inventory;
pub mod liveness;
pub mod ranges;
pub mod storage;
