//! # Validator Ranges
//!
//! Turns host inventory documents into per-network validator ownership
//! maps. [`parser`] reads one document, [`aggregator`] merges documents in
//! priority order, [`fetcher`] retrieves them over HTTP and [`service`]
//! runs the whole pipeline for every known network.

pub mod aggregator;
pub mod fetcher;
pub mod parser;
pub mod service;

pub use aggregator::aggregate;
pub use fetcher::{DocumentFetcher, HttpFetcher, RangeFetchError};
pub use parser::{ParseError, RangeParser};
pub use service::RangeService;
