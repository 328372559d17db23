//! Source adapters shipped with the cartographer.

pub mod static_source;

pub use static_source::StaticSource;
