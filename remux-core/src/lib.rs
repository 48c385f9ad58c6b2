//! # Remux Core
//!
//! Core types and utilities for the Remux manifest engine.
//!
//! This crate provides the building blocks shared by all Remux components:
//! - Error handling types
//! - The extractor output data model (`MediaInfo`, `MediaFormat`)
//! - Format filter rules and the queryable format catalog
//! - Cooperative cancellation
//! - Extractor freshness lookup

pub mod cancel;
pub mod catalog;
pub mod error;
pub mod expiry;
pub mod filter;
pub mod info;

pub use cancel::CancelFlag;
pub use catalog::FormatCatalog;
pub use error::{Error, Result};
pub use filter::{Rule, RuleSet};
pub use info::{
    ByteRange, Chapter, Codec, CodecQuery, Entry, MediaFormat, MediaInfo, StreamingOptions,
    Thumbnail,
};
