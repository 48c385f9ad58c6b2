//! Playback manifest synthesis.
//!
//! This crate turns one extracted [`MediaInfo`] record into a manifest a
//! media pipeline can play directly:
//!
//! - an MPEG-DASH MPD for byte-range-indexed on-demand formats
//! - an HLS master playlist for natively fetched HLS formats
//! - a bare direct URI when no adaptive strategy applies
//! - a playlist document for multi-item records
//!
//! [`ManifestSelector`] tries the strategies in a configurable priority
//! order and returns the first manifest produced.
//!
//! # Example
//!
//! ```no_run
//! use remux_manifest::{CancelFlag, ManifestSelector, MediaInfo, Outcome};
//!
//! let info: MediaInfo = serde_json::from_str("{}")?;
//! let selector = ManifestSelector::new();
//!
//! match selector.synthesize(&info, &CancelFlag::new())? {
//!     Outcome::Manifest(doc) => println!("{}: {}", doc.media_type, doc.body),
//!     Outcome::Cancelled => {}
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod dash;
mod direct;
mod hls;
mod playlist;
mod select;

pub use dash::DashManifestBuilder;
pub use direct::DirectUriResolver;
pub use hls::HlsManifestBuilder;
pub use playlist::{PlaylistDocument, PlaylistDocumentBuilder, PlaylistItem};
pub use select::{
    ManifestDocument, ManifestSelector, MediaType, Outcome, SelectorPolicy, Strategy,
};

pub use remux_core::expiry;
pub use remux_core::{CancelFlag, Error, FormatCatalog, MediaFormat, MediaInfo, Result};

/// Render a frame rate without a trailing fractional part when whole.
pub(crate) fn compact_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as u64)
    } else {
        format!("{value}")
    }
}
