//! Strategy selection and orchestration.

use std::fmt;

use tracing::debug;

use remux_core::{CancelFlag, Error, FormatCatalog, MediaInfo, Result};

use crate::dash::DashManifestBuilder;
use crate::direct::DirectUriResolver;
use crate::hls::HlsManifestBuilder;
use crate::playlist::PlaylistDocumentBuilder;

/// One manifest synthesis strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Hls,
    Dash,
    Direct,
    Playlist,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Hls => write!(f, "hls"),
            Strategy::Dash => write!(f, "dash"),
            Strategy::Direct => write!(f, "direct"),
            Strategy::Playlist => write!(f, "playlist"),
        }
    }
}

/// Media type reported alongside a synthesized manifest body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Dash,
    Hls,
    Uri,
    Playlist,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Dash => "application/dash+xml",
            MediaType::Hls => "application/x-hls",
            MediaType::Uri => "text/x-uri",
            MediaType::Playlist => "application/clapper-playlist",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selection policy: which strategies to try, in which order, and how many
/// playlist items to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPolicy {
    pub order: Vec<Strategy>,
    pub playlist_limit: usize,
}

impl Default for SelectorPolicy {
    fn default() -> Self {
        Self {
            order: vec![
                Strategy::Hls,
                Strategy::Dash,
                Strategy::Direct,
                Strategy::Playlist,
            ],
            playlist_limit: 50,
        }
    }
}

impl SelectorPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the strategy order.
    pub fn with_order(mut self, order: Vec<Strategy>) -> Self {
        self.order = order;
        self
    }

    /// Set the playlist item cap.
    pub fn with_playlist_limit(mut self, limit: usize) -> Self {
        self.playlist_limit = limit;
        self
    }
}

/// A synthesized manifest and its reported media type.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    pub media_type: MediaType,
    pub body: String,
}

/// Result of one synthesis call. Cancellation is a first-class outcome,
/// distinct from both a manifest and an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Manifest(ManifestDocument),
    Cancelled,
}

impl Outcome {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// The manifest, when one was built.
    pub fn into_manifest(self) -> Option<ManifestDocument> {
        match self {
            Outcome::Manifest(doc) => Some(doc),
            Outcome::Cancelled => None,
        }
    }
}

/// Tries the synthesis strategies in policy order and returns the first
/// manifest produced.
///
/// The selector is a pure transformation over one immutable [`MediaInfo`]
/// snapshot; it holds no cross-call state and may be shared freely between
/// concurrent extractions.
#[derive(Debug, Clone, Default)]
pub struct ManifestSelector {
    policy: SelectorPolicy,
}

impl ManifestSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: SelectorPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SelectorPolicy {
        &self.policy
    }

    /// Synthesize a manifest for one extraction.
    ///
    /// The cancellation flag is observed twice: before strategy selection
    /// begins and immediately before a built manifest is returned. Failure
    /// of individual strategies is not an error; only total exhaustion is.
    pub fn synthesize(&self, info: &MediaInfo, cancel: &CancelFlag) -> Result<Outcome> {
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        let catalog = FormatCatalog::new(info)?;

        for strategy in &self.policy.order {
            debug!(%strategy, "trying strategy");
            let built = match strategy {
                Strategy::Hls => HlsManifestBuilder::new(info, &catalog)
                    .build()
                    .map(|body| ManifestDocument {
                        media_type: MediaType::Hls,
                        body,
                    }),
                Strategy::Dash => DashManifestBuilder::new(info, &catalog)
                    .build()?
                    .map(|body| ManifestDocument {
                        media_type: MediaType::Dash,
                        body,
                    }),
                Strategy::Direct => DirectUriResolver::new(info, &catalog)
                    .resolve()
                    .map(|body| ManifestDocument {
                        media_type: MediaType::Uri,
                        body,
                    }),
                Strategy::Playlist => {
                    PlaylistDocumentBuilder::new(info, self.policy.playlist_limit)
                        .build()?
                        .map(|body| ManifestDocument {
                            media_type: MediaType::Playlist,
                            body,
                        })
                }
            };

            if let Some(doc) = built {
                if cancel.is_cancelled() {
                    return Ok(Outcome::Cancelled);
                }
                debug!(media_type = %doc.media_type, bytes = doc.body.len(), "manifest built");
                return Ok(Outcome::Manifest(doc));
            }
        }

        Err(Error::Exhausted)
    }
}
