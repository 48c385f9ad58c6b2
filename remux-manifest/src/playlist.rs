//! Playlist document synthesis for multi-item records.

use serde::{Deserialize, Serialize};
use tracing::debug;

use remux_core::{MediaInfo, Result};

/// One playable item of a playlist document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// The playlist document body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistDocument {
    pub entries: Vec<PlaylistItem>,
}

/// Materializes a multi-item record into an ordered item list.
pub struct PlaylistDocumentBuilder<'a> {
    info: &'a MediaInfo,
    limit: usize,
}

impl<'a> PlaylistDocumentBuilder<'a> {
    pub fn new(info: &'a MediaInfo, limit: usize) -> Self {
        Self { info, limit }
    }

    /// Build the JSON document, or `None` when no entry is usable.
    pub fn build(&self) -> Result<Option<String>> {
        let entries: Vec<PlaylistItem> = self
            .info
            .entries
            .iter()
            .filter(|entry| entry.is_url_reference())
            .filter_map(|entry| {
                entry.url.as_ref().map(|url| PlaylistItem {
                    url: url.clone(),
                    title: entry.title.clone(),
                    duration: entry.duration,
                })
            })
            .take(self.limit)
            .collect();

        if entries.is_empty() {
            return Ok(None);
        }

        debug!(count = entries.len(), "built playlist document");
        let doc = PlaylistDocument { entries };
        Ok(Some(serde_json::to_string(&doc)?))
    }
}
