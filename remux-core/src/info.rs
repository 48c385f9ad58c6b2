//! Extractor output data model.
//!
//! One extraction produces a [`MediaInfo`] record describing a media
//! resource and the encoded variants ([`MediaFormat`]) it is available in.
//! Records arrive as nested JSON with most fields optional; absent numeric
//! fields deserialize to `None` and are treated as zero where a value is
//! needed. The whole model is immutable for the duration of one manifest
//! synthesis call.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Protocol value of natively fetched HLS formats.
pub const HLS_PROTOCOL: &str = "m3u8_native";

/// Protocol value of plain direct-download formats.
pub const DIRECT_PROTOCOL: &str = "https";

/// Container suffix marking DASH-style fragmented formats.
pub const DASH_CONTAINER_SUFFIX: &str = "_dash";

/// Format id suffix of dialogue-range-compressed audio variants.
pub const DRC_SUFFIX: &str = "-drc";

/// Length of the codec tag used for prefix matching (e.g. `avc1`, `mp4a`).
pub const CODEC_TAG_LEN: usize = 4;

/// A codec declaration that may be absent.
///
/// Source records mark a missing track with the string `"none"`; this type
/// folds that sentinel (and empty or null values) into an explicit absent
/// state so codec prefix matching can never accidentally match it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Codec(Option<String>);

impl Codec {
    /// Create a codec declaration, folding `"none"` and empty into absent.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.is_empty() || raw == "none" {
            Codec(None)
        } else {
            Codec(Some(raw))
        }
    }

    /// The explicitly absent codec.
    pub fn absent() -> Self {
        Codec(None)
    }

    /// Full codec string, if present.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Whether no such track exists.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.0.is_none()
    }

    /// Short codec tag used for prefix matching.
    pub fn tag(&self) -> Option<String> {
        self.0
            .as_deref()
            .map(|s| s.chars().take(CODEC_TAG_LEN).collect())
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_deref().unwrap_or("none"))
    }
}

impl<'de> Deserialize<'de> for Codec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(Codec::new).unwrap_or_default())
    }
}

impl Serialize for Codec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.as_deref().unwrap_or("none"))
    }
}

/// A codec selection target derived from a [`Codec`].
///
/// `Absent` requires a format to carry no such track; `Prefix` requires the
/// format's codec string to start with the given tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecQuery {
    Absent,
    Prefix(String),
}

impl CodecQuery {
    /// Derive the query for a top-level codec declaration.
    pub fn from_codec(codec: &Codec) -> Self {
        match codec.tag() {
            Some(tag) => CodecQuery::Prefix(tag),
            None => CodecQuery::Absent,
        }
    }

    /// Query for a known codec tag.
    pub fn prefix(tag: impl Into<String>) -> Self {
        CodecQuery::Prefix(tag.into())
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, CodecQuery::Absent)
    }

    /// Whether a format codec satisfies this query.
    pub fn matches(&self, codec: &Codec) -> bool {
        match self {
            CodecQuery::Absent => codec.is_absent(),
            CodecQuery::Prefix(tag) => codec.as_str().is_some_and(|s| s.starts_with(tag.as_str())),
        }
    }
}

impl fmt::Display for CodecQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecQuery::Absent => write!(f, "none"),
            CodecQuery::Prefix(tag) => write!(f, "{tag}"),
        }
    }
}

/// A byte range within one media file, wire form `"start-end"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Parse the `"start-end"` wire form.
    pub fn parse(raw: &str) -> Option<Self> {
        let (start, end) = raw.split_once('-')?;
        Some(ByteRange {
            start: start.trim().parse().ok()?,
            end: end.trim().parse().ok()?,
        })
    }

    /// A range is usable only when it spans at least one byte forward.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl Serialize for ByteRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

fn lenient_range<'de, D>(deserializer: D) -> Result<Option<ByteRange>, D::Error>
where
    D: Deserializer<'de>,
{
    // Malformed ranges drop to absent; the owning format is skipped later
    // rather than failing the whole record.
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(ByteRange::parse))
}

/// Byte-range addressing data for segment-base delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingOptions {
    #[serde(deserialize_with = "lenient_range")]
    pub init_range: Option<ByteRange>,
    #[serde(deserialize_with = "lenient_range")]
    pub index_range: Option<ByteRange>,
}

impl StreamingOptions {
    /// Both ranges, when present and forward-spanning.
    pub fn indexed(&self) -> Option<(ByteRange, ByteRange)> {
        match (self.init_range, self.index_range) {
            (Some(init), Some(index)) if init.is_valid() && index.is_valid() => {
                Some((init, index))
            }
            _ => None,
        }
    }
}

/// One encoded variant of a media resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaFormat {
    /// Unique id within one format list.
    pub format_id: String,
    pub container: Option<String>,
    pub protocol: Option<String>,
    pub ext: Option<String>,
    pub vcodec: Codec,
    pub acodec: Codec,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    /// Total bitrate in kbps. Present only on playable variants.
    pub tbr: Option<f64>,
    pub audio_channels: Option<u32>,
    pub language: Option<String>,
    pub language_preference: Option<i32>,
    pub format_note: Option<String>,
    pub dynamic_range: Option<String>,
    pub url: Option<String>,
    pub streaming_options: Option<StreamingOptions>,
    /// Companion audio track reference for adaptive grouping.
    pub audio_id: Option<String>,
    /// Companion captions track reference for adaptive grouping.
    pub captions_id: Option<String>,
}

impl MediaFormat {
    pub fn width(&self) -> u32 {
        self.width.unwrap_or(0)
    }

    pub fn height(&self) -> u32 {
        self.height.unwrap_or(0)
    }

    pub fn fps(&self) -> f64 {
        self.fps.unwrap_or(0.0)
    }

    pub fn tbr(&self) -> f64 {
        self.tbr.unwrap_or(0.0)
    }

    pub fn audio_channels(&self) -> u32 {
        self.audio_channels.unwrap_or(0)
    }

    /// Whether this format is a playable variant (carries a bitrate) as
    /// opposed to an auxiliary audio/captions track.
    #[must_use]
    pub fn has_bandwidth(&self) -> bool {
        self.tbr.is_some()
    }

    /// Bitrate converted to bits per second.
    pub fn bandwidth_bps(&self) -> Option<u64> {
        self.tbr.map(|tbr| (tbr * 1000.0).round() as u64)
    }

    /// Whether the container marks DASH-style fragmentation.
    #[must_use]
    pub fn is_dash_fragmented(&self) -> bool {
        self.container
            .as_deref()
            .is_some_and(|c| c.ends_with(DASH_CONTAINER_SUFFIX))
    }

    /// Whether this is a dialogue-range-compressed audio variant.
    #[must_use]
    pub fn is_drc_variant(&self) -> bool {
        self.format_id.ends_with(DRC_SUFFIX)
    }

    /// Comma-joined present codec strings, video first.
    pub fn codecs_string(&self) -> Option<String> {
        match (self.vcodec.as_str(), self.acodec.as_str()) {
            (Some(v), Some(a)) => Some(format!("{v},{a}")),
            (Some(v), None) => Some(v.to_string()),
            (None, Some(a)) => Some(a.to_string()),
            (None, None) => None,
        }
    }

    /// Primary language subtag, e.g. `en-US` yields `en`.
    pub fn primary_language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .and_then(|lang| lang.split('-').next())
            .filter(|subtag| !subtag.is_empty())
    }

    /// Valid init/index byte ranges for segment-base delivery.
    pub fn indexed_ranges(&self) -> Option<(ByteRange, ByteRange)> {
        self.streaming_options.as_ref().and_then(StreamingOptions::indexed)
    }
}

/// One playlist entry of a multi-item info record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    #[serde(rename = "_type")]
    pub entry_type: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub duration: Option<f64>,
}

impl Entry {
    /// Whether the type tag denotes a URL reference.
    #[must_use]
    pub fn is_url_reference(&self) -> bool {
        matches!(self.entry_type.as_deref(), Some("url") | Some("url_transparent"))
    }
}

/// Preview image metadata, carried for downstream collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thumbnail {
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Chapter marker, carried for downstream collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chapter {
    pub title: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

/// One extracted media resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaInfo {
    /// Duration in seconds; zero or absent means live or unknown.
    pub duration: Option<f64>,
    /// Available formats. Absence (as opposed to emptiness) marks a record
    /// that never had a format inventory, e.g. a playlist listing.
    pub formats: Option<Vec<MediaFormat>>,
    /// Pre-selected formats, when the extractor already chose.
    pub requested_formats: Vec<MediaFormat>,
    pub requested_downloads: Vec<MediaFormat>,
    /// Combined protocol; two separately fetched sub-protocols join as `a+b`.
    pub protocol: Option<String>,
    pub container: Option<String>,
    pub ext: Option<String>,
    pub vcodec: Codec,
    pub acodec: Codec,
    pub url: Option<String>,
    pub title: Option<String>,
    /// Name of the extractor that produced this record.
    pub extractor: Option<String>,
    pub thumbnails: Vec<Thumbnail>,
    pub chapters: Vec<Chapter>,
    /// Sub-entries of a playlist-shaped record.
    pub entries: Vec<Entry>,
}

impl MediaInfo {
    /// Duration in whole seconds, zero when absent or non-positive.
    pub fn duration_secs(&self) -> u64 {
        let duration = self.duration.unwrap_or(0.0);
        if duration > 0.0 {
            duration as u64
        } else {
            0
        }
    }

    /// The pre-selected format subset, when present.
    pub fn requested(&self) -> &[MediaFormat] {
        if !self.requested_formats.is_empty() {
            &self.requested_formats
        } else {
            &self.requested_downloads
        }
    }

    /// Selection query for the top-level video codec.
    pub fn video_query(&self) -> CodecQuery {
        CodecQuery::from_codec(&self.vcodec)
    }

    /// Selection query for the top-level audio codec.
    pub fn audio_query(&self) -> CodecQuery {
        CodecQuery::from_codec(&self.acodec)
    }
}
