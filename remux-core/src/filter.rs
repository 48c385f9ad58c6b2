//! Format filter rules.
//!
//! Each [`Rule`] is one named, independently testable predicate over a
//! [`MediaFormat`]; a [`RuleSet`] is their conjunction. A format failing a
//! rule is dropped silently and processing continues, so a single defective
//! format never aborts manifest synthesis.

use crate::info::{CodecQuery, MediaFormat};

/// Video tracks below this height are considered ultralow and excluded.
pub const MIN_VIDEO_HEIGHT: u32 = 240;

/// Format note marking ultralow audio variants.
pub const ULTRALOW_NOTE: &str = "ultralow";

/// One format acceptance predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// The format carries a URL.
    HasUrl,
    /// The container marks DASH-style fragmentation.
    DashContainer,
    /// The protocol equals the given value exactly.
    ProtocolEquals(&'static str),
    /// Both codec declarations satisfy their selection queries.
    CodecMatch { video: CodecQuery, audio: CodecQuery },
    /// The extension is present and usable.
    UsableExt,
    /// Dialogue-range-compressed variants are excluded.
    NoDrcVariant,
    /// The bitrate is present and positive.
    PositiveBitrate,
    /// Valid init/index byte ranges for segment-base delivery.
    SegmentedRanges,
    /// Video height at or above the given floor.
    MinVideoHeight(u32),
    /// Ultralow audio variants are excluded.
    NoUltralowAudio,
    /// The format language equals the given language.
    LanguageEquals(String),
}

impl Rule {
    /// Whether the format passes this rule.
    pub fn keep(&self, fmt: &MediaFormat) -> bool {
        match self {
            Rule::HasUrl => fmt.url.is_some(),
            Rule::DashContainer => fmt.is_dash_fragmented(),
            Rule::ProtocolEquals(protocol) => fmt.protocol.as_deref() == Some(protocol),
            Rule::CodecMatch { video, audio } => {
                video.matches(&fmt.vcodec) && audio.matches(&fmt.acodec)
            }
            Rule::UsableExt => fmt.ext.as_deref().is_some_and(|ext| ext != "none"),
            Rule::NoDrcVariant => !fmt.is_drc_variant(),
            Rule::PositiveBitrate => fmt.tbr() > 0.0,
            Rule::SegmentedRanges => fmt.indexed_ranges().is_some(),
            Rule::MinVideoHeight(floor) => fmt.height() >= *floor,
            Rule::NoUltralowAudio => fmt.format_note.as_deref() != Some(ULTRALOW_NOTE),
            Rule::LanguageEquals(lang) => fmt.language.as_deref() == Some(lang.as_str()),
        }
    }

    /// Stable rule name for drop diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Rule::HasUrl => "has_url",
            Rule::DashContainer => "dash_container",
            Rule::ProtocolEquals(_) => "protocol",
            Rule::CodecMatch { .. } => "codec_match",
            Rule::UsableExt => "usable_ext",
            Rule::NoDrcVariant => "no_drc_variant",
            Rule::PositiveBitrate => "positive_bitrate",
            Rule::SegmentedRanges => "segmented_ranges",
            Rule::MinVideoHeight(_) => "min_video_height",
            Rule::NoUltralowAudio => "no_ultralow_audio",
            Rule::LanguageEquals(_) => "language",
        }
    }
}

/// An ordered conjunction of rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule.
    pub fn with(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Whether the format passes every rule.
    pub fn keep(&self, fmt: &MediaFormat) -> bool {
        self.rules.iter().all(|rule| rule.keep(fmt))
    }

    /// Name of the first rule rejecting the format, if any.
    pub fn reject_reason(&self, fmt: &MediaFormat) -> Option<&'static str> {
        self.rules.iter().find(|rule| !rule.keep(fmt)).map(Rule::name)
    }
}
