//! HLS master playlist synthesis for natively fetched HLS formats.

use std::collections::HashMap;

use tracing::debug;

use remux_core::filter::{Rule, RuleSet, MIN_VIDEO_HEIGHT};
use remux_core::info::{CodecQuery, MediaFormat, MediaInfo, HLS_PROTOCOL};
use remux_core::FormatCatalog;

use crate::compact_float;

/// Builds an HLS master playlist from one extraction.
pub struct HlsManifestBuilder<'a> {
    info: &'a MediaInfo,
    catalog: &'a FormatCatalog<'a>,
}

impl<'a> HlsManifestBuilder<'a> {
    pub fn new(info: &'a MediaInfo, catalog: &'a FormatCatalog<'a>) -> Self {
        Self { info, catalog }
    }

    /// Build the playlist, or `None` when no attempt yields any stream.
    pub fn build(&self) -> Option<String> {
        let protocol = self.info.protocol.as_deref()?;
        if !protocol.starts_with(HLS_PROTOCOL) {
            return None;
        }
        // Two sub-protocols joined with `+` mean video and audio are
        // fetched as separate streams.
        let separate = protocol.contains('+');

        let video = self.info.video_query();
        let audio = self.info.audio_query();
        if video == audio {
            return None;
        }
        if separate && (video.is_absent() || audio.is_absent()) {
            return None;
        }

        if !video.is_absent() && !audio.is_absent() {
            if let Some(doc) = self.attempt(&video, &audio, true) {
                debug!("built with separate audio and video streams");
                return Some(doc);
            }
        }
        if let Some(doc) = self.attempt(&video, &audio, false) {
            debug!("built with combined streams");
            return Some(doc);
        }
        if !video.is_absent() && !audio.is_absent() {
            if let Some(doc) = self.attempt(&CodecQuery::Absent, &audio, false) {
                debug!("built audio-only");
                return Some(doc);
            }
        }
        None
    }

    fn attempt(&self, video: &CodecQuery, audio: &CodecQuery, separate: bool) -> Option<String> {
        let mut lines = vec![
            "#EXTM3U".to_string(),
            "#EXT-X-INDEPENDENT-SEGMENTS".to_string(),
        ];

        if separate {
            // Audio section first; variant streams reference audio groups
            // that must already be declared.
            let audio_lines = self.section(&CodecQuery::Absent, audio)?;
            let video_lines = self.section(video, &CodecQuery::Absent)?;
            lines.extend(audio_lines);
            lines.extend(video_lines);
        } else {
            lines.extend(self.section(video, audio)?);
        }

        Some(lines.join("\n") + "\n")
    }

    /// One filtered section: media renditions first, variant streams after.
    fn section(&self, video: &CodecQuery, audio: &CodecQuery) -> Option<Vec<String>> {
        let mut rules = RuleSet::new()
            .with(Rule::ProtocolEquals(HLS_PROTOCOL))
            .with(Rule::HasUrl)
            .with(Rule::CodecMatch {
                video: video.clone(),
                audio: audio.clone(),
            })
            .with(Rule::NoDrcVariant);
        let for_video = !video.is_absent();
        if for_video {
            rules = rules.with(Rule::MinVideoHeight(MIN_VIDEO_HEIGHT));
        }
        if !audio.is_absent() {
            rules = rules.with(Rule::NoUltralowAudio);
        }

        let formats = self.catalog.select(&rules);
        if formats.is_empty() {
            return None;
        }

        // Companion audio/captions tracks referenced by id from the
        // variant streams.
        let mut companions: Vec<&MediaFormat> = Vec::new();
        if for_video {
            for fmt in &formats {
                let refs = [fmt.audio_id.as_deref(), fmt.captions_id.as_deref()];
                for id in refs.into_iter().flatten() {
                    if companions.iter().all(|m| m.format_id != id) {
                        if let Some(found) = self.catalog.find(id) {
                            companions.push(found);
                        }
                    }
                }
            }
        }

        let (streams, media): (Vec<&MediaFormat>, Vec<&MediaFormat>) =
            formats.into_iter().partition(|fmt| fmt.has_bandwidth());

        let defaults = elect_defaults(&media);

        let mut lines = Vec::new();
        for fmt in &media {
            let group = rendition_group(&fmt.format_id);
            let is_default = defaults.get(group).copied() == Some(fmt.format_id.as_str());
            lines.push(media_line(fmt, is_default));
        }
        for fmt in &streams {
            push_stream_lines(&mut lines, fmt, &companions);
        }
        Some(lines)
    }
}

/// Rendition group shared by language variants of one track id.
fn rendition_group(format_id: &str) -> &str {
    match format_id.find('-') {
        Some(pos) => &format_id[..pos],
        None => format_id,
    }
}

/// Pick the default rendition per group: highest language preference,
/// ties favoring the first encountered.
fn elect_defaults<'a>(media: &[&'a MediaFormat]) -> HashMap<&'a str, &'a str> {
    let mut defaults: HashMap<&str, &str> = HashMap::new();
    let mut top: HashMap<&str, i32> = HashMap::new();
    for fmt in media {
        let group = rendition_group(&fmt.format_id);
        let preference = fmt.language_preference.unwrap_or(0);
        let better = match top.get(group) {
            None => true,
            Some(&best) => preference > best,
        };
        if better {
            top.insert(group, preference);
            defaults.insert(group, fmt.format_id.as_str());
        }
    }
    defaults
}

fn media_line(fmt: &MediaFormat, is_default: bool) -> String {
    let media_type = if fmt.acodec.is_absent() {
        "CLOSED-CAPTIONS"
    } else {
        "AUDIO"
    };

    let mut attrs = vec![
        format!("TYPE={media_type}"),
        format!("GROUP-ID=\"{}\"", rendition_group(&fmt.format_id)),
    ];
    if let Some(lang) = fmt.primary_language() {
        attrs.push(format!("LANGUAGE=\"{lang}\""));
    }
    attrs.push(format!(
        "NAME=\"{}\"",
        fmt.primary_language().unwrap_or("Default")
    ));
    attrs.push(format!(
        "DEFAULT={}",
        if is_default { "YES" } else { "NO" }
    ));
    attrs.push("AUTOSELECT=YES".to_string());
    attrs.push(format!("URI=\"{}\"", fmt.url.as_deref().unwrap_or_default()));

    format!("#EXT-X-MEDIA:{}", attrs.join(","))
}

fn push_stream_lines(lines: &mut Vec<String>, fmt: &MediaFormat, companions: &[&MediaFormat]) {
    let Some(bandwidth) = fmt.bandwidth_bps() else {
        return;
    };
    let Some(url) = fmt.url.as_deref() else {
        return;
    };

    let audio = fmt
        .audio_id
        .as_deref()
        .and_then(|id| companions.iter().copied().find(|m| m.format_id == id));
    let captions = fmt
        .captions_id
        .as_deref()
        .and_then(|id| companions.iter().copied().find(|m| m.format_id == id));

    let vcodec = fmt.vcodec.as_str();
    // A separately fetched stream carries no audio itself; report the
    // companion's codec instead.
    let acodec = fmt
        .acodec
        .as_str()
        .or_else(|| audio.and_then(|a| a.acodec.as_str()));

    let mut attrs = vec![format!("BANDWIDTH={bandwidth}")];

    let codecs = match (vcodec, acodec) {
        (Some(v), Some(a)) => Some(format!("{v},{a}")),
        (Some(v), None) => Some(v.to_string()),
        (None, Some(a)) => Some(a.to_string()),
        (None, None) => None,
    };
    if let Some(codecs) = codecs {
        attrs.push(format!("CODECS=\"{codecs}\""));
    }

    let width = fmt.width();
    let height = fmt.height();
    if width > 0 && height > 0 {
        attrs.push(format!("RESOLUTION={width}x{height}"));
    }
    if fmt.fps() > 0.0 {
        attrs.push(format!("FRAME-RATE={}", compact_float(fmt.fps())));
    }
    if let Some(range) = fmt.dynamic_range.as_deref() {
        attrs.push(format!("VIDEO-RANGE={range}"));
    }
    if vcodec.is_some() {
        if let Some(audio) = audio {
            attrs.push(format!("AUDIO=\"{}\"", rendition_group(&audio.format_id)));
        }
        if let Some(captions) = captions {
            attrs.push(format!(
                "CLOSED-CAPTIONS=\"{}\"",
                rendition_group(&captions.format_id)
            ));
        }
    }

    lines.push(format!("#EXT-X-STREAM-INF:{}", attrs.join(",")));
    lines.push(url.to_string());
}
