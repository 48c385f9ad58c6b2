//! MPEG-DASH MPD synthesis for byte-range-indexed on-demand sources.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::{debug, trace};

use remux_core::filter::{Rule, RuleSet, MIN_VIDEO_HEIGHT};
use remux_core::info::{CodecQuery, MediaFormat, MediaInfo};
use remux_core::{Error, FormatCatalog, Result};

use crate::compact_float;

const MPD_NS: &str = "urn:mpeg:dash:schema:mpd:2011";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "urn:mpeg:dash:schema:mpd:2011 DASH-MPD.xsd";
const PROFILE_URN: &str = "urn:mpeg:dash:profile:isoff-on-demand:2011";
const AUDIO_CHANNEL_SCHEME: &str = "urn:mpeg:dash:23003:3:audio_channel_configuration:2011";

/// Video codec tags tried in preference order when nothing was pre-selected.
const VIDEO_CODEC_PREFS: &[&str] = &["avc1", "av01", "hev1", "vp09"];
/// Audio codec tags tried in preference order when nothing was pre-selected.
const AUDIO_CODEC_PREFS: &[&str] = &["mp4a", "opus"];

/// One adaptation set worth of interchangeable formats. Exists only while
/// a single manifest is being rendered.
struct AdaptationGroup<'a> {
    content_type: &'static str,
    mime_ext: String,
    lang: Option<&'a str>,
    max_width: u32,
    max_height: u32,
    max_fps: f64,
    formats: Vec<&'a MediaFormat>,
}

/// Builds a `static` on-demand MPD from one extraction.
pub struct DashManifestBuilder<'a> {
    info: &'a MediaInfo,
    catalog: &'a FormatCatalog<'a>,
}

impl<'a> DashManifestBuilder<'a> {
    pub fn new(info: &'a MediaInfo, catalog: &'a FormatCatalog<'a>) -> Self {
        Self { info, catalog }
    }

    /// Build the MPD, or `None` when no viable adaptation set exists.
    /// A document with zero adaptation sets is never produced.
    pub fn build(&self) -> Result<Option<String>> {
        let duration = self.info.duration_secs();
        if duration == 0 {
            // Only on-demand delivery is supported; without a duration
            // there is nothing to present.
            trace!("no duration, skipping DASH");
            return Ok(None);
        }

        let groups = self.collect_groups();
        if groups.is_empty() {
            return Ok(None);
        }

        self.render(duration, &groups).map(Some)
    }

    fn collect_groups(&self) -> Vec<AdaptationGroup<'a>> {
        let requested = self.catalog.requested();
        if !requested.is_empty() {
            // The extractor already chose; the top-level codecs describe
            // that choice.
            let separate = requested.len() > 1;
            if !requested[0].is_dash_fragmented() {
                return Vec::new();
            }
            let video = self.info.video_query();
            let audio = self.info.audio_query();
            if video == audio {
                return Vec::new();
            }
            if separate && (video.is_absent() || audio.is_absent()) {
                return Vec::new();
            }
            debug!(%video, %audio, separate, "building from pre-selected formats");
            return self.try_pair(&video, &audio, separate);
        }

        for video_tag in VIDEO_CODEC_PREFS {
            for audio_tag in AUDIO_CODEC_PREFS {
                let video = CodecQuery::prefix(*video_tag);
                let audio = CodecQuery::prefix(*audio_tag);

                let groups = self.try_pair(&video, &audio, true);
                if !groups.is_empty() {
                    debug!(%video, %audio, "codec pair matched with separate sets");
                    return groups;
                }
                let groups = self.try_pair(&video, &audio, false);
                if !groups.is_empty() {
                    debug!(%video, %audio, "codec pair matched with a combined set");
                    return groups;
                }
            }
        }
        Vec::new()
    }

    fn try_pair(
        &self,
        video: &CodecQuery,
        audio: &CodecQuery,
        separate: bool,
    ) -> Vec<AdaptationGroup<'a>> {
        if separate {
            let mut groups = Vec::new();
            groups.extend(self.collect_set(video, &CodecQuery::Absent, None));
            groups.extend(self.audio_sets(audio));
            groups
        } else {
            self.collect_set(video, audio, None).into_iter().collect()
        }
    }

    /// One audio set per known language, the default language first, or a
    /// single language-less set when no format declares one.
    fn audio_sets(&self, audio: &CodecQuery) -> Vec<AdaptationGroup<'a>> {
        let mut groups = Vec::new();
        for lang in self.catalog.languages() {
            groups.extend(self.collect_set(&CodecQuery::Absent, audio, Some(lang)));
        }
        if groups.is_empty() {
            groups.extend(self.collect_set(&CodecQuery::Absent, audio, None));
        }
        groups
    }

    fn collect_set(
        &self,
        video: &CodecQuery,
        audio: &CodecQuery,
        lang: Option<&'a str>,
    ) -> Option<AdaptationGroup<'a>> {
        let mut rules = RuleSet::new()
            .with(Rule::DashContainer)
            .with(Rule::CodecMatch {
                video: video.clone(),
                audio: audio.clone(),
            })
            .with(Rule::UsableExt)
            .with(Rule::NoDrcVariant)
            .with(Rule::PositiveBitrate)
            .with(Rule::HasUrl)
            .with(Rule::SegmentedRanges);
        if let Some(lang) = lang {
            rules = rules.with(Rule::LanguageEquals(lang.to_string()));
        }
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

        let mut max_width = 0;
        let mut max_height = 0;
        let mut max_fps = 0.0f64;
        if for_video {
            for fmt in &formats {
                max_width = max_width.max(fmt.width());
                max_height = max_height.max(fmt.height());
                max_fps = max_fps.max(fmt.fps());
            }
        }

        // DASH expects `mp4` where the source inventory says `m4a`.
        let ext = formats[0].ext.as_deref().unwrap_or_default();
        let mime_ext = if ext == "m4a" { "mp4" } else { ext }.to_string();

        Some(AdaptationGroup {
            content_type: if for_video { "video" } else { "audio" },
            mime_ext,
            lang,
            max_width,
            max_height,
            max_fps,
            formats,
        })
    }

    fn render(&self, duration: u64, groups: &[AdaptationGroup<'a>]) -> Result<String> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(Error::xml)?;

        let mut mpd = BytesStart::new("MPD");
        mpd.push_attribute(("xmlns", MPD_NS));
        mpd.push_attribute(("xmlns:xsi", XSI_NS));
        mpd.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
        mpd.push_attribute(("type", "static"));
        mpd.push_attribute((
            "mediaPresentationDuration",
            format!("PT{duration}S").as_str(),
        ));
        mpd.push_attribute(("minBufferTime", format!("PT{}S", duration.min(2)).as_str()));
        mpd.push_attribute(("profiles", PROFILE_URN));
        writer.write_event(Event::Start(mpd)).map_err(Error::xml)?;

        writer
            .write_event(Event::Start(BytesStart::new("Period")))
            .map_err(Error::xml)?;

        for group in groups {
            write_adaptation_set(&mut writer, group)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("Period")))
            .map_err(Error::xml)?;
        writer
            .write_event(Event::End(BytesEnd::new("MPD")))
            .map_err(Error::xml)?;

        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(Error::xml)
    }
}

fn write_adaptation_set(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    group: &AdaptationGroup<'_>,
) -> Result<()> {
    let mut adapt = BytesStart::new("AdaptationSet");
    adapt.push_attribute(("contentType", group.content_type));
    adapt.push_attribute((
        "mimeType",
        format!("{}/{}", group.content_type, group.mime_ext).as_str(),
    ));
    adapt.push_attribute(("subsegmentAlignment", "true"));
    adapt.push_attribute(("subsegmentStartsWithSAP", "1"));
    if group.max_width > 0 {
        adapt.push_attribute(("maxWidth", group.max_width.to_string().as_str()));
    }
    if group.max_height > 0 {
        adapt.push_attribute(("maxHeight", group.max_height.to_string().as_str()));
    }
    if let Some(par) = aspect_ratio(group.max_width, group.max_height) {
        adapt.push_attribute(("par", par.as_str()));
    }
    if group.max_fps > 0.0 {
        adapt.push_attribute(("maxFrameRate", compact_float(group.max_fps).as_str()));
    }
    if let Some(lang) = group.lang {
        adapt.push_attribute(("lang", lang.split('-').next().unwrap_or(lang)));
    }
    writer.write_event(Event::Start(adapt)).map_err(Error::xml)?;

    for fmt in &group.formats {
        write_representation(writer, fmt)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("AdaptationSet")))
        .map_err(Error::xml)?;
    Ok(())
}

fn write_representation(writer: &mut Writer<Cursor<Vec<u8>>>, fmt: &MediaFormat) -> Result<()> {
    // The filter rules guarantee these; a format slipping through without
    // them is dropped rather than emitted broken.
    let Some((init, index)) = fmt.indexed_ranges() else {
        trace!(format_id = %fmt.format_id, "byte ranges missing at render time");
        return Ok(());
    };
    let Some(bandwidth) = fmt.bandwidth_bps() else {
        trace!(format_id = %fmt.format_id, "bitrate missing at render time");
        return Ok(());
    };

    let mut rep = BytesStart::new("Representation");
    rep.push_attribute(("id", fmt.format_id.as_str()));
    rep.push_attribute(("bandwidth", bandwidth.to_string().as_str()));
    if let Some(codecs) = fmt.codecs_string() {
        rep.push_attribute(("codecs", codecs.as_str()));
    }

    if !fmt.vcodec.is_absent() {
        let width = fmt.width();
        let height = fmt.height();
        if width > 0 {
            rep.push_attribute(("width", width.to_string().as_str()));
        }
        if height > 0 {
            rep.push_attribute(("height", height.to_string().as_str()));
            if let Some(sar) = aspect_ratio(width, height) {
                rep.push_attribute(("sar", sar.as_str()));
            }
        }
        if fmt.fps() > 0.0 {
            rep.push_attribute(("frameRate", compact_float(fmt.fps()).as_str()));
        }
    }
    writer.write_event(Event::Start(rep)).map_err(Error::xml)?;

    if !fmt.acodec.is_absent() && fmt.audio_channels() > 0 {
        let mut channels = BytesStart::new("AudioChannelConfiguration");
        channels.push_attribute(("schemeIdUri", AUDIO_CHANNEL_SCHEME));
        channels.push_attribute(("value", fmt.audio_channels().to_string().as_str()));
        writer
            .write_event(Event::Empty(channels))
            .map_err(Error::xml)?;
    }

    if let Some(url) = fmt.url.as_deref() {
        writer
            .write_event(Event::Start(BytesStart::new("BaseURL")))
            .map_err(Error::xml)?;
        writer
            .write_event(Event::Text(BytesText::new(url)))
            .map_err(Error::xml)?;
        writer
            .write_event(Event::End(BytesEnd::new("BaseURL")))
            .map_err(Error::xml)?;
    }

    let mut initialization = BytesStart::new("Initialization");
    initialization.push_attribute(("range", init.to_string().as_str()));
    writer
        .write_event(Event::Empty(initialization))
        .map_err(Error::xml)?;

    let mut segment_base = BytesStart::new("SegmentBase");
    segment_base.push_attribute(("indexRange", index.to_string().as_str()));
    segment_base.push_attribute(("indexRangeExact", "true"));
    writer
        .write_event(Event::Empty(segment_base))
        .map_err(Error::xml)?;

    writer
        .write_event(Event::End(BytesEnd::new("Representation")))
        .map_err(Error::xml)?;
    Ok(())
}

/// Reduced `W:H` ratio; `None` when either dimension is zero.
fn aspect_ratio(width: u32, height: u32) -> Option<String> {
    if width == 0 || height == 0 {
        return None;
    }
    let div = gcd(width, height);
    Some(format!("{}:{}", width / div, height / div))
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
