//! Direct URI selection when no adaptive strategy applies.

use tracing::debug;

use remux_core::filter::{Rule, RuleSet};
use remux_core::info::{MediaFormat, MediaInfo, DIRECT_PROTOCOL};
use remux_core::FormatCatalog;

const FALLBACK_EXT: &str = "mp4";

/// Picks the single best plain-download format.
pub struct DirectUriResolver<'a> {
    info: &'a MediaInfo,
    catalog: &'a FormatCatalog<'a>,
}

impl<'a> DirectUriResolver<'a> {
    pub fn new(info: &'a MediaInfo, catalog: &'a FormatCatalog<'a>) -> Self {
        Self { info, catalog }
    }

    /// The winning URL, or `None` when no candidate exists.
    pub fn resolve(&self) -> Option<String> {
        // A record that is itself one direct stream resolves immediately.
        if self.info.protocol.as_deref() == Some(DIRECT_PROTOCOL) {
            if let Some(url) = self.info.url.as_deref() {
                debug!("resolved top-level direct stream");
                return Some(url.to_string());
            }
        }

        let rules = RuleSet::new()
            .with(Rule::ProtocolEquals(DIRECT_PROTOCOL))
            .with(Rule::HasUrl);
        let candidates = self.catalog.select(&rules);

        let ext = self.info.ext.as_deref().unwrap_or(FALLBACK_EXT);
        let container_match = best_format(
            candidates.iter().copied().filter(|fmt| fmt.ext.as_deref() == Some(ext)),
            true,
        );
        let winner = container_match.or_else(|| {
            // Audio-only fallback.
            best_format(
                candidates.iter().copied().filter(|fmt| fmt.vcodec.is_absent()),
                false,
            )
        })?;

        debug!(format_id = %winner.format_id, "resolved direct format");
        winner.url.clone()
    }
}

/// Running best under the quality comparator. The first candidate wins ties.
fn best_format<'a>(
    candidates: impl Iterator<Item = &'a MediaFormat>,
    video: bool,
) -> Option<&'a MediaFormat> {
    let mut best: Option<&MediaFormat> = None;
    for fmt in candidates {
        match best {
            Some(current) if !beats(fmt, current, video) => {}
            _ => best = Some(fmt),
        }
    }
    best
}

/// Prefer higher height, then higher fps (video only), then higher bitrate.
fn beats(challenger: &MediaFormat, holder: &MediaFormat, video: bool) -> bool {
    if challenger.height() != holder.height() {
        return challenger.height() > holder.height();
    }
    if video && challenger.fps() != holder.fps() {
        return challenger.fps() > holder.fps();
    }
    challenger.tbr() > holder.tbr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use remux_core::info::Codec;

    fn https_mp4(id: &str, height: u32, fps: f64, tbr: f64) -> MediaFormat {
        MediaFormat {
            format_id: id.into(),
            protocol: Some(DIRECT_PROTOCOL.into()),
            ext: Some("mp4".into()),
            vcodec: Codec::new("avc1.64001f"),
            height: Some(height),
            fps: Some(fps),
            tbr: Some(tbr),
            url: Some(format!("https://example.com/{id}.mp4")),
            ..MediaFormat::default()
        }
    }

    fn resolve(info: &MediaInfo) -> Option<String> {
        let catalog = FormatCatalog::new(info).unwrap();
        DirectUriResolver::new(info, &catalog).resolve()
    }

    #[test]
    fn test_top_level_direct_stream() {
        let info = MediaInfo {
            formats: Some(Vec::new()),
            protocol: Some("https".into()),
            url: Some("https://example.com/one.mp4".into()),
            ..MediaInfo::default()
        };
        assert_eq!(resolve(&info).as_deref(), Some("https://example.com/one.mp4"));
    }

    #[test]
    fn test_higher_resolution_wins() {
        let info = MediaInfo {
            formats: Some(vec![
                https_mp4("a", 480, 30.0, 1000.0),
                https_mp4("b", 720, 30.0, 1000.0),
            ]),
            ..MediaInfo::default()
        };
        assert_eq!(resolve(&info).as_deref(), Some("https://example.com/b.mp4"));
    }

    #[test]
    fn test_fps_breaks_height_ties() {
        let info = MediaInfo {
            formats: Some(vec![
                https_mp4("a", 720, 30.0, 1000.0),
                https_mp4("b", 720, 60.0, 1000.0),
            ]),
            ..MediaInfo::default()
        };
        assert_eq!(resolve(&info).as_deref(), Some("https://example.com/b.mp4"));
    }

    #[test]
    fn test_bitrate_breaks_remaining_ties() {
        let info = MediaInfo {
            formats: Some(vec![
                https_mp4("a", 720, 30.0, 1000.0),
                https_mp4("b", 720, 30.0, 2000.0),
            ]),
            ..MediaInfo::default()
        };
        assert_eq!(resolve(&info).as_deref(), Some("https://example.com/b.mp4"));
    }

    #[test]
    fn test_first_wins_full_tie() {
        let info = MediaInfo {
            formats: Some(vec![
                https_mp4("a", 720, 30.0, 1000.0),
                https_mp4("b", 720, 30.0, 1000.0),
            ]),
            ..MediaInfo::default()
        };
        assert_eq!(resolve(&info).as_deref(), Some("https://example.com/a.mp4"));
    }

    #[test]
    fn test_audio_only_fallback() {
        let audio = MediaFormat {
            format_id: "snd".into(),
            protocol: Some(DIRECT_PROTOCOL.into()),
            ext: Some("m4a".into()),
            acodec: Codec::new("mp4a.40.2"),
            tbr: Some(128.0),
            url: Some("https://example.com/snd.m4a".into()),
            ..MediaFormat::default()
        };
        let info = MediaInfo {
            formats: Some(vec![audio]),
            ..MediaInfo::default()
        };
        assert_eq!(resolve(&info).as_deref(), Some("https://example.com/snd.m4a"));
    }

    #[test]
    fn test_no_candidates() {
        let hls_only = MediaFormat {
            format_id: "h".into(),
            protocol: Some("m3u8_native".into()),
            url: Some("https://example.com/h.m3u8".into()),
            ..MediaFormat::default()
        };
        let info = MediaInfo {
            formats: Some(vec![hls_only]),
            ..MediaInfo::default()
        };
        assert_eq!(resolve(&info), None);
    }
}
