//! End-to-end manifest synthesis over JSON-shaped extractor output.

use remux_manifest::{
    CancelFlag, Error, ManifestSelector, MediaInfo, MediaType, Outcome, SelectorPolicy, Strategy,
};
use serde_json::json;

fn info_from(value: serde_json::Value) -> MediaInfo {
    serde_json::from_value(value).expect("valid media info")
}

fn synthesize(info: &MediaInfo) -> Outcome {
    ManifestSelector::new()
        .synthesize(info, &CancelFlag::new())
        .expect("a manifest")
}

fn dash_video_format(id: &str, height: u32, tbr: f64) -> serde_json::Value {
    json!({
        "format_id": id,
        "container": "mp4_dash",
        "ext": "mp4",
        "vcodec": "avc1.64001f",
        "acodec": "none",
        "width": height * 16 / 9,
        "height": height,
        "fps": 30,
        "tbr": tbr,
        "url": format!("https://cdn.example.com/{id}"),
        "streaming_options": {"init_range": "0-741", "index_range": "742-1221"}
    })
}

fn dash_audio_format(id: &str, lang: &str, preference: i32) -> serde_json::Value {
    json!({
        "format_id": id,
        "container": "m4a_dash",
        "ext": "m4a",
        "vcodec": "none",
        "acodec": "mp4a.40.2",
        "tbr": 129.5,
        "audio_channels": 2,
        "language": lang,
        "language_preference": preference,
        "url": format!("https://cdn.example.com/{id}"),
        "streaming_options": {"init_range": "0-640", "index_range": "641-1000"}
    })
}

fn hls_video_format(id: &str, height: u32, tbr: f64, audio_id: &str) -> serde_json::Value {
    json!({
        "format_id": id,
        "protocol": "m3u8_native",
        "ext": "mp4",
        "vcodec": "avc1.64001f",
        "acodec": "none",
        "width": height * 16 / 9,
        "height": height,
        "fps": 30,
        "tbr": tbr,
        "url": format!("https://cdn.example.com/{id}.m3u8"),
        "audio_id": audio_id
    })
}

fn hls_audio_format(id: &str, lang: &str, preference: i32) -> serde_json::Value {
    json!({
        "format_id": id,
        "protocol": "m3u8_native",
        "ext": "mp4",
        "vcodec": "none",
        "acodec": "mp4a.40.2",
        "language": lang,
        "language_preference": preference,
        "url": format!("https://cdn.example.com/{id}.m3u8")
    })
}

#[test]
fn dash_manifest_from_json_record() {
    let info = info_from(json!({
        "duration": 633,
        "extractor": "youtube",
        "formats": [
            dash_video_format("137", 1080, 4521.3),
            dash_video_format("136", 720, 2511.0),
            dash_audio_format("140", "en-US", 10),
            dash_audio_format("140-1", "pl", 0),
        ]
    }));

    let doc = synthesize(&info).into_manifest().unwrap();
    assert_eq!(doc.media_type, MediaType::Dash);
    assert_eq!(doc.media_type.as_str(), "application/dash+xml");

    assert!(doc.body.starts_with("<?xml version=\"1.0\""));
    assert!(doc.body.contains("mediaPresentationDuration=\"PT633S\""));
    assert!(doc.body.contains("profiles=\"urn:mpeg:dash:profile:isoff-on-demand:2011\""));
    assert!(doc.body.contains("contentType=\"video\""));
    assert!(doc.body.contains("maxHeight=\"1080\""));
    assert!(doc.body.contains("par=\"16:9\""));
    // Two audio languages, the preferred one first, primary subtags only.
    let en = doc.body.find("lang=\"en\"").unwrap();
    let pl = doc.body.find("lang=\"pl\"").unwrap();
    assert!(en < pl);
    // Bandwidth is rounded, not truncated.
    assert!(doc.body.contains("bandwidth=\"4521300\""));
    assert!(doc.body.contains("bandwidth=\"129500\""));
    assert!(doc.body.contains("<BaseURL>https://cdn.example.com/137</BaseURL>"));
    assert!(doc.body.contains("indexRange=\"742-1221\""));
}

#[test]
fn dash_needs_a_duration() {
    let info = info_from(json!({
        "duration": 0,
        "formats": [
            dash_video_format("137", 1080, 4500.0),
            dash_audio_format("140", "en", 0),
        ]
    }));

    let err = ManifestSelector::new()
        .synthesize(&info, &CancelFlag::new())
        .unwrap_err();
    assert!(err.is_exhausted());
}

#[test]
fn hls_wins_over_dash_under_default_policy() {
    let info = info_from(json!({
        "duration": 633,
        "protocol": "m3u8_native+m3u8_native",
        "vcodec": "avc1.64001f",
        "acodec": "mp4a.40.2",
        "formats": [
            dash_video_format("137", 1080, 4500.0),
            dash_audio_format("140", "en", 0),
            hls_video_format("270", 720, 2500.0, "234-0"),
            hls_audio_format("234-0", "en", 0),
        ]
    }));

    let doc = synthesize(&info).into_manifest().unwrap();
    assert_eq!(doc.media_type, MediaType::Hls);
    assert_eq!(doc.media_type.as_str(), "application/x-hls");
    assert!(doc.body.starts_with("#EXTM3U"));
}

#[test]
fn dash_first_when_policy_reordered() {
    let info = info_from(json!({
        "duration": 633,
        "protocol": "m3u8_native+m3u8_native",
        "vcodec": "avc1.64001f",
        "acodec": "mp4a.40.2",
        "formats": [
            dash_video_format("137", 1080, 4500.0),
            dash_audio_format("140", "en", 0),
            hls_video_format("270", 720, 2500.0, "234-0"),
            hls_audio_format("234-0", "en", 0),
        ]
    }));

    let policy = SelectorPolicy::new().with_order(vec![
        Strategy::Dash,
        Strategy::Hls,
        Strategy::Direct,
        Strategy::Playlist,
    ]);
    let doc = ManifestSelector::with_policy(policy)
        .synthesize(&info, &CancelFlag::new())
        .unwrap()
        .into_manifest()
        .unwrap();
    assert_eq!(doc.media_type, MediaType::Dash);
}

#[test]
fn hls_media_groups_and_default_election() {
    let info = info_from(json!({
        "protocol": "m3u8_native+m3u8_native",
        "vcodec": "avc1.64001f",
        "acodec": "mp4a.40.2",
        "formats": [
            hls_video_format("270", 720, 2500.0, "234-0"),
            hls_audio_format("234-0", "en-US", 0),
            hls_audio_format("234-1", "pl", 5),
        ]
    }));

    let doc = synthesize(&info).into_manifest().unwrap();
    assert_eq!(doc.media_type, MediaType::Hls);

    let lines: Vec<&str> = doc.body.lines().collect();
    assert_eq!(lines[0], "#EXTM3U");
    assert_eq!(lines[1], "#EXT-X-INDEPENDENT-SEGMENTS");

    let en = lines.iter().find(|l| l.contains("LANGUAGE=\"en\"")).unwrap();
    let pl = lines.iter().find(|l| l.contains("LANGUAGE=\"pl\"")).unwrap();
    assert!(en.contains("DEFAULT=NO"));
    assert!(pl.contains("DEFAULT=YES"));
    assert!(en.contains("GROUP-ID=\"234\""));

    let stream = lines
        .iter()
        .find(|l| l.starts_with("#EXT-X-STREAM-INF"))
        .unwrap();
    assert!(stream.contains("AUDIO=\"234\""));
    assert!(stream.contains("CODECS=\"avc1.64001f,mp4a.40.2\""));

    // Renditions are declared before any variant stream references them.
    let first_media = lines.iter().position(|l| l.starts_with("#EXT-X-MEDIA")).unwrap();
    let first_stream = lines
        .iter()
        .position(|l| l.starts_with("#EXT-X-STREAM-INF"))
        .unwrap();
    assert!(first_media < first_stream);
}

#[test]
fn direct_uri_when_no_adaptive_strategy_applies() {
    let info = info_from(json!({
        "formats": [
            {
                "format_id": "18",
                "protocol": "https",
                "ext": "mp4",
                "vcodec": "avc1.42001E",
                "acodec": "mp4a.40.2",
                "height": 480,
                "fps": 30,
                "tbr": 800.0,
                "url": "https://cdn.example.com/18.mp4"
            },
            {
                "format_id": "22",
                "protocol": "https",
                "ext": "mp4",
                "vcodec": "avc1.64001F",
                "acodec": "mp4a.40.2",
                "height": 720,
                "fps": 30,
                "tbr": 800.0,
                "url": "https://cdn.example.com/22.mp4"
            }
        ]
    }));

    let doc = synthesize(&info).into_manifest().unwrap();
    assert_eq!(doc.media_type, MediaType::Uri);
    assert_eq!(doc.media_type.as_str(), "text/x-uri");
    assert_eq!(doc.body, "https://cdn.example.com/22.mp4");
}

#[test]
fn playlist_document_from_flat_entries() {
    let info = info_from(json!({
        "entries": [
            {"_type": "url_transparent", "url": "https://example.com/v1", "title": "A"},
            {"_type": "something_else", "url": "https://example.com/skip"},
            {"_type": "url", "url": "https://example.com/v2", "duration": 63.0}
        ]
    }));

    let doc = synthesize(&info).into_manifest().unwrap();
    assert_eq!(doc.media_type, MediaType::Playlist);
    assert_eq!(doc.media_type.as_str(), "application/clapper-playlist");

    let body: serde_json::Value = serde_json::from_str(&doc.body).unwrap();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["url"], "https://example.com/v1");
    assert_eq!(entries[0]["title"], "A");
    assert_eq!(entries[1]["url"], "https://example.com/v2");
    assert_eq!(entries[1]["duration"], 63.0);
}

#[test]
fn identical_input_produces_identical_output() {
    let value = json!({
        "duration": 633,
        "formats": [
            dash_video_format("137", 1080, 4500.0),
            dash_video_format("136", 720, 2500.0),
            dash_audio_format("140", "en", 5),
            dash_audio_format("140-1", "pl", 0),
        ]
    });

    let first = synthesize(&info_from(value.clone())).into_manifest().unwrap();
    let second = synthesize(&info_from(value)).into_manifest().unwrap();
    assert_eq!(first.media_type, second.media_type);
    assert_eq!(first.body, second.body);
}

#[test]
fn unusable_record_fails_before_any_strategy() {
    let info = info_from(json!({"title": "nothing here"}));
    let err = ManifestSelector::new()
        .synthesize(&info, &CancelFlag::new())
        .unwrap_err();
    assert!(matches!(err, Error::InputShape(_)));
}

#[test]
fn cancellation_is_an_outcome_not_an_error() {
    let info = info_from(json!({
        "entries": [{"_type": "url", "url": "https://example.com/v1"}]
    }));

    let cancel = CancelFlag::new();
    cancel.cancel();
    let outcome = ManifestSelector::new().synthesize(&info, &cancel).unwrap();
    assert_eq!(outcome, Outcome::Cancelled);
    assert!(outcome.into_manifest().is_none());
}
