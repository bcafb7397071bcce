use crate::asset::{MediaInfo, MediaKind};
use crate::prelude::*;
use serde::Deserialize;

#[derive(Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<StreamInfo>,
    format: Option<FormatInfo>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(Deserialize)]
struct FormatInfo {
    format_name: Option<String>,
    duration: Option<String>,
}

pub(super) fn args(path: &Utf8Path) -> Vec<String> {
    super::args::strs([
        "-print_format",
        "json",
        "-show_entries",
        "stream=codec_type,width,height,r_frame_rate:format=format_name,duration",
        path.as_str(),
    ])
    .collect()
}

pub(super) fn parse(json: &[u8]) -> Result<MediaInfo> {
    let output: FfprobeOutput =
        serde_json::from_slice(json).context("ffprobe returned malformed JSON")?;

    let video = output
        .streams
        .iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"))
        .context("No video stream found")?;

    let width = video.width.context("The video stream has no width")?;
    let height = video.height.context("The video stream has no height")?;

    let has_audio = output
        .streams
        .iter()
        .any(|stream| stream.codec_type.as_deref() == Some("audio"));

    let format = output.format.as_ref();

    let duration = format
        .and_then(|format| format.duration.as_deref())
        .and_then(|duration| duration.parse::<f64>().ok())
        .filter(|duration| *duration > 0.0);

    let format_name = format
        .and_then(|format| format.format_name.as_deref())
        .unwrap_or_default();

    let kind = if duration.is_none() || is_image_demuxer(format_name) {
        MediaKind::Image
    } else {
        MediaKind::Video
    };

    let frame_rate = video.r_frame_rate.as_deref().and_then(parse_frame_rate);

    Ok(MediaInfo {
        kind,
        width,
        height,
        duration: duration.filter(|_| kind == MediaKind::Video),
        frame_rate: frame_rate.filter(|_| kind == MediaKind::Video),
        has_audio,
    })
}

/// ffmpeg reads still images with `image2` or one of the `*_pipe` demuxers.
fn is_image_demuxer(format_name: &str) -> bool {
    format_name
        .split(',')
        .any(|name| name == "image2" || name.ends_with("_pipe"))
}

fn parse_frame_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.parse::<f64>().ok()? / den
        }
        None => raw.parse().ok()?,
    };

    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::{expect, Expect};

    fn assert_parse(json: &str, expected: Expect) {
        let actual = parse(json.as_bytes())
            .map(|info| format!("{info:?}"))
            .unwrap_or_else(|err| format!("{err:#}"));

        expected.assert_eq(&actual);
    }

    #[test]
    fn video_with_audio() {
        assert_parse(
            r#"{
                "streams": [
                    { "codec_type": "video", "width": 1920, "height": 1080, "r_frame_rate": "60/2" },
                    { "codec_type": "audio", "r_frame_rate": "0/0" }
                ],
                "format": { "format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "5.005000" }
            }"#,
            expect!["MediaInfo { kind: Video, width: 1920, height: 1080, duration: Some(5.005), frame_rate: Some(30.0), has_audio: true }"],
        );
    }

    #[test]
    fn still_images() {
        assert_parse(
            r#"{
                "streams": [{ "codec_type": "video", "width": 2000, "height": 2000, "r_frame_rate": "25/1" }],
                "format": { "format_name": "png_pipe" }
            }"#,
            expect!["MediaInfo { kind: Image, width: 2000, height: 2000, duration: None, frame_rate: None, has_audio: false }"],
        );
        assert_parse(
            r#"{
                "streams": [{ "codec_type": "video", "width": 640, "height": 480, "r_frame_rate": "25/1" }],
                "format": { "format_name": "image2", "duration": "0.040000" }
            }"#,
            expect!["MediaInfo { kind: Image, width: 640, height: 480, duration: None, frame_rate: None, has_audio: false }"],
        );
    }

    #[test]
    fn corrupt_output() {
        assert_parse(
            r#"{ "streams": [{ "codec_type": "audio" }], "format": {} }"#,
            expect!["No video stream found"],
        );
        assert_parse(
            r#"{ "streams": [{ "codec_type": "video" }] }"#,
            expect!["The video stream has no width"],
        );
        assert_parse(
            "{",
            expect!["ffprobe returned malformed JSON: EOF while parsing an object at line 1 column 1"],
        );
    }

    #[test]
    fn frame_rates() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("garbage"), None);
    }
}
