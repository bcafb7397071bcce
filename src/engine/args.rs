//! Translation of [`TrialParams`] into ffmpeg command line arguments.

use super::{RateControl, TrialParams};
use crate::prelude::*;
use crate::profile::Container;
use std::time::Duration;

const LOSSLESS_QUALITY: u8 = 100;

/// Arguments shared by both passes of the VP9 encoding.
/// The pass-specific ones and the output are appended by the caller.
pub(super) fn video_prefix(input: &Utf8Path, params: &TrialParams) -> Result<Vec<String>> {
    let RateControl::Bitrate(bitrate) = params.rate else {
        bail!("BUG: video encoding requires a bitrate, got {}", params.rate);
    };

    let window = params
        .window
        .context("BUG: video encoding requires a time window")?;

    let seek = Some(window.start).filter(|start| !start.is_zero());
    let trim = (!window.whole_source).then(|| window.duration());

    let args = strs(["-y", "-i", input.as_str()])
        .chain(optional_named_duration_arg("-ss", seek))
        .chain(optional_named_duration_arg("-t", trim))
        .chain(strs([
            "-map",
            "0:v:0",
            "-map_metadata",
            "-1",
            "-metadata",
            "encoded_by=telesticker",
        ]))
        .chain(optional_named_arg(
            "-metadata",
            params.force_loop.then(|| "loop=infinite".to_owned()),
        ))
        .chain(strs([
            "-vcodec",
            "libvpx-vp9",
            "-pix_fmt",
            "yuva420p",
            "-deadline",
            "good",
            // Alternate reference frames aren't supported together with alpha
            "-auto-alt-ref",
            "0",
            "-b:v",
        ]))
        .chain([bitrate.to_string()])
        .chain(params.strip_audio.then(|| "-an".to_owned()))
        .chain(strs(["-filter:v"]))
        .chain([video_filter(params, None)])
        .collect();

    Ok(args)
}

pub(super) fn image(
    input: &Utf8Path,
    params: &TrialParams,
    output: &Utf8Path,
) -> Result<Vec<String>> {
    let RateControl::Quality(quality) = params.rate else {
        bail!("BUG: image encoding requires a quality, got {}", params.rate);
    };

    let palette = (params.container == Container::Png && quality < LOSSLESS_QUALITY)
        .then(|| palette_colors(quality));

    let codec_args = match params.container {
        Container::Png => strs(["-vcodec", "png", "-compression_level", "9"]).collect_vec(),
        Container::Webp if quality >= LOSSLESS_QUALITY => {
            strs(["-vcodec", "libwebp", "-lossless", "1"]).collect_vec()
        }
        Container::Webp => strs(["-vcodec", "libwebp", "-lossless", "0", "-quality"])
            .chain([quality.to_string()])
            .collect_vec(),
        Container::Webm => bail!("BUG: {} is not an image container", params.container),
    };

    let args = strs(["-y", "-i", input.as_str()])
        .chain(strs([
            "-frames:v",
            "1",
            "-map",
            "0:v:0",
            "-map_metadata",
            "-1",
            "-filter:v",
        ]))
        .chain([video_filter(params, palette)])
        .chain(codec_args)
        .chain([output.to_string()])
        .collect();

    Ok(args)
}

/// Number of palette colors for lossy PNG, from 2 at quality 1 to 256 at 99.
fn palette_colors(quality: u8) -> u32 {
    let quality = u32::from(quality.clamp(1, LOSSLESS_QUALITY - 1));
    2 + 254 * (quality - 1) / 98
}

fn video_filter(params: &TrialParams, palette: Option<u32>) -> String {
    let fps = params.fps.map(|fps| format!("fps={fps}"));

    let dims = params.dimensions;
    let scale = format!("scale={}:{}:flags=lanczos", dims.width, dims.height);

    // Content is centered on a transparent canvas
    let pad = params.canvas.map(|canvas| {
        format!(
            "pad={}:{}:-1:-1:color=0x00000000",
            canvas.width, canvas.height
        )
    });

    let palette = palette.map(|colors| {
        format!(
            "split[a][b];\
            [a]palettegen=max_colors={colors}:reserve_transparent=1[p];\
            [b][p]paletteuse"
        )
    });

    fps.into_iter()
        .chain([scale])
        .chain(pad)
        .chain(palette)
        .join(",")
}

pub(super) fn strs<'a>(
    input: impl IntoIterator<Item = impl AsRef<str>> + 'a,
) -> impl Iterator<Item = String> + 'a {
    input.into_iter().map(|val| val.as_ref().to_owned())
}

fn optional_named_duration_arg(
    name: &str,
    bound: Option<Duration>,
) -> impl Iterator<Item = String> + '_ {
    let bound = bound.map(|duration| duration.as_secs_f64().to_string());
    optional_named_arg(name, bound)
}

fn optional_named_arg(name: &str, option: Option<String>) -> impl Iterator<Item = String> + '_ {
    option
        .into_iter()
        .flat_map(move |value| [name.to_owned(), value])
}
