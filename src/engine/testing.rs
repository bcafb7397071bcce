use super::{CodecEngine, RateControl, TrialParams};
use crate::asset::{MediaInfo, MediaKind};
use crate::prelude::*;
use crate::profile::Container;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type SizeModel = Arc<dyn Fn(&TrialParams) -> usize + Send + Sync>;

/// Simulated codec engine. The output size of every trial is computed by a
/// scripted size model, and the outputs are probed back from the parameters
/// of the latest trial.
pub(crate) struct SharedMockEngine(Mutex<MockEngine>);

pub(crate) struct MockEngine {
    sources: HashMap<Utf8PathBuf, MediaInfo>,
    /// Metadata of files whose path contains the key
    patterns: Vec<(String, MediaInfo)>,
    corrupt: HashSet<Utf8PathBuf>,
    size_model: SizeModel,
    /// Number of upcoming `encode` calls that fail
    pub(crate) fail_next: usize,
    /// Delay of every `encode` call
    pub(crate) delay: Option<Duration>,
    pub(crate) params_log: Vec<TrialParams>,
    pub(crate) encode_calls: usize,
    /// `encode` calls running right now
    pub(crate) in_flight: usize,
    /// Peak of `in_flight`
    pub(crate) max_in_flight: usize,
}

/// Leaves the in-flight count when the `encode` future completes or is dropped.
struct InFlight<'a>(&'a SharedMockEngine);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.lock().in_flight -= 1;
    }
}

impl fmt::Debug for SharedMockEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedMockEngine")
    }
}

impl SharedMockEngine {
    pub(crate) fn new(
        size_model: impl Fn(&TrialParams) -> usize + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self(Mutex::new(MockEngine {
            sources: HashMap::new(),
            patterns: vec![],
            corrupt: HashSet::new(),
            size_model: Arc::new(size_model),
            fail_next: 0,
            delay: None,
            params_log: vec![],
            encode_calls: 0,
            in_flight: 0,
            max_in_flight: 0,
        })))
    }

    /// Sizes that fit into any realistic budget.
    pub(crate) fn tiny() -> Arc<Self> {
        Self::new(|_| 1000)
    }

    pub(crate) fn with_source(self: Arc<Self>, path: &str, info: MediaInfo) -> Arc<Self> {
        self.lock().sources.insert(path.into(), info);
        self
    }

    /// Overrides the probe of every file whose path contains `needle`,
    /// e.g. the staged outputs with random names.
    pub(crate) fn with_source_pattern(self: Arc<Self>, needle: &str, info: MediaInfo) -> Arc<Self> {
        self.lock().patterns.push((needle.to_owned(), info));
        self
    }

    pub(crate) fn with_corrupt_source(self: Arc<Self>, path: &str) -> Arc<Self> {
        self.lock().corrupt.insert(path.into());
        self
    }

    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, MockEngine> {
        self.0.lock().unwrap()
    }

    pub(crate) fn params_log(&self) -> Vec<TrialParams> {
        self.lock().params_log.clone()
    }
}

pub(crate) fn video_info(width: u32, height: u32, secs: f64) -> MediaInfo {
    MediaInfo {
        kind: MediaKind::Video,
        width,
        height,
        duration: Some(secs),
        frame_rate: Some(30.0),
        has_audio: true,
    }
}

pub(crate) fn image_info(width: u32, height: u32) -> MediaInfo {
    MediaInfo {
        kind: MediaKind::Image,
        width,
        height,
        duration: None,
        frame_rate: None,
        has_audio: false,
    }
}

/// `bitrate * seconds` with the given overshoot factor, but never less than
/// `floor_per_fps * fps` bytes. Approximates an encoder that can't go below
/// some size for a given frame rate.
pub(crate) fn video_size(params: &TrialParams, overshoot: f64, floor_per_fps: usize) -> usize {
    let RateControl::Bitrate(bitrate) = params.rate else {
        panic!("expected bitrate, got {params:?}");
    };
    let secs = params.window.unwrap().duration().as_secs_f64();
    let fps = params.fps.unwrap() as usize;

    let size = (bitrate as f64 * secs / 8.0 * overshoot) as usize;
    size.max(floor_per_fps * fps)
}

#[async_trait]
impl CodecEngine for SharedMockEngine {
    async fn encode(&self, _input: &Utf8Path, params: &TrialParams) -> Result<Vec<u8>> {
        let (delay, fail, len) = {
            let mut me = self.lock();
            me.encode_calls += 1;
            me.in_flight += 1;
            me.max_in_flight = me.max_in_flight.max(me.in_flight);

            let fail = me.fail_next > 0;
            me.fail_next = me.fail_next.saturating_sub(1);

            if !fail {
                me.params_log.push(params.clone());
            }

            (me.delay, fail, (me.size_model)(params))
        };

        let _in_flight = InFlight(self);

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if fail {
            bail!("Simulated ffmpeg crash");
        }

        Ok(vec![0; len])
    }

    async fn probe(&self, path: &Utf8Path) -> Result<MediaInfo> {
        let me = self.lock();

        if me.corrupt.contains(path) {
            bail!("Invalid data found when processing input `{path}`");
        }

        if let Some(info) = me.sources.get(path) {
            return Ok(info.clone());
        }

        if let Some((_, info)) = me
            .patterns
            .iter()
            .find(|(needle, _)| path.as_str().contains(needle.as_str()))
        {
            return Ok(info.clone());
        }

        let params = me
            .params_log
            .last()
            .with_context(|| format!("Invalid data found when processing input `{path}`"))?;

        let dims = params.output_dimensions();
        let kind = match params.container {
            Container::Webm => MediaKind::Video,
            Container::Png | Container::Webp => MediaKind::Image,
        };

        Ok(MediaInfo {
            kind,
            width: dims.width,
            height: dims.height,
            duration: params.window.map(|window| window.duration().as_secs_f64()),
            frame_rate: params.fps.map(f64::from),
            has_audio: !params.strip_audio,
        })
    }
}
