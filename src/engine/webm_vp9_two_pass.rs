use super::{args, TrialParams};
use crate::prelude::*;
use crate::util::cmd;

/// Average bitrate VP9 encoding into webm with two passes as described in
/// <https://trac.ffmpeg.org/wiki/Encode/VP9>. The first pass only collects
/// statistics into the pass log, the second one produces the output.
pub(super) struct TwoPassContext {
    prefix_args: Vec<String>,
    pass_log_file: Utf8PathBuf,
    output: Utf8PathBuf,
}

impl TwoPassContext {
    pub(super) fn new(input: &Utf8Path, params: &TrialParams, work_dir: &Utf8Path) -> Result<Self> {
        Ok(Self {
            prefix_args: args::video_prefix(input, params)?,
            pass_log_file: work_dir.join("ffmpeg2pass"),
            output: work_dir.join("output.webm"),
        })
    }

    fn make_args(&self, trailing_args: &[&str]) -> Vec<String> {
        args::strs(&self.prefix_args)
            .chain(args::strs(["-passlogfile", self.pass_log_file.as_str()]))
            .chain(args::strs(trailing_args))
            .collect()
    }

    pub(super) async fn run(&self) -> Result<Vec<u8>> {
        let null_output = if cfg!(windows) { "NUL" } else { "/dev/null" };

        cmd::ffmpeg(self.make_args(&["-pass", "1", "-f", "null", null_output]))
            .await
            .context("The first pass failed")?;

        // The output goes to a file rather than `stdout`, the webm muxer
        // can't seek back in a pipe to write the duration and cues.
        cmd::ffmpeg(self.make_args(&["-pass", "2", self.output.as_str()]))
            .await
            .context("The second pass failed")?;

        fs::read(&self.output).await.err_into()
    }
}
