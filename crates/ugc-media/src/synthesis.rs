//! Still-to-video synthesis via FFmpeg.
//!
//! Encodes a single still into a short looped clip under the fixed policy
//! parameters. One attempt per invocation; on any failure the caller gets
//! an error and no bytes, never a partial container.

use std::time::Instant;

use metrics::histogram;
use tracing::{debug, info};

use ugc_models::VideoSynthesisParameters;

use crate::command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Scratch file names inside the per-call temp directory.
const INPUT_NAME: &str = "input.png";
const OUTPUT_NAME: &str = "output.mp4";

/// Hard ceiling on one encode; a 12 second still loop should finish in
/// seconds even on constrained hosts.
const ENCODE_TIMEOUT_SECS: u64 = 120;

/// FFmpeg-backed still-to-video encoder.
pub struct VideoSynthesizer {
    runner: FfmpegRunner,
}

impl VideoSynthesizer {
    /// Create a synthesizer, verifying the encoder is available.
    ///
    /// Fails with [`MediaError::SynthesisFailed`] when FFmpeg cannot be
    /// found, so a missing encoder surfaces at initialization rather than
    /// mid-request.
    pub fn new() -> MediaResult<Self> {
        let ffmpeg = check_ffmpeg().map_err(|_| {
            MediaError::synthesis_failed("encoder unavailable: ffmpeg not in PATH", None)
        })?;
        info!(ffmpeg = %ffmpeg.display(), "Video synthesizer initialized");

        Ok(Self {
            runner: FfmpegRunner::new().with_timeout(ENCODE_TIMEOUT_SECS),
        })
    }

    /// Encode `still` into a looped clip and return the MP4 bytes.
    pub async fn synthesize(
        &self,
        still: &[u8],
        params: &VideoSynthesisParameters,
    ) -> MediaResult<Vec<u8>> {
        let started = Instant::now();

        let scratch = tempfile::tempdir()?;
        let input_path = scratch.path().join(INPUT_NAME);
        let output_path = scratch.path().join(OUTPUT_NAME);

        tokio::fs::write(&input_path, still).await?;

        let cmd = FfmpegCommand::new(&input_path, &output_path)
            .loop_still()
            .read_duration(params.duration_seconds)
            .output_args(params.to_ffmpeg_args());

        self.runner.run(&cmd).await.map_err(|e| match e {
            MediaError::FfmpegFailed {
                message,
                stderr,
                exit_code: _,
            } => MediaError::synthesis_failed(message, stderr),
            MediaError::FfmpegNotFound => {
                MediaError::synthesis_failed("encoder unavailable: ffmpeg not in PATH", None)
            }
            other => other,
        })?;

        let bytes = tokio::fs::read(&output_path).await.map_err(|e| {
            MediaError::synthesis_failed(format!("encoded output missing: {}", e), None)
        })?;
        if bytes.is_empty() {
            return Err(MediaError::synthesis_failed("encoder produced no output", None));
        }

        let elapsed = started.elapsed().as_secs_f64();
        histogram!("ugc_ffmpeg_duration_seconds").record(elapsed);
        debug!(
            bytes = bytes.len(),
            duration_seconds = params.duration_seconds,
            frame_rate = params.frame_rate,
            elapsed_secs = elapsed,
            "Synthesis completed"
        );

        Ok(bytes)
    }
}
