use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ReelError, ReelResult};

/// Decoded interleaved floating-point PCM.
#[derive(Clone, Debug)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count (always 2 out of the decoder).
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.interleaved_f32.len() / usize::from(self.channels)
    }
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Decode an audio file to stereo interleaved `f32` PCM at `sample_rate`.
///
/// Shells out to the system `ffmpeg` so any container/codec the tool
/// understands works. The decoded stream must be non-empty: a story's music
/// or narration asset with no audio is a mixing failure, not a silent track.
pub fn decode_audio_f32_stereo(
    path: &Path,
    sample_rate: u32,
    label: &str,
) -> ReelResult<AudioPcm> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelError::mixing(format!("{label}: failed to run ffmpeg: {e}")))?;

    if !out.status.success() {
        return Err(ReelError::mixing(format!(
            "{label}: ffmpeg audio decode failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    if !out.stdout.len().is_multiple_of(4) {
        return Err(ReelError::mixing(format!(
            "{label}: decoded audio byte length is not aligned to f32 samples"
        )));
    }
    if out.stdout.is_empty() {
        return Err(ReelError::mixing(format!(
            "{label}: asset contains no audio"
        )));
    }

    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: pcm,
    })
}

/// Decode in-memory audio bytes by staging them through a temp file.
pub fn decode_audio_bytes_f32_stereo(
    bytes: &[u8],
    sample_rate: u32,
    label: &str,
) -> ReelResult<AudioPcm> {
    let path = fresh_temp_path("audio_src", "bin");
    std::fs::write(&path, bytes)
        .map_err(|e| ReelError::mixing(format!("{label}: failed to stage audio bytes: {e}")))?;
    let guard = TempFileGuard(Some(path.clone()));
    let pcm = decode_audio_f32_stereo(&path, sample_rate, label)?;
    drop(guard);
    Ok(pcm)
}

/// Build a process-unique temp path under the system temp directory.
pub fn fresh_temp_path(stem: &str, ext: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "storyreel_{stem}_{}_{n}.{ext}",
        std::process::id()
    ))
}

/// Removes its file on drop; drops on every exit path, so failed exports
/// leave no staged audio behind.
pub struct TempFileGuard(pub Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
