use std::path::PathBuf;
use std::time::Duration;

use crate::core::{Canvas, Fps};
use crate::error::{ReelError, ReelResult};

/// Fixed output filename for the exported video.
pub const DEFAULT_OUTPUT_FILENAME: &str = "bedtime-story.mp4";

/// Immutable configuration for one export operation.
///
/// Every tunable the render pipeline consults lives here and is passed in at
/// session construction; nothing is read from ambient module state, so two
/// sessions with different transition lengths can run back to back in tests.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RenderConfig {
    /// Cycle length of a page without narration, in milliseconds.
    pub page_duration_ms: u64,
    /// Length of the image crossfade at the tail of each page, in ms.
    pub transition_ms: u64,
    /// Length of the caption fade in/out window, in ms.
    pub caption_fade_ms: u64,
    /// Output frame rate.
    pub fps: Fps,
    /// Target video bitrate in bits per second.
    pub video_bits_per_second: u32,
    /// Longest output edge in pixels; the first page's image aspect ratio
    /// decides the other edge. Both edges are rounded down to even.
    pub max_edge: u32,
    /// Fraction of the canvas height covered by the caption band.
    pub caption_band_fraction: f32,
    /// Music gain when narration clips are mixed on top of it.
    pub music_gain_narrated: f32,
    /// Music gain when the story has no narration.
    pub music_gain_solo: f32,
    /// Sample rate of the offline mix, in Hz.
    pub mix_sample_rate: u32,
    /// Bound on each asset fetch; expiry surfaces as a distinct error kind.
    pub asset_timeout: Duration,
    /// Output file path.
    pub out_path: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_duration_ms: 10_000,
            transition_ms: 1_500,
            caption_fade_ms: 500,
            fps: Fps { num: 30, den: 1 },
            video_bits_per_second: 8_000_000,
            max_edge: 1920,
            caption_band_fraction: 0.25,
            music_gain_narrated: 0.12,
            music_gain_solo: 0.28,
            mix_sample_rate: 48_000,
            asset_timeout: Duration::from_secs(30),
            out_path: PathBuf::from(DEFAULT_OUTPUT_FILENAME),
            overwrite: true,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> ReelResult<()> {
        if self.page_duration_ms == 0 {
            return Err(ReelError::validation("page_duration_ms must be > 0"));
        }
        if self.transition_ms >= self.page_duration_ms {
            return Err(ReelError::validation(
                "transition_ms must be shorter than page_duration_ms",
            ));
        }
        if self.caption_fade_ms == 0 {
            return Err(ReelError::validation("caption_fade_ms must be > 0"));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if self.video_bits_per_second == 0 {
            return Err(ReelError::validation("video_bits_per_second must be > 0"));
        }
        if self.max_edge < 2 {
            return Err(ReelError::validation("max_edge must be >= 2"));
        }
        if !(self.caption_band_fraction > 0.0 && self.caption_band_fraction < 1.0) {
            return Err(ReelError::validation(
                "caption_band_fraction must be in (0, 1)",
            ));
        }
        for (name, gain) in [
            ("music_gain_narrated", self.music_gain_narrated),
            ("music_gain_solo", self.music_gain_solo),
        ] {
            if !(0.0..=1.0).contains(&gain) {
                return Err(ReelError::validation(format!(
                    "{name} must be within [0, 1]"
                )));
            }
        }
        if self.mix_sample_rate == 0 {
            return Err(ReelError::validation("mix_sample_rate must be > 0"));
        }
        if self.asset_timeout.is_zero() {
            return Err(ReelError::validation("asset_timeout must be > 0"));
        }
        Ok(())
    }

    /// Derive the output canvas from the first page's decoded image.
    ///
    /// The aspect ratio is preserved; the longest edge is clamped to
    /// `max_edge`; both edges are rounded down to even pixel counts as the
    /// yuv420p encode path requires.
    pub fn output_canvas(&self, image_width: u32, image_height: u32) -> ReelResult<Canvas> {
        if image_width == 0 || image_height == 0 {
            return Err(ReelError::validation(
                "output_canvas requires a non-empty first image",
            ));
        }

        let longest = image_width.max(image_height);
        let scale = if longest > self.max_edge {
            f64::from(self.max_edge) / f64::from(longest)
        } else {
            1.0
        };

        let w = round_down_even((f64::from(image_width) * scale).round() as u32);
        let h = round_down_even((f64::from(image_height) * scale).round() as u32);
        Canvas::new(w.max(2), h.max(2))
    }
}

fn round_down_even(v: u32) -> u32 {
    v & !1
}
