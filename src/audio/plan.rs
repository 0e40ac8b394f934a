use std::sync::Arc;

use crate::config::RenderConfig;
use crate::error::{ReelError, ReelResult};
use crate::media::AudioPcm;
use crate::timeline::Timeline;

/// One scheduled audio contribution in timeline sample space.
#[derive(Clone, Debug)]
pub struct AudioSegment {
    pub timeline_start_sample: u64,
    pub timeline_end_sample: u64,
    /// Linear gain applied to every source sample.
    pub gain: f32,
    /// Looping sources wrap modulo their length; un-looped sources go
    /// silent once exhausted.
    pub looped: bool,
    pub pcm: Arc<AudioPcm>,
}

/// Audio rendering plan spanning `[0, total_samples)` at a fixed rate.
#[derive(Clone, Debug)]
pub struct MixPlan {
    pub sample_rate: u32,
    pub channels: u16,
    pub total_samples: u64,
    pub segments: Vec<AudioSegment>,
}

/// Convert a timeline offset in milliseconds to the nearest sample index.
pub fn ms_to_sample(ms: u64, sample_rate: u32) -> u64 {
    let num = u128::from(ms) * u128::from(sample_rate) + 500;
    (num / 1000) as u64
}

/// Build the mix plan for one export.
///
/// The music bed spans the whole timeline, looping, ducked under narration
/// when any is present. Each narration clip starts exactly at its page's
/// start offset at full gain, un-looped.
pub fn build_mix_plan(
    timeline: &Timeline,
    config: &RenderConfig,
    music: AudioPcm,
    narration: Vec<AudioPcm>,
) -> ReelResult<MixPlan> {
    let sample_rate = config.mix_sample_rate;
    let total_samples = ms_to_sample(timeline.total_ms(), sample_rate);
    if total_samples == 0 {
        return Err(ReelError::mixing("mix plan covers zero samples"));
    }
    if music.frames() == 0 {
        return Err(ReelError::mixing("music track decoded to zero samples"));
    }

    let narrated = !narration.is_empty();
    if narrated && narration.len() != timeline.timings().len() {
        return Err(ReelError::mixing(format!(
            "narration clip count {} does not match page count {}",
            narration.len(),
            timeline.timings().len()
        )));
    }

    let music_gain = if narrated {
        config.music_gain_narrated
    } else {
        config.music_gain_solo
    };

    let mut segments = vec![AudioSegment {
        timeline_start_sample: 0,
        timeline_end_sample: total_samples,
        gain: music_gain,
        looped: true,
        pcm: Arc::new(music),
    }];

    for (i, (timing, pcm)) in timeline.timings().iter().zip(narration).enumerate() {
        if pcm.frames() == 0 {
            return Err(ReelError::mixing(format!(
                "page {i} narration decoded to zero samples"
            )));
        }
        let start = ms_to_sample(timing.start_ms, sample_rate);
        let clip_end = start + pcm.frames() as u64;
        segments.push(AudioSegment {
            timeline_start_sample: start,
            timeline_end_sample: clip_end.min(total_samples),
            gain: 1.0,
            looped: false,
            pcm: Arc::new(pcm),
        });
    }

    Ok(MixPlan {
        sample_rate,
        channels: 2,
        total_samples,
        segments,
    })
}
