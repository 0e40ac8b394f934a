use std::path::Path;

use crate::audio::plan::{AudioSegment, MixPlan};
use crate::error::{ReelError, ReelResult};

/// Offline-render the plan into interleaved output PCM.
///
/// All sources sum into one shared stereo buffer; the final pass clamps to
/// ±1.0 so simultaneous music and narration cannot clip past full scale.
pub fn mix_plan(plan: &MixPlan) -> Vec<f32> {
    let frames = plan.total_samples as usize;
    let mut out = vec![0.0f32; frames * usize::from(plan.channels)];

    for seg in &plan.segments {
        mix_segment(&mut out, plan, seg);
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    out
}

fn mix_segment(out: &mut [f32], plan: &MixPlan, seg: &AudioSegment) {
    let src = &seg.pcm.interleaved_f32;
    let src_channels = usize::from(seg.pcm.channels);
    let src_frames = src.len() / src_channels;
    if src_frames == 0 || seg.gain <= 0.0 {
        return;
    }

    let end = seg.timeline_end_sample.min(plan.total_samples);
    for dst_sample in seg.timeline_start_sample..end {
        let rel = (dst_sample - seg.timeline_start_sample) as usize;
        let src_frame = if seg.looped {
            rel % src_frames
        } else if rel < src_frames {
            rel
        } else {
            break;
        };

        let (l, r) = if src_channels == 1 {
            let v = src[src_frame];
            (v, v)
        } else {
            let i = src_frame * src_channels;
            (src[i], src[i + 1])
        };

        let dst_idx = dst_sample as usize * usize::from(plan.channels);
        out[dst_idx] += l * seg.gain;
        if plan.channels > 1 {
            out[dst_idx + 1] += r * seg.gain;
        }
    }
}

/// Write interleaved `f32` PCM samples as a raw little-endian `.f32le` file.
pub fn write_mix_to_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> ReelResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ReelError::mixing(format!(
                "failed to create audio mix output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ReelError::mixing(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::AudioPcm;
    use std::sync::Arc;

    fn pcm(samples: Vec<f32>, channels: u16) -> Arc<AudioPcm> {
        Arc::new(AudioPcm {
            sample_rate: 48_000,
            channels,
            interleaved_f32: samples,
        })
    }

    fn plan_with(total_samples: u64, segments: Vec<AudioSegment>) -> MixPlan {
        MixPlan {
            sample_rate: 48_000,
            channels: 2,
            total_samples,
            segments,
        }
    }

    #[test]
    fn looping_music_wraps_past_its_source_length() {
        // Source of 2 frames: [1, 1], [-1, -1]; rendered over 5 frames.
        let seg = AudioSegment {
            timeline_start_sample: 0,
            timeline_end_sample: 5,
            gain: 0.5,
            looped: true,
            pcm: pcm(vec![1.0, 1.0, -1.0, -1.0], 2),
        };
        let out = mix_plan(&plan_with(5, vec![seg]));
        let left: Vec<f32> = out.iter().step_by(2).copied().collect();
        assert_eq!(left, vec![0.5, -0.5, 0.5, -0.5, 0.5]);
    }

    #[test]
    fn unlooped_narration_goes_silent_after_its_clip() {
        let seg = AudioSegment {
            timeline_start_sample: 1,
            timeline_end_sample: 5,
            gain: 1.0,
            looped: false,
            pcm: pcm(vec![0.25, 0.25, 0.25, 0.25], 2),
        };
        let out = mix_plan(&plan_with(5, vec![seg]));
        let left: Vec<f32> = out.iter().step_by(2).copied().collect();
        assert_eq!(left, vec![0.0, 0.25, 0.25, 0.0, 0.0]);
    }

    #[test]
    fn sources_sum_and_clamp_to_full_scale() {
        let loud = |gain| AudioSegment {
            timeline_start_sample: 0,
            timeline_end_sample: 2,
            gain,
            looped: true,
            pcm: pcm(vec![0.8, 0.8], 2),
        };
        let out = mix_plan(&plan_with(2, vec![loud(1.0), loud(1.0)]));
        assert!(out.iter().all(|&s| s <= 1.0));
        assert_eq!(out[0], 1.0);
    }

    #[test]
    fn mono_sources_render_to_both_channels() {
        let seg = AudioSegment {
            timeline_start_sample: 0,
            timeline_end_sample: 2,
            gain: 1.0,
            looped: false,
            pcm: pcm(vec![0.3, -0.3], 1),
        };
        let out = mix_plan(&plan_with(2, vec![seg]));
        assert_eq!(out, vec![0.3, 0.3, -0.3, -0.3]);
    }

    #[test]
    fn f32le_file_round_trips_sample_bytes() {
        let samples = vec![0.0f32, 0.5, -1.0];
        let path = crate::media::fresh_temp_path("mix_test", "f32le");
        write_mix_to_f32le_file(&samples, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(bytes.len(), samples.len() * 4);
        let back: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(back, samples);
    }
}
