use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::assets::{AssetFetcher, load_page_images};
use crate::audio::{build_mix_plan, mix_plan, write_mix_to_f32le_file};
use crate::compose::{Compositor, PageVisual};
use crate::config::RenderConfig;
use crate::core::{Canvas, FrameIndex, FrameRGBA};
use crate::encode::{AudioInputConfig, FrameSink, SinkConfig};
use crate::encode_ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::error::{ReelError, ReelResult};
use crate::media::{TempFileGuard, decode_audio_bytes_f32_stereo, fresh_temp_path};
use crate::story::Story;
use crate::text::FontSet;
use crate::timeline::Timeline;

/// Coarse progress of one export, reported through a [`ProgressSink`].
///
/// Phases arrive in order with none skipped; the final event is always
/// `Done` or `Failed`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    Initializing,
    LoadingImages,
    MixingAudio,
    Encoding { elapsed_secs: u64, total_secs: u64 },
    Finalizing,
    Done,
    Failed { reason: String },
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "Initializing video tools..."),
            Self::LoadingImages => write!(f, "Loading illustrations..."),
            Self::MixingAudio => write!(f, "Mixing soundtrack..."),
            Self::Encoding {
                elapsed_secs,
                total_secs,
            } => write!(f, "Encoding: {elapsed_secs}s / {total_secs}s"),
            Self::Finalizing => write!(f, "Finalizing video..."),
            Self::Done => write!(f, "Video ready!"),
            Self::Failed { reason } => write!(f, "Export failed: {reason}"),
        }
    }
}

/// Observer channel for progress events. Closures qualify.
pub trait ProgressSink {
    fn report(&mut self, progress: &Progress);
}

impl<F: FnMut(&Progress)> ProgressSink for F {
    fn report(&mut self, progress: &Progress) {
        self(progress)
    }
}

/// Drops every progress event.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&mut self, _progress: &Progress) {}
}

/// Cooperative cancellation flag for one export.
///
/// Cancellation is a full abort: the encoder is torn down, partial output
/// removed, and the export returns [`ReelError::Canceled`]. There is no
/// pause/resume.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Summary of a completed export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportReport {
    pub frames_encoded: u64,
    pub total_ms: u64,
    pub canvas: Canvas,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Initializing,
    Rendering,
    Finalizing,
    Done,
}

/// One export operation: owns every per-export resource (decoded art,
/// mixed audio, the frame loop) and is consumed by [`run`].
///
/// The driver is deterministic: elapsed time is derived from the frame
/// index, the timeline locate/compose calls are pure functions of it, and
/// frames reach the sink in strictly increasing order.
///
/// [`run`]: ExportSession::run
pub struct ExportSession {
    story: Story,
    config: RenderConfig,
    fonts: FontSet,
    music_url: String,
    cancel: CancelToken,
}

impl std::fmt::Debug for ExportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportSession")
            .field("story", &self.story)
            .field("config", &self.config)
            .field("music_url", &self.music_url)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl ExportSession {
    pub fn new(
        story: Story,
        config: RenderConfig,
        fonts: FontSet,
        music_url: impl Into<String>,
    ) -> ReelResult<Self> {
        config.validate()?;
        story.validate()?;
        let music_url = music_url.into();
        if music_url.trim().is_empty() {
            return Err(ReelError::validation("music_url must be non-empty"));
        }
        Ok(Self {
            story,
            config,
            fonts,
            music_url,
            cancel: CancelToken::new(),
        })
    }

    /// Handle for aborting this export from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the export to completion.
    ///
    /// On any failure the sink is aborted (idempotent, discards partial
    /// output) and the final progress event reports the failure; the error
    /// itself is the return value.
    pub fn run(
        self,
        sink: &mut dyn FrameSink,
        progress: &mut dyn ProgressSink,
    ) -> ReelResult<ExportReport> {
        let result = self.run_inner(sink, progress);
        if let Err(e) = &result {
            sink.abort();
            progress.report(&Progress::Failed {
                reason: e.to_string(),
            });
        }
        result
    }

    fn run_inner(
        self,
        sink: &mut dyn FrameSink,
        progress: &mut dyn ProgressSink,
    ) -> ReelResult<ExportReport> {
        let mut phase = Phase::Initializing;
        debug!(?phase, "export starting");
        progress.report(&Progress::Initializing);
        self.check_cancel()?;

        let fetcher = AssetFetcher::new(self.config.asset_timeout)?;

        progress.report(&Progress::LoadingImages);
        let images = load_page_images(&fetcher, &self.story)?;
        self.check_cancel()?;

        let (first_w, first_h) = images[0].dimensions();
        let canvas = self.config.output_canvas(first_w, first_h)?;
        let compositor = Compositor::new(canvas, &self.config);
        let visuals: Vec<PageVisual> = self
            .story
            .pages
            .iter()
            .zip(&images)
            .map(|(page, image)| compositor.prepare_page(&self.fonts, page, image))
            .collect();
        drop(images);
        self.check_cancel()?;

        let timeline = Timeline::from_story(&self.story, &self.config)?;

        progress.report(&Progress::MixingAudio);
        let mix_guard = self.mix_soundtrack(&fetcher, &timeline)?;
        self.check_cancel()?;

        phase = Phase::Rendering;
        debug!(?phase, total_ms = timeline.total_ms(), "assets ready");
        sink.begin(SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps: self.config.fps,
            video_bits_per_second: self.config.video_bits_per_second,
            audio: Some(AudioInputConfig {
                path: mix_guard
                    .0
                    .clone()
                    .ok_or_else(|| ReelError::mixing("mixed audio path missing"))?,
                sample_rate: self.config.mix_sample_rate,
                channels: 2,
            }),
        })?;

        let total_ms = timeline.total_ms();
        let total_frames = self.config.fps.frames_covering_ms(total_ms);
        let total_secs = total_ms.div_ceil(1000);
        let mut frame = FrameRGBA::opaque_black(canvas);
        let mut last_progress_second = None::<u64>;

        for f in 0..total_frames {
            if self.cancel.is_canceled() {
                return Err(ReelError::Canceled);
            }

            let elapsed_ms = self.config.fps.frame_to_ms(f);
            let Some(cursor) = timeline.locate(elapsed_ms) else {
                break;
            };

            let crossfade = timeline.crossfade_progress(cursor);
            let caption_opacity = timeline.caption_opacity(cursor);
            let next = if cursor.has_next {
                visuals.get(cursor.page + 1)
            } else {
                None
            };

            compositor.draw(
                &mut frame,
                &visuals[cursor.page],
                next,
                crossfade,
                caption_opacity,
                elapsed_ms as f64,
            )?;
            sink.push_frame(FrameIndex(f), &frame)?;

            let second = elapsed_ms / 1000;
            if last_progress_second != Some(second) {
                progress.report(&Progress::Encoding {
                    elapsed_secs: second,
                    total_secs,
                });
                last_progress_second = Some(second);
            }
        }

        phase = Phase::Finalizing;
        debug!(?phase, frames = total_frames, "stopping encoder");
        progress.report(&Progress::Finalizing);
        sink.end()?;
        drop(mix_guard);

        phase = Phase::Done;
        info!(?phase, frames = total_frames, total_ms, "export complete");
        progress.report(&Progress::Done);

        Ok(ExportReport {
            frames_encoded: total_frames,
            total_ms,
            canvas,
        })
    }

    /// Fetch, decode, and offline-mix the full soundtrack; returns the guard
    /// holding the temp `f32le` path fed to the encoder.
    fn mix_soundtrack(
        &self,
        fetcher: &AssetFetcher,
        timeline: &Timeline,
    ) -> ReelResult<TempFileGuard> {
        let music_bytes = fetcher.fetch(&self.music_url, "background music")?;
        let music_pcm = decode_audio_bytes_f32_stereo(
            &music_bytes,
            self.config.mix_sample_rate,
            "background music",
        )?;

        let narration_pcms = if self.story.has_narration() {
            self.story
                .pages
                .iter()
                .enumerate()
                .map(|(i, page)| {
                    let clip = page
                        .narration
                        .as_ref()
                        .ok_or_else(|| ReelError::validation("narration missing after validate"))?;
                    let label = format!("page {i} narration");
                    let bytes = fetcher.fetch(&clip.audio_url, &label)?;
                    decode_audio_bytes_f32_stereo(&bytes, self.config.mix_sample_rate, &label)
                })
                .collect::<ReelResult<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let plan = build_mix_plan(timeline, &self.config, music_pcm, narration_pcms)?;
        let mixed = mix_plan(&plan);
        let path = fresh_temp_path("mix", "f32le");
        write_mix_to_f32le_file(&mixed, &path)?;
        debug!(samples = mixed.len(), path = %path.display(), "soundtrack mixed");
        Ok(TempFileGuard(Some(path)))
    }

    fn check_cancel(&self) -> ReelResult<()> {
        if self.cancel.is_canceled() {
            return Err(ReelError::Canceled);
        }
        Ok(())
    }
}

/// Export a story to the configured MP4 file via the system `ffmpeg`.
pub fn export_story(
    story: Story,
    config: RenderConfig,
    fonts: FontSet,
    music_url: impl Into<String>,
    progress: &mut dyn ProgressSink,
) -> ReelResult<ExportReport> {
    let opts = FfmpegSinkOpts {
        out_path: config.out_path.clone(),
        overwrite: config.overwrite,
    };
    let session = ExportSession::new(story, config, fonts, music_url)?;
    let mut sink = FfmpegSink::new(opts);
    session.run(&mut sink, progress)
}
