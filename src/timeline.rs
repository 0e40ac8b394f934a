use crate::config::RenderConfig;
use crate::error::{ReelError, ReelResult};
use crate::story::Story;

/// Timeline slot of one page: `[start_ms, start_ms + duration_ms)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PageTiming {
    pub start_ms: u64,
    pub duration_ms: u64,
}

/// Position of a global elapsed instant within the page sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub page: usize,
    pub time_into_page_ms: u64,
    pub page_duration_ms: u64,
    /// Whether a next page exists to crossfade into.
    pub has_next: bool,
}

/// Read-only timing table for one export, computed once at render start.
///
/// A narrated page lasts exactly as long as its narration clip; a silent
/// page lasts the configured fixed duration. Starts are the cumulative sum
/// of prior durations, so intervals are contiguous and non-overlapping by
/// construction.
#[derive(Clone, Debug)]
pub struct Timeline {
    timings: Vec<PageTiming>,
    total_ms: u64,
    transition_ms: u64,
    caption_fade_ms: u64,
}

impl Timeline {
    pub fn from_story(story: &Story, config: &RenderConfig) -> ReelResult<Self> {
        if story.pages.is_empty() {
            return Err(ReelError::validation("timeline requires at least one page"));
        }

        let mut timings = Vec::with_capacity(story.pages.len());
        let mut start_ms = 0u64;
        for (i, page) in story.pages.iter().enumerate() {
            let duration_ms = match &page.narration {
                Some(clip) => {
                    let ms = (clip.duration_secs * 1000.0).round();
                    if !ms.is_finite() || ms < 1.0 {
                        return Err(ReelError::validation(format!(
                            "page {i} narration duration rounds to zero milliseconds"
                        )));
                    }
                    ms as u64
                }
                None => config.page_duration_ms,
            };
            timings.push(PageTiming {
                start_ms,
                duration_ms,
            });
            start_ms += duration_ms;
        }

        Ok(Self {
            timings,
            total_ms: start_ms,
            transition_ms: config.transition_ms,
            caption_fade_ms: config.caption_fade_ms,
        })
    }

    pub fn timings(&self) -> &[PageTiming] {
        &self.timings
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }

    /// Find the page whose interval contains `elapsed_ms`.
    ///
    /// An instant equal to a page's start belongs to that page; `None`
    /// signals the end of the timeline (`elapsed_ms >= total_ms`). Stateless,
    /// so every animation tick recomputes from scratch and restarts are
    /// deterministic.
    pub fn locate(&self, elapsed_ms: u64) -> Option<Cursor> {
        if elapsed_ms >= self.total_ms {
            return None;
        }

        // Contiguity makes the last slot with start <= elapsed the match.
        let page = self
            .timings
            .partition_point(|t| t.start_ms <= elapsed_ms)
            .saturating_sub(1);
        let timing = self.timings[page];
        Some(Cursor {
            page,
            time_into_page_ms: elapsed_ms - timing.start_ms,
            page_duration_ms: timing.duration_ms,
            has_next: page + 1 < self.timings.len(),
        })
    }

    /// Crossfade window length for a page, clamped so pathologically short
    /// narrated pages still get a complete 0..1 ramp.
    fn transition_window_ms(&self, page_duration_ms: u64) -> u64 {
        self.transition_ms.min(page_duration_ms)
    }

    /// Progress through the trailing crossfade window, when inside it.
    ///
    /// `None` when the cursor is before the window or on the last page.
    /// The ramp is linear, clamped to `[0, 1]`, and reaches exactly 1.0 at
    /// the window's end.
    pub fn crossfade_progress(&self, cursor: Cursor) -> Option<f32> {
        if !cursor.has_next {
            return None;
        }
        let window = self.transition_window_ms(cursor.page_duration_ms);
        if window == 0 {
            return None;
        }
        let window_start = cursor.page_duration_ms - window;
        if cursor.time_into_page_ms < window_start {
            return None;
        }
        let progress =
            (cursor.time_into_page_ms - window_start) as f64 / window as f64;
        Some(progress.clamp(0.0, 1.0) as f32)
    }

    /// Caption opacity at the cursor.
    ///
    /// Ramps 0..1 over the fade window at the start of the page, and 1..0
    /// over the fade window at the head of the crossfade window, or against
    /// the page end when no crossfade follows.
    pub fn caption_opacity(&self, cursor: Cursor) -> f32 {
        let fade = self.caption_fade_ms as f64;
        let t = cursor.time_into_page_ms as f64;
        let duration = cursor.page_duration_ms as f64;

        let fade_in = (t / fade).clamp(0.0, 1.0);

        let fade_out = if cursor.has_next {
            let window = self.transition_window_ms(cursor.page_duration_ms) as f64;
            let window_start = duration - window;
            if t < window_start {
                1.0
            } else {
                (1.0 - (t - window_start) / fade).clamp(0.0, 1.0)
            }
        } else {
            ((duration - t) / fade).clamp(0.0, 1.0)
        };

        fade_in.min(fade_out) as f32
    }
}
