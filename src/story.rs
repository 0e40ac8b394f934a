use crate::error::{ReelError, ReelResult};

/// One narration clip attached to a page: where the audio lives and how long
/// it plays. The duration is reported by the narration collaborator and
/// drives the page's timeline slot.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct NarrationClip {
    pub audio_url: String,
    pub duration_secs: f64,
}

/// One unit of the story: caption text, an illustration, a free-form style
/// descriptor for the caption, and an optional narration clip.
///
/// Pages are immutable once constructed; the generation collaborator appends
/// them to a [`Story`] in order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StoryPage {
    pub text: String,
    /// Image source: a `data:` URI, an `http(s)` URL, or a local path.
    pub image_url: String,
    /// Free-form style keywords for the caption, e.g. "sparkling golden text".
    #[serde(default)]
    pub text_effect: String,
    #[serde(default)]
    pub narration: Option<NarrationClip>,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Story {
    #[serde(default)]
    pub title: String,
    pub pages: Vec<StoryPage>,
}

impl Story {
    pub fn new(title: impl Into<String>, pages: Vec<StoryPage>) -> Self {
        Self {
            title: title.into(),
            pages,
        }
    }

    /// Whether this story is narrated. Only meaningful after [`validate`]
    /// has established that narration presence is uniform.
    ///
    /// [`validate`]: Story::validate
    pub fn has_narration(&self) -> bool {
        self.pages
            .first()
            .is_some_and(|p| p.narration.is_some())
    }

    /// Check the invariants the render pipeline relies on.
    ///
    /// Narration must be present on all pages or on none: mixed sequences
    /// have no defined timeline semantics and are rejected here rather than
    /// guessed at per page.
    pub fn validate(&self) -> ReelResult<()> {
        if self.pages.is_empty() {
            return Err(ReelError::validation("story must have at least one page"));
        }

        let narrated = self.pages[0].narration.is_some();
        for (i, page) in self.pages.iter().enumerate() {
            if page.text.trim().is_empty() {
                return Err(ReelError::validation(format!(
                    "page {i} has an empty caption"
                )));
            }
            if page.image_url.trim().is_empty() {
                return Err(ReelError::validation(format!(
                    "page {i} has an empty image source"
                )));
            }
            if page.narration.is_some() != narrated {
                return Err(ReelError::validation(format!(
                    "page {i} breaks the all-or-none narration invariant \
                     (mixed narrated/silent stories are unsupported)"
                )));
            }
            if let Some(clip) = &page.narration {
                if clip.audio_url.trim().is_empty() {
                    return Err(ReelError::validation(format!(
                        "page {i} narration has an empty audio source"
                    )));
                }
                if !clip.duration_secs.is_finite() || clip.duration_secs <= 0.0 {
                    return Err(ReelError::validation(format!(
                        "page {i} narration duration must be finite and > 0"
                    )));
                }
            }
        }
        Ok(())
    }
}
