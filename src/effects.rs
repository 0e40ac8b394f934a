//! Caption styling: the free-form descriptor produced by the story
//! generator is translated into a tagged style exactly once, at story
//! preparation time; the compositor only ever sees the tagged form.

/// Typeface selection for the caption.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FontFace {
    #[default]
    Regular,
    /// Script-style face for "handwritten" captions.
    Script,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

/// Resolved caption style for one page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CaptionStyle {
    pub face: FontFace,
    pub weight: FontWeight,
    /// Oscillating warm glow halo behind the text.
    pub glow: bool,
    /// Gentle vertical bob of the caption baseline.
    pub bob: bool,
}

impl CaptionStyle {
    /// Translate a free-form style descriptor into a tagged style.
    ///
    /// Matching is case-insensitive substring search. Rules compose: later
    /// rules override face/weight, motion offsets add.
    pub fn parse(descriptor: &str) -> Self {
        let d = descriptor.to_ascii_lowercase();
        let mut style = Self::default();

        if d.contains("sparkl") || d.contains("golden") {
            style.glow = true;
        }
        if d.contains("float") || d.contains("gentle") {
            style.bob = true;
        }
        if d.contains("handwritten") || d.contains("cursive") {
            style.face = FontFace::Script;
        }
        if d.contains("bold") || d.contains("adventurous") || d.contains("grand") {
            style.weight = FontWeight::Bold;
        }
        style
    }
}

/// Glow intensity pulse in `[0, 1]`, ~3 rad/s against elapsed time.
pub fn glow_pulse(elapsed_ms: f64) -> f32 {
    (0.5 + 0.5 * (elapsed_ms * 0.003).sin()) as f32
}

/// Vertical bob offset in `[-1, 1]`; the compositor scales it to pixels.
pub fn bob_offset(elapsed_ms: f64) -> f32 {
    (elapsed_ms * 0.002).sin() as f32
}
