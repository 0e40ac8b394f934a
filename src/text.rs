use std::path::Path;

use anyhow::Context as _;

use crate::effects::{FontFace, FontWeight};
use crate::error::{ReelError, ReelResult};

/// Loaded caption faces. Bold and script faces are optional and fall back
/// to the regular face when absent.
pub struct FontSet {
    regular: fontdue::Font,
    bold: Option<fontdue::Font>,
    script: Option<fontdue::Font>,
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSet")
            .field("bold", &self.bold.is_some())
            .field("script", &self.script.is_some())
            .finish_non_exhaustive()
    }
}

impl FontSet {
    pub fn from_bytes(
        regular: &[u8],
        bold: Option<&[u8]>,
        script: Option<&[u8]>,
    ) -> ReelResult<Self> {
        Ok(Self {
            regular: parse_font(regular, "regular")?,
            bold: bold.map(|b| parse_font(b, "bold")).transpose()?,
            script: script.map(|b| parse_font(b, "script")).transpose()?,
        })
    }

    pub fn load(
        regular: impl AsRef<Path>,
        bold: Option<&Path>,
        script: Option<&Path>,
    ) -> ReelResult<Self> {
        let read = |path: &Path| -> ReelResult<Vec<u8>> {
            std::fs::read(path)
                .with_context(|| format!("read font file '{}'", path.display()))
                .map_err(ReelError::Other)
        };
        let regular_bytes = read(regular.as_ref())?;
        let bold_bytes = bold.map(read).transpose()?;
        let script_bytes = script.map(read).transpose()?;
        Self::from_bytes(
            &regular_bytes,
            bold_bytes.as_deref(),
            script_bytes.as_deref(),
        )
    }

    /// Resolve a caption style to a concrete face. Script wins over weight
    /// (there is no bold script face); missing faces fall back to regular.
    pub fn face(&self, face: FontFace, weight: FontWeight) -> &fontdue::Font {
        match face {
            FontFace::Script => self.script.as_ref().unwrap_or(&self.regular),
            FontFace::Regular => match weight {
                FontWeight::Bold => self.bold.as_ref().unwrap_or(&self.regular),
                FontWeight::Regular => &self.regular,
            },
        }
    }
}

fn parse_font(bytes: &[u8], which: &str) -> ReelResult<fontdue::Font> {
    fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
        .map_err(|e| ReelError::validation(format!("failed to parse {which} font: {e}")))
}

/// Advance width of `text` at `px`, in pixels.
pub fn measure_width(font: &fontdue::Font, text: &str, px: f32) -> f32 {
    text.chars()
        .map(|ch| font.metrics(ch, px).advance_width)
        .sum()
}

/// Greedy word wrap.
///
/// Words accumulate into a line until adding the next would exceed
/// `max_width`; a break only happens once at least one word is on the line,
/// so a single word wider than the limit occupies its own line. The final
/// partial line is always flushed. `measure` maps a candidate line to its
/// width, which keeps the algorithm independent of any font backend.
pub fn wrap_greedy<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };
        if measure(&candidate) > max_width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
            line = word.to_string();
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// One rasterized caption line as an 8-bit coverage mask.
pub struct LineMask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Rasterize a single line of text into a coverage mask.
///
/// Vertical extent comes from the font's line metrics when available, else
/// from per-glyph maxima. Overlapping glyphs combine by max coverage.
pub fn rasterize_line(font: &fontdue::Font, text: &str, px: f32) -> LineMask {
    let (ascent, descent) = match font.horizontal_line_metrics(px) {
        Some(m) => (m.ascent.ceil() as i32, (-m.descent).ceil() as i32),
        None => {
            let mut ascent = 0i32;
            let mut descent = 0i32;
            for ch in text.chars() {
                let m = font.metrics(ch, px);
                ascent = ascent.max(m.height as i32 + m.ymin);
                descent = descent.max(-m.ymin);
            }
            (ascent, descent)
        }
    };

    let width = measure_width(font, text, px).ceil().max(1.0) as u32;
    let height = (ascent + descent).max(1) as u32;
    let mut data = vec![0u8; width as usize * height as usize];

    let mut cursor_x = 0f32;
    for ch in text.chars() {
        let (metrics, bitmap) = font.rasterize(ch, px);
        let glyph_x = cursor_x.round() as i32 + metrics.xmin;
        let glyph_y = ascent - (metrics.height as i32 + metrics.ymin);

        for gy in 0..metrics.height {
            for gx in 0..metrics.width {
                let cov = bitmap[gy * metrics.width + gx];
                if cov == 0 {
                    continue;
                }
                let x = glyph_x + gx as i32;
                let y = glyph_y + gy as i32;
                if x >= 0 && (x as u32) < width && y >= 0 && (y as u32) < height {
                    let idx = y as usize * width as usize + x as usize;
                    data[idx] = data[idx].max(cov);
                }
            }
        }
        cursor_x += metrics.advance_width;
    }

    LineMask {
        width,
        height,
        data,
    }
}
