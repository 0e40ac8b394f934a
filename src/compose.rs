use kurbo::Rect;

use crate::assets::premultiply_rgba8_in_place;
use crate::blur::blur_mask;
use crate::composite::{blit_over, fill_rect_over, tint_mask_over};
use crate::config::RenderConfig;
use crate::core::{Canvas, FrameRGBA};
use crate::effects::{CaptionStyle, bob_offset, glow_pulse};
use crate::error::ReelResult;
use crate::story::StoryPage;
use crate::text::{FontSet, LineMask, measure_width, rasterize_line, wrap_greedy};

const CAPTION_BAND_ALPHA: u8 = 153; // 0.6 over the art
const TEXT_RGB: [u8; 3] = [255, 255, 255];
const GLOW_RGB: [u8; 3] = [255, 214, 120];

/// Letterbox placement of an image inside the canvas: aspect preserved,
/// centered on the shorter axis, remainder left to the background fill.
pub fn letterbox_rect(canvas: Canvas, image_width: u32, image_height: u32) -> Rect {
    let cw = f64::from(canvas.width);
    let ch = f64::from(canvas.height);
    let canvas_aspect = cw / ch;
    let image_aspect = f64::from(image_width) / f64::from(image_height);

    if image_aspect > canvas_aspect {
        let draw_h = cw / image_aspect;
        let y = (ch - draw_h) / 2.0;
        Rect::new(0.0, y, cw, y + draw_h)
    } else {
        let draw_w = ch * image_aspect;
        let x = (cw - draw_w) / 2.0;
        Rect::new(x, 0.0, x + draw_w, ch)
    }
}

/// One page's art, rescaled into its letterbox slot, in premultiplied RGBA8.
pub(crate) struct PlacedArt {
    pub(crate) x: i64,
    pub(crate) y: i64,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) rgba8_premul: Vec<u8>,
}

/// Everything the compositor needs to draw one page, prepared once before
/// rendering starts: placed art, wrapped caption lines rasterized to
/// coverage masks, and the page's resolved caption style.
pub struct PageVisual {
    pub(crate) art: PlacedArt,
    pub(crate) line_masks: Vec<LineMask>,
    pub(crate) style: CaptionStyle,
}

/// Pure frame compositor for the fixed story template: full-bleed
/// letterboxed art, optional crossfade look-ahead, lower-third caption band.
///
/// Stateless per frame; the only side effect of [`draw`] is mutating the
/// target frame.
///
/// [`draw`]: Compositor::draw
pub struct Compositor {
    canvas: Canvas,
    band_height: u32,
    font_px: f32,
    line_height: f32,
    bob_amplitude: f32,
}

impl Compositor {
    pub fn new(canvas: Canvas, config: &RenderConfig) -> Self {
        let band_height =
            ((f64::from(canvas.height) * f64::from(config.caption_band_fraction)).round() as u32)
                .max(1);
        let font_px = (canvas.height as f32 / 30.0).max(18.0);
        Self {
            canvas,
            band_height,
            font_px,
            line_height: font_px * 1.2,
            bob_amplitude: canvas.height as f32 / 180.0,
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Prepare one page for drawing: rescale its decoded image into the
    /// letterbox slot and rasterize its wrapped caption.
    pub fn prepare_page(
        &self,
        fonts: &FontSet,
        page: &StoryPage,
        image: &image::RgbaImage,
    ) -> PageVisual {
        let (iw, ih) = image.dimensions();
        let rect = letterbox_rect(self.canvas, iw, ih);
        let width = (rect.width().round() as u32).max(1);
        let height = (rect.height().round() as u32).max(1);

        let scaled = if (width, height) == (iw, ih) {
            image.clone()
        } else {
            image::imageops::resize(image, width, height, image::imageops::FilterType::CatmullRom)
        };
        let mut rgba8_premul = scaled.into_raw();
        premultiply_rgba8_in_place(&mut rgba8_premul);

        let style = CaptionStyle::parse(&page.text_effect);
        let font = fonts.face(style.face, style.weight);
        let max_text_width = (self.canvas.width as f32 - 40.0).max(self.font_px);
        let lines = wrap_greedy(&page.text, max_text_width, |candidate| {
            measure_width(font, candidate, self.font_px)
        });
        let line_masks = lines
            .iter()
            .map(|line| rasterize_line(font, line, self.font_px))
            .collect();

        PageVisual {
            art: PlacedArt {
                x: rect.x0.round() as i64,
                y: rect.y0.round() as i64,
                width,
                height,
                rgba8_premul,
            },
            line_masks,
            style,
        }
    }

    /// Draw one complete frame.
    ///
    /// The current page's art is drawn fully opaque; when a crossfade
    /// progress is given, the next page's art blends over it at that alpha.
    /// The caption always belongs to the current page and fades with
    /// `caption_opacity`; `elapsed_ms` drives the style waveforms.
    pub fn draw(
        &self,
        frame: &mut FrameRGBA,
        current: &PageVisual,
        next: Option<&PageVisual>,
        crossfade: Option<f32>,
        caption_opacity: f32,
        elapsed_ms: f64,
    ) -> ReelResult<()> {
        frame.clear_opaque_black();

        self.draw_art(frame, &current.art, 1.0);
        if let (Some(next), Some(progress)) = (next, crossfade) {
            self.draw_art(frame, &next.art, progress);
        }

        self.draw_caption(frame, current, caption_opacity, elapsed_ms)
    }

    fn draw_art(&self, frame: &mut FrameRGBA, art: &PlacedArt, opacity: f32) {
        blit_over(
            frame,
            &art.rgba8_premul,
            art.width,
            art.height,
            art.x,
            art.y,
            opacity,
        );
    }

    fn draw_caption(
        &self,
        frame: &mut FrameRGBA,
        page: &PageVisual,
        opacity: f32,
        elapsed_ms: f64,
    ) -> ReelResult<()> {
        if opacity <= 0.01 || page.line_masks.is_empty() {
            return Ok(());
        }

        let band_top = i64::from(self.canvas.height) - i64::from(self.band_height);
        fill_rect_over(
            frame,
            0,
            band_top,
            self.canvas.width,
            self.band_height,
            [0, 0, 0, CAPTION_BAND_ALPHA],
            opacity,
        );

        let bob = if page.style.bob {
            bob_offset(elapsed_ms) * self.bob_amplitude
        } else {
            0.0
        };

        let band_center = band_top as f32 + self.band_height as f32 / 2.0;
        let total_text_height = (page.line_masks.len() - 1) as f32 * self.line_height;
        let mut center_y = band_center - total_text_height / 2.0 + bob;

        for mask in &page.line_masks {
            let x = (i64::from(self.canvas.width) - i64::from(mask.width)) / 2;
            let y = (center_y - mask.height as f32 / 2.0).round() as i64;

            if page.style.glow {
                self.draw_glow(frame, mask, x, y, opacity, elapsed_ms)?;
            }
            tint_mask_over(frame, &mask.data, mask.width, mask.height, x, y, TEXT_RGB, opacity);
            center_y += self.line_height;
        }
        Ok(())
    }

    /// Blurred halo under a caption line; the radius breathes with the glow
    /// pulse.
    fn draw_glow(
        &self,
        frame: &mut FrameRGBA,
        mask: &LineMask,
        x: i64,
        y: i64,
        opacity: f32,
        elapsed_ms: f64,
    ) -> ReelResult<()> {
        let scale = self.canvas.height as f32 / 1080.0;
        let radius = ((4.0 + 4.0 * glow_pulse(elapsed_ms)) * scale).round().max(1.0) as u32;

        // Pad so the halo is not clipped at the mask's own edge.
        let pad = radius;
        let padded_w = mask.width + 2 * pad;
        let padded_h = mask.height + 2 * pad;
        let mut padded = vec![0u8; padded_w as usize * padded_h as usize];
        for row in 0..mask.height {
            let src = row as usize * mask.width as usize;
            let dst = (row + pad) as usize * padded_w as usize + pad as usize;
            padded[dst..dst + mask.width as usize]
                .copy_from_slice(&mask.data[src..src + mask.width as usize]);
        }

        let halo = blur_mask(&padded, padded_w, padded_h, radius, radius as f32 / 2.0)?;
        tint_mask_over(
            frame,
            &halo,
            padded_w,
            padded_h,
            x - i64::from(pad),
            y - i64::from(pad),
            GLOW_RGB,
            opacity * 0.85,
        );
        Ok(())
    }
}
