use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;

use super::layout::{CaptionLine, CaptionSurface, TextMeasure};

/// Measures text with a real font's advances and kerning.
pub struct FontMeasure<'a> {
    font: &'a FontArc,
}

impl<'a> FontMeasure<'a> {
    pub fn new(font: &'a FontArc) -> Self {
        Self { font }
    }
}

impl TextMeasure for FontMeasure<'_> {
    fn width(&self, text: &str, font_size: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(font_size));
        let mut width = 0.0;
        let mut previous = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }
        width
    }
}

/// Draws captions onto an RGBA canvas.
pub struct RasterSurface<'a> {
    canvas: &'a mut RgbaImage,
    font: &'a FontArc,
    fill: Rgba<u8>,
    stroke: Rgba<u8>,
}

impl<'a> RasterSurface<'a> {
    pub fn new(
        canvas: &'a mut RgbaImage,
        font: &'a FontArc,
        fill: Rgba<u8>,
        stroke: Rgba<u8>,
    ) -> Self {
        Self {
            canvas,
            font,
            fill,
            stroke,
        }
    }

    /// Top-left origin of a line, as `draw_text_mut` expects it.
    fn origin(&self, line: &CaptionLine, font_size: f32) -> (i32, i32) {
        let width = FontMeasure::new(self.font).width(&line.text, font_size);
        let ascent = self.font.as_scaled(PxScale::from(font_size)).ascent();
        let x = (line.center_x - width / 2.0).round() as i32;
        let y = (line.baseline - ascent).round() as i32;
        (x, y)
    }

    fn draw_at(&mut self, color: Rgba<u8>, x: i32, y: i32, font_size: f32, text: &str) {
        draw_text_mut(
            &mut *self.canvas,
            color,
            x,
            y,
            PxScale::from(font_size),
            self.font,
            text,
        );
    }
}

impl CaptionSurface for RasterSurface<'_> {
    // No outline primitive exists for glyphs here, so the run is stamped at
    // every offset on a disc of half the stroke width.
    fn stroke_text(&mut self, line: &CaptionLine, font_size: f32, stroke_width: f32) {
        let (x, y) = self.origin(line, font_size);
        let radius = (stroke_width / 2.0).ceil().max(1.0) as i32;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy > radius * radius || (dx == 0 && dy == 0) {
                    continue;
                }
                self.draw_at(self.stroke, x + dx, y + dy, font_size, &line.text);
            }
        }
    }

    fn fill_text(&mut self, line: &CaptionLine, font_size: f32) {
        let (x, y) = self.origin(line, font_size);
        self.draw_at(self.fill, x, y, font_size, &line.text);
    }
}
