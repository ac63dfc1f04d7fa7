//! Text rasterization onto a [`Canvas`](crate::Canvas).
//!
//! Shaping and glyph rendering go through cosmic-text. The font database is
//! loaded the first time text is drawn, so sessions that never draw text do
//! not pay for a system font scan.

use cosmic_text::{Attrs, Buffer, FontSystem, Metrics, Shaping, SwashCache};
use easel_core::Color;
use easel_core::logging::targets;

use crate::canvas::Canvas;

/// Line height as a multiple of the font size.
const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Lazily initialized font state owned by the UI thread.
#[derive(Default)]
pub struct TextRenderer {
    fonts: Option<(FontSystem, SwashCache)>,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the font database has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.fonts.is_some()
    }

    /// Whether any font is available, loading the database if needed.
    pub fn has_fonts(&mut self) -> bool {
        let (font_system, _) = self.fonts();
        !font_system.db().is_empty()
    }

    fn fonts(&mut self) -> &mut (FontSystem, SwashCache) {
        self.fonts.get_or_insert_with(|| {
            tracing::debug!(target: targets::BACKEND, "loading font database");
            (FontSystem::new(), SwashCache::new())
        })
    }

    /// Draw `text` with its top-left corner at `(x, y)`, `size` pixels high.
    ///
    /// Glyph coverage is blended over the existing canvas contents. Empty
    /// strings and non-positive sizes draw nothing.
    pub fn draw(&mut self, canvas: &mut Canvas, text: &str, x: i32, y: i32, size: f32, color: Color) {
        if text.is_empty() || size.is_nan() || size <= 0.0 {
            return;
        }

        let (font_system, swash_cache) = self.fonts();

        let metrics = Metrics::new(size, size * LINE_HEIGHT_FACTOR);
        let mut buffer = Buffer::new(font_system, metrics);
        buffer.set_size(font_system, None, None);
        buffer.set_text(font_system, text, Attrs::new(), Shaping::Advanced);
        buffer.shape_until_scroll(font_system, false);

        let ink = cosmic_text::Color::rgb(color.r, color.g, color.b);
        buffer.draw(font_system, swash_cache, ink, |gx, gy, w, h, glyph| {
            let alpha = glyph.a();
            if alpha == 0 {
                return;
            }
            let shade = Color::rgb(glyph.r(), glyph.g(), glyph.b());
            let left = x.saturating_add(gx);
            let top = y.saturating_add(gy);
            for dy in 0..h as i32 {
                for dx in 0..w as i32 {
                    canvas.blend_pixel(left.saturating_add(dx), top.saturating_add(dy), shade, alpha);
                }
            }
        });
    }
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
