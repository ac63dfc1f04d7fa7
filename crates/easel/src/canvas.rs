//! CPU raster canvas backing the host window.
//!
//! Pixels are stored as `0x00RRGGBB` words, row-major, which is the layout
//! window surfaces expect, so presenting is a straight copy. Every primitive
//! clips against the canvas bounds; shapes that fall partly or wholly outside
//! are cut, never rejected.

use easel_core::Color;

/// A fixed-size pixel buffer with simple drawing primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Canvas {
    /// Create a canvas filled with `background`.
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![background.to_u32(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw pixel buffer.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// The color at `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|i| Color::from_u32(self.pixels[i]))
    }

    /// Change the canvas size, keeping the overlapping top-left region and
    /// filling new area with `background`.
    pub fn resize(&mut self, width: u32, height: u32, background: Color) {
        if width == self.width && height == self.height {
            return;
        }
        let mut resized = Canvas::new(width, height, background);
        let copy_w = self.width.min(width) as usize;
        for row in 0..self.height.min(height) as usize {
            let src = row * self.width as usize;
            let dst = row * width as usize;
            resized.pixels[dst..dst + copy_w].copy_from_slice(&self.pixels[src..src + copy_w]);
        }
        *self = resized;
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Set a single pixel; ignored outside the canvas.
    #[inline]
    pub fn put_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color.to_u32();
        }
    }

    /// Blend `color` onto the pixel at `(x, y)` with `alpha` coverage.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color, alpha: u8) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        let blended = match alpha {
            0 => return,
            255 => color,
            a => color.blend_over(Color::from_u32(self.pixels[i]), a),
        };
        self.pixels[i] = blended.to_u32();
    }

    /// Fill the whole canvas.
    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color.to_u32());
    }

    /// Fill the `width` x `height` rectangle whose top-left corner is `(x, y)`.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        if width <= 0 || height <= 0 {
            return;
        }
        let (x, y) = (i64::from(x), i64::from(y));
        self.fill_area(x, y, x + i64::from(width), y + i64::from(height), color);
    }

    /// Fill the half-open area `[x0, x1) x [y0, y1)`, clipped to the canvas.
    ///
    /// Coordinates are `i64` so callers can offset any `i32` input without
    /// overflowing.
    fn fill_area(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
        let x0 = x0.max(0);
        let y0 = y0.max(0);
        let x1 = x1.min(i64::from(self.width));
        let y1 = y1.min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let pixel = color.to_u32();
        let stride = self.width as usize;
        for row in y0 as usize..y1 as usize {
            let start = row * stride;
            self.pixels[start + x0 as usize..start + x1 as usize].fill(pixel);
        }
    }

    /// Rows `cy - r ..= cy + r` that land on the canvas, as offsets from `cy`.
    fn visible_rows(&self, cy: i64, r: i64) -> std::ops::RangeInclusive<i64> {
        let first = (-r).max(-cy);
        let last = r.min(i64::from(self.height) - 1 - cy);
        first..=last
    }

    /// Outline a rectangle with lines `thickness` pixels wide, drawn inside its bounds.
    pub fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color, thickness: u32) {
        if width <= 0 || height <= 0 {
            return;
        }
        let (x, y) = (i64::from(x), i64::from(y));
        let (right, bottom) = (x + i64::from(width), y + i64::from(height));
        let t = i64::from(thickness.max(1));
        if 2 * t >= i64::from(width) || 2 * t >= i64::from(height) {
            self.fill_area(x, y, right, bottom, color);
            return;
        }
        self.fill_area(x, y, right, y + t, color);
        self.fill_area(x, bottom - t, right, bottom, color);
        self.fill_area(x, y + t, x + t, bottom - t, color);
        self.fill_area(right - t, y + t, right, bottom - t, color);
    }

    /// Fill a circle of `radius` centred at `(cx, cy)`.
    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Color) {
        if radius < 0 {
            return;
        }
        let (cx, cy, r) = (i64::from(cx), i64::from(cy), i64::from(radius));
        let outer = r * r + r;
        for dy in self.visible_rows(cy, r) {
            if let Some(dx) = half_width(outer, dy * dy) {
                self.fill_area(cx - dx, cy + dy, cx + dx + 1, cy + dy + 1, color);
            }
        }
    }

    /// Outline a circle of `radius` centred at `(cx, cy)` with a ring `thickness`
    /// pixels wide, drawn inward from the radius.
    pub fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Color, thickness: u32) {
        if radius < 0 {
            return;
        }
        let (cx, cy, r) = (i64::from(cx), i64::from(cy), i64::from(radius));
        let t = i64::from(thickness.max(1)).min(r + 1);
        let outer = r * r + r;
        let inner_r = r - t;
        let inner = if inner_r >= 0 {
            inner_r * inner_r + inner_r
        } else {
            -1
        };

        for dy in self.visible_rows(cy, r) {
            let dy2 = dy * dy;
            let Some(a) = half_width(outer, dy2) else {
                continue;
            };
            let y = cy + dy;
            match half_width(inner, dy2) {
                // The row crosses the hole: two spans, one each side.
                Some(b) => {
                    self.fill_area(cx - a, y, cx - b, y + 1, color);
                    self.fill_area(cx + b + 1, y, cx + a + 1, y + 1, color);
                }
                None => self.fill_area(cx - a, y, cx + a + 1, y + 1, color),
            }
        }
    }
}

/// Widest `dx` with `dx^2 + dy2 <= limit`, or `None` if the row is outside.
fn half_width(limit: i64, dy2: i64) -> Option<i64> {
    if dy2 > limit {
        return None;
    }
    let room = limit - dy2;
    // The float root can be off by one either way for large radii.
    let mut dx = (room as f64).sqrt() as i64;
    while dx * dx > room {
        dx -= 1;
    }
    while (dx + 1) * (dx + 1) <= room {
        dx += 1;
    }
    Some(dx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white(w: u32, h: u32) -> Canvas {
        Canvas::new(w, h, Color::WHITE)
    }

    #[test]
    fn test_new_and_clear() {
        let mut canvas = white(4, 3);
        assert_eq!(canvas.pixels().len(), 12);
        assert_eq!(canvas.pixel(3, 2), Some(Color::WHITE));
        assert_eq!(canvas.pixel(4, 0), None);
        assert_eq!(canvas.pixel(-1, 0), None);

        canvas.clear(Color::BLUE);
        assert!(canvas.pixels().iter().all(|&p| p == Color::BLUE.to_u32()));
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut canvas = white(10, 10);
        canvas.fill_rect(-5, -5, 8, 8, Color::RED);

        assert_eq!(canvas.pixel(0, 0), Some(Color::RED));
        assert_eq!(canvas.pixel(2, 2), Some(Color::RED));
        assert_eq!(canvas.pixel(3, 3), Some(Color::WHITE));

        // Entirely outside and degenerate rectangles are no-ops.
        canvas.fill_rect(20, 20, 5, 5, Color::BLUE);
        canvas.fill_rect(1, 1, 0, 5, Color::BLUE);
        assert!(!canvas.pixels().contains(&Color::BLUE.to_u32()));
    }

    #[test]
    fn test_draw_rect_outline() {
        let mut canvas = white(20, 20);
        canvas.draw_rect(2, 2, 10, 8, Color::BLACK, 2);

        assert_eq!(canvas.pixel(2, 2), Some(Color::BLACK));
        assert_eq!(canvas.pixel(3, 3), Some(Color::BLACK));
        assert_eq!(canvas.pixel(11, 9), Some(Color::BLACK));
        assert_eq!(canvas.pixel(4, 4), Some(Color::WHITE));
        assert_eq!(canvas.pixel(12, 2), Some(Color::WHITE));
    }

    #[test]
    fn test_thick_rect_becomes_fill() {
        let mut canvas = white(10, 10);
        canvas.draw_rect(0, 0, 4, 4, Color::BLACK, 5);
        assert_eq!(canvas.pixel(2, 2), Some(Color::BLACK));
    }

    #[test]
    fn test_fill_circle_extent() {
        let mut canvas = white(30, 30);
        canvas.fill_circle(15, 15, 5, Color::RED);

        assert_eq!(canvas.pixel(15, 15), Some(Color::RED));
        assert_eq!(canvas.pixel(20, 15), Some(Color::RED));
        assert_eq!(canvas.pixel(15, 10), Some(Color::RED));
        assert_eq!(canvas.pixel(21, 15), Some(Color::WHITE));
        assert_eq!(canvas.pixel(19, 19), Some(Color::WHITE));
    }

    #[test]
    fn test_draw_circle_ring() {
        let mut canvas = white(30, 30);
        canvas.draw_circle(15, 15, 8, Color::GREEN, 1);

        assert_eq!(canvas.pixel(23, 15), Some(Color::GREEN));
        assert_eq!(canvas.pixel(15, 7), Some(Color::GREEN));
        assert_eq!(canvas.pixel(15, 15), Some(Color::WHITE));
        assert_eq!(canvas.pixel(24, 15), Some(Color::WHITE));
    }

    #[test]
    fn test_circle_clipped_at_edge() {
        let mut canvas = white(10, 10);
        canvas.fill_circle(0, 0, 4, Color::RED);
        canvas.draw_circle(9, 9, 4, Color::BLUE, 2);
        assert_eq!(canvas.pixel(0, 0), Some(Color::RED));
        assert_eq!(canvas.pixel(9, 5), Some(Color::BLUE));
    }

    #[test]
    fn test_extreme_arguments_are_clipped() {
        let mut canvas = white(16, 16);

        canvas.draw_rect(0, 0, 10, 10, Color::RED, 1_500_000_000);
        assert_eq!(canvas.pixel(5, 5), Some(Color::RED));

        canvas.draw_rect(0, i32::MAX - 5, 10, 10, Color::BLUE, 1);
        canvas.draw_rect(i32::MIN, i32::MIN, i32::MAX, i32::MAX, Color::BLUE, u32::MAX);
        canvas.fill_rect(i32::MAX, i32::MAX, i32::MAX, i32::MAX, Color::BLUE);
        canvas.fill_circle(i32::MIN, i32::MAX, i32::MAX, Color::BLUE);
        canvas.draw_circle(i32::MAX, i32::MIN, i32::MAX, Color::BLUE, u32::MAX);
        assert!(!canvas.pixels().contains(&Color::BLUE.to_u32()));

        // A huge circle centred on the canvas covers all of it.
        canvas.fill_circle(8, 8, i32::MAX, Color::GREEN);
        assert!(canvas.pixels().iter().all(|&p| p == Color::GREEN.to_u32()));
    }

    #[test]
    fn test_huge_ring_only_touches_visible_rows() {
        let mut canvas = white(64, 64);
        let start = std::time::Instant::now();
        canvas.draw_circle(32, 32, 20_000, Color::RED, 1);
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
        // The ring passes far outside; nothing visible is inked.
        assert!(!canvas.pixels().contains(&Color::RED.to_u32()));

        // A ring thick enough to reach the canvas fills it.
        canvas.draw_circle(32, 32, 20_000, Color::RED, 20_000);
        assert_eq!(canvas.pixel(0, 0), Some(Color::RED));
        assert_eq!(canvas.pixel(63, 63), Some(Color::RED));
    }

    #[test]
    fn test_ring_matches_inclusion_test() {
        let mut canvas = white(40, 40);
        canvas.draw_circle(20, 20, 12, Color::BLACK, 3);

        let (r, t) = (12i64, 3i64);
        let outer = r * r + r;
        let inner = (r - t) * (r - t) + (r - t);
        for y in 0..40 {
            for x in 0..40 {
                let (dx, dy) = (i64::from(x) - 20, i64::from(y) - 20);
                let d2 = dx * dx + dy * dy;
                let expected = if d2 <= outer && d2 > inner {
                    Color::BLACK
                } else {
                    Color::WHITE
                };
                assert_eq!(canvas.pixel(x, y), Some(expected), "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_blend_pixel() {
        let mut canvas = Canvas::new(2, 1, Color::BLACK);
        canvas.blend_pixel(0, 0, Color::WHITE, 255);
        canvas.blend_pixel(1, 0, Color::WHITE, 0);
        canvas.blend_pixel(5, 5, Color::WHITE, 255);
        assert_eq!(canvas.pixel(0, 0), Some(Color::WHITE));
        assert_eq!(canvas.pixel(1, 0), Some(Color::BLACK));
    }

    #[test]
    fn test_resize_keeps_content() {
        let mut canvas = white(4, 4);
        canvas.put_pixel(1, 1, Color::RED);
        canvas.resize(6, 2, Color::BLUE);

        assert_eq!((canvas.width(), canvas.height()), (6, 2));
        assert_eq!(canvas.pixel(1, 1), Some(Color::RED));
        assert_eq!(canvas.pixel(5, 0), Some(Color::BLUE));
        assert_eq!(canvas.pixels().len(), 12);
    }
}
