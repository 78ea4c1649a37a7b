//! Text rasterisation contract and the pixel buffer it draws into.
//!
//! Fonts belong to the host; the core only measures, wraps and asks the host
//! to draw single lines.

/// RGBA8 color.
pub type Rgba = [u8; 4];

/// Host font provider.
pub trait TextRasterizer {
    fn line_height(&self) -> u32;
    /// Pixel width of a single unwrapped line.
    fn text_width(&self, text: &str) -> u32;
    /// Height of `text` once wrapped to `max_width`.
    fn wrapped_text_height(&self, text: &str, max_width: u32) -> u32 {
        wrap_text(text, max_width, |s| self.text_width(s)).len() as u32 * self.line_height()
    }
    /// Draws one line with its top-left corner at `(x, y)`, rows counted from the top.
    fn rasterize_line(&self, line: &str, target: &mut PixelBuffer, x: u32, y: u32, color: Rgba);
}

/// Top-down RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x < self.width && y < self.height {
            let i = self.offset(x, y);
            self.data[i..i + 4].copy_from_slice(&color);
        }
    }

    pub fn fill(&mut self, color: Rgba) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    /// Fills the rectangle, clipped to the buffer.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgba) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for row in y.min(self.height)..y_end {
            for col in x.min(self.width)..x_end {
                let i = self.offset(col, row);
                self.data[i..i + 4].copy_from_slice(&color);
            }
        }
    }

    /// Reverses row order, turning a top-down image into the bottom-up
    /// layout texture uploads expect.
    pub fn flip_vertical(&mut self) {
        let stride = self.width as usize * 4;
        let rows = self.height as usize;
        for row in 0..rows / 2 {
            let (top, bottom) = self.data.split_at_mut((rows - 1 - row) * stride);
            top[row * stride..(row + 1) * stride].swap_with_slice(&mut bottom[..stride]);
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

/// Greedy word wrap. Explicit newlines always break; a single word wider than
/// `max_width` gets a line of its own.
pub fn wrap_text(text: &str, max_width: u32, measure: impl Fn(&str) -> u32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if measure(&candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> u32 {
        s.chars().count() as u32
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_text("the quick brown fox jumps", 10, chars);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn newlines_force_breaks_and_long_words_stand_alone() {
        let lines = wrap_text("a\nextraordinarily long\n\nb", 6, chars);
        assert_eq!(lines, vec!["a", "extraordinarily", "long", "", "b"]);
    }

    #[test]
    fn flip_swaps_rows() {
        let mut buf = PixelBuffer::new(2, 3);
        buf.fill_rect(0, 0, 2, 1, [255, 0, 0, 255]);
        buf.fill_rect(0, 2, 2, 1, [0, 0, 255, 255]);
        buf.flip_vertical();
        assert_eq!(buf.pixel(1, 0), Some([0, 0, 255, 255]));
        assert_eq!(buf.pixel(0, 1), Some([0, 0, 0, 0]));
        assert_eq!(buf.pixel(0, 2), Some([255, 0, 0, 255]));
    }

    #[test]
    fn fill_rect_clips() {
        let mut buf = PixelBuffer::new(4, 4);
        buf.fill_rect(3, 3, 10, 10, [1, 2, 3, 4]);
        assert_eq!(buf.pixel(3, 3), Some([1, 2, 3, 4]));
        assert_eq!(buf.pixel(2, 2), Some([0, 0, 0, 0]));
        assert_eq!(buf.pixel(4, 4), None);
    }
}
