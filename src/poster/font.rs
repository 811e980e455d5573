//! Font resolution and glyph drawing. A chain of TTF candidates is tried
//! in order; when none loads, a built-in 5x7 bitmap face takes over so
//! rendering never fails outright. Poster text is uppercased, which the
//! built-in face covers completely.

use std::fs;
use std::path::Path;

use image::{Rgba, RgbaImage};
use log::warn;

/// Tried in order at renderer construction.
pub const FONT_CANDIDATES: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
];

pub enum FontFace {
    Truetype(fontdue::Font),
    /// 5x7 bitmap fallback, scaled by nearest-neighbour.
    Builtin,
}

impl FontFace {
    /// Load the first candidate that parses, else the built-in face.
    pub fn resolve<P: AsRef<Path>>(candidates: &[P]) -> FontFace {
        for candidate in candidates {
            let path = candidate.as_ref();
            let Ok(bytes) = fs::read(path) else { continue };
            match fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()) {
                Ok(font) => return FontFace::Truetype(font),
                Err(err) => warn!("font candidate {} unusable: {err}", path.display()),
            }
        }
        warn!("no usable font candidate; using built-in bitmap face");
        FontFace::Builtin
    }

    /// Advance width of `text` at `px`, ignoring kerning.
    pub fn measure(&self, text: &str, px: f32) -> f32 {
        match self {
            FontFace::Truetype(font) => text
                .chars()
                .map(|ch| font.metrics(ch, px).advance_width)
                .sum(),
            FontFace::Builtin => text.chars().count() as f32 * builtin_advance(px),
        }
    }

    /// Vertical distance between stacked lines at `px`.
    pub fn line_height(&self, px: f32) -> f32 {
        px + 10.0
    }

    /// Draw one line with its top-left corner at (x, y).
    pub fn draw(&self, canvas: &mut RgbaImage, text: &str, x: f32, y: f32, px: f32, color: Rgba<u8>) {
        match self {
            FontFace::Truetype(font) => draw_truetype(font, canvas, text, x, y, px, color),
            FontFace::Builtin => draw_builtin(canvas, text, x, y, px, color),
        }
    }
}

fn draw_truetype(
    font: &fontdue::Font,
    canvas: &mut RgbaImage,
    text: &str,
    x: f32,
    y: f32,
    px: f32,
    color: Rgba<u8>,
) {
    let baseline = y + px;
    let mut cursor = x;
    for ch in text.chars() {
        let (metrics, coverage) = font.rasterize(ch, px);
        let glyph_left = (cursor + metrics.xmin as f32).round() as i64;
        let glyph_top = (baseline - metrics.ymin as f32).round() as i64 - metrics.height as i64;
        for (row, chunk) in coverage.chunks(metrics.width.max(1)).enumerate() {
            for (col, &alpha) in chunk.iter().enumerate() {
                if alpha == 0 {
                    continue;
                }
                blend_pixel(
                    canvas,
                    glyph_left + col as i64,
                    glyph_top + row as i64,
                    color,
                    alpha,
                );
            }
        }
        cursor += metrics.advance_width;
    }
}

fn draw_builtin(canvas: &mut RgbaImage, text: &str, x: f32, y: f32, px: f32, color: Rgba<u8>) {
    let scale = (px / 8.0).max(1.0) as i64;
    let mut cursor = x as i64;
    for ch in text.chars() {
        let rows = builtin_glyph(ch);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..5 {
                if bits & (0b10000 >> col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        blend_pixel(
                            canvas,
                            cursor + col as i64 * scale + dx,
                            y as i64 + row as i64 * scale + dy,
                            color,
                            255,
                        );
                    }
                }
            }
        }
        cursor += 6 * scale;
    }
}

fn builtin_advance(px: f32) -> f32 {
    6.0 * (px / 8.0).max(1.0).floor()
}

fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, alpha: u8) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    let a = alpha as u32;
    for channel in 0..3 {
        let fg = color.0[channel] as u32;
        let bg = dst.0[channel] as u32;
        dst.0[channel] = ((fg * a + bg * (255 - a)) / 255) as u8;
    }
    dst.0[3] = 255;
}

/// 5x7 glyphs for the uppercase character set posters use. Unknown
/// characters render as a filled box.
fn builtin_glyph(ch: char) -> [u8; 7] {
    match ch {
        ' ' => [0x00; 7],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '?' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        '\'' => [0x0C, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        '&' => [0x0C, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0D],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '/' => [0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x10],
        _ => [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_falls_back_to_builtin() {
        let face = FontFace::resolve(&["/nonexistent/path.ttf"]);
        assert!(matches!(face, FontFace::Builtin));
    }

    #[test]
    fn builtin_measure_is_monotonic_in_length() {
        let face = FontFace::Builtin;
        let short = face.measure("AB", 32.0);
        let long = face.measure("ABCD", 32.0);
        assert!(long > short);
        assert_eq!(long, 2.0 * short);
    }

    #[test]
    fn builtin_draw_marks_pixels_in_bounds_only() {
        let face = FontFace::Builtin;
        let mut canvas = RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 255]));
        // Partially off-canvas draw must not panic.
        face.draw(&mut canvas, "AAAA", 40.0, 50.0, 32.0, Rgba([255, 255, 255, 255]));
        assert!(canvas.pixels().any(|p| p.0[0] == 255));
    }
}
