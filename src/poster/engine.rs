//! Raster composition of a finished poster from cover art, a scan code,
//! and album metadata. Layout constants mirror the shipped posters; the
//! background blur is cosmetic and implemented as a cheap down/up resample.

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::font::{FontFace, FONT_CANDIDATES};
use super::text::{
    fit_track_rows, left_entry, right_entry, split_columns, truncate_to_width, wrap_lines,
};
use super::Orientation;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const DIMMED: Rgba<u8> = Rgba([224, 224, 224, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Legibility floor for track rows; below this the list is shortened.
const MIN_TRACK_SPACING: f32 = 36.0;

/// Everything the layout needs for one poster.
#[derive(Debug, Clone)]
pub struct PosterInput {
    pub album_title: String,
    pub artist: String,
    /// Already formatted for display (e.g. "FEB 04, 1977").
    pub release_date: String,
    /// Already formatted as "M:SS".
    pub duration: String,
    pub track_names: Vec<String>,
    /// Encoded cover art bytes.
    pub cover: Vec<u8>,
    /// Encoded scan-code bytes.
    pub scan_code: Vec<u8>,
}

struct Preset {
    width: u32,
    height: u32,
    pad: u32,
    cover: u32,
    overlay_alpha: u8,
    scan_height: u32,
    artist_px: f32,
    title_px: f32,
    track_px: f32,
    meta_px: f32,
    /// Max pixel width of one track row.
    column_width: f32,
    /// Gap between the title block and the track grid.
    track_gap: f32,
    max_spacing: f32,
}

impl Preset {
    fn for_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Portrait => Preset {
                width: 1200,
                height: 1800,
                pad: 70,
                cover: 1060,
                overlay_alpha: 130,
                scan_height: 90,
                artist_px: 75.0,
                title_px: 42.0,
                track_px: 34.0,
                meta_px: 28.0,
                column_width: 500.0,
                track_gap: 50.0,
                max_spacing: 48.0,
            },
            Orientation::Landscape => Preset {
                width: 1920,
                height: 1080,
                pad: 80,
                cover: 800,
                overlay_alpha: 160,
                scan_height: 100,
                artist_px: 90.0,
                title_px: 50.0,
                track_px: 34.0,
                meta_px: 28.0,
                column_width: 500.0,
                track_gap: 70.0,
                max_spacing: 45.0,
            },
        }
    }
}

pub struct PosterRenderer {
    font: FontFace,
}

impl PosterRenderer {
    /// Resolve the font chain once; total failure degrades to the built-in
    /// bitmap face rather than erroring.
    pub fn new() -> Self {
        Self {
            font: FontFace::resolve(&FONT_CANDIDATES),
        }
    }

    pub fn with_face(font: FontFace) -> Self {
        Self { font }
    }

    /// Compose the poster and return encoded PNG bytes. Identical inputs
    /// (same bytes, strings, orientation, resolved font) yield identical
    /// output; host font differences are a documented limitation.
    pub fn render(&self, input: &PosterInput, orientation: Orientation) -> Result<Vec<u8>> {
        let preset = Preset::for_orientation(orientation);
        let cover_src = image::load_from_memory(&input.cover)
            .context("cover art bytes were not a decodable image")?
            .to_rgba8();
        let scan_src = image::load_from_memory(&input.scan_code)
            .context("scan code bytes were not a decodable image")?
            .to_rgba8();

        let mut poster = blurred_background(&cover_src, &preset);
        darken(&mut poster, preset.overlay_alpha);

        let pad = preset.pad as i64;
        let cover_size = preset.cover;

        // 3px black frame behind the foreground cover.
        fill_rect(
            &mut poster,
            pad - 3,
            pad - 3,
            pad + cover_size as i64 + 2,
            pad + cover_size as i64 + 2,
            BLACK,
        );
        let cover = imageops::resize(&cover_src, cover_size, cover_size, FilterType::Triangle);
        imageops::overlay(&mut poster, &cover, pad, pad);

        let scan_w = ((preset.scan_height as f32 / scan_src.height().max(1) as f32)
            * scan_src.width() as f32)
            .round()
            .max(1.0) as u32;
        let scan = imageops::resize(&scan_src, scan_w, preset.scan_height, FilterType::Triangle);

        let anchor = (preset.width - preset.pad) as f32;
        let (text_max, artist_y, tracks_left_x) = match orientation {
            Orientation::Portrait => {
                let code_y = pad + cover_size as i64 + 45;
                imageops::overlay(&mut poster, &scan, pad, code_y);
                let text_max = (preset.width as i64 - pad - scan_w as i64 - 150).max(100) as f32;
                (text_max, code_y as f32 - 12.0, pad as f32)
            }
            Orientation::Landscape => {
                let text_x = pad + cover_size as i64 + 80;
                imageops::overlay(&mut poster, &scan, text_x, pad);
                let text_max = (preset.width as i64 - text_x - pad).max(100) as f32;
                (text_max, pad as f32 - 10.0, text_x as f32)
            }
        };

        let artist = input.artist.trim().to_uppercase();
        let artist_px = scaled_size(preset.artist_px, artist.chars().count(), 14);
        let y_artist = self.draw_wrapped(&mut poster, &artist, artist_px, text_max, anchor, artist_y, WHITE);

        let title = input.album_title.trim().to_uppercase();
        let title_px = scaled_size(preset.title_px, title.chars().count(), 24);
        let title_y = y_artist + if orientation == Orientation::Portrait { 5.0 } else { 15.0 };
        let y_title = self.draw_wrapped(
            &mut poster,
            &title,
            title_px,
            text_max,
            anchor,
            title_y,
            title_color(orientation),
        );

        let meta = meta_line(&input.release_date, &input.duration);
        let y_meta = if meta.is_empty() {
            y_title
        } else {
            let line = truncate_to_width(&meta, text_max, |s| self.font.measure(s, preset.meta_px));
            let x = anchor - self.font.measure(&line, preset.meta_px);
            self.font.draw(&mut poster, &line, x, y_title + 8.0, preset.meta_px, DIMMED);
            y_title + 8.0 + self.font.line_height(preset.meta_px)
        };

        self.draw_track_grid(&mut poster, input, &preset, y_meta, anchor, tracks_left_x);
        self.draw_color_strip(&mut poster, &cover_src, &preset);

        let mut out = Vec::new();
        poster
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .context("poster PNG encoding failed")?;
        Ok(out)
    }

    fn draw_wrapped(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        px: f32,
        max_width: f32,
        anchor: f32,
        start_y: f32,
        color: Rgba<u8>,
    ) -> f32 {
        let lines = wrap_lines(text, max_width, |s| self.font.measure(s, px));
        let mut y = start_y;
        for line in &lines {
            let x = anchor - self.font.measure(line, px);
            self.font.draw(canvas, line, x, y, px, color);
            y += self.font.line_height(px);
        }
        y
    }

    fn draw_track_grid(
        &self,
        canvas: &mut RgbaImage,
        input: &PosterInput,
        preset: &Preset,
        y_meta: f32,
        anchor: f32,
        left_x: f32,
    ) {
        let names: Vec<String> = input
            .track_names
            .iter()
            .map(|name| name.trim().to_uppercase())
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            return;
        }

        let top = y_meta + preset.track_gap;
        let available = ((preset.height - preset.pad) as f32 - top).max(0.0);
        let fit = fit_track_rows(names.len(), available, preset.max_spacing, MIN_TRACK_SPACING);
        if fit.shown == 0 {
            return;
        }

        let shown = &names[..fit.shown];
        let (left, right) = split_columns(shown);
        let px = preset.track_px;
        let measure = |s: &str| self.font.measure(s, px);

        for (row, name) in left.iter().enumerate() {
            let entry = truncate_to_width(&left_entry(row, name), preset.column_width, measure);
            let y = top + row as f32 * fit.spacing;
            self.font.draw(canvas, &entry, left_x, y, px, WHITE);
        }
        for (row, name) in right.iter().enumerate() {
            let entry =
                truncate_to_width(&right_entry(left.len() + row, name), preset.column_width, measure);
            let x = anchor - self.font.measure(&entry, px);
            let y = top + row as f32 * fit.spacing;
            self.font.draw(canvas, &entry, x, y, px, WHITE);
        }
    }

    /// Bottom edge color story: four segments, each the average color of
    /// the matching vertical quarter of the cover.
    fn draw_color_strip(&self, canvas: &mut RgbaImage, cover: &RgbaImage, preset: &Preset) {
        let pad = preset.pad as i64;
        let bar_y = preset.height as i64 - pad + 5;
        let seg_w = ((preset.width - 2 * preset.pad) / 4) as i64;
        let quarter_w = (cover.width() / 4).max(1);

        for segment in 0..4i64 {
            let crop = imageops::crop_imm(
                cover,
                segment as u32 * quarter_w,
                0,
                quarter_w,
                cover.height(),
            )
            .to_image();
            let average = imageops::resize(&crop, 1, 1, FilterType::Triangle);
            let mut color = *average.get_pixel(0, 0);
            color.0[3] = 255;
            fill_rect(
                canvas,
                pad + segment * seg_w,
                bar_y,
                pad + (segment + 1) * seg_w,
                bar_y + 20,
                color,
            );
        }
    }
}

impl Default for PosterRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Portrait posters paint the album title white; landscape dims it.
fn title_color(orientation: Orientation) -> Rgba<u8> {
    match orientation {
        Orientation::Portrait => WHITE,
        Orientation::Landscape => DIMMED,
    }
}

fn meta_line(release_date: &str, duration: &str) -> String {
    match (release_date.trim(), duration.trim()) {
        ("", "") => String::new(),
        (release, "") => release.to_string(),
        ("", duration) => duration.to_string(),
        (release, duration) => format!("{release} - {duration}"),
    }
}

/// Role sizes shrink with string length so long names stay on the canvas,
/// floored at a bit over half the base size.
fn scaled_size(base: f32, len: usize, comfortable: usize) -> f32 {
    if len <= comfortable {
        base
    } else {
        (base * comfortable as f32 / len as f32).max(base * 0.55)
    }
}

/// Scale to canvas, then a cheap blur: shrink well below canvas size and
/// resample back up with a Gaussian filter.
fn blurred_background(cover: &RgbaImage, preset: &Preset) -> RgbaImage {
    let scaled = imageops::resize(cover, preset.width, preset.height, FilterType::Triangle);
    let small = imageops::resize(
        &scaled,
        (preset.width / 20).max(1),
        (preset.height / 20).max(1),
        FilterType::Triangle,
    );
    imageops::resize(&small, preset.width, preset.height, FilterType::Gaussian)
}

/// Fixed-alpha black overlay; keeps foreground text legible on busy art.
fn darken(canvas: &mut RgbaImage, alpha: u8) {
    let keep = 255 - alpha as u32;
    for pixel in canvas.pixels_mut() {
        for channel in 0..3 {
            pixel.0[channel] = ((pixel.0[channel] as u32 * keep) / 255) as u8;
        }
        pixel.0[3] = 255;
    }
}

fn fill_rect(canvas: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba<u8>) {
    let x_start = x0.max(0) as u32;
    let y_start = y0.max(0) as u32;
    let x_end = x1.clamp(0, canvas.width() as i64) as u32;
    let y_end = y1.clamp(0, canvas.height() as i64) as u32;
    for y in y_start..y_end {
        for x in x_start..x_end {
            canvas.put_pixel(x, y, color);
        }
    }
}
