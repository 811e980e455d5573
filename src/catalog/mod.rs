//! The music-metadata seam: album resolution and asset fetching, plus the
//! title-cleaning rules the poster layer depends on.

mod spotify;

pub use spotify::SpotifyCatalog;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Everything the layout engine needs to render one album poster.
#[derive(Debug, Clone)]
pub struct AlbumAssets {
    pub album_title: String,
    /// Encoded cover art (whatever format the CDN serves).
    pub cover: Vec<u8>,
    /// Encoded scan-code strip for the album.
    pub scan_code: Vec<u8>,
    /// Raw release date string, typically `YYYY-MM-DD`.
    pub release_date: String,
    /// Sum of track durations.
    pub duration_ms: u64,
    pub track_names: Vec<String>,
}

/// Black-box metadata service. Lookup misses come back as `Ok(None)`;
/// transport failures as `Err`. The engine treats both as recoverable.
#[async_trait]
pub trait MusicCatalog: Send + Sync {
    /// Best-guess album title for a (track, artist) pair.
    async fn resolve_album(&self, track: &str, artist: &str) -> Result<Option<String>>;

    /// Full asset bundle for an (album, artist) pair.
    async fn album_assets(&self, album: &str, artist: &str) -> Result<Option<AlbumAssets>>;
}

const NOISE_SUFFIXES: [&str; 12] = [
    " (deluxe", " [deluxe", " - deluxe",
    " (remaster", " [remaster", " - remaster",
    " (expanded", " [expanded", " - expanded",
    " (original", " [original", " - original",
];

/// Strip edition noise ("(Deluxe ...)", "- 2011 Remaster" etc.) from an
/// album title. Falls back to the input when stripping would leave nothing.
pub fn clean_album_title(title: &str) -> String {
    let mut cleaned = title.to_string();
    for suffix in NOISE_SUFFIXES {
        // Index from the lowercased copy is only safe to cut at when it
        // lands on a char boundary of the original.
        if let Some(at) = cleaned.to_lowercase().find(suffix) {
            if cleaned.is_char_boundary(at) {
                cleaned.truncate(at);
            }
        }
    }
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        title.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Strip bracketed segments and "- ..." suffixes from a track title:
/// `"Dreams (2004 Remaster) - Live"` becomes `"Dreams"`.
pub fn clean_track_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut depth = 0usize;
    for ch in title.chars() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.split('-').next().unwrap_or("").trim().to_string()
}

/// `YYYY-MM-DD` becomes `"MMM DD, YYYY"` uppercased; anything else passes
/// through untouched (the store sometimes only has a year).
pub fn format_release_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.format("%b %d, %Y").to_string().to_uppercase(),
        Err(_) => raw.to_string(),
    }
}

/// Total running time as `M:SS`.
pub fn format_duration(duration_ms: u64) -> String {
    format!("{}:{:02}", duration_ms / 60_000, (duration_ms % 60_000) / 1_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn album_title_noise_is_stripped() {
        assert_eq!(clean_album_title("Rumours (Deluxe Edition)"), "Rumours");
        assert_eq!(clean_album_title("Abbey Road - Remastered 2019"), "Abbey Road");
        assert_eq!(clean_album_title("OK Computer"), "OK Computer");
    }

    #[test]
    fn album_title_never_cleans_to_empty() {
        assert_eq!(clean_album_title(" (Deluxe)"), " (Deluxe)");
    }

    #[test]
    fn track_title_drops_brackets_and_dash_suffix() {
        assert_eq!(clean_track_title("Dreams (2004 Remaster)"), "Dreams");
        assert_eq!(clean_track_title("Go Your Own Way - Live"), "Go Your Own Way");
        assert_eq!(clean_track_title("Songbird [Demo] - Take 2"), "Songbird");
        assert_eq!(clean_track_title("The Chain"), "The Chain");
    }

    #[test]
    fn release_date_formats_or_passes_through() {
        assert_eq!(format_release_date("1977-02-04"), "FEB 04, 1977");
        assert_eq!(format_release_date("1977"), "1977");
    }

    #[test]
    fn duration_formats_as_minutes_seconds() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(39 * 60_000 + 3_000), "39:03");
    }
}
