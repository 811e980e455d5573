//! Pure layout math: greedy word wrap, ellipsis truncation, the
//! asymmetric two-column track split, and the anti-overlap spacing fit.
//! Everything here is deterministic and free of image concerns; width
//! measurement is injected so tests can use a fixed-advance ruler.

/// Hard ceiling on rendered track entries, matching the source posters.
pub const MAX_TRACKS: usize = 22;

/// Greedy word wrap: whole words are appended while the line fits. A
/// single word wider than `max_width` is kept intact and rendered
/// oversized; that is accepted behavior, not silently fixed.
pub fn wrap_lines(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut current = first.to_string();
    for word in words {
        let candidate = format!("{current} {word}");
        if measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }
    lines.push(current);
    lines
}

/// Drop trailing characters and append `"..."` until the line fits. Stops
/// at the empty string, so the result is never shorter than `"..."`.
pub fn truncate_to_width(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> String {
    if measure(text) <= max_width {
        return text.to_string();
    }

    let mut kept = text.to_string();
    while !kept.is_empty() && measure(&format!("{kept}...")) > max_width {
        kept.pop();
    }
    format!("{}...", kept.trim_end())
}

/// Split tracks into a left column of `ceil(n/2)` entries and a right
/// column of `floor(n/2)`.
pub fn split_columns(tracks: &[String]) -> (&[String], &[String]) {
    let mid = (tracks.len() + 1) / 2;
    tracks.split_at(mid)
}

/// Left-column row: `"{index}. {name}"` (1-based).
pub fn left_entry(index: usize, name: &str) -> String {
    format!("{}. {}", index + 1, name)
}

/// Right-column row: `"{name} .{index}"`, right-aligned by the caller.
/// The mirrored suffix is an intentional design quirk of the posters.
pub fn right_entry(index: usize, name: &str) -> String {
    format!("{} .{}", name, index + 1)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackFit {
    /// How many tracks are actually rendered.
    pub shown: usize,
    /// Vertical distance between rows.
    pub spacing: f32,
}

/// Compute per-row spacing as `min(max_spacing, available / rows)`, where
/// `rows` is the taller (left) column. If the result would fall below the
/// legibility floor, tracks are dropped from the tail until it holds.
/// Bounded by `MAX_TRACKS`, so the loop always terminates, and spacing is
/// never zero or negative for a non-empty fit.
pub fn fit_track_rows(
    count: usize,
    available: f32,
    max_spacing: f32,
    min_spacing: f32,
) -> TrackFit {
    let mut shown = count.min(MAX_TRACKS);
    while shown > 0 {
        let rows = (shown + 1) / 2;
        let spacing = max_spacing.min(available / rows as f32);
        if spacing >= min_spacing {
            return TrackFit { shown, spacing };
        }
        shown -= 1;
    }
    TrackFit {
        shown: 0,
        spacing: max_spacing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed-advance ruler: every char is 10px wide.
    fn ruler(text: &str) -> f32 {
        text.chars().count() as f32 * 10.0
    }

    #[test]
    fn wrap_appends_whole_words_greedily() {
        let lines = wrap_lines("THE DARK SIDE OF THE MOON", 120.0, ruler);
        // 12-char budget: "THE DARK" (8), adding "SIDE" -> 13 chars, too wide.
        assert_eq!(lines, vec!["THE DARK", "SIDE OF THE", "MOON"]);
    }

    #[test]
    fn wrap_of_blank_text_is_empty() {
        assert!(wrap_lines("   ", 100.0, ruler).is_empty());
        assert!(wrap_lines("", 100.0, ruler).is_empty());
    }

    #[test]
    fn oversized_word_is_never_split() {
        let lines = wrap_lines("SUPERCALIFRAGILISTIC HIT", 100.0, ruler);
        assert_eq!(lines, vec!["SUPERCALIFRAGILISTIC", "HIT"]);
    }

    #[test]
    fn truncate_keeps_fitting_text_untouched() {
        assert_eq!(truncate_to_width("DREAMS", 100.0, ruler), "DREAMS");
    }

    #[test]
    fn truncate_appends_ellipsis_when_too_wide() {
        // Budget of 8 chars; "GO YOUR OWN WAY" must shrink to 5 + "...".
        let out = truncate_to_width("GO YOUR OWN WAY", 80.0, ruler);
        assert_eq!(out, "GO YO...");
        assert!(ruler(&out) <= 80.0);
    }

    #[test]
    fn truncate_bottoms_out_at_ellipsis() {
        assert_eq!(truncate_to_width("LONG NAME", 10.0, ruler), "...");
    }

    #[test]
    fn columns_split_ceil_floor() {
        let tracks: Vec<String> = (1..=5).map(|i| format!("T{i}")).collect();
        let (left, right) = split_columns(&tracks);
        assert_eq!(left.len(), 3);
        assert_eq!(right.len(), 2);

        let even: Vec<String> = (1..=4).map(|i| format!("T{i}")).collect();
        let (left, right) = split_columns(&even);
        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 2);
    }

    #[test]
    fn row_prefixes_are_asymmetric() {
        assert_eq!(left_entry(0, "THE CHAIN"), "1. THE CHAIN");
        assert_eq!(right_entry(6, "SONGBIRD"), "SONGBIRD .7");
    }

    #[test]
    fn fit_uses_max_spacing_when_room_allows() {
        let fit = fit_track_rows(6, 1000.0, 48.0, 30.0);
        assert_eq!(fit.shown, 6);
        assert_eq!(fit.spacing, 48.0);
    }

    #[test]
    fn fit_compresses_spacing_under_pressure() {
        // 10 tracks -> 5 rows; 200px available -> 40px spacing, above floor.
        let fit = fit_track_rows(10, 200.0, 48.0, 30.0);
        assert_eq!(fit.shown, 10);
        assert_eq!(fit.spacing, 40.0);
    }

    #[test]
    fn fit_drops_tracks_below_legibility_floor() {
        // 22 tracks -> 11 rows in 200px would be 18.2px spacing; entries
        // must be shed until the floor holds.
        let fit = fit_track_rows(40, 200.0, 48.0, 30.0);
        assert!(fit.shown < 22);
        assert!(fit.spacing >= 30.0);
        let rows = (fit.shown + 1) / 2;
        assert!(rows as f32 * fit.spacing <= 200.0 + f32::EPSILON);
    }

    #[test]
    fn fit_never_returns_zero_spacing() {
        let fit = fit_track_rows(22, 0.0, 48.0, 30.0);
        assert_eq!(fit.shown, 0);
        assert!(fit.spacing > 0.0);
    }

    #[test]
    fn fit_caps_at_max_tracks() {
        let fit = fit_track_rows(100, 10_000.0, 48.0, 30.0);
        assert_eq!(fit.shown, MAX_TRACKS);
    }
}
