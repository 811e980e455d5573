//! Deterministic poster composition: identical inputs produce
//! pixel-identical output, which is what makes fingerprint-keyed caching
//! sound.

mod engine;
mod font;
mod text;

pub use engine::{PosterInput, PosterRenderer};
pub use font::{FontFace, FONT_CANDIDATES};
pub use text::{
    fit_track_rows, left_entry, right_entry, split_columns, truncate_to_width, wrap_lines,
    TrackFit, MAX_TRACKS,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Landscape
    }
}
