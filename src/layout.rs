//! Vertical line placement for text-effect blocks.
//!
//! The host renders every effect with the text horizontally centered; only the
//! vertical placement math differs between recipes, and it differs in two
//! independent ways: where the initial Y sits and how line indices offset from
//! it. Both axes are preserved exactly per recipe rather than unified, since
//! unifying would change rendered output for existing effects.

/// Where the initial Y position of the block sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerticalAnchor {
    /// `(canvas - blockHeight) / 2 + fontSize / 2` — the whole block is
    /// centered in the canvas.
    BlockCenter,
    /// Fixed `canvas / 2`.
    CanvasCenter,
}

/// How a line's index offsets it from the initial Y.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineIndexing {
    /// `i * fontSize * lineSpacing` — the first line sits at the initial Y.
    FromFirst,
    /// `(i - lineCount / 2) * fontSize * lineSpacing` — lines straddle the
    /// initial Y.
    FromMiddle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinePlacement {
    pub anchor: VerticalAnchor,
    pub indexing: LineIndexing,
}

impl LinePlacement {
    pub const BLOCK: Self = Self {
        anchor: VerticalAnchor::BlockCenter,
        indexing: LineIndexing::FromFirst,
    };
    pub const CENTER_ANCHORED: Self = Self {
        anchor: VerticalAnchor::CanvasCenter,
        indexing: LineIndexing::FromMiddle,
    };
    /// Block-centered initial Y combined with middle indexing.
    pub const BLOCK_ANCHORED: Self = Self {
        anchor: VerticalAnchor::BlockCenter,
        indexing: LineIndexing::FromMiddle,
    };
}

/// Total height of an N-line block.
pub fn block_height(line_count: usize, font_size: f64, line_spacing: f64) -> f64 {
    (line_count.saturating_sub(1)) as f64 * font_size * line_spacing + font_size
}

/// Per-line vertical mid positions ("middle baseline" anchor contract): each
/// returned Y is the visual middle of that line's glyphs, not the baseline.
pub fn line_positions(
    line_count: usize,
    font_size: f64,
    line_spacing: f64,
    placement: LinePlacement,
    canvas_height: f64,
) -> Vec<f64> {
    let initial_y = match placement.anchor {
        VerticalAnchor::BlockCenter => {
            (canvas_height - block_height(line_count, font_size, line_spacing)) / 2.0
                + font_size / 2.0
        }
        VerticalAnchor::CanvasCenter => canvas_height / 2.0,
    };

    (0..line_count)
        .map(|i| {
            let offset = match placement.indexing {
                LineIndexing::FromFirst => i as f64,
                LineIndexing::FromMiddle => i as f64 - line_count as f64 / 2.0,
            };
            initial_y + offset * font_size * line_spacing
        })
        .collect()
}
