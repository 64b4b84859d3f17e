use kurbo::BezPath;

use crate::{
    error::{FramixError, FramixResult},
    model::Rgb,
    surface::Surface,
};

/// Per-pixel foreground likelihood produced by a segmentation backend.
#[derive(Clone, Debug)]
pub struct SegmentationMask {
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

/// Which side of the painted region stays visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarity {
    /// Painted region reveals, everything else is cut away.
    Window,
    /// Painted region is cut away, everything else stays.
    Hole,
}

/// Per-pixel opacity field over a canvas extent.
///
/// Built with the classic two-layer paint order: a full-canvas base fill
/// followed by the shape/text paint in the inverse polarity. Coverage follows
/// SVG mask semantics: luminance times alpha of the painted content, so a
/// colored stroke contributes partial coverage.
#[derive(Clone, Debug)]
pub struct Mask {
    width: u32,
    height: u32,
    coverage: Vec<u8>,
}

impl Mask {
    /// Rasterize a closed outline into a mask. An empty path yields zero
    /// coverage for `Window` (fully transparent result) and full coverage for
    /// `Hole`.
    pub fn from_shape(
        path: &BezPath,
        polarity: Polarity,
        width: u32,
        height: u32,
    ) -> FramixResult<Self> {
        let mut scratch = Surface::new(width, height)?;
        if !path.elements().is_empty() {
            scratch.fill_path(path, Rgb::new(255, 255, 255), 255)?;
        }
        let mut mask = Self::from_surface(&scratch);
        if polarity == Polarity::Hole {
            mask.invert();
        }
        Ok(mask)
    }

    /// Luminance × alpha coverage of already-painted content (glyph masks).
    pub fn from_surface(surface: &Surface) -> Self {
        let coverage = surface
            .data()
            .chunks_exact(4)
            .map(|px| {
                // Premultiplied channels already carry the alpha factor.
                let lum = 2126 * u32::from(px[0]) + 7152 * u32::from(px[1]) + 722 * u32::from(px[2]);
                ((lum + 5000) / 10000).min(255) as u8
            })
            .collect();
        Self {
            width: surface.width(),
            height: surface.height(),
            coverage,
        }
    }

    /// Binarize a segmentation field into a coverage mask.
    pub fn from_segmentation(seg: &SegmentationMask, threshold: f32) -> FramixResult<Self> {
        if seg.data.len() != seg.width as usize * seg.height as usize {
            return Err(FramixError::evaluation(
                "segmentation mask length does not match dimensions",
            ));
        }
        let coverage = seg
            .data
            .iter()
            .map(|&p| if p >= threshold { 255 } else { 0 })
            .collect();
        Ok(Self {
            width: seg.width,
            height: seg.height,
            coverage,
        })
    }

    pub fn invert(&mut self) {
        for c in &mut self.coverage {
            *c = 255 - *c;
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn coverage(&self) -> &[u8] {
        &self.coverage
    }

    /// Multiply the surface by this mask.
    pub fn apply_to(&self, surface: &mut Surface) -> FramixResult<()> {
        if self.width != surface.width() || self.height != surface.height() {
            return Err(FramixError::evaluation(
                "mask extent does not match surface extent",
            ));
        }
        surface.apply_coverage(&self.coverage)
    }
}
