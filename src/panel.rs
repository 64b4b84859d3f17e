//! Three-panel slice-and-rotate compositor for the `3D image panel` action.
//!
//! Structurally independent from the masked strategies: the source image is
//! sliced into horizontal thirds, each third is drawn into its panel with a
//! small rotation about the panel center, and a translucent shadow strip is
//! painted at each seam.

use kurbo::{Affine, Rect};

use crate::{
    decode::DecodedImage,
    error::FramixResult,
    model::{CANVAS_SIZE, Rgb},
    surface::Surface,
};

const PANEL_TILTS: [f64; 3] = [-0.2, 0.0, 0.2];
const SHADOW_ALPHA: u8 = 77; // rgba(0,0,0,0.3)
const SHADOW_WIDTH: f64 = 10.0;

pub fn render_panel(source: &DecodedImage) -> FramixResult<Surface> {
    let mut canvas = Surface::new(CANVAS_SIZE, CANVAS_SIZE)?;
    let panel_w = f64::from(CANVAS_SIZE) / 3.0;
    let panel_h = f64::from(CANVAS_SIZE);

    for (i, tilt) in PANEL_TILTS.iter().enumerate() {
        let x0 = (i as u32 * source.width) / 3;
        let x1 = ((i as u32 + 1) * source.width) / 3;
        let slice = source.crop(x0, 0, x1 - x0, source.height)?;

        let panel_x = i as f64 * panel_w;
        let transform = Affine::translate((panel_x + panel_w / 2.0, panel_h / 2.0))
            * Affine::rotate(*tilt)
            * Affine::translate((-panel_w / 2.0, -panel_h / 2.0))
            * Affine::scale_non_uniform(
                panel_w / f64::from(slice.width),
                panel_h / f64::from(slice.height),
            );
        canvas.draw_image_transformed(&slice, transform)?;
    }

    // Seam shadows for depth.
    for seam in [panel_w, 2.0 * panel_w] {
        canvas.fill_rect(
            Rect::new(
                seam - SHADOW_WIDTH / 2.0,
                0.0,
                seam + SHADOW_WIDTH / 2.0,
                panel_h,
            ),
            Rgb::new(0, 0, 0),
            SHADOW_ALPHA,
        )?;
    }

    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> DecodedImage {
        DecodedImage::from_premul(width, height, rgba.repeat((width * height) as usize)).unwrap()
    }

    fn pixel(surface: &Surface, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * surface.width() + x) * 4) as usize;
        surface.data()[idx..idx + 4].try_into().unwrap()
    }

    #[test]
    fn panel_canvas_is_1024_square() {
        let out = render_panel(&solid(30, 30, [0, 0, 255, 255])).unwrap();
        assert_eq!((out.width(), out.height()), (CANVAS_SIZE, CANVAS_SIZE));
    }

    #[test]
    fn center_panel_is_unrotated_source() {
        let out = render_panel(&solid(30, 30, [0, 0, 255, 255])).unwrap();
        let px = pixel(&out, CANVAS_SIZE / 2, CANVAS_SIZE / 2);
        assert_eq!(&px[..3], &[0, 0, 255]);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn tilted_side_panels_leave_corner_gaps() {
        let out = render_panel(&solid(30, 30, [255, 255, 255, 255])).unwrap();
        // Rotating the left panel by -0.2 rad pulls its top-left corner away
        // from the canvas corner.
        assert_eq!(pixel(&out, 0, 0)[3], 0);
    }

    #[test]
    fn seam_shadows_are_painted() {
        let out = render_panel(&solid(30, 30, [0, 0, 0, 0])).unwrap();
        let seam_x = CANVAS_SIZE / 3;
        let px = pixel(&out, seam_x, CANVAS_SIZE / 2);
        assert_eq!(px[3], SHADOW_ALPHA);
        let off_seam = pixel(&out, seam_x + 20, CANVAS_SIZE / 2);
        assert_eq!(off_seam[3], 0);
    }

    #[test]
    fn panel_render_is_deterministic() {
        let src = solid(60, 45, [10, 200, 30, 255]);
        let a = render_panel(&src).unwrap();
        let b = render_panel(&src).unwrap();
        assert_eq!(a.data(), b.data());
    }
}
