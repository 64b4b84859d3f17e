use kurbo::{Affine, BezPath, PathEl, Point, Rect};

use crate::{
    composite,
    decode::DecodedImage,
    error::{FramixError, FramixResult},
    model::Rgb,
};

/// Mutable drawing surface owned by exactly one pipeline invocation.
///
/// Pixels are premultiplied RGBA8. The surface starts fully transparent and is
/// dropped after serialization; invocations never share one.
pub struct Surface {
    width: u32,
    height: u32,
    pixmap: vello_cpu::Pixmap,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> FramixResult<Self> {
        let w: u16 = width
            .try_into()
            .map_err(|_| FramixError::evaluation("surface width exceeds u16"))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| FramixError::evaluation("surface height exceeds u16"))?;
        if w == 0 || h == 0 {
            return Err(FramixError::evaluation("surface dimensions must be > 0"));
        }
        Ok(Self {
            width,
            height,
            pixmap: vello_cpu::Pixmap::new(w, h),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.pixmap.data_as_u8_slice_mut()
    }

    /// Replace the whole pixel buffer (filter outputs).
    pub fn replace_data(&mut self, rgba8_premul: &[u8]) -> FramixResult<()> {
        let dst = self.pixmap.data_as_u8_slice_mut();
        if dst.len() != rgba8_premul.len() {
            return Err(FramixError::evaluation(
                "replacement buffer length mismatch",
            ));
        }
        dst.copy_from_slice(rgba8_premul);
        Ok(())
    }

    /// Run drawing commands against a fresh render context and rasterize the
    /// result over the current surface contents.
    pub fn paint<F>(&mut self, f: F) -> FramixResult<()>
    where
        F: FnOnce(&mut vello_cpu::RenderContext) -> FramixResult<()>,
    {
        let mut ctx = vello_cpu::RenderContext::new(self.width as u16, self.height as u16);
        f(&mut ctx)?;
        ctx.flush();
        ctx.render_to_pixmap(&mut self.pixmap);
        Ok(())
    }

    /// Draw a decoded image scaled into `dst`.
    pub fn draw_image(&mut self, img: &DecodedImage, dst: Rect) -> FramixResult<()> {
        if img.width == 0 || img.height == 0 {
            return Err(FramixError::evaluation("cannot draw an empty image"));
        }
        let transform = Affine::translate((dst.x0, dst.y0))
            * Affine::scale_non_uniform(
                dst.width() / img.width as f64,
                dst.height() / img.height as f64,
            );
        self.draw_image_transformed(img, transform)
    }

    /// Draw a decoded image under an arbitrary affine transform (panel
    /// rotation and similar).
    pub fn draw_image_transformed(
        &mut self,
        img: &DecodedImage,
        transform: Affine,
    ) -> FramixResult<()> {
        let paint = image_paint(img)?;
        let (w, h) = (img.width as f64, img.height as f64);
        self.paint(|ctx| {
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_paint(paint);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
            Ok(())
        })
    }

    pub fn fill_path(&mut self, path: &BezPath, color: Rgb, alpha: u8) -> FramixResult<()> {
        let cpu_path = bezpath_to_cpu(path);
        self.paint(|ctx| {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                color.r, color.g, color.b, alpha,
            ));
            ctx.fill_path(&cpu_path);
            Ok(())
        })
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgb, alpha: u8) -> FramixResult<()> {
        self.paint(|ctx| {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                color.r, color.g, color.b, alpha,
            ));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                rect.x0, rect.y0, rect.x1, rect.y1,
            ));
            Ok(())
        })
    }

    /// Source-over composite another surface of identical extent.
    pub fn composite_over(&mut self, src: &Surface, opacity: f32) -> FramixResult<()> {
        if self.width != src.width || self.height != src.height {
            return Err(FramixError::evaluation(
                "composite_over expects equal surface extents",
            ));
        }
        composite::over_in_place(
            self.pixmap.data_as_u8_slice_mut(),
            src.pixmap.data_as_u8_slice(),
            opacity,
        )
    }

    /// Multiply every pixel by a per-pixel coverage field.
    pub fn apply_coverage(&mut self, coverage: &[u8]) -> FramixResult<()> {
        let data = self.pixmap.data_as_u8_slice_mut();
        if data.len() != coverage.len() * 4 {
            return Err(FramixError::evaluation(
                "coverage extent does not match surface",
            ));
        }
        for (px, &c) in data.chunks_exact_mut(4).zip(coverage.iter()) {
            if c == 255 {
                continue;
            }
            for ch in px.iter_mut() {
                *ch = composite::mul_div255(u16::from(*ch), u16::from(c));
            }
        }
        Ok(())
    }

    pub fn to_image(&self) -> DecodedImage {
        DecodedImage {
            width: self.width,
            height: self.height,
            rgba8_premul: self.pixmap.data_as_u8_slice().to_vec(),
        }
    }

    pub fn to_png(&self) -> FramixResult<Vec<u8>> {
        crate::decode::encode_png(self.pixmap.data_as_u8_slice(), self.width, self.height)
    }
}

/// Build an image paint for the CPU renderer from premultiplied bytes.
pub(crate) fn image_paint(img: &DecodedImage) -> FramixResult<vello_cpu::Image> {
    let pixmap = premul_bytes_to_pixmap(&img.rgba8_premul, img.width, img.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(std::sync::Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> FramixResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| FramixError::evaluation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| FramixError::evaluation("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(FramixError::evaluation("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

pub(crate) fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rgb;

    #[test]
    fn new_surface_is_transparent() {
        let s = Surface::new(4, 4).unwrap();
        assert!(s.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn surface_rejects_zero_and_oversize_extents() {
        assert!(Surface::new(0, 10).is_err());
        assert!(Surface::new(10, 70_000).is_err());
    }

    #[test]
    fn fill_rect_writes_pixels() {
        let mut s = Surface::new(8, 8).unwrap();
        s.fill_rect(Rect::new(0.0, 0.0, 8.0, 8.0), Rgb::new(255, 0, 0), 255)
            .unwrap();
        let px = &s.data()[..4];
        assert_eq!(px, &[255, 0, 0, 255]);
    }

    #[test]
    fn draw_image_scales_to_dst_rect() {
        let img = DecodedImage::from_premul(2, 2, vec![0, 0, 255, 255].repeat(4)).unwrap();
        let mut s = Surface::new(8, 8).unwrap();
        s.draw_image(&img, Rect::new(0.0, 0.0, 8.0, 8.0)).unwrap();
        // corner and center both covered after upscale
        assert_eq!(s.data()[3], 255);
        let center = ((4 * 8 + 4) * 4) as usize;
        assert_eq!(s.data()[center + 3], 255);
    }

    #[test]
    fn apply_coverage_zeroes_masked_out_pixels() {
        let mut s = Surface::new(2, 1).unwrap();
        s.fill_rect(Rect::new(0.0, 0.0, 2.0, 1.0), Rgb::new(10, 20, 30), 255)
            .unwrap();
        s.apply_coverage(&[255, 0]).unwrap();
        assert_eq!(&s.data()[..4], &[10, 20, 30, 255]);
        assert_eq!(&s.data()[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn composite_over_blends_surfaces() {
        let mut below = Surface::new(2, 2).unwrap();
        below
            .fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), Rgb::new(255, 0, 0), 255)
            .unwrap();
        let mut above = Surface::new(2, 2).unwrap();
        above
            .fill_rect(Rect::new(0.0, 0.0, 1.0, 2.0), Rgb::new(0, 255, 0), 255)
            .unwrap();
        below.composite_over(&above, 1.0).unwrap();
        assert_eq!(&below.data()[..4], &[0, 255, 0, 255]);
        assert_eq!(&below.data()[4..8], &[255, 0, 0, 255]);
    }
}
