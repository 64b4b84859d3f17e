use std::io::Cursor;

use anyhow::Context as _;

use crate::error::{FramixError, FramixResult};

/// Decoded raster in row-major premultiplied RGBA8. Immutable once produced;
/// every transform draws it onto a fresh surface instead of mutating it.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Vec<u8>,
}

impl DecodedImage {
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> FramixResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| FramixError::evaluation("image buffer size overflow"))?;
        if rgba8_premul.len() != expected {
            return Err(FramixError::evaluation(
                "image byte length does not match dimensions",
            ));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul,
        })
    }

    /// Copy out an axis-aligned region, clamped to the image bounds.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> FramixResult<Self> {
        let x1 = x.saturating_add(width).min(self.width);
        let y1 = y.saturating_add(height).min(self.height);
        let x0 = x.min(x1);
        let y0 = y.min(y1);
        let (w, h) = (x1 - x0, y1 - y0);
        if w == 0 || h == 0 {
            return Err(FramixError::evaluation("crop region is empty"));
        }

        let mut out = Vec::with_capacity(w as usize * h as usize * 4);
        for row in y0..y1 {
            let start = (row as usize * self.width as usize + x0 as usize) * 4;
            let end = start + w as usize * 4;
            out.extend_from_slice(&self.rgba8_premul[start..end]);
        }
        Self::from_premul(w, h, out)
    }
}

/// Decode fetched bytes into a premultiplied raster.
///
/// SVG sources (frame assets and similar) are rasterized at their native size
/// via `resvg`; everything else goes through the `image` crate.
pub fn decode_image(bytes: &[u8]) -> FramixResult<DecodedImage> {
    if looks_like_svg(bytes) {
        return decode_svg(bytes);
    }

    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| FramixError::decode(format!("decode raster image: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    DecodedImage::from_premul(width, height, rgba8_premul)
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(256)];
    let Ok(text) = std::str::from_utf8(head) else {
        return false;
    };
    let trimmed = text.trim_start();
    trimmed.starts_with("<svg") || trimmed.starts_with("<?xml")
}

fn decode_svg(bytes: &[u8]) -> FramixResult<DecodedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| FramixError::decode(format!("parse svg tree: {e}")))?;

    let size = tree.size();
    let width = (size.width().ceil() as u32).max(1);
    let height = (size.height().ceil() as u32).max(1);

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| FramixError::decode("failed to allocate svg pixmap"))?;
    let sx = (width as f32) / size.width();
    let sy = (height as f32) / size.height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    // tiny-skia pixmaps are already premultiplied RGBA8.
    DecodedImage::from_premul(width, height, pixmap.data().to_vec())
}

/// Serialize premultiplied pixels to PNG bytes (straight alpha on the wire).
pub fn encode_png(rgba8_premul: &[u8], width: u32, height: u32) -> FramixResult<Vec<u8>> {
    let expected = width as usize * height as usize * 4;
    if rgba8_premul.len() != expected {
        return Err(FramixError::evaluation(
            "encode_png expects bytes matching width*height*4",
        ));
    }

    let mut straight = rgba8_premul.to_vec();
    unpremultiply_rgba8_in_place(&mut straight);

    let img = image::RgbaImage::from_raw(width, height, straight)
        .ok_or_else(|| FramixError::evaluation("pixel buffer rejected by encoder"))?;

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}
