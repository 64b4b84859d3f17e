//! Typed filter primitives evaluated on premultiplied RGBA8 buffers.
//!
//! Effect recipes compose these into small graphs instead of templating
//! markup; every primitive names its inputs explicitly, so a graph is a flat
//! list where later primitives may reference earlier results by index.

use crate::{
    composite,
    error::{FramixError, FramixResult},
    model::Rgb,
};

/// Input selector for a filter primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterInput {
    /// The unfiltered source buffer.
    Source,
    /// The source with color channels zeroed (alpha silhouette).
    SourceAlpha,
    /// Output of an earlier primitive in the graph.
    Result(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterOp {
    /// Fractal turbulence field; the primary input is ignored.
    Turbulence { base_frequency: f64, num_octaves: u32 },
    /// Displace the primary input by the R/G channels of `displacement`.
    DisplacementMap { displacement: FilterInput, scale: f64 },
    /// Morphological dilate with a square structuring element.
    Dilate { radius: u32 },
    /// Integer translation, transparent fill.
    Offset { dx: i32, dy: i32 },
    /// Full-plane fill; the primary input is ignored.
    Flood { color: Rgb, alpha: u8 },
    /// Keep the primary input where `mask` has alpha.
    CompositeIn { mask: FilterInput },
    /// Keep the primary input where `subtract` has no alpha.
    CompositeOut { subtract: FilterInput },
    GaussianBlur { sigma: f32 },
    /// Distant-light specular highlight over the input's alpha bump map.
    SpecularLighting {
        specular_constant: f32,
        specular_exponent: f32,
        color: Rgb,
        color_alpha: u8,
        azimuth_deg: f32,
        elevation_deg: f32,
    },
    /// Stack inputs bottom-to-top with source-over; the primary input is
    /// ignored.
    Merge { inputs: Vec<FilterInput> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterPrimitive {
    pub input: FilterInput,
    pub op: FilterOp,
}

/// A flat filter graph. The last primitive's output is the graph result.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterGraph {
    primitives: Vec<FilterPrimitive>,
}

impl FilterGraph {
    pub fn new(primitives: Vec<FilterPrimitive>) -> Self {
        Self { primitives }
    }

    pub fn apply(&self, source: &[u8], width: u32, height: u32) -> FramixResult<Vec<u8>> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| FramixError::evaluation("filter buffer size overflow"))?;
        if source.len() != expected {
            return Err(FramixError::evaluation(
                "filter source must match width*height*4",
            ));
        }
        if self.primitives.is_empty() {
            return Ok(source.to_vec());
        }

        let source_alpha: Vec<u8> = source
            .chunks_exact(4)
            .flat_map(|px| [0, 0, 0, px[3]])
            .collect();

        fn resolve<'a>(
            input: FilterInput,
            idx: usize,
            source: &'a [u8],
            source_alpha: &'a [u8],
            results: &'a [Vec<u8>],
        ) -> FramixResult<&'a [u8]> {
            match input {
                FilterInput::Source => Ok(source),
                FilterInput::SourceAlpha => Ok(source_alpha),
                FilterInput::Result(i) => {
                    if i >= idx {
                        return Err(FramixError::evaluation(format!(
                            "filter primitive {idx} references result {i} before it exists"
                        )));
                    }
                    Ok(results[i].as_slice())
                }
            }
        }

        let mut results: Vec<Vec<u8>> = Vec::with_capacity(self.primitives.len());
        for (idx, prim) in self.primitives.iter().enumerate() {
            let resolve =
                |input: FilterInput| resolve(input, idx, source, &source_alpha, &results);

            let out = match &prim.op {
                FilterOp::Turbulence {
                    base_frequency,
                    num_octaves,
                } => turbulence(width, height, *base_frequency, *num_octaves),
                FilterOp::DisplacementMap {
                    displacement,
                    scale,
                } => displacement_map(
                    resolve(prim.input)?,
                    resolve(*displacement)?,
                    width,
                    height,
                    *scale,
                ),
                FilterOp::Dilate { radius } => dilate(resolve(prim.input)?, width, height, *radius),
                FilterOp::Offset { dx, dy } => offset(resolve(prim.input)?, width, height, *dx, *dy),
                FilterOp::Flood { color, alpha } => flood(width, height, *color, *alpha),
                FilterOp::CompositeIn { mask } => {
                    composite_in(resolve(prim.input)?, resolve(*mask)?)
                }
                FilterOp::CompositeOut { subtract } => {
                    composite_out(resolve(prim.input)?, resolve(*subtract)?)
                }
                FilterOp::GaussianBlur { sigma } => {
                    gaussian_blur(resolve(prim.input)?, width, height, *sigma)?
                }
                FilterOp::SpecularLighting {
                    specular_constant,
                    specular_exponent,
                    color,
                    color_alpha,
                    azimuth_deg,
                    elevation_deg,
                } => specular_lighting(
                    resolve(prim.input)?,
                    width,
                    height,
                    *specular_constant,
                    *specular_exponent,
                    *color,
                    *color_alpha,
                    *azimuth_deg,
                    *elevation_deg,
                ),
                FilterOp::Merge { inputs } => {
                    let mut acc = vec![0u8; expected];
                    for input in inputs {
                        composite::over_in_place(&mut acc, resolve(*input)?, 1.0)?;
                    }
                    acc
                }
            };
            results.push(out);
        }

        Ok(results.pop().unwrap_or_else(|| source.to_vec()))
    }
}

// ---- turbulence -------------------------------------------------------------

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn lattice_gradient(channel: u32, xi: i64, yi: i64) -> (f64, f64) {
    let h = mix64(
        (u64::from(channel))
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add((xi as u64).wrapping_mul(0x8538_4059_2D8C_3FAD))
            .wrapping_add((yi as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)),
    );
    let angle = (h as f64 / u64::MAX as f64) * std::f64::consts::TAU;
    (angle.cos(), angle.sin())
}

fn fade(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Gradient noise in roughly [-1, 1], deterministic across runs.
fn noise2(channel: u32, x: f64, y: f64) -> f64 {
    let xi = x.floor() as i64;
    let yi = y.floor() as i64;
    let fx = x - xi as f64;
    let fy = y - yi as f64;

    let dot = |gx: i64, gy: i64| -> f64 {
        let (vx, vy) = lattice_gradient(channel, gx, gy);
        vx * (x - gx as f64) + vy * (y - gy as f64)
    };

    let u = fade(fx);
    let v = fade(fy);
    let top = dot(xi, yi) * (1.0 - u) + dot(xi + 1, yi) * u;
    let bottom = dot(xi, yi + 1) * (1.0 - u) + dot(xi + 1, yi + 1) * u;
    top * (1.0 - v) + bottom * v
}

fn turbulence(width: u32, height: u32, base_frequency: f64, num_octaves: u32) -> Vec<u8> {
    let mut out = vec![0u8; width as usize * height as usize * 4];
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 4) as usize;
            for ch in 0..3u32 {
                let mut sum = 0.0;
                let mut freq = base_frequency;
                let mut amp = 1.0;
                for _ in 0..num_octaves.max(1) {
                    sum += noise2(ch, f64::from(x) * freq, f64::from(y) * freq).abs() * amp;
                    freq *= 2.0;
                    amp *= 0.5;
                }
                out[idx + ch as usize] = (sum * 255.0).clamp(0.0, 255.0) as u8;
            }
            out[idx + 3] = 255;
        }
    }
    out
}

// ---- spatial primitives -----------------------------------------------------

fn displacement_map(src: &[u8], disp: &[u8], width: u32, height: u32, scale: f64) -> Vec<u8> {
    let (w, h) = (width as i64, height as i64);
    let mut out = vec![0u8; src.len()];
    for y in 0..h {
        for x in 0..w {
            let idx = ((y * w + x) * 4) as usize;
            let dx = scale * (f64::from(disp[idx]) / 255.0 - 0.5);
            let dy = scale * (f64::from(disp[idx + 1]) / 255.0 - 0.5);
            let sx = (x as f64 + dx).round() as i64;
            let sy = (y as f64 + dy).round() as i64;
            if sx < 0 || sy < 0 || sx >= w || sy >= h {
                continue;
            }
            let sidx = ((sy * w + sx) * 4) as usize;
            out[idx..idx + 4].copy_from_slice(&src[sidx..sidx + 4]);
        }
    }
    out
}

fn dilate(src: &[u8], width: u32, height: u32, radius: u32) -> Vec<u8> {
    if radius == 0 {
        return src.to_vec();
    }
    let r = radius as i64;
    let (w, h) = (width as i64, height as i64);
    let mut tmp = vec![0u8; src.len()];
    let mut out = vec![0u8; src.len()];

    for y in 0..h {
        for x in 0..w {
            let mut max = [0u8; 4];
            for dx in -r..=r {
                let sx = (x + dx).clamp(0, w - 1);
                let idx = ((y * w + sx) * 4) as usize;
                for c in 0..4 {
                    max[c] = max[c].max(src[idx + c]);
                }
            }
            let idx = ((y * w + x) * 4) as usize;
            tmp[idx..idx + 4].copy_from_slice(&max);
        }
    }
    for y in 0..h {
        for x in 0..w {
            let mut max = [0u8; 4];
            for dy in -r..=r {
                let sy = (y + dy).clamp(0, h - 1);
                let idx = ((sy * w + x) * 4) as usize;
                for c in 0..4 {
                    max[c] = max[c].max(tmp[idx + c]);
                }
            }
            let idx = ((y * w + x) * 4) as usize;
            out[idx..idx + 4].copy_from_slice(&max);
        }
    }
    out
}

fn offset(src: &[u8], width: u32, height: u32, dx: i32, dy: i32) -> Vec<u8> {
    let (w, h) = (width as i64, height as i64);
    let mut out = vec![0u8; src.len()];
    for y in 0..h {
        let sy = y - i64::from(dy);
        if sy < 0 || sy >= h {
            continue;
        }
        for x in 0..w {
            let sx = x - i64::from(dx);
            if sx < 0 || sx >= w {
                continue;
            }
            let sidx = ((sy * w + sx) * 4) as usize;
            let idx = ((y * w + x) * 4) as usize;
            out[idx..idx + 4].copy_from_slice(&src[sidx..sidx + 4]);
        }
    }
    out
}

fn flood(width: u32, height: u32, color: Rgb, alpha: u8) -> Vec<u8> {
    let a = u16::from(alpha);
    let px = [
        composite::mul_div255(u16::from(color.r), a),
        composite::mul_div255(u16::from(color.g), a),
        composite::mul_div255(u16::from(color.b), a),
        alpha,
    ];
    px.repeat(width as usize * height as usize)
}

fn composite_in(src: &[u8], mask: &[u8]) -> Vec<u8> {
    src.chunks_exact(4)
        .zip(mask.chunks_exact(4))
        .flat_map(|(s, m)| {
            let a = u16::from(m[3]);
            [
                composite::mul_div255(u16::from(s[0]), a),
                composite::mul_div255(u16::from(s[1]), a),
                composite::mul_div255(u16::from(s[2]), a),
                composite::mul_div255(u16::from(s[3]), a),
            ]
        })
        .collect()
}

fn composite_out(src: &[u8], subtract: &[u8]) -> Vec<u8> {
    src.chunks_exact(4)
        .zip(subtract.chunks_exact(4))
        .flat_map(|(s, m)| {
            let inv = 255 - u16::from(m[3]);
            [
                composite::mul_div255(u16::from(s[0]), inv),
                composite::mul_div255(u16::from(s[1]), inv),
                composite::mul_div255(u16::from(s[2]), inv),
                composite::mul_div255(u16::from(s[3]), inv),
            ]
        })
        .collect()
}

// ---- gaussian blur ----------------------------------------------------------

fn gaussian_blur(src: &[u8], width: u32, height: u32, sigma: f32) -> FramixResult<Vec<u8>> {
    if sigma <= 0.0 {
        return Ok(src.to_vec());
    }
    if !sigma.is_finite() {
        return Err(FramixError::evaluation("blur sigma must be finite"));
    }
    let radius = (sigma * 2.5).ceil().max(1.0) as u32;
    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; src.len()];
    let mut out = vec![0u8; src.len()];
    blur_pass(src, &mut tmp, width, height, &kernel, true);
    blur_pass(&tmp, &mut out, width, height, &kernel, false);
    Ok(out)
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> FramixResult<Vec<u32>> {
    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(FramixError::evaluation("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = (((wf / sum) * 65536.0).round() as i64).clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Push rounding drift into the center tap so the kernel sums to one.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    Ok(weights)
}

fn blur_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32], horizontal: bool) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let d = ki as i32 - radius;
                let (sx, sy) = if horizontal {
                    ((x + d).clamp(0, w - 1), y)
                } else {
                    (x, (y + d).clamp(0, h - 1))
                };
                let idx = ((sy * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = (((acc[c] + 32768) >> 16).min(255)) as u8;
            }
        }
    }
}

// ---- specular lighting ------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn specular_lighting(
    src: &[u8],
    width: u32,
    height: u32,
    ks: f32,
    exponent: f32,
    color: Rgb,
    color_alpha: u8,
    azimuth_deg: f32,
    elevation_deg: f32,
) -> Vec<u8> {
    let (w, h) = (width as i64, height as i64);
    let alpha_at = |x: i64, y: i64| -> f64 {
        let cx = x.clamp(0, w - 1);
        let cy = y.clamp(0, h - 1);
        f64::from(src[((cy * w + cx) * 4 + 3) as usize]) / 255.0
    };

    let az = f64::from(azimuth_deg).to_radians();
    let el = f64::from(elevation_deg).to_radians();
    let light = [az.cos() * el.cos(), az.sin() * el.cos(), el.sin()];
    // Halfway vector between the light and the eye (0, 0, 1).
    let hv = {
        let v = [light[0], light[1], light[2] + 1.0];
        let n = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        [v[0] / n, v[1] / n, v[2] / n]
    };

    let light_scale = f64::from(color_alpha) / 255.0;
    let light_rgb = [
        f64::from(color.r) * light_scale,
        f64::from(color.g) * light_scale,
        f64::from(color.b) * light_scale,
    ];

    let mut out = vec![0u8; src.len()];
    for y in 0..h {
        for x in 0..w {
            let nx = -0.25
                * ((alpha_at(x + 1, y - 1) + 2.0 * alpha_at(x + 1, y) + alpha_at(x + 1, y + 1))
                    - (alpha_at(x - 1, y - 1) + 2.0 * alpha_at(x - 1, y) + alpha_at(x - 1, y + 1)));
            let ny = -0.25
                * ((alpha_at(x - 1, y + 1) + 2.0 * alpha_at(x, y + 1) + alpha_at(x + 1, y + 1))
                    - (alpha_at(x - 1, y - 1) + 2.0 * alpha_at(x, y - 1) + alpha_at(x + 1, y - 1)));
            let norm = (nx * nx + ny * ny + 1.0).sqrt();
            let n = [nx / norm, ny / norm, 1.0 / norm];

            let n_dot_h = (n[0] * hv[0] + n[1] * hv[1] + n[2] * hv[2]).max(0.0);
            let factor = f64::from(ks) * n_dot_h.powf(f64::from(exponent));

            let idx = ((y * w + x) * 4) as usize;
            let r = (factor * light_rgb[0]).clamp(0.0, 255.0) as u8;
            let g = (factor * light_rgb[1]).clamp(0.0, 255.0) as u8;
            let b = (factor * light_rgb[2]).clamp(0.0, 255.0) as u8;
            out[idx] = r;
            out[idx + 1] = g;
            out[idx + 2] = b;
            out[idx + 3] = r.max(g).max(b);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prim(input: FilterInput, op: FilterOp) -> FilterPrimitive {
        FilterPrimitive { input, op }
    }

    fn single(op: FilterOp) -> FilterGraph {
        FilterGraph::new(vec![prim(FilterInput::Source, op)])
    }

    fn dot_source(w: u32, h: u32, x: u32, y: u32) -> Vec<u8> {
        let mut src = vec![0u8; (w * h * 4) as usize];
        let idx = ((y * w + x) * 4) as usize;
        src[idx..idx + 4].copy_from_slice(&[255, 255, 255, 255]);
        src
    }

    #[test]
    fn empty_graph_is_identity() {
        let src = vec![1u8, 2, 3, 4];
        let out = FilterGraph::new(vec![]).apply(&src, 1, 1).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn graph_rejects_forward_references() {
        let g = FilterGraph::new(vec![prim(
            FilterInput::Result(0),
            FilterOp::Offset { dx: 1, dy: 0 },
        )]);
        assert!(g.apply(&[0; 4], 1, 1).is_err());
    }

    #[test]
    fn offset_translates_and_clips() {
        let src = dot_source(3, 3, 0, 0);
        let out = single(FilterOp::Offset { dx: 1, dy: 2 })
            .apply(&src, 3, 3)
            .unwrap();
        let idx = ((2 * 3 + 1) * 4) as usize;
        assert_eq!(&out[idx..idx + 4], &[255, 255, 255, 255]);
        assert_eq!(&out[..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn dilate_grows_coverage() {
        let src = dot_source(5, 5, 2, 2);
        let out = single(FilterOp::Dilate { radius: 1 })
            .apply(&src, 5, 5)
            .unwrap();
        let covered = out.chunks_exact(4).filter(|px| px[3] == 255).count();
        assert_eq!(covered, 9);
    }

    #[test]
    fn flood_fills_premultiplied() {
        let out = single(FilterOp::Flood {
            color: Rgb::new(255, 255, 255),
            alpha: 128,
        })
        .apply(&[0; 4], 1, 1)
        .unwrap();
        assert_eq!(out[3], 128);
        assert!((i16::from(out[0]) - 128).abs() <= 1);
    }

    #[test]
    fn composite_in_and_out_partition_the_source() {
        let src = vec![100u8, 100, 100, 255, 100, 100, 100, 255];
        let mask = vec![0u8, 0, 0, 255, 0, 0, 0, 0];
        let kept = composite_in(&src, &mask);
        let cut = composite_out(&src, &mask);
        assert_eq!(&kept[..4], &[100, 100, 100, 255]);
        assert_eq!(&kept[4..], &[0, 0, 0, 0]);
        assert_eq!(&cut[..4], &[0, 0, 0, 0]);
        assert_eq!(&cut[4..], &[100, 100, 100, 255]);
    }

    #[test]
    fn merge_stacks_bottom_to_top() {
        let g = FilterGraph::new(vec![
            prim(
                FilterInput::Source,
                FilterOp::Flood {
                    color: Rgb::new(255, 0, 0),
                    alpha: 255,
                },
            ),
            prim(
                FilterInput::Source,
                FilterOp::Flood {
                    color: Rgb::new(0, 255, 0),
                    alpha: 255,
                },
            ),
            prim(
                FilterInput::Source,
                FilterOp::Merge {
                    inputs: vec![FilterInput::Result(0), FilterInput::Result(1)],
                },
            ),
        ]);
        let out = g.apply(&[0; 4], 1, 1).unwrap();
        assert_eq!(&out[..4], &[0, 255, 0, 255]);
    }

    #[test]
    fn turbulence_is_deterministic_and_varies() {
        let g = single(FilterOp::Turbulence {
            base_frequency: 0.05,
            num_octaves: 2,
        });
        let src = vec![0u8; 32 * 32 * 4];
        let a = g.apply(&src, 32, 32).unwrap();
        let b = g.apply(&src, 32, 32).unwrap();
        assert_eq!(a, b);
        let first = a[0];
        assert!(a.chunks_exact(4).any(|px| px[0] != first));
    }

    #[test]
    fn displacement_scale_0_keeps_interior_pixels() {
        let src = dot_source(9, 9, 4, 4);
        let g = FilterGraph::new(vec![
            prim(
                FilterInput::Source,
                FilterOp::Turbulence {
                    base_frequency: 0.05,
                    num_octaves: 2,
                },
            ),
            prim(
                FilterInput::Source,
                FilterOp::DisplacementMap {
                    displacement: FilterInput::Result(0),
                    scale: 0.0,
                },
            ),
        ]);
        let out = g.apply(&src, 9, 9).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn displacement_moves_energy() {
        let (w, h) = (32u32, 32u32);
        let mut src = vec![0u8; (w * h * 4) as usize];
        for y in 10..20 {
            for x in 10..20 {
                let idx = ((y * w + x) * 4) as usize;
                src[idx..idx + 4].copy_from_slice(&[255, 255, 255, 255]);
            }
        }
        let g = FilterGraph::new(vec![
            prim(
                FilterInput::Source,
                FilterOp::Turbulence {
                    base_frequency: 0.05,
                    num_octaves: 2,
                },
            ),
            prim(
                FilterInput::Source,
                FilterOp::DisplacementMap {
                    displacement: FilterInput::Result(0),
                    scale: 20.0,
                },
            ),
        ]);
        let out = g.apply(&src, w, h).unwrap();
        assert_ne!(out, src, "distortion must change the clipped image");
        assert!(out.chunks_exact(4).any(|px| px[3] != 0));
    }

    #[test]
    fn blur_constant_image_is_identity() {
        let px = [10u8, 20, 30, 255];
        let src = px.repeat(16);
        let out = single(FilterOp::GaussianBlur { sigma: 2.0 })
            .apply(&src, 4, 4)
            .unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn blur_spreads_energy_from_single_pixel() {
        let src = dot_source(5, 5, 2, 2);
        let out = single(FilterOp::GaussianBlur { sigma: 1.2 })
            .apply(&src, 5, 5)
            .unwrap();
        let nonzero = out.chunks_exact(4).filter(|px| px[3] != 0).count();
        assert!(nonzero > 1);
    }

    #[test]
    fn specular_highlights_bump_edges_only() {
        let (w, h) = (16u32, 16u32);
        let mut src = vec![0u8; (w * h * 4) as usize];
        for y in 4..12 {
            for x in 4..12 {
                let idx = ((y * w + x) * 4) as usize;
                src[idx + 3] = 255;
            }
        }
        let blurred = single(FilterOp::GaussianBlur { sigma: 2.0 })
            .apply(&src, w, h)
            .unwrap();
        let lit = single(FilterOp::SpecularLighting {
            specular_constant: 2.4,
            specular_exponent: 13.0,
            color: Rgb::new(60, 60, 60),
            color_alpha: 102,
            azimuth_deg: 25.0,
            elevation_deg: 40.0,
        })
        .apply(&blurred, w, h)
        .unwrap();
        assert!(lit.chunks_exact(4).any(|px| px[3] != 0));
        // Premultiplied invariant: no channel exceeds alpha.
        for px in lit.chunks_exact(4) {
            assert!(px[0] <= px[3] && px[1] <= px[3] && px[2] <= px[3]);
        }
    }
}
