//! The six text-on-image effect recipes.
//!
//! Every recipe composes the same machinery: glyph passes drawn through the
//! layout engine, luminance masks, and typed filter graphs. The per-recipe
//! parameters (font sizes, placements, stroke passes, filter chains) follow
//! the host renderer exactly, including the quirks: unpainted stroke passes
//! draw nothing, and three distinct vertical placements are in use.

use kurbo::Rect;

use crate::{
    decode::DecodedImage,
    error::FramixResult,
    fx::{FilterGraph, FilterInput, FilterOp, FilterPrimitive},
    layout::{self, LinePlacement},
    mask::Mask,
    model::{CANVAS_SIZE, Rgb, TextBlock, TextEffect},
    surface::Surface,
    text::{TextShaper, draw_line},
};

const FONT_SIZE: f32 = 300.0;
const HALO_GREEN: Rgb = Rgb::new(0, 191, 99);
const WHITE: Rgb = Rgb::new(255, 255, 255);

/// One styled pass over every line of the block.
///
/// `stroke_width` without a `stroke` color is preserved from the host: the
/// pass participates in the recipe but paints nothing.
struct GlyphPass {
    font_size: f32,
    /// Font size used in the vertical spacing formula; two recipes use a
    /// different size here than in the glyphs themselves.
    spacing_font_size: f64,
    letter_spacing: f64,
    placement: LinePlacement,
    dy_em: f64,
    fill: Option<Rgb>,
    stroke_width: f64,
    stroke: Option<Rgb>,
}

impl GlyphPass {
    fn fill_only(fill: Rgb, placement: LinePlacement) -> Self {
        Self {
            font_size: FONT_SIZE,
            spacing_font_size: f64::from(FONT_SIZE),
            letter_spacing: 0.0,
            placement,
            dy_em: 0.0,
            fill: Some(fill),
            stroke_width: 0.0,
            stroke: None,
        }
    }
}

/// Render one of the six recipes over `background` at the fixed canvas size.
pub fn render_text_effect(
    effect: TextEffect,
    background: &DecodedImage,
    block: &TextBlock,
    shaper: &mut TextShaper,
) -> FramixResult<Surface> {
    match effect {
        TextEffect::NoBorder => no_border(background, block, shaper),
        TextEffect::Border => border(background, block, shaper),
        TextEffect::Bevel3dV1 => bevel_3d_v1(background, block, shaper),
        TextEffect::Bevel3dV2 => bevel_3d_v2(background, block, shaper),
        TextEffect::Halo => halo(background, block, shaper),
        TextEffect::TransparentLetters => transparent_letters(background, block, shaper),
    }
}

/// Background clipped to the glyphs, then distorted by turbulence.
fn no_border(
    background: &DecodedImage,
    block: &TextBlock,
    shaper: &mut TextShaper,
) -> FramixResult<Surface> {
    let mut canvas = background_canvas(background)?;
    let mask = glyph_mask(
        shaper,
        block,
        &GlyphPass::fill_only(WHITE, LinePlacement::BLOCK),
    )?;
    mask.apply_to(&mut canvas)?;

    let distorted = distortion_graph().apply(canvas.data(), canvas.width(), canvas.height())?;
    canvas.replace_data(&distorted)?;
    Ok(canvas)
}

/// Glyph-windowed background plus three concentric stroke passes; only the
/// innermost pass carries the border color.
fn border(
    background: &DecodedImage,
    block: &TextBlock,
    shaper: &mut TextShaper,
) -> FramixResult<Surface> {
    let mut canvas = background_canvas(background)?;
    let mask_pass = GlyphPass {
        stroke_width: 6.0,
        ..GlyphPass::fill_only(WHITE, LinePlacement::BLOCK)
    };
    glyph_mask(shaper, block, &mask_pass)?.apply_to(&mut canvas)?;

    for (width, color) in [(4.0, None), (2.0, None), (1.0, Some(block.border_color))] {
        let pass = GlyphPass {
            font_size: FONT_SIZE,
            spacing_font_size: f64::from(FONT_SIZE),
            letter_spacing: 0.0,
            placement: LinePlacement::BLOCK,
            dy_em: 0.0,
            fill: None,
            stroke_width: width,
            stroke: color,
        };
        draw_glyph_pass(&mut canvas, shaper, block, &pass)?;
    }
    Ok(canvas)
}

/// Thick-stroked glyph window plus a dilated color outline at size 310.
fn bevel_3d_v1(
    background: &DecodedImage,
    block: &TextBlock,
    shaper: &mut TextShaper,
) -> FramixResult<Surface> {
    let mut canvas = background_canvas(background)?;
    let mask_pass = GlyphPass {
        font_size: FONT_SIZE,
        spacing_font_size: f64::from(FONT_SIZE),
        letter_spacing: 0.0,
        placement: LinePlacement::CENTER_ANCHORED,
        dy_em: 0.3,
        fill: Some(WHITE),
        stroke_width: 20.0,
        stroke: Some(WHITE),
    };
    glyph_mask(shaper, block, &mask_pass)?.apply_to(&mut canvas)?;

    let outline_size = 310.0f32;
    let outline_pass = GlyphPass {
        font_size: outline_size,
        spacing_font_size: f64::from(outline_size),
        letter_spacing: block.letter_spacing,
        placement: LinePlacement::CENTER_ANCHORED,
        dy_em: 0.3,
        fill: None,
        stroke_width: 1.0,
        stroke: Some(block.border_color),
    };
    let mut outline = Surface::new(CANVAS_SIZE, CANVAS_SIZE)?;
    draw_glyph_pass(&mut outline, shaper, block, &outline_pass)?;

    let filtered = dilated_outline_graph(block.border_color).apply(
        outline.data(),
        outline.width(),
        outline.height(),
    )?;
    outline.replace_data(&filtered)?;
    canvas.composite_over(&outline, 1.0)?;
    Ok(canvas)
}

/// Fill-only glyph window (the host's 70px stroke pass carries no paint) plus
/// a white-dilated color outline at size 305.
fn bevel_3d_v2(
    background: &DecodedImage,
    block: &TextBlock,
    shaper: &mut TextShaper,
) -> FramixResult<Surface> {
    let mut canvas = background_canvas(background)?;
    let mask_pass = GlyphPass {
        font_size: FONT_SIZE,
        spacing_font_size: f64::from(FONT_SIZE),
        letter_spacing: block.letter_spacing,
        placement: LinePlacement::BLOCK_ANCHORED,
        dy_em: 0.3,
        fill: Some(WHITE),
        stroke_width: 70.0,
        stroke: None,
    };
    glyph_mask(shaper, block, &mask_pass)?.apply_to(&mut canvas)?;

    let outline_pass = GlyphPass {
        font_size: 305.0,
        spacing_font_size: f64::from(FONT_SIZE),
        letter_spacing: block.letter_spacing,
        placement: LinePlacement::BLOCK_ANCHORED,
        dy_em: 0.3,
        fill: None,
        stroke_width: 4.0,
        stroke: Some(block.border_color),
    };
    let mut outline = Surface::new(CANVAS_SIZE, CANVAS_SIZE)?;
    draw_glyph_pass(&mut outline, shaper, block, &outline_pass)?;

    let filtered =
        dilated_outline_graph(WHITE).apply(outline.data(), outline.width(), outline.height())?;
    outline.replace_data(&filtered)?;
    canvas.composite_over(&outline, 1.0)?;
    Ok(canvas)
}

/// Glyph window with a green stroke rim; the luminance mask turns the rim
/// into a partial-opacity halo. No overlay passes.
fn halo(
    background: &DecodedImage,
    block: &TextBlock,
    shaper: &mut TextShaper,
) -> FramixResult<Surface> {
    let mut canvas = background_canvas(background)?;
    let mask_pass = GlyphPass {
        font_size: FONT_SIZE,
        spacing_font_size: f64::from(FONT_SIZE),
        letter_spacing: block.letter_spacing,
        placement: LinePlacement::CENTER_ANCHORED,
        dy_em: 0.3,
        fill: Some(WHITE),
        stroke_width: 10.0,
        stroke: Some(HALO_GREEN),
    };
    glyph_mask(shaper, block, &mask_pass)?.apply_to(&mut canvas)?;
    Ok(canvas)
}

/// Background drawn twice (plain, then glyph-clipped and distorted) with a
/// per-line beveled-edge text layer on top.
fn transparent_letters(
    background: &DecodedImage,
    block: &TextBlock,
    shaper: &mut TextShaper,
) -> FramixResult<Surface> {
    let mut canvas = background_canvas(background)?;

    let mut clipped = background_canvas(background)?;
    let mask = glyph_mask(
        shaper,
        block,
        &GlyphPass::fill_only(WHITE, LinePlacement::BLOCK),
    )?;
    mask.apply_to(&mut clipped)?;
    let distorted = distortion_graph().apply(clipped.data(), clipped.width(), clipped.height())?;
    clipped.replace_data(&distorted)?;
    canvas.composite_over(&clipped, 1.0)?;

    // The bevel filter runs per line, as the host applies it per text element.
    let ys = layout::line_positions(
        block.line_count(),
        f64::from(FONT_SIZE),
        block.line_spacing,
        LinePlacement::BLOCK,
        f64::from(CANVAS_SIZE),
    );
    let bevel = bevel_edge_graph();
    for (line, y) in block.lines.iter().zip(ys) {
        let shaped = shaper.shape_line(line, block.family, FONT_SIZE, 0.0)?;
        let mut layer = Surface::new(CANVAS_SIZE, CANVAS_SIZE)?;
        draw_line(
            &mut layer,
            &shaped,
            f64::from(CANVAS_SIZE) / 2.0,
            y,
            Some((WHITE, 255)),
            None,
        )?;
        let filtered = bevel.apply(layer.data(), layer.width(), layer.height())?;
        layer.replace_data(&filtered)?;
        canvas.composite_over(&layer, 1.0)?;
    }
    Ok(canvas)
}

// ---- shared steps ------------------------------------------------------------

fn background_canvas(background: &DecodedImage) -> FramixResult<Surface> {
    let mut canvas = Surface::new(CANVAS_SIZE, CANVAS_SIZE)?;
    canvas.draw_image(
        background,
        Rect::new(0.0, 0.0, f64::from(CANVAS_SIZE), f64::from(CANVAS_SIZE)),
    )?;
    Ok(canvas)
}

fn draw_glyph_pass(
    surface: &mut Surface,
    shaper: &mut TextShaper,
    block: &TextBlock,
    pass: &GlyphPass,
) -> FramixResult<()> {
    let ys = layout::line_positions(
        block.line_count(),
        pass.spacing_font_size,
        block.line_spacing,
        pass.placement,
        f64::from(CANVAS_SIZE),
    );
    for (line, y) in block.lines.iter().zip(ys) {
        let shaped = shaper.shape_line(
            line,
            block.family,
            pass.font_size,
            pass.letter_spacing as f32,
        )?;
        let middle_y = y + pass.dy_em * f64::from(pass.font_size);
        let stroke = pass.stroke.map(|c| (c, 255, pass.stroke_width));
        draw_line(
            surface,
            &shaped,
            f64::from(CANVAS_SIZE) / 2.0,
            middle_y,
            pass.fill.map(|c| (c, 255)),
            stroke,
        )?;
    }
    Ok(())
}

fn glyph_mask(
    shaper: &mut TextShaper,
    block: &TextBlock,
    pass: &GlyphPass,
) -> FramixResult<Mask> {
    let mut layer = Surface::new(CANVAS_SIZE, CANVAS_SIZE)?;
    draw_glyph_pass(&mut layer, shaper, block, pass)?;
    Ok(Mask::from_surface(&layer))
}

/// feTurbulence + feDisplacementMap as the host configures them.
fn distortion_graph() -> FilterGraph {
    FilterGraph::new(vec![
        FilterPrimitive {
            input: FilterInput::Source,
            op: FilterOp::Turbulence {
                base_frequency: 0.05,
                num_octaves: 2,
            },
        },
        FilterPrimitive {
            input: FilterInput::Source,
            op: FilterOp::DisplacementMap {
                displacement: FilterInput::Result(0),
                scale: 20.0,
            },
        },
    ])
}

/// Dilate the source silhouette, flood it with `color`, and merge the source
/// back on top.
fn dilated_outline_graph(color: Rgb) -> FilterGraph {
    FilterGraph::new(vec![
        FilterPrimitive {
            input: FilterInput::SourceAlpha,
            op: FilterOp::Dilate { radius: 3 },
        },
        FilterPrimitive {
            input: FilterInput::Source,
            op: FilterOp::Flood { color, alpha: 255 },
        },
        FilterPrimitive {
            input: FilterInput::Result(1),
            op: FilterOp::CompositeIn {
                mask: FilterInput::Result(0),
            },
        },
        FilterPrimitive {
            input: FilterInput::Source,
            op: FilterOp::Merge {
                inputs: vec![FilterInput::Result(2), FilterInput::Source],
            },
        },
    ])
}

/// Dual dark/light offset edges outside the glyphs, plus a blurred specular
/// bevel inside them.
fn bevel_edge_graph() -> FilterGraph {
    FilterGraph::new(vec![
        // 0..3: dark edge, dilated and offset toward lower right
        FilterPrimitive {
            input: FilterInput::SourceAlpha,
            op: FilterOp::Dilate { radius: 4 },
        },
        FilterPrimitive {
            input: FilterInput::Result(0),
            op: FilterOp::Offset { dx: 5, dy: 5 },
        },
        FilterPrimitive {
            input: FilterInput::Source,
            op: FilterOp::Flood {
                color: Rgb::new(0, 0, 0),
                alpha: 128,
            },
        },
        FilterPrimitive {
            input: FilterInput::Result(2),
            op: FilterOp::CompositeIn {
                mask: FilterInput::Result(1),
            },
        },
        // 4..7: light edge, offset toward upper left
        FilterPrimitive {
            input: FilterInput::SourceAlpha,
            op: FilterOp::Dilate { radius: 4 },
        },
        FilterPrimitive {
            input: FilterInput::Result(4),
            op: FilterOp::Offset { dx: -2, dy: -2 },
        },
        FilterPrimitive {
            input: FilterInput::Source,
            op: FilterOp::Flood {
                color: WHITE,
                alpha: 128,
            },
        },
        FilterPrimitive {
            input: FilterInput::Result(6),
            op: FilterOp::CompositeIn {
                mask: FilterInput::Result(5),
            },
        },
        // 8..9: edges merged, then cut where the glyphs themselves sit
        FilterPrimitive {
            input: FilterInput::Source,
            op: FilterOp::Merge {
                inputs: vec![FilterInput::Result(3), FilterInput::Result(7)],
            },
        },
        FilterPrimitive {
            input: FilterInput::Result(8),
            op: FilterOp::CompositeOut {
                subtract: FilterInput::Source,
            },
        },
        // 10..12: specular bevel inside the glyphs
        FilterPrimitive {
            input: FilterInput::Result(9),
            op: FilterOp::GaussianBlur { sigma: 5.0 },
        },
        FilterPrimitive {
            input: FilterInput::Result(10),
            op: FilterOp::SpecularLighting {
                specular_constant: 2.4,
                specular_exponent: 13.0,
                color: Rgb::new(60, 60, 60),
                color_alpha: 102,
                azimuth_deg: 25.0,
                elevation_deg: 40.0,
            },
        },
        FilterPrimitive {
            input: FilterInput::Result(11),
            op: FilterOp::CompositeIn {
                mask: FilterInput::Source,
            },
        },
        FilterPrimitive {
            input: FilterInput::Source,
            op: FilterOp::Merge {
                inputs: vec![FilterInput::Result(9), FilterInput::Result(12)],
            },
        },
    ])
}
