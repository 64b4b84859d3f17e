use std::borrow::Cow;

use parley::style::{FontStack, GenericFamily, StyleProperty};

use crate::{
    error::{FramixError, FramixResult},
    model::{FontFamily, Rgb},
    surface::{Surface, affine_to_cpu},
};

/// RGBA8 brush color carried through Parley layouts. The actual paint is set
/// on the render context per pass, so the brush value itself is inert.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// A single shaped line with the metrics the effect recipes position by.
pub struct ShapedLine {
    layout: parley::Layout<TextBrushRgba8>,
    width: f64,
    ascent: f64,
    descent: f64,
    /// Baseline position inside the layout's own coordinate space.
    baseline: f64,
}

impl ShapedLine {
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.layout.lines().next().is_none()
    }
}

/// Stateful helper building Parley layouts against the system font set.
///
/// Created once per pipeline invocation; no cross-invocation caching.
pub struct TextShaper {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    fallback_family: Option<String>,
}

impl Default for TextShaper {
    fn default() -> Self {
        Self::new()
    }
}

impl TextShaper {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            fallback_family: None,
        }
    }

    /// Register raw font bytes and make that family the final fallback in
    /// every stack. Lets hosts (and tests) run without any system fonts.
    pub fn register_fallback_font(&mut self, font_bytes: &[u8]) -> FramixResult<String> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            FramixError::invalid_parameter("no font families registered from font bytes")
        })?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| FramixError::invalid_parameter("registered font family has no name"))?
            .to_string();
        self.fallback_family = Some(family_name.clone());
        Ok(family_name)
    }

    /// Shape one line at the given size, weight 900, optional letter spacing.
    pub fn shape_line(
        &mut self,
        text: &str,
        family: FontFamily,
        size_px: f32,
        letter_spacing: f32,
    ) -> FramixResult<ShapedLine> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(FramixError::invalid_parameter(
                "font size must be finite and > 0",
            ));
        }

        let mut stack = vec![
            parley::style::FontFamily::Named(Cow::Borrowed(primary_name(family))),
            parley::style::FontFamily::Generic(generic_for(family)),
        ];
        if let Some(fallback) = &self.fallback_family {
            stack.push(parley::style::FontFamily::Named(Cow::Owned(
                fallback.clone(),
            )));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(StyleProperty::FontStack(FontStack::List(Cow::Owned(stack))));
        builder.push_default(StyleProperty::FontSize(size_px));
        builder.push_default(StyleProperty::FontWeight(parley::style::FontWeight::BLACK));
        if letter_spacing != 0.0 {
            builder.push_default(StyleProperty::LetterSpacing(letter_spacing));
        }
        builder.push_default(StyleProperty::Brush(TextBrushRgba8::default()));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);

        let (ascent, descent, baseline) = match layout.lines().next() {
            Some(line) => {
                let m = line.metrics();
                (
                    f64::from(m.ascent),
                    f64::from(m.descent),
                    f64::from(m.baseline),
                )
            }
            None => (0.0, 0.0, 0.0),
        };

        Ok(ShapedLine {
            width: f64::from(layout.width()),
            ascent,
            descent,
            baseline,
            layout,
        })
    }
}

/// Draw a shaped line with its horizontal center at `center_x` and its visual
/// vertical middle at `middle_y` (the "centered, middle-baseline" contract).
pub fn draw_line(
    surface: &mut Surface,
    line: &ShapedLine,
    center_x: f64,
    middle_y: f64,
    fill: Option<(Rgb, u8)>,
    stroke: Option<(Rgb, u8, f64)>,
) -> FramixResult<()> {
    if line.is_empty() || (fill.is_none() && stroke.is_none()) {
        return Ok(());
    }

    // Place the baseline so the ink box [baseline - ascent, baseline + descent]
    // centers on middle_y, independent of the layout's internal leading.
    let target_baseline = middle_y + (line.ascent - line.descent) / 2.0;
    let origin = kurbo::Affine::translate((
        center_x - line.width / 2.0,
        target_baseline - line.baseline,
    ));

    surface.paint(|ctx| {
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_transform(affine_to_cpu(origin));

        for l in line.layout.lines() {
            for item in l.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let font = run.run().font();
                let font_data = vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(font.data.as_ref().to_vec()),
                    font.index,
                );
                let font_size = run.run().font_size();

                if let Some((rgb, alpha)) = fill {
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        rgb.r, rgb.g, rgb.b, alpha,
                    ));
                    let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&font_data)
                        .font_size(font_size)
                        .fill_glyphs(glyphs);
                }

                if let Some((rgb, alpha, width)) = stroke {
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        rgb.r, rgb.g, rgb.b, alpha,
                    ));
                    ctx.set_stroke(vello_cpu::kurbo::Stroke::new(width));
                    let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&font_data)
                        .font_size(font_size)
                        .stroke_glyphs(glyphs);
                }
            }
        }
        Ok(())
    })
}

fn primary_name(family: FontFamily) -> &'static str {
    match family {
        FontFamily::Arial => "Arial",
        FontFamily::Helvetica => "Helvetica",
        FontFamily::TimesNewRoman => "Times New Roman",
        FontFamily::CourierNew => "Courier New",
        FontFamily::Verdana => "Verdana",
        FontFamily::Georgia => "Georgia",
        FontFamily::Palatino => "Palatino",
        FontFamily::Garamond => "Garamond",
        FontFamily::ComicSansMs => "Comic Sans MS",
        FontFamily::TrebuchetMs => "Trebuchet MS",
        FontFamily::ArialBlack => "Arial Black",
        FontFamily::Impact => "Impact",
    }
}

fn generic_for(family: FontFamily) -> GenericFamily {
    match family {
        FontFamily::TimesNewRoman
        | FontFamily::Georgia
        | FontFamily::Palatino
        | FontFamily::Garamond => GenericFamily::Serif,
        FontFamily::CourierNew => GenericFamily::Monospace,
        FontFamily::ComicSansMs => GenericFamily::Cursive,
        FontFamily::Arial
        | FontFamily::Helvetica
        | FontFamily::Verdana
        | FontFamily::TrebuchetMs
        | FontFamily::ArialBlack
        | FontFamily::Impact => GenericFamily::SansSerif,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_rejects_bad_size() {
        let mut shaper = TextShaper::new();
        assert!(
            shaper
                .shape_line("x", FontFamily::Arial, 0.0, 0.0)
                .is_err()
        );
        assert!(
            shaper
                .shape_line("x", FontFamily::Arial, f32::NAN, 0.0)
                .is_err()
        );
    }

    #[test]
    fn empty_text_shapes_to_empty_line() {
        let mut shaper = TextShaper::new();
        let line = shaper.shape_line("", FontFamily::Arial, 300.0, 0.0).unwrap();
        assert!(line.width() <= f64::EPSILON);
    }

    #[test]
    fn drawing_an_empty_line_is_a_noop() {
        let mut shaper = TextShaper::new();
        let line = shaper.shape_line("", FontFamily::Arial, 300.0, 0.0).unwrap();
        let mut surface = Surface::new(8, 8).unwrap();
        draw_line(
            &mut surface,
            &line,
            4.0,
            4.0,
            Some((Rgb::new(255, 255, 255), 255)),
            None,
        )
        .unwrap();
        assert!(surface.data().iter().all(|&b| b == 0));
    }
}
