//! Top-level compositing pipeline: one strategy per action, one surface per
//! invocation, PNG bytes out.

use kurbo::Rect;

use crate::{
    catalog, decode,
    decode::DecodedImage,
    effects,
    error::FramixResult,
    mask::{Mask, Polarity},
    model::{Action, CANVAS_SIZE, ProcessRequest},
    panel,
    services::{GenerationService, ImageFetcher, Segmenter},
    surface::Surface,
    text::TextShaper,
};

/// Segmentation likelihood at or above this counts as foreground.
pub const SEGMENTATION_THRESHOLD: f32 = 0.7;

const BORDER_FOREGROUND_W: f64 = 820.0;
const BORDER_FOREGROUND_H: f64 = 868.0;
/// Fraction of the frame's extent available to the framed foreground.
const FRAME_INNER_RATIO: f64 = 0.6;

/// Per-invocation pipeline front end over the external collaborators.
///
/// Every call to [`Processor::process`] creates its own surfaces and shaper;
/// nothing is cached or shared across invocations, so independent invocations
/// may run concurrently.
pub struct Processor<'a> {
    generation: &'a dyn GenerationService,
    fetcher: &'a dyn ImageFetcher,
    segmenter: &'a dyn Segmenter,
    fallback_font: Option<Vec<u8>>,
}

impl<'a> Processor<'a> {
    pub fn new(
        generation: &'a dyn GenerationService,
        fetcher: &'a dyn ImageFetcher,
        segmenter: &'a dyn Segmenter,
    ) -> Self {
        Self {
            generation,
            fetcher,
            segmenter,
            fallback_font: None,
        }
    }

    /// Provide raw font bytes used as the last-resort family for text
    /// effects on hosts without usable system fonts.
    pub fn with_fallback_font(mut self, font_bytes: Vec<u8>) -> Self {
        self.fallback_font = Some(font_bytes);
        self
    }

    /// Run one invocation to completion and serialize the canvas as PNG.
    ///
    /// All failures are local to the invocation; no partial canvas is ever
    /// returned.
    #[tracing::instrument(skip_all, fields(action = request.action.wire_name()))]
    pub fn process(&self, request: &ProcessRequest) -> FramixResult<Vec<u8>> {
        request.validate()?;

        let generated =
            self.generation
                .generate(request.action, &request.user_prompt, request.selected_image_url.as_deref())?;
        let background = decode::decode_image(&self.fetcher.fetch(&generated.image)?)?;
        tracing::debug!(
            width = background.width,
            height = background.height,
            "generated image decoded"
        );

        match request.action {
            Action::ChangeBackground => self.change_background(request, &background)?.to_png(),
            Action::AddBorder => self.add_border(request, &background)?.to_png(),
            Action::AddPictureFrame => self.add_picture_frame(request, &background)?.to_png(),
            Action::AddShapedFrame => self.add_shaped_frame(request, &background)?.to_png(),
            Action::GenerateTransparentShape => {
                let mut canvas = full_canvas(&background)?;
                let path = catalog::path_for_name(request.shape.as_deref().unwrap_or(""));
                Mask::from_shape(&path, Polarity::Hole, CANVAS_SIZE, CANVAS_SIZE)?
                    .apply_to(&mut canvas)?;
                canvas.to_png()
            }
            Action::GenerateShapedImage => {
                let mut canvas = full_canvas(&background)?;
                let path = catalog::path_for_name(request.shape.as_deref().unwrap_or(""));
                Mask::from_shape(&path, Polarity::Window, CANVAS_SIZE, CANVAS_SIZE)?
                    .apply_to(&mut canvas)?;
                canvas.to_png()
            }
            Action::TextFrame => {
                let block = request.text_block()?;
                let mut shaper = self.make_shaper()?;
                effects::render_text_effect(request.text_effect(), &background, &block, &mut shaper)?
                    .to_png()
            }
            // Passthrough: the generation call itself is the transform.
            Action::ImageVariation | Action::GenerateBackground => decode::encode_png(
                &background.rgba8_premul,
                background.width,
                background.height,
            ),
            Action::ImagePanel3d => panel::render_panel(&background)?.to_png(),
        }
    }

    fn make_shaper(&self) -> FramixResult<TextShaper> {
        let mut shaper = TextShaper::new();
        if let Some(bytes) = &self.fallback_font {
            shaper.register_fallback_font(bytes)?;
        }
        Ok(shaper)
    }

    fn fetch_selected(&self, request: &ProcessRequest) -> FramixResult<DecodedImage> {
        // validate() already guaranteed presence for the actions that get here.
        let location = request.selected_image_url.as_deref().unwrap_or("");
        decode::decode_image(&self.fetcher.fetch(location)?)
    }

    fn change_background(
        &self,
        request: &ProcessRequest,
        background: &DecodedImage,
    ) -> FramixResult<Surface> {
        let selected = self.fetch_selected(request)?;

        let mut foreground = full_canvas(&selected)?;
        let seg = self
            .segmenter
            .segment_foreground(foreground.data(), CANVAS_SIZE, CANVAS_SIZE)?;
        Mask::from_segmentation(&seg, SEGMENTATION_THRESHOLD)?.apply_to(&mut foreground)?;
        tracing::debug!("foreground segmentation applied");

        let mut canvas = full_canvas(background)?;
        canvas.composite_over(&foreground, 1.0)?;
        Ok(canvas)
    }

    fn add_border(
        &self,
        request: &ProcessRequest,
        background: &DecodedImage,
    ) -> FramixResult<Surface> {
        let selected = self.fetch_selected(request)?;
        let mut canvas = full_canvas(background)?;
        let x = (f64::from(CANVAS_SIZE) - BORDER_FOREGROUND_W) / 2.0;
        let y = (f64::from(CANVAS_SIZE) - BORDER_FOREGROUND_H) / 2.0;
        canvas.draw_image(
            &selected,
            Rect::new(x, y, x + BORDER_FOREGROUND_W, y + BORDER_FOREGROUND_H),
        )?;
        Ok(canvas)
    }

    fn add_picture_frame(
        &self,
        request: &ProcessRequest,
        frame: &DecodedImage,
    ) -> FramixResult<Surface> {
        let selected = self.fetch_selected(request)?;

        // The canvas takes the frame asset's native dimensions.
        let mut canvas = Surface::new(frame.width, frame.height)?;
        canvas.draw_image(
            frame,
            Rect::new(0.0, 0.0, f64::from(frame.width), f64::from(frame.height)),
        )?;

        let inner_w = f64::from(frame.width) * FRAME_INNER_RATIO;
        let inner_h = f64::from(frame.height) * FRAME_INNER_RATIO;
        let scale = (inner_w / f64::from(selected.width)).min(inner_h / f64::from(selected.height));
        let w = f64::from(selected.width) * scale;
        let h = f64::from(selected.height) * scale;
        let x = (f64::from(frame.width) - w) / 2.0;
        let y = (f64::from(frame.height) - h) / 2.0;
        canvas.draw_image(&selected, Rect::new(x, y, x + w, y + h))?;
        Ok(canvas)
    }

    fn add_shaped_frame(
        &self,
        request: &ProcessRequest,
        background: &DecodedImage,
    ) -> FramixResult<Surface> {
        let selected = self.fetch_selected(request)?;

        let mut canvas = full_canvas(background)?;
        let mut foreground = full_canvas(&selected)?;
        let path = catalog::path_for_name(request.shape.as_deref().unwrap_or(""));
        Mask::from_shape(&path, Polarity::Window, CANVAS_SIZE, CANVAS_SIZE)?
            .apply_to(&mut foreground)?;
        canvas.composite_over(&foreground, 1.0)?;
        Ok(canvas)
    }
}

/// Fresh fixed-size canvas with the image drawn over its full extent.
fn full_canvas(image: &DecodedImage) -> FramixResult<Surface> {
    let mut canvas = Surface::new(CANVAS_SIZE, CANVAS_SIZE)?;
    canvas.draw_image(
        image,
        Rect::new(0.0, 0.0, f64::from(CANVAS_SIZE), f64::from(CANVAS_SIZE)),
    )?;
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        error::FramixError,
        mask::SegmentationMask,
        model::ProcessRequest,
        services::{GeneratedImage, StaticGeneration},
    };

    struct MemoryFetcher {
        files: HashMap<String, Vec<u8>>,
    }

    impl ImageFetcher for MemoryFetcher {
        fn fetch(&self, location: &str) -> FramixResult<Vec<u8>> {
            self.files
                .get(location)
                .cloned()
                .ok_or_else(|| FramixError::generation(format!("no such asset '{location}'")))
        }
    }

    struct FullForeground;
    impl Segmenter for FullForeground {
        fn segment_foreground(
            &self,
            rgba: &[u8],
            width: u32,
            height: u32,
        ) -> FramixResult<SegmentationMask> {
            Ok(SegmentationMask {
                data: vec![1.0; rgba.len() / 4],
                width,
                height,
            })
        }
    }

    struct FailingGeneration;
    impl GenerationService for FailingGeneration {
        fn generate(
            &self,
            _action: Action,
            _prompt: &str,
            _selected: Option<&str>,
        ) -> FramixResult<GeneratedImage> {
            Err(FramixError::generation("backend unavailable"))
        }
    }

    fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let mut img = image::RgbaImage::new(width, height);
        for px in img.pixels_mut() {
            *px = image::Rgba(rgba);
        }
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn generation_failure_aborts_the_invocation() {
        let fetcher = MemoryFetcher {
            files: HashMap::new(),
        };
        let generation = FailingGeneration;
        let processor = Processor::new(&generation, &fetcher, &FullForeground);
        let req = ProcessRequest::new(Action::GenerateBackground, "p");
        let err = processor.process(&req).unwrap_err();
        assert!(matches!(err, FramixError::Generation(_)));
    }

    #[test]
    fn undecodable_generated_image_is_a_decode_error() {
        let generation = StaticGeneration {
            image: "gen".to_string(),
        };
        let fetcher = MemoryFetcher {
            files: HashMap::from([("gen".to_string(), b"junk".to_vec())]),
        };
        let processor = Processor::new(&generation, &fetcher, &FullForeground);
        let req = ProcessRequest::new(Action::GenerateBackground, "p");
        let err = processor.process(&req).unwrap_err();
        assert!(matches!(err, FramixError::Decode(_)));
    }

    #[test]
    fn passthrough_reencodes_at_native_dimensions() {
        let generation = StaticGeneration {
            image: "gen".to_string(),
        };
        let fetcher = MemoryFetcher {
            files: HashMap::from([("gen".to_string(), solid_png(33, 21, [5, 6, 7, 255]))]),
        };
        let processor = Processor::new(&generation, &fetcher, &FullForeground);
        let req = ProcessRequest::new(Action::ImageVariation, "p");
        // passthrough still requires a selected image per host validation
        let req = ProcessRequest {
            selected_image_url: Some("gen".to_string()),
            ..req
        };
        let png = processor.process(&req).unwrap();
        let decoded = crate::decode::decode_image(&png).unwrap();
        assert_eq!((decoded.width, decoded.height), (33, 21));
    }

    #[test]
    fn missing_required_parameter_fails_before_generation() {
        let generation = FailingGeneration;
        let fetcher = MemoryFetcher {
            files: HashMap::new(),
        };
        let processor = Processor::new(&generation, &fetcher, &FullForeground);
        let req = ProcessRequest::new(Action::GenerateShapedImage, "p");
        // No shape: must fail with InvalidParameter, not the generation error.
        let err = processor.process(&req).unwrap_err();
        assert!(matches!(err, FramixError::InvalidParameter(_)));
    }

    #[test]
    fn change_background_composites_foreground_over_generated() {
        let generation = StaticGeneration {
            image: "bg".to_string(),
        };
        let fetcher = MemoryFetcher {
            files: HashMap::from([
                ("bg".to_string(), solid_png(16, 16, [0, 0, 255, 255])),
                ("fg".to_string(), solid_png(16, 16, [255, 0, 0, 255])),
            ]),
        };
        let processor = Processor::new(&generation, &fetcher, &FullForeground);
        let mut req = ProcessRequest::new(Action::ChangeBackground, "p");
        req.selected_image_url = Some("fg".to_string());
        let png = processor.process(&req).unwrap();
        let out = crate::decode::decode_image(&png).unwrap();
        assert_eq!((out.width, out.height), (CANVAS_SIZE, CANVAS_SIZE));
        // Full-foreground segmentation keeps the selected image on top.
        assert_eq!(&out.rgba8_premul[..4], &[255, 0, 0, 255]);
    }
}
