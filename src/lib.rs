#![forbid(unsafe_code)]

pub mod catalog;
pub mod composite;
pub mod decode;
pub mod effects;
pub mod error;
pub mod fx;
pub mod layout;
pub mod mask;
pub mod model;
pub mod panel;
pub mod pipeline;
pub mod services;
pub mod surface;
pub mod text;

pub use decode::DecodedImage;
pub use error::{FramixError, FramixResult};
pub use mask::{Mask, Polarity, SegmentationMask};
pub use model::{
    Action, CANVAS_SIZE, FontFamily, ProcessRequest, Rgb, ShapeId, TextBlock, TextEffect,
};
pub use pipeline::Processor;
pub use services::{
    AlphaSegmenter, GeneratedImage, GenerationService, HttpFetcher, HttpGenerationService,
    ImageFetcher, Segmenter, StaticGeneration,
};
pub use surface::Surface;
pub use text::TextShaper;
