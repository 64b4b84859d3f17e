//! External collaborator boundaries: the generation service, asset fetching
//! and foreground segmentation.
//!
//! The pipeline only sees these traits; the provided implementations cover
//! the production HTTP wiring plus offline stand-ins used by the CLI and
//! tests. No retry logic lives here: retries belong to the caller.

use std::time::Duration;

use anyhow::Context as _;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::{
    error::{FramixError, FramixResult},
    mask::SegmentationMask,
    model::Action,
};

/// Response of the generation call: a URL, data URL or local path to the
/// generated raster.
#[derive(Clone, Debug)]
pub struct GeneratedImage {
    pub image: String,
}

/// `generate(action, prompt, context) -> ImageURL` black box.
pub trait GenerationService {
    fn generate(
        &self,
        action: Action,
        prompt: &str,
        selected_image_url: Option<&str>,
    ) -> FramixResult<GeneratedImage>;
}

/// Resolves an image location (URL, data URL or file path) to raw bytes.
pub trait ImageFetcher {
    fn fetch(&self, location: &str) -> FramixResult<Vec<u8>>;
}

/// `segmentForeground(image) -> AlphaMask` black box.
pub trait Segmenter {
    fn segment_foreground(
        &self,
        rgba8_premul: &[u8],
        width: u32,
        height: u32,
    ) -> FramixResult<SegmentationMask>;
}

#[derive(serde::Serialize)]
struct GenerationRequestBody<'a> {
    action: &'a str,
    #[serde(rename = "userPrompt")]
    user_prompt: &'a str,
    #[serde(rename = "selectedImageUrl", skip_serializing_if = "Option::is_none")]
    selected_image_url: Option<&'a str>,
}

#[derive(serde::Deserialize)]
struct GenerationResponseBody {
    image: Option<String>,
}

/// Production generation backend: POSTs the action, prompt and optional
/// selected image to the configured endpoint with bearer auth.
pub struct HttpGenerationService {
    endpoint: String,
    bearer_token: Option<String>,
    client: reqwest::blocking::Client,
}

impl HttpGenerationService {
    pub fn new(
        endpoint: impl Into<String>,
        bearer_token: Option<String>,
        timeout: Duration,
    ) -> FramixResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FramixError::generation(format!("build http client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            bearer_token,
            client,
        })
    }
}

impl GenerationService for HttpGenerationService {
    fn generate(
        &self,
        action: Action,
        prompt: &str,
        selected_image_url: Option<&str>,
    ) -> FramixResult<GeneratedImage> {
        let body = GenerationRequestBody {
            action: action.wire_name(),
            user_prompt: prompt,
            selected_image_url,
        };

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }

        let res = req
            .send()
            .map_err(|e| FramixError::generation(format!("generation call failed: {e}")))?;
        let status = res.status();
        if !status.is_success() {
            return Err(FramixError::generation(format!(
                "generation service returned {status}"
            )));
        }

        let parsed: GenerationResponseBody = res
            .json()
            .map_err(|e| FramixError::generation(format!("malformed generation body: {e}")))?;
        let image = parsed
            .image
            .ok_or_else(|| FramixError::generation("generation response missing image field"))?;

        tracing::debug!(action = action.wire_name(), "generation call succeeded");
        Ok(GeneratedImage { image })
    }
}

/// Offline generation stand-in returning a fixed location; used by the CLI's
/// file-backed mode and by tests.
pub struct StaticGeneration {
    pub image: String,
}

impl GenerationService for StaticGeneration {
    fn generate(
        &self,
        _action: Action,
        _prompt: &str,
        _selected_image_url: Option<&str>,
    ) -> FramixResult<GeneratedImage> {
        Ok(GeneratedImage {
            image: self.image.clone(),
        })
    }
}

/// Fetcher handling `data:` URLs, `http(s)` URLs and local file paths.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> FramixResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FramixError::generation(format!("build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, location: &str) -> FramixResult<Vec<u8>> {
        if let Some(rest) = location.strip_prefix("data:") {
            let payload = rest
                .split_once(";base64,")
                .map(|(_, data)| data)
                .ok_or_else(|| FramixError::decode("data url is not base64-encoded"))?;
            return BASE64
                .decode(payload.trim())
                .map_err(|e| FramixError::decode(format!("decode data url: {e}")));
        }

        if location.starts_with("http://") || location.starts_with("https://") {
            let res = self
                .client
                .get(location)
                .send()
                .map_err(|e| FramixError::generation(format!("fetch '{location}': {e}")))?;
            let status = res.status();
            if !status.is_success() {
                return Err(FramixError::generation(format!(
                    "fetch '{location}' returned {status}"
                )));
            }
            let bytes = res
                .bytes()
                .map_err(|e| FramixError::generation(format!("read '{location}': {e}")))?;
            return Ok(bytes.to_vec());
        }

        Ok(std::fs::read(location)
            .with_context(|| format!("read image file '{location}'"))
            .map_err(FramixError::Other)?)
    }
}

/// Degenerate segmentation adapter treating every non-transparent pixel as
/// foreground. Stands in for a model-backed segmenter behind the same trait;
/// the real adapter wires an inference backend here.
pub struct AlphaSegmenter;

impl Segmenter for AlphaSegmenter {
    fn segment_foreground(
        &self,
        rgba8_premul: &[u8],
        width: u32,
        height: u32,
    ) -> FramixResult<SegmentationMask> {
        if rgba8_premul.len() != width as usize * height as usize * 4 {
            return Err(FramixError::evaluation(
                "segmentation input must match width*height*4",
            ));
        }
        let data = rgba8_premul
            .chunks_exact(4)
            .map(|px| f32::from(px[3]) / 255.0)
            .collect();
        Ok(SegmentationMask {
            data,
            width,
            height,
        })
    }
}

/// Encode raw image bytes as a PNG data URL (host-compatible form).
pub fn to_data_url(png_bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_host_field_names() {
        let body = GenerationRequestBody {
            action: Action::TextFrame.wire_name(),
            user_prompt: "a lake",
            selected_image_url: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["action"], "text frame");
        assert_eq!(json["userPrompt"], "a lake");
        assert!(json.get("selectedImageUrl").is_none());
    }

    #[test]
    fn static_generation_echoes_location() {
        let service = StaticGeneration {
            image: "gen.png".to_string(),
        };
        let out = service.generate(Action::GenerateBackground, "p", None).unwrap();
        assert_eq!(out.image, "gen.png");
    }

    #[test]
    fn fetch_decodes_base64_data_urls() {
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let url = to_data_url(b"framix");
        assert_eq!(fetcher.fetch(&url).unwrap(), b"framix");
    }

    #[test]
    fn fetch_rejects_non_base64_data_urls() {
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch("data:image/png,rawpayload").unwrap_err();
        assert!(matches!(err, FramixError::Decode(_)));
    }

    #[test]
    fn fetch_reads_local_files() {
        let path = std::env::temp_dir().join("framix_fetch_test.bin");
        std::fs::write(&path, b"pixels").unwrap();
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        assert_eq!(fetcher.fetch(path.to_str().unwrap()).unwrap(), b"pixels");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn alpha_segmenter_follows_alpha_channel() {
        let rgba = vec![0u8, 0, 0, 255, 0, 0, 0, 0];
        let seg = AlphaSegmenter.segment_foreground(&rgba, 2, 1).unwrap();
        assert_eq!(seg.data, vec![1.0, 0.0]);
    }
}
