// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Free-text detector — asks a vision model to transcribe the image.
//
// The image is PNG-encoded, base64-encoded, and posted to an Ollama-style
// `/api/generate` endpoint with `stream: false`. The reply's `response` field
// is the only output; there is no geometry.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};
use visionguard_core::{
    BoxConstraints, DetectorConfig, DetectorDefaults, DetectorKind, Result, VisionGuardError,
};
use visionguard_imaging::{PixelBuffer, codec};

use super::TextDetector;
use crate::detection::DetectionResult;

/// Instruction sent with every image.
pub const PROMPT: &str = "Transcribe every piece of visible text in this image exactly as written, \
one item per line. Include names, dates, identifiers, and numbers. Return only the text.";

/// Transport to a remote vision model.
pub trait InferenceClient {
    /// Send one prompt plus base64 image and return the model's reply.
    fn generate(&self, model: &str, prompt: &str, image_b64: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Blocking HTTP client for Ollama's generate endpoint.
pub struct OllamaClient {
    http: reqwest::blocking::Client,
    url: String,
}

impl OllamaClient {
    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                VisionGuardError::Configuration(format!("cannot build HTTP client: {err}"))
            })?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl InferenceClient for OllamaClient {
    #[instrument(skip(self, prompt, image_b64), fields(url = %self.url, payload = image_b64.len()))]
    fn generate(&self, model: &str, prompt: &str, image_b64: &str) -> Result<String> {
        // `image` for the legacy single-image field, `images` for current Ollama.
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "image": image_b64,
            "images": [image_b64],
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|err| VisionGuardError::Detection(format!("inference request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(VisionGuardError::Detection(format!(
                "inference endpoint returned {status}: {text}"
            )));
        }

        let parsed: GenerateResponse = response.json().map_err(|err| {
            VisionGuardError::Detection(format!("malformed inference response: {err}"))
        })?;
        debug!(chars = parsed.response.len(), "Inference response received");
        Ok(parsed.response)
    }
}

/// Text detector backed by a remote vision model.
pub struct FreeTextDetector {
    url: String,
    model: String,
    timeout: Duration,
    client: Option<Box<dyn InferenceClient>>,
}

impl FreeTextDetector {
    pub const NAME: &'static str = "ollama";

    /// A detector that still needs `configure` before use.
    pub fn new(defaults: &DetectorDefaults) -> Self {
        Self {
            url: defaults.inference_url.clone(),
            model: defaults.inference_model.clone(),
            timeout: defaults.request_timeout,
            client: None,
        }
    }

    /// Install a transport directly.
    pub fn with_client(mut self, client: impl InferenceClient + 'static) -> Self {
        self.client = Some(Box::new(client));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn transcribe(&self, image: &PixelBuffer) -> Result<String> {
        let client = self.client.as_ref().ok_or_else(|| {
            VisionGuardError::Detection("no inference endpoint configured".into())
        })?;
        let png = codec::png_bytes(image.image())?;
        let encoded = STANDARD.encode(png);
        client.generate(&self.model, PROMPT, &encoded)
    }
}

impl TextDetector for FreeTextDetector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::FreeText
    }

    /// `params[0]` is the endpoint URL (required); `params[1]` overrides the
    /// model name. Builds the HTTP client with the current timeout, so call
    /// `initialize` first when the timeout comes from configuration.
    fn configure(&mut self, params: &[&str]) -> Result<()> {
        let url = params
            .first()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                VisionGuardError::Configuration("inference endpoint URL is required".into())
            })?;
        if let Some(model) = params.get(1).map(|m| m.trim()).filter(|m| !m.is_empty()) {
            self.model = model.to_string();
        }
        self.url = url.to_string();
        self.client = Some(Box::new(OllamaClient::new(url, self.timeout)?));
        info!(url = %self.url, model = %self.model, timeout = ?self.timeout, "Inference endpoint configured");
        Ok(())
    }

    fn initialize(&mut self, config: &DetectorConfig) -> Result<()> {
        let defaults = config.detector_defaults();
        self.timeout = defaults.request_timeout;
        if config.inference_model.is_some() {
            self.model = defaults.inference_model;
        }
        if config.inference_url.is_some() {
            self.url = defaults.inference_url;
        }
        Ok(())
    }

    /// No geometry, so there is nothing to constrain.
    fn set_bounding_box_constraints(&mut self, _constraints: BoxConstraints) -> Result<()> {
        Ok(())
    }

    #[instrument(skip_all, fields(detector = Self::NAME, model = %self.model))]
    fn detect<'a>(&self, image: &'a PixelBuffer) -> DetectionResult<'a> {
        let text = match self.transcribe(image) {
            Ok(text) => text,
            Err(err) => {
                error!(%err, "Free-text detection failed; using empty response");
                String::new()
            }
        };
        if text.trim().is_empty() {
            warn!("Vision model returned no text");
        }
        DetectionResult::with_text(image, Self::NAME, text)
    }

    fn is_ready(&self) -> bool {
        self.client.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Instant;

    use image::{DynamicImage, RgbImage};
    use visionguard_core::Action;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records every call and answers with a fixed reply.
    #[derive(Clone, Default)]
    struct Recording {
        reply: Option<String>,
        calls: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl InferenceClient for Recording {
        fn generate(&self, model: &str, _prompt: &str, image_b64: &str) -> Result<String> {
            self.calls
                .borrow_mut()
                .push((model.to_string(), image_b64.to_string()));
            self.reply
                .clone()
                .ok_or_else(|| VisionGuardError::Detection("timed out".into()))
        }
    }

    fn buffer() -> PixelBuffer {
        PixelBuffer::raster(DynamicImage::ImageRgb8(RgbImage::new(8, 8)))
    }

    #[test]
    fn sends_base64_png_and_returns_response() {
        let client = Recording {
            reply: Some("John Doe\nMRN 00123".into()),
            ..Default::default()
        };
        let calls = Rc::clone(&client.calls);
        let det = FreeTextDetector::new(&DetectorDefaults::default()).with_client(client);

        let buf = buffer();
        let result = det.detect(&buf);

        assert_eq!(result.raw_text(), Some("John Doe\nMRN 00123"));
        assert!(result.regions().is_none());
        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "llama3.2-vision:latest");
        let png = STANDARD.decode(&calls[0].1).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[test]
    fn transport_failure_degrades_to_empty_text() {
        let det = FreeTextDetector::new(&DetectorDefaults::default()).with_client(Recording::default());
        let buf = buffer();
        assert_eq!(det.detect(&buf).raw_text(), Some(""));
    }

    #[test]
    fn unreachable_endpoint_degrades_to_empty_text() {
        let mut det = FreeTextDetector::new(&DetectorDefaults {
            request_timeout: Duration::from_secs(2),
            ..DetectorDefaults::default()
        });
        det.configure(&["http://127.0.0.1:9/api/generate"]).unwrap();
        let buf = buffer();
        assert_eq!(det.detect(&buf).raw_text(), Some(""));
    }

    // The client is blocking, so it is built, used and dropped off the runtime.
    async fn generate_against(server: &MockServer, timeout: Duration) -> Result<String> {
        let url = format!("{}/api/generate", server.uri());
        tokio::task::spawn_blocking(move || {
            let client = OllamaClient::new(url, timeout)?;
            client.generate("llava", "read it", "aGVsbG8=")
        })
        .await
        .expect("blocking task")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ollama_client_posts_generate_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "llava",
                "prompt": "read it",
                "stream": false,
                "image": "aGVsbG8=",
                "images": ["aGVsbG8="],
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "JOHN DOE", "done": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = generate_against(&server, Duration::from_secs(5)).await.unwrap();
        assert_eq!(reply, "JOHN DOE");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ollama_client_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let err = generate_against(&server, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, VisionGuardError::Detection(_)));
        assert!(err.to_string().contains("500"), "{err}");
        assert!(err.to_string().contains("model not loaded"), "{err}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ollama_client_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = generate_against(&server, Duration::from_secs(5)).await.unwrap_err();
        assert!(err.to_string().contains("malformed"), "{err}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn slow_endpoint_times_out_to_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "too late"}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let url = format!("{}/api/generate", server.uri());
        let started = Instant::now();
        let text = tokio::task::spawn_blocking(move || {
            let mut det = FreeTextDetector::new(&DetectorDefaults {
                request_timeout: Duration::from_secs(1),
                ..DetectorDefaults::default()
            });
            det.configure(&[url.as_str()]).unwrap();
            let buf = buffer();
            det.detect(&buf).raw_text().map(str::to_string)
        })
        .await
        .expect("blocking task");

        assert_eq!(text.as_deref(), Some(""));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn configure_requires_url_and_accepts_model() {
        let mut det = FreeTextDetector::new(&DetectorDefaults::default());
        assert!(det.configure(&[]).unwrap_err().is_fatal());
        assert!(!det.is_ready());

        det.configure(&["http://inference.local/api/generate", "llava:13b"])
            .unwrap();
        assert!(det.is_ready());
        assert_eq!(det.model(), "llava:13b");
        assert_eq!(det.url(), "http://inference.local/api/generate");
    }

    #[test]
    fn initialize_takes_timeout_and_model_from_config() {
        let mut det = FreeTextDetector::new(&DetectorDefaults::default());
        let config = DetectorConfig {
            request_timeout_secs: Some(7),
            inference_model: Some("moondream".into()),
            ..Default::default()
        };
        det.initialize(&config).unwrap();
        assert_eq!(det.timeout(), Duration::from_secs(7));
        assert_eq!(det.model(), "moondream");
        assert_eq!(det.url(), DetectorDefaults::default().inference_url);
    }

    #[test]
    fn constraints_are_ignored_and_only_export_and_flag_supported() {
        let mut det = FreeTextDetector::new(&DetectorDefaults::default());
        let inverted = BoxConstraints {
            min_width: 90,
            min_height: 90,
            max_width: 1,
            max_height: 1,
        };
        assert!(det.set_bounding_box_constraints(inverted).is_ok());

        let supported: Vec<_> = Action::ALL.into_iter().filter(|a| det.supports(*a)).collect();
        assert_eq!(supported, [Action::ExportWithMetadata, Action::FlagForReview]);
    }
}
