//! OCR Providers
//!
//! Defines the provider trait and implementations for different OCR backends.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::types::{OcrError, OcrProvider, OcrResult};

/// OCR provider trait
#[async_trait]
pub trait OcrProviderTrait: Send + Sync {
    /// Get the provider type
    fn provider_type(&self) -> OcrProvider;

    /// Check if the provider is available
    async fn is_available(&self) -> bool;

    /// Perform OCR on an image
    async fn recognize(
        &self,
        image_data: &[u8],
        language: Option<&str>,
    ) -> Result<OcrResult, OcrError>;
}

/// Tesseract OCR provider
///
/// Runs the `tesseract` command line tool against a temporary copy of the image
/// and reads the recognized text from stdout.
pub struct TesseractProvider {
    /// Path or name of the tesseract binary
    binary: String,
    /// Default language
    default_language: String,
    /// Page segmentation mode
    psm: u8,
    timeout: Duration,
    /// Directory for the temporary image copies
    work_dir: PathBuf,
}

impl TesseractProvider {
    pub fn new(binary: &str, default_language: &str, psm: u8, timeout: Duration) -> Self {
        Self {
            binary: binary.to_string(),
            default_language: default_language.to_string(),
            psm,
            timeout,
            work_dir: std::env::temp_dir(),
        }
    }

    /// Write temporary image copies under `dir` instead of the system temp dir
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Copy the image into a temp file that is removed when the handle drops
    async fn write_input(&self, image_data: &[u8]) -> Result<NamedTempFile, OcrError> {
        let write_error = |e: std::io::Error| {
            OcrError::ProcessingError(format!("Failed to write temp file: {}", e))
        };

        // Tesseract detects the image format from content, the extension is cosmetic
        let input = tempfile::Builder::new()
            .prefix("ocr_input_")
            .suffix(".img")
            .tempfile_in(&self.work_dir)
            .map_err(write_error)?;

        // Written through the open handle so a cancelled write cannot recreate the path
        let mut file = tokio::fs::File::from_std(input.reopen().map_err(write_error)?);
        file.write_all(image_data).await.map_err(write_error)?;
        file.flush().await.map_err(write_error)?;

        Ok(input)
    }

    async fn run(&self, input_path: &Path, lang: &str) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg(input_path)
            .arg("stdout")
            .arg("-l")
            .arg(lang)
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg(self.psm.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl OcrProviderTrait for TesseractProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        let probe = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(self.timeout, probe).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(_)) => false,
            Err(_) => {
                tracing::warn!(binary = %self.binary, "Tesseract version check timed out");
                false
            }
        }
    }

    async fn recognize(
        &self,
        image_data: &[u8],
        language: Option<&str>,
    ) -> Result<OcrResult, OcrError> {
        let lang = language.unwrap_or(&self.default_language);

        // Dropping `input` deletes the file, including when this future is cancelled
        let input = self.write_input(image_data).await?;

        let text = tokio::time::timeout(self.timeout, self.run(input.path(), lang))
            .await
            .map_err(|_| OcrError::Timeout(self.timeout.as_secs()))??;

        Ok(OcrResult {
            text: text.trim().to_string(),
            confidence: 80.0, // Plain text output carries no confidence
            provider: OcrProvider::Tesseract,
        })
    }
}

/// Ollama vision model provider
pub struct OllamaProvider {
    client: reqwest::Client,
    /// Ollama API URL
    base_url: String,
    /// Model name (e.g., "llava", "bakllava")
    model: String,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build Ollama HTTP client: {}, using defaults", e);
                reqwest::Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        }
    }

    fn request_error(&self, e: reqwest::Error) -> OcrError {
        if e.is_timeout() {
            OcrError::Timeout(self.timeout.as_secs())
        } else {
            OcrError::ApiError(format!("Failed to call Ollama: {}", e))
        }
    }
}

#[async_trait]
impl OcrProviderTrait for OllamaProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Ollama
    }

    async fn is_available(&self) -> bool {
        // Check if Ollama is running
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn recognize(
        &self,
        image_data: &[u8],
        language: Option<&str>,
    ) -> Result<OcrResult, OcrError> {
        use base64::Engine;

        let url = format!("{}/api/generate", self.base_url);

        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_data);

        let lang_hint = language
            .map(|l| format!(" The text is in {}.", l))
            .unwrap_or_default();

        let prompt = format!(
            "Extract all text from this image exactly as written, preserving line breaks.{} \
             Return only the extracted text, nothing else.",
            lang_hint
        );

        let request = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "images": [image_base64],
            "stream": false
        });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::ApiError(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.request_error(e)
                } else {
                    OcrError::ApiError(format!("Failed to parse response: {}", e))
                }
            })?;

        let text = result["response"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        Ok(OcrResult {
            text,
            confidence: 75.0, // LLMs don't provide confidence scores
            provider: OcrProvider::Ollama,
        })
    }
}

/// Mock provider for testing
#[cfg(test)]
pub struct MockProvider {
    pub provider: OcrProvider,
    pub text: String,
    pub available: bool,
    /// When set, `recognize` fails with this message
    pub failure: Option<String>,
    /// Time each `recognize` call spends before answering
    pub delay: Option<Duration>,
    pub calls: std::sync::atomic::AtomicUsize,
    pub in_flight: std::sync::atomic::AtomicUsize,
    pub peak: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockProvider {
    pub fn returning(text: &str) -> Self {
        Self {
            provider: OcrProvider::Tesseract,
            text: text.to_string(),
            available: true,
            failure: None,
            delay: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
            in_flight: std::sync::atomic::AtomicUsize::new(0),
            peak: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn delayed(text: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::returning(text)
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::returning("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Highest number of `recognize` calls that were running at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Erase mock providers into the list `OcrService` expects
#[cfg(test)]
pub fn mock_providers(
    mocks: &[std::sync::Arc<MockProvider>],
) -> Vec<std::sync::Arc<dyn OcrProviderTrait>> {
    mocks
        .iter()
        .map(|m| m.clone() as std::sync::Arc<dyn OcrProviderTrait>)
        .collect()
}

#[cfg(test)]
#[async_trait]
impl OcrProviderTrait for MockProvider {
    fn provider_type(&self) -> OcrProvider {
        self.provider
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn recognize(
        &self,
        _image_data: &[u8],
        _language: Option<&str>,
    ) -> Result<OcrResult, OcrError> {
        use std::sync::atomic::Ordering;

        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.failure {
            Some(message) => Err(OcrError::ProcessingError(message.clone())),
            None => Ok(OcrResult {
                text: self.text.clone(),
                confidence: 90.0,
                provider: self.provider,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    /// Provider whose "binary" is `sh`, so the uploaded bytes run as a script
    #[cfg(unix)]
    fn shell_provider(work_dir: &Path, timeout: Duration) -> TesseractProvider {
        TesseractProvider::new("sh", "eng", 3, timeout).with_work_dir(work_dir)
    }

    #[tokio::test]
    async fn test_tesseract_missing_binary_is_unavailable() {
        let provider = TesseractProvider::new(
            "/nonexistent/tesseract-binary",
            "eng",
            3,
            Duration::from_secs(5),
        );
        assert!(!provider.is_available().await);
    }

    #[tokio::test]
    async fn test_tesseract_missing_binary_fails_recognition() {
        let work_dir = tempfile::tempdir().unwrap();
        let provider = TesseractProvider::new(
            "/nonexistent/tesseract-binary",
            "eng",
            3,
            Duration::from_secs(5),
        )
        .with_work_dir(work_dir.path());

        let result = provider.recognize(b"not really an image", None).await;
        assert!(matches!(result, Err(OcrError::ProcessingError(_))));
        assert_eq!(entries(work_dir.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tesseract_reads_stdout_and_removes_input() {
        let work_dir = tempfile::tempdir().unwrap();
        let provider = shell_provider(work_dir.path(), Duration::from_secs(10));

        let result = provider
            .recognize(b"echo 'Batch: medplusABC123456789'\n", None)
            .await
            .unwrap();
        assert_eq!(result.text, "Batch: medplusABC123456789");
        assert_eq!(result.provider, OcrProvider::Tesseract);
        assert_eq!(entries(work_dir.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tesseract_timeout() {
        let work_dir = tempfile::tempdir().unwrap();
        let provider = shell_provider(work_dir.path(), Duration::from_millis(200));

        let result = provider.recognize(b"exec sleep 5\n", None).await;
        assert!(matches!(result, Err(OcrError::Timeout(_))));
        assert_eq!(entries(work_dir.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancelled_recognition_removes_input() {
        let work_dir = tempfile::tempdir().unwrap();
        let provider = shell_provider(work_dir.path(), Duration::from_secs(30));

        let cancelled = tokio::time::timeout(
            Duration::from_millis(300),
            provider.recognize(b"exec sleep 5\n", None),
        )
        .await;
        assert!(cancelled.is_err());
        assert_eq!(entries(work_dir.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_version_check_is_unavailable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("tesseract");
        std::fs::write(&binary, "#!/bin/sh\nexec sleep 5\n").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

        let provider = TesseractProvider::new(
            binary.to_str().unwrap(),
            "eng",
            3,
            Duration::from_millis(200),
        );
        let started = std::time::Instant::now();
        assert!(!provider.is_available().await);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_ollama_unreachable_is_unavailable() {
        // Port 9 (discard) is not expected to serve HTTP
        let provider = OllamaProvider::new("http://127.0.0.1:9/", "llava", Duration::from_secs(2));
        assert_eq!(provider.base_url, "http://127.0.0.1:9");
        assert!(!provider.is_available().await);
    }

    #[tokio::test]
    async fn test_ollama_slow_response_is_timeout() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let provider = OllamaProvider::new(
            &format!("http://{}", addr),
            "llava",
            Duration::from_millis(300),
        );
        let result = provider.recognize(b"img", None).await;
        assert!(matches!(result, Err(OcrError::Timeout(_))));
        assert_eq!(
            result.unwrap_err().status_code(),
            axum::http::StatusCode::GATEWAY_TIMEOUT
        );
    }
}
