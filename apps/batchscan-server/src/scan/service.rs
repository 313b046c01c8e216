//! Scan Service
//!
//! OCR jobs are serialized through a semaphore: a second upload waits for the
//! running job to settle rather than being rejected.

use std::time::Instant;

use tokio::sync::Semaphore;

use super::cache::{compute_hash, ScanCache};
use super::types::{ScanError, ScanOutcome, MESSAGE_FOUND, MESSAGE_NOT_FOUND};
use crate::batch::BatchPattern;
use crate::ocr::{OcrProvider, OcrResult, OcrService};
use crate::upload::UploadedImage;

/// End-to-end batch number scanning
pub struct ScanService {
    pattern: BatchPattern,
    cache: ScanCache,
    permits: Semaphore,
}

impl ScanService {
    pub fn new(pattern: BatchPattern, max_concurrent_jobs: usize, cache_capacity: usize) -> Self {
        Self {
            pattern,
            cache: ScanCache::with_capacity(cache_capacity),
            permits: Semaphore::new(max_concurrent_jobs.max(1)),
        }
    }

    pub fn pattern(&self) -> &BatchPattern {
        &self.pattern
    }

    pub fn cache(&self) -> &ScanCache {
        &self.cache
    }

    /// OCR an uploaded image and search the text for a batch number
    pub async fn scan(
        &self,
        ocr: &OcrService,
        image: &UploadedImage,
        language: Option<&str>,
        provider: Option<OcrProvider>,
    ) -> Result<ScanOutcome, ScanError> {
        let started = Instant::now();
        let digest = compute_hash(&image.data);
        let cache_key = format!(
            "{}:{}:{}",
            digest,
            language.unwrap_or_default(),
            provider.map(|p| p.to_string()).unwrap_or_default()
        );

        if let Some(result) = self.cache.get(&cache_key) {
            tracing::debug!(image_sha256 = %digest, "Scan cache hit");
            return Ok(self.outcome(result, Some(digest), true, started));
        }

        let _permit = self.permits.acquire().await.map_err(|_| ScanError::QueueClosed)?;

        // An identical upload may have finished while this one was queued
        if let Some(result) = self.cache.get(&cache_key) {
            tracing::debug!(image_sha256 = %digest, "Scan cache hit after queueing");
            return Ok(self.outcome(result, Some(digest), true, started));
        }

        tracing::info!(
            file_name = %image.file_name,
            format = image.format.mime_type(),
            size = image.size(),
            image_sha256 = %digest,
            "Running OCR"
        );

        let result = ocr.recognize(&image.data, provider, language).await?;
        self.cache.insert(cache_key, result.clone());

        let outcome = self.outcome(result, Some(digest), false, started);
        tracing::info!(
            found = outcome.found,
            batch_number = outcome.batch_number.as_deref().unwrap_or(""),
            elapsed_ms = outcome.elapsed_ms,
            "Scan complete"
        );
        Ok(outcome)
    }

    /// Search already-recognized text, without OCR
    pub fn match_text(&self, text: Option<&str>) -> ScanOutcome {
        let started = Instant::now();
        self.build(text.unwrap_or_default(), None, None, None, false, started)
    }

    fn outcome(
        &self,
        result: OcrResult,
        digest: Option<String>,
        cached: bool,
        started: Instant,
    ) -> ScanOutcome {
        self.build(
            &result.text,
            Some(result.provider),
            Some(result.confidence),
            digest,
            cached,
            started,
        )
    }

    fn build(
        &self,
        text: &str,
        provider: Option<OcrProvider>,
        confidence: Option<f64>,
        image_sha256: Option<String>,
        cached: bool,
        started: Instant,
    ) -> ScanOutcome {
        let first = self.pattern.find(Some(text));
        let candidates = self.pattern.find_all(Some(text));

        ScanOutcome {
            found: first.is_some(),
            message: if first.is_some() { MESSAGE_FOUND } else { MESSAGE_NOT_FOUND },
            line: first.as_ref().map(|m| m.line),
            batch_number: first.map(|m| m.value),
            candidates,
            raw_text: text.to_string(),
            provider,
            confidence,
            image_sha256,
            cached,
            elapsed_ms: started.elapsed().as_millis() as u64,
            scanned_at: chrono::Utc::now(),
        }
    }
}
