//! Text extraction state machine.

use std::sync::Arc;

use covenant_core::{
    ContractCase, DocumentLocation, DocumentReference, ExtractionMethod, ExtractionResult,
    ExtractorSettings,
};
use covenant_store::BlobStore;
use tracing::{debug, info, warn};

use crate::ocr::{JobPage, JobStatus, Ocr, line_texts};
use crate::{ExtractionError, OcrError};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "bmp"];

/// Extraction path chosen from the key's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Image,
    Pdf,
    PlainText,
    Unknown,
}

impl Route {
    fn for_extension(ext: Option<&str>) -> Self {
        match ext {
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => Self::Image,
            Some("pdf") => Self::Pdf,
            Some("txt") => Self::PlainText,
            _ => Self::Unknown,
        }
    }
}

/// Produces plain text for a stored document.
///
/// Holds its collaborators as injected capabilities; the extractor itself is
/// stateless and can be shared across cases.
pub struct TextExtractor {
    store: Arc<dyn BlobStore>,
    ocr: Arc<dyn Ocr>,
    settings: ExtractorSettings,
}

impl TextExtractor {
    pub fn new(store: Arc<dyn BlobStore>, ocr: Arc<dyn Ocr>) -> Self {
        Self {
            store,
            ocr,
            settings: ExtractorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ExtractorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Extract text for a case.
    ///
    /// Opens the case (generating an id if `case_id` is absent) and routes on
    /// the document's extension. Fails with [`ExtractionError::MissingInput`]
    /// when the location lacks a container or key.
    pub async fn extract(
        &self,
        case_id: Option<&str>,
        location: Option<&DocumentLocation>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let document = location
            .and_then(DocumentLocation::to_reference)
            .ok_or_else(|| {
                ExtractionError::MissingInput("document.container and document.key".into())
            })?;
        let case = ContractCase::open(case_id, document);
        let doc = &case.document;
        let uri = doc.uri();
        let ext = doc.extension();
        let route = Route::for_extension(ext.as_deref());
        info!(case_id = %case.case_id, uri = %uri, ?route, "extracting text");

        let (text, method) = match route {
            Route::Image => {
                let bytes = self.read(doc).await?;
                (self.detect_lines(&bytes, &uri).await?, ExtractionMethod::OcrSync)
            }
            Route::Pdf => (self.extract_job(doc).await?, ExtractionMethod::OcrAsync),
            Route::PlainText => {
                let bytes = self.read(doc).await?;
                (decode_text(bytes), ExtractionMethod::PlainText)
            }
            Route::Unknown => {
                let bytes = self.read(doc).await?;
                let text = self.detect_lines(&bytes, &uri).await?;
                if text.is_empty() {
                    return Err(ExtractionError::UnsupportedFormat { uri });
                }
                (text, ExtractionMethod::OcrFallback)
            }
        };

        info!(
            case_id = %case.case_id,
            method = ?method,
            chars = text.chars().count(),
            "extracted text"
        );
        Ok(ExtractionResult { case, text, method })
    }

    async fn read(&self, doc: &DocumentReference) -> Result<Vec<u8>, ExtractionError> {
        self.store
            .get(&doc.container, &doc.key)
            .await
            .map_err(|e| ExtractionError::ExtractionFailed(format!("reading {}: {e}", doc.uri())))
    }

    async fn detect_lines(&self, bytes: &[u8], uri: &str) -> Result<String, ExtractionError> {
        let blocks = self
            .ocr
            .detect(bytes)
            .await
            .map_err(|e| ocr_failed(uri, e))?;
        Ok(line_texts(&blocks).join("\n"))
    }

    /// Run a background job under a hard deadline.
    ///
    /// The deadline covers starting the job, every status poll and every
    /// continuation page, so a stalled call on any of them ends in
    /// [`ExtractionError::ExtractionTimeout`].
    async fn extract_job(&self, doc: &DocumentReference) -> Result<String, ExtractionError> {
        let uri = doc.uri();
        match tokio::time::timeout(self.settings.max_wait, self.run_job(doc, &uri)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(uri = %uri, waited = ?self.settings.max_wait, "text detection deadline exceeded");
                Err(ExtractionError::ExtractionTimeout {
                    uri,
                    waited: self.settings.max_wait,
                })
            }
        }
    }

    async fn run_job(&self, doc: &DocumentReference, uri: &str) -> Result<String, ExtractionError> {
        let job_id = self
            .ocr
            .start_job(&doc.container, &doc.key)
            .await
            .map_err(|e| ocr_failed(uri, e))?;
        if job_id.trim().is_empty() {
            return Err(ExtractionError::ExtractionFailed(format!(
                "no text detection job started for {uri}"
            )));
        }
        info!(job_id = %job_id, uri, "started text detection job");
        self.await_job(&job_id, uri).await
    }

    async fn await_job(&self, job_id: &str, uri: &str) -> Result<String, ExtractionError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let page = self
                .ocr
                .job_page(job_id, None)
                .await
                .map_err(|e| ocr_failed(uri, e))?;
            debug!(job_id, attempt, status = ?page.status, "polled text detection job");

            if !page.status.is_terminal() {
                tokio::time::sleep(self.settings.poll_interval).await;
                continue;
            }
            if page.status == JobStatus::Failed {
                return Err(ExtractionError::ExtractionFailed(format!(
                    "text detection job {job_id} failed for {uri}"
                )));
            }
            return self.collect_pages(job_id, page, uri).await;
        }
    }

    /// Follow continuation tokens from the first succeeded page to the last.
    async fn collect_pages(
        &self,
        job_id: &str,
        first: JobPage,
        uri: &str,
    ) -> Result<String, ExtractionError> {
        let mut lines = line_texts(&first.blocks);
        let mut next = first.next_token.filter(|t| !t.is_empty());
        let mut pages = 1usize;

        while let Some(token) = next {
            let page = self
                .ocr
                .job_page(job_id, Some(&token))
                .await
                .map_err(|e| ocr_failed(uri, e))?;
            lines.extend(line_texts(&page.blocks));
            next = page.next_token.filter(|t| !t.is_empty());
            pages += 1;
        }

        debug!(job_id, pages, lines = lines.len(), "collected job results");
        Ok(lines.join("\n"))
    }
}

fn ocr_failed(uri: &str, e: OcrError) -> ExtractionError {
    ExtractionError::ExtractionFailed(format!("text detection for {uri}: {e}"))
}

/// Decode text bytes as UTF-8, falling back to Latin-1 so every byte survives.
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!("text is not valid UTF-8; decoding as Latin-1");
            e.into_bytes().iter().map(|&b| char::from(b)).collect()
        }
    }
}
