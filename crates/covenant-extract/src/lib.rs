//! Extraction layer: turns a stored document into plain text.
//!
//! Images go through a single synchronous OCR call, PDFs through a polled
//! background job, `.txt` files are decoded directly, and anything else is
//! tried as an image.

mod error;
mod extractor;
mod ocr;
pub mod testing;

#[cfg(feature = "http")]
pub mod http;

pub use error::{ExtractionError, OcrError};
pub use extractor::{TextExtractor, decode_text};
pub use ocr::{JobPage, JobStatus, Ocr, TextBlock, line_texts};

#[cfg(feature = "http")]
pub use http::HttpOcr;
