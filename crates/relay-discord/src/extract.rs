//! Attachment bytes → model-ready content.
//!
//! Decoding is CPU-bound, so the async entry points run the work on the
//! blocking pool and fall back instead of failing the exchange.

use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use tracing::warn;

use relay_core::config::ImageConfig;

use crate::error::ExtractError;

/// Re-encodes an image into the form sent to the model.
pub trait ImageTranscoder: Send + Sync {
    fn transcode(&self, bytes: &[u8]) -> Result<Vec<u8>, ExtractError>;
}

/// Pulls plain text out of a PDF.
pub trait PdfExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Shrinks to fit a `max_dimension` square (aspect kept, never enlarged),
/// drops alpha and encodes as JPEG.
pub struct JpegThumbnailer {
    pub max_dimension: u32,
    pub quality: u8,
}

impl ImageTranscoder for JpegThumbnailer {
    fn transcode(&self, bytes: &[u8]) -> Result<Vec<u8>, ExtractError> {
        transcode_image(bytes, self.max_dimension, self.quality)
    }
}

pub fn transcode_image(
    bytes: &[u8],
    max_dimension: u32,
    quality: u8,
) -> Result<Vec<u8>, ExtractError> {
    let img = image::load_from_memory(bytes)?;
    let img = if img.width() > max_dimension || img.height() > max_dimension {
        img.thumbnail(max_dimension, max_dimension)
    } else {
        img
    };

    let mut out = Cursor::new(Vec::new());
    img.to_rgb8()
        .write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
    Ok(out.into_inner())
}

pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        extract_pdf_text(bytes)
    }
}

pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Text files are read as UTF-8; invalid sequences are replaced, never fatal.
pub fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&*text).to_string()
}

/// The extraction collaborators used by the Discord handler.
#[derive(Clone)]
pub struct Extractors {
    image: Arc<dyn ImageTranscoder>,
    pdf: Arc<dyn PdfExtractor>,
}

impl Extractors {
    pub fn new(image: Arc<dyn ImageTranscoder>, pdf: Arc<dyn PdfExtractor>) -> Self {
        Self { image, pdf }
    }

    pub fn from_config(config: &ImageConfig) -> Self {
        Self::new(
            Arc::new(JpegThumbnailer {
                max_dimension: config.max_dimension,
                quality: config.jpeg_quality,
            }),
            Arc::new(PdfTextExtractor),
        )
    }

    /// Transcoded image, or the original bytes if transcoding fails.
    pub async fn image(&self, bytes: Vec<u8>) -> Vec<u8> {
        let transcoder = Arc::clone(&self.image);
        let raw = bytes.clone();
        let result = tokio::task::spawn_blocking(move || transcoder.transcode(&bytes))
            .await
            .map_err(ExtractError::from)
            .and_then(|r| r);
        match result {
            Ok(jpeg) => jpeg,
            Err(e) => {
                warn!(error = %e, "image transcode failed, sending original bytes");
                raw
            }
        }
    }

    /// Extracted PDF text, or an empty string if extraction fails.
    pub async fn pdf_text(&self, bytes: Vec<u8>) -> String {
        let extractor = Arc::clone(&self.pdf);
        let result = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await
            .map_err(ExtractError::from)
            .and_then(|r| r);
        result.unwrap_or_else(|e| {
            warn!(error = %e, "PDF text extraction failed");
            String::new()
        })
    }
}
