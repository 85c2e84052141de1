//! Turn → ordered content parts for one outbound model request.
//!
//! Parts are emitted in a fixed order: text, image, document. A request never
//! goes out empty; with nothing to send it carries a "no content" placeholder.

use relay_core::types::{ContentPart, DocumentKind, Turn, TurnPayload};
use tracing::debug;

use super::chunk::{chunk, clean_text, truncate_chars};
use super::summarize::MapReduceSummarizer;

pub const IMAGE_MIME_TYPE: &str = "image/jpeg";
pub const PDF_HEADER: &str = "[PDF content]";
pub const TXT_HEADER: &str = "[TXT content]";
pub const PDF_NO_TEXT_PLACEHOLDER: &str =
    "(This PDF contains no extractable text. It is probably an image-based scan.)";
pub const NO_CONTENT_PLACEHOLDER: &str = "no content";

pub struct PromptAssembler<'a> {
    summarizer: MapReduceSummarizer<'a>,
    pdf_char_budget: usize,
    chunk_size: usize,
}

impl<'a> PromptAssembler<'a> {
    pub fn new(
        summarizer: MapReduceSummarizer<'a>,
        pdf_char_budget: usize,
        chunk_size: usize,
    ) -> Self {
        Self {
            summarizer,
            pdf_char_budget,
            chunk_size,
        }
    }

    pub async fn assemble(&self, turn: &Turn) -> Vec<ContentPart> {
        let mut parts = Vec::new();

        let text = turn.text.trim();
        if !text.is_empty() {
            parts.push(ContentPart::text(text));
        }

        match &turn.payload {
            TurnPayload::TextOnly => {}
            TurnPayload::WithImage { image } => parts.push(ContentPart::Image {
                bytes: image.clone(),
                mime_type: IMAGE_MIME_TYPE.to_string(),
            }),
            TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Pdf,
                text,
            } => parts.push(ContentPart::Text(self.pdf_part(text))),
            TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Txt,
                text,
            } => parts.push(ContentPart::Text(self.txt_part(text).await)),
        }

        if parts.is_empty() {
            parts.push(ContentPart::text(NO_CONTENT_PLACEHOLDER));
        }
        parts
    }

    fn pdf_part(&self, raw: &str) -> String {
        let cleaned = clean_text(raw);
        let body = if cleaned.is_empty() {
            PDF_NO_TEXT_PLACEHOLDER
        } else {
            truncate_chars(&cleaned, self.pdf_char_budget)
        };
        format!("{PDF_HEADER}\n{body}")
    }

    async fn txt_part(&self, raw: &str) -> String {
        let doc = chunk(raw, self.chunk_size);
        if doc.needs_summary() {
            debug!(fragments = doc.len(), "text attachment exceeds chunk size");
            return self.summarizer.summarize_long(&doc).await;
        }
        format!("{TXT_HEADER}\n{}", clean_text(raw))
    }
}
