//! Attachment handling: classifies the first Discord attachment, downloads
//! it and turns it into the user turn's payload.

use serenity::model::channel::Attachment;
use tracing::{debug, warn};

use relay_core::types::{DocumentKind, Turn, TurnPayload};

use crate::extract::{decode_text, Extractors};

/// Attachment classification by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Pdf,
    Text,
    Unsupported,
}

pub fn classify_filename(filename: &str) -> AttachmentKind {
    let lower = filename.to_lowercase();
    let ext = match lower.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => return AttachmentKind::Unsupported,
    };
    match ext {
        "png" | "jpg" | "jpeg" | "gif" | "webp" => AttachmentKind::Image,
        "pdf" => AttachmentKind::Pdf,
        "txt" => AttachmentKind::Text,
        _ => AttachmentKind::Unsupported,
    }
}

pub fn classify(attachment: &Attachment) -> AttachmentKind {
    classify_filename(&attachment.filename)
}

/// Attachment content after download and extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Image(Vec<u8>),
    Pdf(String),
    Text(String),
}

impl Extracted {
    /// Request used when the message carries the attachment and no text.
    pub fn default_prompt(&self) -> &'static str {
        match self {
            Extracted::Image(_) => "Please analyze this image.",
            Extracted::Pdf(_) => "Please summarize this PDF.",
            Extracted::Text(_) => "Please analyze this text file.",
        }
    }

    fn into_payload(self) -> TurnPayload {
        match self {
            Extracted::Image(image) => TurnPayload::WithImage { image },
            Extracted::Pdf(text) => TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Pdf,
                text,
            },
            Extracted::Text(text) => TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Txt,
                text,
            },
        }
    }
}

/// Build the user turn from message text and an optional attachment.
///
/// Returns `None` when there is nothing to send.
pub fn compose_turn(content: &str, extracted: Option<Extracted>) -> Option<Turn> {
    let text = content.trim();
    match extracted {
        None if text.is_empty() => None,
        None => Some(Turn::user(text, TurnPayload::TextOnly)),
        Some(extracted) => {
            let text = if text.is_empty() {
                extracted.default_prompt()
            } else {
                text
            };
            Some(Turn::user(text, extracted.into_payload()))
        }
    }
}

/// Download and extract the first attachment, if it is a supported kind.
pub async fn fetch_first(
    attachments: &[Attachment],
    max_bytes: u64,
    extractors: &Extractors,
) -> Option<Extracted> {
    let att = attachments.first()?;

    let kind = classify(att);
    if kind == AttachmentKind::Unsupported {
        debug!(filename = %att.filename, "unsupported attachment ignored");
        return None;
    }
    if u64::from(att.size) > max_bytes {
        warn!(
            filename = %att.filename,
            size = att.size,
            max_bytes,
            "attachment too large, skipped"
        );
        return None;
    }

    let bytes = match download_bytes(&att.url).await {
        Ok(b) => b,
        Err(e) => {
            warn!(filename = %att.filename, error = %e, "failed to download attachment");
            return None;
        }
    };

    let extracted = match kind {
        AttachmentKind::Image => Extracted::Image(extractors.image(bytes).await),
        AttachmentKind::Pdf => Extracted::Pdf(extractors.pdf_text(bytes).await),
        AttachmentKind::Text => Extracted::Text(decode_text(&bytes)),
        AttachmentKind::Unsupported => return None,
    };
    Some(extracted)
}

/// Full inbound conversion: message text plus first attachment → user turn.
pub async fn prepare_turn(
    content: &str,
    attachments: &[Attachment],
    max_bytes: u64,
    extractors: &Extractors,
) -> Option<Turn> {
    let extracted = fetch_first(attachments, max_bytes, extractors).await;
    compose_turn(content, extracted)
}

async fn download_bytes(url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let resp = reqwest::get(url).await?.error_for_status()?;
    resp.bytes().await.map(|b| b.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_extension_case_insensitive() {
        assert_eq!(classify_filename("cat.PNG"), AttachmentKind::Image);
        assert_eq!(classify_filename("a.b.jpeg"), AttachmentKind::Image);
        assert_eq!(classify_filename("anim.gif"), AttachmentKind::Image);
        assert_eq!(classify_filename("pic.webp"), AttachmentKind::Image);
        assert_eq!(classify_filename("report.Pdf"), AttachmentKind::Pdf);
        assert_eq!(classify_filename("notes.txt"), AttachmentKind::Text);
    }

    #[test]
    fn other_files_are_unsupported() {
        assert_eq!(classify_filename("slides.pptx"), AttachmentKind::Unsupported);
        assert_eq!(classify_filename("README"), AttachmentKind::Unsupported);
        assert_eq!(classify_filename("main.rs"), AttachmentKind::Unsupported);
    }

    #[test]
    fn empty_message_without_attachment_is_dropped() {
        assert!(compose_turn("   ", None).is_none());
    }

    #[test]
    fn text_only_message() {
        let turn = compose_turn(" hi ", None).unwrap();
        assert_eq!(turn.text, "hi");
        assert_eq!(turn.payload, TurnPayload::TextOnly);
    }

    #[test]
    fn bare_attachment_gets_default_prompt() {
        let turn = compose_turn("", Some(Extracted::Pdf("body".to_string()))).unwrap();
        assert_eq!(turn.text, "Please summarize this PDF.");
        assert_eq!(
            turn.payload,
            TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Pdf,
                text: "body".to_string()
            }
        );

        let turn = compose_turn("", Some(Extracted::Image(vec![1]))).unwrap();
        assert_eq!(turn.text, "Please analyze this image.");
    }

    #[test]
    fn user_text_wins_over_default_prompt() {
        let turn = compose_turn("what's in here?", Some(Extracted::Text("x".to_string()))).unwrap();
        assert_eq!(turn.text, "what's in here?");
        assert!(matches!(
            turn.payload,
            TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Txt,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn no_attachments_fetches_nothing() {
        let extractors = Extractors::from_config(&Default::default());
        assert!(fetch_first(&[], 1024, &extractors).await.is_none());
    }
}
