//! Map-reduce summarization for documents longer than one fragment.
//!
//! Map: one independent model call per fragment, in order, with a fixed
//! pause after each call before the next one starts.
//! Reduce: the partial summaries are folded into a single synthesis prompt
//! that the caller sends as part of the normal request (no extra call here).

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::provider::{ChatRequest, LlmProvider};

use super::chunk::ChunkedDocument;

pub const MAP_INSTRUCTION: &str = "The following text is one section of a larger document. \
Summarize only its key content. Do not refer to section or part numbers.";

pub const REDUCE_INSTRUCTION: &str = "Below are partial summaries of a single document. \
Combine them into one integrated analysis. Do not mention part or section numbers.";

pub struct MapReduceSummarizer<'a> {
    provider: &'a dyn LlmProvider,
    model: &'a str,
    max_output_tokens: u32,
    pacing: Duration,
}

impl<'a> MapReduceSummarizer<'a> {
    pub fn new(
        provider: &'a dyn LlmProvider,
        model: &'a str,
        max_output_tokens: u32,
        pacing: Duration,
    ) -> Self {
        Self {
            provider,
            model,
            max_output_tokens,
            pacing,
        }
    }

    /// Summarize every fragment, then build the synthesis prompt.
    ///
    /// A failed map call contributes an empty summary; it never aborts.
    pub async fn summarize_long(&self, doc: &ChunkedDocument) -> String {
        let total = doc.len();
        info!(
            fragments = total,
            provider = %self.provider.name(),
            "map-reduce: summarizing long document"
        );

        let mut partials = Vec::with_capacity(total);

        for (i, fragment) in doc.fragments().iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            let req = ChatRequest::single_text(
                self.model,
                format!("{MAP_INSTRUCTION}\n\n{fragment}"),
                self.max_output_tokens,
            );
            let summary = match self.provider.send(&req).await {
                Ok(resp) => {
                    debug!(
                        index = i,
                        chars = resp.content.len(),
                        "map-reduce: fragment summarized"
                    );
                    resp.content
                }
                Err(e) => {
                    warn!(index = i, total, error = %e, "map-reduce: fragment summary failed");
                    String::new()
                }
            };
            partials.push(summary);
        }

        fold_summaries(&partials)
    }
}

/// Reduce step: partial summaries in fragment order, blank-line separated,
/// under the synthesis instruction.
pub fn fold_summaries(partials: &[String]) -> String {
    format!("{REDUCE_INSTRUCTION}\n\n{}", partials.join("\n\n"))
}
