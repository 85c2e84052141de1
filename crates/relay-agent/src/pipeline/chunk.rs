//! Control-character cleaning and fixed-size document splitting.
//!
//! Splitting is purely by character count: no word or sentence awareness.
//! The fragments of a cleaned text concatenate back to it exactly.

/// `true` for C0 controls, DEL and C1 controls (U+0000–U+001F, U+007F–U+009F).
fn is_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{1f}' | '\u{7f}'..='\u{9f}')
}

/// Replace each run of control characters with one space, then trim.
///
/// Newlines and tabs are controls too, so the result is a single line.
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if is_control(c) {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out.trim().to_string()
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Ordered fragments of one cleaned document, each at most `max_size` chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDocument {
    fragments: Vec<String>,
}

impl ChunkedDocument {
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// More than one fragment means the document goes through map-reduce.
    pub fn needs_summary(&self) -> bool {
        self.fragments.len() > 1
    }
}

/// Clean `text` and slice it into consecutive fragments of at most
/// `max_size` characters. An empty cleaned text yields no fragments.
pub fn chunk(text: &str, max_size: usize) -> ChunkedDocument {
    let max_size = max_size.max(1);
    let cleaned = clean_text(text);

    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for c in cleaned.chars() {
        current.push(c);
        count += 1;
        if count == max_size {
            fragments.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        fragments.push(current);
    }

    ChunkedDocument { fragments }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_collapses_control_runs() {
        assert_eq!(clean_text("a\r\n\tb"), "a b");
        assert_eq!(clean_text("a\u{7f}\u{85}\u{9f}b"), "a b");
        assert_eq!(clean_text("\n\nhello\u{0}"), "hello");
    }

    #[test]
    fn clean_keeps_printable_unicode() {
        assert_eq!(clean_text("안녕 하세요 €"), "안녕 하세요 €");
        // U+00A0 is just past the C1 range.
        assert_eq!(clean_text("a\u{a0}b"), "a\u{a0}b");
    }

    #[test]
    fn clean_is_idempotent() {
        let once = clean_text("  x\u{1}\u{2}y \n z ");
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("가나다라", 2), "가나");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn fifteen_thousand_chars_split_six_six_three() {
        let text = "x".repeat(15_000);
        let doc = chunk(&text, 6000);
        let sizes: Vec<usize> = doc.fragments().iter().map(|f| f.chars().count()).collect();
        assert_eq!(sizes, vec![6000, 6000, 3000]);
        assert!(doc.needs_summary());
    }

    #[test]
    fn fragments_concatenate_to_cleaned_text() {
        let text = "첫 줄\n둘째 줄\u{0}셋째\t줄 ".repeat(500);
        for size in [1, 7, 64, 6000] {
            let doc = chunk(&text, size);
            let cleaned = clean_text(&text);
            let len = cleaned.chars().count();

            assert_eq!(doc.fragments().concat(), cleaned);
            assert_eq!(doc.len(), len.div_ceil(size));
            assert!(doc.fragments().iter().all(|f| f.chars().count() <= size));
        }
    }

    #[test]
    fn short_text_is_one_fragment() {
        let doc = chunk("hello", 6000);
        assert_eq!(doc.fragments(), ["hello"]);
        assert!(!doc.needs_summary());
    }

    #[test]
    fn empty_or_control_only_text_has_no_fragments() {
        assert!(chunk("", 10).is_empty());
        assert!(chunk("\n\r\t", 10).is_empty());
    }

    #[test]
    fn exact_multiple_has_no_trailing_fragment() {
        assert_eq!(chunk(&"y".repeat(12), 6).len(), 2);
    }
}
