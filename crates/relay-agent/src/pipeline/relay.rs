//! Model reply → channel-sized messages.

use super::chunk::truncate_chars;

/// Largest reply slice per outbound message; the header and code fence
/// keep the total below the channel's 2000-character limit.
pub const REPLY_CHUNK_CHARS: usize = 1900;

/// Split `reply` into labelled, code-fenced messages.
///
/// Every message starts with `💬 {label}`; when the reply needs more than one
/// message the header also carries `(i/n)`.
pub fn format_reply(label: &str, reply: &str) -> Vec<String> {
    let pieces = split_chars(reply, REPLY_CHUNK_CHARS);
    let total = pieces.len();

    pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| {
            let header = if total > 1 {
                format!("💬 {label} ({}/{total})", i + 1)
            } else {
                format!("💬 {label}")
            };
            format!("{header}\n```{piece}```")
        })
        .collect()
}

/// Consecutive slices of at most `max_chars` characters. An empty input
/// still yields one (empty) slice so the requester always gets an answer.
fn split_chars(text: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = text;
    loop {
        let piece = truncate_chars(rest, max_chars);
        pieces.push(piece);
        rest = &rest[piece.len()..];
        if rest.is_empty() {
            break;
        }
    }
    pieces
}
