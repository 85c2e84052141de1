//! Recent-context selection.
//!
//! Only the persona turn plus the last N turns are forwarded with a request,
//! which bounds request size at the cost of long-term recall.

use relay_core::types::{Role, Turn};

/// Persona turn (if the history starts with one) followed by the last
/// `limit` non-system turns, in original order.
pub fn select_context(turns: &[Turn], limit: usize) -> Vec<&Turn> {
    let (system, rest) = match turns.split_first() {
        Some((first, rest)) if first.role == Role::System => (Some(first), rest),
        _ => (None, turns),
    };

    let others: Vec<&Turn> = rest.iter().filter(|t| t.role != Role::System).collect();
    let start = others.len().saturating_sub(limit);

    system.into_iter().chain(others[start..].iter().copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::types::TurnPayload;

    fn history(n: usize) -> Vec<Turn> {
        let mut turns = vec![Turn::system("persona")];
        for i in 0..n {
            if i % 2 == 0 {
                turns.push(Turn::user(format!("u{i}"), TurnPayload::TextOnly));
            } else {
                turns.push(Turn::assistant(format!("a{i}")));
            }
        }
        turns
    }

    fn texts<'a>(turns: &[&'a Turn]) -> Vec<&'a str> {
        turns.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn keeps_persona_and_last_n() {
        let turns = history(20);
        let selected = select_context(&turns, 15);
        assert_eq!(selected.len(), 16);
        assert_eq!(selected[0].role, Role::System);
        assert_eq!(selected[1].text, "a5");
        assert_eq!(selected[15].text, "a19");
    }

    #[test]
    fn short_history_is_returned_whole() {
        let turns = history(3);
        assert_eq!(texts(&select_context(&turns, 15)), ["persona", "u0", "a1", "u2"]);
    }

    #[test]
    fn no_persona_returns_trailing_slice() {
        let turns: Vec<Turn> = history(6).into_iter().skip(1).collect();
        assert_eq!(texts(&select_context(&turns, 2)), ["u4", "a5"]);
    }

    #[test]
    fn zero_limit_keeps_only_persona() {
        let turns = history(4);
        assert_eq!(texts(&select_context(&turns, 0)), ["persona"]);
    }

    #[test]
    fn empty_history_selects_nothing() {
        assert!(select_context(&[], 15).is_empty());
    }

    #[test]
    fn size_bound_holds_for_many_shapes() {
        for n in 0..40 {
            for limit in [0, 1, 5, 15, 50] {
                let turns = history(n);
                let selected = select_context(&turns, limit);
                let system = selected.iter().filter(|t| t.role == Role::System).count();
                assert!(system <= 1);
                assert_eq!(selected.len() - system, limit.min(n));
            }
        }
    }
}
