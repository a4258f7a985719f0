//! String hygiene for streamed assistant text.
//!
//! Local model servers occasionally re-send the fragment they just emitted,
//! or emit the same short phrase twice in a row. Both cleanups here are
//! best-effort string patching: a legitimately repeated fragment can be
//! dropped, which is accepted behavior.

/// Shortest phrase the repeat collapse will consider.
const COLLAPSE_MIN_CHARS: usize = 15;
/// Longest phrase the repeat collapse will consider.
const COLLAPSE_MAX_CHARS: usize = 50;

/// True when `fragment` merely repeats the tail of the pending buffer or of
/// the text accumulated so far. The comparison uses the fragment exactly as
/// sent; callers decide separately whether a whitespace-only fragment is
/// worth keeping.
pub fn is_duplicate_tail(fragment: &str, pending: &str, accumulated: &str) -> bool {
    if fragment.is_empty() {
        return false;
    }
    pending.ends_with(fragment) || accumulated.ends_with(fragment)
}

/// Collapse the first immediately-repeated phrase in `text`.
///
/// A phrase is a run of 15 to 50 non-newline characters. When a phrase is
/// followed by whitespace and then an exact repeat of itself, the whitespace
/// and the repeat are dropped. The scan is leftmost-first and prefers the
/// longest phrase at each position, mirroring greedy regex matching. At most
/// one collapse per call; callers run this after every flush, so later
/// repeats are caught by later passes.
///
/// Returns `None` when nothing was collapsed.
pub fn collapse_repeated_phrase(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < COLLAPSE_MIN_CHARS * 2 + 1 {
        return None;
    }

    for start in 0..chars.len() {
        for len in (COLLAPSE_MIN_CHARS..=COLLAPSE_MAX_CHARS).rev() {
            let phrase_end = start + len;
            // Need room for the phrase, at least one whitespace char, and the repeat.
            if phrase_end + 1 + len > chars.len() {
                continue;
            }
            let phrase = &chars[start..phrase_end];
            if phrase.contains(&'\n') {
                continue;
            }

            let mut gap_end = phrase_end;
            while gap_end < chars.len() && chars[gap_end].is_whitespace() {
                gap_end += 1;
            }
            if gap_end == phrase_end {
                continue;
            }

            // Greedy: try the widest whitespace gap first, then back off.
            let mut repeat_start = gap_end;
            while repeat_start > phrase_end {
                if repeat_start + len <= chars.len()
                    && chars[repeat_start..repeat_start + len] == *phrase
                {
                    let mut collapsed = String::with_capacity(text.len());
                    collapsed.extend(&chars[..phrase_end]);
                    collapsed.extend(&chars[repeat_start + len..]);
                    return Some(collapsed);
                }
                repeat_start -= 1;
            }
        }
    }

    None
}
