/// Score `text` against a case-folded query in a single pass.
///
/// Returns `(score, span, matched)` where `span` is the rune distance
/// covered by the first and last matched position. Whitespace runes in the
/// query consume no text: `"internal projection"` can match a
/// slash-separated path. An empty (or all-whitespace) query matches
/// everything with score 0.
pub(crate) fn fuzzy_score(
    text: &str,
    query_raw: &[char],
    query_lower: &[char],
    case_sensitive: bool,
) -> (i32, i32, bool) {
    let mut qi = skip_whitespace(query_lower, 0);
    if qi == query_lower.len() {
        return (0, 0, true);
    }

    let mut last: i32 = -2;
    let mut first: i32 = -1;
    let mut score: i32 = 0;
    let mut rune_idx: i32 = 0;
    let mut prev = '\0';
    let mut has_prev = false;
    let mut case_matches: i32 = 0;

    for raw in text.chars() {
        qi = skip_whitespace(query_lower, qi);
        let r = lower_rune_fast(raw);

        if qi < query_lower.len() && r == query_lower[qi] {
            let mut bonus = 10;
            if rune_idx == 0 || (has_prev && is_boundary_rune(prev)) {
                bonus += 8;
            }
            if last + 1 == rune_idx {
                bonus += 6;
            }
            if case_sensitive && raw == query_raw[qi] {
                bonus += 4;
                case_matches += 1;
            }

            score += bonus;
            if first < 0 {
                first = rune_idx;
            }
            last = rune_idx;
            qi += 1;
        }

        prev = r;
        has_prev = true;
        rune_idx += 1;
    }

    qi = skip_whitespace(query_lower, qi);
    if qi != query_lower.len() {
        return (0, 0, false);
    }

    let query_len = query_lower.len() as i32;
    if rune_idx > query_len {
        score -= rune_idx - query_len;
    }
    if rune_idx < 40 {
        score += 40 - rune_idx;
    }
    score += case_matches * 3;

    let span = if first >= 0 { last - first + 1 } else { 0 };
    let non_space = non_space_rune_count(query_lower);
    if span == non_space {
        score += 12;
    } else if span > query_len {
        score -= 2 * (span - query_len);
    }

    (score, span, true)
}

/// Rune indices of the leftmost subsequence match, used for UI emphasis.
/// Returns `None` when the query does not match.
pub fn fuzzy_positions_runes(text: &str, query_lower: &[char]) -> Option<Vec<usize>> {
    if query_lower.is_empty() {
        return None;
    }

    let mut out = Vec::with_capacity(query_lower.len());
    let mut qi = skip_whitespace(query_lower, 0);
    for (idx, raw) in text.chars().enumerate() {
        if qi >= query_lower.len() {
            break;
        }
        if lower_rune_fast(raw) == query_lower[qi] {
            out.push(idx);
            qi += 1;
            qi = skip_whitespace(query_lower, qi);
        }
    }
    if qi != query_lower.len() {
        return None;
    }
    Some(out)
}

pub fn trim_runes(s: &str) -> Vec<char> {
    s.trim().chars().collect()
}

pub fn lower_runes(runes: &[char]) -> Vec<char> {
    runes.iter().map(|&r| lower_rune_fast(r)).collect()
}

pub(crate) fn non_space_rune_count(runes: &[char]) -> i32 {
    runes.iter().filter(|r| !r.is_whitespace()).count() as i32
}

fn skip_whitespace(runes: &[char], mut i: usize) -> usize {
    while i < runes.len() && runes[i].is_whitespace() {
        i += 1;
    }
    i
}

/// ASCII fast path for `A-Z`; full Unicode folding only off the hot path.
pub(crate) fn lower_rune_fast(r: char) -> char {
    if r.is_ascii_uppercase() {
        return r.to_ascii_lowercase();
    }
    if r.is_ascii() {
        return r;
    }
    r.to_lowercase().next().unwrap_or(r)
}

/// `_ - / . :` and every other non-alphanumeric rune count as word starts.
pub(crate) fn is_boundary_rune(r: char) -> bool {
    !r.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(text: &str, query: &str) -> (i32, i32, bool) {
        let raw = trim_runes(query);
        let lower = lower_runes(&raw);
        fuzzy_score(text, &raw, &lower, true)
    }

    #[test]
    fn empty_query_matches_everything() {
        assert_eq!(score("anything", ""), (0, 0, true));
        assert_eq!(score("anything", "   "), (0, 0, true));
    }

    #[test]
    fn missing_rune_fails() {
        let (_, _, ok) = score("palette", "typedir");
        assert!(!ok);
    }

    #[test]
    fn contiguous_match_spans_query_length() {
        let (score, span, ok) = score("run = \"bun run typecheck\"", "typechec");
        assert!(ok);
        assert_eq!(span, 8);
        assert!(score > 0);
    }

    #[test]
    fn whitespace_query_runes_consume_no_text() {
        let (_, _, ok) = score("src/internal/highlighter/projection.go", "internal projection");
        assert!(ok);
    }

    #[test]
    fn case_bonus_prefers_exact_case() {
        let raw = trim_runes("MyF");
        let lower = lower_runes(&raw);
        let (upper_score, _, _) = fuzzy_score("MyFunc", &raw, &lower, true);
        let (lower_score, _, _) = fuzzy_score("myFunc", &raw, &lower, true);
        assert!(upper_score > lower_score);
    }

    #[test]
    fn spread_match_pays_span_penalty() {
        let (tight, _, _) = score("handler", "handler");
        let (spread, span, ok) = score("h a n d l e r with much padding after it", "handler");
        assert!(ok);
        assert!(span > 7);
        assert!(tight > spread);
    }

    #[test]
    fn positions_track_leftmost_subsequence() {
        let lower = lower_runes(&trim_runes("mf"));
        assert_eq!(fuzzy_positions_runes("myFunc", &lower), Some(vec![0, 2]));
        assert_eq!(fuzzy_positions_runes("nope", &lower), None);
    }

    #[test]
    fn positions_skip_whitespace_in_query() {
        let lower = lower_runes(&trim_runes("a b"));
        assert_eq!(fuzzy_positions_runes("ab", &lower), Some(vec![0, 1]));
    }

    #[test]
    fn non_ascii_runes_fold() {
        let raw = trim_runes("über");
        let lower = lower_runes(&raw);
        let (_, _, ok) = fuzzy_score("Über alles", &raw, &lower, true);
        assert!(ok);
    }
}
