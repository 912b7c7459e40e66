use crate::Span;
use crate::TokenCategory;
use crate::spans::normalize_spans;

/// Join a window of file lines into one parse buffer, returning the byte
/// range of the target line inside it.
pub(crate) fn build_slice_source(
    lines: &[String],
    target_index: usize,
) -> Option<(Vec<u8>, usize, usize)> {
    if target_index >= lines.len() {
        return None;
    }

    let mut source = Vec::new();
    let mut line_start = 0;
    let mut line_end = 0;

    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            source.push(b'\n');
        }
        if i == target_index {
            line_start = source.len();
        }
        source.extend_from_slice(line.as_bytes());
        if i == target_index {
            line_end = source.len();
        }
    }

    Some((source, line_start, line_end))
}

/// Re-express spans computed on the raw source line in terms of the
/// displayed text, which may be tab-expanded and truncated with a trailing
/// `...`. Returns `None` when the display prefix does not line up with the
/// normalized source (caller falls back to synthetic mode).
pub(crate) fn project_spans_to_display(
    base_spans: &[Span],
    source_line: &str,
    display_line: &str,
) -> Option<Vec<Span>> {
    let display_runes: Vec<char> = display_line.chars().collect();
    if display_runes.is_empty() {
        return Some(Vec::new());
    }

    let (normalized_source, normalized_to_source) = normalize_line_for_display(source_line);

    let has_ellipsis = display_runes.len() >= 3 && display_line.ends_with("...");
    let prefix_len = if has_ellipsis {
        display_runes.len() - 3
    } else {
        display_runes.len()
    };

    if prefix_len > normalized_source.len() {
        return None;
    }
    if display_runes[..prefix_len] != normalized_source[..prefix_len] {
        return None;
    }

    let mut projected: Vec<Span> = Vec::with_capacity(base_spans.len() + 2);
    let push_span = |projected: &mut Vec<Span>, start: usize, end: usize, cat: TokenCategory| {
        if end <= start {
            return;
        }
        if let Some(last) = projected.last_mut()
            && last.end == start
            && last.cat == cat
        {
            last.end = end;
            return;
        }
        projected.push(Span { start, end, cat });
    };

    let mut span_idx = 0;
    for (i, src_idx) in normalized_to_source.iter().take(prefix_len).enumerate() {
        let mut cat = TokenCategory::Plain;
        while span_idx < base_spans.len() && *src_idx >= base_spans[span_idx].end {
            span_idx += 1;
        }
        if let Some(span) = base_spans.get(span_idx)
            && *src_idx >= span.start
            && *src_idx < span.end
        {
            cat = span.cat;
        }
        push_span(&mut projected, i, i + 1, cat);
    }

    if has_ellipsis {
        push_span(&mut projected, prefix_len, display_runes.len(), TokenCategory::Plain);
    }

    Some(normalize_spans(projected, display_runes.len()))
}

/// Normalize a source line the way the display layer does (drop CR, LF to
/// space, tab to four spaces) and keep a map from normalized rune index
/// back to the source rune index.
fn normalize_line_for_display(line: &str) -> (Vec<char>, Vec<usize>) {
    let mut out = Vec::with_capacity(line.len());
    let mut index_map = Vec::with_capacity(line.len());

    for (i, r) in line.chars().enumerate() {
        match r {
            '\r' => {}
            '\n' => {
                out.push(' ');
                index_map.push(i);
            }
            '\t' => {
                for _ in 0..4 {
                    out.push(' ');
                    index_map.push(i);
                }
            }
            _ => {
                out.push(r);
                index_map.push(i);
            }
        }
    }

    (out, index_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn span(start: usize, end: usize, cat: TokenCategory) -> Span {
        Span { start, end, cat }
    }

    #[test]
    fn slice_source_marks_target_line_range() {
        let lines: Vec<String> = ["fn a() {", "    body();", "}"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        let (source, start, end) = build_slice_source(&lines, 1).expect("slice");
        assert_eq!(&source[start..end], b"    body();");
        assert!(build_slice_source(&lines, 3).is_none());
    }

    #[test]
    fn projection_expands_tabs() {
        let base = vec![
            span(0, 1, TokenCategory::Plain),
            span(1, 7, TokenCategory::Keyword),
            span(7, 13, TokenCategory::Plain),
        ];

        let got = project_spans_to_display(&base, "\treturn value", "    return value")
            .expect("projection should succeed");

        assert_eq!(
            got,
            vec![
                span(0, 4, TokenCategory::Plain),
                span(4, 10, TokenCategory::Keyword),
                span(10, 16, TokenCategory::Plain),
            ]
        );
    }

    #[test]
    fn projection_keeps_trailing_ellipsis_plain() {
        let base = vec![
            span(0, 1, TokenCategory::Plain),
            span(1, 7, TokenCategory::Keyword),
            span(7, 13, TokenCategory::Plain),
        ];

        let got = project_spans_to_display(&base, "\treturn value", "    return...")
            .expect("projection should succeed");

        assert_eq!(
            got,
            vec![
                span(0, 4, TokenCategory::Plain),
                span(4, 10, TokenCategory::Keyword),
                span(10, 13, TokenCategory::Plain),
            ]
        );
    }

    #[test]
    fn mismatched_display_prefix_fails() {
        let base = vec![span(0, 5, TokenCategory::Keyword)];
        assert!(project_spans_to_display(&base, "alpha beta", "gamma").is_none());
        assert!(project_spans_to_display(&base, "short", "short but longer").is_none());
    }

    #[test]
    fn empty_display_projects_to_nothing() {
        let base = vec![span(0, 5, TokenCategory::Keyword)];
        assert_eq!(project_spans_to_display(&base, "alpha", ""), Some(Vec::new()));
    }

    #[test]
    fn every_display_rune_is_covered() {
        let base = vec![span(0, 3, TokenCategory::Function), span(3, 9, TokenCategory::String)];
        let got = project_spans_to_display(&base, "abc\tdef", "abc    def").expect("projection");
        assert_eq!(got.first().map(|s| s.start), Some(0));
        assert_eq!(got.last().map(|s| s.end), Some(10));
        for pair in got.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }
}
