use snav_lang::LangId;

use crate::Span;
use crate::TokenCategory;

/// A byte-offset span relative to the target line, before rune conversion
/// and normalization.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawSpan {
    pub start: usize,
    pub end: usize,
    pub cat: TokenCategory,
}

/// Wrap a lone line in a minimal per-language scaffold so the parser sees
/// it in a plausible position. Returns the buffer plus the byte range the
/// line occupies inside it.
pub(crate) fn scaffold_line(lang: LangId, line: &str) -> (Vec<u8>, usize, usize) {
    let (prefix, suffix) = match lang {
        LangId::Go => ("package p\nfunc _snav_() {\n", "\n}\n"),
        LangId::Rust => ("fn _snav_() {\n", "\n}\n"),
        LangId::JavaScript | LangId::TypeScript | LangId::Tsx => ("function _snav_() {\n", "\n}\n"),
        LangId::C | LangId::Cpp => ("void _snav_() {\n", "\n}\n"),
        LangId::Json => ("{\n", "\n}\n"),
        _ => ("", "\n"),
    };

    let mut source = Vec::with_capacity(prefix.len() + line.len() + suffix.len());
    source.extend_from_slice(prefix.as_bytes());
    source.extend_from_slice(line.as_bytes());
    source.extend_from_slice(suffix.as_bytes());

    let start = prefix.len();
    let end = start + line.len();
    (source, start, end)
}

pub(crate) fn plain_spans(text: &str) -> Vec<Span> {
    let rune_len = text.chars().count();
    if rune_len == 0 {
        return Vec::new();
    }
    vec![Span {
        start: 0,
        end: rune_len,
        cat: TokenCategory::Plain,
    }]
}

/// Convert raw byte spans to rune spans against `text` and normalize.
pub(crate) fn build_merged_spans(text: &str, mut raw: Vec<RawSpan>) -> Vec<Span> {
    let rune_len = text.chars().count();
    if rune_len == 0 {
        return Vec::new();
    }
    if raw.is_empty() {
        return plain_spans(text);
    }

    raw.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

    let mut spans = Vec::with_capacity(raw.len() + 2);
    for rs in raw {
        let start_rune = byte_to_rune_index(text, rs.start);
        let end_rune = byte_to_rune_index(text, rs.end);
        if end_rune <= start_rune {
            continue;
        }
        spans.push(Span {
            start: start_rune,
            end: end_rune,
            cat: rs.cat,
        });
    }

    normalize_spans(spans, rune_len)
}

/// Clamp, sort, drop empties, merge same-category neighbors, and fill gaps
/// with Plain so the result tiles `[0, rune_len)` exactly.
pub(crate) fn normalize_spans(spans: Vec<Span>, rune_len: usize) -> Vec<Span> {
    if rune_len == 0 {
        return Vec::new();
    }

    let mut clean: Vec<Span> = spans
        .into_iter()
        .filter_map(|span| {
            let start = span.start.min(rune_len);
            let end = span.end.min(rune_len);
            (end > start).then_some(Span {
                start,
                end,
                cat: span.cat,
            })
        })
        .collect();

    if clean.is_empty() {
        return vec![Span {
            start: 0,
            end: rune_len,
            cat: TokenCategory::Plain,
        }];
    }

    clean.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

    let mut out: Vec<Span> = Vec::with_capacity(clean.len() + 2);
    let mut cursor = 0usize;
    for span in clean {
        let start = span.start.max(cursor);
        let end = span.end;
        if end <= start {
            continue;
        }

        if start > cursor {
            out.push(Span {
                start: cursor,
                end: start,
                cat: TokenCategory::Plain,
            });
        }

        match out.last_mut() {
            Some(last) if last.end == start && last.cat == span.cat => last.end = end,
            _ => out.push(Span {
                start,
                end,
                cat: span.cat,
            }),
        }

        cursor = end;
    }

    if cursor < rune_len {
        out.push(Span {
            start: cursor,
            end: rune_len,
            cat: TokenCategory::Plain,
        });
    }

    out
}

pub(crate) fn byte_to_rune_index(s: &str, byte: usize) -> usize {
    if byte == 0 {
        return 0;
    }
    if byte >= s.len() {
        return s.chars().count();
    }
    s[..byte.min(s.len())].chars().count()
}
