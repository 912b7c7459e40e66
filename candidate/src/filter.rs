use std::cmp::Ordering;
use std::thread;

use crate::fuzzy::fuzzy_score;
use crate::fuzzy::lower_runes;
use crate::fuzzy::non_space_rune_count;
use crate::fuzzy::trim_runes;
use crate::semantic::candidate_semantic_score;
use crate::types::Candidate;
use crate::types::FilteredCandidate;
use crate::types::file_base_without_ext;

/// Inputs below this size are always scored on the calling thread.
const PARALLEL_THRESHOLD: usize = 20_000;
/// Minimum chunk size worth handing to a worker.
const MIN_CHUNK_SIZE: usize = 4_096;

#[derive(Clone, Copy)]
struct Parallelism {
    threshold: usize,
    min_chunk: usize,
}

impl Default for Parallelism {
    fn default() -> Self {
        Self {
            threshold: PARALLEL_THRESHOLD,
            min_chunk: MIN_CHUNK_SIZE,
        }
    }
}

pub fn filter_candidates(candidates: &[Candidate], query: &str) -> Vec<FilteredCandidate> {
    let raw = trim_runes(query);
    let lower = lower_runes(&raw);
    filter_with_query_runes(candidates, &raw, &lower)
}

pub fn filter_with_query_runes(
    candidates: &[Candidate],
    q_raw: &[char],
    q_lower: &[char],
) -> Vec<FilteredCandidate> {
    filter_core(candidates, None, q_raw, q_lower, Parallelism::default())
}

/// Re-score only the candidates referenced by a prior result; used when the
/// query strictly extends the previous one.
pub fn filter_subset_with_query_runes(
    candidates: &[Candidate],
    subset: &[FilteredCandidate],
    q_raw: &[char],
    q_lower: &[char],
) -> Vec<FilteredCandidate> {
    filter_core(
        candidates,
        Some(subset),
        q_raw,
        q_lower,
        Parallelism::default(),
    )
}

/// Score the half-open index range `[start, end)`; used for the streaming
/// append path when the candidate vector grew under an unchanged query.
pub fn filter_range_with_query_runes(
    candidates: &[Candidate],
    start: usize,
    end: usize,
    q_raw: &[char],
    q_lower: &[char],
) -> Vec<FilteredCandidate> {
    filter_range_with(candidates, start, end, q_raw, q_lower, Parallelism::default())
}

fn filter_range_with(
    candidates: &[Candidate],
    start: usize,
    end: usize,
    q_raw: &[char],
    q_lower: &[char],
    par: Parallelism,
) -> Vec<FilteredCandidate> {
    let end = end.min(candidates.len());
    if start >= end {
        return Vec::new();
    }

    let case_sensitive = q_raw.len() == q_lower.len();
    let n = end - start;
    let workers = worker_count(n, par);
    let mut out = if workers <= 1 {
        let mut local = Vec::with_capacity((n / 4).max(1));
        append_scored_range(
            &mut local,
            candidates,
            None,
            start,
            end,
            q_raw,
            q_lower,
            case_sensitive,
        );
        local
    } else {
        scored_parallel_chunks(workers, n, |chunk_start, chunk_end| {
            let mut local = Vec::with_capacity(((chunk_end - chunk_start) / 4).max(1));
            append_scored_range(
                &mut local,
                candidates,
                None,
                start + chunk_start,
                start + chunk_end,
                q_raw,
                q_lower,
                case_sensitive,
            );
            local
        })
    };

    sort_filtered(candidates, &mut out);
    out
}

fn filter_core(
    candidates: &[Candidate],
    subset: Option<&[FilteredCandidate]>,
    q_raw: &[char],
    q_lower: &[char],
    par: Parallelism,
) -> Vec<FilteredCandidate> {
    if q_lower.is_empty() {
        return (0..candidates.len())
            .map(|i| FilteredCandidate {
                index: i as u32,
                ..Default::default()
            })
            .collect();
    }
    if let Some(subset) = subset
        && subset.is_empty()
    {
        return Vec::new();
    }

    let case_sensitive = q_raw.len() == q_lower.len();
    let (range_len, capacity_divisor) = match subset {
        Some(subset) => (subset.len(), 2),
        None => (candidates.len(), 4),
    };

    let workers = worker_count(range_len, par);
    let mut out = if workers <= 1 {
        let mut local = Vec::with_capacity((range_len / capacity_divisor).max(1));
        append_scored_range(
            &mut local,
            candidates,
            subset,
            0,
            range_len,
            q_raw,
            q_lower,
            case_sensitive,
        );
        local
    } else {
        scored_parallel_chunks(workers, range_len, |start, end| {
            let mut local = Vec::with_capacity(((end - start) / capacity_divisor).max(1));
            append_scored_range(
                &mut local,
                candidates,
                subset,
                start,
                end,
                q_raw,
                q_lower,
                case_sensitive,
            );
            local
        })
    };

    sort_filtered(candidates, &mut out);
    out
}

fn worker_count(n: usize, par: Parallelism) -> usize {
    if n < par.threshold {
        return 1;
    }

    let cores = thread::available_parallelism().map_or(1, |v| v.get());
    if cores < 2 {
        return 1;
    }

    let max_useful = n / par.min_chunk;
    if max_useful < 2 {
        return 1;
    }
    cores.min(max_useful)
}

#[allow(clippy::too_many_arguments)]
fn append_scored_range(
    out: &mut Vec<FilteredCandidate>,
    candidates: &[Candidate],
    subset: Option<&[FilteredCandidate]>,
    start: usize,
    end: usize,
    q_raw: &[char],
    q_lower: &[char],
    case_sensitive: bool,
) {
    match subset {
        None => {
            for i in start..end {
                if let Some(item) =
                    score_candidate(&candidates[i], i as u32, q_raw, q_lower, case_sensitive)
                {
                    out.push(item);
                }
            }
        }
        Some(subset) => {
            for prior in &subset[start..end] {
                let idx = prior.index as usize;
                if idx >= candidates.len() {
                    continue;
                }
                if let Some(item) =
                    score_candidate(&candidates[idx], prior.index, q_raw, q_lower, case_sensitive)
                {
                    out.push(item);
                }
            }
        }
    }
}

/// Fan out contiguous chunks to scoped threads; slot order keeps the
/// flattened result deterministic regardless of which chunk finishes first.
fn scored_parallel_chunks<F>(workers: usize, n: usize, score_chunk: F) -> Vec<FilteredCandidate>
where
    F: Fn(usize, usize) -> Vec<FilteredCandidate> + Sync,
{
    let mut parts: Vec<Vec<FilteredCandidate>> = Vec::with_capacity(workers);
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let start = worker * n / workers;
            let end = (worker + 1) * n / workers;
            let score_chunk = &score_chunk;
            handles.push(scope.spawn(move || score_chunk(start, end)));
        }
        for handle in handles {
            parts.push(handle.join().expect("scoring worker panicked"));
        }
    });

    let total = parts.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        out.extend(part);
    }
    out
}

fn sort_filtered(candidates: &[Candidate], out: &mut [FilteredCandidate]) {
    out.sort_by(|a, b| filtered_order(candidates, a, b));
}

/// Total order shared by sorting and merging: score desc, key asc, id asc.
fn filtered_order(
    candidates: &[Candidate],
    left: &FilteredCandidate,
    right: &FilteredCandidate,
) -> Ordering {
    right.score.cmp(&left.score).then_with(|| {
        let left_cand = &candidates[left.index as usize];
        let right_cand = &candidates[right.index as usize];
        left_cand
            .key
            .cmp(&right_cand.key)
            .then(left_cand.id.cmp(&right_cand.id))
    })
}

/// Merge two lists already sorted by [`filtered_order`].
pub fn merge_filtered_candidates(
    candidates: &[Candidate],
    left: Vec<FilteredCandidate>,
    right: Vec<FilteredCandidate>,
) -> Vec<FilteredCandidate> {
    if left.is_empty() {
        return right;
    }
    if right.is_empty() {
        return left;
    }

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut i = 0;
    let mut j = 0;
    while i < left.len() && j < right.len() {
        if filtered_order(candidates, &left[i], &right[j]) == Ordering::Less {
            out.push(left[i]);
            i += 1;
        } else {
            out.push(right[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&left[i..]);
    out.extend_from_slice(&right[j..]);
    out
}

fn score_candidate(
    cand: &Candidate,
    index: u32,
    q_raw: &[char],
    q_lower: &[char],
    case_sensitive: bool,
) -> Option<FilteredCandidate> {
    let (key_score, _, key_ok) = fuzzy_score(&cand.key, q_raw, q_lower, case_sensitive);
    let (text_score, text_span, mut text_ok) = fuzzy_score(&cand.text, q_raw, q_lower, case_sensitive);
    let (path_score, path_span, mut path_ok) = fuzzy_score(&cand.file, q_raw, q_lower, case_sensitive);

    let query_len = non_space_rune_count(q_lower);
    if text_ok && rejects_loose_match(text_score, text_span, query_len) {
        text_ok = false;
    }
    if path_ok && rejects_loose_match(path_score, path_span, query_len) {
        path_ok = false;
    }

    if !key_ok && !text_ok && !path_ok {
        return None;
    }

    let mut score: i32 = i32::MIN / 2;
    if key_ok {
        score = score.max(3000 + key_score * 3);
    }
    if text_ok {
        score = score.max(1800 + text_score * 2 - 60);
    }
    if path_ok {
        score = score.max(1200 + path_score - 120);
    }
    if key_ok {
        score += i32::from(candidate_semantic_score(cand));
    }
    if key_ok && text_ok {
        score += 80;
    }

    let mut item = FilteredCandidate {
        index,
        score,
        ..Default::default()
    };
    // Path-only matches (and filename-shaped keys) open the file head.
    if path_ok && !text_ok && (!key_ok || key_looks_like_filename(cand)) {
        item.open_line = 1;
        item.open_col = 1;
    }

    Some(item)
}

/// Drop a channel whose matches are spread across many non-query runes with
/// little structural bonus.
fn rejects_loose_match(score: i32, span: i32, query_len: i32) -> bool {
    if query_len <= 1 || span <= 0 {
        return false;
    }
    if span <= query_len * 5 {
        return false;
    }
    score < query_len * 4
}

fn key_looks_like_filename(cand: &Candidate) -> bool {
    let base = file_base_without_ext(&cand.file);
    if base.is_empty() || cand.key.is_empty() {
        return false;
    }
    base.eq_ignore_ascii_case(&cand.key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cand(id: u32, file: &str, text: &str, key: &str) -> Candidate {
        Candidate {
            id,
            file: file.to_string(),
            text: text.to_string(),
            key: key.to_string(),
            ..Default::default()
        }
    }

    /// Deterministic fixture set mixing keys, paths, and free text.
    fn fixture_candidates(n: usize) -> Vec<Candidate> {
        let keys = [
            "handler",
            "Dispatcher",
            "symbolTable",
            "parseRecord",
            "WriteBatch",
            "config",
        ];
        (0..n)
            .map(|i| {
                let key = keys[i % keys.len()];
                Candidate {
                    id: i as u32 + 1,
                    file: format!("src/pkg{}/{}_{i}.go", i % 17, key.to_lowercase()),
                    line: (i % 400) as u32 + 1,
                    col: 1,
                    text: format!("func {key}{i}(ctx context.Context) error {{"),
                    key: format!("{key}{i}"),
                    ..Default::default()
                }
            })
            .collect()
    }

    fn runes(query: &str) -> (Vec<char>, Vec<char>) {
        let raw = trim_runes(query);
        let lower = lower_runes(&raw);
        (raw, lower)
    }

    #[test]
    fn empty_query_returns_all_in_id_order() {
        let candidates = fixture_candidates(5);
        let res = filter_candidates(&candidates, "");
        assert_eq!(res.len(), 5);
        for (i, item) in res.iter().enumerate() {
            assert_eq!(item.index, i as u32);
            assert_eq!(item.score, 0);
        }
    }

    #[test]
    fn whitespace_query_equals_empty() {
        let candidates = fixture_candidates(5);
        assert_eq!(
            filter_candidates(&candidates, "   "),
            filter_candidates(&candidates, "")
        );
    }

    #[test]
    fn prefers_matching_case() {
        let candidates = vec![
            cand(1, "a.go", "func myFunc() {}", "myFunc"),
            cand(2, "b.go", "func MyFunc() {}", "MyFunc"),
        ];

        let res = filter_candidates(&candidates, "MyF");
        assert!(res.len() >= 2);
        assert_eq!(candidates[res[0].index as usize].key, "MyFunc");

        let res = filter_candidates(&candidates, "myf");
        assert!(res.len() >= 2);
        assert_eq!(candidates[res[0].index as usize].key, "myFunc");
    }

    #[test]
    fn declaration_beats_local_variable() {
        let candidates = vec![
            cand(1, "cat.ts", "let cat = new Cat()", "cat"),
            cand(2, "cat.ts", "class Cat {}", "Cat"),
        ];

        let res = filter_candidates(&candidates, "cat");
        assert!(res.len() >= 2);
        assert_eq!(candidates[res[0].index as usize].text, "class Cat {}");
    }

    #[test]
    fn prefers_contiguous_text_match() {
        let candidates = vec![
            cand(1, "billing.ts", "type PolarCheckoutLike = {", "PolarCheckoutLike"),
            cand(2, "framework.ts", "export type ValidationCheck = {", "ValidationCheck"),
            cand(3, ".mise.toml", "run = \"bun run typecheck\"", "run"),
        ];

        let res = filter_candidates(&candidates, "typechec");
        assert!(res.len() >= 3);
        assert_eq!(
            candidates[res[0].index as usize].text,
            "run = \"bun run typecheck\""
        );
    }

    #[test]
    fn rejects_loose_text_only_matches() {
        let candidates = vec![
            cand(
                1,
                "README.md",
                "Type: pickForeground(style, baseFG, chroma.KeywordType, chroma.NameClass), PathDir: pickForeground(style, adjustTone(comment, 0))",
                "palette",
            ),
            cand(2, "theme.go", "func TypeDir() {}", "TypeDir"),
        ];

        let res = filter_candidates(&candidates, "typedir");
        assert_eq!(res.len(), 1);
        assert_eq!(candidates[res[0].index as usize].key, "TypeDir");
    }

    #[test]
    fn whitespace_query_matches_path() {
        let candidates = vec![cand(
            1,
            "src/internal/highlighter/projection.go",
            "func projectSpansToDisplay(baseSpans []Span) ([]Span, bool) {",
            "projectSpansToDisplay",
        )];

        let res = filter_candidates(&candidates, "internal projection");
        assert_eq!(res.len(), 1);
    }

    #[test]
    fn path_only_match_opens_file_head() {
        let mut only = cand(
            1,
            "src/internal/highlighter/projection.go",
            "Type: pickForeground(style, baseFG, chroma.KeywordType)",
            "palette",
        );
        only.line = 83;
        only.col = 9;
        let candidates = vec![only];

        let res = filter_candidates(&candidates, "internal projection");
        assert_eq!(res.len(), 1);
        assert_eq!((res[0].open_line, res[0].open_col), (1, 1));
    }

    #[test]
    fn filename_key_match_opens_file_head() {
        let mut only = cand(
            1,
            "README.md",
            "Type a query, pick a result, and open the exact `file:line:col`.",
            "README",
        );
        only.line = 18;
        only.col = 1;
        let candidates = vec![only];

        let res = filter_candidates(&candidates, "README");
        assert_eq!(res.len(), 1);
        assert_eq!((res[0].open_line, res[0].open_col), (1, 1));
    }

    #[test]
    fn subset_refinement_matches_full_filter() {
        let candidates = fixture_candidates(8_000);

        let (base_raw, base_lower) = runes("hand");
        let base = filter_with_query_runes(&candidates, &base_raw, &base_lower);

        let (next_raw, next_lower) = runes("handler");
        let full = filter_with_query_runes(&candidates, &next_raw, &next_lower);
        let subset = filter_subset_with_query_runes(&candidates, &base, &next_raw, &next_lower);

        assert_eq!(subset, full);
    }

    #[test]
    fn parallel_matches_serial() {
        let candidates = fixture_candidates(12_000);
        let (q_raw, q_lower) = runes("symbol");

        let serial = filter_core(
            &candidates,
            None,
            &q_raw,
            &q_lower,
            Parallelism {
                threshold: usize::MAX,
                min_chunk: MIN_CHUNK_SIZE,
            },
        );
        let parallel = filter_core(
            &candidates,
            None,
            &q_raw,
            &q_lower,
            Parallelism {
                threshold: 1,
                min_chunk: 1,
            },
        );

        assert_eq!(parallel, serial);
    }

    #[test]
    fn range_and_merge_match_full_filter() {
        let candidates = fixture_candidates(10_000);
        let (q_raw, q_lower) = runes("handler");

        let split = 6_500;
        let old = filter_range_with_query_runes(&candidates, 0, split, &q_raw, &q_lower);
        let added =
            filter_range_with_query_runes(&candidates, split, candidates.len(), &q_raw, &q_lower);
        let merged = merge_filtered_candidates(&candidates, old, added);
        let full = filter_with_query_runes(&candidates, &q_raw, &q_lower);

        assert_eq!(merged, full);
    }

    #[test]
    fn ordering_is_deterministic() {
        let candidates = fixture_candidates(3_000);
        let first = filter_candidates(&candidates, "record");
        let second = filter_candidates(&candidates, "record");
        assert_eq!(first, second);
    }
}
