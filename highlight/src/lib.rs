mod classify;
mod languages;
mod projection;
mod spans;

use std::collections::HashMap;
use std::collections::HashSet;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::RwLock;
use std::thread;

use lru::LruCache;
use snav_lang::LangId;
use thiserror::Error;
use tracing::debug;
use tree_sitter::Parser;

use crate::classify::collect_leaf_spans;
use crate::projection::build_slice_source;
use crate::projection::project_spans_to_display;
use crate::spans::RawSpan;
use crate::spans::build_merged_spans;
use crate::spans::plain_spans;

const DEFAULT_CONTEXT_RADIUS: usize = 40;
const TASKS_PER_WORKER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenCategory {
    Plain,
    Keyword,
    Type,
    Function,
    String,
    Number,
    Comment,
    Operator,
    Error,
}

/// A rune-indexed run of the display line tagged with one token category.
/// For any line, the highlighter's output spans are disjoint, sorted, and
/// tile `[0, rune_count(line))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub cat: TokenCategory,
}

/// `Synthetic` parses the line inside a minimal scaffold; `File` parses a
/// window of the containing file and projects spans onto the display text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HighlightMode {
    #[default]
    Synthetic,
    File,
}

#[derive(Debug, Error)]
#[error("invalid highlight context {0:?} (use synthetic or file)")]
pub struct ParseModeError(String);

impl FromStr for HighlightMode {
    type Err = ParseModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "synthetic" => Ok(HighlightMode::Synthetic),
            "file" => Ok(HighlightMode::File),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HighlightRequest {
    pub mode: Option<HighlightMode>,
    pub lang: LangId,
    pub text: String,
    pub file: Option<PathBuf>,
    pub line: u32,
}

/// Normalized request identity. In synthetic mode the file and line are not
/// part of the key; in file mode they are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    mode: HighlightMode,
    lang: LangId,
    text: String,
    file: Option<PathBuf>,
    line: u32,
}

struct SpanLru {
    inner: Mutex<LruCache<CacheKey, Arc<[Span]>>>,
}

impl SpanLru {
    fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1))
            .unwrap_or_else(|| unreachable!("capacity is clamped to at least 1"));
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Arc<[Span]>> {
        self.lock().get(key).cloned()
    }

    fn put(&self, key: CacheKey, spans: Arc<[Span]>) {
        self.lock().put(key, spans);
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Arc<[Span]>>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HighlighterConfig {
    pub cache_size: usize,
    pub workers: usize,
    pub root: PathBuf,
    pub default_mode: HighlightMode,
    pub context_radius: usize,
}

impl Default for HighlighterConfig {
    fn default() -> Self {
        Self {
            cache_size: 20_000,
            workers: 1,
            root: PathBuf::new(),
            default_mode: HighlightMode::Synthetic,
            context_radius: DEFAULT_CONTEXT_RADIUS,
        }
    }
}

/// Shared service state; workers hold an `Arc` to it.
struct Shared {
    cache: SpanLru,
    pending: Mutex<HashSet<CacheKey>>,
    langs: HashMap<LangId, tree_sitter::Language>,
    root: PathBuf,
    default_mode: HighlightMode,
    context_radius: usize,
    file_lines: RwLock<HashMap<PathBuf, Arc<Vec<String>>>>,
}

/// LRU-backed, worker-pool, request-deduplicating span service.
///
/// `lookup` never blocks beyond the cache mutex; misses are `queue`d onto a
/// bounded channel and computed by workers that each own one parser.
pub struct Highlighter {
    shared: Arc<Shared>,
    tasks: crossbeam_channel::Sender<HighlightRequest>,
}

impl Highlighter {
    pub fn new(cfg: HighlighterConfig) -> Self {
        let workers = cfg.workers.max(1);
        let context_radius = if cfg.context_radius == 0 {
            DEFAULT_CONTEXT_RADIUS
        } else {
            cfg.context_radius
        };

        let shared = Arc::new(Shared {
            cache: SpanLru::new(cfg.cache_size),
            pending: Mutex::new(HashSet::new()),
            langs: languages::grammar_table(),
            root: cfg.root,
            default_mode: cfg.default_mode,
            context_radius,
            file_lines: RwLock::new(HashMap::new()),
        });

        let (tx, rx) = crossbeam_channel::bounded(workers * TASKS_PER_WORKER);
        for _ in 0..workers {
            let shared = Arc::clone(&shared);
            let rx: crossbeam_channel::Receiver<HighlightRequest> = rx.clone();
            thread::spawn(move || {
                let mut parser = Parser::new();
                for req in rx {
                    let spans: Arc<[Span]> = shared.highlight_with_parser(&mut parser, &req).into();
                    let key = shared.cache_key(&req);
                    shared.cache.put(key.clone(), spans);
                    shared.lock_pending().remove(&key);
                }
            });
        }

        Self { shared, tasks: tx }
    }

    /// Non-blocking cache probe.
    pub fn lookup(&self, req: &HighlightRequest) -> Option<Arc<[Span]>> {
        let normalized = self.shared.normalize_request(req.clone());
        self.shared.cache.get(&self.shared.cache_key(&normalized))
    }

    /// Schedule a background computation for a miss. Requests already cached
    /// or pending are dropped; so are requests when the queue is full (the
    /// caller retries on the next frame).
    pub fn queue(&self, req: HighlightRequest) {
        let normalized = self.shared.normalize_request(req);
        if normalized.text.is_empty() {
            return;
        }

        let key = self.shared.cache_key(&normalized);
        if self.shared.cache.get(&key).is_some() {
            return;
        }

        {
            let mut pending = self.shared.lock_pending();
            if !pending.insert(key.clone()) {
                return;
            }
        }

        if self.tasks.try_send(normalized).is_err() {
            self.shared.lock_pending().remove(&key);
        }
    }

    /// Synchronous computation with a caller-owned parser; used by workers
    /// and directly by tests.
    pub fn highlight_with_parser(&self, parser: &mut Parser, req: &HighlightRequest) -> Vec<Span> {
        let normalized = self.shared.normalize_request(req.clone());
        self.shared.highlight_with_parser(parser, &normalized)
    }
}

impl Shared {
    fn normalize_request(&self, mut req: HighlightRequest) -> HighlightRequest {
        let mode = req.mode.unwrap_or(self.default_mode);
        req.mode = Some(mode);

        if mode == HighlightMode::File {
            if let Some(file) = req.file.take() {
                let mut file = PathBuf::from(file.to_string_lossy().trim().to_string());
                if file.as_os_str().is_empty() || req.line == 0 {
                    // fall through to synthetic
                } else {
                    if file.is_relative() && !self.root.as_os_str().is_empty() {
                        file = self.root.join(file);
                    }
                    req.file = Some(file);
                    return req;
                }
            }
        }

        req.mode = Some(HighlightMode::Synthetic);
        req.file = None;
        req.line = 0;
        req
    }

    fn cache_key(&self, req: &HighlightRequest) -> CacheKey {
        let mode = req.mode.unwrap_or(self.default_mode);
        let (file, line) = if mode == HighlightMode::File {
            (req.file.clone(), req.line)
        } else {
            (None, 0)
        };
        CacheKey {
            mode,
            lang: req.lang,
            text: req.text.clone(),
            file,
            line,
        }
    }

    fn highlight_with_parser(&self, parser: &mut Parser, req: &HighlightRequest) -> Vec<Span> {
        if req.mode == Some(HighlightMode::File)
            && let Some(spans) = self.highlight_from_file_context(parser, req)
        {
            return spans;
        }
        self.highlight_synthetic(parser, req.lang, &req.text)
    }

    fn highlight_synthetic(&self, parser: &mut Parser, lang: LangId, text: &str) -> Vec<Span> {
        if text.is_empty() {
            return Vec::new();
        }

        let Some(language) = self.langs.get(&lang) else {
            return plain_spans(text);
        };

        let (source, line_start, line_end) = spans::scaffold_line(lang, text);
        let Some(raw) = collect_raw_spans(parser, language, &source, line_start, line_end, lang)
        else {
            return plain_spans(text);
        };
        build_merged_spans(text, raw)
    }

    /// Returns `None` on any failure so the caller can fall back to the
    /// synthetic scaffold.
    fn highlight_from_file_context(
        &self,
        parser: &mut Parser,
        req: &HighlightRequest,
    ) -> Option<Vec<Span>> {
        let language = self.langs.get(&req.lang)?;
        let file = req.file.as_deref()?;

        let lines = self.load_file_lines(file)?;
        if lines.is_empty() {
            return None;
        }
        let line = req.line as usize;
        if line < 1 || line > lines.len() {
            return None;
        }

        let target_line = &lines[line - 1];
        let display = if req.text.is_empty() {
            target_line.as_str()
        } else {
            req.text.as_str()
        };

        let start_line = line.saturating_sub(self.context_radius).max(1);
        let end_line = (line + self.context_radius).min(lines.len());
        let (source, target_start, target_end) =
            build_slice_source(&lines[start_line - 1..end_line], line - start_line)?;

        let raw = collect_raw_spans(parser, language, &source, target_start, target_end, req.lang)?;
        let base_spans = build_merged_spans(target_line, raw);

        project_spans_to_display(&base_spans, target_line, display)
    }

    fn load_file_lines(&self, path: &Path) -> Option<Arc<Vec<String>>> {
        if let Ok(cache) = self.file_lines.read()
            && let Some(lines) = cache.get(path)
        {
            return Some(Arc::clone(lines));
        }

        let lines = match read_lines_normalized(path) {
            Ok(lines) => Arc::new(lines),
            Err(err) => {
                debug!("file-context read failed for {path:?}: {err}");
                return None;
            }
        };

        if let Ok(mut cache) = self.file_lines.write() {
            cache.insert(path.to_path_buf(), Arc::clone(&lines));
        }
        Some(lines)
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashSet<CacheKey>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn collect_raw_spans(
    parser: &mut Parser,
    language: &tree_sitter::Language,
    source: &[u8],
    line_start: usize,
    line_end: usize,
    lang: LangId,
) -> Option<Vec<RawSpan>> {
    parser.set_language(language).ok()?;
    let tree = parser.parse(source, None)?;

    let mut raw = Vec::with_capacity(32);
    collect_leaf_spans(
        tree.root_node(),
        line_start,
        line_end,
        source,
        lang,
        "",
        "",
        &mut raw,
    );
    Some(raw)
}

/// Read a file once, normalizing CRLF to LF, split into lines.
pub fn read_lines_normalized(path: &Path) -> std::io::Result<Vec<String>> {
    let data = fs::read_to_string(path)?;
    let normalized = data.replace("\r\n", "\n");
    Ok(normalized.split('\n').map(str::to_string).collect())
}
