use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use snav_candidate::Candidate;
use snav_candidate::FilteredCandidate;
use snav_candidate::ProducerConfig;
use snav_candidate::ScanError;
use snav_candidate::cache::save_index_cache;
use snav_candidate::filter_range_with_query_runes;
use snav_candidate::filter_subset_with_query_runes;
use snav_candidate::filter_with_query_runes;
use snav_candidate::lower_runes;
use snav_candidate::merge_filtered_candidates;
use snav_candidate::trim_runes;
use snav_highlight::HighlightMode;
use snav_highlight::HighlightRequest;
use snav_highlight::Highlighter;
use snav_highlight::read_lines_normalized;
use snav_lang::LangId;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::warn;

use crate::actions;
use crate::text::should_use_incremental_filter;
use crate::text::truncate_text;
use crate::theme::Palette;

/// Candidates drained from the producer per frame tick.
const DRAIN_PER_TICK: usize = 4_000;
/// Preview pane appears only when the terminal is at least this wide.
const PREVIEW_MIN_WIDTH: usize = 90;

#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub pattern: String,
    pub preview: bool,
    pub cache_size: usize,
    pub workers: usize,
    pub debounce: Duration,
    pub visible_buffer: usize,
    pub highlight_mode: HighlightMode,
    pub context_radius: usize,
    pub editor_cmd: String,
    pub no_ignore: bool,
    pub exclude_tests: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            pattern: String::new(),
            preview: true,
            cache_size: 20_000,
            workers: 1,
            debounce: Duration::from_millis(100),
            visible_buffer: 30,
            highlight_mode: HighlightMode::Synthetic,
            context_radius: 40,
            editor_cmd: String::new(),
            no_ignore: false,
            exclude_tests: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreviewState {
    pub file: String,
    pub lang: LangId,
    pub start_line: usize,
    pub lines: Vec<String>,
    pub selected_line: usize,
    pub err: String,
}

pub struct App {
    pub cfg: Config,
    pub palette: Palette,

    pub width: usize,
    pub height: usize,

    /// Live query input as runes, plus a rune cursor into it.
    pub input: Vec<char>,
    pub input_cursor: usize,
    pub query_raw: Vec<char>,
    pub query_lower: Vec<char>,

    pub candidates: Vec<Candidate>,
    pub filtered: Vec<FilteredCandidate>,

    pub cursor: usize,
    pub offset: usize,

    producer_rx: Option<mpsc::Receiver<Candidate>>,
    done_rx: Option<oneshot::Receiver<Result<(), ScanError>>>,
    pub scan_done: bool,
    producer_cfg: ProducerConfig,
    /// Set when the UI was seeded from the index cache; the fresh scan then
    /// accumulates aside and atomically replaces the vector on completion.
    rebuild_from_scan: bool,
    scan_candidates: Vec<Candidate>,

    pub highlighter: Arc<Highlighter>,

    filter_pending: bool,
    filter_due: Instant,
    reset_selection_on_filter: bool,
    last_filter_query: Vec<char>,
    last_filter_candidate_n: usize,

    pub preview_enabled: bool,
    pub preview: PreviewState,
    file_cache: HashMap<String, Arc<Vec<String>>>,
    file_lang_cache: HashMap<String, LangId>,
    preview_key: String,

    pub status: String,
    pub err_msg: String,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        cfg: Config,
        palette: Palette,
        producer_cfg: ProducerConfig,
        producer_rx: Option<mpsc::Receiver<Candidate>>,
        done_rx: Option<oneshot::Receiver<Result<(), ScanError>>>,
        highlighter: Arc<Highlighter>,
    ) -> Self {
        let preview_enabled = cfg.preview;
        Self {
            cfg,
            palette,
            width: 0,
            height: 0,
            input: Vec::new(),
            input_cursor: 0,
            query_raw: Vec::new(),
            query_lower: Vec::new(),
            candidates: Vec::new(),
            filtered: Vec::new(),
            cursor: 0,
            offset: 0,
            producer_rx,
            done_rx,
            scan_done: false,
            producer_cfg,
            rebuild_from_scan: false,
            scan_candidates: Vec::new(),
            highlighter,
            filter_pending: false,
            filter_due: Instant::now(),
            reset_selection_on_filter: false,
            last_filter_query: Vec::new(),
            last_filter_candidate_n: 0,
            preview_enabled,
            preview: PreviewState::default(),
            file_cache: HashMap::new(),
            file_lang_cache: HashMap::new(),
            preview_key: String::new(),
            status: String::new(),
            err_msg: String::new(),
            should_quit: false,
        }
    }

    /// Seed the UI with a cached candidate set; the running scan will
    /// replace it wholesale when it completes.
    pub fn use_cached_index(&mut self, candidates: Vec<Candidate>) {
        if candidates.is_empty() {
            return;
        }

        self.rebuild_from_scan = true;
        self.scan_candidates = Vec::with_capacity(candidates.len());
        self.filtered = (0..candidates.len())
            .map(|i| FilteredCandidate {
                index: i as u32,
                ..Default::default()
            })
            .collect();
        self.last_filter_candidate_n = candidates.len();
        self.status = format!("using cached index ({} symbols)", candidates.len());
        self.candidates = candidates;
    }

    /// One frame of the interaction contract.
    pub fn on_tick(&mut self) {
        self.drain_producer(DRAIN_PER_TICK);
        self.drain_producer_done();

        if self.filter_pending && Instant::now() >= self.filter_due {
            self.apply_filter();
        }

        self.ensure_cursor();
        self.update_preview();
        self.queue_visible_highlights();
    }

    pub fn on_resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.schedule_filter(Duration::ZERO);
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Up => self.move_and_preview(-1),
            KeyCode::Char('p') if ctrl => self.move_and_preview(-1),
            KeyCode::Down => self.move_and_preview(1),
            KeyCode::Char('n') if ctrl => self.move_and_preview(1),
            KeyCode::PageUp => self.move_and_preview(-(self.rows_per_page() as isize)),
            KeyCode::Char('u') if ctrl => self.move_and_preview(-(self.rows_per_page() as isize)),
            KeyCode::PageDown => self.move_and_preview(self.rows_per_page() as isize),
            KeyCode::Char('d') if ctrl => self.move_and_preview(self.rows_per_page() as isize),
            KeyCode::Home => {
                self.cursor = 0;
                self.update_preview();
            }
            KeyCode::End => {
                if !self.filtered.is_empty() {
                    self.cursor = self.filtered.len() - 1;
                }
                self.update_preview();
            }
            KeyCode::Tab => {
                self.preview_enabled = !self.preview_enabled;
                self.preview_key.clear();
                self.update_preview();
            }
            KeyCode::Enter => self.open_selected(),
            KeyCode::Char('y') if ctrl => self.copy_selected(),
            KeyCode::Char('a') if ctrl => self.input_cursor = 0,
            KeyCode::Char('e') if ctrl => self.input_cursor = self.input.len(),
            KeyCode::Char('w') if ctrl => self.delete_word_back(),
            KeyCode::Left => self.input_cursor = self.input_cursor.saturating_sub(1),
            KeyCode::Right => self.input_cursor = (self.input_cursor + 1).min(self.input.len()),
            KeyCode::Backspace => {
                if self.input_cursor > 0 {
                    self.input_cursor -= 1;
                    self.input.remove(self.input_cursor);
                    self.query_edited();
                }
            }
            KeyCode::Delete => {
                if self.input_cursor < self.input.len() {
                    self.input.remove(self.input_cursor);
                    self.query_edited();
                }
            }
            KeyCode::Char(c) if !ctrl => {
                self.input.insert(self.input_cursor, c);
                self.input_cursor += 1;
                self.query_edited();
            }
            _ => {}
        }
    }

    pub fn query(&self) -> String {
        self.input.iter().collect()
    }

    fn query_edited(&mut self) {
        let query = self.query();
        self.query_raw = trim_runes(&query);
        self.query_lower = lower_runes(&self.query_raw);
        self.reset_selection_on_filter = true;
        self.schedule_filter(self.cfg.debounce);
    }

    fn delete_word_back(&mut self) {
        let mut i = self.input_cursor;
        while i > 0 && self.input[i - 1].is_whitespace() {
            i -= 1;
        }
        while i > 0 && !self.input[i - 1].is_whitespace() {
            i -= 1;
        }
        if i < self.input_cursor {
            self.input.drain(i..self.input_cursor);
            self.input_cursor = i;
            self.query_edited();
        }
    }

    fn move_and_preview(&mut self, delta: isize) {
        self.move_cursor(delta);
        self.update_preview();
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.filtered.is_empty() {
            self.cursor = 0;
            self.offset = 0;
            return;
        }
        let max = self.filtered.len() - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(max);
        self.ensure_cursor();
    }

    pub fn ensure_cursor(&mut self) {
        if self.filtered.is_empty() {
            self.cursor = 0;
            self.offset = 0;
            return;
        }
        if self.cursor >= self.filtered.len() {
            self.cursor = self.filtered.len() - 1;
        }

        let page = self.rows_per_page();
        if self.cursor < self.offset {
            self.offset = self.cursor;
        }
        if self.cursor >= self.offset + page {
            self.offset = self.cursor + 1 - page;
        }
        let max_offset = self.filtered.len().saturating_sub(page);
        if self.offset > max_offset {
            self.offset = max_offset;
        }
    }

    fn drain_producer(&mut self, max_items: usize) {
        let mut need_filter = false;
        for _ in 0..max_items {
            let Some(rx) = self.producer_rx.as_mut() else {
                break;
            };
            match rx.try_recv() {
                Ok(cand) => {
                    if self.rebuild_from_scan {
                        self.scan_candidates.push(cand);
                        continue;
                    }
                    self.candidates.push(cand);
                    if self.query_lower.is_empty() {
                        self.filtered.push(FilteredCandidate {
                            index: (self.candidates.len() - 1) as u32,
                            ..Default::default()
                        });
                    } else {
                        need_filter = true;
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.producer_rx = None;
                    break;
                }
            }
        }

        if need_filter && !self.reset_selection_on_filter {
            self.schedule_filter(Duration::ZERO);
        }
    }

    fn drain_producer_done(&mut self) {
        if self.scan_done {
            return;
        }
        let Some(done) = self.done_rx.as_mut() else {
            return;
        };
        let outcome = match done.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => return,
            Err(oneshot::error::TryRecvError::Closed) => None,
        };
        self.scan_done = true;
        self.done_rx = None;

        match outcome {
            Some(Err(ScanError::Cancelled)) => return,
            Some(Err(err)) => {
                self.err_msg = err.to_string();
                return;
            }
            Some(Ok(())) | None => {}
        }

        if self.rebuild_from_scan {
            self.rebuild_from_scan = false;
            self.candidates = std::mem::take(&mut self.scan_candidates);
            self.filtered.clear();
            self.last_filter_candidate_n = 0;
            self.last_filter_query.clear();
            self.reset_selection_on_filter = true;
            self.schedule_filter(Duration::ZERO);
            self.status = format!("index refreshed ({} symbols)", self.candidates.len());
        }

        let cache_cfg = self.producer_cfg.clone();
        let cache_candidates = self.candidates.clone();
        std::thread::spawn(move || {
            if let Err(err) = save_index_cache(&cache_cfg, &cache_candidates) {
                warn!("index cache save failed: {err}");
            }
        });
    }

    pub fn schedule_filter(&mut self, delay: Duration) {
        self.filter_pending = true;
        self.filter_due = Instant::now() + delay;
    }

    pub fn apply_filter(&mut self) {
        self.filter_pending = false;
        let same_query = self.query_lower == self.last_filter_query;
        let candidate_n = self.candidates.len();
        if candidate_n == self.last_filter_candidate_n && same_query {
            return;
        }

        let reset_selection = self.reset_selection_on_filter;
        self.reset_selection_on_filter = false;

        let mut selected_id = 0;
        if !reset_selection
            && let Some(cand) = self.selected_candidate()
        {
            selected_id = cand.id;
        }

        if !reset_selection
            && same_query
            && !self.query_lower.is_empty()
            && candidate_n > self.last_filter_candidate_n
        {
            let added = filter_range_with_query_runes(
                &self.candidates,
                self.last_filter_candidate_n,
                candidate_n,
                &self.query_raw,
                &self.query_lower,
            );
            let prior = std::mem::take(&mut self.filtered);
            self.filtered = merge_filtered_candidates(&self.candidates, prior, added);
        } else if should_use_incremental_filter(
            &self.query_lower,
            &self.last_filter_query,
            candidate_n,
            self.last_filter_candidate_n,
        ) {
            self.filtered = filter_subset_with_query_runes(
                &self.candidates,
                &self.filtered,
                &self.query_raw,
                &self.query_lower,
            );
        } else {
            self.filtered =
                filter_with_query_runes(&self.candidates, &self.query_raw, &self.query_lower);
        }
        self.last_filter_query = self.query_lower.clone();
        self.last_filter_candidate_n = candidate_n;

        if self.filtered.is_empty() {
            self.cursor = 0;
            self.offset = 0;
            self.preview_key.clear();
            return;
        }

        if reset_selection || selected_id == 0 {
            self.cursor = 0;
            self.offset = 0;
            return;
        }

        for (i, item) in self.filtered.iter().enumerate() {
            if self.candidates[item.index as usize].id == selected_id {
                self.cursor = i;
                self.ensure_cursor();
                return;
            }
        }

        self.cursor = 0;
        self.offset = 0;
    }

    pub fn selected_candidate(&self) -> Option<&Candidate> {
        let item = self.filtered.get(self.cursor)?;
        self.candidates.get(item.index as usize)
    }

    fn open_selected(&mut self) {
        let Some(item) = self.filtered.get(self.cursor).copied() else {
            return;
        };
        let Some(cand) = self.candidates.get(item.index as usize) else {
            return;
        };

        // Path-only matches carry an override that opens the file head.
        let line = if item.open_line > 0 {
            item.open_line
        } else {
            cand.line
        };
        let col = if item.open_col > 0 { item.open_col } else { cand.col };

        let abs = self.cfg.root.join(&cand.file);
        match actions::open_location(&abs.to_string_lossy(), line, col, &self.cfg.editor_cmd) {
            Ok(()) => self.should_quit = true,
            Err(err) => self.status = format!("open failed: {err}"),
        }
    }

    fn copy_selected(&mut self) {
        let Some(cand) = self.selected_candidate() else {
            return;
        };
        let loc = format!("{}:{}:{}", cand.file, cand.line, cand.col);
        match actions::copy_to_clipboard(&loc) {
            Ok(()) => self.status = format!("copied {loc}"),
            Err(err) => self.status = format!("copy failed: {err}"),
        }
    }

    pub fn update_preview(&mut self) {
        if !self.preview_enabled {
            self.preview = PreviewState::default();
            self.preview_key.clear();
            return;
        }
        let Some(cand) = self.selected_candidate() else {
            self.preview = PreviewState::default();
            self.preview_key.clear();
            return;
        };
        let file = cand.file.clone();
        let line = cand.line as usize;

        let key = format!("{file}:{line}:{}", self.height);
        if key == self.preview_key {
            return;
        }
        self.preview_key = key;

        let file_lines = match self.load_file(&file) {
            Ok(lines) => lines,
            Err(err) => {
                self.preview = PreviewState {
                    file,
                    err: err.to_string(),
                    ..Default::default()
                };
                return;
            }
        };
        if file_lines.is_empty() {
            self.preview = PreviewState {
                file,
                err: "empty file".to_string(),
                ..Default::default()
            };
            return;
        }

        let lang = match self.file_lang_cache.get(&file) {
            Some(lang) => *lang,
            None => {
                let lang = snav_lang::detect_with_shebang(&file, &file_lines[0]);
                self.file_lang_cache.insert(file.clone(), lang);
                lang
            }
        };

        let (_, _, _, preview_h) = self.layout();
        let visible = preview_h.saturating_sub(1).max(1);
        let before = visible / 4;
        let mut start = line.saturating_sub(before).max(1);
        let end = file_lines.len().min(start + visible - 1);
        if end.saturating_add(1).saturating_sub(start) < visible {
            start = end.saturating_sub(visible - 1).max(1);
        }

        self.preview = PreviewState {
            file,
            lang,
            start_line: start,
            lines: file_lines[start - 1..end].to_vec(),
            selected_line: line,
            err: String::new(),
        };
    }

    fn load_file(&mut self, rel: &str) -> std::io::Result<Arc<Vec<String>>> {
        if let Some(lines) = self.file_cache.get(rel) {
            return Ok(Arc::clone(lines));
        }
        let abs = self.cfg.root.join(rel);
        let lines = Arc::new(read_lines_normalized(&abs)?);
        self.file_cache.insert(rel.to_string(), Arc::clone(&lines));
        Ok(lines)
    }

    /// Pre-highlight the visible list window (plus a buffer on both sides)
    /// and the visible preview lines.
    fn queue_visible_highlights(&mut self) {
        let (list_w, list_h, preview_w, preview_h) = self.layout();
        if list_w == 0 || list_h == 0 {
            return;
        }

        let start = self.offset.saturating_sub(self.cfg.visible_buffer);
        let end = self
            .filtered
            .len()
            .min(self.offset + self.rows_per_page() + self.cfg.visible_buffer);
        for item in &self.filtered[start.min(end)..end] {
            let cand = &self.candidates[item.index as usize];
            let text = truncate_text(&cand.text, list_w);
            let req = self.highlight_request(cand.lang, &cand.file, cand.line, text);
            self.highlighter.queue(req);
        }

        if !self.preview_enabled || self.preview.lines.is_empty() || preview_h <= 1 {
            return;
        }

        let visible = self.preview.lines.len().min(preview_h - 1);
        let max_code = preview_w.saturating_sub(7);
        for (i, line) in self.preview.lines[..visible].iter().enumerate() {
            let line_no = self.preview.start_line + i;
            let text = truncate_text(line, max_code);
            let req =
                self.highlight_request(self.preview.lang, &self.preview.file, line_no as u32, text);
            self.highlighter.queue(req);
        }
    }

    pub fn highlight_request(
        &self,
        lang: LangId,
        file: &str,
        line: u32,
        text: String,
    ) -> HighlightRequest {
        let mut req = HighlightRequest {
            mode: Some(self.cfg.highlight_mode),
            lang,
            text,
            ..Default::default()
        };
        if self.cfg.highlight_mode == HighlightMode::File {
            req.file = Some(PathBuf::from(file));
            req.line = line;
        }
        req
    }

    pub fn rows_per_page(&self) -> usize {
        let (_, list_h, _, _) = self.layout();
        (list_h / 2).max(1)
    }

    /// `(list_width, list_height, preview_width, preview_height)` for the
    /// current terminal size. The preview takes a bit under half the width
    /// once the terminal is wide enough.
    pub fn layout(&self) -> (usize, usize, usize, usize) {
        let header_height = 2;
        let footer_height = 1;
        let content_h = self.height.saturating_sub(header_height + footer_height).max(1);

        if !self.preview_enabled || self.width < PREVIEW_MIN_WIDTH {
            return (self.width, content_h, 0, 0);
        }

        let mut preview_w = ((self.width * 9 + 10) / 20).max(30);
        let mut list_w = self.width.saturating_sub(preview_w + 1);
        if list_w < 20 {
            list_w = self.width;
            preview_w = 0;
        }
        (list_w, content_h, preview_w, content_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use snav_candidate::filter_candidates;
    use snav_highlight::HighlighterConfig;

    fn test_app() -> App {
        let highlighter = Arc::new(Highlighter::new(HighlighterConfig {
            cache_size: 16,
            workers: 1,
            ..Default::default()
        }));
        let palette = crate::theme::load_palette("nord").expect("theme");
        let mut app = App::new(
            Config::default(),
            palette,
            ProducerConfig::default(),
            None,
            None,
            highlighter,
        );
        app.width = 120;
        app.height = 40;
        app
    }

    fn push_candidates(app: &mut App, candidates: Vec<Candidate>) {
        for cand in candidates {
            app.candidates.push(cand);
            if app.query_lower.is_empty() {
                app.filtered.push(FilteredCandidate {
                    index: (app.candidates.len() - 1) as u32,
                    ..Default::default()
                });
            }
        }
    }

    fn cand(id: u32, key: &str) -> Candidate {
        Candidate {
            id,
            file: format!("src/{key}.go"),
            line: id,
            col: 1,
            text: format!("func {key}() {{}}"),
            key: key.to_string(),
            ..Default::default()
        }
    }

    fn type_query(app: &mut App, query: &str) {
        for c in query.chars() {
            app.on_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    #[test]
    fn empty_query_appends_in_place() {
        let mut app = test_app();
        push_candidates(&mut app, vec![cand(1, "alpha"), cand(2, "beta")]);
        assert_eq!(app.filtered.len(), 2);
        assert_eq!(app.filtered[0].index, 0);
        assert_eq!(app.filtered[1].index, 1);
    }

    #[test]
    fn typed_query_debounces_then_filters() {
        let mut app = test_app();
        push_candidates(
            &mut app,
            vec![cand(1, "alpha"), cand(2, "beta"), cand(3, "alphabet")],
        );

        type_query(&mut app, "alpha");
        assert!(app.filter_pending);

        // Force the debounce deadline and apply.
        app.filter_due = Instant::now();
        app.apply_filter();
        assert_eq!(
            app.filtered,
            filter_candidates(&app.candidates, "alpha"),
        );
    }

    #[test]
    fn streaming_append_matches_full_refilter() {
        let mut app = test_app();
        push_candidates(&mut app, (1..=50).map(|i| cand(i, "handler")).collect());

        type_query(&mut app, "handler");
        app.apply_filter();
        assert_eq!(app.last_filter_candidate_n, 50);

        // The vector grows under an unchanged query: streaming append path.
        for i in 51..=80 {
            app.candidates.push(cand(i, "handler"));
        }
        app.schedule_filter(Duration::ZERO);
        app.apply_filter();

        assert_eq!(
            app.filtered,
            filter_candidates(&app.candidates, "handler"),
        );
    }

    #[test]
    fn prefix_growth_uses_subset_and_matches_full() {
        let mut app = test_app();
        push_candidates(
            &mut app,
            vec![
                cand(1, "handler"),
                cand(2, "handle"),
                cand(3, "hand"),
                cand(4, "parser"),
            ],
        );

        type_query(&mut app, "hand");
        app.apply_filter();
        let after_hand = app.filtered.clone();
        assert!(!after_hand.is_empty());

        type_query(&mut app, "le");
        app.apply_filter();
        assert_eq!(
            app.filtered,
            filter_candidates(&app.candidates, "handle"),
        );
    }

    #[test]
    fn selection_survives_refilter_by_id() {
        let mut app = test_app();
        push_candidates(
            &mut app,
            vec![cand(1, "alpha"), cand(2, "beta"), cand(3, "gamma")],
        );
        app.cursor = 1;

        // A grown vector with the same (empty) query keeps the selection.
        app.candidates.push(cand(4, "delta"));
        app.schedule_filter(Duration::ZERO);
        app.apply_filter();

        let selected = app.selected_candidate().expect("selection");
        assert_eq!(selected.id, 2);
    }

    #[test]
    fn selection_resets_on_query_edit() {
        let mut app = test_app();
        push_candidates(
            &mut app,
            vec![cand(1, "alpha"), cand(2, "beta"), cand(3, "betamax")],
        );
        app.cursor = 2;

        type_query(&mut app, "beta");
        app.apply_filter();
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn cursor_clamps_to_filtered_len() {
        let mut app = test_app();
        push_candidates(&mut app, vec![cand(1, "alpha"), cand(2, "beta")]);
        app.cursor = 99;
        app.ensure_cursor();
        assert_eq!(app.cursor, 1);

        app.filtered.clear();
        app.ensure_cursor();
        assert_eq!((app.cursor, app.offset), (0, 0));
    }

    #[test]
    fn navigation_keys_move_without_editing_query() {
        let mut app = test_app();
        push_candidates(&mut app, vec![cand(1, "alpha"), cand(2, "beta")]);

        app.on_key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        assert_eq!(app.cursor, 1);
        app.on_key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
        assert_eq!(app.cursor, 0);
        assert_eq!(app.query(), "");
    }

    #[test]
    fn printable_j_and_k_edit_the_query() {
        let mut app = test_app();
        type_query(&mut app, "jk");
        assert_eq!(app.query(), "jk");
    }

    #[test]
    fn backspace_and_word_delete_edit_at_cursor() {
        let mut app = test_app();
        type_query(&mut app, "hello world");
        app.on_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(app.query(), "hello worl");
        app.on_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL));
        assert_eq!(app.query(), "hello ");
    }

    #[test]
    fn cached_index_seeds_then_scan_replaces() {
        let mut app = test_app();
        app.use_cached_index(vec![cand(1, "old"), cand(2, "older")]);
        assert_eq!(app.candidates.len(), 2);
        assert!(app.status.contains("using cached index"));

        // While rebuilding, newly scanned candidates accumulate aside.
        app.rebuild_from_scan = true;
        app.scan_candidates = vec![cand(1, "fresh")];
        app.scan_done = true; // simulate: swap happens in drain_producer_done

        // Directly exercise the swap logic.
        app.rebuild_from_scan = false;
        app.candidates = std::mem::take(&mut app.scan_candidates);
        app.filtered.clear();
        app.schedule_filter(Duration::ZERO);
        app.apply_filter();
        assert_eq!(app.candidates.len(), 1);
        assert_eq!(app.filtered.len(), 1);
    }

    #[test]
    fn resize_forces_immediate_filter() {
        let mut app = test_app();
        app.on_resize(100, 30);
        assert!(app.filter_pending);
        assert!(app.filter_due <= Instant::now());
    }

    #[test]
    fn layout_hides_preview_on_narrow_terminals() {
        let mut app = test_app();
        app.width = 80;
        let (list_w, _, preview_w, _) = app.layout();
        assert_eq!(list_w, 80);
        assert_eq!(preview_w, 0);

        app.width = 120;
        let (list_w, _, preview_w, _) = app.layout();
        assert!(preview_w >= 30);
        assert_eq!(list_w + preview_w + 1, 120);
    }
}
