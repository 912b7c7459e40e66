mod actions;
mod app;
mod text;
mod theme;
mod view;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use clap::ArgAction;
use clap::Parser;
use crossterm::event::Event;
use crossterm::event::EventStream;
use ratatui::DefaultTerminal;
use snav_candidate::DEFAULT_PATTERN;
use snav_candidate::ProducerConfig;
use snav_candidate::cache::load_index_cache;
use snav_candidate::start_producer;
use snav_highlight::HighlightMode;
use snav_highlight::Highlighter;
use snav_highlight::HighlighterConfig;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::app::App;
use crate::app::Config;

const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Interactive terminal symbol navigator: type a query, pick a result,
/// open the exact `file:line:col` in your editor.
#[derive(Debug, Parser)]
#[command(name = "snav", version)]
struct Cli {
    /// Search root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Ripgrep regex for candidate lines; overriding it skips the
    /// config-file second pass.
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pattern: String,

    /// Show the preview pane.
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    preview: bool,

    /// Highlight cache entries.
    #[arg(long = "cache-size", default_value_t = 20_000)]
    cache_size: usize,

    /// Highlight worker pool size.
    #[arg(long, default_value_t = default_workers())]
    workers: usize,

    /// Extra rows to pre-highlight above and below the visible window.
    #[arg(long = "visible-buffer", default_value_t = 30)]
    visible_buffer: usize,

    /// Query debounce in milliseconds.
    #[arg(long = "debounce-ms", default_value_t = 100)]
    debounce_ms: u64,

    /// Highlight mode: synthetic or file.
    #[arg(long = "highlight-context", default_value = "synthetic")]
    highlight_context: String,

    /// Line radius for file-context highlighting.
    #[arg(long = "context-radius", default_value_t = 40)]
    context_radius: usize,

    /// Override the open command; supports {file} {line} {col} {target}.
    #[arg(long = "editor-cmd", default_value = "")]
    editor_cmd: String,

    /// Glob to exclude from the scan; repeatable.
    #[arg(long = "exclude")]
    excludes: Vec<String>,

    /// Disable rg ignore files (.gitignore/.ignore/.rgignore).
    #[arg(long = "no-ignore")]
    no_ignore: bool,

    /// Exclude common test directories and test filename patterns.
    #[arg(long = "exclude-tests")]
    exclude_tests: bool,

    /// Color theme (nord, dracula, monokai, github, solarized-dark).
    #[arg(long, default_value = "nord")]
    theme: String,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|v| v.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let palette = theme::load_palette(&cli.theme).context("invalid --theme")?;
    let highlight_mode: HighlightMode = cli
        .highlight_context
        .parse()
        .context("invalid --highlight-context")?;

    let root = std::path::absolute(&cli.root)
        .with_context(|| format!("resolve root {:?}", cli.root))?;
    std::fs::metadata(&root).with_context(|| format!("unreadable root {root:?}"))?;

    let pattern = {
        let trimmed = cli.pattern.trim();
        if trimmed.is_empty() {
            DEFAULT_PATTERN.to_string()
        } else {
            trimmed.to_string()
        }
    };

    let cfg = Config {
        root: root.clone(),
        pattern,
        preview: cli.preview,
        cache_size: cli.cache_size,
        workers: cli.workers.max(1),
        debounce: Duration::from_millis(cli.debounce_ms),
        visible_buffer: cli.visible_buffer,
        highlight_mode,
        context_radius: cli.context_radius,
        editor_cmd: cli.editor_cmd,
        no_ignore: cli.no_ignore,
        exclude_tests: cli.exclude_tests,
    };

    let producer_cfg = ProducerConfig {
        root: root.to_string_lossy().into_owned(),
        pattern: cfg.pattern.clone(),
        excludes: cli.excludes,
        no_ignore: cfg.no_ignore,
        exclude_tests: cfg.exclude_tests,
    };

    // Warm-start from the last scan before the fresh one begins.
    let cached = load_index_cache(&producer_cfg);

    let cancel = CancellationToken::new();
    let (producer_rx, done_rx) = start_producer(producer_cfg.clone(), cancel.clone());

    let highlighter = Arc::new(Highlighter::new(HighlighterConfig {
        cache_size: cfg.cache_size,
        workers: cfg.workers,
        root: root.clone(),
        default_mode: cfg.highlight_mode,
        context_radius: cfg.context_radius,
    }));

    let mut app = App::new(
        cfg,
        palette,
        producer_cfg,
        Some(producer_rx),
        Some(done_rx),
        highlighter,
    );
    match cached {
        Ok(Some(candidates)) => {
            debug!(count = candidates.len(), "seeding from index cache");
            app.use_cached_index(candidates);
        }
        Ok(None) => {}
        Err(err) => app.status = format!("index cache unavailable: {err}"),
    }

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &mut app).await;
    ratatui::restore();
    cancel.cancel();
    result
}

async fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    let size = terminal.size()?;
    app.on_resize(size.width as usize, size.height as usize);

    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    while !app.should_quit {
        tokio::select! {
            _ = tick.tick() => {
                app.on_tick();
                terminal.draw(|frame| view::render(frame, app))?;
            }
            event = events.next() => {
                match event {
                    Some(Ok(Event::Key(key))) => app.on_key(key),
                    Some(Ok(Event::Resize(width, height))) => {
                        app.on_resize(width as usize, height as usize);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err).context("read terminal events"),
                    None => break,
                }
            }
        }
    }
    Ok(())
}

/// Route tracing to a file under the user cache directory so raw-mode
/// terminal output stays clean. Enabled only when `RUST_LOG` is set.
fn init_tracing() {
    let Ok(filter) = tracing_subscriber::EnvFilter::try_from_default_env() else {
        return;
    };
    let Some(dir) = dirs::cache_dir() else {
        return;
    };
    let dir = dir.join("snav");
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("snav.log"))
    else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_the_documented_surface() {
        let cli = Cli::parse_from(["snav"]);
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(cli.pattern, DEFAULT_PATTERN);
        assert!(cli.preview);
        assert_eq!(cli.cache_size, 20_000);
        assert_eq!(cli.visible_buffer, 30);
        assert_eq!(cli.debounce_ms, 100);
        assert_eq!(cli.highlight_context, "synthetic");
        assert_eq!(cli.context_radius, 40);
        assert_eq!(cli.theme, "nord");
        assert!(!cli.no_ignore);
        assert!(!cli.exclude_tests);
        assert!(cli.excludes.is_empty());
    }

    #[test]
    fn cli_parses_overrides() {
        let cli = Cli::parse_from([
            "snav",
            "--root",
            "/repo",
            "--preview",
            "false",
            "--highlight-context",
            "file",
            "--exclude",
            "vendor/**",
            "--exclude",
            "dist/**",
            "--exclude-tests",
            "--debounce-ms",
            "250",
        ]);
        assert_eq!(cli.root, PathBuf::from("/repo"));
        assert!(!cli.preview);
        assert_eq!(cli.highlight_context, "file");
        assert_eq!(cli.excludes, vec!["vendor/**", "dist/**"]);
        assert!(cli.exclude_tests);
        assert_eq!(cli.debounce_ms, 250);
    }

    #[test]
    fn invalid_highlight_context_fails_validation() {
        let cli = Cli::parse_from(["snav", "--highlight-context", "both"]);
        assert!(cli.highlight_context.parse::<HighlightMode>().is_err());
    }
}
