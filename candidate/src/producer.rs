use std::collections::HashSet;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::key::extract_key;
use crate::semantic::compute_semantic_score;
use crate::types::CONFIG_INCLUDE_GLOBS;
use crate::types::Candidate;
use crate::types::DEFAULT_CONFIG_PATTERN;
use crate::types::DEFAULT_PATTERN;
use crate::types::ProducerConfig;
use crate::types::TEST_EXCLUDE_GLOBS;

const CANDIDATE_CHANNEL_CAPACITY: usize = 4096;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("start rg: {0}")]
    Spawn(std::io::Error),
    #[error("read rg output: {0}")]
    Read(std::io::Error),
    #[error("rg failed: {0}")]
    Grep(String),
    #[error("scan cancelled")]
    Cancelled,
}

/// Spawn the line-grep scan on its own task.
///
/// Candidates arrive on a bounded channel in emission order; the done
/// channel fires exactly once when the scan finishes. Exit code 1 from the
/// grep (no matches) is success. Cancelling the token kills the child and
/// stops production at the next record boundary.
pub fn start_producer(
    cfg: ProducerConfig,
    cancel: CancellationToken,
) -> (
    mpsc::Receiver<Candidate>,
    oneshot::Receiver<Result<(), ScanError>>,
) {
    let (out_tx, out_rx) = mpsc::channel(CANDIDATE_CHANNEL_CAPACITY);
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(async move {
        let result = run_scan(&cfg, &out_tx, &cancel).await;
        let _ = done_tx.send(result);
    });

    (out_rx, done_rx)
}

async fn run_scan(
    cfg: &ProducerConfig,
    out: &mpsc::Sender<Candidate>,
    cancel: &CancellationToken,
) -> Result<(), ScanError> {
    let pattern = {
        let trimmed = cfg.pattern.trim();
        if trimmed.is_empty() {
            DEFAULT_PATTERN
        } else {
            trimmed
        }
    };

    let mut assembler = RecordAssembler::default();
    run_grep_pass(cfg, &rg_args(cfg, pattern), out, cancel, &mut assembler).await?;

    // Config files only get a second look when the caller kept the default
    // declaration pattern; a custom pattern opts out.
    if pattern == DEFAULT_PATTERN {
        let args = rg_config_args(cfg);
        run_grep_pass(cfg, &args, out, cancel, &mut assembler).await?;
    }

    debug!(candidates = assembler.next_id, "scan complete");
    Ok(())
}

async fn run_grep_pass(
    cfg: &ProducerConfig,
    args: &[String],
    out: &mpsc::Sender<Candidate>,
    cancel: &CancellationToken,
    assembler: &mut RecordAssembler,
) -> Result<(), ScanError> {
    let mut child = Command::new("rg")
        .args(args)
        .current_dir(&cfg.root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(ScanError::Spawn)?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let mut stderr = child.stderr.take().expect("stderr was piped");
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf).await;
        buf
    });

    let mut segments = tokio::io::BufReader::new(stdout).split(b'\n');
    loop {
        let segment = tokio::select! {
            segment = segments.next_segment() => segment.map_err(ScanError::Read)?,
            _ = cancel.cancelled() => {
                let _ = child.start_kill();
                return Err(ScanError::Cancelled);
            }
        };
        let Some(raw) = segment else {
            break;
        };

        let Some(cand) = assembler.accept(&raw) else {
            continue;
        };
        tokio::select! {
            sent = out.send(cand) => {
                if sent.is_err() {
                    // Receiver is gone; treat like cancellation.
                    let _ = child.start_kill();
                    return Err(ScanError::Cancelled);
                }
            }
            _ = cancel.cancelled() => {
                let _ = child.start_kill();
                return Err(ScanError::Cancelled);
            }
        }
    }

    let status = child.wait().await.map_err(ScanError::Read)?;
    if !status.success() && status.code() != Some(1) {
        let stderr = stderr_task.await.unwrap_or_default();
        let message = String::from_utf8_lossy(&stderr).trim().to_string();
        if message.is_empty() {
            return Err(ScanError::Grep(format!("exit status {status}")));
        }
        return Err(ScanError::Grep(message));
    }

    Ok(())
}

fn rg_args(cfg: &ProducerConfig, pattern: &str) -> Vec<String> {
    let mut args = base_rg_args(cfg);
    args.push(pattern.to_string());
    args.push(".".to_string());
    args
}

fn rg_config_args(cfg: &ProducerConfig) -> Vec<String> {
    let mut args = base_rg_args(cfg);
    for glob in CONFIG_INCLUDE_GLOBS {
        args.push("--glob".to_string());
        args.push((*glob).to_string());
    }
    args.push(DEFAULT_CONFIG_PATTERN.to_string());
    args.push(".".to_string());
    args
}

fn base_rg_args(cfg: &ProducerConfig) -> Vec<String> {
    let mut args: Vec<String> = [
        "--vimgrep",
        "--null",
        "--trim",
        "--color",
        "never",
        "--no-heading",
        "--smart-case",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect();

    if cfg.no_ignore {
        args.push("--no-ignore".to_string());
    }
    for glob in &cfg.excludes {
        args.push("--glob".to_string());
        args.push(format!("!{glob}"));
    }
    if cfg.exclude_tests {
        for glob in TEST_EXCLUDE_GLOBS {
            args.push("--glob".to_string());
            args.push(format!("!{glob}"));
        }
    }

    args
}

/// Turns raw grep records into deduplicated candidates. Ids are dense and
/// assigned after dedupe so they stay stable for a given scan.
#[derive(Default)]
struct RecordAssembler {
    seen: HashSet<(String, u32, u32)>,
    next_id: u32,
}

impl RecordAssembler {
    fn accept(&mut self, raw: &[u8]) -> Option<Candidate> {
        let record = parse_vimgrep_record(raw)?;
        let file = clean_path(record.file);
        let dedupe_key = (file.clone(), record.line, record.col);
        if !self.seen.insert(dedupe_key) {
            return None;
        }

        self.next_id += 1;
        let key = extract_key(record.text, record.file);
        Some(Candidate {
            id: self.next_id,
            line: record.line,
            col: record.col,
            text: record.text.to_string(),
            key,
            lang: snav_lang::detect(&file),
            semantic_score: compute_semantic_score(record.text),
            file,
        })
    }
}

struct RawRecord<'a> {
    file: &'a str,
    line: u32,
    col: u32,
    text: &'a str,
}

/// Parse one `path NUL line:col:text` record. The NUL keeps colons in the
/// path unambiguous; a trailing CR is stripped from the text.
fn parse_vimgrep_record(raw: &[u8]) -> Option<RawRecord<'_>> {
    let nul = raw.iter().position(|&b| b == 0)?;
    if nul == 0 || nul >= raw.len() - 1 {
        return None;
    }

    let file = std::str::from_utf8(&raw[..nul]).ok()?;
    let rest = &raw[nul + 1..];

    let (line, rest) = parse_positive_int_field(rest)?;
    let (col, rest) = parse_positive_int_field(rest)?;

    let text = std::str::from_utf8(rest).ok()?;
    let text = text.strip_suffix('\r').unwrap_or(text);
    Some(RawRecord {
        file,
        line,
        col,
        text,
    })
}

fn parse_positive_int_field(raw: &[u8]) -> Option<(u32, &[u8])> {
    let sep = raw.iter().position(|&b| b == b':')?;
    if sep == 0 {
        return None;
    }

    let mut value: u32 = 0;
    for &b in &raw[..sep] {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
    }
    if value == 0 {
        return None;
    }

    Some((value, &raw[sep + 1..]))
}

/// Lexically normalize a relative path the way the grep reports them:
/// drop `.` components and collapse separators.
fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(parts.last(), Some(&"..")) || parts.is_empty() {
                    parts.push("..");
                } else {
                    parts.pop();
                }
            }
            Component::Normal(part) => parts.push(part.to_str().unwrap_or_default()),
            Component::RootDir | Component::Prefix(_) => {
                // Absolute paths pass through untouched.
                return PathBuf::from(path).to_string_lossy().into_owned();
            }
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}
