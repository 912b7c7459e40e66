use std::fs;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::types::Candidate;
use crate::types::ProducerConfig;

const INDEX_CACHE_VERSION: u32 = 1;

/// The one persisted record: the last scan's candidates plus the full
/// configuration that produced them.
#[derive(Serialize, Deserialize)]
struct DiskIndexCache {
    version: u32,
    root: String,
    pattern: String,
    no_ignore: bool,
    exclude_tests: bool,
    excludes: Vec<String>,
    candidates: Vec<Candidate>,
}

/// Load the cached candidate set if it was produced by an identical
/// configuration. Version skew and config mismatch are misses, not errors.
pub fn load_index_cache(cfg: &ProducerConfig) -> Result<Option<Vec<Candidate>>> {
    load_index_cache_from(&index_cache_path()?, cfg)
}

pub fn save_index_cache(cfg: &ProducerConfig, candidates: &[Candidate]) -> Result<()> {
    save_index_cache_to(&index_cache_path()?, cfg, candidates)
}

fn load_index_cache_from(path: &Path, cfg: &ProducerConfig) -> Result<Option<Vec<Candidate>>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("read index cache {path:?}")),
    };

    let disk: DiskIndexCache = match bincode::deserialize(&data) {
        Ok(disk) => disk,
        Err(err) => {
            warn!("index cache at {path:?} is unreadable ({err}); ignoring it");
            return Ok(None);
        }
    };

    if !cache_matches(&disk, cfg) {
        return Ok(None);
    }
    Ok(Some(disk.candidates))
}

fn save_index_cache_to(path: &Path, cfg: &ProducerConfig, candidates: &[Candidate]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create cache dir {parent:?}"))?;
    }

    let disk = DiskIndexCache {
        version: INDEX_CACHE_VERSION,
        root: clean_root(&cfg.root),
        pattern: cfg.pattern.clone(),
        no_ignore: cfg.no_ignore,
        exclude_tests: cfg.exclude_tests,
        excludes: cfg.excludes.clone(),
        candidates: candidates.to_vec(),
    };
    let data = bincode::serialize(&disk).context("encode index cache")?;

    let tmp_path = path.with_extension("bin.tmp");
    {
        let mut file =
            fs::File::create(&tmp_path).with_context(|| format!("create {tmp_path:?}"))?;
        file.write_all(&data)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path).with_context(|| format!("replace index cache {path:?}"))?;
    Ok(())
}

fn cache_matches(disk: &DiskIndexCache, cfg: &ProducerConfig) -> bool {
    disk.version == INDEX_CACHE_VERSION
        && disk.root == clean_root(&cfg.root)
        && disk.pattern == cfg.pattern
        && disk.no_ignore == cfg.no_ignore
        && disk.exclude_tests == cfg.exclude_tests
        && disk.excludes == cfg.excludes
}

fn index_cache_path() -> Result<PathBuf> {
    let dir = dirs::cache_dir().context("user cache directory is unavailable")?;
    Ok(dir.join("snav").join("last_index.bin"))
}

/// Lexical cleanup so `/repo/project/` and `/repo/project` key identically.
fn clean_root(root: &str) -> String {
    let path = Path::new(root);
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        ".".to_string()
    } else {
        out.to_string_lossy().into_owned()
    }
}
