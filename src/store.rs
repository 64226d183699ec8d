use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::backoff::{BackoffPolicy, Sleeper};
use crate::config::OutputConfig;
use crate::results::ProductRecord;
use crate::state::ScrapeState;

const RUN_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const RUN_STAMP_LEN: usize = 15;

/// Errors raised while reading or writing persisted output
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("{path} does not hold a product list: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write {path} ({source}); state saved to {fallback:?}")]
    WriteFailed {
        path: PathBuf,
        fallback: Option<PathBuf>,
        source: io::Error,
    },
}

/// Loads prior output for resume and writes the accumulated records back
#[derive(Debug, Clone)]
pub struct Store {
    output: PathBuf,
    raw_output: Option<PathBuf>,
    /// Directory and file prefix of earlier timestamped runs
    timestamped_prefix: Option<(PathBuf, String, String)>,
    resume: bool,
    write_policy: BackoffPolicy,
}

impl Store {
    /// Create a store for a run that started at `started`
    pub fn new(config: &OutputConfig, started: DateTime<Local>) -> Self {
        let stamp = started.format(RUN_STAMP_FORMAT).to_string();
        let (output, raw_output, timestamped_prefix) = if config.timestamped {
            (
                stamped_path(&config.path, &stamp),
                config.raw_path.as_deref().map(|p| stamped_path(p, &stamp)),
                Some(prefix_of(&config.path)),
            )
        } else {
            (config.path.clone(), config.raw_path.clone(), None)
        };

        Self {
            output,
            raw_output,
            timestamped_prefix,
            resume: config.resume,
            write_policy: BackoffPolicy::new(config.write_attempts.max(1), 200, 2000),
        }
    }

    /// Path the accumulated records are written to
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn raw_output_path(&self) -> Option<&Path> {
        self.raw_output.as_deref()
    }

    /// Load prior output; a missing file yields an empty state
    pub fn load(&self) -> Result<ScrapeState, PersistenceError> {
        if !self.resume {
            return Ok(ScrapeState::default());
        }

        let paths = match &self.timestamped_prefix {
            Some((dir, stem, ext)) => previous_runs(dir, stem, ext)?,
            None if self.output.exists() => vec![self.output.clone()],
            None => Vec::new(),
        };

        let mut records = Vec::new();
        for path in &paths {
            records.extend(read_records(path)?);
        }

        let state = ScrapeState::from_records(records);
        if !paths.is_empty() {
            ::log::info!(
                "Loaded {} existing products from {} file(s)",
                state.len(),
                paths.len()
            );
        }
        Ok(state)
    }

    /// Write the full accumulated record set, and the raw capture when configured
    pub async fn save(
        &self,
        state: &ScrapeState,
        sleeper: &dyn Sleeper,
    ) -> Result<PathBuf, PersistenceError> {
        let contents = to_pretty_json(&state.accumulated)?;
        self.write_with_retry(&self.output, &contents, sleeper).await?;
        ::log::info!("Saved {} products to {}", state.len(), self.output.display());

        if let Some(raw_path) = &self.raw_output {
            let raw = to_pretty_json(&state.raw)?;
            self.write_with_retry(raw_path, &raw, sleeper).await?;
            ::log::info!("Saved {} raw entries to {}", state.raw.len(), raw_path.display());
        }

        Ok(self.output.clone())
    }

    async fn write_with_retry(
        &self,
        path: &Path,
        contents: &str,
        sleeper: &dyn Sleeper,
    ) -> Result<(), PersistenceError> {
        let mut attempt = 0;
        let error = loop {
            match write_atomic(path, contents) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    ::log::warn!(
                        "Write to {} failed (attempt {}/{}): {}",
                        path.display(),
                        attempt,
                        self.write_policy.max_attempts(),
                        e
                    );
                    if self.write_policy.exhausted(attempt) {
                        break e;
                    }
                    sleeper.sleep(self.write_policy.delay(attempt - 1)).await;
                }
            }
        };

        let fallback = fallback_path(path);
        let fallback = match write_atomic(&fallback, contents) {
            Ok(()) => {
                ::log::error!("Wrote fallback copy to {}", fallback.display());
                Some(fallback)
            }
            Err(e) => {
                ::log::error!("Fallback write to {} failed: {}", fallback.display(), e);
                None
            }
        };

        Err(PersistenceError::WriteFailed {
            path: path.to_path_buf(),
            fallback,
            source: error,
        })
    }
}

/// Pretty-printed JSON with a trailing newline
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, PersistenceError> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

fn read_records(path: &Path) -> Result<Vec<ProductRecord>, PersistenceError> {
    let text = fs::read_to_string(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| PersistenceError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Replaces `path` by writing a sibling temp file and renaming it over
fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

fn fallback_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("catalog-crawl-output.json"));
    std::env::temp_dir().join(name)
}

/// `dir/name.json` becomes `dir/name_<stamp>.json`
fn stamped_path(path: &Path, stamp: &str) -> PathBuf {
    let (dir, stem, ext) = prefix_of(path);
    dir.join(format!("{}_{}.{}", stem, stamp, ext))
}

fn prefix_of(path: &Path) -> (PathBuf, String, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "products".to_string());
    let ext = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "json".to_string());
    (dir, stem, ext)
}

/// Exactly `YYYYmmdd_HHMMSS`, as written by `stamped_path`
fn is_run_stamp(text: &str) -> bool {
    text.len() == RUN_STAMP_LEN && NaiveDateTime::parse_from_str(text, RUN_STAMP_FORMAT).is_ok()
}

/// Files written by earlier timestamped runs, oldest first
fn previous_runs(dir: &Path, stem: &str, ext: &str) -> Result<Vec<PathBuf>, PersistenceError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let io_err = |source| PersistenceError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let prefix = format!("{}_", stem);
    let suffix = format!(".{}", ext);
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stamp) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(&suffix))
        else {
            continue;
        };
        if path.is_file() && is_run_stamp(stamp) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
