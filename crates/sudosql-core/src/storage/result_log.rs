use crate::errors::{Error, Result, StorageContext};
use crate::model::{RunResult, SaveMode};
use chrono::{DateTime, Local};
use regex::Regex;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

/// Replaces anything outside `[A-Za-z0-9._-]` (e.g. the `/` in
/// `Qwen/Qwen2.5-7B`) so the model name is a single path component.
pub fn normalize_model_name(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static regex"));
    re.replace_all(name, "_").into_owned()
}

/// `<save_path>/<dataset>_<split>_<model>.jsonl` in resume mode; overwrite mode
/// appends the run's start time so every run gets its own file.
pub fn output_path(
    save_path: &Path,
    dataset_name: &str,
    split: &str,
    model_name: &str,
    mode: SaveMode,
    started_at: DateTime<Local>,
) -> PathBuf {
    let model = normalize_model_name(model_name);
    let file_name = match mode {
        SaveMode::Resume => format!("{}_{}_{}.jsonl", dataset_name, split, model),
        SaveMode::Overwrite => format!(
            "{}_{}_{}_{}.jsonl",
            dataset_name,
            split,
            model,
            started_at.format("%Y%m%d-%H%M%S-%3f")
        ),
    };
    save_path.join(file_name)
}

/// Append-only JSON Lines log of run results. One complete, flushed line per
/// record; existing lines are never rewritten.
pub struct ResultLog {
    path: PathBuf,
    file: File,
}

impl ResultLog {
    /// Opens the log for appending. Resume mode keeps what is there.
    ///
    /// Overwrite mode always starts from an empty file that no other run of
    /// this process is writing: a stale file at `path` left by an earlier
    /// process is removed, while a path already claimed here gets the next
    /// free `-N` suffix. [`path`](Self::path) reports the file actually used.
    pub fn prepare(path: impl Into<PathBuf>, mode: SaveMode) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).at_path(parent)?;
            }
        }

        let (path, mut file) = match mode {
            SaveMode::Overwrite => open_fresh(path)?,
            SaveMode::Resume => {
                let file = OpenOptions::new()
                    .create(true)
                    .read(true)
                    .append(true)
                    .open(&path)
                    .at_path(&path)?;
                (path, file)
            }
        };

        // A crash mid-write can leave a torn last line; terminate it so the
        // next append starts on a fresh line.
        if ends_without_newline(&mut file).at_path(&path)? {
            tracing::warn!(
                event = "result_log.torn_tail",
                path = %path.display(),
                "last line of the result log is incomplete; it will be ignored"
            );
            file.write_all(b"\n").at_path(&path)?;
            file.sync_data().at_path(&path)?;
        }

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Questions already recorded. Lines that are not JSON objects with a
    /// string `question` are logged and skipped.
    pub fn load_completed(&self) -> Result<HashSet<String>> {
        let reader = BufReader::new(File::open(&self.path).at_path(&self.path)?);
        let mut done = HashSet::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line.at_path(&self.path)?;
            if line.trim().is_empty() {
                continue;
            }
            let question = serde_json::from_str::<serde_json::Value>(&line)
                .ok()
                .and_then(|v| v.get("question").and_then(|q| q.as_str()).map(String::from));
            match question {
                Some(q) => {
                    done.insert(q);
                }
                None => tracing::warn!(
                    event = "result_log.malformed_line",
                    path = %self.path.display(),
                    line_no = i + 1,
                    line = %line,
                    "could not parse line in results file; skipping"
                ),
            }
        }
        Ok(done)
    }

    pub fn append(&mut self, row: &RunResult) -> Result<()> {
        let mut line = serde_json::to_string(row)?;
        line.push('\n');
        self.file.write_all(line.as_bytes()).at_path(&self.path)?;
        self.file.flush().at_path(&self.path)?;
        self.file.sync_data().at_path(&self.path)?;
        Ok(())
    }
}

const MAX_SUFFIX: usize = 10_000;

/// Overwrite-mode logs opened by this process.
fn claimed_paths() -> &'static Mutex<HashSet<PathBuf>> {
    static CLAIMED: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    CLAIMED.get_or_init(|| Mutex::new(HashSet::new()))
}

fn open_fresh(path: PathBuf) -> Result<(PathBuf, File)> {
    let mut claimed = claimed_paths()
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    for n in 0..MAX_SUFFIX {
        let candidate = if n == 0 {
            path.clone()
        } else {
            with_suffix(&path, n)
        };
        if claimed.contains(&candidate) {
            continue;
        }
        if n == 0 && candidate.exists() {
            tracing::info!(event = "result_log.removed", path = %candidate.display());
            std::fs::remove_file(&candidate).at_path(&candidate)?;
        }

        match OpenOptions::new()
            .create_new(true)
            .read(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => {
                if n > 0 {
                    tracing::info!(
                        event = "result_log.renamed",
                        requested = %path.display(),
                        path = %candidate.display(),
                        "output path already in use by this process; writing to a suffixed file"
                    );
                }
                claimed.insert(candidate.clone());
                return Ok((candidate, file));
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(Error::storage(&candidate, e)),
        }
    }

    Err(Error::storage(
        &path,
        std::io::Error::new(ErrorKind::AlreadyExists, "no free overwrite-mode file name"),
    ))
}

/// `run.jsonl` -> `run-<n>.jsonl`
fn with_suffix(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}-{}", stem, n),
    };
    path.with_file_name(name)
}

fn ends_without_newline(file: &mut File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
