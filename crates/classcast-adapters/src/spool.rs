//! Filesystem spool: the polling driver's view of its directories.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

/// Extensions the poller picks up; everything else stays untouched.
const IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "ppm", "bmp", "pgm", "tif", "tiff", "webp"];

/// Per-file working state while an input sits in the spool.
#[derive(Debug, Clone, Copy)]
pub struct PendingFile {
    /// Size observed on the previous scan. A file is only handed out once
    /// its size stops changing between scans, so writers that are still
    /// copying get left alone.
    pub last_size: u64,
    /// Failed processing attempts so far.
    pub failures: u32,
}

/// Manages the polling driver's directories: scans the input directory with
/// a size-stability check, stages result files through an optional tmp
/// directory, and moves inputs out on success, deletion, or quarantine.
pub struct FsSpool {
    input_dir: PathBuf,
    output_dir: PathBuf,
    tmp_dir: Option<PathBuf>,
    quarantine_dir: PathBuf,
    pending: HashMap<PathBuf, PendingFile>,
}

impl FsSpool {
    /// Creates a spool over the given directories.
    ///
    /// The output and tmp directories are created eagerly so a broken
    /// deployment fails at startup. The quarantine directory (default
    /// `<input>/failed`) is only created once something actually fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the input directory does not exist or the
    /// output/tmp directories cannot be created.
    pub fn new(
        input_dir: PathBuf,
        output_dir: PathBuf,
        tmp_dir: Option<PathBuf>,
        quarantine_dir: Option<PathBuf>,
    ) -> Result<Self> {
        if !input_dir.is_dir() {
            bail!("input directory does not exist: {}", input_dir.display());
        }
        fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create output directory: {}", output_dir.display())
        })?;
        if let Some(tmp) = &tmp_dir {
            fs::create_dir_all(tmp)
                .with_context(|| format!("Failed to create tmp directory: {}", tmp.display()))?;
        }
        let quarantine_dir = quarantine_dir.unwrap_or_else(|| input_dir.join("failed"));

        Ok(Self {
            input_dir,
            output_dir,
            tmp_dir,
            quarantine_dir,
            pending: HashMap::new(),
        })
    }

    /// Scans the input directory and returns the files that are ready: a
    /// supported extension and a size unchanged since the previous scan.
    ///
    /// First sightings and still-growing files are recorded and deferred to
    /// a later scan. State for files that vanished is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the input directory cannot be read.
    pub fn scan(&mut self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.input_dir).with_context(|| {
            format!("Failed to read input directory: {}", self.input_dir.display())
        })?;

        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut ready = Vec::new();

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || !is_supported_image(&path) {
                continue;
            }
            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warn!("Failed to stat {}: {e}", path.display());
                    continue;
                }
            };

            seen.insert(path.clone());
            match self.pending.get_mut(&path) {
                Some(state) if state.last_size == size => ready.push(path),
                Some(state) => {
                    debug!(
                        "{} still growing ({} -> {size} bytes)",
                        path.display(),
                        state.last_size
                    );
                    state.last_size = size;
                }
                None => {
                    debug!("{} first seen ({size} bytes)", path.display());
                    self.pending.insert(
                        path,
                        PendingFile {
                            last_size: size,
                            failures: 0,
                        },
                    );
                }
            }
        }

        self.pending.retain(|path, _| seen.contains(path));
        ready.sort();
        Ok(ready)
    }

    /// Writes the result JSON for `input` into the output directory, named
    /// after the input's stem with a `.json` extension. With a tmp
    /// directory configured, the file is staged there and renamed into
    /// place, so consumers of the output directory never observe a partial
    /// result.
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be written or moved.
    pub fn write_result(&self, input: &Path, json: &str) -> Result<PathBuf> {
        let stem = input
            .file_stem()
            .with_context(|| format!("input has no file stem: {}", input.display()))?
            .to_string_lossy();
        let file_name = format!("{stem}.json");
        let final_path = self.output_dir.join(&file_name);

        let mut payload = json.to_owned();
        payload.push('\n');

        if let Some(tmp) = &self.tmp_dir {
            let staged = tmp.join(&file_name);
            fs::write(&staged, &payload)
                .with_context(|| format!("Failed to stage result: {}", staged.display()))?;
            fs::rename(&staged, &final_path).with_context(|| {
                format!("Failed to move result into place: {}", final_path.display())
            })?;
        } else {
            fs::write(&final_path, &payload)
                .with_context(|| format!("Failed to write result: {}", final_path.display()))?;
        }

        Ok(final_path)
    }

    /// Retires a processed input: deletes it, or moves it into the output
    /// directory when deletion was not requested. The pending entry is only
    /// cleared once the file has left the input directory, so a failed
    /// retire keeps its size and failure bookkeeping intact.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be deleted or moved.
    pub fn retire(&mut self, input: &Path, delete: bool) -> Result<()> {
        if delete {
            fs::remove_file(input)
                .with_context(|| format!("Failed to delete input: {}", input.display()))?;
        } else {
            let target = self.output_dir.join(file_name(input)?);
            fs::rename(input, &target)
                .with_context(|| format!("Failed to move input to {}", target.display()))?;
        }
        self.pending.remove(input);
        Ok(())
    }

    /// Bumps the failure counter for an input and returns the new count.
    pub fn record_failure(&mut self, input: &Path) -> u32 {
        let state = self
            .pending
            .entry(input.to_path_buf())
            .or_insert(PendingFile {
                last_size: 0,
                failures: 0,
            });
        state.failures += 1;
        state.failures
    }

    /// Moves an input into the quarantine directory. The pending entry is
    /// only cleared once the move succeeds, so the failure count keeps
    /// climbing across failed quarantine attempts.
    ///
    /// # Errors
    ///
    /// Returns an error if the quarantine directory cannot be created or
    /// the input cannot be moved.
    pub fn quarantine(&mut self, input: &Path) -> Result<PathBuf> {
        fs::create_dir_all(&self.quarantine_dir).with_context(|| {
            format!(
                "Failed to create quarantine directory: {}",
                self.quarantine_dir.display()
            )
        })?;
        let target = self.quarantine_dir.join(file_name(input)?);
        fs::rename(input, &target)
            .with_context(|| format!("Failed to quarantine input: {}", target.display()))?;
        self.pending.remove(input);
        Ok(target)
    }

    /// True while any file is deferred or mid-retry.
    #[must_use]
    pub fn has_work(&self) -> bool {
        !self.pending.is_empty()
    }

    #[must_use]
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

fn file_name(path: &Path) -> Result<&std::ffi::OsStr> {
    path.file_name()
        .with_context(|| format!("path has no file name: {}", path.display()))
}

/// Checks if a path has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}
