//! Size-bounded, count-bounded append-only log files.
//!
//! Layout inside `logs_dir` for `file_name = "x.txt"`, `max_file_count = 3`:
//!
//! ```text
//! x.txt.0    active file, receives every append
//! x.txt.1    previous file
//! x.txt.2    oldest file, deleted on the next rotation
//! x.txt.lck  advisory marker, present while a writer is open
//! ```
//!
//! Only one writer may own a given `logs_dir`/`file_name` pair at a time.
//! Two writers on the same pair race on renames and the result is undefined.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::error::{LogError, Result};
use crate::settings::LoggerSettings;

pub struct RotatingFile {
    settings: LoggerSettings,
    state: Mutex<State>,
}

struct State {
    /// `None` after a failed rotation; the next append reopens it.
    file: Option<File>,
    size: u64,
    closed: bool,
}

impl RotatingFile {
    /// Create the directory if needed and open `<file_name>.0` for appending.
    ///
    /// Existing content of the active file counts toward the size limit, and
    /// files left over from a larger `max_file_count` are removed.
    pub fn open(settings: LoggerSettings) -> Result<Self> {
        settings.validate()?;
        let dir = &settings.logs_dir;
        fs::create_dir_all(dir).map_err(|e| LogError::io("create log directory", dir, e))?;

        let lock = settings.lock_path();
        fs::write(&lock, std::process::id().to_string())
            .map_err(|e| LogError::io("create lock marker", &lock, e))?;

        prune_stale(&settings)?;

        let active = settings.file_path(0);
        let file = open_active(&active)?;
        let size = file
            .metadata()
            .map_err(|e| LogError::io("stat", &active, e))?
            .len();

        info!(
            path = %active.display(),
            size,
            max_file_size = settings.max_file_size,
            max_file_count = settings.max_file_count,
            "Opened rotating log file"
        );

        Ok(Self {
            settings,
            state: Mutex::new(State {
                file: Some(file),
                size,
                closed: false,
            }),
        })
    }

    pub fn settings(&self) -> &LoggerSettings {
        &self.settings
    }

    /// Append one fully formatted line, rotating first if it would overflow
    /// the active file. A line larger than the limit lands in a file of its own.
    pub fn append(&self, line: &str) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(LogError::WriterClosed);
        }

        let len = line.len() as u64;
        if self.needs_rotation(state.size, len) {
            self.rotate(&mut state)?;
        }

        let active = self.settings.file_path(0);
        if state.file.is_none() {
            let file = open_active(&active)?;
            state.size = file
                .metadata()
                .map_err(|e| LogError::io("stat", &active, e))?
                .len();
            state.file = Some(file);
        }

        let State { file, size, .. } = &mut *state;
        if let Some(file) = file.as_mut() {
            let (written, result) = write_counted(file, line.as_bytes());
            *size += written;
            result.map_err(|e| LogError::io("append to", &active, e))?;
        }
        Ok(())
    }

    /// Flush and release the active file. Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Ok(());
        }
        state.closed = true;

        let flushed = match state.file.take() {
            Some(mut file) => file
                .flush()
                .map_err(|e| LogError::io("flush", &self.settings.file_path(0), e)),
            None => Ok(()),
        };

        let lock = self.settings.lock_path();
        if let Err(e) = fs::remove_file(&lock) {
            warn!(path = %lock.display(), error = %e, "Failed to remove lock marker");
        }
        debug!(dir = %self.settings.logs_dir.display(), "Closed rotating log file");
        flushed
    }

    /// Run `f` with appends held off, e.g. to copy a consistent file set.
    pub fn paused<R>(&self, f: impl FnOnce(&LoggerSettings) -> R) -> R {
        let _state = self.lock();
        f(&self.settings)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Bytes currently held by the active file.
    pub fn active_size(&self) -> u64 {
        self.lock().size
    }

    fn needs_rotation(&self, current: u64, incoming: u64) -> bool {
        let limit = self.settings.max_file_size;
        limit > 0 && current > 0 && current + incoming > limit
    }

    fn rotate(&self, state: &mut State) -> Result<()> {
        // The handle must be released before renaming on some platforms.
        if let Some(mut file) = state.file.take() {
            let _ = file.flush();
        }
        state.size = 0;

        shift_files(&self.settings)?;

        let active = self.settings.file_path(0);
        state.file = Some(open_active(&active)?);
        debug!(path = %active.display(), "Rotated log files");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RotatingFile {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to close rotating log file");
        }
    }
}

/// Open for appending, recreating the directory if it vanished meanwhile.
fn open_active(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| LogError::io("create log directory", dir, e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LogError::io("open", path, e))
}

/// Drop the oldest file if the set is full and move every other one up a
/// suffix. Suffixes are contiguous from `.0`, so only the files that exist are
/// visited however large `max_file_count` is.
fn shift_files(settings: &LoggerSettings) -> Result<()> {
    let count = settings.max_file_count;
    let mut last = 0;
    while last + 1 < count && settings.file_path(last + 1).exists() {
        last += 1;
    }

    let end = if last + 1 == count {
        remove_if_exists(&settings.file_path(last))?;
        last
    } else {
        last + 1
    };

    for index in (0..end).rev() {
        let from = settings.file_path(index);
        if !from.exists() {
            continue;
        }
        let to = settings.file_path(index + 1);
        fs::rename(&from, &to).map_err(|e| LogError::io("rename", &from, e))?;
    }
    Ok(())
}

/// Write all of `buf` and flush, reporting how many bytes reached `out` even
/// when the write fails partway.
fn write_counted(out: &mut impl Write, mut buf: &[u8]) -> (u64, io::Result<()>) {
    let mut written = 0;
    while !buf.is_empty() {
        match out.write(buf) {
            Ok(0) => return (written, Err(io::ErrorKind::WriteZero.into())),
            Ok(n) => {
                written += n as u64;
                buf = &buf[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (written, Err(e)),
        }
    }
    (written, out.flush())
}

/// Remove `<file_name>.<n>` files whose suffix is outside the configured count.
fn prune_stale(settings: &LoggerSettings) -> Result<()> {
    let dir = &settings.logs_dir;
    let prefix = format!("{}.", settings.file_name);
    let entries = fs::read_dir(dir).map_err(|e| LogError::io("list", dir, e))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(index) = name
            .strip_prefix(&prefix)
            .and_then(|suffix| suffix.parse::<usize>().ok())
        else {
            continue;
        };
        if index >= settings.max_file_count {
            debug!(file = name, "Removing log file beyond maxFileCount");
            remove_if_exists(&entry.path())?;
        }
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LogError::io("remove", path, e)),
    }
}
