//! The dispatcher: severity filter, tag resolution and sink fan-out.

use std::borrow::Cow;
use std::error::Error;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::Local;
use tracing::{debug, warn};

use crate::bundle::bundle_logs;
use crate::caller::Caller;
use crate::error::{LogError, Result};
use crate::level::Severity;
use crate::rotating::RotatingFile;
use crate::settings::{LoggerConfig, LoggerSettings};
use crate::sink::{
    ConsoleSink, ErrorCallback, EventCallback, TracingConsole, call_guarded, error_trace,
};

/// Tag of the lines the logger writes about its own failures.
const SELF_TAG: &str = "logforge";

/// Per-call extras for [`Logger::log`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOptions<'a> {
    pub tag: Option<&'a str>,
    pub error: Option<&'a (dyn Error + 'static)>,
    /// Also hand the event to the external callbacks.
    pub report: bool,
    pub caller: Option<Caller>,
}

impl<'a> LogOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, tag: &'a str) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn error(mut self, error: &'a (dyn Error + 'static)) -> Self {
        self.error = Some(error);
        self
    }

    pub fn report(mut self) -> Self {
        self.report = true;
        self
    }

    pub fn caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }
}

/// Leveled logger fanning events out to console, rotating files and
/// crash-reporter callbacks.
///
/// Cloning or calling [`child`](Self::child) yields another handle onto the
/// same sinks, toggles and file writer. The writer is released when
/// [`destroy`](Self::destroy) is called or the last handle is dropped.
#[derive(Clone)]
pub struct Logger {
    core: Arc<Core>,
    default_tag: Option<Arc<str>>,
}

struct Core {
    file: Option<RotatingFile>,
    console: Box<dyn ConsoleSink>,
    level: AtomicU8,
    console_enabled: AtomicBool,
    file_enabled: AtomicBool,
    destroyed: AtomicBool,
    event_callback: RwLock<Option<EventCallback>>,
    error_callback: RwLock<Option<ErrorCallback>>,
    pid: u32,
}

impl Logger {
    /// Logger writing to the console and, when `settings` is given, to files.
    pub fn new(settings: Option<LoggerSettings>) -> Result<Self> {
        Self::with_console(settings, TracingConsole)
    }

    /// Like [`new`](Self::new) with a custom console sink.
    pub fn with_console(
        settings: Option<LoggerSettings>,
        console: impl ConsoleSink + 'static,
    ) -> Result<Self> {
        let file = settings.map(RotatingFile::open).transpose()?;
        Ok(Self::from_parts(file, Box::new(console)))
    }

    /// Console-only logger; the file sink can never be enabled.
    pub fn console_only() -> Self {
        Self::from_parts(None, Box::new(TracingConsole))
    }

    /// File logger with default settings in `logs_dir`.
    pub fn with_dir(logs_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(Some(LoggerSettings::new(logs_dir)))
    }

    pub fn from_config(config: &LoggerConfig) -> Result<Self> {
        let logger = Self::new(config.file.clone())?;
        logger.set_level(config.level);
        logger.set_console_enabled(config.console);
        Ok(logger)
    }

    fn from_parts(file: Option<RotatingFile>, console: Box<dyn ConsoleSink>) -> Self {
        let file_enabled = file.is_some();
        Self {
            core: Arc::new(Core {
                file,
                console,
                level: AtomicU8::new(Severity::Verbose.rank()),
                console_enabled: AtomicBool::new(true),
                file_enabled: AtomicBool::new(file_enabled),
                destroyed: AtomicBool::new(false),
                event_callback: RwLock::new(None),
                error_callback: RwLock::new(None),
                pid: std::process::id(),
            }),
            default_tag: None,
        }
    }

    /// A logger sharing this one's sinks and state, tagging untagged events
    /// with `tag` instead of the call site.
    pub fn child(&self, tag: impl Into<String>) -> Logger {
        Logger {
            core: Arc::clone(&self.core),
            default_tag: Some(Arc::from(tag.into())),
        }
    }

    pub fn default_tag(&self) -> Option<&str> {
        self.default_tag.as_deref()
    }

    // ----- configuration -------------------------------------------------

    pub fn level(&self) -> Severity {
        Severity::from_rank(self.core.level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Only events at `level` or above reach any sink.
    pub fn set_level(&self, level: Severity) {
        self.core.level.store(level.rank(), Ordering::Relaxed);
    }

    pub fn is_console_enabled(&self) -> bool {
        self.core.console_enabled.load(Ordering::Relaxed)
    }

    pub fn set_console_enabled(&self, enabled: bool) {
        self.core.console_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_file_enabled(&self) -> bool {
        self.core.file_enabled.load(Ordering::Relaxed)
    }

    /// Fails right away when no log directory was configured.
    pub fn set_file_enabled(&self, enabled: bool) -> Result<()> {
        if enabled && self.core.file.is_none() {
            return Err(LogError::file_sink_missing());
        }
        self.core.file_enabled.store(enabled, Ordering::Relaxed);
        Ok(())
    }

    pub fn set_event_callback(&self, callback: Option<EventCallback>) {
        *self
            .core
            .event_callback
            .write()
            .unwrap_or_else(|e| e.into_inner()) = callback;
    }

    pub fn set_error_callback(&self, callback: Option<ErrorCallback>) {
        *self
            .core
            .error_callback
            .write()
            .unwrap_or_else(|e| e.into_inner()) = callback;
    }

    pub fn settings(&self) -> Option<&LoggerSettings> {
        self.core.file.as_ref().map(RotatingFile::settings)
    }

    // ----- per-severity entry points --------------------------------------

    #[track_caller]
    pub fn v(&self, message: impl Display) {
        self.log(Severity::Verbose, message, LogOptions::new());
    }

    #[track_caller]
    pub fn d(&self, message: impl Display) {
        self.log(Severity::Debug, message, LogOptions::new());
    }

    #[track_caller]
    pub fn i(&self, message: impl Display) {
        self.log(Severity::Info, message, LogOptions::new());
    }

    #[track_caller]
    pub fn w(&self, message: impl Display) {
        self.log(Severity::Warn, message, LogOptions::new());
    }

    #[track_caller]
    pub fn e(&self, message: impl Display) {
        self.log(Severity::Error, message, LogOptions::new());
    }

    /// Error event with an attached error; its cause chain goes to the file.
    #[track_caller]
    pub fn e_with(&self, message: impl Display, error: &(dyn Error + 'static)) {
        self.log(Severity::Error, message, LogOptions::new().error(error));
    }

    #[track_caller]
    pub fn a(&self, message: impl Display) {
        self.log(Severity::Assert, message, LogOptions::new());
    }

    /// Log one event. Never fails: sink problems are contained per sink.
    #[track_caller]
    pub fn log(&self, severity: Severity, message: impl Display, options: LogOptions<'_>) {
        if !self.core.accepts(severity) {
            return;
        }
        let caller = match options.caller {
            Some(caller) => caller,
            None => Caller::here(),
        };
        let tag = self.resolve_tag(options.tag, caller);
        self.core.fan_out(severity, &tag, &message.to_string(), &options);
    }

    /// Run `f`, then log how long it took at WARN.
    #[track_caller]
    pub fn measure<R>(&self, label: &str, options: LogOptions<'_>, f: impl FnOnce() -> R) -> R {
        let started = Instant::now();
        let result = f();
        let elapsed = started.elapsed().as_millis();
        self.log(Severity::Warn, format_args!("{label}: {elapsed} msec"), options);
        result
    }

    fn resolve_tag<'t>(&'t self, explicit: Option<&'t str>, caller: Caller) -> Cow<'t, str> {
        match explicit.or(self.default_tag.as_deref()) {
            Some(tag) => Cow::Borrowed(tag),
            None => Cow::Owned(caller.tag()),
        }
    }

    // ----- lifecycle and export -------------------------------------------

    pub fn is_destroyed(&self) -> bool {
        self.core.destroyed.load(Ordering::Acquire)
    }

    /// Close the log files and turn every later call into a no-op.
    ///
    /// Applies to the shared state, so it also silences every child and
    /// clone. Calling it again does nothing.
    pub fn destroy(&self) {
        if self.core.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(file) = &self.core.file {
            if let Err(e) = file.close() {
                warn!(error = %e, "Failed to close log files on destroy");
            }
        }
        debug!("Logger destroyed");
    }

    /// Zip every log file (lock marker excluded) into `output`.
    ///
    /// Returns the number of archived files. Appends wait until the archive
    /// is written so no rotation happens mid-export.
    pub fn bundle(&self, output: &Path) -> Result<usize> {
        let file = self.core.file.as_ref().ok_or_else(LogError::file_sink_missing)?;
        file.paused(|settings| bundle_logs(&settings.logs_dir, output))
    }
}

impl Core {
    fn accepts(&self, severity: Severity) -> bool {
        !self.destroyed.load(Ordering::Acquire)
            && severity.rank() >= self.level.load(Ordering::Relaxed)
    }

    fn fan_out(&self, severity: Severity, tag: &str, message: &str, options: &LogOptions<'_>) {
        if self.console_enabled.load(Ordering::Relaxed) {
            call_guarded(|| {
                self.console.print(severity, tag, message);
                if let Some(error) = options.error {
                    self.console.print(severity, tag, &error.to_string());
                }
            });
        }

        if options.report {
            self.report(severity, tag, message, options.error);
        }

        if self.file_enabled.load(Ordering::Relaxed) {
            match self.write_file(severity, tag, message, options.error) {
                // destroy() ran while this event was in flight.
                Ok(()) | Err(LogError::WriterClosed) => {}
                Err(e) => self.file_failed(&e),
            }
        }
    }

    fn report(
        &self,
        severity: Severity,
        tag: &str,
        message: &str,
        error: Option<&(dyn Error + 'static)>,
    ) {
        let on_event = self.event_callback.read().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(on_event) = on_event {
            let line = format!("{}/{tag} {message}", severity.code());
            call_guarded(|| on_event(&line));
        }

        let Some(error) = error else { return };
        let on_error = self.error_callback.read().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(on_error) = on_error {
            call_guarded(|| on_error(error));
        }
    }

    fn write_file(
        &self,
        severity: Severity,
        tag: &str,
        message: &str,
        error: Option<&(dyn Error + 'static)>,
    ) -> Result<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let timestamp = file.settings().format_timestamp(&Local::now());
        let prefix = format!("{timestamp} {}/{tag} ({}): ", severity.code(), self.pid);

        // One append keeps the message and its trace together in one file.
        let mut lines = format!("{prefix}{message}\n");
        if let Some(error) = error {
            lines.push_str(&format!("{prefix}{}\n", error_trace(error)));
        }
        file.append(&lines)
    }

    /// A lost line must not take the host down; say so and carry on.
    fn file_failed(&self, error: &LogError) {
        warn!(target: "logforge", error = %error, "Dropped log line: file sink write failed");
        if self.console_enabled.load(Ordering::Relaxed) {
            let message = format!("failed to write log file: {error}");
            call_guarded(|| self.console.print(Severity::Error, SELF_TAG, &message));
        }
    }
}
