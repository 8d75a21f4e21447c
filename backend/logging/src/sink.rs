//! Console sink and external callback hooks.

use std::error::Error;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::level::Severity;

/// The platform "print a line" primitive.
///
/// Implementations must not fail from the logger's point of view; any
/// problem writing the line is theirs to swallow.
pub trait ConsoleSink: Send + Sync {
    fn print(&self, severity: Severity, tag: &str, message: &str);
}

/// Forwards console lines to the `tracing` subscriber of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn print(&self, severity: Severity, tag: &str, message: &str) {
        match severity {
            Severity::Verbose => tracing::trace!(target: "logforge::console", tag, "{message}"),
            Severity::Debug => tracing::debug!(target: "logforge::console", tag, "{message}"),
            Severity::Info => tracing::info!(target: "logforge::console", tag, "{message}"),
            Severity::Warn => tracing::warn!(target: "logforge::console", tag, "{message}"),
            Severity::Error | Severity::Assert => {
                tracing::error!(target: "logforge::console", tag, code = %severity.code(), "{message}")
            }
        }
    }
}

/// Writes `<code>/<tag>: <message>` lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrConsole;

impl ConsoleSink for StderrConsole {
    fn print(&self, severity: Severity, tag: &str, message: &str) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}/{tag}: {message}", severity.code());
    }
}

/// Receives `"<code>/<tag> <message>"` for breadcrumb-style crash reporting.
pub type EventCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Receives errors attached to reported events (non-fatal error reporting).
pub type ErrorCallback = Arc<dyn Fn(&(dyn Error + 'static)) + Send + Sync>;

/// Run a user callback, discarding any panic it raises.
pub(crate) fn call_guarded(f: impl FnOnce()) {
    let _ = panic::catch_unwind(AssertUnwindSafe(f));
}

/// `Display` of the error followed by its `source()` chain.
pub fn error_trace(error: &(dyn Error + 'static)) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    if source.is_some() {
        out.push_str("\nCaused by:");
    }
    let mut depth = 0;
    while let Some(cause) = source {
        out.push_str(&format!("\n    {depth}: {cause}"));
        depth += 1;
        source = cause.source();
    }
    out
}
