//! Embeddable leveled logger with rotating files and crash-reporter hooks.
//!
//! Each event passes a severity threshold, gets a tag (explicit, the child
//! logger's, or derived from the call site) and is fanned out to up to three
//! independent sinks: the console, a set of size-rotated files, and
//! crash-reporter callbacks. The files can be zipped for export at any time.
//!
//! ```no_run
//! use logforge::{Logger, LoggerSettings, LogOptions, Severity};
//!
//! let logger = Logger::new(Some(LoggerSettings::new("/tmp/app-logs").with_max_file_count(3)))?;
//! logger.set_level(Severity::Info);
//! logger.i("service started");
//! logger.log(Severity::Warn, "slow response", LogOptions::new().tag("Http").report());
//!
//! let net = logger.child("Net");
//! logforge::log_error!(net, "connect failed after {} tries", 3);
//!
//! logger.bundle(std::path::Path::new("/tmp/app-logs.zip"))?;
//! logger.destroy();
//! # Ok::<(), logforge::LogError>(())
//! ```

pub mod bundle;
pub mod caller;
pub mod error;
pub mod level;
pub mod logger;
mod macros;
pub mod rotating;
pub mod settings;
pub mod sink;

pub use bundle::bundle_logs;
pub use caller::{Caller, UNKNOWN_TAG};
pub use error::{LogError, Result};
pub use level::Severity;
pub use logger::{LogOptions, Logger};
pub use rotating::RotatingFile;
pub use settings::{LoggerConfig, LoggerSettings, load_config};
pub use sink::{
    ConsoleSink, ErrorCallback, EventCallback, StderrConsole, TracingConsole, error_trace,
};
