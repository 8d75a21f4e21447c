//! Call-site macros.
//!
//! The `log_*!` macros tag events with the enclosing module and function
//! (`[Client.connect]`), where the plain `Logger` methods only know the file
//! and line. An explicit `tag:` and an attached `err:` are optional:
//!
//! ```ignore
//! log_info!(logger, "connected to {}", addr);
//! log_warn!(logger, tag: "net", "retrying in {}s", backoff);
//! log_error!(logger, err: &e, "upload of {} failed", name);
//! ```

/// [`Caller`](crate::Caller) for the function this macro is expanded in.
#[macro_export]
macro_rules! caller {
    () => {{
        fn __logforge_here() {}
        fn __logforge_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let path = __logforge_name_of(__logforge_here);
        $crate::Caller::from_function_path(
            match path.strip_suffix("::__logforge_here") {
                Some(outer) => outer,
                None => path,
            },
        )
    }};
}

/// Log at an explicit [`Severity`](crate::Severity).
#[macro_export]
macro_rules! log_at {
    ($logger:expr, $severity:expr, tag: $tag:expr, err: $err:expr, $($arg:tt)+) => {
        $logger.log(
            $severity,
            ::std::format_args!($($arg)+),
            $crate::LogOptions::new().caller($crate::caller!()).tag($tag).error($err),
        )
    };
    ($logger:expr, $severity:expr, tag: $tag:expr, $($arg:tt)+) => {
        $logger.log(
            $severity,
            ::std::format_args!($($arg)+),
            $crate::LogOptions::new().caller($crate::caller!()).tag($tag),
        )
    };
    ($logger:expr, $severity:expr, err: $err:expr, $($arg:tt)+) => {
        $logger.log(
            $severity,
            ::std::format_args!($($arg)+),
            $crate::LogOptions::new().caller($crate::caller!()).error($err),
        )
    };
    ($logger:expr, $severity:expr, $($arg:tt)+) => {
        $logger.log(
            $severity,
            ::std::format_args!($($arg)+),
            $crate::LogOptions::new().caller($crate::caller!()),
        )
    };
}

#[macro_export]
macro_rules! log_verbose {
    ($logger:expr, $($rest:tt)+) => { $crate::log_at!($logger, $crate::Severity::Verbose, $($rest)+) };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($rest:tt)+) => { $crate::log_at!($logger, $crate::Severity::Debug, $($rest)+) };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($rest:tt)+) => { $crate::log_at!($logger, $crate::Severity::Info, $($rest)+) };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($rest:tt)+) => { $crate::log_at!($logger, $crate::Severity::Warn, $($rest)+) };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($rest:tt)+) => { $crate::log_at!($logger, $crate::Severity::Error, $($rest)+) };
}

#[macro_export]
macro_rules! log_assert {
    ($logger:expr, $($rest:tt)+) => { $crate::log_at!($logger, $crate::Severity::Assert, $($rest)+) };
}
