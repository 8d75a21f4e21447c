//! Severity levels and threshold filtering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LogError;

/// How important a log event is.
///
/// Ranks follow the Android `Log` priority constants, so a threshold of
/// `Warn` lets `Warn`, `Error` and `Assert` through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Full visibility into what the application is doing.
    #[default]
    Verbose,
    /// Diagnostics for troubleshooting and test environments.
    Debug,
    /// Something happened or a state was entered.
    Info,
    /// Unexpected, but the application carries on.
    Warn,
    /// A problem that keeps some functionality from working.
    Error,
    /// Something the developer expects never to happen.
    Assert,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Verbose,
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Assert,
    ];

    pub const fn rank(self) -> u8 {
        match self {
            Severity::Verbose => 2,
            Severity::Debug => 3,
            Severity::Info => 4,
            Severity::Warn => 5,
            Severity::Error => 6,
            Severity::Assert => 7,
        }
    }

    /// Single-character code used in console and file lines.
    pub const fn code(self) -> char {
        match self {
            Severity::Verbose => 'V',
            Severity::Debug => 'D',
            Severity::Info => 'I',
            Severity::Warn => 'W',
            Severity::Error => 'E',
            Severity::Assert => 'A',
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Severity::Verbose => "verbose",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Assert => "assert",
        }
    }

    /// True when an event at `self` clears `threshold`.
    pub const fn passes(self, threshold: Severity) -> bool {
        self.rank() >= threshold.rank()
    }

    pub(crate) fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.rank() == rank)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Severity {
    type Err = LogError;

    /// Accepts full names (`"warn"`, `"WARNING"`) and one-letter codes (`"W"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let found = match wanted.as_str() {
            "v" | "verbose" | "trace" => Severity::Verbose,
            "d" | "debug" => Severity::Debug,
            "i" | "info" => Severity::Info,
            "w" | "warn" | "warning" => Severity::Warn,
            "e" | "error" => Severity::Error,
            "a" | "assert" => Severity::Assert,
            _ => {
                return Err(LogError::Config(format!("unknown log level '{s}'")));
            }
        };
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_are_strictly_increasing() {
        for pair in Severity::ALL.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn passes_compares_ranks() {
        for a in Severity::ALL {
            for b in Severity::ALL {
                assert_eq!(a.passes(b), a.rank() >= b.rank(), "{a} vs {b}");
            }
        }
        assert!(!Severity::Info.passes(Severity::Warn));
        assert!(Severity::Assert.passes(Severity::Error));
    }

    #[test]
    fn codes_match_logcat_letters() {
        let codes: String = Severity::ALL.iter().map(|s| s.code()).collect();
        assert_eq!(codes, "VDIWEA");
    }

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("W".parse::<Severity>().unwrap(), Severity::Warn);
        assert_eq!("Warning".parse::<Severity>().unwrap(), Severity::Warn);
        assert_eq!(" assert ".parse::<Severity>().unwrap(), Severity::Assert);
        assert!(matches!("loud".parse::<Severity>(), Err(LogError::Config(_))));
    }

    #[test]
    fn from_rank_round_trips() {
        for s in Severity::ALL {
            assert_eq!(Severity::from_rank(s.rank()), Some(s));
        }
        assert_eq!(Severity::from_rank(0), None);
    }
}
