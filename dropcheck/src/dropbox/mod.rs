//! Querying the device's dropbox diagnostic-log service for crash entries.
//!
//! The dropbox service keeps tagged, timestamped diagnostic records
//! (crashes, ANRs, tombstones, wtf logs). Depending on the build there are
//! three ways to read them back out, none universally available, so
//! [DropboxCrashDetector] tries them in a fixed order and uses whichever
//! works first.

use serde::Serialize;

pub mod attribution;
pub use attribution::entry_matches_package;

pub mod parse;
pub mod proto;
pub mod pull;

pub mod detector;
pub use detector::DropboxCrashDetector;

/// Where the dropbox service keeps its backing files on device
pub const DROPBOX_STORAGE_DIR: &'static str = "/data/system/dropbox";

/// The dropbox tags that indicate an app or system crash.
///
/// This is only a convenience default. The detector never consults it on its
/// own; callers pass whatever tag set they care about at construction.
pub const DEFAULT_CRASH_TAGS: &'static [&'static str] = &[
    "SYSTEM_TOMBSTONE",
    "data_app_anr",
    "data_app_crash",
    "data_app_native_crash",
    "system_app_anr",
    "system_app_crash",
    "system_app_native_crash",
    "system_server_anr",
    "system_server_crash",
    "system_server_native_crash",
    "system_server_watchdog",
];

/// One record read out of the dropbox service, normalized to the same shape
/// regardless of which retrieval strategy produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropboxEntry {
    /// Device-clock epoch milliseconds. Used for ordering and windowing,
    /// never for identity; duplicates are allowed.
    pub time_ms: i64,
    /// The entry's category, e.g. `system_app_crash`
    pub tag: String,
    /// The raw entry body
    pub text: String,
}

impl DropboxEntry {
    pub fn new<T: Into<String>, B: Into<String>>(time_ms: i64, tag: T, text: B) -> Self {
        Self {
            time_ms,
            tag: tag.into(),
            text: text.into(),
        }
    }
}

/// A half-open query range `[start, end)` in device-clock milliseconds.
///
/// `end` of `None` means unbounded, i.e. everything from `start` on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: Option<i64>,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn since(start: i64) -> Self {
        Self { start, end: None }
    }

    pub fn contains(&self, time_ms: i64) -> bool {
        if time_ms < self.start {
            return false;
        }
        match self.end {
            Some(end) => time_ms < end,
            None => true,
        }
    }
}

/// The three ways of getting entries back out of the dropbox service.
///
/// Each can fail independently (missing `dumpsys` support, inaccessible
/// storage directory, transport errors), and none is fatal to a query as
/// long as a later one works.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Tar up the backing files under [DROPBOX_STORAGE_DIR] and pull them
    AdbPull,
    /// `dumpsys dropbox --proto <tag>`
    ProtoDump,
    /// `dumpsys dropbox --file` paired with `dumpsys dropbox --print`
    StdoutDump,
}

/// Priority order for [DropboxCrashDetector::get_entries]: the first strategy
/// that succeeds wins, even if it produced zero entries.
pub const STRATEGY_ORDER: [Strategy; 3] = [Strategy::AdbPull, Strategy::ProtoDump, Strategy::StdoutDump];

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::AdbPull => "adb-pull",
            Self::ProtoDump => "proto-dump",
            Self::StdoutDump => "stdout-dump",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Strategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "adb-pull" | "pull" => Ok(Self::AdbPull),
            "proto-dump" | "proto" => Ok(Self::ProtoDump),
            "stdout-dump" | "stdout" => Ok(Self::StdoutDump),
            _ => Err(crate::Error::Generic(format!(
                "unknown retrieval strategy: {}",
                s
            ))),
        }
    }
}
