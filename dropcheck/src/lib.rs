pub mod context;
pub use context::{Context, DefaultContext};

pub mod config;
pub use config::DropcheckConfig;

pub mod errors;
pub use errors::{Error, Result};

pub mod adb;
pub use adb::{Adb, ExecAdb};

pub mod command;
pub use command::run_cmd;

pub mod dropbox;
pub use dropbox::{DropboxCrashDetector, DropboxEntry, Strategy, TimeWindow};

pub mod utils;

#[cfg(test)]
pub mod testing;
