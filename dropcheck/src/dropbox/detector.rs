use std::collections::BTreeSet;

use crate::adb::Adb;
use crate::command::quote;
use crate::Context;

use super::attribution::entry_matches_package;
use super::{parse, proto, pull};
use super::{DropboxEntry, Strategy, TimeWindow, DROPBOX_STORAGE_DIR, STRATEGY_ORDER};

/// Facade over the three dropbox retrieval strategies.
///
/// A detector is built for a fixed tag set; [get_entries] answers "which of
/// these entries landed in this time window, optionally attributable to this
/// package" without ever failing a test run over an unobservable dropbox.
pub struct DropboxCrashDetector<A: Adb> {
    adb: A,
    tags: BTreeSet<String>,
    storage_dir: String,
}

impl<A: Adb> DropboxCrashDetector<A> {
    pub fn new<I, S>(adb: A, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            adb,
            tags: tags.into_iter().map(|it| it.into()).collect(),
            storage_dir: DROPBOX_STORAGE_DIR.into(),
        }
    }

    /// Override the on-device storage directory, mostly useful for devices
    /// that relocate the dropbox to another volume
    pub fn with_storage_dir<S: Into<String>>(mut self, dir: S) -> Self {
        self.storage_dir = dir.into();
        self
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Entries for the detector's tags within `[window.start, window.end)`,
    /// restricted to the given package's process when one is supplied.
    ///
    /// Strategies are tried in [STRATEGY_ORDER]; the first one that succeeds
    /// is authoritative even if it saw nothing, and if every strategy fails
    /// the result is an empty list. "No crash observed" and "could not
    /// observe" are deliberately indistinguishable here.
    pub fn get_entries(
        &self,
        ctx: &dyn Context,
        package: Option<&str>,
        window: &TimeWindow,
    ) -> Vec<DropboxEntry> {
        let raw = self.fetch_first_available(ctx, window);

        raw.into_iter()
            .filter(|e| window.contains(e.time_ms))
            .filter(|e| match package {
                Some(pkg) => entry_matches_package(&e.text, pkg),
                None => true,
            })
            .collect()
    }

    /// Runs a single named strategy, propagating its transport errors.
    ///
    /// Only the adb-pull strategy uses the window (it filters by file name
    /// before transferring anything); the dump strategies return everything
    /// and leave windowing to [get_entries].
    pub fn fetch(
        &self,
        ctx: &dyn Context,
        strategy: Strategy,
        window: &TimeWindow,
    ) -> crate::Result<Vec<DropboxEntry>> {
        match strategy {
            Strategy::AdbPull => {
                pull::fetch_via_pull(ctx, &self.adb, &self.storage_dir, &self.tags, window)
            }
            Strategy::ProtoDump => self.fetch_proto(),
            Strategy::StdoutDump => self.fetch_stdout(),
        }
    }

    fn fetch_first_available(&self, ctx: &dyn Context, window: &TimeWindow) -> Vec<DropboxEntry> {
        for strategy in STRATEGY_ORDER {
            match self.fetch(ctx, strategy, window) {
                Ok(entries) => {
                    log::debug!(
                        "dropbox {} retrieval returned {} entries",
                        strategy,
                        entries.len()
                    );
                    return entries;
                }
                Err(e) => log::warn!("dropbox {} retrieval failed: {}", strategy, e),
            }
        }

        log::warn!("all dropbox retrieval strategies failed, treating as no entries");
        Vec::new()
    }

    fn fetch_proto(&self) -> crate::Result<Vec<DropboxEntry>> {
        let mut entries = Vec::new();
        for tag in &self.tags {
            let out = self
                .adb
                .exec_out(&format!("dumpsys dropbox --proto {}", quote(tag)))?
                .err_on_status()?;
            entries.extend(proto::parse_proto_dump(&out.stdout, tag));
        }
        Ok(entries)
    }

    fn fetch_stdout(&self) -> crate::Result<Vec<DropboxEntry>> {
        let file_out = self.adb.shell("dumpsys dropbox --file")?.err_on_status()?;
        let print_out = self.adb.shell("dumpsys dropbox --print")?.err_on_status()?;

        Ok(parse::parse_stdout_dump(
            &file_out.stdout_utf8_lossy(),
            &print_out.stdout_utf8_lossy(),
            &self.tags,
        ))
    }
}
