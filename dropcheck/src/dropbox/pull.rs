//! The adb-pull retrieval strategy.
//!
//! The dropbox backing files are readable by the shell user on most builds,
//! but pulling them one by one is slow over adb, so matching files are
//! tar'd up on the device, pulled as one archive, and unpacked with the
//! host `tar` binary.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use itertools::join;

use crate::adb::Adb;
use crate::command::{quote, run_cmd};
use crate::utils::path_must_str;
use crate::Context;

use super::parse::parse_file_name;
use super::{DropboxEntry, TimeWindow};

/// A backing file selected for pulling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulledFile {
    pub name: String,
    pub tag: String,
    pub time_ms: i64,
    pub compressed: bool,
}

/// Filters a storage directory listing down to the files worth pulling:
/// parseable names, a requested tag, and a timestamp inside the window.
///
/// The result is sorted by timestamp so the entries come back chronological.
pub fn select_dropbox_files<'a, I>(
    names: I,
    tags: &BTreeSet<String>,
    window: &TimeWindow,
) -> Vec<PulledFile>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut selected = Vec::new();

    for name in names {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        let parsed = match parse_file_name(name) {
            Some(v) => v,
            None => continue,
        };

        if !tags.contains(&parsed.tag) || !window.contains(parsed.time_ms) {
            continue;
        }

        selected.push(PulledFile {
            name: name.into(),
            tag: parsed.tag,
            time_ms: parsed.time_ms,
            compressed: parsed.compressed,
        });
    }

    selected.sort_by(|a, b| (a.time_ms, &a.name).cmp(&(b.time_ms, &b.name)));
    selected
}

/// Runs the full pull pipeline against [storage_dir].
///
/// Transport problems (listing, tar, pull, unpack) surface as errors so the
/// caller can fall back to another strategy; unreadable individual files are
/// skipped.
pub fn fetch_via_pull(
    ctx: &dyn Context,
    adb: &dyn Adb,
    storage_dir: &str,
    tags: &BTreeSet<String>,
    window: &TimeWindow,
) -> crate::Result<Vec<DropboxEntry>> {
    let listing = adb
        .shell(&format!("ls -1 {}", quote(storage_dir)))?
        .err_on_status()?;
    let listing = listing.stdout_utf8_lossy();

    let files = select_dropbox_files(listing.lines(), tags, window);
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let device_tar = format!("/data/local/tmp/dropcheck-{}.tar.gz", std::process::id());
    let names = join(files.iter().map(|f| quote(&f.name)), " ");

    let tar_res = adb
        .shell(&format!(
            "tar -czf {} -C {} {}",
            quote(&device_tar),
            quote(storage_dir),
            names
        ))
        .map_err(crate::Error::from)
        .and_then(|out| out.err_on_status());

    if let Err(e) = tar_res {
        remove_device_file(adb, &device_tar);
        return Err(e);
    }

    let tmp = tempfile::Builder::new()
        .prefix("dropcheck_dropbox_")
        .tempdir()?;
    let local_tar = tmp.path().join("dropbox.tar.gz");

    let pull_res = adb
        .pull(&device_tar, path_must_str(&local_tar))
        .map_err(crate::Error::from)
        .and_then(|out| out.err_on_status());

    remove_device_file(adb, &device_tar);
    pull_res?;

    let tar_bin = ctx.get_bin("tar")?;
    run_cmd(
        &tar_bin,
        &["-xzf", path_must_str(&local_tar), "-C", path_must_str(tmp.path())],
    )?
    .err_on_status()?;

    let mut entries = Vec::with_capacity(files.len());
    for f in &files {
        let path = tmp.path().join(&f.name);
        match read_entry_file(ctx, &path, f.compressed) {
            Ok(text) => entries.push(DropboxEntry::new(f.time_ms, f.tag.as_str(), text)),
            Err(e) => log::warn!("skipping unreadable dropbox file {}: {}", f.name, e),
        }
    }

    Ok(entries)
}

fn remove_device_file(adb: &dyn Adb, device_path: &str) {
    if let Err(e) = adb.shell(&format!("rm -f {}", quote(device_path))) {
        log::debug!("failed to remove {}: {}", device_path, e);
    }
}

fn read_entry_file(ctx: &dyn Context, path: &Path, compressed: bool) -> crate::Result<String> {
    if !compressed {
        let bytes = fs::read(path)?;
        return Ok(String::from_utf8_lossy(&bytes).into_owned());
    }

    let gzip = ctx.get_bin("gzip")?;
    let out = run_cmd(&gzip, &["-dc", path_must_str(path)])?.err_on_status()?;
    Ok(out.stdout_utf8_lossy().into_owned())
}
