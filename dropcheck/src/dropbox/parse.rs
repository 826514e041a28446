//! Text parsing for the stdout based dropbox formats.
//!
//! `dumpsys dropbox --file` lists one header line per entry followed by the
//! backing file path, whose name carries the millisecond timestamp. The
//! header itself only has second resolution, so `--print` bodies are matched
//! back to their `--file` counterparts by `(date, tag)` to recover the
//! millisecond time.

use std::collections::{BTreeSet, HashMap, VecDeque};

use lazy_static::lazy_static;
use regex::Regex;

use super::DropboxEntry;

lazy_static! {
    static ref ENTRY_HEADER: Regex = Regex::new(
        r"^(?P<date>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) (?P<tag>\S+) \(.*\)$"
    )
    .unwrap();
}

/// A dropbox backing file name, e.g. `system_app_crash@1662351441269.txt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropboxFileName {
    pub tag: String,
    pub time_ms: i64,
    pub compressed: bool,
}

/// Parses `tag@millis[.ext]` file names. Returns `None` for anything that
/// doesn't fit, including the `.lost` placeholders the service leaves behind
/// when it drops data.
pub fn parse_file_name(name: &str) -> Option<DropboxFileName> {
    let (tag, rest) = name.split_once('@')?;
    if tag.is_empty() {
        return None;
    }

    let (millis, ext) = match rest.split_once('.') {
        Some((m, e)) => (m, Some(e)),
        None => (rest, None),
    };

    if ext == Some("lost") {
        return None;
    }

    let time_ms = millis.parse::<i64>().ok()?;

    Some(DropboxFileName {
        tag: tag.into(),
        time_ms,
        compressed: name.ends_with(".gz"),
    })
}

/// Parses `dumpsys dropbox --file` output into a `(date, tag) -> [millis]`
/// lookup. Multiple entries can share a second, hence the queue.
fn parse_file_listing(output: &str) -> HashMap<(String, String), VecDeque<i64>> {
    let mut map: HashMap<(String, String), VecDeque<i64>> = HashMap::new();
    let mut pending: Option<(String, String)> = None;

    for line in output.lines() {
        if let Some(caps) = ENTRY_HEADER.captures(line) {
            pending = Some((caps["date"].into(), caps["tag"].into()));
            continue;
        }

        let trimmed = line.trim();
        if !trimmed.starts_with('/') {
            continue;
        }

        let key = match pending.take() {
            Some(k) => k,
            None => continue,
        };

        let base = match trimmed.rsplit_once('/') {
            Some((_, name)) => name,
            None => trimmed,
        };

        match parse_file_name(base) {
            Some(parsed) => {
                map.entry(key).or_default().push_back(parsed.time_ms);
            }
            None => log::debug!("unparseable dropbox file path: {}", trimmed),
        }
    }

    map
}

/// Parses `dumpsys dropbox --print` output into `(date, tag, body)` tuples
fn parse_print_dump(output: &str) -> Vec<(String, String, String)> {
    let mut entries = Vec::new();

    let mut current: Option<(String, String)> = None;
    let mut body: Vec<&str> = Vec::new();

    macro_rules! flush {
        () => {
            if let Some((date, tag)) = current.take() {
                let mut text = body.join("\n");
                let trimmed_len = text.trim_end().len();
                text.truncate(trimmed_len);
                entries.push((date, tag, text));
            }
            body.clear();
        };
    }

    for line in output.lines() {
        if let Some(caps) = ENTRY_HEADER.captures(line) {
            flush!();
            current = Some((caps["date"].into(), caps["tag"].into()));
            continue;
        }
        if current.is_some() {
            body.push(line);
        }
    }
    flush!();

    entries
}

/// Combines the `--file` and `--print` dumps into entries for the requested
/// tags.
///
/// Entries whose body has no `--file` counterpart only carry a
/// second-resolution time, which can't be windowed against millisecond
/// timestamps, so they're skipped rather than stamped with a guess.
pub fn parse_stdout_dump(
    file_output: &str,
    print_output: &str,
    tags: &BTreeSet<String>,
) -> Vec<DropboxEntry> {
    let mut times = parse_file_listing(file_output);
    let mut entries = Vec::new();

    for (date, tag, text) in parse_print_dump(print_output) {
        if !tags.contains(&tag) {
            continue;
        }

        let time_ms = times
            .get_mut(&(date.clone(), tag.clone()))
            .and_then(|q| q.pop_front());

        match time_ms {
            Some(time_ms) => entries.push(DropboxEntry { time_ms, tag, text }),
            None => log::warn!(
                "dropbox entry {} @ {} has no file listing counterpart, skipping",
                tag,
                date
            ),
        }
    }

    entries
}

#[cfg(test)]
mod test {
    use super::*;

    fn tag_set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|it| String::from(*it)).collect()
    }

    #[test]
    fn test_parse_file_name() {
        let parsed = parse_file_name("system_app_crash@1662351441269.txt").unwrap();
        assert_eq!(parsed.tag, "system_app_crash");
        assert_eq!(parsed.time_ms, 1662351441269);
        assert!(!parsed.compressed);

        let parsed = parse_file_name("data_app_anr@1662351441270.txt.gz").unwrap();
        assert_eq!(parsed.tag, "data_app_anr");
        assert_eq!(parsed.time_ms, 1662351441270);
        assert!(parsed.compressed);

        // No extension at all is still fine
        let parsed = parse_file_name("event_data@123").unwrap();
        assert_eq!(parsed.time_ms, 123);

        assert!(parse_file_name("system_app_crash@drop.lost").is_none());
        assert!(parse_file_name("no-separator.txt").is_none());
        assert!(parse_file_name("@123.txt").is_none());
        assert!(parse_file_name("tag@notanumber.txt").is_none());
    }

    #[test]
    fn test_parse_stdout_dump() {
        let file_output = r#"Drop box contents: 2 entries from 2022-09-04 (newest first):

2022-09-05 04:17:21 system_server_wtf (text, 3718 bytes)
    /data/system/dropbox/system_server_wtf@1662351441269.txt
2022-09-05 04:20:05 system_app_crash (compressed text, 1452 bytes)
    /data/system/dropbox/system_app_crash@1662351605000.txt.gz
"#;

        let print_output = r#"Drop box contents: 2 entries from 2022-09-04 (newest first):

2022-09-05 04:17:21 system_server_wtf (text, 3718 bytes)
Process: system_server
Subject: ActivityManager
Sending non-protected broadcast android.intent.action.SIM_STATE_CHANGED

2022-09-05 04:20:05 system_app_crash (compressed text, 1452 bytes)
Process: com.android.systemui
java.lang.NullPointerException
	at com.android.systemui.Thing.run(Thing.java:42)
"#;

        let tags = tag_set(&["system_server_wtf", "system_app_crash"]);
        let entries = parse_stdout_dump(file_output, print_output, &tags);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].time_ms, 1662351441269);
        assert_eq!(entries[0].tag, "system_server_wtf");
        assert!(entries[0]
            .text
            .contains("Sending non-protected broadcast"));

        assert_eq!(entries[1].time_ms, 1662351605000);
        assert!(entries[1].text.contains("NullPointerException"));
    }

    #[test]
    fn test_stdout_dump_filters_tags() {
        let file_output = r#"2022-09-05 04:17:21 system_server_wtf (text, 10 bytes)
    /data/system/dropbox/system_server_wtf@1662351441269.txt
"#;
        let print_output = r#"2022-09-05 04:17:21 system_server_wtf (text, 10 bytes)
whatever
"#;

        let entries = parse_stdout_dump(file_output, print_output, &tag_set(&["data_app_crash"]));
        assert!(entries.is_empty());
    }

    #[test]
    fn test_stdout_dump_unpaired_print_entry_skipped() {
        // --print has an entry that --file doesn't know about
        let print_output = r#"2022-09-05 04:17:21 system_app_crash (text, 10 bytes)
some body
"#;

        let entries = parse_stdout_dump("", print_output, &tag_set(&["system_app_crash"]));
        assert!(entries.is_empty());
    }

    #[test]
    fn test_stdout_dump_same_second_entries() {
        // Two entries in the same second for the same tag must pair in order
        let file_output = r#"2022-09-05 04:17:21 data_app_crash (text, 5 bytes)
    /data/system/dropbox/data_app_crash@1662351441100.txt
2022-09-05 04:17:21 data_app_crash (text, 5 bytes)
    /data/system/dropbox/data_app_crash@1662351441200.txt
"#;
        let print_output = r#"2022-09-05 04:17:21 data_app_crash (text, 5 bytes)
first

2022-09-05 04:17:21 data_app_crash (text, 5 bytes)
second
"#;

        let entries = parse_stdout_dump(file_output, print_output, &tag_set(&["data_app_crash"]));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].time_ms, 1662351441100);
        assert_eq!(entries[0].text, "first");
        assert_eq!(entries[1].time_ms, 1662351441200);
        assert_eq!(entries[1].text, "second");
    }
}
