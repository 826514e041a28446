//! Parsing `dumpsys dropbox --proto` output.
//!
//! The dump is a `DropBoxManagerServiceDumpProto`: a repeated `entries`
//! field (1) of messages carrying `time_ms` (1), `text` (2) for text
//! entries and `data` (3) for everything else. The message is small enough
//! that walking the wire format directly beats carrying generated code.

use protobuf::CodedInputStream;

use super::DropboxEntry;

const ENTRIES_FIELD: u32 = 1;

const ENTRY_TIME_MS_FIELD: u32 = 1;
const ENTRY_TEXT_FIELD: u32 = 2;
const ENTRY_DATA_FIELD: u32 = 3;

const WIRE_VARINT: u32 = 0;
const WIRE_FIXED64: u32 = 1;
const WIRE_LEN: u32 = 2;
const WIRE_FIXED32: u32 = 5;

/// Parses a proto dump into entries, all labeled with [tag].
///
/// The proto dump is already scoped to a single tag by the `dumpsys`
/// invocation, so the tag comes from the caller. Entries that don't decode
/// are skipped; a truncated blob yields whatever decoded before the damage.
pub fn parse_proto_dump(blob: &[u8], tag: &str) -> Vec<DropboxEntry> {
    let mut entries = Vec::new();
    let mut input = CodedInputStream::from_bytes(blob);

    loop {
        match input.eof() {
            Ok(true) => break,
            Ok(false) => {}
            Err(e) => {
                log::warn!("dropbox proto dump for {} unreadable: {}", tag, e);
                break;
            }
        }

        let field_tag = match input.read_raw_varint32() {
            Ok(v) => v,
            Err(e) => {
                log::warn!("dropbox proto dump for {} truncated: {}", tag, e);
                break;
            }
        };

        let (field, wire) = (field_tag >> 3, field_tag & 7);

        if field == ENTRIES_FIELD && wire == WIRE_LEN {
            let buf = match input.read_bytes() {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("dropbox proto dump for {} truncated: {}", tag, e);
                    break;
                }
            };
            match parse_entry(&buf, tag) {
                Some(entry) => entries.push(entry),
                None => log::debug!("skipping malformed dropbox proto entry for {}", tag),
            }
        } else if !skip_field(&mut input, wire) {
            log::warn!(
                "dropbox proto dump for {}: can't skip field {} wire type {}",
                tag,
                field,
                wire
            );
            break;
        }
    }

    entries
}

fn parse_entry(buf: &[u8], tag: &str) -> Option<DropboxEntry> {
    let mut input = CodedInputStream::from_bytes(buf);

    let mut time_ms: Option<i64> = None;
    let mut text: Option<String> = None;

    while !input.eof().ok()? {
        let field_tag = input.read_raw_varint32().ok()?;
        match (field_tag >> 3, field_tag & 7) {
            (ENTRY_TIME_MS_FIELD, WIRE_VARINT) => {
                time_ms = Some(input.read_raw_varint64().ok()? as i64);
            }
            (ENTRY_TEXT_FIELD, WIRE_LEN) | (ENTRY_DATA_FIELD, WIRE_LEN) => {
                let bytes = input.read_bytes().ok()?;
                text = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            (_, wire) => {
                if !skip_field(&mut input, wire) {
                    return None;
                }
            }
        }
    }

    Some(DropboxEntry::new(
        time_ms?,
        tag,
        text.unwrap_or_default(),
    ))
}

fn skip_field(input: &mut CodedInputStream, wire: u32) -> bool {
    let res = match wire {
        WIRE_VARINT => input.read_raw_varint64().map(|_| ()),
        WIRE_FIXED64 => input.read_fixed64().map(|_| ()),
        WIRE_LEN => input.read_bytes().map(|_| ()),
        WIRE_FIXED32 => input.read_fixed32().map(|_| ()),
        // Groups never show up in this dump
        _ => return false,
    };
    res.is_ok()
}
