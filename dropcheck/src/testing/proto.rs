//! Hand-encoded dropbox proto dump blobs for tests

/// Appends `v` to `into` as a protobuf varint
pub fn varint(mut v: u64, into: &mut Vec<u8>) {
    loop {
        let mut b = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            b |= 0x80;
        }
        into.push(b);
        if v == 0 {
            break;
        }
    }
}

/// Encodes a single dropbox dump entry with the given time and data payload,
/// wrapped in its `entries` field header. Concatenating the results yields a
/// multi-entry dump.
pub fn encode_proto_entry(time_ms: u64, data: &[u8]) -> Vec<u8> {
    let mut inner = Vec::new();
    // time_ms = 1, varint
    inner.push(0x08);
    varint(time_ms, &mut inner);
    // data = 3, length delimited
    inner.push(0x1a);
    varint(data.len() as u64, &mut inner);
    inner.extend_from_slice(data);

    let mut out = Vec::new();
    // entries = 1, length delimited
    out.push(0x0a);
    varint(inner.len() as u64, &mut out);
    out.extend_from_slice(&inner);
    out
}
