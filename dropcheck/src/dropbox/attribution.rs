//! Deciding whether a dropbox entry came from a given package's process.
//!
//! The tricky part is the token boundary: `com.app.package` must not match
//! an entry produced by `com.app.package.sub` or `com.app.package_other`,
//! but it must match `com.app.package:pushservice`, which is how Android
//! names a package's secondary processes.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PROCESS_OR_CMDLINE: Regex =
        Regex::new(r"(?m)^(?:Process|Cmd line): ").unwrap();
}

/// The end of a process-name token: end of line/input or anything that isn't
/// a word character, `.` or `_`. A `:` lands in the negated class, so
/// secondary process names are accepted.
const TOKEN_END: &'static str = r"(?:$|[^0-9A-Za-z_.])";

/// Start of a bare token: start of line or a non-identifier character
const TOKEN_START: &'static str = r"(?:^|[^0-9A-Za-z_.])";

/// Returns true if the entry text looks like it was produced by the given
/// package's process.
///
/// Crash style entries carry a `Process: <name>` header and native crashes a
/// `Cmd line: <name>` one; those are checked first and are authoritative: if
/// either header is present but names another process, the entry is not
/// attributed to the package. Only entries without any such header fall back
/// to searching for the package name as a whole token anywhere in the text.
pub fn entry_matches_package(entry_text: &str, package: &str) -> bool {
    let escaped = regex::escape(package);

    let process_re = Regex::new(&format!(r"(?m)^Process: {}{}", escaped, TOKEN_END)).unwrap();
    if process_re.is_match(entry_text) {
        return true;
    }

    let cmd_line_re = Regex::new(&format!(r"(?m)^Cmd line: {}{}", escaped, TOKEN_END)).unwrap();
    if cmd_line_re.is_match(entry_text) {
        return true;
    }

    if PROCESS_OR_CMDLINE.is_match(entry_text) {
        // There is a process header and it's for somebody else
        return false;
    }

    let bare_re = Regex::new(&format!(
        r"(?m){}{}{}",
        TOKEN_START, escaped, TOKEN_END
    ))
    .unwrap();
    bare_re.is_match(entry_text)
}

#[cfg(test)]
mod test {
    use super::*;

    const PKG: &'static str = "com.app.package";

    #[test]
    fn test_process_line_exact() {
        assert!(entry_matches_package("Process: com.app.package", PKG));
        assert!(entry_matches_package(
            "Build: google/flame\nProcess: com.app.package\nFlags: 0x30c8be45",
            PKG
        ));
    }

    #[test]
    fn test_process_line_boundaries() {
        // A secondary process is still this package
        assert!(entry_matches_package("Process: com.app.package:sub", PKG));
        // A longer package sharing the prefix is not
        assert!(!entry_matches_package("Process: com.app.package.sub", PKG));
        assert!(!entry_matches_package("Process: com.app.package_sub", PKG));
        assert!(!entry_matches_package("Process: com.app.packagex", PKG));
    }

    #[test]
    fn test_mid_line_process_is_not_a_header() {
        // "Process:" mid-line is not a header, so the bare-token fallback
        // applies and the space-bounded package name matches
        assert!(entry_matches_package(
            "Some Process: com.app.package here",
            PKG
        ));
        // But a mid-line mention of a longer name still fails the boundary
        assert!(!entry_matches_package(
            "Some Process: com.app.package.sub here",
            PKG
        ));
    }

    #[test]
    fn test_cmd_line() {
        assert!(entry_matches_package(
            "Tombstone written\nCmd line: com.app.package",
            PKG
        ));
        assert!(!entry_matches_package("Cmd line: com.app.package.sub", PKG));
        assert!(entry_matches_package("Cmd line: com.app.package:remote", PKG));
    }

    #[test]
    fn test_process_header_is_authoritative() {
        // The header names another process; a bare mention elsewhere in the
        // text must not rescue the match
        let text = "Process: com.other.app\nACodec shutting down com.app.package now";
        assert!(!entry_matches_package(text, PKG));
    }

    #[test]
    fn test_bare_token_fallback() {
        assert!(entry_matches_package("wtf in com.app.package handler", PKG));
        assert!(entry_matches_package("killing com.app.package)", PKG));
        assert!(entry_matches_package("died: com.app.package", PKG));
        assert!(entry_matches_package("com.app.package:sync uid 10134", PKG));

        assert!(!entry_matches_package("acom.app.package", PKG));
        assert!(!entry_matches_package("com.app.package.a crashed", PKG));
        assert!(!entry_matches_package("com.app.package_a crashed", PKG));
        assert!(!entry_matches_package("unrelated text", PKG));
    }

    #[test]
    fn test_escapes_package_name() {
        // The dots in a package name are literals, not regex wildcards
        assert!(!entry_matches_package("Process: comxappxpackage", PKG));
    }
}
