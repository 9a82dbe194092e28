//! Portable path parsing, normalization and Zip-Slip defenses.
//!
//! The archive's canonical separator is always `/`. Paths that touch the
//! filesystem are converted to the host's native separator at the boundary
//! (see [`to_native_separators`]); every other function here operates on the
//! normalized, slash-based form.

use std::env;

const UNIX_SEP: char = '/';
const WINDOWS_SEP: char = '\\';

/// Result of [`normalize`]: a path string plus the separator it was rebuilt
/// with, so callers that need to re-root it (Zip-Slip canonicalization) know
/// whether to keep using `\` or `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    path: String,
    is_absolute: bool,
    separator: char,
}

impl NormalizedPath {
    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn is_absolute(&self) -> bool {
        self.is_absolute
    }

    pub fn into_string(self) -> String {
        self.path
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

/// Detected path root, used to decide the preferred separator on rejoin.
enum Root {
    /// No root: a relative path.
    None,
    /// POSIX absolute path rooted at `/`.
    Posix,
    /// Windows path rooted at a drive letter, e.g. `C:\`.
    WindowsDrive(char),
}

fn detect_root(unix_path: &str) -> Root {
    let bytes = unix_path.as_bytes();
    if bytes.first() == Some(&b'/') {
        Root::Posix
    } else if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        Root::WindowsDrive(bytes[0] as char)
    } else {
        Root::None
    }
}

/// Normalizes a path per the archive's portability rules: separators are
/// unified, `.` segments are dropped, `..` segments pop their predecessor
/// (except at the root of an absolute path, where they are silently
/// discarded instead of escaping), and the result is rejoined with the
/// preferred separator for the detected root (`\` under a Windows drive,
/// `/` otherwise).
pub fn normalize(input: &str) -> NormalizedPath {
    if input.is_empty() {
        return NormalizedPath {
            path: String::new(),
            is_absolute: false,
            separator: UNIX_SEP,
        };
    }

    let unix_path: String = input
        .chars()
        .map(|c| if c == WINDOWS_SEP { UNIX_SEP } else { c })
        .collect();

    let (root, separator, is_absolute, rest) = match detect_root(&unix_path) {
        Root::Posix => ("/".to_string(), UNIX_SEP, true, &unix_path[1..]),
        Root::WindowsDrive(letter) => {
            let root = format!("{letter}:\\");
            let rest = if unix_path.len() > 2 {
                &unix_path[3..]
            } else {
                ""
            };
            (root, WINDOWS_SEP, true, rest)
        }
        Root::None => (String::new(), UNIX_SEP, false, unix_path.as_str()),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if matches!(segments.last(), Some(&last) if last != "..") {
                    segments.pop();
                } else if !is_absolute {
                    segments.push("..");
                }
                // Absolute path with nothing left to pop: drop the `..`.
            }
            other => segments.push(other),
        }
    }

    let path = if segments.is_empty() {
        if is_absolute {
            root
        } else {
            ".".to_string()
        }
    } else if is_absolute {
        root + &segments.join(&separator.to_string())
    } else {
        segments.join(&separator.to_string())
    };

    NormalizedPath {
        path,
        is_absolute,
        separator,
    }
}

/// Returns the path this process considers its current working directory, as
/// a string using forward slashes. Falls back to `"."` if it cannot be
/// determined.
fn current_dir_string() -> String {
    env::current_dir()
        .ok()
        .and_then(|p| p.to_str().map(to_unix_separators))
        .unwrap_or_else(|| ".".to_string())
}

/// Canonicalizes a destination directory for use as the Zip-Slip base:
/// relative directories are resolved against the current working directory,
/// and the result always carries a trailing separator so that e.g. `"john"`
/// can never be mistaken as a prefix of `"johnny"`.
pub fn canonicalize_destination(destination: &str) -> String {
    let normalized = if destination.is_empty() {
        normalize(&current_dir_string())
    } else {
        match detect_root(&to_unix_separators(destination)) {
            Root::None => {
                let cwd = current_dir_string();
                normalize(&format!("{cwd}/{destination}"))
            }
            _ => normalize(destination),
        }
    };

    let separator = normalized.separator;
    let mut path = normalized.path;
    if !has_trailing_separator(&path) {
        path.push(separator);
    }
    path
}

fn has_trailing_separator(path: &str) -> bool {
    matches!(path.chars().last(), Some(UNIX_SEP) | Some(WINDOWS_SEP))
}

/// True iff `path` ends with a separator (archive or native).
pub fn has_trailing_slash(path: &str) -> bool {
    has_trailing_separator(path)
}

fn path_root(path: &str) -> &str {
    let unix_path = path;
    if unix_path.starts_with('/') {
        &unix_path[..1]
    } else if unix_path.len() > 2
        && unix_path.as_bytes()[1] == b':'
        && unix_path.as_bytes()[0].is_ascii_alphabetic()
        && matches!(unix_path.as_bytes()[2], b'/' | b'\\')
    {
        &unix_path[..2]
    } else {
        ""
    }
}

/// Joins a canonical destination directory (already trailing-separator
/// terminated) with an archive entry name, and reports whether the resolved
/// path escapes the destination: the Zip-Slip check.
pub fn is_zip_slip(entry_name: &str, destination: &str) -> bool {
    let dest = canonicalize_destination(destination);
    let file = if path_root(entry_name).is_empty() {
        canonicalize_destination(&format!("{dest}{entry_name}"))
    } else {
        entry_name.to_string()
    };
    !file.starts_with(&dest)
}

/// Why an entry name failed [`validate_entry_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryNameIssue {
    Empty,
    ControlCharacters,
    ZipSlip,
    AbsolutePath,
}

/// Validates an archive entry name per the archive's invariants: non-empty,
/// free of control characters, not escaping via a leading `..`, and not
/// rooted. Returns `Ok(())` when valid.
pub fn validate_entry_name(name: &str) -> Result<(), EntryNameIssue> {
    if name.is_empty() {
        return Err(EntryNameIssue::Empty);
    }
    if has_control_characters(name) {
        return Err(EntryNameIssue::ControlCharacters);
    }
    if name.starts_with("..") {
        return Err(EntryNameIssue::ZipSlip);
    }
    if !path_root(name).is_empty() || name.starts_with('/') || name.starts_with('\\') {
        return Err(EntryNameIssue::AbsolutePath);
    }
    Ok(())
}

/// True iff `name` contains a byte in `0x00..=0x1F` that is not a UTF-8
/// continuation byte. In practice continuation bytes are always `>= 0x80`,
/// so any byte below `0x20` is a genuine control character.
pub fn has_control_characters(name: &str) -> bool {
    name.bytes().enumerate().any(|(i, b)| {
        let is_continuation = i > 0 && (b & 0xC0) == 0x80;
        b < 0x20 && !is_continuation
    })
}

/// Converts every `\` to `/`.
pub fn to_unix_separators(path: &str) -> String {
    path.chars()
        .map(|c| if c == WINDOWS_SEP { UNIX_SEP } else { c })
        .collect()
}

/// Converts every `/` to `\`.
pub fn to_windows_separators(path: &str) -> String {
    path.chars()
        .map(|c| if c == UNIX_SEP { WINDOWS_SEP } else { c })
        .collect()
}

/// Converts to the host's native separator: `\` on Windows, `/` elsewhere.
pub fn to_native_separators(path: &str) -> String {
    if cfg!(windows) {
        to_windows_separators(path)
    } else {
        to_unix_separators(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_dot_segments() {
        assert_eq!(normalize("foo/./bar").as_str(), "foo/bar");
        assert_eq!(normalize("./foo").as_str(), "foo");
        assert_eq!(normalize("").as_str(), "");
    }

    #[test]
    fn normalize_pops_parent_dir() {
        assert_eq!(normalize("foo/../Test1").as_str(), "Test1");
        assert_eq!(normalize("a/b/../../c").as_str(), "c");
    }

    #[test]
    fn normalize_keeps_leading_dotdot_for_relative_paths() {
        assert_eq!(normalize("../Test1").as_str(), "../Test1");
        assert_eq!(normalize("../../a").as_str(), "../../a");
    }

    #[test]
    fn normalize_drops_dotdot_at_absolute_root() {
        assert_eq!(normalize("/../etc/passwd").as_str(), "/etc/passwd");
    }

    #[test]
    fn normalize_handles_windows_drive() {
        let n = normalize("C:\\foo\\..\\bar");
        assert_eq!(n.as_str(), "C:\\bar");
        assert!(n.is_absolute());
    }

    #[test]
    fn normalize_empty_relative_becomes_dot() {
        assert_eq!(normalize("a/..").as_str(), ".");
    }

    #[test]
    fn entry_name_rejects_parent_escape() {
        assert_eq!(
            validate_entry_name("../Test1"),
            Err(EntryNameIssue::ZipSlip)
        );
    }

    #[test]
    fn entry_name_rejects_absolute() {
        assert_eq!(
            validate_entry_name("/etc/passwd"),
            Err(EntryNameIssue::AbsolutePath)
        );
        assert_eq!(
            validate_entry_name("C:\\Windows"),
            Err(EntryNameIssue::AbsolutePath)
        );
    }

    #[test]
    fn entry_name_rejects_control_chars() {
        assert_eq!(
            validate_entry_name("foo\0bar"),
            Err(EntryNameIssue::ControlCharacters)
        );
    }

    #[test]
    fn entry_name_accepts_canonicalizable_escape() {
        assert_eq!(validate_entry_name("foo/../Test1"), Ok(()));
    }

    #[test]
    fn zip_slip_detects_escape() {
        assert!(is_zip_slip("../../etc/passwd", "/tmp/out"));
        assert!(!is_zip_slip("a/b.txt", "/tmp/out"));
    }

    #[test]
    fn canonicalize_destination_has_trailing_separator() {
        let dest = canonicalize_destination("/tmp/out");
        assert!(has_trailing_slash(&dest));
    }
}
