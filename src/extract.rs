//! The extraction pipeline: walks an archive's entries, applies path-safety
//! checks, and writes each one to a file, a caller-supplied writer, or an
//! in-memory buffer.

use crate::path;
use crate::read::Unzipper;
use crate::result::{security_error, ZipperResult};
use crate::types::{EntryInfo, OverwritePolicy};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A snapshot of extraction progress, passed to the caller's callback after
/// every entry (and once more, with `status` set to its final value, when
/// `extract_all` returns).
#[derive(Debug, Clone)]
pub struct ProgressInfo<'a> {
    pub total_entries: usize,
    pub extracted_entries: usize,
    pub total_bytes: u64,
    pub extracted_bytes: u64,
    pub current_entry: &'a str,
    pub status: ProgressStatus,
}

/// Coarse extraction status, mirrored to the caller on every progress tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Idle,
    InProgress,
    Ok,
    Ko,
}

/// Reads one entry's full, decompressed (and decrypted, if applicable)
/// content into memory.
pub fn extract_to_vec(unzipper: &mut Unzipper, name: &str) -> ZipperResult<Vec<u8>> {
    unzipper.read(name)
}

/// Reads one entry and writes it to `sink`, returning the byte count
/// written.
pub fn extract_to_writer(unzipper: &mut Unzipper, name: &str, sink: &mut dyn Write) -> ZipperResult<u64> {
    let mut written = 0u64;
    unzipper.read_streaming(name, sink, |decoded| written = decoded)?;
    Ok(written)
}

/// Reads one entry and writes it to `path`, creating parent directories as
/// needed.
pub fn extract_to_file(unzipper: &mut Unzipper, name: &str, path: impl AsRef<Path>) -> ZipperResult<()> {
    extract_to_file_streaming(unzipper, name, path.as_ref(), |_| {})
}

fn extract_to_file_streaming(
    unzipper: &mut Unzipper,
    name: &str,
    path: &Path,
    on_chunk: impl FnMut(u64),
) -> ZipperResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    unzipper.read_streaming(name, &mut file, on_chunk)
}

/// Extracts entries from the archive under `destination`, calling `progress`
/// as the walk proceeds.
///
/// `glob`, if given, restricts the walk to entries whose name matches the
/// pattern (§4.5.3's alphabet); `None` walks every entry, and an empty
/// pattern matches every entry too, so the two are equivalent. `alt_names`
/// remaps an entry's on-disk path: an entry found as a key is written to
/// `destination` joined with its value instead of its archive name.
///
/// An entry whose (possibly remapped) name would resolve outside
/// `destination` -- the Zip-Slip defense -- or that already exists on disk
/// under [`OverwritePolicy::DoNotOverwrite`] is left untouched and recorded
/// as a failure; the walk continues through the remaining entries
/// regardless, and the overall result is `Err` (carrying the first failure)
/// once it completes if any entry failed.
///
/// Returns the destination-relative paths actually written.
pub fn extract_all(
    unzipper: &mut Unzipper,
    glob: Option<&str>,
    destination: &str,
    alt_names: &BTreeMap<String, String>,
    overwrite: OverwritePolicy,
    mut progress: impl FnMut(&ProgressInfo),
) -> ZipperResult<Vec<String>> {
    let entries: Vec<EntryInfo> = match glob {
        Some(pattern) => unzipper.entries_matching(pattern)?,
        None => unzipper.entries()?,
    };
    let total_entries = entries.len();
    let total_bytes: u64 = entries.iter().map(|e| e.uncompressed_size).sum();

    progress(&ProgressInfo {
        total_entries,
        extracted_entries: 0,
        total_bytes,
        extracted_bytes: 0,
        current_entry: "",
        status: ProgressStatus::Idle,
    });
    progress(&ProgressInfo {
        total_entries,
        extracted_entries: 0,
        total_bytes,
        extracted_bytes: 0,
        current_entry: "",
        status: ProgressStatus::InProgress,
    });

    let mut written = Vec::new();
    let mut extracted_bytes = 0u64;
    let mut first_error = None;

    for (index, entry) in entries.iter().enumerate() {
        progress(&ProgressInfo {
            total_entries,
            extracted_entries: index,
            total_bytes,
            extracted_bytes,
            current_entry: &entry.name,
            status: ProgressStatus::InProgress,
        });

        let bytes_before = extracted_bytes;
        let result = extract_one(unzipper, destination, entry, alt_names, overwrite, &mut written, |decoded| {
            progress(&ProgressInfo {
                total_entries,
                extracted_entries: index,
                total_bytes,
                extracted_bytes: bytes_before + decoded,
                current_entry: &entry.name,
                status: ProgressStatus::InProgress,
            });
        });

        match result {
            Ok(()) => extracted_bytes += entry.uncompressed_size,
            Err(err) => {
                progress(&ProgressInfo {
                    total_entries,
                    extracted_entries: index,
                    total_bytes,
                    extracted_bytes,
                    current_entry: &entry.name,
                    status: ProgressStatus::Ko,
                });
                first_error.get_or_insert(err);
            }
        }
    }

    progress(&ProgressInfo {
        total_entries,
        extracted_entries: total_entries,
        total_bytes,
        extracted_bytes,
        current_entry: "",
        status: if first_error.is_some() { ProgressStatus::Ko } else { ProgressStatus::Ok },
    });

    match first_error {
        Some(err) => Err(err),
        None => Ok(written),
    }
}

fn extract_one(
    unzipper: &mut Unzipper,
    destination: &str,
    entry: &EntryInfo,
    alt_names: &BTreeMap<String, String>,
    overwrite: OverwritePolicy,
    written: &mut Vec<String>,
    on_chunk: impl FnMut(u64),
) -> ZipperResult<()> {
    let resolved_name = alt_names.get(&entry.name).map(String::as_str).unwrap_or(entry.name.as_str());

    if path::validate_entry_name(resolved_name).is_err() || path::is_zip_slip(resolved_name, destination) {
        return security_error(format!(
            "entry '{resolved_name}' would extract outside of the destination directory"
        ));
    }

    let relative = path::to_native_separators(resolved_name);
    let target: PathBuf = Path::new(destination).join(relative);

    if entry.is_directory() {
        fs::create_dir_all(&target)?;
        return Ok(());
    }

    if target.exists() && overwrite == OverwritePolicy::DoNotOverwrite {
        return security_error(format!(
            "'{}' already exists and overwrite is not enabled",
            target.display()
        ));
    }

    extract_to_file_streaming(unzipper, &entry.name, &target, on_chunk)?;
    written.push(resolved_name.to_string());
    Ok(())
}
