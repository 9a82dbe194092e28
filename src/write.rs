//! Archive creation: [`Zipper`], the write-side handle.

use crate::backing::Target;
use crate::result::{security_error, ZipperError, ZipperResult};
use crate::spec::{self, CentralDirEntry, GPB_ENCRYPTED, GPB_UTF8, METHOD_DEFLATE, METHOD_STORE};
use crate::types::{AddFlags, CompressionLevel, DateTime, OpenMode};
use crate::zipcrypto;
use flate2::write::DeflateEncoder;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

/// Scratch-buffer sizing for read and write operations. The defaults match
/// the source library's own (32 KiB read / 64 KiB write).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub read_buffer_size: usize,
    pub write_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            read_buffer_size: 32 * 1024,
            write_buffer_size: 64 * 1024,
        }
    }
}

struct OpenState {
    buffer: Vec<u8>,
    entries: Vec<CentralDirEntry>,
}

/// A stateful archive-writer handle over one of a file, an in-memory
/// buffer, or a bidirectional stream. Every fallible operation returns a
/// [`crate::result::ZipperResult`] rather than panicking; `last_error`
/// mirrors the most recent failure for callers that prefer to check it
/// after the fact, matching the archive's non-throwing operation policy.
/// Errors are cleared at the top of every call that can produce a new one.
pub struct Zipper<'a> {
    target: Target<'a>,
    password: Option<String>,
    config: Config,
    state: Option<OpenState>,
    error: Option<ZipperError>,
}

impl<'a> Zipper<'a> {
    pub fn new(target: Target<'a>) -> Self {
        Zipper {
            target,
            password: None,
            config: Config::default(),
            state: None,
            error: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the password new entries are encrypted with. Takes effect for
    /// entries added after this call; does not re-encrypt existing ones.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = Some(password.into());
    }

    pub fn clear_password(&mut self) {
        self.password = None;
    }

    pub fn last_error(&self) -> Option<&ZipperError> {
        self.error.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Opens the backing store. `Overwrite` discards any existing content;
    /// `Append` loads it and carries its entries forward so `close` writes
    /// a central directory covering both the old and the newly added
    /// entries. A missing or empty backing store behaves the same under
    /// either mode.
    pub fn open(&mut self, mode: OpenMode) -> ZipperResult<()> {
        self.error = None;
        let result = self.try_open(mode);
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    fn try_open(&mut self, mode: OpenMode) -> ZipperResult<()> {
        let mut buffer = self.target.load_existing()?;
        let entries = match mode {
            OpenMode::Overwrite => {
                buffer.clear();
                Vec::new()
            }
            OpenMode::Append => {
                if buffer.is_empty() {
                    Vec::new()
                } else {
                    let (eocd, entries) = spec::read_central_directory(&buffer)?;
                    buffer.truncate(eocd.cd_offset as usize);
                    entries
                }
            }
        };
        self.state = Some(OpenState { buffer, entries });
        Ok(())
    }

    fn state_mut(&mut self) -> ZipperResult<&mut OpenState> {
        self.state
            .as_mut()
            .ok_or(ZipperError::NotOpen)
            .inspect_err(|err| self.error = Some(err.clone()))
    }

    /// Adds one entry with content read from `reader`.
    pub fn add(&mut self, name: &str, reader: impl Read, flags: AddFlags) -> ZipperResult<()> {
        self.error = None;
        let result = self.try_add(name, reader, flags, DateTime::now());
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    fn try_add(
        &mut self,
        name: &str,
        mut reader: impl Read,
        flags: AddFlags,
        modified: DateTime,
    ) -> ZipperResult<()> {
        if name.is_empty() {
            return Err(ZipperError::NoEntry);
        }
        // normalize() drops a trailing separator along with every other
        // empty segment, so a directory entry's trailing '/' (its only
        // marker, per the archive's directory-entry convention) has to be
        // reapplied after canonicalizing the rest of the name.
        let is_directory = name.ends_with('/') || name.ends_with('\\');
        let mut canonical = crate::path::normalize(name).into_string();
        if is_directory && !canonical.ends_with('/') {
            canonical.push('/');
        }
        if let Err(issue) = crate::path::validate_entry_name(&canonical) {
            return security_error(format!("invalid entry name '{name}': {issue:?}"));
        }
        let name = canonical;

        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        let crc32 = crc32fast::hash(&raw);
        let uncompressed_size = raw.len() as u64;

        let method = if flags.level == CompressionLevel::Store {
            METHOD_STORE
        } else {
            METHOD_DEFLATE
        };
        let mut payload = match method {
            METHOD_STORE => raw,
            _ => {
                let mut encoder = DeflateEncoder::new(Vec::new(), flags.level.to_flate2());
                encoder.write_all(&raw)?;
                encoder.finish()?
            }
        };

        let mut entry_flags = GPB_UTF8;
        if let Some(password) = self.password.clone() {
            let mut keys = zipcrypto::Keys::new(password.as_bytes());
            let header = zipcrypto::build_header(&mut keys, crc32);
            keys.encrypt(&mut payload);
            let mut framed = Vec::with_capacity(zipcrypto::HEADER_LEN + payload.len());
            framed.extend_from_slice(&header);
            framed.extend_from_slice(&payload);
            payload = framed;
            entry_flags |= GPB_ENCRYPTED;
        }

        let state = self.state_mut()?;
        let entry = CentralDirEntry {
            name,
            method,
            flags: entry_flags,
            mod_time: modified.timepart(),
            mod_date: modified.datepart(),
            crc32,
            compressed_size: payload.len() as u64,
            uncompressed_size,
            local_header_offset: state.buffer.len() as u64,
        };

        spec::write_local_file_header(&mut state.buffer, &entry)?;
        state.buffer.extend_from_slice(&payload);
        state.entries.push(entry);
        Ok(())
    }

    /// Adds a directory entry (no payload, name must end in `/`) or a file
    /// entry read from `fs_path`, recursing into subdirectories when
    /// `flags.save_hierarchy` is set.
    pub fn add_path(
        &mut self,
        fs_path: impl AsRef<Path>,
        entry_name: &str,
        flags: AddFlags,
    ) -> ZipperResult<()> {
        self.error = None;
        let result = self.try_add_path(fs_path.as_ref(), entry_name, flags);
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    fn try_add_path(&mut self, fs_path: &Path, entry_name: &str, flags: AddFlags) -> ZipperResult<()> {
        let metadata = fs::symlink_metadata(fs_path)?;
        let modified = metadata
            .modified()
            .map(DateTime::from_system_time)
            .unwrap_or_default();

        if metadata.is_dir() {
            if flags.save_hierarchy {
                let dir_name = format!("{}/", entry_name.trim_end_matches('/'));
                self.try_add(&dir_name, io::empty(), flags, modified)?;
            }
            let mut children: Vec<_> = fs::read_dir(fs_path)?.collect::<io::Result<_>>()?;
            children.sort_by_key(|entry| entry.file_name());
            for child in children {
                let child_name = child.file_name().to_string_lossy().into_owned();
                let child_entry_name = if flags.save_hierarchy {
                    format!("{}/{child_name}", entry_name.trim_end_matches('/'))
                } else {
                    child_name
                };
                self.try_add_path(&child.path(), &child_entry_name, flags)?;
            }
            Ok(())
        } else {
            let file = fs::File::open(fs_path)?;
            self.try_add(entry_name, file, flags, modified)
        }
    }

    /// Writes the central directory and end-of-central-directory record,
    /// publishes the finished archive to the backing store, and releases
    /// the open state. The same handle can be `open`ed again afterward.
    /// Idempotent: closing an already-closed handle is a no-op.
    pub fn close(&mut self) -> ZipperResult<()> {
        self.error = None;
        if self.state.is_none() {
            return Ok(());
        }
        let result = self.try_close();
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    fn try_close(&mut self) -> ZipperResult<()> {
        let mut state = self.state.take().ok_or(ZipperError::NotOpen)?;

        let cd_offset = state.buffer.len() as u64;
        for entry in &state.entries {
            spec::write_central_directory_header(&mut state.buffer, entry)?;
        }
        let cd_size = state.buffer.len() as u64 - cd_offset;
        let entry_count = state.entries.len();

        let needs_zip64 = entry_count > spec::ZIP64_ENTRY_THRESHOLD
            || cd_offset > spec::ZIP64_BYTES_THRESHOLD
            || cd_size > spec::ZIP64_BYTES_THRESHOLD;

        if needs_zip64 {
            let zip64_eocd_offset = state.buffer.len() as u64;
            spec::write_zip64_eocd(
                &mut state.buffer,
                entry_count as u64,
                cd_size,
                cd_offset,
                zip64_eocd_offset,
            )?;
            spec::write_eocd(&mut state.buffer, u16::MAX, u32::MAX, u32::MAX)?;
        } else {
            spec::write_eocd(&mut state.buffer, entry_count as u16, cd_size as u32, cd_offset as u32)?;
        }

        self.target.publish(&state.buffer)?;
        Ok(())
    }
}

