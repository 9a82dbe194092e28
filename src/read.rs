//! Archive reading: [`Unzipper`], the read-side handle.

use crate::backing::Source;
use crate::crc32::Crc32Reader;
use crate::glob;
use crate::result::{extract_error, opening_error, ZipperError, ZipperResult};
use crate::spec::{self, CentralDirEntry, GPB_ENCRYPTED, METHOD_DEFLATE, METHOD_STORE};
use crate::types::{DateTime, EntryInfo};
use crate::zipcrypto;
use flate2::read::DeflateDecoder;
use std::io::{Read, Write};

/// Scratch-buffer size for streaming decode progress ticks; matches the
/// write side's `Config::default().read_buffer_size`.
const STREAM_CHUNK_SIZE: usize = 32 * 1024;

struct OpenState {
    buffer: Vec<u8>,
    entries: Vec<CentralDirEntry>,
}

/// A stateful archive-reader handle. Mirrors [`crate::write::Zipper`]'s
/// non-throwing, sticky-error operation policy: every call clears and then
/// repopulates `last_error`, and only construction-adjacent failures (none,
/// here -- `new` cannot fail) bypass it.
pub struct Unzipper {
    source: Source,
    password: Option<String>,
    state: Option<OpenState>,
    error: Option<ZipperError>,
}

impl Unzipper {
    pub fn new(source: Source) -> Self {
        Unzipper {
            source,
            password: None,
            state: None,
            error: None,
        }
    }

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

    /// Loads the backing store and parses its central directory. Reopening
    /// after `close` re-reads a `File` source from disk, but a `Bytes`
    /// source simply reparses the same in-memory snapshot it always has
    /// (there's no "underlying file" to observe changes in).
    pub fn open(&mut self) -> ZipperResult<()> {
        self.error = None;
        let result = self.try_open();
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    fn try_open(&mut self) -> ZipperResult<()> {
        let buffer = self.source.load()?;
        let entries = if buffer.is_empty() {
            Vec::new()
        } else {
            spec::read_central_directory(&buffer)?.1
        };
        self.state = Some(OpenState { buffer, entries });
        Ok(())
    }

    pub fn close(&mut self) -> ZipperResult<()> {
        self.error = None;
        self.state = None;
        Ok(())
    }

    fn state(&self) -> ZipperResult<&OpenState> {
        self.state.as_ref().ok_or(ZipperError::NotOpen)
    }

    /// Every entry, in central-directory order.
    pub fn entries(&mut self) -> ZipperResult<Vec<EntryInfo>> {
        self.error = None;
        let result = self.state().map(|state| state.entries.iter().map(to_entry_info).collect());
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    /// Entries whose name matches `pattern` (the archive's glob alphabet:
    /// `*`, `?`, everything else literal). An empty pattern matches every
    /// entry.
    pub fn entries_matching(&mut self, pattern: &str) -> ZipperResult<Vec<EntryInfo>> {
        self.error = None;
        let result = self.state().map(|state| {
            state
                .entries
                .iter()
                .filter(|entry| glob::matches(pattern, &entry.name))
                .map(to_entry_info)
                .collect()
        });
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    /// Info for one entry by exact name.
    pub fn locate(&mut self, name: &str) -> ZipperResult<EntryInfo> {
        self.error = None;
        let result = self.try_locate(name);
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    fn try_locate(&self, name: &str) -> ZipperResult<EntryInfo> {
        let state = self.state()?;
        state
            .entries
            .iter()
            .find(|entry| entry.name == name)
            .map(to_entry_info)
            .ok_or_else(|| ZipperError::BadEntry(name.into()))
    }

    /// Decrypts (if a password is set and the entry is encrypted),
    /// decompresses, and CRC-32-checks one entry's full content.
    pub fn read(&mut self, name: &str) -> ZipperResult<Vec<u8>> {
        self.error = None;
        let mut out = Vec::new();
        let result = self.try_read_streaming(name, &mut out, |_| {});
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result.map(|()| out)
    }

    /// Decrypts (if a password is set and the entry is encrypted),
    /// decompresses, and CRC-32-checks one entry's content, writing
    /// scratch-buffer-sized chunks to `sink` and invoking `on_chunk` with the
    /// cumulative decoded byte count after each write.
    pub(crate) fn read_streaming(
        &mut self,
        name: &str,
        sink: &mut dyn Write,
        on_chunk: impl FnMut(u64),
    ) -> ZipperResult<()> {
        self.error = None;
        let result = self.try_read_streaming(name, sink, on_chunk);
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    fn try_read_streaming(
        &self,
        name: &str,
        sink: &mut dyn Write,
        mut on_chunk: impl FnMut(u64),
    ) -> ZipperResult<()> {
        let state = self.state()?;
        let entry = state
            .entries
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| ZipperError::BadEntry(name.into()))?;

        let data_start = spec::local_file_data_offset(&state.buffer, entry.local_header_offset)?;
        let data_end = data_start + entry.compressed_size;
        if data_end as usize > state.buffer.len() {
            return extract_error(format!("entry '{name}' payload runs past the end of the archive"));
        }
        let mut payload = state.buffer[data_start as usize..data_end as usize].to_vec();

        if entry.flags & GPB_ENCRYPTED != 0 {
            // A bad password is only ever observed by reading past the
            // encryption header, never by the open step itself -- matching
            // the traditional PKZIP scheme's "decrypt and hope" design.
            let Some(password) = self.password.as_ref() else {
                return opening_error("archive entry is encrypted but no password was set");
            };
            if payload.len() < zipcrypto::HEADER_LEN {
                return opening_error(format!("entry '{name}' encryption header is truncated"));
            }
            let mut keys = zipcrypto::Keys::new(password.as_bytes());
            let mut header: [u8; zipcrypto::HEADER_LEN] = payload[..zipcrypto::HEADER_LEN]
                .try_into()
                .expect("slice length checked above");
            zipcrypto::decrypt_header(&mut keys, &mut header);
            if header[zipcrypto::HEADER_LEN - 1] != (entry.crc32 >> 24) as u8 {
                return opening_error("wrong password");
            }
            payload.drain(..zipcrypto::HEADER_LEN);
            keys.decrypt(&mut payload);
        }

        let decoder: Box<dyn Read + '_> = match entry.method {
            METHOD_STORE => Box::new(&payload[..]),
            METHOD_DEFLATE => Box::new(DeflateDecoder::new(&payload[..])),
            other => return extract_error(format!("entry '{name}' uses unsupported compression method {other}")),
        };
        let mut checked = Crc32Reader::new(decoder, entry.crc32);

        let mut chunk = [0u8; STREAM_CHUNK_SIZE];
        let mut decoded = 0u64;
        loop {
            let count = checked.read(&mut chunk)?;
            if count == 0 {
                break;
            }
            sink.write_all(&chunk[..count])?;
            decoded += count as u64;
            on_chunk(decoded);
        }
        Ok(())
    }
}

fn to_entry_info(entry: &CentralDirEntry) -> EntryInfo {
    EntryInfo {
        name: entry.name.clone(),
        compressed_size: entry.compressed_size,
        uncompressed_size: entry.uncompressed_size,
        dos_date: ((entry.mod_date as u32) << 16) | entry.mod_time as u32,
        last_modified: DateTime::from_msdos(entry.mod_date, entry.mod_time),
        crc32: entry.crc32,
        is_encrypted: entry.flags & GPB_ENCRYPTED != 0,
    }
}
