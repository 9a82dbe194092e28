//! Backing stores an archive handle can be constructed over.
//!
//! The source material models this as a reference to one of three kinds of
//! storage (a path, a caller-owned byte vector, or a bidirectional stream),
//! selected once at construction and threaded through every operation behind
//! a sentinel "unused" reference for the variants not chosen. That technique
//! doesn't translate: Rust has no null reference to stand in for "this slot
//! isn't used". Instead each kind is a real enum variant, and every archive
//! operates purely on an owned in-memory buffer that is loaded from the
//! backing store on open and published back to it on close -- the same
//! "read everything in, work in memory, flush on close" behavior the source
//! gives a stream or vector backing store, generalized to cover the file
//! case too.

use crate::result::ZipperResult;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

/// A stream an archive can be written to or read from: any type that
/// supports both directions plus random access.
pub trait ReadWriteSeek: Read + Write + Seek {}
impl<T: Read + Write + Seek> ReadWriteSeek for T {}

/// Where a [`crate::write::Zipper`] reads its existing content from (on
/// `Append`) and publishes its finished content to (on close).
pub enum Target<'a> {
    File(PathBuf),
    Vector(&'a mut Vec<u8>),
    Stream(&'a mut dyn ReadWriteSeek),
}

impl<'a> Target<'a> {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Target::File(path.into())
    }

    pub fn vector(dest: &'a mut Vec<u8>) -> Self {
        Target::Vector(dest)
    }

    pub fn stream(dest: &'a mut dyn ReadWriteSeek) -> Self {
        Target::Stream(dest)
    }

    /// Loads whatever content is already present, for `Append` mode. A
    /// missing file is treated as empty rather than an error.
    pub(crate) fn load_existing(&mut self) -> io::Result<Vec<u8>> {
        match self {
            Target::File(path) => match fs::read(path) {
                Ok(bytes) => Ok(bytes),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
                Err(err) => Err(err),
            },
            Target::Vector(dest) => Ok(dest.to_vec()),
            Target::Stream(stream) => {
                stream.seek(SeekFrom::Start(0))?;
                let mut buf = Vec::new();
                stream.read_to_end(&mut buf)?;
                Ok(buf)
            }
        }
    }

    /// Publishes the finished archive buffer back to the backing store.
    pub(crate) fn publish(&mut self, buffer: &[u8]) -> io::Result<()> {
        match self {
            Target::File(path) => fs::write(path, buffer),
            Target::Vector(dest) => {
                dest.clear();
                dest.extend_from_slice(buffer);
                Ok(())
            }
            Target::Stream(stream) => {
                stream.seek(SeekFrom::Start(0))?;
                stream.write_all(buffer)
            }
        }
    }
}

/// Where an [`crate::read::Unzipper`] reads its content from. Content is
/// always copied into an owned buffer at open time -- a read-only view
/// would be sufficient for the codec, but the source material's own
/// unzip implementation keeps an internal copy regardless of backing kind,
/// and doing the same here means decryption and decompression never need
/// to know which kind of backing store they came from.
pub enum Source {
    File(PathBuf),
    Bytes(Vec<u8>),
}

impl Source {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Source::File(path.into())
    }

    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Source::Bytes(data.into())
    }

    pub fn reader(mut reader: impl Read) -> ZipperResult<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Source::Bytes(buf))
    }

    pub(crate) fn load(&self) -> io::Result<Vec<u8>> {
        match self {
            Source::File(path) => fs::read(path),
            Source::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}
