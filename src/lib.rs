//! Read, write and extract ZIP archives with path-safety checks and
//! optional password encryption.
//!
//! The two archive handles are [`write::Zipper`] (create/append) and
//! [`read::Unzipper`] (enumerate/extract), each constructed over a
//! [`backing::Target`] or [`backing::Source`] -- a file, an in-memory
//! buffer, or a bidirectional stream. Every fallible operation returns a
//! [`result::ZipperResult`]; handles never panic on bad input.

pub mod backing;
pub mod crc32;
pub mod extract;
pub mod glob;
pub mod path;
pub mod read;
pub mod result;
pub mod spec;
pub mod types;
pub mod write;
pub mod zipcrypto;

pub use backing::{Source, Target};
pub use extract::{extract_all, extract_to_file, extract_to_vec, extract_to_writer, ProgressInfo, ProgressStatus};
pub use read::Unzipper;
pub use result::{ZipperError, ZipperErrorKind, ZipperResult};
pub use types::{AddFlags, CompressionLevel, DateTime, EntryInfo, OpenMode, OverwritePolicy};
pub use write::{Config, Zipper};
