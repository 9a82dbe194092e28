//! The error taxonomy every archive operation reports through.

use displaydoc::Display;
use std::borrow::Cow;
use std::io;
use thiserror::Error;

/// Generic result type with [`ZipperError`] as its error variant.
pub type ZipperResult<T> = Result<T, ZipperError>;

/// Errors an archive handle can report. Every fallible operation returns one
/// of these (never panics or throws); constructors are the only sites that
/// surface a [`ZipperError`] as the sole failure mode of a call that can't
/// return a handle at all.
#[derive(Debug, Display, Error)]
#[non_exhaustive]
pub enum ZipperError {
    /// i/o error: {0}
    Io(#[from] io::Error),

    /// could not open the archive: {0}
    OpeningError(Cow<'static, str>),

    /// internal error: {0}
    InternalError(Cow<'static, str>),

    /// entry '{0}' not found in archive
    BadEntry(Box<str>),

    /// entry name cannot be empty
    NoEntry,

    /// security error: {0}
    SecurityError(Cow<'static, str>),

    /// extraction error: {0}
    ExtractError(Cow<'static, str>),

    /// operation attempted on a closed archive handle
    NotOpen,
}

impl Clone for ZipperError {
    /// `io::Error` itself isn't `Clone`, so a cloned `Io` variant is
    /// downgraded to the equivalent `InternalError` message. Used to mirror
    /// the most recent failure into a handle's sticky error slot without
    /// consuming the original.
    fn clone(&self) -> Self {
        match self {
            ZipperError::Io(err) => ZipperError::InternalError(err.to_string().into()),
            ZipperError::OpeningError(m) => ZipperError::OpeningError(m.clone()),
            ZipperError::InternalError(m) => ZipperError::InternalError(m.clone()),
            ZipperError::BadEntry(m) => ZipperError::BadEntry(m.clone()),
            ZipperError::NoEntry => ZipperError::NoEntry,
            ZipperError::SecurityError(m) => ZipperError::SecurityError(m.clone()),
            ZipperError::ExtractError(m) => ZipperError::ExtractError(m.clone()),
            ZipperError::NotOpen => ZipperError::NotOpen,
        }
    }
}

impl ZipperError {
    /// Classification matching the taxonomy used by callers that branch on
    /// error kind rather than message text.
    pub fn kind(&self) -> ZipperErrorKind {
        match self {
            ZipperError::Io(_) => ZipperErrorKind::InternalError,
            ZipperError::OpeningError(_) => ZipperErrorKind::OpeningError,
            ZipperError::InternalError(_) => ZipperErrorKind::InternalError,
            ZipperError::BadEntry(_) => ZipperErrorKind::BadEntry,
            ZipperError::NoEntry => ZipperErrorKind::NoEntry,
            ZipperError::SecurityError(_) => ZipperErrorKind::SecurityError,
            ZipperError::ExtractError(_) => ZipperErrorKind::ExtractError,
            ZipperError::NotOpen => ZipperErrorKind::InternalError,
        }
    }
}

/// The error kind table from the archive's error-handling design: a
/// caller-facing classification independent of the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZipperErrorKind {
    OpeningError,
    InternalError,
    BadEntry,
    NoEntry,
    SecurityError,
    ExtractError,
}

pub(crate) fn opening_error<T>(message: impl Into<Cow<'static, str>>) -> ZipperResult<T> {
    Err(ZipperError::OpeningError(message.into()))
}

pub(crate) fn internal_error<T>(message: impl Into<Cow<'static, str>>) -> ZipperResult<T> {
    Err(ZipperError::InternalError(message.into()))
}

pub(crate) fn security_error<T>(message: impl Into<Cow<'static, str>>) -> ZipperResult<T> {
    Err(ZipperError::SecurityError(message.into()))
}

pub(crate) fn extract_error<T>(message: impl Into<Cow<'static, str>>) -> ZipperResult<T> {
    Err(ZipperError::ExtractError(message.into()))
}

impl From<ZipperError> for io::Error {
    fn from(err: ZipperError) -> io::Error {
        let kind = match &err {
            ZipperError::Io(err) => err.kind(),
            ZipperError::OpeningError(_) => io::ErrorKind::InvalidData,
            ZipperError::InternalError(_) => io::ErrorKind::Other,
            ZipperError::BadEntry(_) => io::ErrorKind::NotFound,
            ZipperError::NoEntry => io::ErrorKind::InvalidInput,
            ZipperError::SecurityError(_) => io::ErrorKind::PermissionDenied,
            ZipperError::ExtractError(_) => io::ErrorKind::Other,
            ZipperError::NotOpen => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
