//! Types that describe what goes into, or comes out of, an archive.

use chrono::{Datelike, Local, TimeZone, Timelike};

/// A broken-down local timestamp, stored in a ZIP archive as an MS-DOS date
/// (2-second resolution) alongside the finer-grained fields this crate keeps
/// around for display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Default for DateTime {
    /// The MS-DOS epoch: 1980-01-01 00:00:00.
    fn default() -> DateTime {
        DateTime {
            year: 1980,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

impl DateTime {
    /// Decodes an MS-DOS (date, time) pair into a [`DateTime`].
    pub const fn from_msdos(datepart: u16, timepart: u16) -> DateTime {
        let seconds = (timepart & 0b0000000000011111) << 1;
        let minutes = (timepart & 0b0000011111100000) >> 5;
        let hours = (timepart & 0b1111100000000000) >> 11;
        let days = datepart & 0b0000000000011111;
        let months = (datepart & 0b0000000111100000) >> 5;
        let years = (datepart & 0b1111111000000000) >> 9;

        DateTime {
            year: years + 1980,
            month: months as u8,
            day: days as u8,
            hour: hours as u8,
            minute: minutes as u8,
            second: seconds as u8,
        }
    }

    /// Encodes the MS-DOS date part.
    pub const fn datepart(&self) -> u16 {
        (self.day as u16) | ((self.month as u16) << 5) | ((self.year - 1980) << 9)
    }

    /// Encodes the MS-DOS time part.
    pub const fn timepart(&self) -> u16 {
        ((self.second as u16) >> 1) | ((self.minute as u16) << 5) | ((self.hour as u16) << 11)
    }

    /// The current local time, truncated to MS-DOS's 2-second resolution.
    pub fn now() -> DateTime {
        let now = Local::now();
        DateTime {
            year: now.year() as u16,
            month: now.month() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
        }
    }

    /// Derives a [`DateTime`] from a file's last-modification time,
    /// interpreted in local time. Falls back to [`DateTime::now`] if the
    /// metadata is unavailable or the timestamp can't be represented.
    pub fn from_system_time(time: std::time::SystemTime) -> DateTime {
        let Ok(duration) = time.duration_since(std::time::UNIX_EPOCH) else {
            return DateTime::now();
        };
        let Some(dt) = Local.timestamp_opt(duration.as_secs() as i64, 0).single() else {
            return DateTime::now();
        };
        DateTime {
            year: dt.year() as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
        }
    }

    /// Renders as `"YYYY-MM-DD HH:MM:SS"`.
    pub fn formatted(&self) -> String {
        format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// DEFLATE compression level, mapped to the archive's four supported
/// presets. `Store` disables compression entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    Store,
    Faster,
    #[default]
    Medium,
    Better,
}

impl CompressionLevel {
    /// The numeric level minizip-derived tooling uses (`0`, `1`, `5`, `9`).
    pub const fn as_u8(self) -> u8 {
        match self {
            CompressionLevel::Store => 0,
            CompressionLevel::Faster => 1,
            CompressionLevel::Medium => 5,
            CompressionLevel::Better => 9,
        }
    }

    /// Parses the four valid numeric levels; any other value is an invalid
    /// flag combination.
    pub const fn from_u8(level: u8) -> Option<CompressionLevel> {
        match level {
            0 => Some(CompressionLevel::Store),
            1 => Some(CompressionLevel::Faster),
            5 => Some(CompressionLevel::Medium),
            9 => Some(CompressionLevel::Better),
            _ => None,
        }
    }

    pub(crate) fn to_flate2(self) -> flate2::Compression {
        flate2::Compression::new(match self {
            CompressionLevel::Store => 0,
            CompressionLevel::Faster => 1,
            CompressionLevel::Medium => 5,
            CompressionLevel::Better => 9,
        })
    }
}

/// Flags accepted by [`crate::write::Zipper::add`]. `SaveHierarchy` only
/// matters for the path-based convenience overload; the stream-based `add`
/// ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddFlags {
    pub level: CompressionLevel,
    pub save_hierarchy: bool,
}

impl Default for AddFlags {
    fn default() -> Self {
        AddFlags {
            level: CompressionLevel::Better,
            save_hierarchy: false,
        }
    }
}

impl AddFlags {
    pub const fn new(level: CompressionLevel) -> Self {
        AddFlags {
            level,
            save_hierarchy: false,
        }
    }

    pub const fn with_save_hierarchy(mut self, save_hierarchy: bool) -> Self {
        self.save_hierarchy = save_hierarchy;
        self
    }
}

/// What to do when extraction would replace an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    #[default]
    DoNotOverwrite,
    Overwrite,
}

/// How a [`crate::write::Zipper`] opens its backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Overwrite,
    Append,
}

/// One archive entry, as reported by the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub dos_date: u32,
    pub last_modified: DateTime,
    pub crc32: u32,
    pub is_encrypted: bool,
}

impl EntryInfo {
    /// Non-empty name is the only validity requirement.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }

    /// An entry name ending in `/` denotes a directory with no payload.
    pub fn is_directory(&self) -> bool {
        crate::path::has_trailing_slash(&self.name)
    }
}
