//! On-disk ZIP structures: magic numbers, local/central-directory headers,
//! and the (32-bit and ZIP64) end-of-central-directory records.
//!
//! Unlike the teacher's `repr(packed)` + raw-pointer `Block` trait, records
//! here are read and written field-by-field with `byteorder`: this crate's
//! much smaller size budget doesn't need the teacher's zero-copy trick, and
//! explicit reads keep every field's endianness visible at the call site.

use crate::result::{internal_error, opening_error, ZipperResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

pub const SIG_LOCAL_FILE_HEADER: u32 = 0x0403_4b50;
pub const SIG_CENTRAL_DIRECTORY_HEADER: u32 = 0x0201_4b50;
pub const SIG_EOCD: u32 = 0x0605_4b50;
pub const SIG_ZIP64_EOCD: u32 = 0x0606_4b50;
pub const SIG_ZIP64_EOCD_LOCATOR: u32 = 0x0706_4b50;

/// Above this size (or offset), a field no longer fits in 32 bits and the
/// entry needs its ZIP64 extra field.
pub const ZIP64_BYTES_THRESHOLD: u64 = u32::MAX as u64;
/// Above this many entries, the central directory itself needs ZIP64.
pub const ZIP64_ENTRY_THRESHOLD: usize = u16::MAX as usize;

pub const METHOD_STORE: u16 = 0;
pub const METHOD_DEFLATE: u16 = 8;

/// General-purpose bit flag: entry payload is encrypted.
pub const GPB_ENCRYPTED: u16 = 1 << 0;
/// General-purpose bit flag: filename/comment are UTF-8 (we always set it).
pub const GPB_UTF8: u16 = 1 << 11;

const ZIP64_EXTRA_TAG: u16 = 0x0001;

/// The version-needed-to-extract value this crate writes: 4.5 covers ZIP64,
/// which is the newest feature this archive format uses.
pub const VERSION_NEEDED: u16 = 45;

/// A fully decoded central-directory entry: everything needed to both
/// describe an entry to a caller and re-serialize it (for ZIP64 and for
/// carrying old entries forward across an `Append` reopen).
#[derive(Debug, Clone)]
pub struct CentralDirEntry {
    pub name: String,
    pub method: u16,
    pub flags: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub local_header_offset: u64,
}

impl CentralDirEntry {
    pub(crate) fn needs_zip64(&self) -> bool {
        self.compressed_size > ZIP64_BYTES_THRESHOLD
            || self.uncompressed_size > ZIP64_BYTES_THRESHOLD
            || self.local_header_offset > ZIP64_BYTES_THRESHOLD
    }
}

/// Writes the local file header plus filename that precedes an entry's
/// compressed data.
pub fn write_local_file_header<W: Write>(w: &mut W, entry: &CentralDirEntry) -> io::Result<()> {
    let zip64 = entry.needs_zip64();
    let name_bytes = entry.name.as_bytes();
    let extra_len: u16 = if zip64 { 20 } else { 0 };

    w.write_u32::<LittleEndian>(SIG_LOCAL_FILE_HEADER)?;
    w.write_u16::<LittleEndian>(VERSION_NEEDED)?;
    w.write_u16::<LittleEndian>(entry.flags)?;
    w.write_u16::<LittleEndian>(entry.method)?;
    w.write_u16::<LittleEndian>(entry.mod_time)?;
    w.write_u16::<LittleEndian>(entry.mod_date)?;
    w.write_u32::<LittleEndian>(entry.crc32)?;
    w.write_u32::<LittleEndian>(clamp32(entry.compressed_size, zip64))?;
    w.write_u32::<LittleEndian>(clamp32(entry.uncompressed_size, zip64))?;
    w.write_u16::<LittleEndian>(name_bytes.len() as u16)?;
    w.write_u16::<LittleEndian>(extra_len)?;
    w.write_all(name_bytes)?;
    if zip64 {
        write_zip64_extra(w, entry.uncompressed_size, entry.compressed_size, None)?;
    }
    Ok(())
}

fn clamp32(value: u64, zip64: bool) -> u32 {
    if zip64 {
        u32::MAX
    } else {
        value as u32
    }
}

fn write_zip64_extra<W: Write>(
    w: &mut W,
    uncompressed_size: u64,
    compressed_size: u64,
    local_header_offset: Option<u64>,
) -> io::Result<()> {
    let field_count = 2 + if local_header_offset.is_some() { 1 } else { 0 };
    let data_size = field_count * 8;
    w.write_u16::<LittleEndian>(ZIP64_EXTRA_TAG)?;
    w.write_u16::<LittleEndian>(data_size as u16)?;
    w.write_u64::<LittleEndian>(uncompressed_size)?;
    w.write_u64::<LittleEndian>(compressed_size)?;
    if let Some(offset) = local_header_offset {
        w.write_u64::<LittleEndian>(offset)?;
    }
    Ok(())
}

/// Writes one central-directory header (the fixed record plus filename and,
/// when needed, a ZIP64 extra field).
pub fn write_central_directory_header<W: Write>(
    w: &mut W,
    entry: &CentralDirEntry,
) -> io::Result<()> {
    let zip64 = entry.needs_zip64();
    let name_bytes = entry.name.as_bytes();
    let extra_len: u16 = if zip64 { 28 } else { 0 };

    w.write_u32::<LittleEndian>(SIG_CENTRAL_DIRECTORY_HEADER)?;
    w.write_u16::<LittleEndian>(VERSION_NEEDED)?; // version made by
    w.write_u16::<LittleEndian>(VERSION_NEEDED)?; // version needed
    w.write_u16::<LittleEndian>(entry.flags)?;
    w.write_u16::<LittleEndian>(entry.method)?;
    w.write_u16::<LittleEndian>(entry.mod_time)?;
    w.write_u16::<LittleEndian>(entry.mod_date)?;
    w.write_u32::<LittleEndian>(entry.crc32)?;
    w.write_u32::<LittleEndian>(clamp32(entry.compressed_size, zip64))?;
    w.write_u32::<LittleEndian>(clamp32(entry.uncompressed_size, zip64))?;
    w.write_u16::<LittleEndian>(name_bytes.len() as u16)?;
    w.write_u16::<LittleEndian>(extra_len)?;
    w.write_u16::<LittleEndian>(0)?; // comment length
    w.write_u16::<LittleEndian>(0)?; // disk number start
    w.write_u16::<LittleEndian>(0)?; // internal file attributes
    w.write_u32::<LittleEndian>(0o100644 << 16)?; // external attributes: regular file, rw-r--r--
    w.write_u32::<LittleEndian>(clamp32(entry.local_header_offset, zip64))?;
    w.write_all(name_bytes)?;
    if zip64 {
        write_zip64_extra(
            w,
            entry.uncompressed_size,
            entry.compressed_size,
            Some(entry.local_header_offset),
        )?;
    }
    Ok(())
}

/// Reads one central-directory header at the reader's current position.
pub fn read_central_directory_header<R: Read>(r: &mut R) -> ZipperResult<CentralDirEntry> {
    let signature = r.read_u32::<LittleEndian>()?;
    if signature != SIG_CENTRAL_DIRECTORY_HEADER {
        return internal_error(format!(
            "expected central directory header signature, found {signature:#010x}"
        ));
    }
    let _version_made_by = r.read_u16::<LittleEndian>()?;
    let _version_needed = r.read_u16::<LittleEndian>()?;
    let flags = r.read_u16::<LittleEndian>()?;
    let method = r.read_u16::<LittleEndian>()?;
    let mod_time = r.read_u16::<LittleEndian>()?;
    let mod_date = r.read_u16::<LittleEndian>()?;
    let crc32 = r.read_u32::<LittleEndian>()?;
    let mut compressed_size = r.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = r.read_u32::<LittleEndian>()? as u64;
    let name_len = r.read_u16::<LittleEndian>()?;
    let extra_len = r.read_u16::<LittleEndian>()?;
    let comment_len = r.read_u16::<LittleEndian>()?;
    let _disk_number_start = r.read_u16::<LittleEndian>()?;
    let _internal_attrs = r.read_u16::<LittleEndian>()?;
    let _external_attrs = r.read_u32::<LittleEndian>()?;
    let mut local_header_offset = r.read_u32::<LittleEndian>()? as u64;

    let mut name_bytes = vec![0u8; name_len as usize];
    r.read_exact(&mut name_bytes)?;
    let name = String::from_utf8(name_bytes)
        .map_err(|_| crate::result::ZipperError::InternalError("entry name is not UTF-8".into()))?;

    let mut extra = vec![0u8; extra_len as usize];
    r.read_exact(&mut extra)?;
    apply_zip64_extra(
        &extra,
        &mut uncompressed_size,
        &mut compressed_size,
        &mut local_header_offset,
    )?;

    let mut comment = vec![0u8; comment_len as usize];
    r.read_exact(&mut comment)?;

    Ok(CentralDirEntry {
        name,
        method,
        flags,
        mod_time,
        mod_date,
        crc32,
        compressed_size,
        uncompressed_size,
        local_header_offset,
    })
}

/// Reads the ZIP64 extended-information extra field, filling in whichever
/// 32-bit sentinel (`0xFFFFFFFF`) fields triggered its presence. Fields
/// appear in the fixed order uncompressed size, compressed size, local
/// header offset, disk number -- only the ones that were sentinels in the
/// fixed-size record are present.
fn apply_zip64_extra(
    extra: &[u8],
    uncompressed_size: &mut u64,
    compressed_size: &mut u64,
    local_header_offset: &mut u64,
) -> ZipperResult<()> {
    let mut cursor = extra;
    while cursor.len() >= 4 {
        let tag = u16::from_le_bytes([cursor[0], cursor[1]]);
        let size = u16::from_le_bytes([cursor[2], cursor[3]]) as usize;
        if cursor.len() < 4 + size {
            break;
        }
        let data = &cursor[4..4 + size];
        if tag == ZIP64_EXTRA_TAG {
            let mut r = data;
            if *uncompressed_size == ZIP64_BYTES_THRESHOLD && r.len() >= 8 {
                *uncompressed_size = r.read_u64::<LittleEndian>().unwrap();
            }
            if *compressed_size == ZIP64_BYTES_THRESHOLD && r.len() >= 8 {
                *compressed_size = r.read_u64::<LittleEndian>().unwrap();
            }
            if *local_header_offset == ZIP64_BYTES_THRESHOLD && r.len() >= 8 {
                *local_header_offset = r.read_u64::<LittleEndian>().unwrap();
            }
        }
        cursor = &cursor[4 + size..];
    }
    Ok(())
}

/// Writes the 32-bit end-of-central-directory record.
pub fn write_eocd<W: Write>(w: &mut W, entry_count: u16, cd_size: u32, cd_offset: u32) -> io::Result<()> {
    w.write_u32::<LittleEndian>(SIG_EOCD)?;
    w.write_u16::<LittleEndian>(0)?; // disk number
    w.write_u16::<LittleEndian>(0)?; // disk with central directory
    w.write_u16::<LittleEndian>(entry_count)?;
    w.write_u16::<LittleEndian>(entry_count)?;
    w.write_u32::<LittleEndian>(cd_size)?;
    w.write_u32::<LittleEndian>(cd_offset)?;
    w.write_u16::<LittleEndian>(0)?; // zip file comment length
    Ok(())
}

/// Writes the ZIP64 end-of-central-directory record and its locator.
pub fn write_zip64_eocd<W: Write>(
    w: &mut W,
    entry_count: u64,
    cd_size: u64,
    cd_offset: u64,
    zip64_eocd_offset: u64,
) -> io::Result<()> {
    w.write_u32::<LittleEndian>(SIG_ZIP64_EOCD)?;
    w.write_u64::<LittleEndian>(44)?; // size of remaining record
    w.write_u16::<LittleEndian>(VERSION_NEEDED)?;
    w.write_u16::<LittleEndian>(VERSION_NEEDED)?;
    w.write_u32::<LittleEndian>(0)?; // disk number
    w.write_u32::<LittleEndian>(0)?; // disk with central directory
    w.write_u64::<LittleEndian>(entry_count)?;
    w.write_u64::<LittleEndian>(entry_count)?;
    w.write_u64::<LittleEndian>(cd_size)?;
    w.write_u64::<LittleEndian>(cd_offset)?;

    w.write_u32::<LittleEndian>(SIG_ZIP64_EOCD_LOCATOR)?;
    w.write_u32::<LittleEndian>(0)?; // disk with zip64 eocd
    w.write_u64::<LittleEndian>(zip64_eocd_offset)?;
    w.write_u32::<LittleEndian>(1)?; // total number of disks
    Ok(())
}

/// A parsed 32-bit EOCD record, before ZIP64 upgrade is applied.
pub struct Eocd {
    pub entry_count: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

/// Finds and parses the end-of-central-directory record (scanning backward
/// for its signature, since an optional comment of unknown length may
/// follow it), transparently following the ZIP64 locator when the 32-bit
/// record reports the `0xFFFF`/`0xFFFFFFFF` sentinel values.
pub fn find_eocd(data: &[u8]) -> ZipperResult<Eocd> {
    const EOCD_MIN_LEN: usize = 22;
    if data.len() < EOCD_MIN_LEN {
        return opening_error("archive is too small to contain an end-of-central-directory record");
    }

    // The comment field is at most 0xFFFF bytes, so search only the tail.
    let search_start = data.len().saturating_sub(EOCD_MIN_LEN + u16::MAX as usize);
    let haystack = &data[search_start..];
    let sig_bytes = SIG_EOCD.to_le_bytes();
    let Some(pos) = memchr::memmem::rfind(haystack, &sig_bytes) else {
        return opening_error("not a zip file: no end-of-central-directory record found");
    };
    let mut r = &haystack[pos..];
    let _sig = r.read_u32::<LittleEndian>()?;
    let _disk_number = r.read_u16::<LittleEndian>()?;
    let _disk_with_cd = r.read_u16::<LittleEndian>()?;
    let _entries_this_disk = r.read_u16::<LittleEndian>()?;
    let entry_count_16 = r.read_u16::<LittleEndian>()?;
    let cd_size_32 = r.read_u32::<LittleEndian>()?;
    let cd_offset_32 = r.read_u32::<LittleEndian>()?;

    let needs_zip64 = entry_count_16 == u16::MAX || cd_size_32 == u32::MAX || cd_offset_32 == u32::MAX;
    if !needs_zip64 {
        return Ok(Eocd {
            entry_count: entry_count_16 as u64,
            cd_size: cd_size_32 as u64,
            cd_offset: cd_offset_32 as u64,
        });
    }

    let eocd_absolute_pos = search_start + pos;
    find_zip64_eocd(data, eocd_absolute_pos)
}

fn find_zip64_eocd(data: &[u8], eocd_pos: usize) -> ZipperResult<Eocd> {
    const LOCATOR_LEN: usize = 20;
    if eocd_pos < LOCATOR_LEN {
        return opening_error("zip64 locator would start before the archive");
    }
    let locator_pos = eocd_pos - LOCATOR_LEN;
    let mut r = &data[locator_pos..eocd_pos];
    let signature = r.read_u32::<LittleEndian>()?;
    if signature != SIG_ZIP64_EOCD_LOCATOR {
        return opening_error("zip64 end-of-central-directory locator not found");
    }
    let _disk_with_zip64_eocd = r.read_u32::<LittleEndian>()?;
    let zip64_eocd_offset = r.read_u64::<LittleEndian>()?;

    let offset = zip64_eocd_offset as usize;
    if offset + 56 > data.len() {
        return opening_error("zip64 end-of-central-directory record is out of bounds");
    }
    let mut r = &data[offset..];
    let signature = r.read_u32::<LittleEndian>()?;
    if signature != SIG_ZIP64_EOCD {
        return opening_error("zip64 end-of-central-directory record signature mismatch");
    }
    let _record_size = r.read_u64::<LittleEndian>()?;
    let _version_made_by = r.read_u16::<LittleEndian>()?;
    let _version_needed = r.read_u16::<LittleEndian>()?;
    let _disk_number = r.read_u32::<LittleEndian>()?;
    let _disk_with_cd = r.read_u32::<LittleEndian>()?;
    let _entries_this_disk = r.read_u64::<LittleEndian>()?;
    let entry_count = r.read_u64::<LittleEndian>()?;
    let cd_size = r.read_u64::<LittleEndian>()?;
    let cd_offset = r.read_u64::<LittleEndian>()?;

    Ok(Eocd {
        entry_count,
        cd_size,
        cd_offset,
    })
}

/// Reads the fixed part of the local file header at `local_header_offset`
/// (re-reading the filename and extra field lengths there rather than
/// trusting the central directory's copies, since they're defined
/// independently) and returns the offset where the entry's payload begins.
pub fn local_file_data_offset(buffer: &[u8], local_header_offset: u64) -> ZipperResult<u64> {
    const FIXED_LEN: u64 = 30;
    let offset = local_header_offset as usize;
    if offset + FIXED_LEN as usize > buffer.len() {
        return internal_error("local file header is out of bounds");
    }
    let mut r = &buffer[offset..];
    let signature = r.read_u32::<LittleEndian>()?;
    if signature != SIG_LOCAL_FILE_HEADER {
        return internal_error(format!(
            "expected local file header signature, found {signature:#010x}"
        ));
    }
    let mut r = &buffer[offset + 26..];
    let name_len = r.read_u16::<LittleEndian>()? as u64;
    let extra_len = r.read_u16::<LittleEndian>()? as u64;
    Ok(local_header_offset + FIXED_LEN + name_len + extra_len)
}

/// Locates the end-of-central-directory record and decodes every entry it
/// points at. Used both by the reader (to enumerate an archive) and by the
/// writer (to carry old entries forward across an `Append` reopen).
pub fn read_central_directory(data: &[u8]) -> ZipperResult<(Eocd, Vec<CentralDirEntry>)> {
    let eocd = find_eocd(data)?;
    let start = eocd.cd_offset as usize;
    let end = start + eocd.cd_size as usize;
    if end > data.len() {
        return opening_error("central directory extends past the end of the archive");
    }
    let mut cursor = &data[start..end];
    let mut entries = Vec::with_capacity(eocd.entry_count as usize);
    for _ in 0..eocd.entry_count {
        entries.push(read_central_directory_header(&mut cursor)?);
    }
    Ok((eocd, entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(name: &str) -> CentralDirEntry {
        CentralDirEntry {
            name: name.to_string(),
            method: METHOD_STORE,
            flags: 0,
            mod_time: 0,
            mod_date: 0,
            crc32: 0xDEAD_BEEF,
            compressed_size: 12,
            uncompressed_size: 12,
            local_header_offset: 0,
        }
    }

    #[test]
    fn central_directory_header_round_trips() {
        let entry = sample_entry("hello.txt");
        let mut buf = Vec::new();
        write_central_directory_header(&mut buf, &entry).unwrap();
        let mut cursor = &buf[..];
        let parsed = read_central_directory_header(&mut cursor).unwrap();
        assert_eq!(parsed.name, "hello.txt");
        assert_eq!(parsed.crc32, 0xDEAD_BEEF);
        assert_eq!(parsed.compressed_size, 12);
    }

    #[test]
    fn zip64_extra_round_trips_large_sizes() {
        let mut entry = sample_entry("big.bin");
        entry.compressed_size = ZIP64_BYTES_THRESHOLD + 10;
        entry.uncompressed_size = ZIP64_BYTES_THRESHOLD + 20;
        entry.local_header_offset = ZIP64_BYTES_THRESHOLD + 30;
        assert!(entry.needs_zip64());

        let mut buf = Vec::new();
        write_central_directory_header(&mut buf, &entry).unwrap();
        let mut cursor = &buf[..];
        let parsed = read_central_directory_header(&mut cursor).unwrap();
        assert_eq!(parsed.compressed_size, entry.compressed_size);
        assert_eq!(parsed.uncompressed_size, entry.uncompressed_size);
        assert_eq!(parsed.local_header_offset, entry.local_header_offset);
    }

    #[test]
    fn find_eocd_locates_record_with_trailing_comment() {
        let entry = sample_entry("a.txt");
        let mut buf = Vec::new();
        write_central_directory_header(&mut buf, &entry).unwrap();
        let cd_size = buf.len() as u32;
        write_eocd(&mut buf, 1, cd_size, 0).unwrap();

        let eocd = find_eocd(&buf).unwrap();
        assert_eq!(eocd.entry_count, 1);
        assert_eq!(eocd.cd_size, cd_size as u64);
        assert_eq!(eocd.cd_offset, 0);
    }
}
