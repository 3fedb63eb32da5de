//! Simplified NTFS MFT scanner.
//!
//! Locates the MFT through the boot-sector cluster pointer, then scans
//! fixed-size records gated on the `FILE` signature. Filenames come from the
//! resident `$FILE_NAME` attribute; the in-use and directory flags from the
//! record header. Records without a recoverable name are skipped.

use super::{DirectoryEntry, DirectoryListing, FileAttribute};
use crate::reader::SliceReader;
use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

const MFT_RECORD_SIZE: usize = 1024;
const RECORD_SIGNATURE: &[u8] = b"FILE";

const RECORD_ATTR_OFFSET_FIELD: usize = 20;
const RECORD_FLAGS_FIELD: usize = 22;
const FLAG_IN_USE: u16 = 0x0001;
const FLAG_DIRECTORY: u16 = 0x0002;

const ATTR_TYPE_FILE_NAME: u32 = 0x30;
const ATTR_TYPE_END: u32 = 0xFFFF_FFFF;
/// Within a resident `$FILE_NAME` attribute: 24-byte attribute header plus
/// the fixed layout of the attribute body.
const FILE_NAME_REAL_SIZE_OFFSET: usize = 72;
const FILE_NAME_LENGTH_OFFSET: usize = 88;
const FILE_NAME_CHARS_OFFSET: usize = 90;
/// Runaway guard for garbage attribute chains.
const MAX_ATTRIBUTES: usize = 32;

/// Scans the MFT region of an NTFS volume image.
///
/// Deleted files (in-use flag clear) are reported alongside active ones.
/// Truncated input terminates the scan with whatever was recovered.
pub fn parse_ntfs_mft(buffer: &[u8]) -> DirectoryListing {
    let reader = SliceReader::little(buffer);
    let mut listing = DirectoryListing::default();

    let (Some(bytes_per_sector), Some(sectors_per_cluster), Some(mft_cluster)) =
        (reader.u16_at(11), reader.u8_at(13), reader.u32_at(48))
    else {
        return listing;
    };

    let cluster_size = u64::from(bytes_per_sector) * u64::from(sectors_per_cluster);
    let mft_offset = u64::from(mft_cluster) * cluster_size;
    debug!(mft_offset, cluster_size, "scanning MFT records");

    let mut base = mft_offset as usize;
    let mut record_number = 0u32;
    while let Some(record) = reader.bytes(base, MFT_RECORD_SIZE) {
        if &record[..RECORD_SIGNATURE.len()] == RECORD_SIGNATURE {
            if let Some(entry) = parse_file_record(record, record_number) {
                listing.push(entry);
            }
        }
        base += MFT_RECORD_SIZE;
        record_number += 1;
    }

    listing
}

fn parse_file_record(record: &[u8], record_number: u32) -> Option<DirectoryEntry> {
    let reader = SliceReader::little(record);

    let flags = reader.u16_at(RECORD_FLAGS_FIELD)?;
    let is_deleted = flags & FLAG_IN_USE == 0;
    let is_directory = flags & FLAG_DIRECTORY != 0;

    let mut attr_offset = reader.u16_at(RECORD_ATTR_OFFSET_FIELD)? as usize;
    let mut name = None;
    let mut size_bytes = 0u64;

    for _ in 0..MAX_ATTRIBUTES {
        let attr_type = reader.u32_at(attr_offset)?;
        if attr_type == ATTR_TYPE_END {
            break;
        }
        let attr_len = reader.u32_at(attr_offset + 4)? as usize;
        if attr_len == 0 {
            break;
        }

        if attr_type == ATTR_TYPE_FILE_NAME {
            if let Some(found) = read_file_name(&reader, attr_offset) {
                name = Some(found);
            }
            size_bytes = reader
                .u64_at(attr_offset + FILE_NAME_REAL_SIZE_OFFSET)
                .unwrap_or(0);
        }
        attr_offset += attr_len;
    }

    Some(DirectoryEntry {
        name: name?,
        size_bytes,
        is_directory,
        is_deleted,
        start_cluster: record_number,
        attributes: if is_directory {
            vec![FileAttribute::Directory]
        } else {
            Vec::new()
        },
    })
}

fn read_file_name(reader: &SliceReader<'_>, attr_offset: usize) -> Option<String> {
    let name_len = reader.u8_at(attr_offset + FILE_NAME_LENGTH_OFFSET)? as usize;
    if name_len == 0 {
        return None;
    }

    let raw = reader.bytes(attr_offset + FILE_NAME_CHARS_OFFSET, name_len * 2)?;
    let units: Vec<u16> = raw.chunks_exact(2).map(LittleEndian::read_u16).collect();
    let name = String::from_utf16_lossy(&units);
    (!name.is_empty()).then_some(name)
}
