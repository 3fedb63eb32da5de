//! FAT root-directory walker.
//!
//! Decodes the BIOS Parameter Block fields needed to locate the root
//! directory region, then iterates its 32-byte entries, splitting active
//! from deleted records.

use super::{DirectoryEntry, DirectoryListing, FileAttribute};
use crate::reader::SliceReader;
use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

const DIR_ENTRY_SIZE: usize = 32;
/// First entry byte: directory terminator.
const ENTRY_END: u8 = 0x00;
/// First entry byte: deletion marker overwriting the name's first character.
const ENTRY_DELETED: u8 = 0xE5;
/// The deletion marker destroys the first character; it is reported as this
/// placeholder.
const DELETED_NAME_PLACEHOLDER: &str = "_";

const ATTR_READ_ONLY: u8 = 0x01;
const ATTR_HIDDEN: u8 = 0x02;
const ATTR_SYSTEM: u8 = 0x04;
const ATTR_VOLUME_LABEL: u8 = 0x08;
const ATTR_DIRECTORY: u8 = 0x10;
const ATTR_ARCHIVE: u8 = 0x20;
/// Long-file-name entries set all four low attribute bits and carry no 8.3
/// record.
const ATTR_LFN: u8 = 0x0F;

/// Walks the root directory of a FAT volume image.
///
/// Returns active and deleted entries separately. Truncated input terminates
/// the walk with whatever was recovered; it never fails.
pub fn parse_fat_directory(buffer: &[u8]) -> DirectoryListing {
    let reader = SliceReader::little(buffer);
    let mut listing = DirectoryListing::default();

    let (
        Some(bytes_per_sector),
        Some(_sectors_per_cluster),
        Some(reserved_sectors),
        Some(num_fats),
        Some(root_entry_count),
        Some(sectors_per_fat),
    ) = (
        reader.u16_at(11),
        reader.u8_at(13),
        reader.u16_at(14),
        reader.u8_at(16),
        reader.u16_at(17),
        reader.u16_at(22),
    )
    else {
        return listing;
    };

    let root_offset = (u64::from(reserved_sectors)
        + u64::from(num_fats) * u64::from(sectors_per_fat))
        * u64::from(bytes_per_sector);

    for index in 0..root_entry_count as usize {
        let base = root_offset as usize + index * DIR_ENTRY_SIZE;
        let Some(raw) = reader.bytes(base, DIR_ENTRY_SIZE) else {
            debug!(
                recovered = listing.len(),
                "root directory truncated, stopping walk"
            );
            break;
        };

        let first = raw[0];
        if first == ENTRY_END {
            break;
        }

        let attributes = raw[11];
        if attributes & ATTR_LFN == ATTR_LFN {
            continue;
        }
        if attributes & ATTR_VOLUME_LABEL != 0 {
            continue;
        }

        let is_deleted = first == ENTRY_DELETED;
        let cluster_high = u32::from(LittleEndian::read_u16(&raw[20..22]));
        let cluster_low = u32::from(LittleEndian::read_u16(&raw[26..28]));

        listing.push(DirectoryEntry {
            name: short_name(raw, is_deleted),
            size_bytes: u64::from(LittleEndian::read_u32(&raw[28..32])),
            is_directory: attributes & ATTR_DIRECTORY != 0,
            is_deleted,
            start_cluster: cluster_high << 16 | cluster_low,
            attributes: decode_attributes(attributes),
        });
    }

    listing
}

/// Reconstructs an 8.3 name from the raw entry. For deleted entries the
/// first character is the deletion marker and is replaced by a placeholder.
fn short_name(raw: &[u8], deleted: bool) -> String {
    let decode = |bytes: &[u8]| -> String {
        bytes
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '?'
                }
            })
            .collect::<String>()
            .trim_end()
            .to_string()
    };

    let mut base = decode(&raw[..8]);
    if deleted && !base.is_empty() {
        base.replace_range(..1, DELETED_NAME_PLACEHOLDER);
    }

    let extension = decode(&raw[8..11]);
    if extension.is_empty() {
        base
    } else {
        format!("{base}.{extension}")
    }
}

fn decode_attributes(attributes: u8) -> Vec<FileAttribute> {
    const FLAGS: [(u8, FileAttribute); 5] = [
        (ATTR_READ_ONLY, FileAttribute::ReadOnly),
        (ATTR_HIDDEN, FileAttribute::Hidden),
        (ATTR_SYSTEM, FileAttribute::System),
        (ATTR_DIRECTORY, FileAttribute::Directory),
        (ATTR_ARCHIVE, FileAttribute::Archive),
    ];

    FLAGS
        .iter()
        .filter(|(bit, _)| attributes & bit != 0)
        .map(|&(_, attribute)| attribute)
        .collect()
}
