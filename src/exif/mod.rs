//! EXIF metadata extraction from JPEG streams.
//!
//! Walks the JPEG marker segments for an APP1 `Exif\0\0` payload, then the
//! TIFF structure inside it: byte order from the `II`/`MM` header, IFD0 for
//! camera fields and the GPS/EXIF sub-IFD pointers, the GPS sub-IFD for
//! coordinates. Forensic input is untrusted, so any malformed or truncated
//! structure degrades to a partial record; the only hard error is a buffer
//! that is not a JPEG stream at all.

mod gps;

pub use gps::{GpsCoordinate, GpsData, Hemisphere};

use crate::error::ExifError;
use crate::reader::{Endianness, SliceReader};
use serde::Serialize;
use tracing::trace;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const MARKER_APP1: u8 = 0xE1;
const MARKER_SOS: u8 = 0xDA;
const EXIF_HEADER: &[u8] = b"Exif\x00\x00";
const TIFF_MAGIC: u16 = 42;

/// ASCII tag values are capped at this many bytes.
const MAX_STRING_BYTES: usize = 100;

// IFD0 tags.
const TAG_MAKE: u16 = 0x010F;
const TAG_MODEL: u16 = 0x0110;
const TAG_SOFTWARE: u16 = 0x0131;
const TAG_DATETIME: u16 = 0x0132;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_GPS_IFD: u16 = 0x8825;

// EXIF sub-IFD tags.
const TAG_DATETIME_ORIGINAL: u16 = 0x9003;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExifRecord {
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub software: Option<String>,
    pub date_time: Option<String>,
    pub gps: Option<GpsData>,
}

impl ExifRecord {
    /// True iff both latitude and longitude decoded.
    pub fn has_gps(&self) -> bool {
        self.gps
            .as_ref()
            .is_some_and(|gps| gps.latitude.is_some() && gps.longitude.is_some())
    }

    pub fn is_empty(&self) -> bool {
        *self == ExifRecord::default()
    }
}

/// Extracts camera metadata and GPS coordinates from a JPEG buffer.
///
/// Fails only when the buffer does not start with the SOI marker. A JPEG
/// without an EXIF segment, or with one that is malformed partway through,
/// yields a partial (possibly empty) record.
pub fn extract_exif(buffer: &[u8]) -> Result<ExifRecord, ExifError> {
    if buffer.len() < 2 || buffer[..2] != JPEG_SOI {
        return Err(ExifError::NotJpeg);
    }

    let mut record = ExifRecord::default();
    if let Some(tiff) = find_exif_payload(buffer) {
        parse_tiff(tiff, &mut record);
    }
    Ok(record)
}

/// Scans marker segments from offset 2 and returns the TIFF block of the
/// first APP1 segment carrying the EXIF header. Stops at the first byte that
/// is not a marker, at SOS (entropy-coded data follows, no EXIF past it), or
/// at a truncated segment.
fn find_exif_payload(buffer: &[u8]) -> Option<&[u8]> {
    let mut pos = 2usize;

    loop {
        let prefix = *buffer.get(pos)?;
        if prefix != 0xFF {
            trace!(offset = pos, "non-marker byte, stopping segment scan");
            return None;
        }
        let marker = *buffer.get(pos + 1)?;

        // Fill byte before a marker.
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // RST0-RST7, SOI, EOI carry no length field.
        if matches!(marker, 0xD0..=0xD9) {
            pos += 2;
            continue;
        }
        if marker == MARKER_SOS {
            return None;
        }

        let len_hi = *buffer.get(pos + 2)?;
        let len_lo = *buffer.get(pos + 3)?;
        let seg_len = u16::from_be_bytes([len_hi, len_lo]) as usize;
        if seg_len < 2 {
            return None;
        }

        let payload = buffer.get(pos + 4..pos + 2 + seg_len)?;
        if marker == MARKER_APP1 && payload.starts_with(EXIF_HEADER) {
            return Some(&payload[EXIF_HEADER.len()..]);
        }
        pos += 2 + seg_len;
    }
}

fn parse_tiff(tiff: &[u8], record: &mut ExifRecord) {
    let order = match tiff.get(..2) {
        Some([0x49, 0x49]) => Endianness::Little,
        Some([0x4D, 0x4D]) => Endianness::Big,
        _ => return,
    };
    let reader = SliceReader::new(tiff, order);

    if reader.u16_at(2) != Some(TIFF_MAGIC) {
        trace!("TIFF magic mismatch, skipping EXIF block");
        return;
    }
    let Some(ifd0_offset) = reader.u32_at(4) else {
        return;
    };

    let mut exif_ifd = None;
    let mut gps_ifd = None;

    for entry in ifd_entries(&reader, ifd0_offset as usize) {
        match entry.tag {
            TAG_MAKE => record.camera_make = read_ascii(&reader, &entry),
            TAG_MODEL => record.camera_model = read_ascii(&reader, &entry),
            TAG_SOFTWARE => record.software = read_ascii(&reader, &entry),
            TAG_DATETIME => record.date_time = read_ascii(&reader, &entry),
            TAG_EXIF_IFD => exif_ifd = reader.u32_at(entry.value_offset),
            TAG_GPS_IFD => gps_ifd = reader.u32_at(entry.value_offset),
            _ => {}
        }
    }

    // DateTimeOriginal from the EXIF sub-IFD backfills a missing IFD0
    // DateTime.
    if record.date_time.is_none() {
        if let Some(offset) = exif_ifd {
            for entry in ifd_entries(&reader, offset as usize) {
                if entry.tag == TAG_DATETIME_ORIGINAL {
                    record.date_time = read_ascii(&reader, &entry);
                }
            }
        }
    }

    if let Some(offset) = gps_ifd {
        let data = gps::parse_gps_ifd(&reader, offset as usize);
        if data != GpsData::default() {
            record.gps = Some(data);
        }
    }
}

/// One 12-byte IFD entry. `value_offset` is the position of the 4-byte
/// value/offset field within the TIFF block, not the value itself.
struct IfdEntry {
    tag: u16,
    count: u32,
    value_offset: usize,
}

/// Decodes the entry table of the IFD at `offset`. Entries that run past the
/// end of the block are dropped; a bogus count is cut short at the boundary.
fn ifd_entries(reader: &SliceReader<'_>, offset: usize) -> Vec<IfdEntry> {
    let Some(count) = reader.u16_at(offset) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for index in 0..count as usize {
        let base = offset + 2 + index * 12;
        let (Some(tag), Some(value_count)) = (reader.u16_at(base), reader.u32_at(base + 4)) else {
            trace!(offset, index, "IFD truncated mid-entry");
            break;
        };
        entries.push(IfdEntry {
            tag,
            count: value_count,
            value_offset: base + 8,
        });
    }
    entries
}

/// Reads an ASCII tag value: inline when it fits the 4-byte value field,
/// otherwise through the offset stored there. Truncated at the first NUL and
/// capped at `MAX_STRING_BYTES`.
fn read_ascii(reader: &SliceReader<'_>, entry: &IfdEntry) -> Option<String> {
    let len = (entry.count as usize).min(MAX_STRING_BYTES);
    let raw = if entry.count <= 4 {
        reader.bytes(entry.value_offset, len)?
    } else {
        let location = reader.u32_at(entry.value_offset)? as usize;
        reader.bytes(location, len)?
    };

    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let text = String::from_utf8_lossy(&raw[..end]).trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_jpeg() {
        assert_eq!(extract_exif(b"not a jpeg"), Err(ExifError::NotJpeg));
        assert_eq!(extract_exif(&[]), Err(ExifError::NotJpeg));
        assert_eq!(extract_exif(&[0xFF]), Err(ExifError::NotJpeg));
    }

    #[test]
    fn test_jpeg_without_exif_yields_empty_record() {
        // SOI + APP0 (JFIF) + EOI.
        let buffer = [
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x07, b'J', b'F', b'I', b'F', 0x00, 0xFF, 0xD9,
        ];
        let record = extract_exif(&buffer).unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_garbage_after_soi_yields_empty_record() {
        let buffer = [0xFF, 0xD8, 0x00, 0x11, 0x22, 0x33];
        let record = extract_exif(&buffer).unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_truncated_segment_length_yields_empty_record() {
        // APP1 claims 0x4000 bytes the buffer does not have.
        let buffer = [0xFF, 0xD8, 0xFF, 0xE1, 0x40, 0x00, b'E', b'x'];
        let record = extract_exif(&buffer).unwrap();
        assert!(record.is_empty());
    }
}
