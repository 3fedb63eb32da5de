//! Bounds-checked multi-byte reads over an immutable slice.
//!
//! The EXIF walker selects its byte order at runtime from the TIFF header
//! (`II`/`MM`); the FAT and NTFS readers are fixed little-endian. All of them
//! read through this type so a computed offset past the end of the buffer
//! yields `None` instead of a panic.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    order: Endianness,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8], order: Endianness) -> Self {
        Self { data, order }
    }

    pub fn little(data: &'a [u8]) -> Self {
        Self::new(data, Endianness::Little)
    }

    pub fn big(data: &'a [u8]) -> Self {
        Self::new(data, Endianness::Big)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn order(&self) -> Endianness {
        self.order
    }

    /// Returns `len` bytes starting at `offset`, or `None` if the range does
    /// not lie entirely within the slice.
    pub fn bytes(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        let end = offset.checked_add(len)?;
        self.data.get(offset..end)
    }

    pub fn u8_at(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    pub fn u16_at(&self, offset: usize) -> Option<u16> {
        let bytes = self.bytes(offset, 2)?;
        Some(match self.order {
            Endianness::Little => LittleEndian::read_u16(bytes),
            Endianness::Big => BigEndian::read_u16(bytes),
        })
    }

    pub fn u32_at(&self, offset: usize) -> Option<u32> {
        let bytes = self.bytes(offset, 4)?;
        Some(match self.order {
            Endianness::Little => LittleEndian::read_u32(bytes),
            Endianness::Big => BigEndian::read_u32(bytes),
        })
    }

    pub fn u64_at(&self, offset: usize) -> Option<u64> {
        let bytes = self.bytes(offset, 8)?;
        Some(match self.order {
            Endianness::Little => LittleEndian::read_u64(bytes),
            Endianness::Big => BigEndian::read_u64(bytes),
        })
    }

    /// Reads an unsigned rational (numerator, denominator) as stored in EXIF:
    /// two consecutive 32-bit values in the reader's byte order.
    pub fn urational_at(&self, offset: usize) -> Option<(u32, u32)> {
        let numerator = self.u32_at(offset)?;
        let denominator = self.u32_at(offset.checked_add(4)?)?;
        Some((numerator, denominator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn test_little_endian_reads() {
        let r = SliceReader::little(&DATA);
        assert_eq!(r.u16_at(0), Some(0x0201));
        assert_eq!(r.u32_at(0), Some(0x0403_0201));
        assert_eq!(r.u64_at(0), Some(0x0807_0605_0403_0201));
    }

    #[test]
    fn test_big_endian_reads() {
        let r = SliceReader::big(&DATA);
        assert_eq!(r.u16_at(0), Some(0x0102));
        assert_eq!(r.u32_at(4), Some(0x0506_0708));
    }

    #[test]
    fn test_out_of_bounds_is_none() {
        let r = SliceReader::little(&DATA);
        assert_eq!(r.u16_at(7), None);
        assert_eq!(r.u32_at(usize::MAX), None);
        assert_eq!(r.bytes(4, usize::MAX), None);
        assert_eq!(r.u8_at(8), None);
    }

    #[test]
    fn test_rational_read() {
        let r = SliceReader::little(&[0x0A, 0, 0, 0, 0x02, 0, 0, 0]);
        assert_eq!(r.urational_at(0), Some((10, 2)));
        assert_eq!(r.urational_at(1), None);
    }
}
