//! GPS sub-IFD decoding and coordinate conversion.

use super::{IfdEntry, ifd_entries, read_ascii};
use crate::reader::SliceReader;
use serde::Serialize;

const TAG_LATITUDE_REF: u16 = 0x0001;
const TAG_LATITUDE: u16 = 0x0002;
const TAG_LONGITUDE_REF: u16 = 0x0003;
const TAG_LONGITUDE: u16 = 0x0004;
const TAG_ALTITUDE: u16 = 0x0006;
const TAG_TIMESTAMP: u16 = 0x0007;
const TAG_IMG_DIRECTION: u16 = 0x0011;
const TAG_DATE_STAMP: u16 = 0x001D;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    fn from_ref(reference: &str) -> Option<Self> {
        match reference.trim() {
            "N" => Some(Hemisphere::North),
            "S" => Some(Hemisphere::South),
            "E" => Some(Hemisphere::East),
            "W" => Some(Hemisphere::West),
            _ => None,
        }
    }

    /// South and West negate the decimal coordinate.
    pub fn sign(&self) -> f64 {
        match self {
            Hemisphere::North | Hemisphere::East => 1.0,
            Hemisphere::South | Hemisphere::West => -1.0,
        }
    }
}

/// A coordinate as stored on disk: three sexagesimal components plus the
/// hemisphere reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsCoordinate {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
    pub hemisphere: Hemisphere,
}

impl GpsCoordinate {
    pub fn decimal_degrees(&self) -> f64 {
        self.hemisphere.sign() * (self.degrees + self.minutes / 60.0 + self.seconds / 3600.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpsData {
    /// Signed decimal degrees, negative in the southern hemisphere.
    pub latitude: Option<f64>,
    /// Signed decimal degrees, negative in the western hemisphere.
    pub longitude: Option<f64>,
    pub altitude_meters: Option<f64>,
    /// `HH:MM:SS`, UTC.
    pub timestamp_utc: Option<String>,
    /// `YYYY-MM-DD`.
    pub date_stamp: Option<String>,
    pub image_direction_degrees: Option<f64>,
}

pub(super) fn parse_gps_ifd(reader: &SliceReader<'_>, offset: usize) -> GpsData {
    let mut data = GpsData::default();
    let mut latitude_ref = None;
    let mut latitude = None;
    let mut longitude_ref = None;
    let mut longitude = None;

    for entry in ifd_entries(reader, offset) {
        match entry.tag {
            TAG_LATITUDE_REF => {
                latitude_ref = read_ascii(reader, &entry).as_deref().and_then(Hemisphere::from_ref);
            }
            TAG_LATITUDE => latitude = read_dms(reader, &entry),
            TAG_LONGITUDE_REF => {
                longitude_ref =
                    read_ascii(reader, &entry).as_deref().and_then(Hemisphere::from_ref);
            }
            TAG_LONGITUDE => longitude = read_dms(reader, &entry),
            TAG_ALTITUDE => data.altitude_meters = read_rational(reader, &entry),
            TAG_TIMESTAMP => data.timestamp_utc = read_timestamp(reader, &entry),
            TAG_IMG_DIRECTION => data.image_direction_degrees = read_rational(reader, &entry),
            TAG_DATE_STAMP => data.date_stamp = read_date_stamp(reader, &entry),
            _ => {}
        }
    }

    data.latitude = coordinate(latitude, latitude_ref.unwrap_or(Hemisphere::North));
    data.longitude = coordinate(longitude, longitude_ref.unwrap_or(Hemisphere::East));
    data
}

fn coordinate(dms: Option<[f64; 3]>, hemisphere: Hemisphere) -> Option<f64> {
    dms.map(|[degrees, minutes, seconds]| {
        GpsCoordinate {
            degrees,
            minutes,
            seconds,
            hemisphere,
        }
        .decimal_degrees()
    })
}

/// Reads `expect` consecutive rationals through the entry's offset field.
/// A zero denominator anywhere poisons the whole read.
fn read_rationals(
    reader: &SliceReader<'_>,
    entry: &IfdEntry,
    expect: usize,
) -> Option<Vec<f64>> {
    if (entry.count as usize) < expect {
        return None;
    }
    // Rationals are 8 bytes each and never fit the inline value field.
    let location = reader.u32_at(entry.value_offset)? as usize;
    (0..expect)
        .map(|index| {
            let (numerator, denominator) = reader.urational_at(location + index * 8)?;
            (denominator != 0).then(|| f64::from(numerator) / f64::from(denominator))
        })
        .collect()
}

fn read_dms(reader: &SliceReader<'_>, entry: &IfdEntry) -> Option<[f64; 3]> {
    let values = read_rationals(reader, entry, 3)?;
    Some([values[0], values[1], values[2]])
}

fn read_rational(reader: &SliceReader<'_>, entry: &IfdEntry) -> Option<f64> {
    read_rationals(reader, entry, 1).map(|values| values[0])
}

fn read_timestamp(reader: &SliceReader<'_>, entry: &IfdEntry) -> Option<String> {
    let values = read_rationals(reader, entry, 3)?;
    Some(format!(
        "{:02}:{:02}:{:02}",
        values[0] as u32, values[1] as u32, values[2] as u32
    ))
}

/// `YYYY:MM:DD` on disk, normalized to `YYYY-MM-DD`.
fn read_date_stamp(reader: &SliceReader<'_>, entry: &IfdEntry) -> Option<String> {
    let raw = read_ascii(reader, entry)?;
    let normalized = raw.replace(':', "-");
    (normalized.len() == 10).then_some(normalized)
}
