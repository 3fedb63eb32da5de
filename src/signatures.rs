//! File-signature catalogs and magic-number detection.
//!
//! Both catalogs are fixed at build time and scanned linearly; declaration
//! order is the tie-break when two headers match the same prefix, so the
//! order of the tables below is part of the contract.

use crate::error::UnknownCategory;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;

/// How many leading bytes `detect` looks at.
pub const MAX_HEADER_PROBE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Executable,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Image,
        Category::Video,
        Category::Audio,
        Category::Document,
        Category::Archive,
        Category::Executable,
        Category::Other,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Video => "video",
            Category::Audio => "audio",
            Category::Document => "document",
            Category::Archive => "archive",
            Category::Executable => "executable",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(Category::Image),
            "video" => Ok(Category::Video),
            "audio" => Ok(Category::Audio),
            "document" => Ok(Category::Document),
            "archive" => Ok(Category::Archive),
            "executable" => Ok(Category::Executable),
            "other" => Ok(Category::Other),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// A known file format: header magic, optional footer magic, carve size cap.
///
/// `extensions` is the full alias set accepted for the declared-extension
/// mismatch check; the first entry is the canonical extension used when
/// naming carved artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileSignature {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    #[serde(serialize_with = "ser_hex")]
    pub header: &'static [u8],
    #[serde(serialize_with = "ser_hex_opt")]
    pub footer: Option<&'static [u8]>,
    pub max_size: u64,
    pub category: Category,
}

impl FileSignature {
    pub fn extension(&self) -> &'static str {
        self.extensions[0]
    }

    /// `ext` must already be normalized (no leading dot, ASCII lowercase).
    pub fn matches_extension(&self, ext: &str) -> bool {
        self.extensions.contains(&ext)
    }

    pub fn header_hex(&self) -> String {
        hex::encode(self.header)
    }
}

fn ser_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

fn ser_hex_opt<S: Serializer>(
    bytes: &Option<&'static [u8]>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(b) => serializer.serialize_some(&hex::encode(b)),
        None => serializer.serialize_none(),
    }
}

const SIG_JPEG_JFIF: FileSignature = FileSignature {
    name: "JPEG image (JFIF)",
    extensions: &["jpg", "jpeg", "jpe", "jfif"],
    header: &[0xFF, 0xD8, 0xFF, 0xE0],
    footer: Some(&[0xFF, 0xD9]),
    max_size: 20 * MB,
    category: Category::Image,
};

const SIG_JPEG_EXIF: FileSignature = FileSignature {
    name: "JPEG image (Exif)",
    extensions: &["jpg", "jpeg", "jpe"],
    header: &[0xFF, 0xD8, 0xFF, 0xE1],
    footer: Some(&[0xFF, 0xD9]),
    max_size: 20 * MB,
    category: Category::Image,
};

const SIG_JPEG: FileSignature = FileSignature {
    name: "JPEG image",
    extensions: &["jpg", "jpeg", "jpe"],
    header: &[0xFF, 0xD8, 0xFF],
    footer: Some(&[0xFF, 0xD9]),
    max_size: 20 * MB,
    category: Category::Image,
};

const SIG_PNG: FileSignature = FileSignature {
    name: "PNG image",
    extensions: &["png"],
    header: &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
    footer: Some(&[0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82]),
    max_size: 50 * MB,
    category: Category::Image,
};

const SIG_GIF87A: FileSignature = FileSignature {
    name: "GIF image (87a)",
    extensions: &["gif"],
    header: &[0x47, 0x49, 0x46, 0x38, 0x37, 0x61],
    footer: Some(&[0x00, 0x3B]),
    max_size: 10 * MB,
    category: Category::Image,
};

const SIG_GIF89A: FileSignature = FileSignature {
    name: "GIF image (89a)",
    extensions: &["gif"],
    header: &[0x47, 0x49, 0x46, 0x38, 0x39, 0x61],
    footer: Some(&[0x00, 0x3B]),
    max_size: 10 * MB,
    category: Category::Image,
};

const SIG_BMP: FileSignature = FileSignature {
    name: "BMP image",
    extensions: &["bmp", "dib"],
    header: &[0x42, 0x4D],
    footer: None,
    max_size: 20 * MB,
    category: Category::Image,
};

const SIG_TIFF_LE: FileSignature = FileSignature {
    name: "TIFF image (little-endian)",
    extensions: &["tif", "tiff"],
    header: &[0x49, 0x49, 0x2A, 0x00],
    footer: None,
    max_size: 50 * MB,
    category: Category::Image,
};

const SIG_TIFF_BE: FileSignature = FileSignature {
    name: "TIFF image (big-endian)",
    extensions: &["tif", "tiff"],
    header: &[0x4D, 0x4D, 0x00, 0x2A],
    footer: None,
    max_size: 50 * MB,
    category: Category::Image,
};

const SIG_PDF: FileSignature = FileSignature {
    name: "PDF document",
    extensions: &["pdf"],
    header: &[0x25, 0x50, 0x44, 0x46],
    footer: Some(&[0x25, 0x25, 0x45, 0x4F, 0x46]),
    max_size: 50 * MB,
    category: Category::Document,
};

const SIG_ZIP: FileSignature = FileSignature {
    name: "ZIP archive",
    extensions: &["zip", "docx", "xlsx", "pptx", "jar", "apk", "odt"],
    header: &[0x50, 0x4B, 0x03, 0x04],
    footer: Some(&[0x50, 0x4B, 0x05, 0x06]),
    max_size: 100 * MB,
    category: Category::Archive,
};

const SIG_RAR: FileSignature = FileSignature {
    name: "RAR archive",
    extensions: &["rar"],
    header: &[0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x00],
    footer: None,
    max_size: 100 * MB,
    category: Category::Archive,
};

const SIG_7Z: FileSignature = FileSignature {
    name: "7-Zip archive",
    extensions: &["7z"],
    header: &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C],
    footer: None,
    max_size: 100 * MB,
    category: Category::Archive,
};

const SIG_GZIP: FileSignature = FileSignature {
    name: "GZIP archive",
    extensions: &["gz", "tgz"],
    header: &[0x1F, 0x8B, 0x08],
    footer: None,
    max_size: 50 * MB,
    category: Category::Archive,
};

// AVI and WAV share the RIFF prefix and only differ past the 8-byte probe;
// AVI is declared first and wins the tie.
const SIG_AVI: FileSignature = FileSignature {
    name: "AVI video (RIFF)",
    extensions: &["avi"],
    header: &[0x52, 0x49, 0x46, 0x46],
    footer: None,
    max_size: 500 * MB,
    category: Category::Video,
};

const SIG_WAV: FileSignature = FileSignature {
    name: "WAV audio (RIFF)",
    extensions: &["wav"],
    header: &[0x52, 0x49, 0x46, 0x46],
    footer: None,
    max_size: 100 * MB,
    category: Category::Audio,
};

const SIG_MP3: FileSignature = FileSignature {
    name: "MP3 audio (ID3)",
    extensions: &["mp3"],
    header: &[0x49, 0x44, 0x33],
    footer: None,
    max_size: 20 * MB,
    category: Category::Audio,
};

const SIG_EXE: FileSignature = FileSignature {
    name: "Windows executable",
    extensions: &["exe", "dll", "sys", "scr"],
    header: &[0x4D, 0x5A],
    footer: None,
    max_size: 50 * MB,
    category: Category::Executable,
};

const SIG_ELF: FileSignature = FileSignature {
    name: "ELF executable",
    extensions: &["elf", "so", "bin"],
    header: &[0x7F, 0x45, 0x4C, 0x46],
    footer: None,
    max_size: 50 * MB,
    category: Category::Executable,
};

const SIG_SQLITE: FileSignature = FileSignature {
    name: "SQLite database",
    extensions: &["db", "sqlite", "sqlite3"],
    header: &[0x53, 0x51, 0x4C, 0x69, 0x74, 0x65, 0x20, 0x66],
    footer: None,
    max_size: 100 * MB,
    category: Category::Other,
};

/// Catalog scanned by `detect`, in declaration order.
pub static DETECTION_SIGNATURES: &[FileSignature] = &[
    SIG_JPEG_JFIF,
    SIG_JPEG_EXIF,
    SIG_JPEG,
    SIG_PNG,
    SIG_GIF87A,
    SIG_GIF89A,
    SIG_BMP,
    SIG_TIFF_LE,
    SIG_TIFF_BE,
    SIG_PDF,
    SIG_ZIP,
    SIG_RAR,
    SIG_7Z,
    SIG_GZIP,
    SIG_AVI,
    SIG_WAV,
    SIG_MP3,
    SIG_EXE,
    SIG_ELF,
    SIG_SQLITE,
];

/// Catalog used by the carver. SQLite is detection-only: database content
/// recovery is out of scope and a header-only carve of one would be noise.
pub static CARVING_SIGNATURES: &[FileSignature] = &[
    SIG_JPEG_JFIF,
    SIG_JPEG_EXIF,
    SIG_JPEG,
    SIG_PNG,
    SIG_GIF87A,
    SIG_GIF89A,
    SIG_BMP,
    SIG_TIFF_LE,
    SIG_TIFF_BE,
    SIG_PDF,
    SIG_ZIP,
    SIG_RAR,
    SIG_7Z,
    SIG_GZIP,
    SIG_AVI,
    SIG_WAV,
    SIG_MP3,
    SIG_EXE,
    SIG_ELF,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    pub signature: Option<&'static FileSignature>,
    /// The bytes actually inspected: the first 8 of the buffer, fewer if the
    /// buffer is shorter.
    #[serde(serialize_with = "ser_hex")]
    pub observed_header: Vec<u8>,
    pub declared_extension: String,
    pub extension_mismatch: bool,
}

impl DetectionResult {
    pub fn matched(&self) -> bool {
        self.signature.is_some()
    }
}

/// Matches the leading bytes of `buffer` against the detection catalog.
///
/// Never reads past byte index 7, never fails: an unrecognized header is a
/// valid result with `signature: None`. `extension_mismatch` is set only when
/// a signature matched and the declared extension is outside its alias set.
pub fn detect(buffer: &[u8], declared_extension: &str) -> DetectionResult {
    let probe = &buffer[..buffer.len().min(MAX_HEADER_PROBE)];
    let normalized = declared_extension
        .trim_start_matches('.')
        .to_ascii_lowercase();

    let signature = DETECTION_SIGNATURES
        .iter()
        .find(|sig| probe.starts_with(sig.header));

    let extension_mismatch = signature
        .map(|sig| !sig.matches_extension(&normalized))
        .unwrap_or(false);

    DetectionResult {
        signature,
        observed_header: probe.to_vec(),
        declared_extension: normalized,
        extension_mismatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entries_are_probe_sized() {
        for sig in DETECTION_SIGNATURES.iter().chain(CARVING_SIGNATURES) {
            assert!(!sig.header.is_empty(), "{} has an empty header", sig.name);
            assert!(
                sig.header.len() <= MAX_HEADER_PROBE,
                "{} header exceeds the probe window",
                sig.name
            );
            assert!(!sig.extensions.is_empty(), "{} has no extensions", sig.name);
            assert!(sig.max_size > 0, "{} has a zero size cap", sig.name);
            if let Some(footer) = sig.footer {
                assert!(!footer.is_empty(), "{} has an empty footer", sig.name);
            }
        }
    }

    #[test]
    fn test_riff_tie_break_is_catalog_order() {
        let result = detect(b"RIFF\x24\x00\x00\x00WAVEfmt ", "wav");
        let sig = result.signature.expect("RIFF header should match");
        assert_eq!(sig.name, "AVI video (RIFF)");
        // The declared extension belongs to the shadowed WAV entry, so the
        // AVI match reports it as a mismatch.
        assert!(result.extension_mismatch);
    }

    #[test]
    fn test_more_specific_jpeg_variant_wins() {
        let jfif = detect(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46], "jpg");
        assert_eq!(jfif.signature.map(|s| s.name), Some("JPEG image (JFIF)"));
        assert!(!jfif.extension_mismatch);

        let bare = detect(&[0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x84, 0x00, 0x01], "jpg");
        assert_eq!(bare.signature.map(|s| s.name), Some("JPEG image"));
    }

    #[test]
    fn test_extension_normalization() {
        let result = detect(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], ".PNG");
        assert!(result.matched());
        assert!(!result.extension_mismatch);
        assert_eq!(result.declared_extension, "png");
    }

    #[test]
    fn test_no_match_is_not_a_mismatch() {
        let result = detect(&[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07], "xyz");
        assert!(result.signature.is_none());
        assert!(!result.extension_mismatch);
    }

    #[test]
    fn test_short_buffer_never_matches_longer_header() {
        // One byte of the PNG magic is not the PNG magic.
        let result = detect(&[0x89], "png");
        assert!(result.signature.is_none());
        assert_eq!(result.observed_header, vec![0x89]);

        let empty = detect(&[], "png");
        assert!(empty.signature.is_none());
        assert!(empty.observed_header.is_empty());
    }
}
