use thiserror::Error;

/// Errors from the EXIF extractor. Everything short of a missing SOI marker
/// degrades to a partial record instead of erroring.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExifError {
    #[error("buffer does not start with a JPEG SOI marker")]
    NotJpeg,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);
