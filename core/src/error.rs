//! Application-level error type.
//!
//! Reader errors bubble up into this set unchanged; the shell formats the
//! final message shown on the error screen as `"<prefix>: <reason>"`.

use crate::fs::FsError;
use crate::xtc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppError {
    Reader(xtc::Error),
    Fs(FsError),
    PathTooLong,
    UnexpectedEof,
    SeekTooLarge,
    TooLarge,
    InvalidPageHeader,
    UnsupportedFormat,
}

impl From<xtc::Error> for AppError {
    fn from(err: xtc::Error) -> Self {
        AppError::Reader(err)
    }
}

impl From<FsError> for AppError {
    fn from(err: FsError) -> Self {
        match err {
            FsError::PathTooLong => AppError::PathTooLong,
            FsError::SeekTooLarge => AppError::SeekTooLarge,
            other => AppError::Fs(other),
        }
    }
}

impl core::fmt::Display for AppError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AppError::Reader(err) => write!(f, "{err}"),
            AppError::Fs(err) => write!(f, "{err}"),
            AppError::PathTooLong => f.write_str("PathTooLong"),
            AppError::UnexpectedEof => f.write_str("UnexpectedEof"),
            AppError::SeekTooLarge => f.write_str("SeekTooLarge"),
            AppError::TooLarge => f.write_str("TooLarge"),
            AppError::InvalidPageHeader => f.write_str("InvalidPageHeader"),
            AppError::UnsupportedFormat => f.write_str("UnsupportedFormat"),
        }
    }
}
