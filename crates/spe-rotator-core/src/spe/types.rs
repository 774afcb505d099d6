//! Core types for the SPE codec.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for SPE file operations.
#[derive(Debug, Error)]
pub enum SpeError {
    /// The header is malformed or uses an unsupported encoding.
    #[error("Invalid SPE file: {0}")]
    Format(String),

    /// The trailing metadata block is absent or lies outside the file.
    #[error("Metadata unavailable: block offset {offset} outside file of {file_len} bytes")]
    MetadataUnavailable { offset: i64, file_len: u64 },

    /// A frame index outside `[0, frame_count)`.
    #[error("Frame index {index} out of range (file has {frame_count} frames)")]
    FrameOutOfRange { index: usize, frame_count: usize },

    /// A split-half rotation where one half would have no rows.
    #[error("Cannot split {height} rows at row {center}: one half would be empty")]
    EmptySplitHalf { height: usize, center: usize },

    /// Source and destination disagree on the number of frames.
    #[error("Frame count mismatch: source has {source_frames}, destination has {dest_frames}")]
    FrameCountMismatch {
        source_frames: usize,
        dest_frames: usize,
    },

    /// Source and destination disagree on the byte size of a frame.
    #[error("Frame size mismatch: source frames are {source_bytes} bytes, destination frames are {dest_bytes} bytes")]
    FrameSizeMismatch {
        source_bytes: usize,
        dest_bytes: usize,
    },

    /// Read, write or seek failure.
    #[error("I/O error {context}{}: {source}", offset_suffix(.offset))]
    Io {
        context: String,
        offset: Option<u64>,
        #[source]
        source: io::Error,
    },

    /// The file extension does not name a supported format.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

fn offset_suffix(offset: &Option<u64>) -> String {
    offset.map(|o| format!(" at byte {o}")).unwrap_or_default()
}

impl SpeError {
    /// Build an I/O error with a description of what was being attempted.
    pub(crate) fn io(context: impl Into<String>, offset: Option<u64>, source: io::Error) -> Self {
        SpeError::Io {
            context: context.into(),
            offset,
            source,
        }
    }

    /// Returns true for errors that only degrade metadata display.
    pub fn is_non_fatal(&self) -> bool {
        matches!(self, SpeError::MetadataUnavailable { .. })
    }
}

/// Sample encoding of the frame data, keyed by the header's data-type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum DataType {
    Float32 = 0,
    Int32 = 1,
    Int16 = 2,
    UInt16 = 3,
    UInt32 = 8,
}

impl DataType {
    /// Map a header data-type code to a sample type.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(DataType::Float32),
            1 => Some(DataType::Int32),
            2 => Some(DataType::Int16),
            3 => Some(DataType::UInt16),
            8 => Some(DataType::UInt32),
            _ => None,
        }
    }

    /// The code stored in the header for this type.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Bytes per sample.
    #[inline]
    pub fn size(self) -> usize {
        match self {
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Float32 | DataType::Int32 | DataType::UInt32 => 4,
        }
    }
}

/// The recorded region of the sensor.
///
/// `width` runs along the wavelength axis (columns), `height` along the
/// position axis (rows). `x`/`y` locate the region on the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Shape of a multi-frame data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataShape {
    pub frame_count: usize,
    /// Rows per frame.
    pub position_pixels: usize,
    /// Columns per frame.
    pub wavelength_pixels: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_codes() {
        assert_eq!(DataType::from_code(0), Some(DataType::Float32));
        assert_eq!(DataType::from_code(1), Some(DataType::Int32));
        assert_eq!(DataType::from_code(2), Some(DataType::Int16));
        assert_eq!(DataType::from_code(3), Some(DataType::UInt16));
        assert_eq!(DataType::from_code(8), Some(DataType::UInt32));
        assert_eq!(DataType::from_code(4), None);
        assert_eq!(DataType::from_code(5), None);

        for dt in [
            DataType::Float32,
            DataType::Int32,
            DataType::Int16,
            DataType::UInt16,
            DataType::UInt32,
        ] {
            assert_eq!(DataType::from_code(dt.code()), Some(dt));
        }
    }

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(DataType::Float32.size(), 4);
        assert_eq!(DataType::Int32.size(), 4);
        assert_eq!(DataType::Int16.size(), 2);
        assert_eq!(DataType::UInt16.size(), 2);
        assert_eq!(DataType::UInt32.size(), 4);
    }

    #[test]
    fn test_roi_pixel_count() {
        let roi = Roi {
            x: 10,
            y: 0,
            width: 512,
            height: 100,
        };
        assert_eq!(roi.pixel_count(), 51200);
    }

    #[test]
    fn test_error_display() {
        let err = SpeError::FrameOutOfRange {
            index: 6,
            frame_count: 6,
        };
        assert_eq!(
            err.to_string(),
            "Frame index 6 out of range (file has 6 frames)"
        );

        let err = SpeError::FrameCountMismatch {
            source_frames: 6,
            dest_frames: 5,
        };
        assert_eq!(
            err.to_string(),
            "Frame count mismatch: source has 6, destination has 5"
        );
    }

    #[test]
    fn test_io_error_display_includes_offset() {
        let err = SpeError::io(
            "reading frame 2",
            Some(4132),
            io::Error::from(io::ErrorKind::UnexpectedEof),
        );
        let text = err.to_string();
        assert!(text.starts_with("I/O error reading frame 2 at byte 4132: "), "{text}");

        let err = SpeError::io("opening file", None, io::Error::from(io::ErrorKind::NotFound));
        assert!(!err.to_string().contains("at byte"));
    }

    #[test]
    fn test_only_metadata_errors_are_non_fatal() {
        let err = SpeError::MetadataUnavailable {
            offset: 0,
            file_len: 4100,
        };
        assert!(err.is_non_fatal());
        assert!(!SpeError::Format("bad".to_string()).is_non_fatal());
    }
}
