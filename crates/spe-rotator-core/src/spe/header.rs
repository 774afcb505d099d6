//! Fixed-offset binary header of an SPE file.
//!
//! The header occupies the first [`HEADER_SIZE`] bytes and is immediately
//! followed by the frame data. All multi-byte fields are little-endian.
//!
//! | Offset | Type    | Field                                   |
//! |--------|---------|-----------------------------------------|
//! | 42     | u16     | detector x dimension                    |
//! | 108    | u16     | data-type code                          |
//! | 656    | u16     | detector y dimension                    |
//! | 678    | i64     | byte offset of the trailing metadata    |
//! | 1446   | i32     | frame count                             |
//! | 1510   | i16     | ROI count                               |
//! | 1512   | 6 × u16 | first ROI entry                         |

use std::fs::File;
use std::io::{self, Read};
use std::ops::Range;
use std::path::Path;

use super::types::{DataType, Roi, SpeError};

/// Size of the binary header; frame data starts here.
pub const HEADER_SIZE: usize = 4100;

/// Byte offset of the first frame.
pub const DATA_OFFSET: u64 = HEADER_SIZE as u64;

const XDIM_OFFSET: usize = 42;
const DATA_TYPE_OFFSET: usize = 108;
const YDIM_OFFSET: usize = 656;
const METADATA_OFFSET_OFFSET: usize = 678;
const FRAME_COUNT_OFFSET: usize = 1446;
const ROI_COUNT_OFFSET: usize = 1510;
const ROI_TABLE_OFFSET: usize = 1512;

/// Parsed header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeHeader {
    pub data_type: DataType,
    pub frame_count: usize,
    pub roi: Roi,
    /// Offset of the trailing metadata block as stored (may be invalid).
    pub metadata_offset: i64,
    /// Total file length in bytes.
    pub file_len: u64,
}

impl SpeHeader {
    /// Parse a header from the leading bytes of a file.
    ///
    /// `bytes` must hold at least [`HEADER_SIZE`] bytes; `file_len` is the
    /// length of the whole file, used later to validate the metadata offset.
    ///
    /// # Errors
    ///
    /// - `SpeError::Format` - header too short, unknown data-type code,
    ///   negative frame count, an empty ROI, or a frame-data region too
    ///   large to address
    ///
    /// A data region extending past `file_len` is accepted so the frames of
    /// a truncated file stay readable; reads past the end fail individually.
    pub fn parse(bytes: &[u8], file_len: u64) -> Result<Self, SpeError> {
        if bytes.len() < HEADER_SIZE {
            return Err(SpeError::Format(format!(
                "header needs {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let code = read_u16(bytes, DATA_TYPE_OFFSET);
        let data_type = DataType::from_code(code)
            .ok_or_else(|| SpeError::Format(format!("unrecognized data-type code {code}")))?;

        let frame_count = read_i32(bytes, FRAME_COUNT_OFFSET);
        if frame_count < 0 {
            return Err(SpeError::Format(format!(
                "negative frame count {frame_count}"
            )));
        }

        let roi = parse_roi(bytes)?;
        check_data_region(data_type, frame_count as u64, &roi)?;
        let metadata_offset = read_i64(bytes, METADATA_OFFSET_OFFSET);

        Ok(SpeHeader {
            data_type,
            frame_count: frame_count as usize,
            roi,
            metadata_offset,
            file_len,
        })
    }

    /// Read and parse the header of the file at `path`.
    ///
    /// The file is closed again before returning.
    pub fn read(path: &Path) -> Result<Self, SpeError> {
        let mut file = File::open(path)
            .map_err(|e| SpeError::io(format!("opening {}", path.display()), None, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| SpeError::io(format!("reading length of {}", path.display()), None, e))?
            .len();

        let mut buf = Vec::with_capacity(HEADER_SIZE);
        (&mut file)
            .take(HEADER_SIZE as u64)
            .read_to_end(&mut buf)
            .map_err(|e| SpeError::io("reading header", Some(0), e))?;

        Self::parse(&buf, file_len)
    }

    /// Bytes occupied by one frame.
    #[inline]
    pub fn frame_byte_size(&self) -> usize {
        self.roi.pixel_count() * self.data_type.size()
    }

    /// Byte offset of frame `index`, unchecked.
    #[inline]
    pub fn frame_offset(&self, index: usize) -> u64 {
        DATA_OFFSET + index as u64 * self.frame_byte_size() as u64
    }

    /// End of the frame-data region.
    pub fn data_end(&self) -> u64 {
        self.frame_offset(self.frame_count)
    }

    /// Fail with `FrameOutOfRange` unless `index` names an existing frame.
    pub fn check_index(&self, index: usize) -> Result<(), SpeError> {
        if index < self.frame_count {
            Ok(())
        } else {
            Err(SpeError::FrameOutOfRange {
                index,
                frame_count: self.frame_count,
            })
        }
    }

    /// X coordinate of every column of the ROI, in column order.
    pub fn wavelength_axis(&self) -> Vec<f64> {
        (self.roi.x..self.roi.x + self.roi.width)
            .map(f64::from)
            .collect()
    }

    /// Fail with an end-of-file `Io` error unless `range` lies inside the
    /// file. Checked before allocating a buffer for the range.
    pub fn check_in_file(&self, range: &Range<u64>) -> Result<(), SpeError> {
        if range.end <= self.file_len {
            return Ok(());
        }
        Err(SpeError::io(
            format!("range ends at {} past file end {}", range.end, self.file_len),
            Some(range.start),
            io::Error::from(io::ErrorKind::UnexpectedEof),
        ))
    }

    /// The metadata block's byte range, if the stored offset lies inside the
    /// file after the header.
    pub fn metadata_range(&self) -> Result<Range<u64>, SpeError> {
        let offset = self.metadata_offset;
        if offset < HEADER_SIZE as i64 || offset as u64 >= self.file_len {
            return Err(SpeError::MetadataUnavailable {
                offset,
                file_len: self.file_len,
            });
        }
        Ok(offset as u64..self.file_len)
    }
}

/// Reject geometry whose frame size or data-region end overflows: one frame
/// must fit in memory and the end of the last frame must fit in a file offset.
fn check_data_region(data_type: DataType, frame_count: u64, roi: &Roi) -> Result<(), SpeError> {
    let frame_bytes = (roi.width as u64)
        .checked_mul(roi.height as u64)
        .and_then(|n| n.checked_mul(data_type.size() as u64))
        .filter(|&n| usize::try_from(n).is_ok());
    let data_end = frame_bytes
        .and_then(|n| n.checked_mul(frame_count))
        .and_then(|n| n.checked_add(DATA_OFFSET));

    if data_end.is_none() {
        return Err(SpeError::Format(format!(
            "{frame_count} frames of {}x{} {:?} samples exceed the addressable size",
            roi.width, roi.height, data_type
        )));
    }
    Ok(())
}

/// Derive the frame geometry from the first ROI table entry.
///
/// Files that leave the table zeroed describe the full detector through the
/// x/y dimension fields instead.
fn parse_roi(bytes: &[u8]) -> Result<Roi, SpeError> {
    let entry: [u16; 6] =
        std::array::from_fn(|i| read_u16(bytes, ROI_TABLE_OFFSET + i * 2));
    let [start_x, end_x, group_x, start_y, end_y, group_y] = entry;

    let roi = if entry.iter().all(|&v| v == 0) {
        Roi {
            x: 0,
            y: 0,
            width: read_u16(bytes, XDIM_OFFSET) as u32,
            height: read_u16(bytes, YDIM_OFFSET) as u32,
        }
    } else {
        if end_x < start_x || end_y < start_y {
            return Err(SpeError::Format(format!(
                "inverted ROI ({start_x}..={end_x}, {start_y}..={end_y})"
            )));
        }
        Roi {
            x: start_x as u32,
            y: start_y as u32,
            width: (end_x as u32 - start_x as u32 + 1) / group_x.max(1) as u32,
            height: (end_y as u32 - start_y as u32 + 1) / group_y.max(1) as u32,
        }
    };

    if roi.width == 0 || roi.height == 0 {
        return Err(SpeError::Format(format!(
            "empty ROI {}x{}",
            roi.width, roi.height
        )));
    }

    let roi_count = read_i16(bytes, ROI_COUNT_OFFSET);
    if roi_count > 1 {
        log::warn!("file declares {roi_count} ROIs; only the first is read");
    }

    Ok(roi)
}

#[inline]
fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

#[inline]
fn read_i16(bytes: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

#[inline]
fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_le_bytes(buf)
}

#[inline]
fn read_i64(bytes: &[u8], offset: usize) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    i64::from_le_bytes(buf)
}

/// Write the header fields this module reads into a zeroed header buffer.
#[cfg(any(test, feature = "test-util"))]
pub(crate) fn write_header(
    buf: &mut [u8],
    data_type_code: u16,
    frame_count: i32,
    roi_entry: [u16; 6],
    dims: (u16, u16),
    metadata_offset: i64,
) {
    buf[DATA_TYPE_OFFSET..DATA_TYPE_OFFSET + 2].copy_from_slice(&data_type_code.to_le_bytes());
    buf[FRAME_COUNT_OFFSET..FRAME_COUNT_OFFSET + 4].copy_from_slice(&frame_count.to_le_bytes());
    buf[XDIM_OFFSET..XDIM_OFFSET + 2].copy_from_slice(&dims.0.to_le_bytes());
    buf[YDIM_OFFSET..YDIM_OFFSET + 2].copy_from_slice(&dims.1.to_le_bytes());
    buf[METADATA_OFFSET_OFFSET..METADATA_OFFSET_OFFSET + 8]
        .copy_from_slice(&metadata_offset.to_le_bytes());
    buf[ROI_COUNT_OFFSET..ROI_COUNT_OFFSET + 2].copy_from_slice(&1i16.to_le_bytes());
    for (i, v) in roi_entry.iter().enumerate() {
        let at = ROI_TABLE_OFFSET + i * 2;
        buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(code: u16, frames: i32, roi_entry: [u16; 6], dims: (u16, u16)) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_SIZE];
        write_header(&mut buf, code, frames, roi_entry, dims, 0);
        buf
    }

    #[test]
    fn test_parse_basic_header() {
        // 512 columns, 100 rows
        let bytes = header_bytes(3, 6, [0, 511, 1, 0, 99, 1], (512, 100));
        let header = SpeHeader::parse(&bytes, 10_000_000).unwrap();

        assert_eq!(header.data_type, DataType::UInt16);
        assert_eq!(header.frame_count, 6);
        assert_eq!(header.roi.width, 512);
        assert_eq!(header.roi.height, 100);
        assert_eq!(header.frame_byte_size(), 512 * 100 * 2);
    }

    #[test]
    fn test_roi_offset_and_binning() {
        let bytes = header_bytes(0, 1, [10, 29, 2, 4, 7, 1], (1024, 256));
        let header = SpeHeader::parse(&bytes, 1 << 20).unwrap();

        assert_eq!(header.roi.x, 10);
        assert_eq!(header.roi.y, 4);
        assert_eq!(header.roi.width, 10);
        assert_eq!(header.roi.height, 4);
    }

    #[test]
    fn test_zeroed_roi_table_uses_detector_dims() {
        let bytes = header_bytes(3, 2, [0; 6], (8, 3));
        let header = SpeHeader::parse(&bytes, 1 << 20).unwrap();

        assert_eq!(header.roi, Roi { x: 0, y: 0, width: 8, height: 3 });
    }

    #[test]
    fn test_short_header_is_format_error() {
        let bytes = vec![0u8; HEADER_SIZE - 1];
        let err = SpeHeader::parse(&bytes, bytes.len() as u64).unwrap_err();
        assert!(matches!(err, SpeError::Format(_)));
    }

    #[test]
    fn test_unknown_data_type_is_format_error() {
        let bytes = header_bytes(5, 1, [0, 3, 1, 0, 3, 1], (4, 4));
        let err = SpeHeader::parse(&bytes, 1 << 20).unwrap_err();
        match err {
            SpeError::Format(msg) => assert!(msg.contains("code 5"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_frame_count_is_format_error() {
        let bytes = header_bytes(3, -1, [0, 3, 1, 0, 3, 1], (4, 4));
        assert!(matches!(
            SpeHeader::parse(&bytes, 1 << 20),
            Err(SpeError::Format(_))
        ));
    }

    #[test]
    fn test_empty_roi_is_format_error() {
        let bytes = header_bytes(3, 1, [0; 6], (0, 0));
        assert!(matches!(
            SpeHeader::parse(&bytes, 1 << 20),
            Err(SpeError::Format(_))
        ));
    }

    #[test]
    fn test_inverted_roi_is_format_error() {
        let bytes = header_bytes(3, 1, [5, 2, 1, 0, 3, 1], (8, 8));
        assert!(matches!(
            SpeHeader::parse(&bytes, 1 << 20),
            Err(SpeError::Format(_))
        ));
    }

    #[test]
    fn test_unaddressable_data_region_is_format_error() {
        // 65535 x 65535 Float32 samples times i32::MAX frames overflows u64
        let bytes = header_bytes(0, i32::MAX, [0, 65534, 1, 0, 65534, 1], (0, 0));
        assert!(matches!(
            SpeHeader::parse(&bytes, 5000),
            Err(SpeError::Format(_))
        ));
    }

    #[test]
    fn test_data_region_past_file_end_is_accepted() {
        let bytes = header_bytes(3, i32::MAX, [0, 3, 1, 0, 3, 1], (4, 4));
        let header = SpeHeader::parse(&bytes, 5000).unwrap();

        assert_eq!(header.data_end(), 4100 + 32 * i32::MAX as u64);
        assert!(header.check_in_file(&(4100..4132)).is_ok());
        assert!(header.check_in_file(&(4100..5000)).is_ok());
        match header.check_in_file(&(4100..header.data_end())) {
            Err(SpeError::Io { offset, source, .. }) => {
                assert_eq!(offset, Some(4100));
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_wavelength_axis() {
        let bytes = header_bytes(3, 1, [100, 103, 1, 0, 1, 1], (1024, 256));
        let header = SpeHeader::parse(&bytes, 1 << 20).unwrap();
        assert_eq!(header.wavelength_axis(), vec![100.0, 101.0, 102.0, 103.0]);
    }

    #[test]
    fn test_frame_offsets() {
        let bytes = header_bytes(3, 3, [0, 3, 1, 0, 3, 1], (4, 4));
        let header = SpeHeader::parse(&bytes, 1 << 20).unwrap();

        assert_eq!(header.frame_offset(0), 4100);
        assert_eq!(header.frame_offset(1), 4132);
        assert_eq!(header.frame_offset(2), 4164);
        assert_eq!(header.data_end(), 4196);
    }

    #[test]
    fn test_check_index() {
        let bytes = header_bytes(3, 6, [0, 3, 1, 0, 3, 1], (4, 4));
        let header = SpeHeader::parse(&bytes, 1 << 20).unwrap();

        assert!(header.check_index(0).is_ok());
        assert!(header.check_index(5).is_ok());
        assert!(matches!(
            header.check_index(6),
            Err(SpeError::FrameOutOfRange {
                index: 6,
                frame_count: 6
            })
        ));
    }

    #[test]
    fn test_metadata_range_bounds() {
        let mut header = SpeHeader::parse(&header_bytes(3, 1, [0, 3, 1, 0, 3, 1], (4, 4)), 5000)
            .unwrap();

        header.metadata_offset = 4132;
        assert_eq!(header.metadata_range().unwrap(), 4132..5000);

        for bad in [0, -7, 100, 5000, 9000] {
            header.metadata_offset = bad;
            assert!(
                matches!(
                    header.metadata_range(),
                    Err(SpeError::MetadataUnavailable { .. })
                ),
                "offset {bad} should be unavailable"
            );
        }
    }
}
