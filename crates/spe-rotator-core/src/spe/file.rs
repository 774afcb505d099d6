//! Path-backed SPE file handle.
//!
//! [`SpeFile::open`] parses the header and closes the file again; every
//! later access opens its own descriptor for the duration of the call. The
//! handle is immutable, and derived quantities are memoized on it.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::frame::{decode_samples, Frame, FrameStack};
use super::header::SpeHeader;
use super::metadata::{parse_metadata_block, Metadata};
use super::types::{DataShape, DataType, Roi, SpeError};

/// An opened SPE file.
#[derive(Debug)]
pub struct SpeFile {
    path: PathBuf,
    header: SpeHeader,
    /// `None` once the block was found to be unavailable.
    metadata: OnceLock<Option<Metadata>>,
    wavelength_axis: OnceLock<Vec<f64>>,
    max_series: OnceLock<Vec<f64>>,
}

impl SpeFile {
    /// Parse the header of the file at `path`.
    ///
    /// # Errors
    ///
    /// - `SpeError::Format` - shorter than the header, or unknown data type
    /// - `SpeError::Io` - the file cannot be opened or read
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SpeError> {
        let path = path.as_ref();
        let header = SpeHeader::read(path)?;
        log::debug!(
            "opened {}: {:?}, {} frames, ROI {}x{}",
            path.display(),
            header.data_type,
            header.frame_count,
            header.roi.width,
            header.roi.height
        );
        Ok(Self {
            path: path.to_path_buf(),
            header,
            metadata: OnceLock::new(),
            wavelength_axis: OnceLock::new(),
            max_series: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &SpeHeader {
        &self.header
    }

    pub fn data_type(&self) -> DataType {
        self.header.data_type
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count
    }

    pub fn roi(&self) -> Roi {
        self.header.roi
    }

    pub fn data_shape(&self) -> DataShape {
        DataShape {
            frame_count: self.header.frame_count,
            position_pixels: self.header.roi.height as usize,
            wavelength_pixels: self.header.roi.width as usize,
        }
    }

    /// Sensor column of each frame column.
    pub fn wavelength_axis(&self) -> &[f64] {
        self.wavelength_axis.get_or_init(|| self.header.wavelength_axis())
    }

    /// Parse the trailing metadata block, once.
    ///
    /// # Errors
    ///
    /// - `SpeError::MetadataUnavailable` - the stored offset lies outside the
    ///   file (cached; later calls fail the same way without touching disk)
    /// - `SpeError::Io` - the block could not be read (not cached)
    pub fn metadata(&self) -> Result<&Metadata, SpeError> {
        if self.metadata.get().is_none() {
            let loaded = match self.header.metadata_range() {
                Ok(range) => Some(parse_metadata_block(&self.read_range(range)?)),
                Err(err) => {
                    log::warn!("{}: {}", self.path.display(), err);
                    None
                }
            };
            // A concurrent initializer would have produced the same value.
            let _ = self.metadata.set(loaded);
        }

        self.metadata
            .get()
            .and_then(Option::as_ref)
            .ok_or(SpeError::MetadataUnavailable {
                offset: self.header.metadata_offset,
                file_len: self.header.file_len,
            })
    }

    /// Decode frame `index`.
    ///
    /// # Errors
    ///
    /// - `SpeError::FrameOutOfRange` - `index >= frame_count`
    /// - `SpeError::Io` - the frame lies past the end of the file
    pub fn get_frame(&self, index: usize) -> Result<Frame, SpeError> {
        self.header.check_index(index)?;
        self.frame_reader()?.read_frame(index)
    }

    /// Decode every frame with a single read.
    pub fn get_all_frames(&self) -> Result<FrameStack, SpeError> {
        let header = &self.header;
        let start = header.frame_offset(0);
        let bytes = self.read_range(start..header.data_end())?;

        let mut pixels = Vec::new();
        decode_samples(&bytes, header.data_type, &mut pixels);
        Ok(FrameStack {
            frame_count: header.frame_count,
            width: header.roi.width,
            height: header.roi.height,
            pixels,
        })
    }

    /// Per-frame maximum intensity, computed once.
    pub fn max_intensity_series(&self) -> Result<&[f64], SpeError> {
        if let Some(series) = self.max_series.get() {
            return Ok(series);
        }
        let series = self.get_all_frames()?.max_intensity_series();
        Ok(self.max_series.get_or_init(|| series))
    }

    /// Per-frame maxima of the upper and lower halves.
    ///
    /// # Errors
    ///
    /// - `SpeError::EmptySplitHalf` - the ROI has a single row
    pub fn split_max_intensity_series(&self) -> Result<(Vec<f64>, Vec<f64>), SpeError> {
        self.get_all_frames()?.split_max_intensity_series()
    }

    /// Open a reader for several frame reads within one call.
    pub fn frame_reader(&self) -> Result<FrameReader, SpeError> {
        let file = File::open(&self.path)
            .map_err(|e| SpeError::io(format!("opening {}", self.path.display()), None, e))?;
        Ok(FrameReader {
            reader: BufReader::new(file),
            header: self.header,
            bytes: Vec::new(),
        })
    }

    fn read_range(&self, range: std::ops::Range<u64>) -> Result<Vec<u8>, SpeError> {
        self.header.check_in_file(&range)?;
        let mut file = File::open(&self.path)
            .map_err(|e| SpeError::io(format!("opening {}", self.path.display()), None, e))?;
        file.seek(SeekFrom::Start(range.start))
            .map_err(|e| SpeError::io("seeking", Some(range.start), e))?;

        let mut buf = vec![0u8; (range.end - range.start) as usize];
        file.read_exact(&mut buf)
            .map_err(|e| SpeError::io("reading", Some(range.start), e))?;
        Ok(buf)
    }
}

/// A read descriptor scoped to one multi-frame operation.
pub struct FrameReader {
    reader: BufReader<File>,
    header: SpeHeader,
    bytes: Vec<u8>,
}

impl FrameReader {
    /// Decode frame `index`.
    pub fn read_frame(&mut self, index: usize) -> Result<Frame, SpeError> {
        self.header.check_index(index)?;
        let offset = self.header.frame_offset(index);
        let frame_bytes = self.header.frame_byte_size();
        self.header.check_in_file(&(offset..offset + frame_bytes as u64))?;

        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| SpeError::io(format!("seeking to frame {index}"), Some(offset), e))?;
        self.bytes.resize(frame_bytes, 0);
        self.reader
            .read_exact(&mut self.bytes)
            .map_err(|e| SpeError::io(format!("reading frame {index}"), Some(offset), e))?;

        let mut pixels = Vec::new();
        decode_samples(&self.bytes, self.header.data_type, &mut pixels);
        Ok(Frame::new(
            self.header.roi.width,
            self.header.roi.height,
            pixels,
        ))
    }
}
