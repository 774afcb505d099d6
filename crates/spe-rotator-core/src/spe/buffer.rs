//! In-memory SPE file, for callers that already hold the bytes.

use super::frame::{decode_samples, Frame, FrameStack};
use super::header::SpeHeader;
use super::metadata::{parse_metadata_block, Metadata};
use super::types::{DataShape, SpeError};

/// An SPE file loaded into memory.
#[derive(Debug, Clone)]
pub struct SpeBuffer {
    bytes: Vec<u8>,
    header: SpeHeader,
}

impl SpeBuffer {
    /// Parse the header of a complete file image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SpeError> {
        let header = SpeHeader::parse(&bytes, bytes.len() as u64)?;
        Ok(Self { bytes, header })
    }

    pub fn header(&self) -> &SpeHeader {
        &self.header
    }

    pub fn data_shape(&self) -> DataShape {
        DataShape {
            frame_count: self.header.frame_count,
            position_pixels: self.header.roi.height as usize,
            wavelength_pixels: self.header.roi.width as usize,
        }
    }

    /// Parse the trailing metadata block.
    pub fn metadata(&self) -> Result<Metadata, SpeError> {
        let range = self.header.metadata_range()?;
        Ok(parse_metadata_block(
            &self.bytes[range.start as usize..range.end as usize],
        ))
    }

    /// Decode frame `index`.
    pub fn get_frame(&self, index: usize) -> Result<Frame, SpeError> {
        self.header.check_index(index)?;
        let start = self.header.frame_offset(index);
        let bytes = self.slice(start, self.header.frame_offset(index + 1))?;

        let mut pixels = Vec::new();
        decode_samples(bytes, self.header.data_type, &mut pixels);
        Ok(Frame::new(self.header.roi.width, self.header.roi.height, pixels))
    }

    /// Decode every frame.
    pub fn get_all_frames(&self) -> Result<FrameStack, SpeError> {
        let bytes = self.slice(self.header.frame_offset(0), self.header.data_end())?;

        let mut pixels = Vec::new();
        decode_samples(bytes, self.header.data_type, &mut pixels);
        Ok(FrameStack {
            frame_count: self.header.frame_count,
            width: self.header.roi.width,
            height: self.header.roi.height,
            pixels,
        })
    }

    fn slice(&self, start: u64, end: u64) -> Result<&[u8], SpeError> {
        if end > self.bytes.len() as u64 {
            return Err(SpeError::io(
                "reading frame data",
                Some(start),
                std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
            ));
        }
        Ok(&self.bytes[start as usize..end as usize])
    }
}
