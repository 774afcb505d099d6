//! Synthetic SPE files for tests.

use std::io;
use std::path::Path;

use crate::spe::header::{write_header, HEADER_SIZE};
use crate::spe::{encode_samples, DataType};

pub use crate::spe::metadata::SAMPLE_BLOCK as SAMPLE_METADATA;

type PixelFn = Box<dyn Fn(usize, usize, usize) -> f64>;

/// Builder for a single-ROI SPE file.
pub struct SpeBuilder {
    data_type: DataType,
    width: u32,
    height: u32,
    frame_count: usize,
    roi_origin: (u16, u16),
    pixels: PixelFn,
    metadata: Option<String>,
}

impl SpeBuilder {
    /// `frame_count` frames of `width` columns by `height` rows, all zero.
    pub fn new(data_type: DataType, width: u32, height: u32, frame_count: usize) -> Self {
        Self {
            data_type,
            width,
            height,
            frame_count,
            roi_origin: (0, 0),
            pixels: Box::new(|_, _, _| 0.0),
            metadata: None,
        }
    }

    /// Sample value as a function of `(frame, row, column)`.
    pub fn with_pixels(mut self, f: impl Fn(usize, usize, usize) -> f64 + 'static) -> Self {
        self.pixels = Box::new(f);
        self
    }

    /// Append a metadata block and point the header at it.
    pub fn with_metadata(mut self, block: &str) -> Self {
        self.metadata = Some(block.to_string());
        self
    }

    /// Sensor position of the ROI's first column and row.
    pub fn with_roi_origin(mut self, x: u16, y: u16) -> Self {
        self.roi_origin = (x, y);
        self
    }

    /// Serialize the file.
    pub fn build(&self) -> Vec<u8> {
        let (x, y) = self.roi_origin;
        let roi_entry = [
            x,
            x + self.width as u16 - 1,
            1,
            y,
            y + self.height as u16 - 1,
            1,
        ];

        let mut bytes = vec![0u8; HEADER_SIZE];
        let mut samples = Vec::with_capacity(self.width as usize * self.height as usize);
        for f in 0..self.frame_count {
            samples.clear();
            for r in 0..self.height as usize {
                for c in 0..self.width as usize {
                    samples.push((self.pixels)(f, r, c));
                }
            }
            encode_samples(&samples, self.data_type, &mut bytes);
        }

        let metadata_offset = match &self.metadata {
            Some(block) => {
                let offset = bytes.len() as i64;
                bytes.extend_from_slice(block.as_bytes());
                offset
            }
            None => 0,
        };

        write_header(
            &mut bytes[..HEADER_SIZE],
            self.data_type.code(),
            self.frame_count as i32,
            roi_entry,
            (self.width as u16, self.height as u16),
            metadata_offset,
        );
        bytes
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.build())
    }
}
