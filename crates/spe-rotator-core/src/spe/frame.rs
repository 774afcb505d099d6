//! Frame arrays and sample encoding.
//!
//! Frames are stored row-major: rows run along the position axis, columns
//! along the wavelength axis. Samples are held as `f64`, which represents
//! every supported sample type exactly, so decoding never loses precision.
//!
//! # Cast policy
//!
//! Writing samples back to an integer type rounds half away from zero and
//! saturates at the type's bounds (`NaN` becomes 0). Writing to `Float32`
//! narrows with an ordinary `as f32` cast. Interpolated values outside the
//! original range therefore clip instead of wrapping.

use super::types::{DataType, SpeError};

/// One decoded 2-D exposure.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Columns (wavelength axis).
    pub width: u32,
    /// Rows (position axis).
    pub height: u32,
    /// Samples in row-major order; length is `width * height`.
    pub pixels: Vec<f64>,
}

impl Frame {
    /// Create a frame from dimensions and row-major samples.
    pub fn new(width: u32, height: u32, pixels: Vec<f64>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// A frame of the given size filled with zeros.
    pub fn zeros(width: u32, height: u32) -> Self {
        Self::new(width, height, vec![0.0; width as usize * height as usize])
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height as usize, self.width as usize)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.pixels[row * self.width as usize + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let w = self.width as usize;
        &self.pixels[row * w..(row + 1) * w]
    }

    /// Maximum over all samples; `f64::NEG_INFINITY` for an empty frame.
    pub fn max(&self) -> f64 {
        self.pixels.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Copy of rows `[start, end)`.
    pub fn rows(&self, start: usize, end: usize) -> Frame {
        let w = self.width as usize;
        Frame::new(
            self.width,
            (end - start) as u32,
            self.pixels[start * w..end * w].to_vec(),
        )
    }

    /// Split into rows `[0, center)` and `[center, height)`.
    pub fn split_at_row(&self, center: usize) -> (Frame, Frame) {
        (
            self.rows(0, center),
            self.rows(center, self.height as usize),
        )
    }

    /// Stack `upper` above `lower`. Both must have the same width.
    pub fn vstack(upper: Frame, lower: Frame) -> Frame {
        debug_assert_eq!(upper.width, lower.width, "Width mismatch in vstack");
        let mut pixels = upper.pixels;
        pixels.extend_from_slice(&lower.pixels);
        Frame::new(upper.width, upper.height + lower.height, pixels)
    }

    /// Column of the maximum sample for each row whose maximum exceeds
    /// `threshold`, as `(row, column)` pairs. Ties resolve to the first
    /// column.
    pub fn row_peaks(&self, threshold: f64) -> Vec<(usize, usize)> {
        (0..self.height as usize)
            .filter_map(|r| {
                let row = self.row(r);
                let (col, max) = row
                    .iter()
                    .copied()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (c, v)| {
                        if v > best.1 {
                            (c, v)
                        } else {
                            best
                        }
                    });
                (max > threshold).then_some((r, col))
            })
            .collect()
    }
}

/// All frames of a file in one contiguous buffer, `(frame_count, height, width)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStack {
    pub frame_count: usize,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<f64>,
}

impl FrameStack {
    #[inline]
    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Samples of frame `index`.
    pub fn frame_pixels(&self, index: usize) -> &[f64] {
        let n = self.frame_len();
        &self.pixels[index * n..(index + 1) * n]
    }

    /// Copy frame `index` out of the stack.
    pub fn frame(&self, index: usize) -> Frame {
        Frame::new(self.width, self.height, self.frame_pixels(index).to_vec())
    }

    /// Per-frame maximum over both spatial axes.
    pub fn max_intensity_series(&self) -> Vec<f64> {
        (0..self.frame_count)
            .map(|i| max_of(self.frame_pixels(i)))
            .collect()
    }

    /// Per-frame maxima of rows `[0, center)` and `[center, height)`.
    pub fn split_max_intensity_series(&self) -> Result<(Vec<f64>, Vec<f64>), SpeError> {
        let height = self.height as usize;
        let center = checked_split_center(height)?;
        let boundary = center * self.width as usize;

        let (upper, lower) = (0..self.frame_count)
            .map(|i| {
                let (top, bottom) = self.frame_pixels(i).split_at(boundary);
                (max_of(top), max_of(bottom))
            })
            .unzip();
        Ok((upper, lower))
    }
}

fn max_of(samples: &[f64]) -> f64 {
    samples.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Row at which a frame is split into independently rotated halves:
/// `height / 2` rounded half to even.
///
/// ```text
/// 512 -> 256, 511 -> 256, 509 -> 254, 3 -> 2, 1 -> 0
/// ```
pub fn split_center(height: usize) -> usize {
    (height as f64 / 2.0).round_ties_even() as usize
}

/// [`split_center`], failing when either half would have no rows.
pub fn checked_split_center(height: usize) -> Result<usize, SpeError> {
    let center = split_center(height);
    if center == 0 || center >= height {
        return Err(SpeError::EmptySplitHalf { height, center });
    }
    Ok(center)
}

/// Decode little-endian samples of `data_type` into `out`.
///
/// `bytes.len()` must be a multiple of the sample size.
pub fn decode_samples(bytes: &[u8], data_type: DataType, out: &mut Vec<f64>) {
    let size = data_type.size();
    debug_assert_eq!(bytes.len() % size, 0, "Truncated sample buffer");
    out.reserve(bytes.len() / size);

    let chunks = bytes.chunks_exact(size);
    match data_type {
        DataType::Float32 => out.extend(
            chunks.map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64),
        ),
        DataType::Int32 => out.extend(
            chunks.map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64),
        ),
        DataType::UInt32 => out.extend(
            chunks.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64),
        ),
        DataType::Int16 => out.extend(chunks.map(|c| i16::from_le_bytes([c[0], c[1]]) as f64)),
        DataType::UInt16 => out.extend(chunks.map(|c| u16::from_le_bytes([c[0], c[1]]) as f64)),
    }
}

/// Encode samples as little-endian `data_type`, appending to `out`.
///
/// See the module docs for the cast policy.
pub fn encode_samples(samples: &[f64], data_type: DataType, out: &mut Vec<u8>) {
    out.reserve(samples.len() * data_type.size());
    for &v in samples {
        match data_type {
            DataType::Float32 => out.extend_from_slice(&(v as f32).to_le_bytes()),
            // Float-to-int `as` casts saturate and map NaN to 0.
            DataType::Int32 => out.extend_from_slice(&(v.round() as i32).to_le_bytes()),
            DataType::UInt32 => out.extend_from_slice(&(v.round() as u32).to_le_bytes()),
            DataType::Int16 => out.extend_from_slice(&(v.round() as i16).to_le_bytes()),
            DataType::UInt16 => out.extend_from_slice(&(v.round() as u16).to_le_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, height: u32) -> Frame {
        let pixels = (0..width * height).map(|v| v as f64).collect();
        Frame::new(width, height, pixels)
    }

    #[test]
    fn test_split_center_round_half_even() {
        assert_eq!(split_center(512), 256);
        assert_eq!(split_center(511), 256);
        assert_eq!(split_center(509), 254);
        assert_eq!(split_center(4), 2);
        assert_eq!(split_center(3), 2);
        assert_eq!(split_center(1), 0);
    }

    #[test]
    fn test_checked_split_center_rejects_empty_half() {
        assert_eq!(checked_split_center(2).unwrap(), 1);
        assert!(matches!(
            checked_split_center(1),
            Err(SpeError::EmptySplitHalf {
                height: 1,
                center: 0
            })
        ));
        assert!(checked_split_center(0).is_err());
    }

    #[test]
    fn test_split_and_stack_preserve_rows() {
        let frame = ramp(4, 511);
        let (upper, lower) = frame.split_at_row(split_center(511));
        assert_eq!(upper.height, 256);
        assert_eq!(lower.height, 255);

        let stacked = Frame::vstack(upper, lower);
        assert_eq!(stacked, frame);
    }

    #[test]
    fn test_row_access() {
        let frame = ramp(3, 2);
        assert_eq!(frame.row(1), &[3.0, 4.0, 5.0]);
        assert_eq!(frame.get(1, 2), 5.0);
        assert_eq!(frame.shape(), (2, 3));
        assert_eq!(frame.max(), 5.0);
    }

    #[test]
    fn test_row_peaks_threshold_and_ties() {
        let frame = Frame::new(
            4,
            3,
            vec![
                1.0, 9.0, 9.0, 0.0, // peak at column 1 (first of the tie)
                2.0, 2.0, 2.0, 2.0, // below threshold
                0.0, 0.0, 0.0, 7.0, // peak at column 3
            ],
        );
        assert_eq!(frame.row_peaks(5.0), vec![(0, 1), (2, 3)]);
        assert!(frame.row_peaks(10.0).is_empty());
    }

    #[test]
    fn test_stack_series() {
        let stack = FrameStack {
            frame_count: 2,
            width: 2,
            height: 3,
            pixels: vec![
                1.0, 2.0, 3.0, 4.0, 5.0, 0.0, // frame 0
                9.0, 0.0, 0.0, 0.0, 0.0, 1.0, // frame 1
            ],
        };
        assert_eq!(stack.max_intensity_series(), vec![5.0, 9.0]);

        // center = round_half_even(1.5) = 2
        let (upper, lower) = stack.split_max_intensity_series().unwrap();
        assert_eq!(upper, vec![4.0, 9.0]);
        assert_eq!(lower, vec![5.0, 1.0]);

        assert_eq!(stack.frame(1).pixels, vec![9.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_decode_each_type() {
        let mut out = Vec::new();
        decode_samples(&[0x01, 0x00, 0xFF, 0xFF], DataType::UInt16, &mut out);
        assert_eq!(out, vec![1.0, 65535.0]);

        out.clear();
        decode_samples(&[0xFF, 0xFF], DataType::Int16, &mut out);
        assert_eq!(out, vec![-1.0]);

        out.clear();
        decode_samples(&(-70000i32).to_le_bytes(), DataType::Int32, &mut out);
        assert_eq!(out, vec![-70000.0]);

        out.clear();
        decode_samples(&u32::MAX.to_le_bytes(), DataType::UInt32, &mut out);
        assert_eq!(out, vec![u32::MAX as f64]);

        out.clear();
        decode_samples(&1.5f32.to_le_bytes(), DataType::Float32, &mut out);
        assert_eq!(out, vec![1.5]);
    }

    #[test]
    fn test_encode_saturates_and_rounds() {
        let mut out = Vec::new();
        encode_samples(&[-3.7, 70000.2, 12.5, 12.4, f64::NAN], DataType::UInt16, &mut out);

        let mut decoded = Vec::new();
        decode_samples(&out, DataType::UInt16, &mut decoded);
        assert_eq!(decoded, vec![0.0, 65535.0, 13.0, 12.0, 0.0]);
    }

    #[test]
    fn test_encode_signed_saturation() {
        let mut out = Vec::new();
        encode_samples(&[-40000.0, 40000.0, -2.5], DataType::Int16, &mut out);

        let mut decoded = Vec::new();
        decode_samples(&out, DataType::Int16, &mut decoded);
        assert_eq!(decoded, vec![-32768.0, 32767.0, -3.0]);
    }

    #[test]
    fn test_encode_float_keeps_fraction() {
        let mut out = Vec::new();
        encode_samples(&[0.25, -1e6], DataType::Float32, &mut out);
        assert_eq!(out.len(), 8);

        let mut decoded = Vec::new();
        decode_samples(&out, DataType::Float32, &mut decoded);
        assert_eq!(decoded, vec![0.25, -1e6]);
    }
}
