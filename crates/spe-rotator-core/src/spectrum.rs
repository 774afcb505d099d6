//! Format dispatch for spectrum files.
//!
//! The format is chosen once, from the file extension, when the file is
//! opened. Only SPE files are supported.

use std::path::Path;

use crate::spe::{DataShape, Frame, Metadata, SpeError, SpeFile};

/// A multi-frame spectrum file of any supported format.
#[derive(Debug)]
pub enum SpectrumData {
    Spe(SpeFile),
}

impl SpectrumData {
    /// Open `path` with the reader its extension names (case-insensitive).
    ///
    /// # Errors
    ///
    /// - `SpeError::UnsupportedFormat` - unknown or missing extension
    /// - anything the format's own `open` returns
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SpeError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "spe" => Ok(SpectrumData::Spe(SpeFile::open(path)?)),
            other => Err(SpeError::UnsupportedFormat(format!(
                "{}: unsupported file extension .{other}",
                path.display()
            ))),
        }
    }

    /// Returns true if `path` has an extension [`SpectrumData::open`] accepts.
    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("spe"))
    }

    pub fn path(&self) -> &Path {
        match self {
            SpectrumData::Spe(spe) => spe.path(),
        }
    }

    pub fn data_shape(&self) -> DataShape {
        match self {
            SpectrumData::Spe(spe) => spe.data_shape(),
        }
    }

    pub fn get_frame(&self, index: usize) -> Result<Frame, SpeError> {
        match self {
            SpectrumData::Spe(spe) => spe.get_frame(index),
        }
    }

    pub fn max_intensity_series(&self) -> Result<&[f64], SpeError> {
        match self {
            SpectrumData::Spe(spe) => spe.max_intensity_series(),
        }
    }

    pub fn split_max_intensity_series(&self) -> Result<(Vec<f64>, Vec<f64>), SpeError> {
        match self {
            SpectrumData::Spe(spe) => spe.split_max_intensity_series(),
        }
    }

    pub fn wavelength_axis(&self) -> &[f64] {
        match self {
            SpectrumData::Spe(spe) => spe.wavelength_axis(),
        }
    }

    pub fn metadata(&self) -> Result<&Metadata, SpeError> {
        match self {
            SpectrumData::Spe(spe) => spe.metadata(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spe::DataType;
    use crate::testutil::{SpeBuilder, SAMPLE_METADATA};
    use tempfile::TempDir;

    #[test]
    fn test_open_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Run_03.SPE");
        SpeBuilder::new(DataType::UInt16, 5, 4, 3)
            .with_pixels(|f, r, c| (f * 100 + r * 5 + c) as f64)
            .with_roi_origin(20, 0)
            .with_metadata(SAMPLE_METADATA)
            .write_to(&path)
            .unwrap();

        let data = SpectrumData::open(&path).unwrap();
        assert!(matches!(data, SpectrumData::Spe(_)));
        assert_eq!(data.path(), path.as_path());
        assert_eq!(
            data.data_shape(),
            DataShape {
                frame_count: 3,
                position_pixels: 4,
                wavelength_pixels: 5
            }
        );
        assert_eq!(data.get_frame(2).unwrap().get(0, 0), 200.0);
        assert_eq!(data.max_intensity_series().unwrap(), &[19.0, 119.0, 219.0]);
        assert_eq!(data.wavelength_axis(), &[20.0, 21.0, 22.0, 23.0, 24.0]);
        assert_eq!(data.metadata().unwrap().frame_rate, Some(9.98));

        let (upper, lower) = data.split_max_intensity_series().unwrap();
        assert_eq!(upper, vec![9.0, 109.0, 209.0]);
        assert_eq!(lower, vec![19.0, 119.0, 219.0]);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        for name in ["frames.csv", "frames"] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"1,2,3").unwrap();
            assert!(matches!(
                SpectrumData::open(&path),
                Err(SpeError::UnsupportedFormat(_))
            ));
        }
    }

    #[test]
    fn test_is_supported() {
        assert!(SpectrumData::is_supported(Path::new("a.spe")));
        assert!(SpectrumData::is_supported(Path::new("dir/a.Spe")));
        assert!(!SpectrumData::is_supported(Path::new("a.spe.bak")));
        assert!(!SpectrumData::is_supported(Path::new("spe")));
    }
}
