//! WASM bindings for reading SPE files held in memory.
//!
//! The browser reads the whole file into a `Uint8Array`; every accessor here
//! works on that buffer.

use crate::types::JsFrame;
use serde::Serialize;
use spe_rotator_core::spe::SpeBuffer;
use spe_rotator_core::SpeError;
use wasm_bindgen::prelude::*;

/// Per-frame maxima of the two halves of a split frame.
#[derive(Debug, Serialize)]
struct SplitSeries {
    upper: Vec<f64>,
    lower: Vec<f64>,
}

/// An SPE file loaded from bytes.
#[wasm_bindgen]
pub struct JsSpeFile {
    inner: SpeBuffer,
}

#[wasm_bindgen]
impl JsSpeFile {
    /// Parse the header of a complete SPE file.
    ///
    /// # Errors
    /// Returns error if the header is malformed or the data type unknown
    #[wasm_bindgen(constructor)]
    pub fn new(bytes: Vec<u8>) -> Result<JsSpeFile, JsValue> {
        let inner = SpeBuffer::from_bytes(bytes).map_err(to_js)?;
        Ok(JsSpeFile { inner })
    }

    #[wasm_bindgen(getter)]
    pub fn frame_count(&self) -> usize {
        self.inner.header().frame_count
    }

    /// Columns per frame (wavelength axis)
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.header().roi.width
    }

    /// Rows per frame (position axis)
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.header().roi.height
    }

    /// Header data-type code (0 float32, 1 int32, 2 int16, 3 uint16, 8 uint32)
    #[wasm_bindgen(getter)]
    pub fn data_type(&self) -> u16 {
        self.inner.header().data_type.code()
    }

    /// Decode frame `index`.
    pub fn frame(&self, index: usize) -> Result<JsFrame, JsValue> {
        self.inner
            .get_frame(index)
            .map(JsFrame::from_frame)
            .map_err(to_js)
    }

    /// Sensor column of each frame column.
    pub fn wavelength_axis(&self) -> Vec<f64> {
        self.inner.header().wavelength_axis()
    }

    /// Per-frame maximum intensity.
    pub fn max_intensity_series(&self) -> Result<Vec<f64>, JsValue> {
        self.max_series().map_err(to_js)
    }

    /// Per-frame maxima of the upper and lower halves, as `{upper, lower}`.
    pub fn split_max_intensity_series(&self) -> Result<JsValue, JsValue> {
        let series = self.split_series().map_err(to_js)?;
        serde_wasm_bindgen::to_value(&series)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize series: {}", e)))
    }

    /// Acquisition metadata, or `null` when the file has none.
    pub fn metadata(&self) -> Result<JsValue, JsValue> {
        match self.inner.metadata() {
            Ok(metadata) => serde_wasm_bindgen::to_value(&metadata)
                .map_err(|e| JsValue::from_str(&format!("Failed to serialize metadata: {}", e))),
            Err(err) if err.is_non_fatal() => Ok(JsValue::NULL),
            Err(err) => Err(to_js(err)),
        }
    }
}

impl JsSpeFile {
    fn max_series(&self) -> Result<Vec<f64>, SpeError> {
        Ok(self.inner.get_all_frames()?.max_intensity_series())
    }

    fn split_series(&self) -> Result<SplitSeries, SpeError> {
        let (upper, lower) = self.inner.get_all_frames()?.split_max_intensity_series()?;
        Ok(SplitSeries { upper, lower })
    }
}

fn to_js(err: SpeError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Tests that avoid constructing `JsValue`, which only works on wasm32.
#[cfg(test)]
mod tests {
    use super::*;
    use spe_rotator_core::testutil::SpeBuilder;
    use spe_rotator_core::DataType;

    fn test_file() -> JsSpeFile {
        let bytes = SpeBuilder::new(DataType::UInt16, 4, 3, 2)
            .with_pixels(|f, r, c| (f * 50 + r * 4 + c) as f64)
            .with_roi_origin(100, 0)
            .build();
        JsSpeFile {
            inner: SpeBuffer::from_bytes(bytes).unwrap(),
        }
    }

    #[test]
    fn test_geometry_getters() {
        let spe = test_file();
        assert_eq!(spe.frame_count(), 2);
        assert_eq!(spe.width(), 4);
        assert_eq!(spe.height(), 3);
        assert_eq!(spe.data_type(), 3);
        assert_eq!(spe.wavelength_axis(), vec![100.0, 101.0, 102.0, 103.0]);
    }

    #[test]
    fn test_series() {
        let spe = test_file();
        assert_eq!(spe.max_series().unwrap(), vec![11.0, 61.0]);

        let split = spe.split_series().unwrap();
        assert_eq!(split.upper, vec![7.0, 57.0]);
        assert_eq!(split.lower, vec![11.0, 61.0]);
    }
}
