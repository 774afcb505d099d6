//! WASM-compatible wrapper type for frame data.

use spe_rotator_core::Frame;
use wasm_bindgen::prelude::*;

/// A decoded frame for JavaScript.
///
/// Samples are `f64` in row-major order; rows run along the position axis
/// and columns along the wavelength axis.
///
/// # Memory Management
///
/// The samples live in WASM memory. `pixels()` copies them into a
/// `Float64Array`.
#[wasm_bindgen]
pub struct JsFrame {
    width: u32,
    height: u32,
    pixels: Vec<f64>,
}

#[wasm_bindgen]
impl JsFrame {
    /// Create a frame from dimensions and row-major samples.
    ///
    /// # Errors
    /// Returns error if `pixels.length != width * height`
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixels: Vec<f64>) -> Result<JsFrame, JsValue> {
        if pixels.len() != width as usize * height as usize {
            return Err(JsValue::from_str(&format!(
                "Expected {} samples for {}x{}, got {}",
                width as usize * height as usize,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(JsFrame {
            width,
            height,
            pixels,
        })
    }

    /// Columns (wavelength axis)
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Rows (position axis)
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the samples as Float64Array (copied).
    pub fn pixels(&self) -> Vec<f64> {
        self.pixels.clone()
    }

    /// Largest sample, for color scaling.
    pub fn max(&self) -> f64 {
        self.pixels.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Explicitly free WASM memory.
    pub fn free(self) {}
}

impl JsFrame {
    pub(crate) fn from_frame(frame: Frame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            pixels: frame.pixels,
        }
    }

    /// Convert back to a core Frame (clones the samples).
    pub(crate) fn to_frame(&self) -> Frame {
        Frame::new(self.width, self.height, self.pixels.clone())
    }
}
