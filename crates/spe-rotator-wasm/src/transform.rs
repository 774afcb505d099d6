//! WASM bindings for rotation preview.
//!
//! The preview shows exactly what the file rewriter will write, before the
//! samples are cast back to the file's data type.

use crate::types::JsFrame;
use spe_rotator_core::spe;
use spe_rotator_core::transform::{rotate, InterpolationFilter, PivotMode, RotationSpec};
use wasm_bindgen::prelude::*;

/// Rotate a frame, keeping its shape.
///
/// # Arguments
///
/// * `frame` - Frame to rotate
/// * `angle_degrees` - Rotation angle in degrees (positive = counter-clockwise)
/// * `split_half` - Rotate the upper and lower halves about their own centers
/// * `use_lanczos` - Use Lanczos3 instead of bilinear interpolation
///
/// # Errors
/// Returns error if `split_half` is set and the frame has fewer than 2 rows
///
/// # Example (TypeScript)
///
/// ```typescript
/// const preview = rotate_frame(frame, -0.2, true, false);
/// ```
#[wasm_bindgen]
pub fn rotate_frame(
    frame: &JsFrame,
    angle_degrees: f64,
    split_half: bool,
    use_lanczos: bool,
) -> Result<JsFrame, JsValue> {
    let spec = preview_spec(angle_degrees, split_half, use_lanczos);
    rotate(&frame.to_frame(), &spec)
        .map(JsFrame::from_frame)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Column of the brightest sample in each row brighter than `threshold`.
///
/// Returned flat as `[row0, col0, row1, col1, ...]`.
#[wasm_bindgen]
pub fn row_peaks(frame: &JsFrame, threshold: f64) -> Vec<u32> {
    frame
        .to_frame()
        .row_peaks(threshold)
        .into_iter()
        .flat_map(|(row, col)| [row as u32, col as u32])
        .collect()
}

/// Row at which a frame of `height` rows is split into halves.
#[wasm_bindgen]
pub fn split_center(height: usize) -> usize {
    spe::split_center(height)
}

fn preview_spec(angle_degrees: f64, split_half: bool, use_lanczos: bool) -> RotationSpec {
    let pivot = if split_half {
        PivotMode::SplitHalf
    } else {
        PivotMode::Whole
    };
    let filter = if use_lanczos {
        InterpolationFilter::Lanczos3
    } else {
        InterpolationFilter::Bilinear
    };
    RotationSpec::new(angle_degrees, pivot).with_filter(filter)
}
