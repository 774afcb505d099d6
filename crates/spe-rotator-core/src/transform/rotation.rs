//! Frame rotation with bilinear and Lanczos3 interpolation.
//!
//! Rotation keeps the frame's shape: content rotated past the edges is
//! discarded and uncovered area is filled with zero.
//!
//! # Algorithm
//!
//! The rotation uses inverse mapping: for each output pixel, we calculate
//! which source position it came from and interpolate there. With the pivot
//! at `(cx, cy) = ((w - 1) / 2, (h - 1) / 2)` and rotation angle θ:
//!
//! ```text
//! src_x = (dst_x - cx) * cos(θ) - (dst_y - cy) * sin(θ) + cx
//! src_y = (dst_x - cx) * sin(θ) + (dst_y - cy) * cos(θ) + cy
//! ```
//!
//! Row 0 is displayed at the top, so positive angles rotate content
//! counter-clockwise on screen.
//!
//! # Pivot modes
//!
//! - [`PivotMode::Whole`]: one rotation about the frame center
//! - [`PivotMode::SplitHalf`]: rows `[0, c)` and `[c, h)` are rotated about
//!   their own centers and stacked back, with `c = round_half_even(h / 2)`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spe::{checked_split_center, Frame, SpeError};

/// Angles closer to zero than this are treated as no rotation.
const ANGLE_EPSILON: f64 = 0.001;

/// Slack when deciding whether a mapped coordinate is inside the frame.
const EDGE_EPSILON: f64 = 1e-9;

/// Interpolation filter for rotation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationFilter {
    /// Bilinear interpolation. Never leaves the range of its four neighbors.
    #[default]
    Bilinear,
    /// Lanczos3 interpolation. Sharper, and may overshoot the input range.
    Lanczos3,
}

/// Where a frame is pivoted when rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotMode {
    /// Rotate the whole frame about its center.
    #[default]
    Whole,
    /// Rotate the upper and lower halves about their own centers.
    #[serde(rename = "separate_half")]
    SplitHalf,
}

impl PivotMode {
    /// Name used in rotated file names.
    pub fn as_str(self) -> &'static str {
        match self {
            PivotMode::Whole => "whole",
            PivotMode::SplitHalf => "separate_half",
        }
    }
}

impl fmt::Display for PivotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown pivot mode {0:?} (expected \"whole\" or \"separate_half\")")]
pub struct ParsePivotModeError(String);

impl FromStr for PivotMode {
    type Err = ParsePivotModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "whole" => Ok(PivotMode::Whole),
            "separate_half" | "separate-half" | "split_half" | "split-half" => {
                Ok(PivotMode::SplitHalf)
            }
            _ => Err(ParsePivotModeError(s.to_string())),
        }
    }
}

/// A rotation to apply to every frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RotationSpec {
    /// Degrees, positive = counter-clockwise as displayed.
    pub angle_degrees: f64,
    pub pivot_mode: PivotMode,
    #[serde(default)]
    pub filter: InterpolationFilter,
}

impl RotationSpec {
    pub fn new(angle_degrees: f64, pivot_mode: PivotMode) -> Self {
        Self {
            angle_degrees,
            pivot_mode,
            filter: InterpolationFilter::Bilinear,
        }
    }

    pub fn with_filter(mut self, filter: InterpolationFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Returns true if frames pass through unchanged.
    pub fn is_identity(&self) -> bool {
        self.angle_degrees.abs() < ANGLE_EPSILON
    }
}

/// Rotate a frame according to `spec`, keeping its shape.
///
/// # Errors
///
/// - `SpeError::EmptySplitHalf` - split-half rotation of a frame with fewer
///   than two rows
///
/// # Example
///
/// ```ignore
/// use spe_rotator_core::transform::{rotate, PivotMode, RotationSpec};
///
/// let rotated = rotate(&frame, &RotationSpec::new(0.35, PivotMode::SplitHalf))?;
/// assert_eq!(rotated.shape(), frame.shape());
/// ```
pub fn rotate(frame: &Frame, spec: &RotationSpec) -> Result<Frame, SpeError> {
    match spec.pivot_mode {
        PivotMode::Whole => Ok(rotate_about_center(frame, spec.angle_degrees, spec.filter)),
        PivotMode::SplitHalf => {
            let center = checked_split_center(frame.height as usize)?;
            let (upper, lower) = frame.split_at_row(center);
            Ok(Frame::vstack(
                rotate_about_center(&upper, spec.angle_degrees, spec.filter),
                rotate_about_center(&lower, spec.angle_degrees, spec.filter),
            ))
        }
    }
}

/// Rotate a frame about its geometric center, keeping its shape.
pub fn rotate_about_center(frame: &Frame, angle_degrees: f64, filter: InterpolationFilter) -> Frame {
    // Fast path: no rotation needed
    if angle_degrees.abs() < ANGLE_EPSILON {
        return frame.clone();
    }

    let (w, h) = (frame.width as usize, frame.height as usize);
    let angle_rad = angle_degrees.to_radians();
    let cos = angle_rad.cos();
    let sin = angle_rad.sin();

    let cx = (w as f64 - 1.0) / 2.0;
    let cy = (h as f64 - 1.0) / 2.0;

    let mut output = Vec::with_capacity(w * h);

    for dst_y in 0..h {
        for dst_x in 0..w {
            // Translate destination point to origin at center
            let dx = dst_x as f64 - cx;
            let dy = dst_y as f64 - cy;

            // Apply inverse rotation to find source coordinates
            let src_x = dx * cos - dy * sin + cx;
            let src_y = dx * sin + dy * cos + cy;

            output.push(match filter {
                InterpolationFilter::Bilinear => sample_bilinear(frame, src_x, src_y),
                InterpolationFilter::Lanczos3 => sample_lanczos3(frame, src_x, src_y),
            });
        }
    }

    Frame::new(frame.width, frame.height, output)
}

/// Sample a frame using bilinear interpolation.
///
/// Positions inside the closed rectangle `[0, w-1] x [0, h-1]` are
/// interpolated from their 4 nearest pixels; anything else reads as zero.
fn sample_bilinear(frame: &Frame, x: f64, y: f64) -> f64 {
    let (w, h) = (frame.width as usize, frame.height as usize);
    if w == 0 || h == 0 {
        return 0.0;
    }
    let max_x = (w - 1) as f64;
    let max_y = (h - 1) as f64;

    if x < -EDGE_EPSILON || x > max_x + EDGE_EPSILON || y < -EDGE_EPSILON || y > max_y + EDGE_EPSILON
    {
        return 0.0;
    }
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);

    // Fractional distances
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = frame.get(y0, x0);
    let p10 = frame.get(y0, x1);
    let p01 = frame.get(y1, x0);
    let p11 = frame.get(y1, x1);

    p00 * (1.0 - fx) * (1.0 - fy) + p10 * fx * (1.0 - fy) + p01 * (1.0 - fx) * fy + p11 * fx * fy
}

/// Sample a frame using Lanczos3 interpolation.
///
/// Lanczos3 considers a 6x6 neighborhood of pixels. The result is not
/// clamped, so it can exceed the range of the input.
fn sample_lanczos3(frame: &Frame, x: f64, y: f64) -> f64 {
    let (w, h) = (frame.width as i64, frame.height as i64);

    // Check bounds with kernel radius - fall back to bilinear near edges
    if x < 2.0 || x >= (w - 3) as f64 || y < 2.0 || y >= (h - 3) as f64 {
        return sample_bilinear(frame, x, y);
    }

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;

    let mut sum = 0.0;
    let mut weight_sum = 0.0;

    for ky in -2..=3 {
        for kx in -2..=3 {
            let px = x0 + kx;
            let py = y0 + ky;

            let weight = lanczos_weight(x - px as f64, 3.0) * lanczos_weight(y - py as f64, 3.0);
            sum += frame.get(py as usize, px as usize) * weight;
            weight_sum += weight;
        }
    }

    if weight_sum.abs() > f64::EPSILON {
        sum / weight_sum
    } else {
        0.0
    }
}

/// Lanczos kernel weight function.
///
/// ```text
/// L(x) = sinc(x) * sinc(x/a)  for |x| < a
/// L(x) = 0                     for |x| >= a
/// ```
fn lanczos_weight(x: f64, a: f64) -> f64 {
    if x.abs() < f64::EPSILON {
        return 1.0;
    }
    if x.abs() >= a {
        return 0.0;
    }

    let pi_x = std::f64::consts::PI * x;
    let pi_x_a = pi_x / a;
    (a * pi_x.sin() * pi_x_a.sin()) / (pi_x * pi_x)
}
