//! Frame transformation operations.
//!
//! Every frame of a file is rotated by the same [`RotationSpec`] before it is
//! encoded back into the file's sample type.
//!
//! # Coordinate System
//!
//! - Rotation angles are in degrees, positive = counter-clockwise
//! - Row 0 is the top of the frame, column 0 the left
//! - The rotation pivot is the geometric center `((w - 1) / 2, (h - 1) / 2)`

mod rotation;

pub use rotation::{
    rotate, rotate_about_center, InterpolationFilter, ParsePivotModeError, PivotMode,
    RotationSpec,
};
