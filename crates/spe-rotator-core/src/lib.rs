//! SPE Rotator Core - spectrum file codec and rotation pipeline
//!
//! This crate reads multi-frame `.spe` exposure files, rotates their frames
//! and writes rotated copies that keep the original binary layout.

pub mod rewrite;
pub mod spe;
pub mod spectrum;
pub mod transform;

#[cfg(any(test, feature = "test-util"))]
pub mod testutil;

pub use rewrite::{
    overwrite_rotated, overwrite_rotated_with, rotate_batch, rotate_file, rotated_file_name,
    BatchOutcome, RewriteOptions, RewriteReport, RotateJob,
};
pub use spe::{DataShape, DataType, Frame, FrameStack, Metadata, Roi, SpeBuffer, SpeError, SpeFile};
pub use spectrum::SpectrumData;
pub use transform::{rotate, InterpolationFilter, PivotMode, RotationSpec};
