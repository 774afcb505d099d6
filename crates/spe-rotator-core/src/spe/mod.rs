//! SPE exposure file codec.
//!
//! This module provides functionality for:
//! - Parsing the fixed-offset binary header (data type, frame count, ROI)
//! - Extracting acquisition metadata from the trailing text block
//! - Decoding one or all frames, from disk or from memory
//! - Encoding rotated samples back into the file's sample type
//!
//! # Layout
//!
//! ```text
//! [0, 4100)                header
//! [4100, 4100 + n*F)       n frames of F = height * width * sample_size bytes
//! [metadata_offset, EOF)   tag-delimited metadata text
//! ```
//!
//! # Examples
//!
//! ```ignore
//! use spe_rotator_core::spe::SpeFile;
//!
//! let spe = SpeFile::open("run_12.spe")?;
//! let frame = spe.get_frame(0)?;
//! println!("{} frames of {}x{}", spe.frame_count(), frame.width, frame.height);
//! ```

mod buffer;
mod file;
mod frame;
pub(crate) mod header;
pub(crate) mod metadata;
mod types;

pub use buffer::SpeBuffer;
pub use file::{FrameReader, SpeFile};
pub use frame::{
    checked_split_center, decode_samples, encode_samples, split_center, Frame, FrameStack,
};
pub use header::{SpeHeader, DATA_OFFSET, HEADER_SIZE};
pub use metadata::{parse_metadata_block, Metadata};
pub use types::{DataShape, DataType, Roi, SpeError};
