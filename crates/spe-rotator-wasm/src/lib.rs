//! SPE Rotator WASM - WebAssembly bindings for SPE preview
//!
//! This crate exposes the spe-rotator-core codec and rotation engine to
//! browser front ends that display frames and intensity series.
//!
//! # Module Structure
//!
//! - `types` - WASM-compatible wrapper type for frame data
//! - `decode` - In-memory SPE file access (frames, series, metadata)
//! - `transform` - Frame rotation preview and row peak overlay
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsSpeFile, rotate_frame } from '@spe-rotator/wasm';
//!
//! await init();
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const spe = new JsSpeFile(bytes);
//! const frame = spe.frame(0);
//! const preview = rotate_frame(frame, 0.35, true, false);
//! ```

use wasm_bindgen::prelude::*;

mod decode;
mod transform;
mod types;

// Re-export public types
pub use decode::JsSpeFile;
pub use transform::{rotate_frame, row_peaks, split_center};
pub use types::JsFrame;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
