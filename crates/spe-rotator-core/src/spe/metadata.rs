//! Trailing acquisition metadata.
//!
//! The block after the frame data is tag-delimited text. Rather than parsing
//! it as a document, the text is split on `<` and each token is matched
//! against a fixed set of tag signatures; the value is whatever follows the
//! token's last `>`. Tokens containing `/` (closing and self-closing tags)
//! never carry a value and are skipped.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Acquisition metadata. Fields missing from the block stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Attenuation filter label (optical density).
    pub filter_label: Option<String>,
    /// Frames per second.
    pub frame_rate: Option<f64>,
    /// Acquisition timestamp as stored.
    pub acquisition_date: Option<String>,
    /// Wavelength calibration timestamp as stored.
    pub calibration_date: Option<String>,
    pub base_filename: Option<String>,
    pub increment_number: Option<u32>,
}

impl Metadata {
    /// Parse the acquisition date as an RFC 3339 timestamp.
    pub fn acquired_at(&self) -> Option<DateTime<FixedOffset>> {
        self.acquisition_date
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    }

    /// Returns true if no field was found.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Extract the known fields from a metadata block.
///
/// Later matches overwrite earlier ones. A value that fails to parse leaves
/// its field unset.
pub fn parse_metadata_block(block: &[u8]) -> Metadata {
    let text = String::from_utf8_lossy(block);
    let mut meta = Metadata::default();

    for token in text.split('<') {
        if token.contains('/') {
            continue;
        }
        let Some((_, value)) = token.rsplit_once('>') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        if token.contains("FrameRate r:readOnly") {
            match value.parse::<f64>() {
                Ok(v) => meta.frame_rate = Some(v),
                Err(_) => log::debug!("ignoring unparseable frame rate {value:?}"),
            }
        }
        if token.contains("BaseFileName") {
            meta.base_filename = Some(value.to_string());
        }
        if token.contains("IncrementNumber") {
            match value.parse::<u32>() {
                Ok(v) => meta.increment_number = Some(v),
                Err(_) => log::debug!("ignoring unparseable increment number {value:?}"),
            }
        }
        if token.contains("ReferenceFileDate r:readOnly") {
            meta.acquisition_date = Some(value.to_string());
        }
        if token.contains("Date r:readOnly") && !token.contains("Reference") {
            meta.calibration_date = Some(value.to_string());
        }
        // `BaseFileName type=...` also contains "Name type"
        if token.contains("Name type") && !token.contains("FileName") {
            meta.filter_label = Some(value.to_string());
        }
    }

    meta
}

/// Metadata block with every supported field, for tests.
#[cfg(any(test, feature = "test-util"))]
pub const SAMPLE_BLOCK: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<SpeFormat version="3.0" xmlns="http://www.princetoninstruments.com/spe/2009">"#,
    r#"<DataHistories><DataHistory><Origin>"#,
    r#"<Experiment><Devices><Cameras><Camera>"#,
    r#"<ShutterTiming><ExposureTime type="Double">100</ExposureTime></ShutterTiming>"#,
    r#"<FrameRate r:readOnly="true" type="Double">9.98</FrameRate>"#,
    r#"</Camera></Cameras>"#,
    r#"<Filters><Filter><Name type="String">OD2</Name></Filter></Filters>"#,
    r#"</Devices>"#,
    r#"<FileNameGeneration><BaseFileName type="String">run</BaseFileName>"#,
    r#"<IncrementNumber type="Int64">12</IncrementNumber></FileNameGeneration>"#,
    r#"<ReferenceFileDate r:readOnly="true">2024-05-10T15:23:45.1234567+09:00</ReferenceFileDate>"#,
    r#"<Calibrations><Wavelength><Date r:readOnly="true">2024-04-01T09:00:00+09:00</Date></Wavelength></Calibrations>"#,
    r#"</Experiment></Origin></DataHistory></DataHistories></SpeFormat>"#,
);
