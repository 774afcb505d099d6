//! Writing rotated frames into a duplicate SPE file.
//!
//! [`overwrite_rotated`] rewrites the frame-data region of a file that is
//! already a byte copy of the source, leaving the header, the metadata block
//! and the file length untouched. [`rotate_file`] makes the copy itself and
//! only publishes the destination once every frame has been written.
//!
//! # File layout invariant
//!
//! Each rotated frame is encoded back into the destination's sample type and
//! occupies exactly the bytes of the frame it replaces:
//!
//! ```text
//! offset(i) = 4100 + i * height * width * sample_size
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::spe::{
    checked_split_center, encode_samples, Frame, SpeError, SpeFile, SpeHeader, DATA_OFFSET,
};
use crate::transform::{rotate, PivotMode, RotationSpec};

/// Options for a rewrite beyond the rotation itself.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RewriteOptions {
    /// Frames whose source maximum reaches this value are written as zeros.
    pub saturation_threshold: Option<f64>,
    /// Replace an existing destination in [`rotate_file`].
    pub overwrite: bool,
}

/// Summary of a completed rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteReport {
    pub frames_written: usize,
    pub bytes_written: u64,
    /// Frames zeroed by the saturation threshold.
    pub frames_blanked: usize,
}

/// Overwrite every frame of `dest` with the rotated frame from `source`.
///
/// `dest` must already be a copy of `source`. See [`overwrite_rotated_with`].
pub fn overwrite_rotated(
    source: &Path,
    dest: &Path,
    spec: &RotationSpec,
) -> Result<RewriteReport, SpeError> {
    overwrite_rotated_with(source, dest, spec, &RewriteOptions::default())
}

/// Overwrite every frame of `dest` with the rotated frame from `source`.
///
/// Frames are processed in index order. Source frames are read through one
/// descriptor and the destination is written through one read-write
/// descriptor; both are closed on every exit path.
///
/// # Errors
///
/// Raised before any byte is written:
/// - `SpeError::FrameCountMismatch` - the files hold different frame counts
/// - `SpeError::FrameSizeMismatch` - a destination frame has a different size
/// - `SpeError::Format` - the destination is too short for its data region
/// - `SpeError::EmptySplitHalf` - a split-half rotation of a single-row ROI
///
/// Raised mid-loop, leaving `dest` partially rotated:
/// - `SpeError::Io` - a read, write or seek failed, or a write was short
pub fn overwrite_rotated_with(
    source: &Path,
    dest: &Path,
    spec: &RotationSpec,
    options: &RewriteOptions,
) -> Result<RewriteReport, SpeError> {
    let before = SpeFile::open(source)?;
    let after = SpeHeader::read(dest)?;
    check_compatible(before.header(), &after)?;
    if spec.pivot_mode == PivotMode::SplitHalf {
        checked_split_center(before.roi().height as usize)?;
    }

    let frame_count = before.frame_count();
    log::info!(
        "rotating {} frames of {} into {} ({:?}, {} deg)",
        frame_count,
        source.display(),
        dest.display(),
        spec.pivot_mode,
        spec.angle_degrees
    );

    let mut reader = before.frame_reader()?;
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(dest)
        .map_err(|e| SpeError::io(format!("opening {} for writing", dest.display()), None, e))?;

    let mut offset = DATA_OFFSET;
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| SpeError::io("seeking to frame data", Some(offset), e))?;

    let mut encoded = Vec::new();
    let mut report = RewriteReport {
        frames_written: 0,
        bytes_written: 0,
        frames_blanked: 0,
    };

    for index in 0..frame_count {
        let frame = reader.read_frame(index)?;

        let saturated = options
            .saturation_threshold
            .is_some_and(|threshold| frame.max() >= threshold);
        let rotated = if saturated {
            report.frames_blanked += 1;
            Frame::zeros(frame.width, frame.height)
        } else {
            rotate(&frame, spec)?
        };

        encoded.clear();
        encode_samples(&rotated.pixels, after.data_type, &mut encoded);
        offset = write_frame(&mut file, &encoded, offset, index)?;

        report.frames_written += 1;
        report.bytes_written += encoded.len() as u64;
        log::debug!(
            "frame {}/{} written{}",
            index + 1,
            frame_count,
            if saturated { " (saturated, zeroed)" } else { "" }
        );
    }

    file.sync_all()
        .map_err(|e| SpeError::io(format!("syncing {}", dest.display()), None, e))?;

    log::info!(
        "wrote {} frames ({} bytes) to {}",
        report.frames_written,
        report.bytes_written,
        dest.display()
    );
    Ok(report)
}

/// Reject destination files whose layout cannot hold the rotated frames.
fn check_compatible(before: &SpeHeader, after: &SpeHeader) -> Result<(), SpeError> {
    if before.frame_count != after.frame_count {
        return Err(SpeError::FrameCountMismatch {
            source_frames: before.frame_count,
            dest_frames: after.frame_count,
        });
    }
    if before.frame_byte_size() != after.frame_byte_size()
        || before.roi.pixel_count() != after.roi.pixel_count()
    {
        return Err(SpeError::FrameSizeMismatch {
            source_bytes: before.frame_byte_size(),
            dest_bytes: after.frame_byte_size(),
        });
    }
    if after.file_len < after.data_end() {
        return Err(SpeError::Format(format!(
            "destination holds {} bytes but its frames end at byte {}",
            after.file_len,
            after.data_end()
        )));
    }
    Ok(())
}

/// Write one encoded frame at `offset` and return the offset of the next.
///
/// The cursor is read back after the write; a position other than
/// `offset + frame.len()` means the frame boundaries are lost.
fn write_frame(file: &mut File, frame: &[u8], offset: u64, index: usize) -> Result<u64, SpeError> {
    file.write_all(frame)
        .map_err(|e| SpeError::io(format!("writing frame {index}"), Some(offset), e))?;

    let expected = offset + frame.len() as u64;
    let position = file
        .stream_position()
        .map_err(|e| SpeError::io(format!("locating end of frame {index}"), Some(offset), e))?;
    if position != expected {
        return Err(SpeError::io(
            format!("writing frame {index}: cursor at {position}, expected {expected}"),
            Some(offset),
            io::Error::from(io::ErrorKind::WriteZero),
        ));
    }
    Ok(position)
}

/// Copy `source` to `dest` with every frame rotated.
///
/// The copy is built in a temporary file next to `dest` and renamed into
/// place after all frames are written and synced, so a failure never leaves
/// a partial destination behind.
///
/// Returns `Ok(None)` without touching anything when `dest` exists and
/// `options.overwrite` is unset.
pub fn rotate_file(
    source: &Path,
    dest: &Path,
    spec: &RotationSpec,
    options: &RewriteOptions,
) -> Result<Option<RewriteReport>, SpeError> {
    if dest.exists() && !options.overwrite {
        log::info!("{} exists, skipping", dest.display());
        return Ok(None);
    }

    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".spe-rotator-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| SpeError::io(format!("creating temporary file in {}", dir.display()), None, e))?;

    log::debug!("copying {} to {}", source.display(), staged.path().display());
    let mut input = File::open(source)
        .map_err(|e| SpeError::io(format!("opening {}", source.display()), None, e))?;
    io::copy(&mut input, staged.as_file_mut())
        .map_err(|e| SpeError::io(format!("copying {}", source.display()), None, e))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| SpeError::io("syncing copy", None, e))?;

    let report = overwrite_rotated_with(source, staged.path(), spec, options)?;

    staged
        .persist(dest)
        .map_err(|e| SpeError::io(format!("renaming into {}", dest.display()), None, e.error))?;
    Ok(Some(report))
}

/// File name of the rotated copy of `file`.
///
/// The source name is kept whole, extension included, so outputs sort next
/// to each other per source.
///
/// ```text
/// run01.spe, +0.05 deg, whole        -> run01.spe_whole_p5e-2.spe
/// run01.spe, -1.2 deg, separate half -> run01.spe_separate_half_m120e-2.spe
/// ```
pub fn rotated_file_name(file: &Path, angle_degrees: f64, pivot_mode: PivotMode) -> String {
    let name = file
        .file_name()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let sign = if angle_degrees >= 0.0 { 'p' } else { 'm' };
    let hundredths = (angle_degrees.abs() * 100.0).round_ties_even();
    format!("{name}_{pivot_mode}_{sign}{hundredths:.0}e-2.spe")
}

/// One file of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotateJob {
    pub source: PathBuf,
    pub dest: PathBuf,
}

impl RotateJob {
    /// Job writing the rotated copy of `source` into `out_dir`, named by
    /// [`rotated_file_name`].
    pub fn into_dir(source: impl Into<PathBuf>, out_dir: &Path, spec: &RotationSpec) -> Self {
        let source = source.into();
        let dest = out_dir.join(rotated_file_name(
            &source,
            spec.angle_degrees,
            spec.pivot_mode,
        ));
        Self { source, dest }
    }
}

/// What happened to one job of a batch.
#[derive(Debug)]
pub enum BatchOutcome {
    Rotated(RewriteReport),
    /// The destination already existed.
    Skipped,
    Failed(SpeError),
}

impl BatchOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, BatchOutcome::Failed(_))
    }
}

/// Rotate `jobs` one after another.
///
/// A failed file is recorded and the batch moves on. `keep_going` is asked
/// before each file; once it returns false the remaining jobs are not
/// attempted and get no entry in the result.
pub fn rotate_batch(
    jobs: &[RotateJob],
    spec: &RotationSpec,
    options: &RewriteOptions,
    mut keep_going: impl FnMut() -> bool,
) -> Vec<(RotateJob, BatchOutcome)> {
    let mut results = Vec::with_capacity(jobs.len());

    for (i, job) in jobs.iter().enumerate() {
        if !keep_going() {
            log::info!("batch stopped after {} of {} files", i, jobs.len());
            break;
        }
        log::info!(
            "[{}/{}] {} -> {}",
            i + 1,
            jobs.len(),
            job.source.display(),
            job.dest.display()
        );

        let outcome = match rotate_file(&job.source, &job.dest, spec, options) {
            Ok(Some(report)) => BatchOutcome::Rotated(report),
            Ok(None) => BatchOutcome::Skipped,
            Err(err) => {
                log::error!("{}: {}", job.source.display(), err);
                BatchOutcome::Failed(err)
            }
        };
        results.push((job.clone(), outcome));
    }

    results
}
