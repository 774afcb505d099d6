//! Subcommand implementations.
//!
//! Tabular output goes to the writer passed in (stdout in `main`); progress
//! and warnings go through `log`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use spe_rotator_core::{
    rotate_batch, BatchOutcome, InterpolationFilter, RewriteOptions, RotateJob, RotationSpec,
    SpeFile, SpectrumData,
};

use crate::config::{Cli, Command, RotateArgs, Settings, SettingsCommand};

/// Run the parsed command, writing its output to `out`.
pub fn run(cli: Cli, out: &mut impl Write) -> Result<ExitCode> {
    let settings_path = cli.settings_path();
    let load = || Settings::load(&settings_path);

    match cli.command {
        Command::Settings(cmd) => settings(cmd, &settings_path, out)?,
        Command::List { dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => load()?.read_dir()?.to_path_buf(),
            };
            list(&dir, out)?;
        }
        Command::Info { file } => info(&load()?.resolve(&file), out)?,
        Command::Series { file, split } => series(&load()?.resolve(&file), split, out)?,
        Command::Rotate(args) => {
            let failed = rotate(&args, &load()?, out)?;
            if failed > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn settings(cmd: SettingsCommand, path: &Path, out: &mut impl Write) -> Result<()> {
    let mut settings = Settings::load(path)?;
    match cmd {
        SettingsCommand::Show => {
            writeln!(out, "settings file: {}", path.display())?;
            writeln!(out, "read_path: {}", display_opt(settings.read_path.as_deref()))?;
            writeln!(out, "save_path: {}", display_opt(settings.save_path.as_deref()))?;
            return Ok(());
        }
        SettingsCommand::SetRead { dir } => settings.read_path = Some(existing_dir(&dir)?),
        SettingsCommand::SetSave { dir } => settings.save_path = Some(existing_dir(&dir)?),
    }
    settings.save(path)?;
    log::info!("updated {}", path.display());
    Ok(())
}

fn display_opt(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}

fn existing_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }
    dir.canonicalize()
        .with_context(|| format!("Failed to resolve {}", dir.display()))
}

/// Supported files in `dir`, sorted by name, hidden files excluded.
fn spectrum_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if !hidden && path.is_file() && SpectrumData::is_supported(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn list(dir: &Path, out: &mut impl Write) -> Result<()> {
    for path in spectrum_files(dir)? {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        let label = match SpeFile::open(&path) {
            Ok(spe) => spe
                .metadata()
                .ok()
                .and_then(|m| m.filter_label.clone())
                .unwrap_or_else(|| "-".to_string()),
            Err(err) => {
                log::warn!("{}: {}", path.display(), err);
                "-".to_string()
            }
        };
        writeln!(out, "{name}\t{label}")?;
    }
    Ok(())
}

fn info(path: &Path, out: &mut impl Write) -> Result<()> {
    let spe = SpeFile::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let roi = spe.roi();

    writeln!(out, "file: {}", path.display())?;
    writeln!(out, "data type: {:?}", spe.data_type())?;
    writeln!(out, "frames: {}", spe.frame_count())?;
    writeln!(
        out,
        "roi: {}x{} at ({}, {})",
        roi.width, roi.height, roi.x, roi.y
    )?;

    match spe.metadata() {
        Ok(m) => {
            let field = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
            writeln!(out, "filter: {}", field(m.filter_label.clone()))?;
            writeln!(out, "frame rate: {}", field(m.frame_rate.map(|r| r.to_string())))?;
            writeln!(
                out,
                "acquired: {}",
                field(
                    m.acquired_at()
                        .map(|t| t.to_rfc3339())
                        .or_else(|| m.acquisition_date.clone())
                )
            )?;
            writeln!(out, "calibrated: {}", field(m.calibration_date.clone()))?;
            writeln!(out, "base file name: {}", field(m.base_filename.clone()))?;
            writeln!(
                out,
                "increment: {}",
                field(m.increment_number.map(|n| n.to_string()))
            )?;
        }
        Err(err) if err.is_non_fatal() => writeln!(out, "metadata: unavailable")?,
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn series(path: &Path, split: bool, out: &mut impl Write) -> Result<()> {
    let data =
        SpectrumData::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    if split {
        let (upper, lower) = data.split_max_intensity_series()?;
        writeln!(out, "frame,upper,lower")?;
        for (i, (u, l)) in upper.iter().zip(&lower).enumerate() {
            writeln!(out, "{i},{u},{l}")?;
        }
    } else {
        writeln!(out, "frame,max")?;
        for (i, max) in data.max_intensity_series()?.iter().enumerate() {
            writeln!(out, "{i},{max}")?;
        }
    }
    Ok(())
}

/// Rotate every file of `args`; returns the number of failed files.
fn rotate(args: &RotateArgs, settings: &Settings, out: &mut impl Write) -> Result<usize> {
    let out_dir = match &args.out_dir {
        Some(dir) => dir.clone(),
        None => settings.save_dir()?.to_path_buf(),
    };
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let filter = if args.lanczos {
        InterpolationFilter::Lanczos3
    } else {
        InterpolationFilter::Bilinear
    };
    let spec = RotationSpec::new(args.angle, args.pivot).with_filter(filter);
    let options = RewriteOptions {
        saturation_threshold: args.saturation_threshold,
        overwrite: args.overwrite,
    };

    let jobs: Vec<RotateJob> = args
        .files
        .iter()
        .map(|file| RotateJob::into_dir(settings.resolve(file), &out_dir, &spec))
        .collect();

    let results = rotate_batch(&jobs, &spec, &options, || true);

    let mut failed = 0;
    for (job, outcome) in &results {
        let status = match outcome {
            BatchOutcome::Rotated(report) => format!("rotated ({} frames)", report.frames_written),
            BatchOutcome::Skipped => "skipped (exists)".to_string(),
            BatchOutcome::Failed(err) => {
                failed += 1;
                format!("failed: {err}")
            }
        };
        writeln!(
            out,
            "{} -> {}: {}",
            job.source.display(),
            job.dest.display(),
            status
        )?;
    }
    Ok(failed)
}
