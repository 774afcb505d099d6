//! Command-line arguments and the persistent settings store.
//!
//! # Environment Variables
//!
//! - `SPE_ROTATOR_SETTINGS` - Settings file (default: platform config dir)
//! - `SPE_ROTATOR_ANGLE` - Rotation angle in degrees for `rotate`
//! - `SPE_ROTATOR_PIVOT` - Pivot mode for `rotate` (default: whole)
//! - `SPE_ROTATOR_SATURATION_THRESHOLD` - Zero frames at or above this value
//! - `SPE_ROTATOR_OUT_DIR` - Output directory for `rotate`
//!
//! `RUST_LOG` sets the log filter unless `-v` or `-q` is given.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use spe_rotator_core::PivotMode;

// =============================================================================
// Default Values
// =============================================================================

/// Log filter used when neither `RUST_LOG` nor `-v`/`-q` is given.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// File name of the settings store inside the config directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Default pivot mode for `rotate`.
pub const DEFAULT_PIVOT: &str = "whole";

// =============================================================================
// CLI Arguments
// =============================================================================

/// SPE Rotator - rotate the frames of SPE exposure files.
#[derive(Parser, Debug)]
#[command(name = "spe-rotator")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Settings file holding the read and save directories.
    #[arg(long, global = true, env = "SPE_ROTATOR_SETTINGS")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Log level forced by `-v`/`-q`, if any.
    pub fn log_level(&self) -> Option<LevelFilter> {
        if self.quiet {
            return Some(LevelFilter::Warn);
        }
        match self.verbose {
            0 => None,
            1 => Some(LevelFilter::Debug),
            _ => Some(LevelFilter::Trace),
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings.clone().unwrap_or_else(Settings::default_path)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show or change the read and save directories
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// List SPE files with their OD filter label
    List {
        /// Directory to list (default: the read directory)
        dir: Option<PathBuf>,
    },

    /// Show header geometry and acquisition metadata
    Info {
        /// SPE file, absolute or relative to the read directory
        file: PathBuf,
    },

    /// Print per-frame maximum intensity as CSV
    Series {
        /// SPE file, absolute or relative to the read directory
        file: PathBuf,

        /// Separate columns for the upper and lower frame halves
        #[arg(long)]
        split: bool,
    },

    /// Write rotated copies of SPE files into the save directory
    Rotate(RotateArgs),
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the settings file location and contents
    Show,
    /// Set the directory SPE files are read from
    SetRead { dir: PathBuf },
    /// Set the directory rotated files are written to
    SetSave { dir: PathBuf },
}

#[derive(Args, Debug, Clone)]
pub struct RotateArgs {
    /// SPE files, absolute or relative to the read directory
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Rotation angle in degrees (positive = counter-clockwise).
    #[arg(long, allow_negative_numbers = true, env = "SPE_ROTATOR_ANGLE")]
    pub angle: f64,

    /// Rotation pivot: whole or separate-half.
    #[arg(long, default_value = DEFAULT_PIVOT, env = "SPE_ROTATOR_PIVOT")]
    pub pivot: PivotMode,

    /// Use Lanczos3 interpolation instead of bilinear.
    #[arg(long)]
    pub lanczos: bool,

    /// Write frames whose maximum reaches this value as zeros.
    #[arg(long, env = "SPE_ROTATOR_SATURATION_THRESHOLD")]
    pub saturation_threshold: Option<f64>,

    /// Replace rotated files that already exist.
    #[arg(long)]
    pub overwrite: bool,

    /// Output directory (default: the save directory).
    #[arg(long, env = "SPE_ROTATOR_OUT_DIR")]
    pub out_dir: Option<PathBuf>,
}

// =============================================================================
// Settings Store
// =============================================================================

/// Directories remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub read_path: Option<PathBuf>,
    #[serde(default)]
    pub save_path: Option<PathBuf>,
}

impl Settings {
    /// `settings.json` in the platform config directory.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "spe-rotator")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE_NAME))
    }

    /// Load settings from `path`; a missing file yields empty settings.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)
            .with_context(|| format!("Failed to write settings {}", path.display()))?;
        log::debug!("saved settings to {}", path.display());
        Ok(())
    }

    pub fn read_dir(&self) -> Result<&Path> {
        self.read_path
            .as_deref()
            .context("Read directory not set (run `spe-rotator settings set-read <dir>`)")
    }

    pub fn save_dir(&self) -> Result<&Path> {
        self.save_path
            .as_deref()
            .context("Save directory not set (run `spe-rotator settings set-save <dir>`)")
    }

    /// `file` as given if it exists or is absolute, otherwise inside the read
    /// directory when one is set.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() || file.exists() {
            return file.to_path_buf();
        }
        match &self.read_path {
            Some(dir) => dir.join(file),
            None => file.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_rotate() {
        let cli = Cli::try_parse_from([
            "spe-rotator",
            "rotate",
            "a.spe",
            "b.spe",
            "--angle",
            "-0.35",
            "--pivot",
            "separate-half",
            "--saturation-threshold",
            "65000",
        ])
        .unwrap();

        let Command::Rotate(args) = cli.command else {
            panic!("expected rotate");
        };
        assert_eq!(args.files, vec![PathBuf::from("a.spe"), PathBuf::from("b.spe")]);
        assert_eq!(args.angle, -0.35);
        assert_eq!(args.pivot, PivotMode::SplitHalf);
        assert_eq!(args.saturation_threshold, Some(65000.0));
        assert!(!args.lanczos);
        assert!(!args.overwrite);
    }

    #[test]
    fn test_parse_rotate_defaults_to_whole() {
        let cli = Cli::try_parse_from(["spe-rotator", "rotate", "a.spe", "--angle", "1"]).unwrap();
        let Command::Rotate(args) = cli.command else {
            panic!("expected rotate");
        };
        assert_eq!(args.pivot, PivotMode::Whole);
    }

    #[test]
    fn test_parse_rejects_bad_pivot() {
        let result =
            Cli::try_parse_from(["spe-rotator", "rotate", "a.spe", "--angle", "1", "--pivot", "top"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level() {
        let cli = Cli::try_parse_from(["spe-rotator", "list"]).unwrap();
        assert_eq!(cli.log_level(), None);

        let cli = Cli::try_parse_from(["spe-rotator", "-vv", "list"]).unwrap();
        assert_eq!(cli.log_level(), Some(LevelFilter::Trace));

        let cli = Cli::try_parse_from(["spe-rotator", "list", "-q"]).unwrap();
        assert_eq!(cli.log_level(), Some(LevelFilter::Warn));

        assert!(Cli::try_parse_from(["spe-rotator", "-q", "-v", "list"]).is_err());
    }

    #[test]
    fn test_settings_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);

        assert_eq!(Settings::load(&path).unwrap(), Settings::default());

        let settings = Settings {
            read_path: Some(PathBuf::from("/data/raw")),
            save_path: Some(PathBuf::from("/data/rotated")),
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_settings_partial_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, r#"{ "read_path": "/data/raw" }"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.read_dir().unwrap(), Path::new("/data/raw"));
        assert!(settings.save_dir().is_err());
    }

    #[test]
    fn test_settings_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "not json").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn test_resolve_against_read_dir() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            read_path: Some(dir.path().to_path_buf()),
            save_path: None,
        };
        assert_eq!(
            settings.resolve(Path::new("missing_here.spe")),
            dir.path().join("missing_here.spe")
        );

        let absolute = dir.path().join("x.spe");
        assert_eq!(settings.resolve(&absolute), absolute);
        assert_eq!(
            Settings::default().resolve(Path::new("y.spe")),
            PathBuf::from("y.spe")
        );
    }
}
