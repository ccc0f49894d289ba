//! Runtime configuration
//!
//! Settings for the command-line entry point, loaded from environment
//! variables (optionally via `.env`) and a TOML options file.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::runner::process::DEFAULT_ISOLATE_BIN;
use crate::runner::ProcessRunner;
use crate::sandbox::IsolateOptions;

/// A host file to copy into the box: `src[:dest]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
}

impl FileSpec {
    fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }
        let (source, destination) = match spec.split_once(':') {
            Some((source, dest)) if !dest.is_empty() => (source, Some(PathBuf::from(dest))),
            Some((source, _)) => (source, None),
            None => (spec, None),
        };
        Some(Self {
            source: PathBuf::from(source),
            destination,
        })
    }
}

/// Parse a comma-separated list of `src[:dest]` entries
pub fn parse_file_specs(value: &str) -> Vec<FileSpec> {
    value.split(',').filter_map(FileSpec::parse).collect()
}

/// Settings for the command-line entry point
#[derive(Debug, Clone)]
pub struct Settings {
    /// Isolate command line (`ISOLATE_BIN`, default `isolate`)
    pub isolate_command: String,
    /// TOML file with `IsolateOptions` (`SANDBOX_OPTIONS`)
    pub options_path: Option<PathBuf>,
    /// Box ID override (`SANDBOX_BOX_ID`)
    pub box_id: Option<u32>,
    /// Files to inject before running (`SANDBOX_FILES`)
    pub files: Vec<FileSpec>,
    /// Leave the box behind after the run (`SANDBOX_KEEP`)
    pub keep: bool,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let isolate_command = lookup("ISOLATE_BIN")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ISOLATE_BIN.to_string());

        let box_id = lookup("SANDBOX_BOX_ID")
            .map(|v| {
                v.trim()
                    .parse::<u32>()
                    .with_context(|| format!("Invalid SANDBOX_BOX_ID: {:?}", v))
            })
            .transpose()?;

        let keep = lookup("SANDBOX_KEEP")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            isolate_command,
            options_path: lookup("SANDBOX_OPTIONS").map(PathBuf::from),
            box_id,
            files: lookup("SANDBOX_FILES")
                .map(|v| parse_file_specs(&v))
                .unwrap_or_default(),
            keep,
        })
    }

    /// Build the runner for the configured isolate command
    pub fn runner(&self) -> Result<ProcessRunner> {
        ProcessRunner::from_command_line(&self.isolate_command)
            .with_context(|| format!("Invalid ISOLATE_BIN: {:?}", self.isolate_command))
    }

    /// Load options from the configured file (if any) and apply overrides
    pub fn options(&self) -> Result<IsolateOptions> {
        let mut options = match &self.options_path {
            Some(path) => load_options(path)?,
            None => IsolateOptions::default(),
        };
        if let Some(box_id) = self.box_id {
            options.box_id = Some(box_id);
        }
        Ok(options)
    }
}

/// Load `IsolateOptions` from a TOML file
pub fn load_options(path: &Path) -> Result<IsolateOptions> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read options file {:?}", path))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse options file {:?}", path))
}
