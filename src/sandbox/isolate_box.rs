//! Isolate box
//!
//! One initialised isolate sandbox: file injection into `<workdir>/box`,
//! program execution with `isolate --run`, and teardown with
//! `isolate --cleanup`.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nix::fcntl::OFlag;
use nix::unistd::{chown, getgid, getuid};
use tracing::{debug, info};

use super::fs::{
    create_private_dirs, ensure_no_symlink_escape, remove_dir_contents, resolve_in_box,
};
use super::meta::{parse_meta, IsolateMeta};
use super::options::IsolateOptions;
use crate::error::{Result, SandboxError};
use crate::runner::{RunOutcome, Runner};

/// Isolate box bound to an initialised work directory
pub struct IsolateBox {
    options: IsolateOptions,
    box_id: u32,
    work_dir: PathBuf,
    box_dir: PathBuf,
    tmp_dir: PathBuf,
    runner: Arc<dyn Runner>,
}

impl IsolateBox {
    /// Bind to a work directory returned by `isolate --init`
    pub(crate) fn new(
        options: IsolateOptions,
        work_dir: impl Into<PathBuf>,
        runner: Arc<dyn Runner>,
    ) -> Self {
        let work_dir = work_dir.into();
        Self {
            box_id: options.effective_box_id(),
            box_dir: work_dir.join("box"),
            tmp_dir: work_dir.join("tmp"),
            work_dir,
            options,
            runner,
        }
    }

    /// Get the box ID
    pub fn box_id(&self) -> u32 {
        self.box_id
    }

    /// Get the options the box was initialised with
    pub fn options(&self) -> &IsolateOptions {
        &self.options
    }

    /// Get the host work directory reported by isolate
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Get the path to the box/box subdirectory (the only place the program sees)
    pub fn box_dir(&self) -> &Path {
        &self.box_dir
    }

    /// Get the scratch directory reserved for isolate
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Copy a host file into the box.
    ///
    /// Without `destination` the file lands at `box/<file name>`. Relative
    /// destinations are resolved against the box directory; absolute ones must
    /// already lie inside it. Contents are copied byte for byte and the file is
    /// owned by the invoking user.
    ///
    /// A source that is not a regular file (e.g. a directory) fails with
    /// `SandboxError::Io` of kind `InvalidInput` and leaves the box unchanged.
    /// Adding a file onto itself is a no-op.
    pub fn add_file(&self, source: impl AsRef<Path>, destination: Option<&Path>) -> Result<()> {
        let source = source.as_ref();

        let destination = match destination {
            Some(destination) => resolve_in_box(&self.box_dir, destination)?,
            None => {
                let name = source.file_name().map(Path::new).unwrap_or(Path::new(""));
                resolve_in_box(&self.box_dir, name)?
            }
        };

        if !source.exists() {
            return Err(SandboxError::SourceNotFound(source.to_path_buf()));
        }

        let source_meta = fs::metadata(source)
            .map_err(|e| SandboxError::io(format!("failed to stat {:?}", source), e))?;
        // Directories and other non-regular sources are rejected before the box is touched
        if !source_meta.is_file() {
            return Err(SandboxError::io(
                format!("failed to copy {:?}", source),
                io::Error::new(io::ErrorKind::InvalidInput, "source is not a regular file"),
            ));
        }
        let mut input = File::open(source)
            .map_err(|e| SandboxError::io(format!("failed to open {:?}", source), e))?;

        ensure_no_symlink_escape(&self.box_dir, &destination)?;

        if let Ok(existing) = fs::symlink_metadata(&destination) {
            if existing.dev() == source_meta.dev() && existing.ino() == source_meta.ino() {
                debug!("{:?} is already in place at {:?}", source, destination);
                return Ok(());
            }
        }

        if let Some(parent) = destination.parent() {
            create_private_dirs(parent)?;
        }

        let mut output = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .custom_flags(OFlag::O_NOFOLLOW.bits())
            .open(&destination)
            .map_err(|e| SandboxError::io(format!("failed to create {:?}", destination), e))?;

        chown(&destination, Some(getuid()), Some(getgid())).map_err(|e| {
            SandboxError::io(format!("failed to chown {:?}", destination), e.into())
        })?;

        let copied = io::copy(&mut input, &mut output).map_err(|e| {
            SandboxError::io(format!("failed to copy {:?} to {:?}", source, destination), e)
        })?;

        debug!("Copied {:?} to {:?} ({} bytes)", source, destination, copied);
        Ok(())
    }

    /// Read a file from the box directory, e.g. a `--stdout` target
    pub fn read_file(&self, name: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = resolve_in_box(&self.box_dir, name.as_ref())?;
        ensure_no_symlink_escape(&self.box_dir, &path)?;

        let mut file = OpenOptions::new()
            .read(true)
            .custom_flags(OFlag::O_NOFOLLOW.bits())
            .open(&path)
            .map_err(|e| SandboxError::io(format!("failed to open {:?}", path), e))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| SandboxError::io(format!("failed to read {:?}", path), e))?;
        Ok(content)
    }

    /// Run a program in the box.
    ///
    /// `program_args[0]` is the program as seen from inside the sandbox. The
    /// outcome is returned exactly as isolate produced it.
    pub fn run<S: AsRef<str>>(&self, program_args: &[S]) -> Result<RunOutcome> {
        let mut args = vec!["--run".to_string()];
        args.extend(self.options.as_args());
        args.push("--".to_string());
        args.extend(program_args.iter().map(|a| a.as_ref().to_string()));

        debug!("Running in isolate box {} with args: {:?}", self.box_id, args);

        let outcome = self.runner.run(&args).map_err(|source| SandboxError::Spawn {
            program: self.runner.program(),
            source,
        })?;

        debug!(
            "Isolate box {} run finished: exit {:?}, signal {:?}",
            self.box_id, outcome.exit_code, outcome.signal
        );
        Ok(outcome)
    }

    /// Read and parse the meta file, if `meta` is configured and was written
    pub fn meta(&self) -> Result<Option<IsolateMeta>> {
        let Some(path) = &self.options.meta else {
            return Ok(None);
        };

        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(parse_meta(&content))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SandboxError::io(format!("failed to read meta file {:?}", path), e)),
        }
    }

    /// Cleanup the isolate box.
    ///
    /// Empties the box directory first, then runs `isolate --cleanup`. The tool
    /// is invoked even if emptying fails; if both fail the emptying error is
    /// primary and returned as `SandboxError::Teardown`.
    pub fn cleanup(&self) -> Result<()> {
        let emptied = remove_dir_contents(&self.box_dir);
        let released = self.release();

        match (emptied, released) {
            (Ok(()), Ok(())) => {
                info!("Cleaned up isolate box {}", self.box_id);
                Ok(())
            }
            (Err(empty), Ok(())) => Err(empty),
            (Ok(()), Err(tool)) => Err(tool),
            (Err(empty), Err(tool)) => Err(SandboxError::Teardown {
                empty: Box::new(empty),
                tool: Box::new(tool),
            }),
        }
    }

    /// Run `isolate --cleanup` for this box
    fn release(&self) -> Result<()> {
        info!("Closing isolate sandbox: {}", self);
        let args = vec![
            "--cleanup".to_string(),
            "--box-id".to_string(),
            self.box_id.to_string(),
        ];

        let outcome = self.runner.run(&args).map_err(|source| SandboxError::Spawn {
            program: self.runner.program(),
            source,
        })?;

        if !outcome.is_success() {
            return Err(SandboxError::Cleanup {
                code: outcome.exit_code,
                output: outcome.combined_output(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for IsolateBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IsolateBox(workdir='{}', box_id='{}')",
            self.work_dir.display(),
            self.box_id
        )
    }
}

impl fmt::Debug for IsolateBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsolateBox")
            .field("box_id", &self.box_id)
            .field("work_dir", &self.work_dir)
            .field("runner", &self.runner.program())
            .finish()
    }
}
