//! Isolate options
//!
//! Immutable option record for an isolate box and its translation into
//! isolate command-line directives.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Disk quota for the box (`--quota=<blocks>,<inodes>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub blocks: u64,
    pub inodes: u64,
}

impl Quota {
    pub fn new(blocks: u64, inodes: u64) -> Self {
        Self { blocks, inodes }
    }
}

/// Options used to initialise a box and re-used for every program run in it.
///
/// Every field is optional; `None` means the directive is not passed at all.
/// Boolean fields are presence-only: isolate can enable these switches but not
/// negate them, so `Some(false)` emits the flag exactly like `Some(true)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IsolateOptions {
    /// Host path of the metadata file written by isolate
    pub meta: Option<PathBuf>,
    /// Address space limit in KB
    pub mem: Option<u64>,
    /// CPU time limit in seconds
    pub time: Option<f64>,
    /// Wall clock time limit in seconds
    pub wall_time: Option<f64>,
    /// Grace period after the CPU time limit, in seconds
    pub extra_time: Option<f64>,
    /// Box slot in isolate's bookkeeping (0 if unset)
    pub box_id: Option<u32>,
    /// Stack limit in KB
    pub stack: Option<u64>,
    /// Maximum size of created files in KB
    pub fsize: Option<u64>,
    pub quota: Option<Quota>,
    pub stdin: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
    pub stderr_to_stdout: Option<bool>,
    /// Working directory inside the box
    pub chdir: Option<PathBuf>,
    /// Maximum number of processes
    pub processes: Option<u32>,
    pub share_net: Option<bool>,
    pub inherit_fds: Option<bool>,
    pub verbose: Option<bool>,
    pub silent: Option<bool>,
}

impl IsolateOptions {
    /// Box id used for `--cleanup`; isolate falls back to box 0 when none is given
    pub fn effective_box_id(&self) -> u32 {
        self.box_id.unwrap_or(0)
    }

    /// Encode the options as isolate directives, in canonical field order
    pub fn as_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        push_value(&mut args, "--meta", self.meta.as_deref().map(path_arg));
        push_value(&mut args, "--mem", self.mem);
        push_value(&mut args, "--time", self.time);
        push_value(&mut args, "--wall-time", self.wall_time);
        push_value(&mut args, "--extra-time", self.extra_time);
        push_value(&mut args, "--box-id", self.box_id);
        push_value(&mut args, "--stack", self.stack);
        push_value(&mut args, "--fsize", self.fsize);
        push_value(
            &mut args,
            "--quota",
            self.quota.map(|q| format!("{},{}", q.blocks, q.inodes)),
        );
        push_value(&mut args, "--stdin", self.stdin.as_deref().map(path_arg));
        push_value(&mut args, "--stdout", self.stdout.as_deref().map(path_arg));
        push_value(&mut args, "--stderr", self.stderr.as_deref().map(path_arg));
        push_flag(&mut args, "--stderr-to-stdout", self.stderr_to_stdout);
        push_value(&mut args, "--chdir", self.chdir.as_deref().map(path_arg));
        push_value(&mut args, "--processes", self.processes);
        push_flag(&mut args, "--share-net", self.share_net);
        push_flag(&mut args, "--inherit-fds", self.inherit_fds);
        push_flag(&mut args, "--verbose", self.verbose);
        push_flag(&mut args, "--silent", self.silent);

        args
    }
}

fn push_value<T: ToString>(args: &mut Vec<String>, directive: &str, value: Option<T>) {
    if let Some(value) = value {
        args.push(directive.to_string());
        args.push(value.to_string());
    }
}

fn push_flag(args: &mut Vec<String>, directive: &str, value: Option<bool>) {
    if value.is_some() {
        args.push(directive.to_string());
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
