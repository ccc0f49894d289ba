//! Common utilities for session tests.
//!
//! `FakeIsolate` is a small shell script that understands the subset of the
//! isolate command line this crate emits. Boxes live under a temporary root
//! (`<root>/<box id>/{box,tmp}`) and `--run` simply executes the program from
//! inside the box directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use isolate_sandbox::{ProcessRunner, Runner};
use tempfile::TempDir;

const SCRIPT: &str = r#"
root="$1"
shift
mode=""
box=0
while [ $# -gt 0 ]; do
    case "$1" in
        --init|--run|--cleanup) mode="$1"; shift ;;
        --box-id) box="$2"; shift 2 ;;
        --stderr-to-stdout|--share-net|--inherit-fds|--verbose|--silent) shift ;;
        --) shift; break ;;
        --*) shift 2 ;;
        *) break ;;
    esac
done
dir="$root/$box"
case "$mode" in
    --init)
        if [ -e "$dir" ]; then
            echo "Box $box is currently in use" >&2
            exit 2
        fi
        mkdir -p "$dir/box" "$dir/tmp" && echo "$dir"
        ;;
    --run)
        if [ ! -d "$dir/box" ]; then
            echo "Box $box not initialized" >&2
            exit 2
        fi
        cd "$dir/box" && exec "$@"
        ;;
    --cleanup)
        if [ ! -d "$dir" ]; then
            echo "Box $box not initialized" >&2
            exit 2
        fi
        rm -rf "$dir"
        ;;
    *)
        echo "Please specify an isolate command" >&2
        exit 2
        ;;
esac
"#;

pub struct FakeIsolate {
    root: TempDir,
    script: PathBuf,
}

impl FakeIsolate {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("Failed to create fake isolate root");
        let script = root.path().join("isolate.sh");
        std::fs::write(&script, SCRIPT).expect("Failed to write fake isolate script");
        Self { root, script }
    }

    /// Runner invoking the script through `/bin/sh`, so it never needs exec permission
    pub fn runner(&self) -> Arc<dyn Runner> {
        Arc::new(ProcessRunner::new("/bin/sh").with_base_args([
            self.script.to_string_lossy().into_owned(),
            self.root.path().to_string_lossy().into_owned(),
        ]))
    }

    pub fn box_root(&self, box_id: u32) -> PathBuf {
        self.root.path().join(box_id.to_string())
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }
}
