//! Isolate meta file parser
//!
//! Parses the `key:value` metadata file isolate writes when `--meta` is given.

use serde::Serialize;

/// Run status reported by isolate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolateStatus {
    /// No status line: program exited normally with code 0
    Ok,
    /// `RE`: exited with a non-zero code
    RuntimeError,
    /// `SG`: killed by a signal
    Signal,
    /// `TO`: time limit exceeded
    TimedOut,
    /// `XX`: internal error of the sandbox
    InternalError,
    /// Any status code isolate may add later
    Other(String),
}

impl IsolateStatus {
    fn from_code(code: &str) -> Self {
        match code {
            "RE" => IsolateStatus::RuntimeError,
            "SG" => IsolateStatus::Signal,
            "TO" => IsolateStatus::TimedOut,
            "XX" => IsolateStatus::InternalError,
            other => IsolateStatus::Other(other.to_string()),
        }
    }
}

/// Parsed isolate meta file contents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsolateMeta {
    /// CPU time used in milliseconds
    pub time_ms: Option<u64>,
    /// Wall clock time in milliseconds
    pub wall_time_ms: Option<u64>,
    /// Peak resident set size in KB
    pub max_rss_kb: Option<u64>,
    /// Peak cgroup memory in KB
    pub cg_mem_kb: Option<u64>,
    pub exit_code: Option<i32>,
    pub exit_signal: Option<i32>,
    /// Program was killed by the sandbox
    pub killed: bool,
    pub cg_oom_killed: bool,
    pub csw_voluntary: Option<u64>,
    pub csw_forced: Option<u64>,
    pub status: IsolateStatus,
    /// Human-readable status message
    pub message: Option<String>,
}

impl Default for IsolateMeta {
    fn default() -> Self {
        Self {
            time_ms: None,
            wall_time_ms: None,
            max_rss_kb: None,
            cg_mem_kb: None,
            exit_code: None,
            exit_signal: None,
            killed: false,
            cg_oom_killed: false,
            csw_voluntary: None,
            csw_forced: None,
            status: IsolateStatus::Ok,
            message: None,
        }
    }
}

/// Parse isolate meta file content. Unknown keys and malformed values are skipped.
pub fn parse_meta(content: &str) -> IsolateMeta {
    let mut meta = IsolateMeta::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "time" => meta.time_ms = parse_seconds_ms(value),
            "time-wall" => meta.wall_time_ms = parse_seconds_ms(value),
            "max-rss" => meta.max_rss_kb = value.parse().ok(),
            "cg-mem" => meta.cg_mem_kb = value.parse().ok(),
            "exitcode" => meta.exit_code = value.parse().ok(),
            "exitsig" => meta.exit_signal = value.parse().ok(),
            "killed" => meta.killed = value == "1",
            "cg-oom-killed" => meta.cg_oom_killed = value == "1",
            "csw-voluntary" => meta.csw_voluntary = value.parse().ok(),
            "csw-forced" => meta.csw_forced = value.parse().ok(),
            "status" => meta.status = IsolateStatus::from_code(value),
            "message" => meta.message = Some(value.to_string()),
            _ => {}
        }
    }

    meta
}

fn parse_seconds_ms(value: &str) -> Option<u64> {
    let seconds = value.parse::<f64>().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some((seconds * 1000.0).round() as u64)
    } else {
        None
    }
}
