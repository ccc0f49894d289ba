use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use isolate_sandbox::config::Settings;
use isolate_sandbox::{IsolateMeta, SandboxError, SandboxManager};

/// Result printed to stdout as JSON
#[derive(Debug, Serialize)]
struct RunReport {
    exit_code: Option<i32>,
    signal: Option<i32>,
    stdout: String,
    stderr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<IsolateMeta>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("isolate_sandbox=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let program: Vec<String> = std::env::args().skip(1).collect();
    if program.is_empty() {
        anyhow::bail!("Usage: isolate-sandbox <program> [args...]");
    }

    let settings = Settings::from_env()?;
    let options = settings.options()?;
    let runner = settings.runner()?;
    info!(
        "Using isolate command '{}' (box {}, keep: {})",
        settings.isolate_command,
        options.effective_box_id(),
        settings.keep
    );

    let manager =
        SandboxManager::with_runner(options, Arc::new(runner)).release_on_exit(!settings.keep);

    let report = manager
        .scope(|sandbox| {
            for file in &settings.files {
                sandbox.add_file(&file.source, file.destination.as_deref())?;
            }
            let outcome = sandbox.run(program.as_slice())?;
            let meta = sandbox.meta()?;
            Ok::<_, SandboxError>(RunReport {
                exit_code: outcome.exit_code,
                signal: outcome.signal,
                stdout: outcome.stdout_lossy(),
                stderr: outcome.stderr_lossy(),
                meta,
            })
        })
        .context("Sandbox session failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    let code = match (report.exit_code, report.signal) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    };
    std::process::exit(code);
}
