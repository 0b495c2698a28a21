// src/logging.rs
// =============================================================================
// Sets up tracing output.
//
// Progress and warnings go to stderr through tracing; stdout is reserved
// for the final summary line (and the lists printed by `inspect`/`missing`),
// so the output can be piped.
//
// Use RUST_LOG to change verbosity, e.g. RUST_LOG=debug pdf-audit export ...
// =============================================================================

use anyhow::Context as _;

pub fn init() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
