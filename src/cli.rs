//! `gcodegen` command-line front end.

use anyhow::{Context, Result};
use std::io::Write;

use crate::config::Config;
use crate::script;

/// Initialise `env_logger` at the configured level
///
/// `RUST_LOG` still takes precedence when set.
pub fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A logger installed earlier (tests, embedding callers) stays in place
    if env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .try_init()
        .is_err()
    {
        log::debug!("Logger already initialised, keeping it");
    }
}

/// Render the configured job script
pub fn run(config: Config) -> Result<()> {
    log::info!(
        "Printer configuration from {} (flavor: {})",
        config.printer_source,
        config.printer.gcode_flavor
    );

    let requests = script::load_script(&config.script)?;
    log::debug!("Loaded {} requests from {}", requests.len(), config.script.display());

    let (gcode, writer) = script::render(config.printer, &requests)?;

    match &config.output {
        Some(path) => std::fs::write(path, &gcode)
            .with_context(|| format!("Failed to write output: {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(gcode.as_bytes())
                .context("Failed to write G-code to stdout")?;
            stdout.flush().context("Failed to flush stdout")?;
        }
    }

    let used: f64 = writer.extruders().iter().map(|e| e.used_filament()).sum();
    log::info!(
        "Wrote {} lines, {:.2} mm of filament across {} filament(s)",
        gcode.lines().count(),
        used,
        writer.extruders().len()
    );
    Ok(())
}
