use anyhow::Result;
use gcode_writer::cli;
use gcode_writer::config::Config;

fn main() -> Result<()> {
    let config = Config::from_args_and_env()?;
    cli::init_logging(&config.log_level);
    cli::run(config)
}
