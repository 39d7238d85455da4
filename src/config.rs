//! Configuration management for the G-code writer.
//!
//! Handles:
//! - Printer configuration (`PrinterConfig`) loaded from TOML
//! - Built-in printer presets
//! - Command-line argument parsing for `gcodegen`

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::flavor::GcodeFlavor;

/// Element `index` of a per-extruder/per-filament option
///
/// Falls back to the first element when `index` is past the end, and to the
/// type default when the option is empty.
pub fn get_at<T: Copy + Default>(values: &[T], index: usize) -> T {
    values
        .get(index)
        .or_else(|| values.first())
        .copied()
        .unwrap_or_default()
}

/// Machine and filament options consumed by the writer
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrinterConfig {
    pub gcode_flavor: GcodeFlavor,
    pub use_relative_e_distances: bool,
    pub use_firmware_retraction: bool,
    pub single_extruder_multi_material: bool,
    /// Toolchanges are written as `M1020 S<id>`
    pub vendor_multi_tool: bool,
    /// Append `; comment` to emitted lines
    pub gcode_comments: bool,

    // Per physical extruder
    pub retract_lift_above: Vec<f64>,
    /// 0 means no upper bound
    pub retract_lift_below: Vec<f64>,
    /// mm/s
    pub travel_speed: Vec<f64>,
    /// mm/s, 0 falls back to `travel_speed`
    pub travel_speed_z: Vec<f64>,
    /// mm/s²
    pub travel_acceleration: Vec<u32>,
    pub first_layer_travel_acceleration: Vec<u32>,

    // Per filament
    pub z_hop: Vec<f64>,
    pub retract_length: Vec<f64>,
    pub retract_restart_extra: Vec<f64>,
    pub retract_length_toolchange: Vec<f64>,
    pub retract_restart_extra_toolchange: Vec<f64>,
    /// mm/s
    pub retract_speed: Vec<f64>,
    /// mm/s, 0 falls back to `retract_speed`
    pub deretract_speed: Vec<f64>,
    /// Percent of the retraction performed before a wipe
    pub retract_before_wipe: Vec<f64>,
    /// Physical extruder each filament is loaded in
    pub filament_map: Vec<usize>,

    pub prime_tower_lift_height: f64,
    pub prime_tower_lift_speed: f64,

    pub machine_max_acceleration_extruding: Vec<f64>,
    pub machine_max_jerk_x: Vec<f64>,
    pub machine_max_jerk_y: Vec<f64>,

    pub accel_to_decel_enable: bool,
    /// Percent of the print acceleration
    pub accel_to_decel_factor: f64,

    /// Offset of the active plate, subtracted from emitted X/Y
    pub plate_offset: [f64; 2],
    /// Maximum climb angle for slope and spiral lifts, radians
    pub slope_threshold: f64,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            gcode_flavor: GcodeFlavor::MarlinLegacy,
            use_relative_e_distances: false,
            use_firmware_retraction: false,
            single_extruder_multi_material: false,
            vendor_multi_tool: false,
            gcode_comments: false,
            retract_lift_above: vec![0.0],
            retract_lift_below: vec![0.0],
            travel_speed: vec![150.0],
            travel_speed_z: vec![0.0],
            travel_acceleration: Vec::new(),
            first_layer_travel_acceleration: Vec::new(),
            z_hop: vec![0.4],
            retract_length: vec![0.8],
            retract_restart_extra: vec![0.0],
            retract_length_toolchange: vec![2.0],
            retract_restart_extra_toolchange: vec![0.0],
            retract_speed: vec![30.0],
            deretract_speed: vec![0.0],
            retract_before_wipe: vec![70.0],
            filament_map: Vec::new(),
            prime_tower_lift_height: 0.0,
            prime_tower_lift_speed: 0.0,
            machine_max_acceleration_extruding: vec![1500.0],
            machine_max_jerk_x: vec![10.0],
            machine_max_jerk_y: vec![10.0],
            accel_to_decel_enable: false,
            accel_to_decel_factor: 50.0,
            plate_offset: [0.0, 0.0],
            slope_threshold: 3.0_f64.to_radians(),
        }
    }
}

/// Presets embedded in the binary, by name
const PRESETS: &[(&str, &str)] = &[
    (
        "generic-marlin",
        include_str!("../resources/presets/generic-marlin.toml"),
    ),
    (
        "voron-klipper",
        include_str!("../resources/presets/voron-klipper.toml"),
    ),
    (
        "duet-toolchanger",
        include_str!("../resources/presets/duet-toolchanger.toml"),
    ),
];

impl PrinterConfig {
    /// Parse a TOML printer configuration
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).context("Failed to parse printer configuration TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a printer configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read printer config: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid printer config: {}", path.display()))
    }

    /// Built-in preset by name
    pub fn preset(name: &str) -> Result<Self> {
        let (_, content) = PRESETS
            .iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
            .with_context(|| {
                format!(
                    "Unknown preset '{}' (available: {})",
                    name,
                    Self::preset_names().join(", ")
                )
            })?;
        Self::from_toml_str(content).with_context(|| format!("Invalid built-in preset '{name}'"))
    }

    pub fn preset_names() -> Vec<&'static str> {
        PRESETS.iter().map(|(name, _)| *name).collect()
    }

    /// Reject values the writer cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.travel_speed.is_empty() || self.travel_speed.iter().any(|s| *s <= 0.0) {
            bail!("travel_speed must contain positive values");
        }
        if self.retract_speed.iter().any(|s| *s <= 0.0) {
            bail!("retract_speed must contain positive values");
        }
        if !(self.slope_threshold > 0.0 && self.slope_threshold < std::f64::consts::FRAC_PI_2) {
            bail!(
                "slope_threshold must be between 0 and pi/2 radians, got {}",
                self.slope_threshold
            );
        }
        if !(0.0..=100.0).contains(&self.accel_to_decel_factor) {
            bail!(
                "accel_to_decel_factor is a percentage, got {}",
                self.accel_to_decel_factor
            );
        }
        Ok(())
    }

    /// Physical extruder a filament is loaded in
    pub fn extruder_for_filament(&self, filament_id: usize) -> usize {
        self.filament_map.get(filament_id).copied().unwrap_or(0)
    }

    /// Acceleration cap, only honoured by Marlin-like firmware (0 = uncapped)
    pub fn max_acceleration(&self) -> u32 {
        if self.gcode_flavor.is_marlin_like() {
            get_at(&self.machine_max_acceleration_extruding, 0).round_ties_even() as u32
        } else {
            0
        }
    }

    /// Jerk cap, only honoured by Marlin-like firmware (0 = uncapped)
    pub fn max_jerk(&self) -> f64 {
        if self.gcode_flavor.is_marlin_like() {
            get_at(&self.machine_max_jerk_x, 0)
                .min(get_at(&self.machine_max_jerk_y, 0))
                .round_ties_even()
        } else {
            0.0
        }
    }
}

/// Command-line arguments for `gcodegen`
#[derive(Debug, Parser)]
#[command(name = "gcodegen")]
#[command(about = "Render a JSON job script into firmware G-code")]
#[command(version)]
pub struct Args {
    /// Job script (JSON array of requests)
    pub script: PathBuf,

    /// Printer configuration file
    #[arg(long, help = "Printer configuration TOML file")]
    pub config: Option<PathBuf>,

    /// Built-in printer preset
    #[arg(
        long,
        conflicts_with = "config",
        help = "Built-in preset (e.g., 'generic-marlin', 'voron-klipper')"
    )]
    pub preset: Option<String>,

    /// Override the configured flavor
    #[arg(long, help = "G-code flavor to emit (e.g., 'klipper', 'marlin2')")]
    pub flavor: Option<String>,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Append explanatory comments to emitted lines
    #[arg(long)]
    pub comments: bool,

    #[arg(
        long,
        default_value = "warn",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub printer: PrinterConfig,
    /// Where the printer configuration came from (for logging)
    pub printer_source: String,
    pub script: PathBuf,
    pub output: Option<PathBuf>,
    pub log_level: String,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    ///
    /// Printer configuration priority: `--config` > `--preset` > user config
    /// file > built-in defaults. `--flavor` and `--comments` apply on top.
    pub fn from_args(args: Args) -> Result<Self> {
        let (mut printer, printer_source) = if let Some(path) = &args.config {
            (PrinterConfig::load(path)?, path.display().to_string())
        } else if let Some(name) = &args.preset {
            (PrinterConfig::preset(name)?, format!("preset '{name}'"))
        } else if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            (PrinterConfig::load(&path)?, path.display().to_string())
        } else {
            (PrinterConfig::default(), "defaults".to_string())
        };

        if let Some(flavor) = &args.flavor {
            printer.gcode_flavor = flavor.parse().map_err(anyhow::Error::msg)?;
        }
        if args.comments {
            printer.gcode_comments = true;
        }

        Ok(Config {
            printer,
            printer_source,
            script: args.script,
            output: args.output,
            log_level: args.log_level,
        })
    }

    /// `<config dir>/gcodegen/printer.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gcodegen").join("printer.toml"))
    }
}
