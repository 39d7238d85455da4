//! Firmware flavors
//!
//! The closed set of firmware dialects the writer can target, the name
//! registry used by configuration files, and the per-operation instruction
//! templates.

pub mod dialect;
pub mod registry;

pub use dialect::Dialect;
pub use registry::{canonical_name, list_flavors, lookup_flavor};

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// G-code dialect of the target firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum GcodeFlavor {
    /// RepRap/Sprinter
    RepRapSprinter,
    /// RepRapFirmware (Duet)
    RepRapFirmware,
    Repetier,
    Teacup,
    /// MakerWare (MakerBot)
    MakerWare,
    /// Marlin 1.x
    #[default]
    MarlinLegacy,
    /// Marlin 2 with separate print/retract/travel acceleration
    MarlinFirmware,
    /// Sailfish (MakerBot)
    Sailfish,
    Mach3,
    Machinekit,
    Smoothie,
    Klipper,
    /// No extrusion axis (plotters, lasers)
    NoExtrusion,
}

impl GcodeFlavor {
    /// Marlin-like flavors honour the machine acceleration/jerk limits
    pub fn is_marlin_like(self) -> bool {
        matches!(
            self,
            GcodeFlavor::MarlinLegacy | GcodeFlavor::MarlinFirmware | GcodeFlavor::Klipper
        )
    }

    /// MakerBot dialects (MakerWare and Sailfish)
    pub fn is_makerbot(self) -> bool {
        matches!(self, GcodeFlavor::MakerWare | GcodeFlavor::Sailfish)
    }
}

impl fmt::Display for GcodeFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(canonical_name(*self))
    }
}

impl FromStr for GcodeFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup_flavor(s).ok_or_else(|| {
            format!(
                "unknown gcode flavor '{}' (expected one of: {})",
                s,
                list_flavors().join(", ")
            )
        })
    }
}

impl TryFrom<String> for GcodeFlavor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
