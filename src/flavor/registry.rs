//! Flavor Registry
//!
//! Name lookup for flavors as they appear in printer configuration files.
//! Every flavor has one canonical name plus optional aliases.

use super::GcodeFlavor;

/// Canonical names, in the order they are listed to users
const CANONICAL: &[(&str, GcodeFlavor)] = &[
    ("reprap", GcodeFlavor::RepRapSprinter),
    ("reprapfirmware", GcodeFlavor::RepRapFirmware),
    ("repetier", GcodeFlavor::Repetier),
    ("teacup", GcodeFlavor::Teacup),
    ("makerware", GcodeFlavor::MakerWare),
    ("marlin", GcodeFlavor::MarlinLegacy),
    ("marlin2", GcodeFlavor::MarlinFirmware),
    ("sailfish", GcodeFlavor::Sailfish),
    ("mach3", GcodeFlavor::Mach3),
    ("machinekit", GcodeFlavor::Machinekit),
    ("smoothie", GcodeFlavor::Smoothie),
    ("klipper", GcodeFlavor::Klipper),
    ("no-extrusion", GcodeFlavor::NoExtrusion),
];

const ALIASES: &[(&str, GcodeFlavor)] = &[
    ("sprinter", GcodeFlavor::RepRapSprinter),
    ("rrf", GcodeFlavor::RepRapFirmware),
    ("duet", GcodeFlavor::RepRapFirmware),
    ("marlin-legacy", GcodeFlavor::MarlinLegacy),
    ("marlinlegacy", GcodeFlavor::MarlinLegacy),
    ("marlin-firmware", GcodeFlavor::MarlinFirmware),
    ("marlinfirmware", GcodeFlavor::MarlinFirmware),
    ("linuxcnc", GcodeFlavor::Machinekit),
    ("noextrusion", GcodeFlavor::NoExtrusion),
];

/// Resolve a flavor name or alias (case-insensitive)
pub fn lookup_flavor(name: &str) -> Option<GcodeFlavor> {
    let name = name.trim();
    CANONICAL
        .iter()
        .chain(ALIASES)
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, flavor)| *flavor)
}

/// Canonical configuration name of a flavor
pub fn canonical_name(flavor: GcodeFlavor) -> &'static str {
    CANONICAL
        .iter()
        .find(|(_, candidate)| *candidate == flavor)
        .map(|(name, _)| *name)
        .unwrap_or("unknown")
}

/// List all canonical flavor names
pub fn list_flavors() -> Vec<&'static str> {
    CANONICAL.iter().map(|(name, _)| *name).collect()
}
