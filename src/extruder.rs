//! Per-filament extrusion bookkeeping.
//!
//! Each declared filament owns one `Extruder` record: the E accumulator that
//! is written after `E`, the lifetime extrusion total, and how much filament
//! is currently retracted. Retraction settings are resolved once from the
//! printer configuration when the record is created.

use crate::config::{PrinterConfig, get_at};

/// Extrusion state of one filament
#[derive(Debug, Clone, PartialEq)]
pub struct Extruder {
    id: usize,
    extruder_id: usize,
    relative_e: bool,
    /// Value written after `E`
    e: f64,
    /// Lifetime extrusion, never reset
    absolute_e: f64,
    retracted: f64,
    restart_extra: f64,
    settings: RetractionSettings,
}

/// Retraction options of one filament
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetractionSettings {
    pub z_hop: f64,
    pub retract_length: f64,
    pub retract_restart_extra: f64,
    pub retract_length_toolchange: f64,
    pub retract_restart_extra_toolchange: f64,
    /// mm/s, rounded to whole units
    pub retract_speed: f64,
    /// mm/s, rounded to whole units
    pub deretract_speed: f64,
    /// Fraction in `[0, 1]`
    pub retract_before_wipe: f64,
}

impl RetractionSettings {
    fn from_config(config: &PrinterConfig, filament_id: usize) -> Self {
        Self {
            z_hop: get_at(&config.z_hop, filament_id),
            retract_length: get_at(&config.retract_length, filament_id),
            retract_restart_extra: get_at(&config.retract_restart_extra, filament_id),
            retract_length_toolchange: get_at(&config.retract_length_toolchange, filament_id),
            retract_restart_extra_toolchange: get_at(
                &config.retract_restart_extra_toolchange,
                filament_id,
            ),
            retract_speed: get_at(&config.retract_speed, filament_id).round(),
            deretract_speed: get_at(&config.deretract_speed, filament_id).round(),
            retract_before_wipe: (get_at(&config.retract_before_wipe, filament_id) / 100.0)
                .clamp(0.0, 1.0),
        }
    }
}

impl Extruder {
    pub fn new(filament_id: usize, config: &PrinterConfig) -> Self {
        Self {
            id: filament_id,
            extruder_id: config.extruder_for_filament(filament_id),
            relative_e: config.use_relative_e_distances,
            e: 0.0,
            absolute_e: 0.0,
            retracted: 0.0,
            restart_extra: 0.0,
            settings: RetractionSettings::from_config(config, filament_id),
        }
    }

    /// Filament id
    pub fn id(&self) -> usize {
        self.id
    }

    /// Physical extruder the filament is loaded in
    pub fn extruder_id(&self) -> usize {
        self.extruder_id
    }

    pub fn e(&self) -> f64 {
        self.e
    }

    pub fn absolute_e(&self) -> f64 {
        self.absolute_e
    }

    pub fn retracted(&self) -> f64 {
        self.retracted
    }

    pub fn restart_extra(&self) -> f64 {
        self.restart_extra
    }

    pub fn settings(&self) -> &RetractionSettings {
        &self.settings
    }

    /// Filament consumed so far; the retracted length is still in the nozzle
    pub fn used_filament(&self) -> f64 {
        self.absolute_e + self.retracted
    }

    /// Feed `de` millimetres of filament, returning `de`
    pub fn extrude(&mut self, de: f64) -> f64 {
        // Relative E writes the delta, so the accumulator restarts every move
        if self.relative_e {
            self.e = 0.0;
        }
        self.e += de;
        self.absolute_e += de;
        if de < 0.0 {
            self.retracted -= de;
        }
        de
    }

    /// Retract up to `length` in total and remember `restart_extra`
    ///
    /// Returns the additional length retracted now; 0 when the filament is
    /// already retracted by at least `length`.
    pub fn retract(&mut self, length: f64, restart_extra: f64) -> f64 {
        if self.relative_e {
            self.e = 0.0;
        }
        let to_retract = (length - self.retracted).max(0.0);
        if to_retract > 0.0 {
            self.e -= to_retract;
            self.absolute_e -= to_retract;
            self.retracted += to_retract;
            self.restart_extra = restart_extra;
        }
        to_retract
    }

    /// Undo the retraction, returning the length fed back
    pub fn unretract(&mut self) -> f64 {
        let de = self.retracted + self.restart_extra;
        self.extrude(de);
        self.retracted = 0.0;
        self.restart_extra = 0.0;
        de
    }

    /// Zero the accumulator (`G92 E0`)
    pub fn reset_e(&mut self) {
        self.e = 0.0;
    }

    pub fn retraction_length(&self) -> f64 {
        self.settings.retract_length
    }

    pub fn retract_restart_extra(&self) -> f64 {
        self.settings.retract_restart_extra
    }

    pub fn retract_length_toolchange(&self) -> f64 {
        self.settings.retract_length_toolchange
    }

    pub fn retract_restart_extra_toolchange(&self) -> f64 {
        self.settings.retract_restart_extra_toolchange
    }

    pub fn retract_before_wipe(&self) -> f64 {
        self.settings.retract_before_wipe
    }

    pub fn retract_speed(&self) -> f64 {
        self.settings.retract_speed
    }

    /// Deretract speed, falling back to the retract speed when unset
    pub fn deretract_speed(&self) -> f64 {
        if self.settings.deretract_speed > 0.0 {
            self.settings.deretract_speed
        } else {
            self.settings.retract_speed
        }
    }

    pub fn z_hop(&self) -> f64 {
        self.settings.z_hop
    }
}
