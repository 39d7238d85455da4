//! Stateful G-code writer.
//!
//! `GcodeWriter` owns the machine state of one export: head position, lift
//! bookkeeping, extrusion records for every declared filament and the caches
//! of the last emitted acceleration, jerk, fan speed and bed temperature.
//! Every method returns the text to append to the output stream, which is
//! empty when the request does not change anything on the machine.
//!
//! Calls must be issued in machine order. A writer is never shared between
//! exports.

mod lift;
mod motion;
mod retract;

use crate::config::{PrinterConfig, get_at};
use crate::extruder::Extruder;
use crate::flavor::{Dialect, GcodeFlavor};
use crate::format::LineBuilder;
use crate::point::Point3;
use serde::Deserialize;

/// Tolerance for Z and jerk comparisons
pub const EPSILON: f64 = 1e-4;

/// How a pending lift is carried out on the next travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiftKind {
    /// Vertical move before the travel
    #[default]
    Normal,
    /// Ramp up while moving towards the destination
    Slope,
    /// Helical climb around the start point
    Spiral,
}

/// Observable state of the Z-lift machinery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftStatus {
    Grounded,
    /// Lift recorded, not emitted yet
    LiftPending,
    /// Head physically raised
    Lifted,
}

#[derive(Debug)]
pub struct GcodeWriter {
    config: PrinterConfig,
    dialect: Dialect,

    /// Declared filaments, sorted by id
    extruders: Vec<Extruder>,
    /// Physical extruder currently in use
    current_extruder: Option<usize>,
    /// Index into `extruders` of the filament loaded in each physical extruder
    loaded: Vec<Option<usize>>,
    multiple_extruders: bool,

    pos: Point3,
    position_known: bool,
    lifted: f64,
    to_lift: f64,
    to_lift_kind: LiftKind,

    max_acceleration: u32,
    acceleration: u32,
    last_acceleration: u32,
    travel_accelerations: Vec<u32>,
    first_layer_travel_accelerations: Vec<u32>,
    first_layer: bool,
    max_jerk: f64,
    last_jerk: f64,

    last_bed_temperature: u32,
    last_bed_temperature_reached: bool,
    last_fan_speed: Option<u32>,
    current_speed: f64,
}

impl GcodeWriter {
    pub fn new(config: PrinterConfig) -> Self {
        let dialect = Dialect::new(config.gcode_flavor, config.gcode_comments);
        Self {
            dialect,
            extruders: Vec::new(),
            current_extruder: None,
            loaded: Vec::new(),
            multiple_extruders: false,
            pos: Point3::default(),
            position_known: false,
            lifted: 0.0,
            to_lift: 0.0,
            to_lift_kind: LiftKind::Normal,
            max_acceleration: config.max_acceleration(),
            acceleration: 0,
            last_acceleration: 0,
            travel_accelerations: config.travel_acceleration.clone(),
            first_layer_travel_accelerations: config.first_layer_travel_acceleration.clone(),
            first_layer: false,
            max_jerk: config.max_jerk(),
            last_jerk: 0.0,
            last_bed_temperature: 0,
            last_bed_temperature_reached: true,
            last_fan_speed: None,
            current_speed: 0.0,
            config,
        }
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    pub fn flavor(&self) -> GcodeFlavor {
        self.dialect.flavor()
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    // ---- Filaments and toolchange ----

    /// Declare the filaments used by the job
    ///
    /// Tool-select instructions are only written when a filament other than
    /// 0 is declared.
    pub fn set_extruders(&mut self, filament_ids: impl IntoIterator<Item = usize>) {
        let mut ids: Vec<usize> = filament_ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        self.extruders = ids
            .iter()
            .map(|&id| Extruder::new(id, &self.config))
            .collect();
        self.multiple_extruders = ids.last().is_some_and(|&max| max > 0);
        self.current_extruder = None;
        self.loaded.clear();
    }

    pub fn extruders(&self) -> &[Extruder] {
        &self.extruders
    }

    pub fn extruder_ids(&self) -> Vec<usize> {
        self.extruders.iter().map(Extruder::id).collect()
    }

    pub fn multiple_extruders(&self) -> bool {
        self.multiple_extruders
    }

    /// Active filament, if one has been selected
    pub fn filament(&self) -> Option<&Extruder> {
        let index = self.loaded.get(self.current_extruder?).copied().flatten()?;
        self.extruders.get(index)
    }

    /// Filament loaded in a physical extruder
    pub fn loaded_filament(&self, extruder_id: usize) -> Option<&Extruder> {
        let index = self.loaded.get(extruder_id).copied().flatten()?;
        self.extruders.get(index)
    }

    fn active(&self) -> &Extruder {
        match self.filament() {
            Some(filament) => filament,
            None => panic!("no filament selected; call init_extruder or toolchange first"),
        }
    }

    fn active_mut(&mut self) -> &mut Extruder {
        let index = self
            .current_extruder
            .and_then(|extruder| self.loaded.get(extruder).copied().flatten());
        match index {
            Some(index) => &mut self.extruders[index],
            None => panic!("no filament selected; call init_extruder or toolchange first"),
        }
    }

    fn index_of(&self, filament_id: usize) -> usize {
        match self
            .extruders
            .binary_search_by_key(&filament_id, Extruder::id)
        {
            Ok(index) => index,
            Err(_) => panic!(
                "filament {filament_id} was not declared (declared: {:?})",
                self.extruder_ids()
            ),
        }
    }

    fn select(&mut self, filament_id: usize) {
        let index = self.index_of(filament_id);
        let extruder_id = self.extruders[index].extruder_id();
        if self.loaded.len() <= extruder_id {
            self.loaded.resize(extruder_id + 1, None);
        }
        self.loaded[extruder_id] = Some(index);
        self.current_extruder = Some(extruder_id);
    }

    /// Select the first filament without emitting anything
    pub fn init_extruder(&mut self, filament_id: usize) {
        if self.filament().is_none() {
            self.select(filament_id);
        }
    }

    pub fn need_toolchange(&self, filament_id: usize) -> bool {
        self.filament().map(Extruder::id) != Some(filament_id)
    }

    /// Switch to `filament_id`
    ///
    /// The tool-select instruction and the accumulator reset are only written
    /// for multi-extruder jobs. Switching to the active filament is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `filament_id` was not declared with `set_extruders`.
    pub fn toolchange(&mut self, filament_id: usize) -> String {
        if !self.need_toolchange(filament_id) {
            log::debug!("Filament {} already active, toolchange skipped", filament_id);
            return String::new();
        }
        self.select(filament_id);

        if !self.multiple_extruders {
            return String::new();
        }
        let mut out = self
            .dialect
            .toolchange(filament_id, self.config.vendor_multi_tool);
        out.push_str(&self.reset_e(true));
        out
    }

    pub fn set_extruder(&mut self, filament_id: usize) -> String {
        if !self.need_toolchange(filament_id) {
            return String::new();
        }
        self.toolchange(filament_id)
    }

    // ---- Program framing ----

    pub fn preamble(&mut self) -> String {
        let mut out = self.dialect.positioning_preamble();
        if self.dialect.sets_extrusion_mode() {
            out.push_str(
                &self
                    .dialect
                    .extrusion_mode(self.config.use_relative_e_distances),
            );
            out.push_str(&self.reset_e(true));
        }
        out
    }

    pub fn postamble(&self) -> String {
        self.dialect.postamble()
    }

    /// Free-form comment line
    pub fn comment(&self, text: &str) -> String {
        text.lines().map(|line| format!("; {line}\n")).collect()
    }

    // ---- Temperatures and fans ----

    /// Nozzle temperature, optionally addressing `tool`
    pub fn set_temperature(&self, temperature: u32, wait: bool, tool: Option<usize>) -> String {
        let multiple_tools = self.multiple_extruders && !self.config.single_extruder_multi_material;
        self.dialect
            .nozzle_temperature(temperature, wait, tool, multiple_tools)
    }

    /// Bed temperature; repeated requests are dropped unless a wait is still
    /// outstanding
    pub fn set_bed_temperature(&mut self, temperature: u32, wait: bool) -> String {
        if temperature == self.last_bed_temperature && (!wait || self.last_bed_temperature_reached)
        {
            return String::new();
        }
        self.last_bed_temperature = temperature;
        self.last_bed_temperature_reached = wait;
        self.dialect.bed_temperature(temperature, wait)
    }

    pub fn set_chamber_temperature(&self, temperature: u32, wait: bool) -> String {
        self.dialect.chamber_temperature(temperature, wait)
    }

    /// Part cooling fan in percent
    pub fn set_fan(&mut self, speed: u32) -> String {
        if self.last_fan_speed == Some(speed) {
            return String::new();
        }
        self.last_fan_speed = Some(speed);
        self.dialect.fan(speed)
    }

    pub fn set_additional_fan(&self, speed: u32) -> String {
        self.dialect.additional_fan(speed)
    }

    pub fn set_exhaust_fan(&self, speed: u32) -> String {
        self.dialect.exhaust_fan(speed)
    }

    // ---- Kinematics ----

    /// Acceleration for the following extrusions, emitted lazily
    pub fn set_acceleration(&mut self, acceleration: u32) {
        self.acceleration = acceleration;
    }

    /// Per-extruder travel acceleration table
    pub fn set_travel_acceleration(&mut self, accelerations: Vec<u32>) {
        self.travel_accelerations = accelerations;
    }

    pub fn set_first_layer_travel_acceleration(&mut self, accelerations: Vec<u32>) {
        self.first_layer_travel_accelerations = accelerations;
    }

    pub fn set_first_layer(&mut self, first_layer: bool) {
        self.first_layer = first_layer;
    }

    /// Forget the last emitted acceleration so the next one is written again
    pub fn reset_last_acceleration(&mut self) {
        self.last_acceleration = 0;
    }

    pub fn last_acceleration(&self) -> u32 {
        self.last_acceleration
    }

    /// Emit `acceleration` now, capped and de-duplicated
    pub fn emit_acceleration(&mut self, acceleration: u32) -> String {
        let mut acceleration = acceleration;
        if self.max_acceleration > 0 && acceleration > self.max_acceleration {
            log::debug!(
                "Acceleration {} capped to machine limit {}",
                acceleration,
                self.max_acceleration
            );
            acceleration = self.max_acceleration;
        }
        if acceleration == 0 || acceleration == self.last_acceleration {
            return String::new();
        }
        self.last_acceleration = acceleration;

        let accel_to_decel = self
            .config
            .accel_to_decel_enable
            .then_some(self.config.accel_to_decel_factor);
        self.dialect.acceleration(acceleration, accel_to_decel)
    }

    fn extrude_acceleration(&mut self) -> String {
        self.emit_acceleration(self.acceleration)
    }

    fn travel_acceleration(&mut self) -> String {
        let table = if self.first_layer {
            &self.first_layer_travel_accelerations
        } else {
            &self.travel_accelerations
        };
        if table.is_empty() {
            return String::new();
        }
        let Some(filament) = self.filament() else {
            return String::new();
        };
        let acceleration = get_at(table, filament.extruder_id());
        self.emit_acceleration(acceleration)
    }

    /// XY jerk, capped and de-duplicated; values below 0.01 are ignored
    pub fn set_jerk_xy(&mut self, jerk: f64) -> String {
        let mut jerk = jerk;
        if self.max_jerk > 0.0 && jerk > self.max_jerk {
            jerk = self.max_jerk;
        }
        if jerk < 0.01 || (jerk - self.last_jerk).abs() < EPSILON {
            return String::new();
        }
        self.last_jerk = jerk;
        self.dialect.jerk(jerk)
    }

    pub fn set_pressure_advance(&self, advance: f64) -> String {
        self.dialect.pressure_advance(advance)
    }

    /// Feed rate in mm/min
    ///
    /// # Panics
    ///
    /// Panics unless `0 < feedrate < 100000`.
    pub fn set_speed(&mut self, feedrate: f64, comment: &str) -> String {
        assert!(
            feedrate > 0.0 && feedrate < 100_000.0,
            "feed rate out of range: {feedrate}"
        );
        self.current_speed = feedrate;
        LineBuilder::g1()
            .emit_f(feedrate)
            .emit_comment(self.dialect.comments(), comment)
            .finish()
    }

    pub fn current_speed(&self) -> f64 {
        self.current_speed
    }

    // ---- Extrusion accumulator ----

    /// Zero the active accumulator and write `G92 E0`
    ///
    /// Without `force` nothing happens when the accumulator is already 0.
    /// Relative E and flavors without `G92` update the state silently.
    pub fn reset_e(&mut self, force: bool) -> String {
        if !self.dialect.supports_e_reset() {
            return String::new();
        }
        if self.filament().is_some() {
            let filament = self.active_mut();
            if filament.e() == 0.0 && !force {
                return String::new();
            }
            filament.reset_e();
        }
        if self.config.use_relative_e_distances {
            String::new()
        } else {
            self.dialect.reset_e()
        }
    }

    /// Build progress (MakerBot flavors)
    pub fn update_progress(&self, done: u32, total: u32, allow_100: bool) -> String {
        self.dialect.progress(done, total, allow_100)
    }

    // ---- Position ----

    pub fn position(&self) -> Point3 {
        self.pos
    }

    /// Resynchronise after G-code the writer did not produce
    pub fn set_position(&mut self, pos: Point3) {
        self.pos = pos;
        self.position_known = true;
    }

    pub fn is_position_known(&self) -> bool {
        self.position_known
    }

    pub fn set_position_known(&mut self, known: bool) {
        self.position_known = known;
    }

    pub fn lifted(&self) -> f64 {
        self.lifted
    }

    pub fn pending_lift(&self) -> f64 {
        self.to_lift
    }

    pub fn lift_status(&self) -> LiftStatus {
        if self.to_lift > 0.0 {
            LiftStatus::LiftPending
        } else if self.lifted > 0.0 {
            LiftStatus::Lifted
        } else {
            LiftStatus::Grounded
        }
    }
}
