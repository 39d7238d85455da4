//! Job scripts
//!
//! A job script is a JSON array of requests, each tagged with an `"op"`
//! field. Requests are replayed in order against a single writer:
//!
//! ```json
//! [
//!   { "op": "extruders", "ids": [0, 1] },
//!   { "op": "preamble" },
//!   { "op": "toolchange", "id": 0 },
//!   { "op": "travel_to_xyz", "to": [10, 10, 0.2] },
//!   { "op": "extrude_to_xy", "to": [20, 10], "de": 0.5 }
//! ]
//! ```
//!
//! Scripts are checked before anything is emitted, so requests the writer
//! would reject (undeclared filaments, motion before a filament is selected,
//! out of range speeds) are reported as errors instead of panics.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::config::PrinterConfig;
use crate::point::{Point2, Point3};
use crate::writer::{GcodeWriter, LiftKind};

/// One semantic writer request
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Request {
    Extruders {
        ids: Vec<usize>,
    },
    InitExtruder {
        id: usize,
    },
    Preamble,
    Postamble,
    TravelToXy {
        to: Point2,
        #[serde(default)]
        comment: String,
    },
    TravelToXyz {
        to: Point3,
        #[serde(default)]
        comment: String,
    },
    TravelToZ {
        z: f64,
        #[serde(default)]
        comment: String,
    },
    ExtrudeToXy {
        to: Point2,
        de: f64,
        #[serde(default)]
        no_extrusion: bool,
        #[serde(default)]
        comment: String,
    },
    ExtrudeToXyz {
        to: Point3,
        de: f64,
        #[serde(default)]
        no_extrusion: bool,
        #[serde(default)]
        comment: String,
    },
    ExtrudeArcToXy {
        to: Point2,
        /// Arc centre relative to the start point
        center: Point2,
        de: f64,
        #[serde(default)]
        ccw: bool,
        #[serde(default)]
        no_extrusion: bool,
        #[serde(default)]
        comment: String,
    },
    LazyLift {
        #[serde(default)]
        kind: LiftKind,
        #[serde(default)]
        spiral_vase: bool,
        #[serde(default)]
        tool_change: bool,
    },
    EagerLift {
        #[serde(default)]
        kind: LiftKind,
        #[serde(default)]
        tool_change: bool,
    },
    Unlift,
    Retract {
        #[serde(default)]
        before_wipe: bool,
    },
    RetractForToolchange {
        #[serde(default)]
        before_wipe: bool,
    },
    Unretract,
    Toolchange {
        id: usize,
    },
    SetExtruder {
        id: usize,
    },
    SetTemperature {
        temperature: u32,
        #[serde(default)]
        wait: bool,
        #[serde(default)]
        tool: Option<usize>,
    },
    SetBedTemperature {
        temperature: u32,
        #[serde(default)]
        wait: bool,
    },
    SetChamberTemperature {
        temperature: u32,
        #[serde(default)]
        wait: bool,
    },
    SetFan {
        speed: u32,
    },
    SetAdditionalFan {
        speed: u32,
    },
    SetExhaustFan {
        speed: u32,
    },
    /// Acceleration for the following extrusions
    SetAcceleration {
        acceleration: u32,
    },
    /// Write an acceleration immediately
    EmitAcceleration {
        acceleration: u32,
    },
    SetTravelAcceleration {
        accelerations: Vec<u32>,
    },
    SetFirstLayerTravelAcceleration {
        accelerations: Vec<u32>,
    },
    ResetLastAcceleration,
    SetJerk {
        jerk: f64,
    },
    SetPressureAdvance {
        advance: f64,
    },
    SetSpeed {
        /// mm/min
        feedrate: f64,
        #[serde(default)]
        comment: String,
    },
    ResetE {
        #[serde(default)]
        force: bool,
    },
    SetFirstLayer {
        first_layer: bool,
    },
    SetPosition {
        to: Point3,
    },
    UpdateProgress {
        done: u32,
        total: u32,
        #[serde(default)]
        allow_100: bool,
    },
    Comment {
        text: String,
    },
}

impl Request {
    /// Whether the request needs an active filament
    fn needs_filament(&self) -> bool {
        matches!(
            self,
            Request::TravelToXy { .. }
                | Request::TravelToXyz { .. }
                | Request::TravelToZ { .. }
                | Request::ExtrudeToXy { .. }
                | Request::ExtrudeToXyz { .. }
                | Request::ExtrudeArcToXy { .. }
                | Request::LazyLift { .. }
                | Request::EagerLift { .. }
                | Request::Unlift
                | Request::Retract { .. }
                | Request::RetractForToolchange { .. }
                | Request::Unretract
        )
    }
}

/// Parse a JSON job script
pub fn parse_script(content: &str) -> Result<Vec<Request>> {
    serde_json::from_str(content).context("Failed to parse job script JSON")
}

/// Read and parse a job script file
pub fn load_script(path: &std::path::Path) -> Result<Vec<Request>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job script: {}", path.display()))?;
    parse_script(&content).with_context(|| format!("Invalid job script: {}", path.display()))
}

/// A request the writer would reject
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptIssue {
    /// Position in the script, 0-based
    pub index: usize,
    pub message: String,
}

/// Check a script without emitting anything
pub fn check(requests: &[Request]) -> Vec<ScriptIssue> {
    let mut issues = Vec::new();
    let mut declared: BTreeSet<usize> = BTreeSet::new();
    let mut selected = false;

    for (index, request) in requests.iter().enumerate() {
        let mut issue = |message: String| issues.push(ScriptIssue { index, message });

        match request {
            Request::Extruders { ids } => {
                if ids.is_empty() {
                    issue("extruders: at least one filament id is required".to_string());
                }
                declared = ids.iter().copied().collect();
                selected = false;
            }
            Request::InitExtruder { id }
            | Request::Toolchange { id }
            | Request::SetExtruder { id } => {
                if declared.contains(id) {
                    selected = true;
                } else {
                    issue(format!(
                        "filament {id} was not declared (declared: {declared:?})"
                    ));
                }
            }
            Request::SetSpeed { feedrate, .. } => {
                if !(*feedrate > 0.0 && *feedrate < 100_000.0) {
                    issue(format!(
                        "set_speed: feed rate must be between 0 and 100000 mm/min, got {feedrate}"
                    ));
                }
            }
            Request::SetFan { speed }
            | Request::SetAdditionalFan { speed }
            | Request::SetExhaustFan { speed } => {
                if *speed > 100 {
                    issue(format!("fan speed is a percentage, got {speed}"));
                }
            }
            _ => {}
        }

        if request.needs_filament() && !selected {
            issues.push(ScriptIssue {
                index,
                message: "motion requested before a filament was selected".to_string(),
            });
        }
    }

    issues
}

/// Fail with every issue found by `check`
pub fn validate(requests: &[Request]) -> Result<()> {
    let issues = check(requests);
    if issues.is_empty() {
        return Ok(());
    }
    let report = issues
        .iter()
        .map(|issue| format!("request {}: {}", issue.index, issue.message))
        .collect::<Vec<_>>()
        .join("\n");
    bail!("Job script has {} invalid request(s):\n{}", issues.len(), report)
}

/// Apply one request, returning the emitted text
pub fn apply(writer: &mut GcodeWriter, request: &Request) -> String {
    match request {
        Request::Extruders { ids } => {
            writer.set_extruders(ids.iter().copied());
            String::new()
        }
        Request::InitExtruder { id } => {
            writer.init_extruder(*id);
            String::new()
        }
        Request::Preamble => writer.preamble(),
        Request::Postamble => writer.postamble(),
        Request::TravelToXy { to, comment } => writer.travel_to_xy(*to, comment),
        Request::TravelToXyz { to, comment } => writer.travel_to_xyz(*to, comment),
        Request::TravelToZ { z, comment } => writer.travel_to_z(*z, comment),
        Request::ExtrudeToXy {
            to,
            de,
            no_extrusion,
            comment,
        } => writer.extrude_to_xy(*to, *de, comment, *no_extrusion),
        Request::ExtrudeToXyz {
            to,
            de,
            no_extrusion,
            comment,
        } => writer.extrude_to_xyz(*to, *de, comment, *no_extrusion),
        Request::ExtrudeArcToXy {
            to,
            center,
            de,
            ccw,
            no_extrusion,
            comment,
        } => writer.extrude_arc_to_xy(*to, *center, *de, *ccw, comment, *no_extrusion),
        Request::LazyLift {
            kind,
            spiral_vase,
            tool_change,
        } => writer.lazy_lift(*kind, *spiral_vase, *tool_change),
        Request::EagerLift { kind, tool_change } => writer.eager_lift(*kind, *tool_change),
        Request::Unlift => writer.unlift(),
        Request::Retract { before_wipe } => writer.retract(*before_wipe),
        Request::RetractForToolchange { before_wipe } => {
            writer.retract_for_toolchange(*before_wipe)
        }
        Request::Unretract => writer.unretract(),
        Request::Toolchange { id } => writer.toolchange(*id),
        Request::SetExtruder { id } => writer.set_extruder(*id),
        Request::SetTemperature {
            temperature,
            wait,
            tool,
        } => writer.set_temperature(*temperature, *wait, *tool),
        Request::SetBedTemperature { temperature, wait } => {
            writer.set_bed_temperature(*temperature, *wait)
        }
        Request::SetChamberTemperature { temperature, wait } => {
            writer.set_chamber_temperature(*temperature, *wait)
        }
        Request::SetFan { speed } => writer.set_fan(*speed),
        Request::SetAdditionalFan { speed } => writer.set_additional_fan(*speed),
        Request::SetExhaustFan { speed } => writer.set_exhaust_fan(*speed),
        Request::SetAcceleration { acceleration } => {
            writer.set_acceleration(*acceleration);
            String::new()
        }
        Request::EmitAcceleration { acceleration } => writer.emit_acceleration(*acceleration),
        Request::SetTravelAcceleration { accelerations } => {
            writer.set_travel_acceleration(accelerations.clone());
            String::new()
        }
        Request::SetFirstLayerTravelAcceleration { accelerations } => {
            writer.set_first_layer_travel_acceleration(accelerations.clone());
            String::new()
        }
        Request::ResetLastAcceleration => {
            writer.reset_last_acceleration();
            String::new()
        }
        Request::SetJerk { jerk } => writer.set_jerk_xy(*jerk),
        Request::SetPressureAdvance { advance } => writer.set_pressure_advance(*advance),
        Request::SetSpeed { feedrate, comment } => writer.set_speed(*feedrate, comment),
        Request::ResetE { force } => writer.reset_e(*force),
        Request::SetFirstLayer { first_layer } => {
            writer.set_first_layer(*first_layer);
            String::new()
        }
        Request::SetPosition { to } => {
            writer.set_position(*to);
            String::new()
        }
        Request::UpdateProgress {
            done,
            total,
            allow_100,
        } => writer.update_progress(*done, *total, *allow_100),
        Request::Comment { text } => writer.comment(text),
    }
}

/// Validate and render a whole script
pub fn render(config: PrinterConfig, requests: &[Request]) -> Result<(String, GcodeWriter)> {
    validate(requests)?;
    let mut writer = GcodeWriter::new(config);
    let mut out = String::new();
    for request in requests {
        out.push_str(&apply(&mut writer, request));
    }
    Ok((out, writer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flavor::GcodeFlavor;

    #[test]
    fn test_parse_tagged_requests() {
        let requests = parse_script(
            r#"[
                {"op": "extruders", "ids": [1, 0]},
                {"op": "preamble"},
                {"op": "lazy_lift", "kind": "spiral"},
                {"op": "set_temperature", "temperature": 210, "tool": 1},
                {"op": "extrude_arc_to_xy", "to": [1, 2], "center": [0.5, 0], "de": 0.1, "ccw": true}
            ]"#,
        )
        .unwrap();

        assert_eq!(requests[0], Request::Extruders { ids: vec![1, 0] });
        assert_eq!(requests[1], Request::Preamble);
        assert_eq!(
            requests[2],
            Request::LazyLift {
                kind: LiftKind::Spiral,
                spiral_vase: false,
                tool_change: false
            }
        );
        assert_eq!(
            requests[3],
            Request::SetTemperature {
                temperature: 210,
                wait: false,
                tool: Some(1)
            }
        );
        assert!(matches!(requests[4], Request::ExtrudeArcToXy { ccw: true, .. }));
    }

    #[test]
    fn test_unknown_op_rejected() {
        assert!(parse_script(r#"[{"op": "teleport"}]"#).is_err());
        assert!(parse_script(r#"[{"op": "set_fan", "speed": 50, "boost": 1}]"#).is_err());
    }

    #[test]
    fn test_check_reports_contract_violations() {
        let requests = vec![
            Request::TravelToXy {
                to: Point2::new(1.0, 1.0),
                comment: String::new(),
            },
            Request::Extruders { ids: vec![0] },
            Request::Toolchange { id: 3 },
            Request::SetSpeed {
                feedrate: 0.0,
                comment: String::new(),
            },
            Request::SetFan { speed: 150 },
        ];
        let issues = check(&requests);
        let indices: Vec<usize> = issues.iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![0, 2, 3, 4]);
        assert!(validate(&requests).is_err());
    }

    #[test]
    fn test_render_small_job() {
        let config = PrinterConfig {
            gcode_flavor: GcodeFlavor::MarlinFirmware,
            ..PrinterConfig::default()
        };
        let requests = parse_script(
            r#"[
                {"op": "extruders", "ids": [0]},
                {"op": "init_extruder", "id": 0},
                {"op": "preamble"},
                {"op": "set_bed_temperature", "temperature": 60, "wait": true},
                {"op": "travel_to_xyz", "to": [10, 10, 0.2]},
                {"op": "extrude_to_xy", "to": [20, 10], "de": 0.5},
                {"op": "retract"}
            ]"#,
        )
        .unwrap();

        let (gcode, writer) = render(config, &requests).unwrap();
        assert_eq!(
            gcode,
            "G90\nG21\nM82\nG92 E0\nM190 S60\nG1 X10 Y10 F9000\nG1 Z.2 F9000\nG1 X20 Y10 E.5\nG1 E-.3 F1800\n"
        );
        assert!(writer.is_position_known());
    }
}
