//! Replays a G-code stream to recover the machine state it implies.
//!
//! This is what a downstream time estimator sees: it only has the text. The
//! writer's tests use it to check that emitted coordinates, feed rates and
//! extrusion survive the trip through the formatter.

use super::{Command, ParsedLine, parse_line};

/// State reconstructed from a stream
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Replay {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Current E register
    pub e: f64,
    /// Last feed rate, mm/min
    pub feedrate: f64,
    pub relative_e: bool,
    /// Last selected tool
    pub tool: Option<usize>,
    /// Net filament fed, retractions subtracted
    pub extruded: f64,
    pub moves: usize,
    pub arcs: usize,
    pub e_resets: usize,
}

impl Replay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every line of `text`
    pub fn run(text: &str) -> Self {
        let mut replay = Self::new();
        for line in text.lines() {
            replay.apply(&parse_line(line));
        }
        replay
    }

    pub fn apply(&mut self, line: &ParsedLine) {
        let ParsedLine::Command(cmd) = line else {
            return;
        };
        match cmd.name.as_str() {
            "G0" | "G1" => {
                self.moves += 1;
                self.motion(cmd);
            }
            "G2" | "G3" => {
                self.arcs += 1;
                self.motion(cmd);
            }
            "G92" => {
                if let Some(e) = cmd.value("E") {
                    self.e = e;
                    self.e_resets += 1;
                }
            }
            "M82" => self.relative_e = false,
            "M83" => self.relative_e = true,
            "M1020" => self.tool = cmd.value("S").map(|s| s as usize),
            "M135" | "M108" => self.tool = cmd.value("T").map(|t| t as usize),
            name => {
                if let Some(tool) = name.strip_prefix('T').and_then(|t| t.parse().ok()) {
                    self.tool = Some(tool);
                }
            }
        }
    }

    fn motion(&mut self, cmd: &Command) {
        if let Some(x) = cmd.value("X") {
            self.x = x;
        }
        if let Some(y) = cmd.value("Y") {
            self.y = y;
        }
        if let Some(z) = cmd.value("Z") {
            self.z = z;
        }
        if let Some(f) = cmd.value("F") {
            self.feedrate = f;
        }
        if let Some(e) = cmd.value("E") {
            let de = if self.relative_e { e } else { e - self.e };
            self.extruded += de;
            self.e = if self.relative_e { self.e + e } else { e };
        }
    }
}
