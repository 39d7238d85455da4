//! Instruction templates per flavor.
//!
//! `Dialect` is stateless: it renders one operation for the configured
//! flavor. De-duplication against previously emitted values is the writer's
//! job.

use super::GcodeFlavor;
use crate::format::format_general;

/// Renders flavor-specific instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    flavor: GcodeFlavor,
    comments: bool,
}

impl Dialect {
    pub fn new(flavor: GcodeFlavor, comments: bool) -> Self {
        Self { flavor, comments }
    }

    pub fn flavor(&self) -> GcodeFlavor {
        self.flavor
    }

    pub fn comments(&self) -> bool {
        self.comments
    }

    /// One terminated line, with the comment appended when enabled
    fn line(&self, code: &str, comment: &str) -> String {
        let mut out = String::with_capacity(code.len() + comment.len() + 4);
        out.push_str(code);
        if self.comments && !comment.is_empty() {
            out.push_str(" ; ");
            out.push_str(comment);
        }
        out.push('\n');
        out
    }

    /// Absolute positioning and millimetre units
    pub fn positioning_preamble(&self) -> String {
        match self.flavor {
            GcodeFlavor::MakerWare => String::new(),
            GcodeFlavor::RepRapSprinter
            | GcodeFlavor::RepRapFirmware
            | GcodeFlavor::Repetier
            | GcodeFlavor::Teacup
            | GcodeFlavor::MarlinLegacy
            | GcodeFlavor::MarlinFirmware
            | GcodeFlavor::Sailfish
            | GcodeFlavor::Mach3
            | GcodeFlavor::Machinekit
            | GcodeFlavor::Smoothie
            | GcodeFlavor::Klipper
            | GcodeFlavor::NoExtrusion => "G90\nG21\n".to_string(),
        }
    }

    /// Whether the preamble selects the E axis mode (M82/M83)
    pub fn sets_extrusion_mode(&self) -> bool {
        matches!(
            self.flavor,
            GcodeFlavor::RepRapSprinter
                | GcodeFlavor::RepRapFirmware
                | GcodeFlavor::MarlinLegacy
                | GcodeFlavor::MarlinFirmware
                | GcodeFlavor::Teacup
                | GcodeFlavor::Repetier
                | GcodeFlavor::Smoothie
                | GcodeFlavor::Klipper
        )
    }

    pub fn extrusion_mode(&self, relative: bool) -> String {
        if relative {
            self.line("M83", "use relative distances for extrusion")
        } else {
            self.line("M82", "use absolute distances for extrusion")
        }
    }

    pub fn postamble(&self) -> String {
        match self.flavor {
            GcodeFlavor::Machinekit => self.line("M2", "end of program"),
            GcodeFlavor::RepRapSprinter
            | GcodeFlavor::RepRapFirmware
            | GcodeFlavor::Repetier
            | GcodeFlavor::Teacup
            | GcodeFlavor::MakerWare
            | GcodeFlavor::MarlinLegacy
            | GcodeFlavor::MarlinFirmware
            | GcodeFlavor::Sailfish
            | GcodeFlavor::Mach3
            | GcodeFlavor::Smoothie
            | GcodeFlavor::Klipper
            | GcodeFlavor::NoExtrusion => String::new(),
        }
    }

    /// Nozzle temperature
    ///
    /// `tool` is only written when `multiple_tools` is set (MakerBot
    /// flavors always address the tool).
    pub fn nozzle_temperature(
        &self,
        temperature: u32,
        wait: bool,
        tool: Option<usize>,
        multiple_tools: bool,
    ) -> String {
        let flavor = self.flavor;
        if wait && flavor.is_makerbot() {
            return String::new();
        }

        let separate_wait = matches!(flavor, GcodeFlavor::Teacup | GcodeFlavor::RepRapFirmware);
        let (code, comment) = if wait && !separate_wait {
            ("M109", "set nozzle temperature and wait for it to be reached")
        } else if flavor == GcodeFlavor::RepRapFirmware {
            ("G10", "set nozzle temperature")
        } else {
            ("M104", "set nozzle temperature")
        };
        let (letter, tool_first) = match flavor {
            GcodeFlavor::Mach3 | GcodeFlavor::Machinekit => ('P', false),
            GcodeFlavor::RepRapFirmware => ('S', true),
            GcodeFlavor::RepRapSprinter
            | GcodeFlavor::Repetier
            | GcodeFlavor::Teacup
            | GcodeFlavor::MakerWare
            | GcodeFlavor::MarlinLegacy
            | GcodeFlavor::MarlinFirmware
            | GcodeFlavor::Sailfish
            | GcodeFlavor::Smoothie
            | GcodeFlavor::Klipper
            | GcodeFlavor::NoExtrusion => ('S', false),
        };
        let tool = tool.filter(|_| multiple_tools || flavor.is_makerbot());

        let instruction = match tool {
            Some(tool) if tool_first => format!("{code} P{tool} {letter}{temperature}"),
            Some(tool) => format!("{code} {letter}{temperature} T{tool}"),
            None => format!("{code} {letter}{temperature}"),
        };

        let mut out = self.line(&instruction, comment);
        if wait && separate_wait {
            out.push_str(&self.line("M116", "wait for temperature to be reached"));
        }
        out
    }

    pub fn bed_temperature(&self, temperature: u32, wait: bool) -> String {
        if wait {
            self.line(
                &format!("M190 S{temperature}"),
                "set bed temperature and wait for it to be reached",
            )
        } else {
            self.line(&format!("M140 S{temperature}"), "set bed temperature")
        }
    }

    /// Chamber temperature; waiting runs the auxiliary fan while heating
    pub fn chamber_temperature(&self, temperature: u32, wait: bool) -> String {
        if wait {
            let mut out = self.line("M106 P2 S255", "");
            out.push_str(&self.line(
                &format!("M191 S{temperature}"),
                "set chamber temperature and wait for it to be reached",
            ));
            out.push_str(&self.line("M106 P2 S0", ""));
            out
        } else {
            self.line(&format!("M141 S{temperature}"), "set chamber temperature")
        }
    }

    /// Part cooling fan, `speed` in percent
    pub fn fan(&self, speed: u32) -> String {
        let flavor = self.flavor;
        if speed == 0 {
            let code = if flavor.is_makerbot() { "M127" } else { "M106 S0" };
            return self.line(code, "disable fan");
        }

        let duty = format_general(255.0 * f64::from(speed) / 100.0, 6);
        let code = match flavor {
            GcodeFlavor::MakerWare | GcodeFlavor::Sailfish => "M126".to_string(),
            GcodeFlavor::Mach3 | GcodeFlavor::Machinekit => format!("M106 P{duty}"),
            GcodeFlavor::RepRapSprinter
            | GcodeFlavor::RepRapFirmware
            | GcodeFlavor::Repetier
            | GcodeFlavor::Teacup
            | GcodeFlavor::MarlinLegacy
            | GcodeFlavor::MarlinFirmware
            | GcodeFlavor::Smoothie
            | GcodeFlavor::Klipper
            | GcodeFlavor::NoExtrusion => format!("M106 S{duty}"),
        };
        self.line(&code, "enable fan")
    }

    /// Auxiliary (chamber circulation) fan on output P2
    pub fn additional_fan(&self, speed: u32) -> String {
        let duty = (255.0 * f64::from(speed) / 100.0) as i32;
        let comment = if speed == 0 {
            "disable additional fan"
        } else {
            "enable additional fan"
        };
        self.line(&format!("M106 P2 S{duty}"), comment)
    }

    /// Exhaust fan on output P3
    pub fn exhaust_fan(&self, speed: u32) -> String {
        let duty = (f64::from(speed) / 100.0 * 255.0) as i32;
        self.line(&format!("M106 P3 S{duty}"), "")
    }

    /// Print acceleration
    ///
    /// `accel_to_decel` is the Klipper accel-to-decel factor in percent, when
    /// enabled.
    pub fn acceleration(&self, acceleration: u32, accel_to_decel: Option<f64>) -> String {
        let m204 = |letter: char| {
            self.line(&format!("M204 {letter}{acceleration}"), "adjust acceleration")
        };
        match self.flavor {
            GcodeFlavor::Repetier => {
                let mut out = self.line(
                    &format!("M201 X{acceleration} Y{acceleration}"),
                    "adjust acceleration",
                );
                out.push_str(&self.line(
                    &format!("M202 X{acceleration} Y{acceleration}"),
                    "adjust acceleration",
                ));
                out
            }
            GcodeFlavor::RepRapFirmware | GcodeFlavor::MarlinFirmware => m204('P'),
            GcodeFlavor::Klipper => {
                let mut out = String::new();
                if let Some(factor) = accel_to_decel {
                    let decel = format_general(f64::from(acceleration) * factor / 100.0, 6);
                    out.push_str(&self.line(
                        &format!("SET_VELOCITY_LIMIT ACCEL_TO_DECEL={decel}"),
                        "adjust ACCEL_TO_DECEL",
                    ));
                }
                out.push_str(&m204('S'));
                out
            }
            GcodeFlavor::RepRapSprinter
            | GcodeFlavor::Teacup
            | GcodeFlavor::MakerWare
            | GcodeFlavor::MarlinLegacy
            | GcodeFlavor::Sailfish
            | GcodeFlavor::Mach3
            | GcodeFlavor::Machinekit
            | GcodeFlavor::Smoothie
            | GcodeFlavor::NoExtrusion => m204('S'),
        }
    }

    pub fn jerk(&self, jerk: f64) -> String {
        let jerk = format_general(jerk, 6);
        match self.flavor {
            GcodeFlavor::Klipper => self.line(
                &format!("SET_VELOCITY_LIMIT SQUARE_CORNER_VELOCITY={jerk}"),
                "adjust jerk",
            ),
            GcodeFlavor::RepRapSprinter
            | GcodeFlavor::RepRapFirmware
            | GcodeFlavor::Repetier
            | GcodeFlavor::Teacup
            | GcodeFlavor::MakerWare
            | GcodeFlavor::MarlinLegacy
            | GcodeFlavor::MarlinFirmware
            | GcodeFlavor::Sailfish
            | GcodeFlavor::Mach3
            | GcodeFlavor::Machinekit
            | GcodeFlavor::Smoothie
            | GcodeFlavor::NoExtrusion => {
                self.line(&format!("M205 X{jerk} Y{jerk}"), "adjust jerk")
            }
        }
    }

    /// Pressure/linear advance; negative values produce nothing
    pub fn pressure_advance(&self, advance: f64) -> String {
        if advance < 0.0 {
            return String::new();
        }
        let value = format_general(advance, 4);
        let comment = "override pressure advance value";
        match self.flavor {
            GcodeFlavor::Klipper => {
                self.line(&format!("SET_PRESSURE_ADVANCE ADVANCE={value}"), comment)
            }
            GcodeFlavor::RepRapFirmware => self.line(&format!("M572 D0 S{value}"), comment),
            GcodeFlavor::RepRapSprinter
            | GcodeFlavor::Repetier
            | GcodeFlavor::Teacup
            | GcodeFlavor::MakerWare
            | GcodeFlavor::MarlinLegacy
            | GcodeFlavor::MarlinFirmware
            | GcodeFlavor::Sailfish
            | GcodeFlavor::Mach3
            | GcodeFlavor::Machinekit
            | GcodeFlavor::Smoothie
            | GcodeFlavor::NoExtrusion => {
                let mut out = self.line("M400", "");
                out.push_str(&self.line(&format!("M900 K{value}"), comment));
                out
            }
        }
    }

    /// Tool select prefix
    pub fn toolchange_prefix(&self) -> &'static str {
        match self.flavor {
            GcodeFlavor::MakerWare => "M135 T",
            GcodeFlavor::Sailfish => "M108 T",
            GcodeFlavor::RepRapSprinter
            | GcodeFlavor::RepRapFirmware
            | GcodeFlavor::Repetier
            | GcodeFlavor::Teacup
            | GcodeFlavor::MarlinLegacy
            | GcodeFlavor::MarlinFirmware
            | GcodeFlavor::Mach3
            | GcodeFlavor::Machinekit
            | GcodeFlavor::Smoothie
            | GcodeFlavor::Klipper
            | GcodeFlavor::NoExtrusion => "T",
        }
    }

    pub fn toolchange(&self, filament_id: usize, vendor_multi_tool: bool) -> String {
        let code = if vendor_multi_tool {
            format!("M1020 S{filament_id}")
        } else {
            format!("{}{filament_id}", self.toolchange_prefix())
        };
        self.line(&code, "change extruder")
    }

    /// Whether `G92 E0` is understood
    pub fn supports_e_reset(&self) -> bool {
        !matches!(
            self.flavor,
            GcodeFlavor::Mach3 | GcodeFlavor::MakerWare | GcodeFlavor::Sailfish
        )
    }

    pub fn reset_e(&self) -> String {
        self.line("G92 E0", "reset extrusion distance")
    }

    /// Native retract and unretract codes
    fn firmware_retract_codes(&self) -> (&'static str, &'static str) {
        match self.flavor {
            GcodeFlavor::Machinekit => ("G22", "G23"),
            GcodeFlavor::RepRapSprinter
            | GcodeFlavor::RepRapFirmware
            | GcodeFlavor::Repetier
            | GcodeFlavor::Teacup
            | GcodeFlavor::MakerWare
            | GcodeFlavor::MarlinLegacy
            | GcodeFlavor::MarlinFirmware
            | GcodeFlavor::Sailfish
            | GcodeFlavor::Mach3
            | GcodeFlavor::Smoothie
            | GcodeFlavor::Klipper
            | GcodeFlavor::NoExtrusion => ("G10", "G11"),
        }
    }

    pub fn firmware_retract(&self) -> String {
        self.line(self.firmware_retract_codes().0, "retract")
    }

    pub fn firmware_unretract(&self) -> String {
        self.line(self.firmware_retract_codes().1, "unretract")
    }

    /// Extruder off/on around retractions (MakerWare only)
    fn extruder_switch(&self, on: bool) -> String {
        match self.flavor {
            GcodeFlavor::MakerWare if on => self.line("M101", "extruder on"),
            GcodeFlavor::MakerWare => self.line("M103", "extruder off"),
            GcodeFlavor::RepRapSprinter
            | GcodeFlavor::RepRapFirmware
            | GcodeFlavor::Repetier
            | GcodeFlavor::Teacup
            | GcodeFlavor::MarlinLegacy
            | GcodeFlavor::MarlinFirmware
            | GcodeFlavor::Sailfish
            | GcodeFlavor::Mach3
            | GcodeFlavor::Machinekit
            | GcodeFlavor::Smoothie
            | GcodeFlavor::Klipper
            | GcodeFlavor::NoExtrusion => String::new(),
        }
    }

    /// Emitted after every retraction
    pub fn extruder_off(&self) -> String {
        self.extruder_switch(false)
    }

    /// Emitted before every unretraction
    pub fn extruder_on(&self) -> String {
        self.extruder_switch(true)
    }

    /// Build progress (MakerBot flavors only)
    pub fn progress(&self, done: u32, total: u32, allow_100: bool) -> String {
        if !self.flavor.is_makerbot() {
            return String::new();
        }
        let total = total.max(1);
        let mut percent = (100.0 * f64::from(done) / f64::from(total) + 0.5).floor() as u32;
        if !allow_100 {
            percent = percent.min(99);
        }
        self.line(&format!("M73 P{percent}"), "update progress")
    }
}
