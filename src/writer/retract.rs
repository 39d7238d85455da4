//! Retraction and unretraction.

use super::GcodeWriter;
use crate::format::LineBuilder;

impl GcodeWriter {
    /// Regular retraction; `before_wipe` keeps back the share done by the wipe
    pub fn retract(&mut self, before_wipe: bool) -> String {
        let filament = self.active();
        let factor = if before_wipe {
            filament.retract_before_wipe()
        } else {
            1.0
        };
        let length = factor * filament.retraction_length();
        let restart_extra = factor * filament.retract_restart_extra();
        self.retract_by(length, restart_extra, "retract")
    }

    /// Retraction ahead of a toolchange, using the toolchange lengths
    pub fn retract_for_toolchange(&mut self, before_wipe: bool) -> String {
        let filament = self.active();
        let factor = if before_wipe {
            filament.retract_before_wipe()
        } else {
            1.0
        };
        let length = factor * filament.retract_length_toolchange();
        let restart_extra = factor * filament.retract_restart_extra_toolchange();
        self.retract_by(length, restart_extra, "retract for toolchange")
    }

    fn retract_by(&mut self, length: f64, restart_extra: f64, comment: &str) -> String {
        let firmware = self.config.use_firmware_retraction;
        // Firmware retraction only tracks the retracted state
        let length = if firmware { 1.0 } else { length };

        let filament = self.active_mut();
        let de = filament.retract(length, restart_extra);
        let e = filament.e();
        let speed = filament.retract_speed();

        let mut out = String::new();
        if de != 0.0 {
            if firmware {
                out.push_str(&self.dialect.firmware_retract());
            } else {
                out.push_str(
                    &LineBuilder::g1()
                        .emit_e(e)
                        .emit_f(speed * 60.0)
                        .emit_comment(self.dialect.comments(), comment)
                        .finish(),
                );
            }
        }
        out.push_str(&self.dialect.extruder_off());
        out
    }

    /// Feed back the retracted length plus the restart extra
    pub fn unretract(&mut self) -> String {
        let mut out = self.dialect.extruder_on();

        let filament = self.active_mut();
        let de = filament.unretract();
        let e = filament.e();
        let speed = filament.deretract_speed();
        if de == 0.0 {
            return out;
        }

        if self.config.use_firmware_retraction {
            out.push_str(&self.dialect.firmware_unretract());
            out.push_str(&self.reset_e(false));
        } else {
            out.push_str(
                &LineBuilder::g1()
                    .emit_e(e)
                    .emit_f(speed * 60.0)
                    .emit_comment(self.dialect.comments(), "unretract")
                    .finish(),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::config::PrinterConfig;
    use crate::flavor::GcodeFlavor;
    use crate::point::Point2;
    use crate::writer::GcodeWriter;

    fn writer_with(config: PrinterConfig) -> GcodeWriter {
        let mut w = GcodeWriter::new(config);
        w.set_extruders([0]);
        w.init_extruder(0);
        w
    }

    fn config() -> PrinterConfig {
        PrinterConfig {
            retract_length: vec![1.0],
            retract_restart_extra: vec![0.0],
            retract_speed: vec![40.0],
            deretract_speed: vec![0.0],
            ..PrinterConfig::default()
        }
    }

    #[test]
    fn test_retract_and_unretract() {
        let mut w = writer_with(config());
        w.extrude_to_xy(Point2::new(10.0, 0.0), 5.0, "", false);
        assert_eq!(w.retract(false), "G1 E4 F2400\n");
        assert_eq!(w.retract(false), "");
        assert_eq!(w.unretract(), "G1 E5 F2400\n");
        assert_eq!(w.unretract(), "");
    }

    #[test]
    fn test_retract_before_wipe_scales() {
        let mut w = writer_with(PrinterConfig {
            retract_before_wipe: vec![40.0],
            ..config()
        });
        w.extrude_to_xy(Point2::new(10.0, 0.0), 5.0, "", false);
        assert_eq!(w.retract(true), "G1 E4.6 F2400\n");
        // The wipe share is retracted by the full retraction
        assert_eq!(w.retract(false), "G1 E4 F2400\n");
    }

    #[test]
    fn test_retract_for_toolchange_lengths() {
        let mut w = writer_with(PrinterConfig {
            retract_length_toolchange: vec![3.0],
            retract_restart_extra_toolchange: vec![0.5],
            ..config()
        });
        w.extrude_to_xy(Point2::new(10.0, 0.0), 5.0, "", false);
        assert_eq!(w.retract_for_toolchange(false), "G1 E2 F2400\n");
        assert_eq!(w.unretract(), "G1 E5.5 F2400\n");
    }

    #[test]
    fn test_relative_retraction() {
        let mut w = writer_with(PrinterConfig {
            use_relative_e_distances: true,
            deretract_speed: vec![20.0],
            ..config()
        });
        w.extrude_to_xy(Point2::new(10.0, 0.0), 5.0, "", false);
        assert_eq!(w.retract(false), "G1 E-1 F2400\n");
        assert_eq!(w.unretract(), "G1 E1 F1200\n");
    }

    #[test]
    fn test_firmware_retraction() {
        let mut w = writer_with(PrinterConfig {
            use_firmware_retraction: true,
            ..config()
        });
        w.extrude_to_xy(Point2::new(10.0, 0.0), 5.0, "", false);
        assert_eq!(w.retract(false), "G10\n");
        assert_eq!(w.unretract(), "G11\nG92 E0\n");
    }

    #[test]
    fn test_firmware_retraction_machinekit() {
        let mut w = writer_with(PrinterConfig {
            gcode_flavor: GcodeFlavor::Machinekit,
            use_firmware_retraction: true,
            ..config()
        });
        w.extrude_to_xy(Point2::new(10.0, 0.0), 5.0, "", false);
        assert_eq!(w.retract(false), "G22\n");
        assert_eq!(w.unretract(), "G23\nG92 E0\n");
    }

    #[test]
    fn test_makerware_extruder_on_off() {
        let mut w = writer_with(PrinterConfig {
            gcode_flavor: GcodeFlavor::MakerWare,
            ..config()
        });
        w.extrude_to_xy(Point2::new(10.0, 0.0), 5.0, "", false);
        assert_eq!(w.retract(false), "G1 E4 F2400\nM103\n");
        assert_eq!(w.retract(false), "M103\n");
        assert_eq!(w.unretract(), "M101\nG1 E5 F2400\n");
    }
}
