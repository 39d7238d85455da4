//! Travel and extrusion moves.

use super::{EPSILON, GcodeWriter, LiftKind};
use crate::config::get_at;
use crate::format::LineBuilder;
use crate::point::{Point2, Point3};

impl GcodeWriter {
    /// Travel feed rate of the active extruder, mm/min
    fn travel_feedrate(&self) -> f64 {
        get_at(&self.config.travel_speed, self.active().extruder_id()) * 60.0
    }

    fn on_plate(&self, point: Point3) -> Point3 {
        let [dx, dy] = self.config.plate_offset;
        Point3::new(point.x - dx, point.y - dy, point.z)
    }

    /// Whether a travel to `z` needs a real Z move
    ///
    /// While lifted, any Z between the layer and the raised head is reached
    /// by lowering the remaining lift instead.
    pub fn will_move_z(&self, z: f64) -> bool {
        if self.lifted > 0.0 {
            let nominal_z = self.pos.z - self.lifted;
            if z >= nominal_z && z <= self.pos.z {
                return false;
            }
        } else if (self.pos.z - z).abs() < EPSILON {
            return false;
        }
        true
    }

    /// Absorb a travel to `z` into the current lift
    fn lower_lift_to(&mut self, z: f64) {
        let nominal_z = self.pos.z - self.lifted;
        self.lifted -= z - nominal_z;
        // z_hop equal to the layer height can leave a residue
        if self.lifted.abs() < EPSILON {
            self.lifted = 0.0;
        }
    }

    pub fn travel_to_xy(&mut self, point: Point2, comment: &str) -> String {
        self.pos.x = point.x;
        self.pos.y = point.y;
        self.position_known = true;

        let target = self.on_plate(self.pos).xy();
        let mut out = self.travel_acceleration();
        out.push_str(
            &LineBuilder::g1()
                .emit_xy(target)
                .emit_f(self.travel_feedrate())
                .emit_comment(self.dialect.comments(), comment)
                .finish(),
        );
        out
    }

    /// Travel in XY and Z, carrying out a pending lift on the way
    pub fn travel_to_xyz(&mut self, point: Point3, comment: &str) -> String {
        if self.to_lift.abs() > EPSILON {
            return self.lifting_travel(point, comment);
        }

        if !self.will_move_z(point.z) {
            self.lower_lift_to(point.z);
            return self.travel_to_xy(point.xy(), comment);
        }

        self.lifted = 0.0;
        let target = self.on_plate(point);
        let mut out = self.travel_acceleration();
        out.push_str(&self.xyz_travel_line(target, comment));
        self.pos = point;
        self.position_known = true;
        out
    }

    fn lifting_travel(&mut self, point: Point3, comment: &str) -> String {
        debug_assert!(self.lifted.abs() < EPSILON);

        let mut dest = point;
        // No lift when the head already sits at the destination
        if (!self.position_known || self.pos != point) && self.pos.z + self.to_lift > point.z {
            self.lifted = self.pos.z + self.to_lift - point.z;
            dest.z = self.pos.z + self.to_lift;
        }
        self.to_lift = 0.0;

        let source = self.on_plate(self.pos);
        let target = self.on_plate(dest);
        let delta = target - source;
        let delta_xy = delta.xy();

        let mut out = self.travel_acceleration();
        if delta.z > 0.0 && delta_xy.norm() != 0.0 {
            let threshold = self.config.slope_threshold;
            match self.to_lift_kind {
                LiftKind::Spiral if self.position_known => {
                    let radius = self.spiral_radius(delta.z);
                    let ij = (delta_xy.normalized() * radius).perpendicular();
                    out.push_str(&self.spiral_travel_to_z(target.z, ij, "spiral lift Z", false));
                }
                LiftKind::Slope
                    if self.position_known && delta.z.atan2(delta_xy.norm()) < threshold =>
                {
                    let run = delta_xy.normalized() * (delta.z / threshold.tan());
                    let top = (source.xy() + run).with_z(target.z);
                    out.push_str(
                        &LineBuilder::g1()
                            .emit_xyz(top)
                            .emit_f(self.travel_feedrate())
                            .emit_comment(self.dialect.comments(), "slope lift Z")
                            .finish(),
                    );
                }
                LiftKind::Normal => {
                    out.push_str(&self.raw_travel_to_z(target.z, "normal lift Z", false));
                }
                // Too steep for a slope, or no position to orbit: the XYZ move climbs
                _ => {}
            }
        }

        out.push_str(&self.xyz_travel_line(target, comment));
        self.pos = dest;
        self.position_known = true;
        out
    }

    /// One XYZ travel, split into XY then Z while the position is unknown
    fn xyz_travel_line(&mut self, target: Point3, comment: &str) -> String {
        let comments = self.dialect.comments();
        let feedrate = self.travel_feedrate();
        if self.position_known {
            LineBuilder::g1()
                .emit_xyz(target)
                .emit_f(feedrate)
                .emit_comment(comments, comment)
                .finish()
        } else {
            let mut out = LineBuilder::g1()
                .emit_xy(target.xy())
                .emit_f(feedrate)
                .emit_comment(comments, comment)
                .finish();
            out.push_str(&self.raw_travel_to_z(target.z, comment, false));
            out
        }
    }

    /// Vertical travel
    ///
    /// A pending lift is folded into a real Z move: the head goes to
    /// whichever is higher of `z` and the lifted height, and the excess is
    /// kept as the current lift. Without a Z change the lift stays pending.
    pub fn travel_to_z(&mut self, z: f64, comment: &str) -> String {
        if !self.will_move_z(z) {
            self.lower_lift_to(z);
            return String::new();
        }

        if self.to_lift.abs() > EPSILON {
            let dest = z.max(self.pos.z + self.to_lift);
            log::debug!(
                "Pending lift of {:.3} folded into Z move to {:.3}",
                self.to_lift,
                dest
            );
            self.lifted = if dest - z < EPSILON { 0.0 } else { dest - z };
            self.to_lift = 0.0;
            return self.raw_travel_to_z(dest, comment, false);
        }

        self.lifted = 0.0;
        self.raw_travel_to_z(z, comment, false)
    }

    /// Linear extrusion in the XY plane
    pub fn extrude_to_xy(
        &mut self,
        point: Point2,
        de: f64,
        comment: &str,
        force_no_extrusion: bool,
    ) -> String {
        self.pos.x = point.x;
        self.pos.y = point.y;
        self.position_known = true;

        let e = self.feed(de, force_no_extrusion);
        let target = self.on_plate(self.pos).xy();
        let mut line = LineBuilder::g1();
        line.emit_xy(target);
        if let Some(e) = e {
            line.emit_e(e);
        }
        line.emit_comment(self.dialect.comments(), comment);

        let mut out = self.extrude_acceleration();
        out.push_str(&line.finish());
        out
    }

    /// Arc extrusion; `center_offset` is relative to the start point
    pub fn extrude_arc_to_xy(
        &mut self,
        point: Point2,
        center_offset: Point2,
        de: f64,
        ccw: bool,
        comment: &str,
        force_no_extrusion: bool,
    ) -> String {
        self.pos.x = point.x;
        self.pos.y = point.y;
        self.position_known = true;

        let e = self.feed(de, force_no_extrusion);
        let target = self.on_plate(self.pos).xy();
        let mut line = LineBuilder::arc(ccw);
        line.emit_xy(target).emit_ij(center_offset);
        if let Some(e) = e {
            line.emit_e(e);
        }
        line.emit_comment(self.dialect.comments(), comment);

        let mut out = self.extrude_acceleration();
        out.push_str(&line.finish());
        out
    }

    /// Linear extrusion in space; cancels any lift
    pub fn extrude_to_xyz(
        &mut self,
        point: Point3,
        de: f64,
        comment: &str,
        force_no_extrusion: bool,
    ) -> String {
        self.pos = point;
        self.position_known = true;
        self.lifted = 0.0;
        self.to_lift = 0.0;

        let e = self.feed(de, force_no_extrusion);
        let target = self.on_plate(point);
        let mut line = LineBuilder::g1();
        line.emit_xyz(target);
        if let Some(e) = e {
            line.emit_e(e);
        }
        line.emit_comment(self.dialect.comments(), comment);

        let mut out = self.extrude_acceleration();
        out.push_str(&line.finish());
        out
    }

    /// Apply `de` to the active filament, returning the E value to write
    fn feed(&mut self, de: f64, force_no_extrusion: bool) -> Option<f64> {
        if force_no_extrusion {
            return None;
        }
        let filament = self.active_mut();
        filament.extrude(de);
        Some(filament.e())
    }
}
