//! Z-lift state machine.
//!
//! A lift is either recorded (`to_lift`, emitted on the next XYZ travel) or
//! already physical (`lifted`). The two are never nonzero at the same time.

use super::{EPSILON, GcodeWriter, LiftKind};
use crate::config::get_at;
use crate::format::LineBuilder;
use crate::point::Point2;

impl GcodeWriter {
    /// Height to lift by at the current Z, 0 outside the lift window
    fn lift_target(&self, tool_change: bool) -> f64 {
        let filament = self.active();
        let above = get_at(&self.config.retract_lift_above, filament.extruder_id());
        let below = get_at(&self.config.retract_lift_below, filament.extruder_id());
        let z = self.pos.z;

        if z < above || (below > 0.0 && z > below) {
            return 0.0;
        }
        if tool_change && self.config.prime_tower_lift_height > 0.0 {
            self.config.prime_tower_lift_height
        } else {
            filament.z_hop()
        }
    }

    /// Helix radius that climbs `dz` in one turn
    ///
    /// The divisor uses `atan` of the slope threshold, not `tan`. For small
    /// thresholds the two agree to within a fraction of a percent.
    pub(super) fn spiral_radius(&self, dz: f64) -> f64 {
        dz / (2.0 * std::f64::consts::PI * self.config.slope_threshold.atan())
    }

    /// Record a lift to be performed by the next XYZ travel
    ///
    /// Does nothing while a lift is pending or in effect. In spiral vase mode
    /// the head is raised immediately.
    pub fn lazy_lift(&mut self, kind: LiftKind, spiral_vase: bool, tool_change: bool) -> String {
        let target = self.lift_target(tool_change);
        if self.lifted != 0.0 || self.to_lift != 0.0 || target <= 0.0 {
            return String::new();
        }

        if spiral_vase {
            self.lifted = target;
            let z = self.pos.z + target;
            return self.raw_travel_to_z(z, "lift Z", tool_change);
        }
        self.to_lift = target;
        self.to_lift_kind = kind;
        String::new()
    }

    /// Raise the head now, topping up any lift already in effect
    ///
    /// A spiral lift climbs on a helix centred one radius along +X; it needs
    /// a known position and otherwise falls back to a vertical move.
    pub fn eager_lift(&mut self, kind: LiftKind, tool_change: bool) -> String {
        let target = self.lift_target(tool_change);
        let to_lift = target - self.lifted;
        if to_lift < EPSILON {
            return String::new();
        }

        let z = self.pos.z + to_lift;
        let out = if kind == LiftKind::Spiral && self.position_known {
            let ij = Point2::new(self.spiral_radius(to_lift), 0.0);
            self.spiral_travel_to_z(z, ij, "spiral lift Z", tool_change)
        } else {
            self.raw_travel_to_z(z, "normal lift Z", tool_change)
        };

        if self.to_lift > 0.0 {
            log::debug!("Eager lift replaced a pending lift of {:.3}", self.to_lift);
        }
        self.lifted = target;
        self.to_lift = 0.0;
        out
    }

    /// Lower the head back to the layer and drop any pending lift
    pub fn unlift(&mut self) -> String {
        let mut out = String::new();
        if self.lifted > 0.0 {
            let z = self.pos.z - self.lifted;
            out = self.raw_travel_to_z(z, "restore layer Z", false);
            self.lifted = 0.0;
        }
        self.to_lift = 0.0;
        out
    }

    /// Z feed rate in mm/s
    fn z_speed(&self, tool_change: bool) -> f64 {
        if tool_change && self.config.prime_tower_lift_speed > 0.0 {
            return self.config.prime_tower_lift_speed;
        }
        let extruder_id = self.active().extruder_id();
        let speed = get_at(&self.config.travel_speed_z, extruder_id);
        if speed == 0.0 {
            get_at(&self.config.travel_speed, extruder_id)
        } else {
            speed
        }
    }

    /// Vertical move, no lift bookkeeping
    pub(super) fn raw_travel_to_z(&mut self, z: f64, comment: &str, tool_change: bool) -> String {
        self.pos.z = z;
        let speed = self.z_speed(tool_change);
        let mut out = self.travel_acceleration();
        out.push_str(
            &LineBuilder::g1()
                .emit_z(z)
                .emit_f(speed * 60.0)
                .emit_comment(self.dialect.comments(), comment)
                .finish(),
        );
        out
    }

    /// Full-turn counter-clockwise helix ending at `z`, no lift bookkeeping
    pub(super) fn spiral_travel_to_z(
        &mut self,
        z: f64,
        ij: Point2,
        comment: &str,
        tool_change: bool,
    ) -> String {
        self.pos.z = z;
        let speed = self.z_speed(tool_change);
        let mut out = self.travel_acceleration();
        out.push_str("G17\n");
        out.push_str(
            &LineBuilder::arc(true)
                .emit_z(z)
                .emit_ij(ij)
                .emit_str(" P1")
                .emit_f(speed * 60.0)
                .emit_comment(self.dialect.comments(), comment)
                .finish(),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::config::PrinterConfig;
    use crate::point::Point3;
    use crate::writer::{GcodeWriter, LiftKind, LiftStatus};

    fn writer_at(z: f64, config: PrinterConfig) -> GcodeWriter {
        let mut w = GcodeWriter::new(config);
        w.set_extruders([0]);
        w.init_extruder(0);
        w.set_position(Point3::new(10.0, 10.0, z));
        w
    }

    fn default_writer_at(z: f64) -> GcodeWriter {
        writer_at(z, PrinterConfig::default())
    }

    #[test]
    fn test_lazy_lift_is_deferred() {
        let mut w = default_writer_at(0.2);
        assert_eq!(w.lazy_lift(LiftKind::Normal, false, false), "");
        assert_eq!(w.lift_status(), LiftStatus::LiftPending);
        assert!((w.pending_lift() - 0.4).abs() < 1e-12);
        assert_eq!(w.lifted(), 0.0);
    }

    #[test]
    fn test_lazy_lift_twice_keeps_first() {
        let mut w = default_writer_at(0.2);
        w.lazy_lift(LiftKind::Slope, false, false);
        w.lazy_lift(LiftKind::Spiral, false, false);
        assert_eq!(w.to_lift_kind, LiftKind::Slope);
    }

    #[test]
    fn test_lazy_lift_spiral_vase_is_immediate() {
        let mut w = default_writer_at(0.2);
        assert_eq!(w.lazy_lift(LiftKind::Normal, true, false), "G1 Z.6 F9000\n");
        assert_eq!(w.lift_status(), LiftStatus::Lifted);
        assert!((w.position().z - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_lazy_lift_respects_window() {
        let config = PrinterConfig {
            retract_lift_above: vec![1.0],
            retract_lift_below: vec![5.0],
            ..PrinterConfig::default()
        };
        let mut low = writer_at(0.5, config.clone());
        assert_eq!(low.lazy_lift(LiftKind::Normal, false, false), "");
        assert_eq!(low.lift_status(), LiftStatus::Grounded);

        let mut high = writer_at(6.0, config.clone());
        high.lazy_lift(LiftKind::Normal, false, false);
        assert_eq!(high.lift_status(), LiftStatus::Grounded);

        let mut inside = writer_at(2.0, config);
        inside.lazy_lift(LiftKind::Normal, false, false);
        assert_eq!(inside.lift_status(), LiftStatus::LiftPending);
    }

    #[test]
    fn test_toolchange_lift_uses_prime_tower_settings() {
        let config = PrinterConfig {
            prime_tower_lift_height: 1.5,
            prime_tower_lift_speed: 10.0,
            ..PrinterConfig::default()
        };
        let mut w = writer_at(0.2, config);
        assert_eq!(w.eager_lift(LiftKind::Normal, true), "G1 Z1.7 F600\n");
        assert!((w.lifted() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_eager_lift_spiral_centred_on_x() {
        let mut w = default_writer_at(0.2);
        let out = w.eager_lift(LiftKind::Spiral, false);
        let radius = 0.4 / (2.0 * std::f64::consts::PI * 3.0_f64.to_radians().atan());
        let expected = format!(
            "G17\nG3 Z.6{} J0 P1 F9000\n",
            crate::format::format_axis(radius, 'I', 3)
        );
        assert_eq!(out, expected);
        assert_eq!(w.lift_status(), LiftStatus::Lifted);
    }

    #[test]
    fn test_eager_lift_spiral_unknown_position_is_vertical() {
        let mut w = default_writer_at(0.2);
        w.set_position_known(false);
        assert_eq!(w.eager_lift(LiftKind::Spiral, false), "G1 Z.6 F9000\n");
    }

    #[test]
    fn test_eager_lift_tops_up() {
        let mut w = default_writer_at(0.2);
        w.eager_lift(LiftKind::Normal, false);
        // Already at the target height
        assert_eq!(w.eager_lift(LiftKind::Normal, false), "");
    }

    #[test]
    fn test_eager_lift_clears_pending() {
        let mut w = default_writer_at(0.2);
        w.lazy_lift(LiftKind::Normal, false, false);
        assert_eq!(w.eager_lift(LiftKind::Normal, false), "G1 Z.6 F9000\n");
        assert_eq!(w.pending_lift(), 0.0);
        assert_eq!(w.lift_status(), LiftStatus::Lifted);
    }

    #[test]
    fn test_unlift() {
        let mut w = default_writer_at(0.2);
        w.eager_lift(LiftKind::Normal, false);
        assert_eq!(w.unlift(), "G1 Z.2 F9000\n");
        assert_eq!(w.lift_status(), LiftStatus::Grounded);
        assert_eq!(w.unlift(), "");
    }

    #[test]
    fn test_unlift_drops_pending() {
        let mut w = default_writer_at(0.2);
        w.lazy_lift(LiftKind::Normal, false, false);
        assert_eq!(w.unlift(), "");
        assert_eq!(w.lift_status(), LiftStatus::Grounded);
    }

    #[test]
    fn test_z_speed_prefers_travel_speed_z() {
        let config = PrinterConfig {
            travel_speed_z: vec![12.0],
            ..PrinterConfig::default()
        };
        let mut w = writer_at(0.2, config);
        assert_eq!(w.eager_lift(LiftKind::Normal, false), "G1 Z.6 F720\n");
    }
}
