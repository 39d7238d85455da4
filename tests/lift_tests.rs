//! Z-lift state machine scenarios, checked against the replayed stream
use gcode_writer::parser::Replay;
use gcode_writer::{GcodeWriter, LiftKind, LiftStatus, Point2, Point3, PrinterConfig};

fn writer_at(pos: Point3, config: PrinterConfig) -> GcodeWriter {
    let mut w = GcodeWriter::new(config);
    w.set_extruders([0]);
    w.init_extruder(0);
    w.set_position(pos);
    w
}

fn hop(z_hop: f64) -> PrinterConfig {
    PrinterConfig {
        z_hop: vec![z_hop],
        ..PrinterConfig::default()
    }
}

#[test]
fn test_lowering_inside_lift_window_emits_no_z() {
    // Layer at 0.2, head lifted by 0.4
    let mut w = writer_at(Point3::new(0.0, 0.0, 0.2), hop(0.4));
    w.eager_lift(LiftKind::Normal, false);
    assert_eq!(w.lift_status(), LiftStatus::Lifted);

    let out = w.travel_to_xyz(Point3::new(15.0, 5.0, 0.3), "");
    assert!(!out.contains('Z'), "unexpected Z move in {out:?}");
    assert!((w.lifted() - 0.3).abs() < 1e-9);
}

#[test]
fn test_lazy_lift_round_trip_restores_z() {
    let mut w = writer_at(Point3::new(0.0, 0.0, 0.2), hop(0.4));
    let mut gcode = String::new();
    gcode.push_str(&w.lazy_lift(LiftKind::Normal, false, false));
    assert!(gcode.is_empty());
    gcode.push_str(&w.travel_to_xyz(Point3::new(40.0, 40.0, 0.2), ""));
    assert!(w.lifted() > 0.0);
    gcode.push_str(&w.unlift());

    assert_eq!(w.lifted(), 0.0);
    assert_eq!(w.lift_status(), LiftStatus::Grounded);
    assert!((w.position().z - 0.2).abs() < 1e-9);

    let replay = Replay::run(&gcode);
    assert!((replay.z - 0.2).abs() < 1e-9);
    assert_eq!((replay.x, replay.y), (40.0, 40.0));
}

#[test]
fn test_lifted_and_pending_never_both_set() {
    let mut w = writer_at(Point3::new(0.0, 0.0, 0.2), hop(0.4));
    let check = |w: &GcodeWriter| assert!(w.lifted() == 0.0 || w.pending_lift() == 0.0);

    w.lazy_lift(LiftKind::Slope, false, false);
    check(&w);
    w.travel_to_xyz(Point3::new(50.0, 0.0, 0.2), "");
    check(&w);
    w.lazy_lift(LiftKind::Spiral, false, false);
    check(&w);
    w.eager_lift(LiftKind::Spiral, false);
    check(&w);
    w.travel_to_z(0.4, "");
    check(&w);
    w.lazy_lift(LiftKind::Normal, false, false);
    check(&w);
    w.travel_to_z(0.6, "");
    check(&w);
    w.unlift();
    check(&w);
}

#[test]
fn test_slope_lift_stays_on_travel_line() {
    let mut w = writer_at(Point3::new(10.0, 10.0, 1.0), hop(0.5));
    w.lazy_lift(LiftKind::Slope, false, false);
    let out = w.travel_to_xyz(Point3::new(110.0, 10.0, 1.0), "");
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);

    let replay = Replay::run(lines[0]);
    assert!(replay.x > 10.0 && replay.x < 110.0);
    assert_eq!(replay.y, 10.0);
    assert!((replay.z - 1.5).abs() < 1e-9);
}

#[test]
fn test_spiral_lift_needs_known_position() {
    let mut w = writer_at(Point3::new(0.0, 0.0, 0.2), hop(0.4));
    w.set_position_known(false);
    w.lazy_lift(LiftKind::Spiral, false, false);
    let out = w.travel_to_xyz(Point3::new(10.0, 0.0, 0.2), "");
    assert!(!out.contains("G17"));
    // Unknown position: XY first, then Z
    assert_eq!(out, "G1 X10 Y0 F9000\nG1 Z.6 F9000\n");
}

#[test]
fn test_spiral_lift_without_xy_displacement_is_plain() {
    let mut w = writer_at(Point3::new(5.0, 5.0, 0.2), hop(0.4));
    w.lazy_lift(LiftKind::Spiral, false, false);
    let out = w.travel_to_xyz(Point3::new(5.0, 5.0, 1.0), "");
    assert!(!out.contains("G3"));
    assert_eq!(w.lift_status(), LiftStatus::Grounded);
}

#[test]
fn test_spiral_vase_lifts_immediately() {
    let mut w = writer_at(Point3::new(0.0, 0.0, 3.0), hop(0.2));
    let out = w.lazy_lift(LiftKind::Normal, true, false);
    assert_eq!(out, "G1 Z3.2 F9000\n");
    assert_eq!(w.unlift(), "G1 Z3 F9000\n");
}

#[test]
fn test_timelapse_sequence() {
    // eager lift, park, come back, drop
    let mut w = writer_at(Point3::new(20.0, 20.0, 0.4), hop(0.4));
    let mut gcode = w.eager_lift(LiftKind::Spiral, false);
    gcode.push_str(&w.travel_to_xy(Point2::new(200.0, 200.0), "park"));
    gcode.push_str(&w.travel_to_xy(Point2::new(20.0, 20.0), ""));
    gcode.push_str(&w.unlift());

    let replay = Replay::run(&gcode);
    assert_eq!(replay.arcs, 1);
    assert!((replay.z - 0.4).abs() < 1e-9);
    assert_eq!((replay.x, replay.y), (20.0, 20.0));
}

#[test]
fn test_lift_window_upper_bound() {
    let config = PrinterConfig {
        retract_lift_below: vec![10.0],
        ..hop(0.4)
    };
    let mut w = writer_at(Point3::new(0.0, 0.0, 12.0), config);
    assert_eq!(w.eager_lift(LiftKind::Normal, false), "");
    assert_eq!(w.lift_status(), LiftStatus::Grounded);
}
