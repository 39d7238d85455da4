use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gcode_writer::script::{parse_script, render};
use gcode_writer::{GcodeFlavor, GcodeWriter, LiftKind, Point2, Point3, PrinterConfig};
use std::hint::black_box;

fn writer(flavor: GcodeFlavor) -> GcodeWriter {
    let mut w = GcodeWriter::new(PrinterConfig {
        gcode_flavor: flavor,
        ..PrinterConfig::default()
    });
    w.set_extruders([0, 1]);
    w.init_extruder(0);
    w.set_position(Point3::new(0.0, 0.0, 0.2));
    w
}

/// One layer of concentric squares with a retracted, lifted travel between
fn print_layer(w: &mut GcodeWriter, loops: usize, kind: LiftKind) -> String {
    let mut out = String::new();
    for i in 0..loops {
        let offset = i as f64 * 0.45;
        let (lo, hi) = (10.0 + offset, 90.0 - offset);
        out.push_str(&w.travel_to_xy(Point2::new(lo, lo), ""));
        out.push_str(&w.unretract());
        for corner in [(hi, lo), (hi, hi), (lo, hi), (lo, lo)] {
            out.push_str(&w.extrude_to_xy(Point2::new(corner.0, corner.1), 2.6, "", false));
        }
        out.push_str(&w.retract(false));
        out.push_str(&w.lazy_lift(kind, false, false));
        out.push_str(&w.travel_to_xyz(Point3::new(50.0, 50.0, w.position().z), ""));
        out.push_str(&w.unlift());
    }
    out
}

fn bench_layers(c: &mut Criterion) {
    let mut group = c.benchmark_group("layer");

    for (name, kind) in [
        ("normal", LiftKind::Normal),
        ("slope", LiftKind::Slope),
        ("spiral", LiftKind::Spiral),
    ] {
        group.throughput(Throughput::Elements(50));
        group.bench_with_input(BenchmarkId::new("lift", name), &kind, |b, &kind| {
            b.iter(|| {
                let mut w = writer(GcodeFlavor::MarlinFirmware);
                black_box(print_layer(&mut w, 50, kind))
            })
        });
    }

    group.finish();
}

fn bench_flavors(c: &mut Criterion) {
    let mut group = c.benchmark_group("flavor");

    for flavor in [
        GcodeFlavor::MarlinLegacy,
        GcodeFlavor::Klipper,
        GcodeFlavor::RepRapFirmware,
        GcodeFlavor::Sailfish,
    ] {
        group.bench_with_input(
            BenchmarkId::new("layer", flavor.to_string()),
            &flavor,
            |b, &flavor| {
                b.iter(|| {
                    let mut w = writer(flavor);
                    black_box(print_layer(&mut w, 20, LiftKind::Normal))
                })
            },
        );
    }

    group.finish();
}

fn bench_toolchanges(c: &mut Criterion) {
    c.bench_function("toolchange_cycle", |b| {
        b.iter(|| {
            let mut w = writer(GcodeFlavor::MarlinFirmware);
            let mut out = String::new();
            for i in 0..100 {
                out.push_str(&w.retract_for_toolchange(false));
                out.push_str(&w.toolchange(i % 2));
                out.push_str(&w.unretract());
            }
            black_box(out)
        })
    });
}

fn generate_script(moves: usize) -> String {
    let mut requests = vec![
        r#"{"op": "extruders", "ids": [0]}"#.to_string(),
        r#"{"op": "init_extruder", "id": 0}"#.to_string(),
        r#"{"op": "preamble"}"#.to_string(),
        r#"{"op": "travel_to_xyz", "to": [0, 0, 0.2]}"#.to_string(),
    ];
    for i in 0..moves {
        let t = i as f64 * 0.05;
        requests.push(format!(
            r#"{{"op": "extrude_to_xy", "to": [{:.3}, {:.3}], "de": 0.042}}"#,
            50.0 + t.cos() * 40.0,
            50.0 + t.sin() * 40.0
        ));
    }
    format!("[{}]", requests.join(",\n"))
}

fn bench_script_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("script");

    for moves in [1_000usize, 10_000] {
        let text = generate_script(moves);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", moves), &text, |b, text| {
            b.iter(|| black_box(parse_script(black_box(text))))
        });

        let requests = parse_script(&text).expect("generated script parses");
        group.bench_with_input(BenchmarkId::new("render", moves), &requests, |b, requests| {
            b.iter(|| black_box(render(PrinterConfig::default(), black_box(requests))))
        });
    }

    group.finish();
}

criterion_group!(
    writer_benches,
    bench_layers,
    bench_flavors,
    bench_toolchanges,
    bench_script_render
);

criterion_main!(writer_benches);
