//! Printer configuration loading and command-line precedence
use clap::Parser;
use gcode_writer::config::{Args, Config, PrinterConfig};
use gcode_writer::{GcodeFlavor, GcodeWriter};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
fn test_load_printer_config_file() {
    let file = write_config(
        r#"
        gcode_flavor = "marlin2"
        use_relative_e_distances = true
        travel_speed = [200.0]
        z_hop = [0.3]
        plate_offset = [5.0, 5.0]
        "#,
    );
    let config = PrinterConfig::load(file.path()).expect("load config");
    assert_eq!(config.gcode_flavor, GcodeFlavor::MarlinFirmware);
    assert!(config.use_relative_e_distances);
    assert_eq!(config.z_hop, vec![0.3]);
    assert_eq!(config.plate_offset, [5.0, 5.0]);
}

#[test]
fn test_unknown_key_is_an_error() {
    let file = write_config("gcode_flavour = \"klipper\"\n");
    let err = PrinterConfig::load(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("gcode_flavour"));
}

#[test]
fn test_missing_file_reports_path() {
    let err = PrinterConfig::load(std::path::Path::new("/nonexistent/printer.toml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/printer.toml"));
}

#[test]
fn test_args_config_then_flavor_override() {
    let file = write_config("gcode_flavor = \"marlin\"\n");
    let args = Args::try_parse_from([
        "gcodegen",
        "job.json",
        "--config",
        file.path().to_str().expect("utf-8 path"),
        "--flavor",
        "klipper",
        "--comments",
    ])
    .expect("parse args");

    let config = Config::from_args(args).expect("build config");
    assert_eq!(config.printer.gcode_flavor, GcodeFlavor::Klipper);
    assert!(config.printer.gcode_comments);
    assert_eq!(config.log_level, "warn");
}

#[test]
fn test_preset_selection() {
    let args = Args::try_parse_from(["gcodegen", "job.json", "--preset", "voron-klipper"])
        .expect("parse args");
    let config = Config::from_args(args).expect("build config");
    assert_eq!(config.printer.gcode_flavor, GcodeFlavor::Klipper);
    assert_eq!(config.printer_source, "preset 'voron-klipper'");
}

#[test]
fn test_config_and_preset_conflict() {
    assert!(
        Args::try_parse_from([
            "gcodegen",
            "job.json",
            "--config",
            "a.toml",
            "--preset",
            "generic-marlin"
        ])
        .is_err()
    );
}

#[test]
fn test_bad_flavor_override() {
    let args = Args::try_parse_from(["gcodegen", "job.json", "--preset", "generic-marlin", "--flavor", "bogus"])
        .expect("parse args");
    let err = Config::from_args(args).unwrap_err();
    assert!(err.to_string().contains("unknown gcode flavor"));
}

#[test]
fn test_duet_preset_drives_writer() {
    let config = PrinterConfig::preset("duet-toolchanger").expect("preset");
    let mut w = GcodeWriter::new(config);
    w.set_extruders([0, 1, 2, 3]);
    assert_eq!(w.set_temperature(215, false, Some(2)), "G10 P2 S215\n");
    w.toolchange(2);
    assert_eq!(w.filament().map(|f| f.extruder_id()), Some(1));
}
