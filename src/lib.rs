//! G-code writer
//!
//! A stateful emitter that turns motion, extrusion, temperature and tool
//! requests into firmware-specific G-code, tracking just enough machine state
//! to write minimal deltas.
//!
//! This library provides:
//! - Fixed-point axis formatting
//! - Firmware flavor dispatch
//! - The writer with its Z-lift state machine and retraction handling
//! - A parser to read emitted lines back
//! - Printer configuration and job scripts for the `gcodegen` binary

pub mod cli;
pub mod config;
pub mod extruder;
pub mod flavor;
pub mod format;
pub mod parser;
pub mod point;
pub mod script;
pub mod writer;

pub use config::{Config, PrinterConfig};
pub use extruder::Extruder;
pub use flavor::{Dialect, GcodeFlavor};
pub use format::{LineBuilder, format_axis, format_general};
pub use parser::{ParsedLine, Replay, parse_line};
pub use point::{Point2, Point3};
pub use script::{Request, parse_script};
pub use writer::{GcodeWriter, LiftKind, LiftStatus};
