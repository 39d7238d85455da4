//! Number and line formatting for emitted G-code.
//!
//! Axis values are written as fixed-point decimals: the value is scaled by
//! `10^digits`, rounded half away from zero, and printed with trailing zeros
//! (and a trailing point) removed. A zero integer part is omitted, so `0.5`
//! becomes `X.5` and `-0.05` becomes `X-.05`. Nothing here depends on the
//! process locale.

use crate::point::{Point2, Point3};

/// Decimal digits used for X, Y, Z, I, J and F
pub const XYZF_DIGITS: usize = 3;
/// Decimal digits used for E
pub const E_DIGITS: usize = 5;

const POW_10: [f64; 10] = [1.0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9];

/// Append `" <axis><value>"` to `out`
///
/// # Panics
///
/// Panics if `digits` is greater than 9.
pub fn write_axis(out: &mut String, axis: char, value: f64, digits: usize) {
    assert!(digits <= 9, "at most 9 decimal digits supported, got {digits}");

    out.push(' ');
    out.push(axis);

    let scaled = (value * POW_10[digits]).round() as i64;
    let magnitude = scaled.unsigned_abs().to_string();

    let (int_part, frac_part) = if magnitude.len() > digits {
        magnitude.split_at(magnitude.len() - digits)
    } else {
        ("", magnitude.as_str())
    };
    // Digits below 10^digits need left padding before trimming
    let padding = digits - frac_part.len();
    let frac_trimmed = frac_part.trim_end_matches('0');

    if int_part.is_empty() && frac_trimmed.is_empty() {
        out.push('0');
        return;
    }

    if scaled < 0 {
        out.push('-');
    }
    out.push_str(int_part);
    if !frac_trimmed.is_empty() {
        out.push('.');
        out.extend(std::iter::repeat_n('0', padding));
        out.push_str(frac_trimmed);
    }
}

/// Format a single axis value, including the leading space
pub fn format_axis(value: f64, axis: char, digits: usize) -> String {
    let mut out = String::with_capacity(16);
    write_axis(&mut out, axis, value, digits);
    out
}

/// Shortest general-purpose rendering, equivalent to C's `%.<precision>g`
///
/// Used for the few fields firmware expects in "natural" form: fan duty,
/// jerk, accel-to-decel and pressure advance.
pub fn format_general(value: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Builder for a single motion line (`G1`, `G2` or `G3`)
#[derive(Debug, Clone)]
pub struct LineBuilder {
    buf: String,
}

impl LineBuilder {
    /// Linear move
    pub fn g1() -> Self {
        Self::with_code("G1")
    }

    /// Arc move, `G3` when counter-clockwise, `G2` otherwise
    pub fn arc(ccw: bool) -> Self {
        Self::with_code(if ccw { "G3" } else { "G2" })
    }

    fn with_code(code: &str) -> Self {
        let mut buf = String::with_capacity(64);
        buf.push_str(code);
        Self { buf }
    }

    pub fn emit_xy(&mut self, point: Point2) -> &mut Self {
        write_axis(&mut self.buf, 'X', point.x, XYZF_DIGITS);
        write_axis(&mut self.buf, 'Y', point.y, XYZF_DIGITS);
        self
    }

    pub fn emit_xyz(&mut self, point: Point3) -> &mut Self {
        self.emit_xy(point.xy());
        self.emit_z(point.z)
    }

    pub fn emit_z(&mut self, z: f64) -> &mut Self {
        write_axis(&mut self.buf, 'Z', z, XYZF_DIGITS);
        self
    }

    /// Arc center offset relative to the start point
    pub fn emit_ij(&mut self, offset: Point2) -> &mut Self {
        write_axis(&mut self.buf, 'I', offset.x, XYZF_DIGITS);
        write_axis(&mut self.buf, 'J', offset.y, XYZF_DIGITS);
        self
    }

    pub fn emit_e(&mut self, e: f64) -> &mut Self {
        write_axis(&mut self.buf, 'E', e, E_DIGITS);
        self
    }

    /// Feed rate in mm/min
    pub fn emit_f(&mut self, feedrate: f64) -> &mut Self {
        write_axis(&mut self.buf, 'F', feedrate, XYZF_DIGITS);
        self
    }

    /// Raw text, appended verbatim
    pub fn emit_str(&mut self, text: &str) -> &mut Self {
        self.buf.push_str(text);
        self
    }

    pub fn emit_comment(&mut self, enabled: bool, comment: &str) -> &mut Self {
        if enabled && !comment.is_empty() {
            self.buf.push_str(" ; ");
            self.buf.push_str(comment);
        }
        self
    }

    /// Terminate the line
    pub fn finish(&mut self) -> String {
        let mut line = std::mem::take(&mut self.buf);
        line.push('\n');
        line
    }
}
