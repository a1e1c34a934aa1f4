//! Reader and writer for the line-oriented path files fed to the simulator.
//!
//! Motion lines look like `N12 G01X-10.000Y05.500Z20.000`; omitted axes keep
//! their previous value. The file extension names the cutter (`k16`, `f10`).

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::ParseError;
use crate::math::Point3;

use super::Cutter;

/// Motion type of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// `G00`
    Rapid,
    /// `G01`
    Linear,
}

/// One parsed move.
#[derive(Debug, Clone, PartialEq)]
pub struct MillingCommand {
    /// 1-based line in the source text.
    pub line_number: usize,
    /// The `N` number.
    pub command_number: u32,
    /// Target position with omitted axes filled in.
    pub coordinates: Point3,
    pub kind: MoveKind,
}

#[allow(clippy::expect_used)]
fn motion_regex() -> &'static Regex {
    static MOTION: OnceLock<Regex> = OnceLock::new();
    MOTION.get_or_init(|| {
        Regex::new(
            r"^N(\d+)\s*G0?([01])\s*(?:X\s*([-+]?[\d.]+))?\s*(?:Y\s*([-+]?[\d.]+))?\s*(?:Z\s*([-+]?[\d.]+))?\s*$",
        )
        .expect("invalid motion pattern")
    })
}

#[allow(clippy::expect_used)]
fn setup_regex() -> &'static Regex {
    static SETUP: OnceLock<Regex> = OnceLock::new();
    SETUP.get_or_init(|| {
        Regex::new(r"^N\d+(?:\s*[GMSFT]\d+(?:\.\d+)?)+\s*$").expect("invalid setup pattern")
    })
}

fn number(line: usize, text: &str) -> Result<f64, ParseError> {
    text.parse().map_err(|_| ParseError::InvalidNumber {
        line,
        value: text.to_owned(),
    })
}

/// Parses a path program. Coordinates start at `start`.
///
/// Blank lines, `%` markers and setup lines without motion (`N1G40G90`,
/// `N2S10000M03`) are skipped.
///
/// # Errors
///
/// Returns [`ParseError::Malformed`] with the 1-based line number for any
/// other line that is not a `G00`/`G01` move.
pub fn parse_program(text: &str, start: Point3) -> Result<Vec<MillingCommand>, ParseError> {
    let mut position = start;
    let mut commands = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let Some(caps) = motion_regex().captures(line) else {
            if setup_regex().is_match(line) {
                debug!(line_number, line, "skipping setup line");
                continue;
            }
            return Err(ParseError::Malformed {
                line: line_number,
                content: line.to_owned(),
            });
        };
        let command_number: u32 = caps[1].parse().map_err(|_| ParseError::InvalidNumber {
            line: line_number,
            value: caps[1].to_owned(),
        })?;
        let kind = if &caps[2] == "0" {
            MoveKind::Rapid
        } else {
            MoveKind::Linear
        };
        if let Some(x) = caps.get(3) {
            position.x = number(line_number, x.as_str())?;
        }
        if let Some(y) = caps.get(4) {
            position.y = number(line_number, y.as_str())?;
        }
        if let Some(z) = caps.get(5) {
            position.z = number(line_number, z.as_str())?;
        }
        commands.push(MillingCommand {
            line_number,
            command_number,
            coordinates: position,
            kind,
        });
    }
    debug!(commands = commands.len(), "path program parsed");
    Ok(commands)
}

/// Reads a path file and the cutter named by its extension.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the extension is not a
/// cutter designation or a line is malformed.
pub fn read_program(
    path: impl AsRef<Path>,
    start: Point3,
) -> Result<(Cutter, Vec<MillingCommand>), ParseError> {
    let path = path.as_ref();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let cutter = Cutter::from_extension(ext)?;
    let text = std::fs::read_to_string(path)?;
    Ok((cutter, parse_program(&text, start)?))
}

/// Formats a coordinate with two integer digits and three decimals.
#[must_use]
pub fn format_coordinate(v: f64) -> String {
    let rounded = (v * 1000.0).round() / 1000.0;
    if rounded < 0.0 {
        format!("-{:06.3}", -rounded)
    } else {
        format!("{:06.3}", rounded.abs())
    }
}

/// Writes a toolpath as `G01` moves numbered from 1.
#[must_use]
pub fn write_program(points: &[Point3]) -> String {
    let mut out = String::with_capacity(points.len() * 32);
    for (k, p) in points.iter().enumerate() {
        out.push_str(&format!(
            "N{} G01X{}Y{}Z{}\n",
            k + 1,
            format_coordinate(p.x),
            format_coordinate(p.y),
            format_coordinate(p.z)
        ));
    }
    out
}
