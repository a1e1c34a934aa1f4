use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Shape of the cutter's tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CutterKind {
    /// Ball end mill.
    Spherical,
    /// Flat end mill.
    Cylindrical,
}

/// Geometry of the milling tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cutter {
    pub kind: CutterKind,
    pub radius: f64,
    /// Length of the cutting part, measured up from the tip.
    pub cutting_height: f64,
    pub total_length: f64,
    /// Commanded positions address the ball centre instead of the tip.
    pub center_referenced: bool,
    /// Steepest descent, in degrees from the horizontal, allowed for a flat
    /// cutter moving through material.
    pub max_deviation_angle: f64,
}

impl Cutter {
    /// A cutter of the given kind and radius with default lengths.
    #[must_use]
    pub fn new(kind: CutterKind, radius: f64) -> Self {
        Self {
            kind,
            radius,
            cutting_height: 4.0 * radius,
            total_length: 10.0 * radius,
            center_referenced: false,
            max_deviation_angle: 45.0,
        }
    }

    /// Decodes a path file extension such as `k16` (ball, diameter 16) or
    /// `f10` (flat, diameter 10).
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnknownCutter`] for anything else.
    pub fn from_extension(ext: &str) -> Result<Self, ParseError> {
        let unknown = || ParseError::UnknownCutter(ext.to_owned());
        let lower = ext.trim().to_ascii_lowercase();
        let mut chars = lower.chars();
        let kind = match chars.next() {
            Some('k') => CutterKind::Spherical,
            Some('f') => CutterKind::Cylindrical,
            _ => return Err(unknown()),
        };
        let diameter: u32 = chars.as_str().parse().map_err(|_| unknown())?;
        if diameter == 0 {
            return Err(unknown());
        }
        Ok(Self::new(kind, f64::from(diameter) * 0.5))
    }

    /// Height of the lowest cutter point at horizontal distance `d` from the
    /// axis, for a tip at height `tip`. `None` outside the radius.
    #[must_use]
    pub fn bottom_at(&self, tip: f64, d: f64) -> Option<f64> {
        if d > self.radius {
            return None;
        }
        match self.kind {
            CutterKind::Cylindrical => Some(tip),
            CutterKind::Spherical => {
                let r = self.radius;
                Some(tip + r - (r * r - d * d).max(0.0).sqrt())
            }
        }
    }

    /// Tip height for a commanded height `z`.
    #[must_use]
    pub fn tip_height(&self, z: f64) -> f64 {
        if self.center_referenced && self.kind == CutterKind::Spherical {
            z - self.radius
        } else {
            z
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decodes_extensions() {
        let k = Cutter::from_extension("k16").unwrap();
        assert_eq!(k.kind, CutterKind::Spherical);
        assert!((k.radius - 8.0).abs() < 1e-12);
        let f = Cutter::from_extension("F10").unwrap();
        assert_eq!(f.kind, CutterKind::Cylindrical);
        assert!((f.radius - 5.0).abs() < 1e-12);
        assert!(Cutter::from_extension("x10").is_err());
        assert!(Cutter::from_extension("k").is_err());
        assert!(Cutter::from_extension("k0").is_err());
    }

    #[test]
    fn ball_profile() {
        let k = Cutter::new(CutterKind::Spherical, 2.0);
        assert!((k.bottom_at(1.0, 0.0).unwrap() - 1.0).abs() < 1e-12);
        assert!((k.bottom_at(1.0, 2.0).unwrap() - 3.0).abs() < 1e-12);
        assert!(k.bottom_at(1.0, 2.1).is_none());
        let f = Cutter::new(CutterKind::Cylindrical, 2.0);
        assert!((f.bottom_at(1.0, 1.9).unwrap() - 1.0).abs() < 1e-12);
    }
}
