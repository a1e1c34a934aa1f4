use serde::{Deserialize, Serialize};

use crate::math::{Point2, Point3, Vector2};
use crate::operations::contour::Rect;

/// The block of material being milled.
///
/// Occupies `[center_x ± size_x / 2] x [center_y ± size_y / 2] x [0, height]`
/// in the machine frame. The cutter may never go below `base_height`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stock {
    pub center_x: f64,
    pub center_y: f64,
    pub size_x: f64,
    pub size_y: f64,
    pub height: f64,
    pub base_height: f64,
    /// Clearance above the stock used for safe moves.
    pub safe_clearance: f64,
}

impl Default for Stock {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            size_x: 150.0,
            size_y: 150.0,
            height: 50.0,
            base_height: 15.0,
            safe_clearance: 16.0,
        }
    }
}

impl Stock {
    #[must_use]
    pub fn center(&self) -> Point2 {
        Point2::new(self.center_x, self.center_y)
    }

    #[must_use]
    pub fn half_extents(&self) -> Vector2 {
        Vector2::new(self.size_x * 0.5, self.size_y * 0.5)
    }

    /// The stock outline seen from above.
    #[must_use]
    pub fn footprint(&self) -> Rect {
        Rect::centered(self.center(), self.half_extents())
    }

    /// Height at which the cutter can travel freely.
    #[must_use]
    pub fn safe_height(&self) -> f64 {
        self.height + self.safe_clearance
    }

    /// Point above `p` at the safe height.
    #[must_use]
    pub fn above(&self, p: &Point3) -> Point3 {
        Point3::new(p.x, p.y, self.safe_height())
    }
}
