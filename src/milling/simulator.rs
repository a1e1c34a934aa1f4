use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MillingError;
use crate::math::{Point2, Point3};

use super::{Cutter, CutterKind, HeightField, Stock};

/// Settings of the milling simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MillingParams {
    /// Grid cells along X and Y.
    pub resolution: (usize, usize),
    /// Extra room around the stock, beyond the cutter radius, in which the
    /// cutter may move.
    pub safety_margin: f64,
    /// Sample spacing along a move, as a fraction of the smaller cell side.
    pub sample_fraction: f64,
}

impl Default for MillingParams {
    fn default() -> Self {
        Self {
            resolution: (300, 300),
            safety_margin: 10.0,
            sample_fraction: 0.5,
        }
    }
}

/// Height-field milling simulator.
///
/// Each [`Milling::mill`] call sweeps the cutter along one straight move and
/// lowers the cells it passes over. Heights only ever go down.
#[derive(Debug, Clone)]
pub struct Milling {
    field: HeightField,
    cutter: Cutter,
    stock: Stock,
    params: MillingParams,
}

impl Milling {
    /// A simulator over untouched `stock`.
    #[must_use]
    pub fn new(stock: Stock, cutter: Cutter, params: MillingParams) -> Self {
        let (nx, ny) = params.resolution;
        Self {
            field: HeightField::for_stock(&stock, nx, ny),
            cutter,
            stock,
            params,
        }
    }

    #[must_use]
    pub fn field(&self) -> &HeightField {
        &self.field
    }

    #[must_use]
    pub fn cutter(&self) -> &Cutter {
        &self.cutter
    }

    #[must_use]
    pub fn stock(&self) -> &Stock {
        &self.stock
    }

    /// Swaps the tool. The material is kept.
    pub fn set_cutter(&mut self, cutter: Cutter) {
        self.cutter = cutter;
    }

    /// Changes the grid resolution, restoring the full stock.
    pub fn set_resolution(&mut self, nx: usize, ny: usize) {
        self.params.resolution = (nx, ny);
        self.field.set_resolution(nx, ny);
    }

    /// Restores the full stock.
    pub fn reset(&mut self) {
        self.field.reset();
    }

    /// Checks that the cutter may be at `p`.
    ///
    /// # Errors
    ///
    /// [`MillingError::OutOfMargin`] when `p` leaves the stock grown by the
    /// cutter radius and safety margin (the boundary itself is allowed),
    /// [`MillingError::BelowBase`] when the tip goes under the base height.
    pub fn validate(&self, p: &Point3) -> Result<(), MillingError> {
        let half = self.stock.half_extents();
        let grow = self.cutter.radius + self.params.safety_margin;
        let limit_x = half.x + grow;
        let limit_y = half.y + grow;
        if (p.x - self.stock.center_x).abs() > limit_x || (p.y - self.stock.center_y).abs() > limit_y
        {
            return Err(MillingError::OutOfMargin {
                x: p.x,
                y: p.y,
                limit_x,
                limit_y,
            });
        }
        let tip = self.cutter.tip_height(p.z);
        if tip < self.stock.base_height {
            return Err(MillingError::BelowBase {
                z: tip,
                base: self.stock.base_height,
            });
        }
        Ok(())
    }

    /// Moves the cutter in a straight line from `curr` to `next`.
    ///
    /// Nothing is changed if the move is rejected.
    ///
    /// # Errors
    ///
    /// Besides the [`Milling::validate`] errors for `next`, returns
    /// [`MillingError::NonCuttingContact`] when material stands above the
    /// cutting part and [`MillingError::ExcessiveAngle`] when a flat cutter
    /// descends into material too steeply.
    pub fn mill(&mut self, curr: &Point3, next: &Point3) -> Result<(), MillingError> {
        self.validate(next)?;
        let lowered = self.sweep(curr, next)?;
        if !lowered.is_empty() && self.cutter.kind == CutterKind::Cylindrical {
            self.check_descent(curr, next)?;
        }
        for (k, h) in lowered {
            self.field.set_index(k, h);
        }
        Ok(())
    }

    fn check_descent(&self, curr: &Point3, next: &Point3) -> Result<(), MillingError> {
        let dz = next.z - curr.z;
        if dz >= 0.0 {
            return Ok(());
        }
        let horizontal = (next.x - curr.x).hypot(next.y - curr.y);
        let angle = (-dz).atan2(horizontal).to_degrees();
        if angle > self.cutter.max_deviation_angle {
            debug!(angle, "flat cutter plunge rejected");
            return Err(MillingError::ExcessiveAngle {
                angle_deg: angle,
                max_deg: self.cutter.max_deviation_angle,
            });
        }
        Ok(())
    }

    /// New heights of every cell the move lowers.
    fn sweep(&self, curr: &Point3, next: &Point3) -> Result<HashMap<usize, f64>, MillingError> {
        let cell = self.field.cell_size();
        let spacing = cell.x.min(cell.y) * self.params.sample_fraction;
        let length = (next - curr).norm();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let samples = ((length / spacing).ceil() as usize).max(1);
        let r = self.cutter.radius;
        let (nx, ny) = self.field.resolution();

        let mut lowered: HashMap<usize, f64> = HashMap::new();
        for s in 0..=samples {
            let p = curr + (next - curr) * (s as f64 / samples as f64);
            let tip = self.cutter.tip_height(p.z);
            let centre = Point2::new(p.x, p.y);
            let (ci, cj) = self.field.cell_coords(&centre);
            let reach_i = r / cell.x + 1.0;
            let reach_j = r / cell.y + 1.0;
            let i0 = to_index(ci - reach_i);
            let i1 = to_index(ci + reach_i).min(nx.saturating_sub(1));
            let j0 = to_index(cj - reach_j);
            let j1 = to_index(cj + reach_j).min(ny.saturating_sub(1));
            if ci + reach_i < 0.0 || cj + reach_j < 0.0 {
                continue;
            }
            for j in j0..=j1 {
                for i in i0..=i1 {
                    let d = (self.field.cell_center(i, j) - centre).norm();
                    let Some(bottom) = self.cutter.bottom_at(tip, d) else {
                        continue;
                    };
                    let Some(k) = self.field.index(i, j) else {
                        continue;
                    };
                    let old = lowered
                        .get(&k)
                        .copied()
                        .unwrap_or(self.field.heights()[k]);
                    if old <= bottom {
                        continue;
                    }
                    let limit = tip + self.cutter.cutting_height;
                    if old > limit {
                        let c = self.field.cell_center(i, j);
                        return Err(MillingError::NonCuttingContact {
                            x: c.x,
                            y: c.y,
                            height: old,
                            limit,
                        });
                    }
                    lowered.insert(k, bottom);
                }
            }
        }
        Ok(lowered)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_index(x: f64) -> usize {
    if x <= 0.0 {
        0
    } else {
        x.floor() as usize
    }
}
