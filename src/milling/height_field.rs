use crate::math::{Point2, Vector2};

use super::Stock;

/// Summary of a height field against its initial stock height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightFieldStats {
    /// Volume below the initial height that is no longer material.
    pub removed_volume: f64,
    pub min_height: f64,
    pub max_height: f64,
}

/// Grid of material heights over a rectangular area.
///
/// Cell `(i, j)` covers
/// `[min.x + i * dx, min.x + (i + 1) * dx) x [min.y + j * dy, min.y + (j + 1) * dy)`
/// and is stored row-major (`j * nx + i`).
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    center: Point2,
    size: Vector2,
    nx: usize,
    ny: usize,
    initial: f64,
    heights: Vec<f64>,
}

impl HeightField {
    /// A field of `nx x ny` cells, all at `initial`.
    #[must_use]
    pub fn new(center: Point2, size: Vector2, nx: usize, ny: usize, initial: f64) -> Self {
        let nx = nx.max(1);
        let ny = ny.max(1);
        Self {
            center,
            size,
            nx,
            ny,
            initial,
            heights: vec![initial; nx * ny],
        }
    }

    /// A full-height field covering the stock.
    #[must_use]
    pub fn for_stock(stock: &Stock, nx: usize, ny: usize) -> Self {
        Self::new(
            stock.center(),
            Vector2::new(stock.size_x, stock.size_y),
            nx,
            ny,
            stock.height,
        )
    }

    /// Changes the grid resolution. All material is restored.
    pub fn set_resolution(&mut self, nx: usize, ny: usize) {
        self.nx = nx.max(1);
        self.ny = ny.max(1);
        self.reset();
    }

    /// Restores every cell to the initial height.
    pub fn reset(&mut self) {
        self.heights = vec![self.initial; self.nx * self.ny];
    }

    #[must_use]
    pub fn resolution(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    #[must_use]
    pub fn center(&self) -> Point2 {
        self.center
    }

    #[must_use]
    pub fn size(&self) -> Vector2 {
        self.size
    }

    #[must_use]
    pub fn initial_height(&self) -> f64 {
        self.initial
    }

    /// Cell extents.
    #[must_use]
    pub fn cell_size(&self) -> Vector2 {
        Vector2::new(self.size.x / self.nx as f64, self.size.y / self.ny as f64)
    }

    fn min_corner(&self) -> Point2 {
        self.center - self.size * 0.5
    }

    /// Raw heights, row-major.
    #[must_use]
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Cell containing world position `(x, y)`. The upper edges belong to
    /// the last row and column.
    #[must_use]
    pub fn world_to_cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let min = self.min_corner();
        let cell = self.cell_size();
        let fx = (x - min.x) / cell.x;
        let fy = (y - min.y) / cell.y;
        if !(0.0..=self.nx as f64).contains(&fx) || !(0.0..=self.ny as f64).contains(&fy) {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (i, j) = (fx as usize, fy as usize);
        Some((i.min(self.nx - 1), j.min(self.ny - 1)))
    }

    /// Continuous cell coordinates of a world position, unclamped.
    #[must_use]
    pub fn cell_coords(&self, p: &Point2) -> (f64, f64) {
        let min = self.min_corner();
        let cell = self.cell_size();
        ((p.x - min.x) / cell.x, (p.y - min.y) / cell.y)
    }

    /// World position of the centre of cell `(i, j)`.
    #[must_use]
    pub fn cell_center(&self, i: usize, j: usize) -> Point2 {
        let min = self.min_corner();
        let cell = self.cell_size();
        Point2::new(
            min.x + (i as f64 + 0.5) * cell.x,
            min.y + (j as f64 + 0.5) * cell.y,
        )
    }

    pub(crate) fn index(&self, i: usize, j: usize) -> Option<usize> {
        (i < self.nx && j < self.ny).then_some(j * self.nx + i)
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.index(i, j).map(|k| self.heights[k])
    }

    /// Overwrites one cell. Out-of-range indices are ignored.
    pub fn set(&mut self, i: usize, j: usize, h: f64) {
        if let Some(k) = self.index(i, j) {
            self.heights[k] = h;
        }
    }

    pub(crate) fn set_index(&mut self, k: usize, h: f64) {
        if let Some(cell) = self.heights.get_mut(k) {
            *cell = h;
        }
    }

    /// Height under world position `(x, y)`.
    #[must_use]
    pub fn height_at(&self, x: f64, y: f64) -> Option<f64> {
        self.world_to_cell(x, y).and_then(|(i, j)| self.get(i, j))
    }

    /// Removed volume and height range.
    #[must_use]
    pub fn stats(&self) -> HeightFieldStats {
        let cell = self.cell_size();
        let area = cell.x * cell.y;
        let mut stats = HeightFieldStats {
            removed_volume: 0.0,
            min_height: f64::INFINITY,
            max_height: f64::NEG_INFINITY,
        };
        for &h in &self.heights {
            stats.min_height = stats.min_height.min(h);
            stats.max_height = stats.max_height.max(h);
            if h < self.initial {
                stats.removed_volume += (self.initial - h) * area;
            }
        }
        stats
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn field() -> HeightField {
        HeightField::new(Point2::new(0.0, 0.0), Vector2::new(10.0, 4.0), 10, 4, 5.0)
    }

    #[test]
    fn cell_mapping() {
        let f = field();
        assert_eq!(f.world_to_cell(-5.0, -2.0), Some((0, 0)));
        assert_eq!(f.world_to_cell(4.99, 1.5), Some((9, 3)));
        assert_eq!(f.world_to_cell(5.0, 2.0), Some((9, 3)));
        assert_eq!(f.world_to_cell(5.01, 0.0), None);
        let c = f.cell_center(0, 0);
        assert!((c - Point2::new(-4.5, -1.5)).norm() < 1e-12);
    }

    #[test]
    fn stats_and_reset() {
        let mut f = field();
        f.set(2, 1, 3.0);
        f.set(3, 1, 4.0);
        let s = f.stats();
        assert!((s.removed_volume - 3.0).abs() < 1e-12);
        assert!((s.min_height - 3.0).abs() < 1e-12);
        assert!((s.max_height - 5.0).abs() < 1e-12);
        f.set_resolution(20, 8);
        assert_eq!(f.heights().len(), 160);
        assert!(f.heights().iter().all(|&h| (h - 5.0).abs() < 1e-12));
    }
}
