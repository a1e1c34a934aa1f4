use std::path::Path;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PathError, Result};
use crate::math::Point3;
use crate::milling::Stock;

use super::common::{finish, join_with_lifts, remove_collinear, Toolpath};

/// Neighbour order used when following a silhouette edge. Side neighbours
/// come first so corners are not cut across.
const NEIGHBORS: [(i64, i64); 8] = [
    (1, 0),
    (0, -1),
    (-1, 0),
    (0, 1),
    (1, -1),
    (-1, -1),
    (-1, 1),
    (1, 1),
];

/// Parameters of the silhouette pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageFourParams {
    /// Pixels darker than this belong to the silhouette.
    pub threshold: u8,
    /// Treat light pixels as the silhouette instead.
    pub invert: bool,
    /// World size of one pixel.
    pub pixel_size: f64,
    /// Tip height; the stock base when unset.
    pub height: Option<f64>,
    /// Paths shorter than this many pixels are dropped.
    pub min_pixels: usize,
    pub collinear_area: f64,
    pub translate_back: bool,
}

impl Default for StageFourParams {
    fn default() -> Self {
        Self {
            threshold: 128,
            invert: false,
            pixel_size: 0.2,
            height: None,
            min_pixels: 2,
            collinear_area: 0.01,
            translate_back: false,
        }
    }
}

/// Traces the outline of a bitmap silhouette, centred on the stock.
#[derive(Debug, Clone, Default)]
pub struct StageFour {
    params: StageFourParams,
}

impl StageFour {
    #[must_use]
    pub fn new(params: StageFourParams) -> Self {
        Self { params }
    }

    /// Loads the bitmap at `path` and traces it.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Image`] if the file cannot be decoded.
    pub fn execute_file(&self, path: impl AsRef<Path>, stock: &Stock) -> Result<Toolpath> {
        let image = image::open(path.as_ref()).map_err(PathError::from)?;
        self.execute(&image.to_luma8(), stock)
    }

    /// Traces a grayscale bitmap.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidInput`] for a non-positive pixel size.
    pub fn execute(&self, image: &GrayImage, stock: &Stock) -> Result<Toolpath> {
        let p = &self.params;
        if p.pixel_size <= 0.0 {
            return Err(PathError::InvalidInput("pixel size must be positive".into()).into());
        }
        let mask = Mask::new(image, p.threshold, p.invert);
        let z = p.height.unwrap_or(stock.base_height);
        let (w, h) = (f64::from(image.width()), f64::from(image.height()));

        let passes: Vec<Toolpath> = mask
            .trace()
            .into_iter()
            .filter(|path| path.len() >= p.min_pixels)
            .map(|path| {
                let world: Toolpath = path
                    .iter()
                    .map(|&(x, y)| {
                        Point3::new(
                            stock.center_x + (x as f64 + 0.5 - 0.5 * w) * p.pixel_size,
                            stock.center_y - (y as f64 + 0.5 - 0.5 * h) * p.pixel_size,
                            z,
                        )
                    })
                    .collect();
                remove_collinear(&world, p.collinear_area)
            })
            .collect();
        debug!(paths = passes.len(), "silhouette traced");

        let path = finish(join_with_lifts(&passes, stock), stock, p.translate_back);
        info!(points = path.len(), "stage four path generated");
        Ok(path)
    }
}

/// Foreground pixels of a thresholded image.
struct Mask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Mask {
    fn new(image: &GrayImage, threshold: u8, invert: bool) -> Self {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let cells = image
            .pixels()
            .map(|px| (px.0[0] < threshold) != invert)
            .collect();
        Self {
            width,
            height,
            cells,
        }
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn at(&self, x: i64, y: i64) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && self.cells[y as usize * self.width + x as usize]
    }

    /// Foreground pixel touching the background or the image edge.
    fn is_edge(&self, x: i64, y: i64) -> bool {
        self.at(x, y)
            && [(1, 0), (-1, 0), (0, 1), (0, -1)]
                .iter()
                .any(|(dx, dy)| !self.at(x + dx, y + dy))
    }

    /// Follows edge pixels into paths.
    ///
    /// From every unvisited edge pixel, in row-major order, a stack walk
    /// steps to the first unvisited edge neighbour in [`NEIGHBORS`] order.
    /// A dead end closes the current path and the walk resumes from the
    /// deepest stack entry that still has a way on. A resumed branch opens a
    /// new path only once it takes a step, and that path starts at the
    /// junction pixel it leaves from so the tool stays on the outline.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn trace(&self) -> Vec<Vec<(usize, usize)>> {
        let mut visited = vec![false; self.cells.len()];
        let mut paths = Vec::new();
        for sy in 0..self.height {
            for sx in 0..self.width {
                let start = (sx as i64, sy as i64);
                if visited[sy * self.width + sx] || !self.is_edge(start.0, start.1) {
                    continue;
                }
                visited[sy * self.width + sx] = true;
                let mut stack = vec![start];
                let mut path = vec![(sx, sy)];
                while let Some(&(x, y)) = stack.last() {
                    let next = NEIGHBORS
                        .iter()
                        .map(|(dx, dy)| (x + dx, y + dy))
                        .find(|&(nx, ny)| {
                            self.is_edge(nx, ny)
                                && !visited[ny as usize * self.width + nx as usize]
                        });
                    if let Some((nx, ny)) = next {
                        visited[ny as usize * self.width + nx as usize] = true;
                        if path.is_empty() {
                            path.push((x as usize, y as usize));
                        }
                        path.push((nx as usize, ny as usize));
                        stack.push((nx, ny));
                    } else {
                        if !path.is_empty() {
                            paths.push(std::mem::take(&mut path));
                        }
                        stack.pop();
                    }
                }
            }
        }
        paths
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Luma;

    fn square_image() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, y| {
            if (5..15).contains(&x) && (5..15).contains(&y) {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    #[test]
    fn square_outline_is_one_path() {
        let mask = Mask::new(&square_image(), 128, false);
        let paths = mask.trace();
        let total: usize = paths.iter().map(Vec::len).sum();
        // 36 edge pixels of a 10x10 block.
        assert_eq!(total, 36);
        assert_eq!(paths[0].len(), 36);
        assert_eq!(paths[0][0], (5, 5));
    }

    #[test]
    fn square_corners_are_not_cut() {
        let paths = Mask::new(&square_image(), 128, false).trace();
        assert_eq!(paths.len(), 1);
        let ring = &paths[0];
        for corner in [(14, 5), (14, 14), (5, 14)] {
            assert!(ring.contains(&corner), "{corner:?}");
        }
        for w in ring.windows(2) {
            let step = w[0].0.abs_diff(w[1].0) + w[0].1.abs_diff(w[1].1);
            assert_eq!(step, 1, "{:?} -> {:?}", w[0], w[1]);
        }
    }

    #[test]
    fn spur_branch_starts_at_its_junction() {
        // The square with a one-pixel-wide spur to the right on row 9.
        let img = GrayImage::from_fn(22, 20, |x, y| {
            let square = (5..15).contains(&x) && (5..15).contains(&y);
            let spur = (15..19).contains(&x) && y == 9;
            if square || spur {
                Luma([0])
            } else {
                Luma([255])
            }
        });
        let paths = Mask::new(&img, 128, false).trace();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].last(), Some(&(18, 9)));
        let junction = paths[1][0];
        assert!(paths[0].contains(&junction));
        // Apart from the junction, no pixel is traced twice.
        let mut all: Vec<(usize, usize)> = paths.concat();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 40);
        assert_eq!(paths.iter().map(Vec::len).sum::<usize>(), 41);
    }

    #[test]
    fn outline_maps_to_stock_frame() {
        let stock = Stock::default();
        let params = StageFourParams {
            pixel_size: 1.0,
            ..StageFourParams::default()
        };
        let path = StageFour::new(params).execute(&square_image(), &stock).unwrap();
        let cutting: Vec<&Point3> = path.iter().filter(|p| p.z < stock.safe_height()).collect();
        // The traced ring collapses to its corners.
        assert!(cutting.len() <= 6);
        for p in &cutting {
            assert!((p.z - stock.base_height).abs() < 1e-12);
            assert!(p.x.abs() <= 4.5 + 1e-9 && p.y.abs() <= 4.5 + 1e-9);
        }
        // Image row 5 is the top edge of the square.
        assert!((cutting[0].y - 4.5).abs() < 1e-9);
    }

    #[test]
    fn inverted_mask_traces_background() {
        let mask = Mask::new(&square_image(), 128, true);
        assert!(mask.is_edge(0, 0));
        assert!(!mask.is_edge(7, 7));
    }

    #[test]
    fn blank_image_gives_empty_path() {
        let img = GrayImage::from_pixel(8, 8, Luma([255]));
        let path = StageFour::default().execute(&img, &Stock::default()).unwrap();
        assert!(path.is_empty());
    }
}
