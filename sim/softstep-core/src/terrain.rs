//! Terrain queries consumed by contact discovery.
//!
//! The stepper only needs one thing from the ground: for a world point, how
//! far above the surface it is and which way the surface faces. [`Terrain`]
//! is that seam; [`FlatGround`] and [`HeightField`] implement it.
//!
//! # Coordinate System
//!
//! Heights are along Z. A height field's grid starts at `origin` and spans
//! `(width − 1) · cell_size` along X and `(depth − 1) · cell_size` along Y.
//! Queries outside the grid are clamped to its border.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]

use nalgebra::{Point3, Vector2, Vector3};
use softstep_types::SimError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A surface bodies can rest on.
pub trait Terrain {
    /// Signed height of `point` above the surface and the unit surface normal.
    ///
    /// The height is positive above the surface and negative below it.
    fn height_and_normal_at(&self, point: &Point3<f64>) -> (f64, Vector3<f64>);
}

impl<T: Terrain + ?Sized> Terrain for &T {
    fn height_and_normal_at(&self, point: &Point3<f64>) -> (f64, Vector3<f64>) {
        (**self).height_and_normal_at(point)
    }
}

/// Infinite horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlatGround {
    /// Height of the plane (m).
    pub height: f64,
}

impl FlatGround {
    /// A plane at `height`.
    #[must_use]
    pub const fn new(height: f64) -> Self {
        Self { height }
    }
}

impl Terrain for FlatGround {
    fn height_and_normal_at(&self, point: &Point3<f64>) -> (f64, Vector3<f64>) {
        (point.z - self.height, Vector3::z())
    }
}

/// Regular grid of heights, bilinearly interpolated.
///
/// Heights are stored row-major (X varies fastest): `heights[y * width + x]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeightField {
    heights: Vec<f64>,
    width: usize,
    depth: usize,
    cell_size: f64,
    /// World XY of grid sample (0, 0).
    origin: Vector2<f64>,
}

impl HeightField {
    /// Create a height field from row-major samples.
    pub fn new(
        heights: Vec<f64>,
        width: usize,
        depth: usize,
        cell_size: f64,
    ) -> softstep_types::Result<Self> {
        if width < 2 || depth < 2 {
            return Err(SimError::invalid_config(
                "height field needs at least 2x2 samples",
            ));
        }
        if heights.len() != width * depth {
            return Err(SimError::invalid_config(format!(
                "height field has {} samples, expected {width}x{depth}",
                heights.len()
            )));
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(SimError::invalid_config(
                "height field cell size must be positive",
            ));
        }
        if heights.iter().any(|h| !h.is_finite()) {
            return Err(SimError::invalid_config("height field samples must be finite"));
        }

        Ok(Self {
            heights,
            width,
            depth,
            cell_size,
            origin: Vector2::zeros(),
        })
    }

    /// Sample `f(x, y)` at every grid point.
    pub fn from_fn<F>(width: usize, depth: usize, cell_size: f64, f: F) -> softstep_types::Result<Self>
    where
        F: Fn(f64, f64) -> f64,
    {
        let mut heights = Vec::with_capacity(width * depth);
        for y in 0..depth {
            for x in 0..width {
                heights.push(f(x as f64 * cell_size, y as f64 * cell_size));
            }
        }
        Self::new(heights, width, depth, cell_size)
    }

    /// Shift the grid so sample (0, 0) sits at world `(x, y)`.
    #[must_use]
    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.origin = Vector2::new(x, y);
        self
    }

    /// Extent along X (m).
    #[must_use]
    pub fn extent_x(&self) -> f64 {
        (self.width - 1) as f64 * self.cell_size
    }

    /// Extent along Y (m).
    #[must_use]
    pub fn extent_y(&self) -> f64 {
        (self.depth - 1) as f64 * self.cell_size
    }

    /// Interpolated height at world `(x, y)`, clamped to the grid.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let x = (x - self.origin.x).clamp(0.0, self.extent_x());
        let y = (y - self.origin.y).clamp(0.0, self.extent_y());

        let gx = x / self.cell_size;
        let gy = y / self.cell_size;
        let x0 = (gx.floor() as usize).min(self.width - 1);
        let y0 = (gy.floor() as usize).min(self.depth - 1);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.depth - 1);
        let fx = gx - x0 as f64;
        let fy = gy - y0 as f64;

        let h00 = self.heights[y0 * self.width + x0];
        let h10 = self.heights[y0 * self.width + x1];
        let h01 = self.heights[y1 * self.width + x0];
        let h11 = self.heights[y1 * self.width + x1];

        let h0 = h00 + fx * (h10 - h00);
        let h1 = h01 + fx * (h11 - h01);
        h0 + fy * (h1 - h0)
    }

    /// Surface normal at world `(x, y)` from central differences.
    #[must_use]
    pub fn normal(&self, x: f64, y: f64) -> Vector3<f64> {
        let eps = self.cell_size * 0.1;
        let dx = (self.sample(x + eps, y) - self.sample(x - eps, y)) / (2.0 * eps);
        let dy = (self.sample(x, y + eps) - self.sample(x, y - eps)) / (2.0 * eps);
        Vector3::new(-dx, -dy, 1.0).normalize()
    }
}

impl Terrain for HeightField {
    fn height_and_normal_at(&self, point: &Point3<f64>) -> (f64, Vector3<f64>) {
        let n = self.normal(point.x, point.y);
        let h = self.sample(point.x, point.y);
        // Vertical gap projected onto the normal.
        ((point.z - h) * n.z, n)
    }
}
