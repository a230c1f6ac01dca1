//! Texture metric sampler: the metric field is discretized onto a regular
//! 3-D grid (`metricDiscretizationDepth` cells per axis, default range
//! 16-64) and sampled by trilinear interpolation, the way a GPU pass would
//! read it from a 3-D texture.

use crate::error::{Error, Result};
use crate::geometry::{Mat3, Vec3};
use crate::sampler::{MetricSampler, RefTetHint};

pub struct TextureSampler {
    depth: usize,
    origin: Vec3,
    cell_size: Vec3,
    /// Flattened `depth^3` grid, x-fastest, then y, then z.
    cells: Vec<Mat3>,
}

impl TextureSampler {
    /// Discretize `field` over the axis-aligned box `[origin, origin +
    /// extent]` using a `depth`-cells-per-axis grid.
    pub fn discretize<F>(field: F, origin: Vec3, extent: Vec3, depth: usize) -> Self
    where
        F: Fn(Vec3) -> Mat3,
    {
        assert!(depth >= 2, "texture sampler needs at least 2 cells per axis to interpolate");
        let cell_size = Vec3::new(extent.x / (depth - 1) as f64, extent.y / (depth - 1) as f64, extent.z / (depth - 1) as f64);
        let mut cells = Vec::with_capacity(depth * depth * depth);
        for k in 0..depth {
            for j in 0..depth {
                for i in 0..depth {
                    let p = origin + Vec3::new(i as f64 * cell_size.x, j as f64 * cell_size.y, k as f64 * cell_size.z);
                    cells.push(field(p));
                }
            }
        }
        Self { depth, origin, cell_size, cells }
    }

    #[inline]
    fn at(&self, i: usize, j: usize, k: usize) -> &Mat3 {
        &self.cells[i + self.depth * (j + self.depth * k)]
    }
}

impl MetricSampler for TextureSampler {
    fn metric_at(&self, p: Vec3, _hint: &RefTetHint) -> Result<Mat3> {
        let local = p - self.origin;
        let fx = local.x / self.cell_size.x;
        let fy = local.y / self.cell_size.y;
        let fz = local.z / self.cell_size.z;

        let max_idx = (self.depth - 1) as f64;
        if fx < 0.0 || fy < 0.0 || fz < 0.0 || fx > max_idx || fy > max_idx || fz > max_idx {
            return Err(Error::OutOfDomain);
        }

        let i0 = (fx.floor() as usize).min(self.depth - 2);
        let j0 = (fy.floor() as usize).min(self.depth - 2);
        let k0 = (fz.floor() as usize).min(self.depth - 2);
        let (tx, ty, tz) = (fx - i0 as f64, fy - j0 as f64, fz - k0 as f64);

        let lerp = |a: &Mat3, b: &Mat3, t: f64| a * (1.0 - t) + b * t;

        let c00 = lerp(self.at(i0, j0, k0), self.at(i0 + 1, j0, k0), tx);
        let c10 = lerp(self.at(i0, j0 + 1, k0), self.at(i0 + 1, j0 + 1, k0), tx);
        let c01 = lerp(self.at(i0, j0, k0 + 1), self.at(i0 + 1, j0, k0 + 1), tx);
        let c11 = lerp(self.at(i0, j0 + 1, k0 + 1), self.at(i0 + 1, j0 + 1, k0 + 1), tx);

        let c0 = lerp(&c00, &c10, ty);
        let c1 = lerp(&c01, &c11, ty);

        Ok(lerp(&c0, &c1, tz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trilinear_interpolation_reproduces_a_linear_field_exactly() {
        let field = |p: Vec3| Mat3::identity() * (1.0 + p.x);
        let sampler = TextureSampler::discretize(field, Vec3::zeros(), Vec3::new(4.0, 4.0, 4.0), 5);
        let hint = RefTetHint::new();
        let m = sampler.metric_at(Vec3::new(1.3, 2.0, 0.5), &hint).unwrap();
        assert!((m[(0, 0)] - 2.3).abs() < 1e-9);
    }

    #[test]
    fn query_outside_the_grid_is_out_of_domain() {
        let sampler = TextureSampler::discretize(|_| Mat3::identity(), Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0), 16);
        let hint = RefTetHint::new();
        assert!(matches!(sampler.metric_at(Vec3::new(-1.0, 0.0, 0.0), &hint), Err(Error::OutOfDomain)));
    }
}
