//! Kd-tree metric sampler: nearest-cell lookup over a space-partitioned
//! point cloud of `(position, metric)` samples. Unlike [`super::local`],
//! it has no notion of connectivity to walk, so it always answers (no
//! `OutOfDomain`) with the metric of the nearest sample.

use crate::error::Result;
use crate::geometry::{Mat3, Vec3};
use crate::sampler::{MetricSampler, RefTetHint};

struct Node {
    point: Vec3,
    metric: Mat3,
    axis: u8,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

/// Space-partitioned nearest-neighbor metric lookup.
pub struct KdTreeSampler {
    root: Option<Box<Node>>,
}

impl KdTreeSampler {
    pub fn build(mut samples: Vec<(Vec3, Mat3)>) -> Self {
        let root = Self::build_subtree(&mut samples, 0);
        Self { root }
    }

    fn build_subtree(samples: &mut [(Vec3, Mat3)], depth: usize) -> Option<Box<Node>> {
        if samples.is_empty() {
            return None;
        }
        let axis = (depth % 3) as u8;
        samples.sort_by(|a, b| a.0[axis as usize].partial_cmp(&b.0[axis as usize]).unwrap());
        let mid = samples.len() / 2;
        let (point, metric) = samples[mid];
        let left = Self::build_subtree(&mut samples[..mid], depth + 1);
        let right = Self::build_subtree(&mut samples[mid + 1..], depth + 1);
        Some(Box::new(Node { point, metric, axis, left, right }))
    }

    fn nearest<'a>(node: &'a Node, p: Vec3, best: &mut &'a Node, best_dist: &mut f64) {
        let d = (node.point - p).norm_squared();
        if d < *best_dist {
            *best_dist = d;
            *best = node;
        }

        let axis = node.axis as usize;
        let delta = p[axis] - node.point[axis];
        let (near, far) = if delta < 0.0 { (&node.left, &node.right) } else { (&node.right, &node.left) };

        if let Some(near) = near {
            Self::nearest(near, p, best, best_dist);
        }
        if delta * delta < *best_dist {
            if let Some(far) = far {
                Self::nearest(far, p, best, best_dist);
            }
        }
    }
}

impl MetricSampler for KdTreeSampler {
    fn metric_at(&self, p: Vec3, _hint: &RefTetHint) -> Result<Mat3> {
        let root = match &self.root {
            Some(r) => r,
            None => return Ok(Mat3::identity()),
        };
        let mut best = root.as_ref();
        let mut best_dist = f64::INFINITY;
        Self::nearest(root, p, &mut best, &mut best_dist);
        Ok(best.metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_sample_wins_over_farther_ones() {
        let samples = vec![
            (Vec3::new(0.0, 0.0, 0.0), Mat3::identity()),
            (Vec3::new(10.0, 0.0, 0.0), Mat3::identity() * 9.0),
            (Vec3::new(0.0, 10.0, 0.0), Mat3::identity() * 25.0),
        ];
        let sampler = KdTreeSampler::build(samples);
        let hint = RefTetHint::new();
        let m = sampler.metric_at(Vec3::new(9.0, 0.5, 0.0), &hint).unwrap();
        assert!((m[(0, 0)] - 9.0).abs() < 1e-12);
    }

    #[test]
    fn empty_tree_falls_back_to_identity() {
        let sampler = KdTreeSampler::build(vec![]);
        let hint = RefTetHint::new();
        assert_eq!(sampler.metric_at(Vec3::zeros(), &hint).unwrap(), Mat3::identity());
    }
}
