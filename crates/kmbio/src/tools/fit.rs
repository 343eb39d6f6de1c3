//! State shared by the coordinate superimposers.

use super::error::Error;
use crate::model::types::Point;
use nalgebra::{Matrix3, Vector3};

/// Result of a superposition: `x' = rotation * x + translation` maps the moving set onto
/// the reference set with root-mean-square deviation `rms`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
    pub rms: f64,
}

impl Fit {
    pub fn apply(&self, point: &Point) -> Point {
        Point::from(self.rotation * point.coords + self.translation)
    }
}

/// Reference and moving coordinates of equal, non-zero length.
#[derive(Debug, Clone, Default)]
pub(crate) struct Pairs {
    reference: Vec<Point>,
    moving: Vec<Point>,
}

impl Pairs {
    pub(crate) fn new(reference: &[Point], moving: &[Point]) -> Result<Self, Error> {
        if reference.len() != moving.len() {
            return Err(Error::SizeMismatch {
                reference: reference.len(),
                moving: moving.len(),
            });
        }
        if reference.is_empty() {
            return Err(Error::Empty);
        }
        Ok(Self {
            reference: reference.to_vec(),
            moving: moving.to_vec(),
        })
    }

    pub(crate) fn reference(&self) -> &[Point] {
        &self.reference
    }

    pub(crate) fn moving(&self) -> &[Point] {
        &self.moving
    }

    pub(crate) fn len(&self) -> usize {
        self.reference.len()
    }

    /// Centroids of the reference and moving sets.
    pub(crate) fn centroids(&self) -> (Vector3<f64>, Vector3<f64>) {
        (centroid(&self.reference), centroid(&self.moving))
    }

    /// RMSD of the moving set as given, without superposition.
    pub(crate) fn init_rms(&self) -> f64 {
        rms(&self.reference, self.moving.iter().copied())
    }

    /// Builds the fit for `rotation`, deriving the translation from the centroids.
    pub(crate) fn fit_with(&self, rotation: Matrix3<f64>) -> Fit {
        let (reference_center, moving_center) = self.centroids();
        let translation = reference_center - rotation * moving_center;
        let mut fit = Fit {
            rotation,
            translation,
            rms: 0.0,
        };
        fit.rms = rms(&self.reference, self.moving.iter().map(|p| fit.apply(p)));
        fit
    }
}

pub(crate) fn centroid(points: &[Point]) -> Vector3<f64> {
    points.iter().map(|p| p.coords).sum::<Vector3<f64>>() / points.len() as f64
}

fn rms(reference: &[Point], moved: impl Iterator<Item = Point>) -> f64 {
    let sum: f64 = reference
        .iter()
        .zip(moved)
        .map(|(a, b)| (a - b).norm_squared())
        .sum();
    (sum / reference.len() as f64).sqrt()
}
