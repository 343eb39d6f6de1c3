//! Kabsch superposition through a singular value decomposition.

use super::error::Error;
use super::fit::{Fit, Pairs};
use crate::model::types::Point;
use nalgebra::{Matrix3, Vector3};

/// Optimal rotation taking `moving` onto `reference`, both already centred.
///
/// A reflection in the SVD solution is corrected by flipping the smallest singular
/// direction.
pub fn kabsch_rotation(
    reference: &[Vector3<f64>],
    moving: &[Vector3<f64>],
) -> Result<Matrix3<f64>, Error> {
    let mut cov = Matrix3::zeros();
    for (r, m) in reference.iter().zip(moving) {
        cov += r * m.transpose();
    }

    let svd = cov.svd(true, true);
    let u = svd.u.ok_or_else(|| Error::rotation_failed("SVD U failed"))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| Error::rotation_failed("SVD V_T failed"))?;

    let mut rotation = u * v_t;
    if rotation.determinant() < 0.0 {
        let mut correction = Matrix3::identity();
        correction[(2, 2)] = -1.0;
        rotation = u * correction * v_t;
    }
    Ok(rotation)
}

/// Superimposes one coordinate set onto another with the Kabsch method.
///
/// Same surface as [`QcpSuperimposer`](super::QcpSuperimposer); the RMSD is measured on
/// the transformed coordinates.
#[derive(Debug, Clone, Default)]
pub struct SvdSuperimposer {
    pairs: Option<Pairs>,
    fit: Option<Fit>,
}

impl SvdSuperimposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, reference: &[Point], coords: &[Point]) -> Result<(), Error> {
        self.pairs = Some(Pairs::new(reference, coords)?);
        self.fit = None;
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), Error> {
        let pairs = self.pairs.as_ref().ok_or(Error::NotSet)?;
        let (reference_center, moving_center) = pairs.centroids();
        let reference: Vec<Vector3<f64>> = pairs
            .reference()
            .iter()
            .map(|p| p.coords - reference_center)
            .collect();
        let moving: Vec<Vector3<f64>> = pairs
            .moving()
            .iter()
            .map(|p| p.coords - moving_center)
            .collect();

        let rotation = kabsch_rotation(&reference, &moving)?;
        self.fit = Some(pairs.fit_with(rotation));
        Ok(())
    }

    pub fn fit(&self) -> Result<&Fit, Error> {
        self.fit.as_ref().ok_or(Error::NotRun)
    }

    pub fn rms(&self) -> Result<f64, Error> {
        Ok(self.fit()?.rms)
    }

    pub fn init_rms(&self) -> Result<f64, Error> {
        Ok(self.pairs.as_ref().ok_or(Error::NotSet)?.init_rms())
    }

    pub fn rotran(&self) -> Result<(Matrix3<f64>, Vector3<f64>), Error> {
        let fit = self.fit()?;
        Ok((fit.rotation, fit.translation))
    }

    pub fn transformed(&self) -> Result<Vec<Point>, Error> {
        let fit = self.fit()?;
        let pairs = self.pairs.as_ref().ok_or(Error::NotSet)?;
        Ok(pairs.moving().iter().map(|p| fit.apply(p)).collect())
    }
}
