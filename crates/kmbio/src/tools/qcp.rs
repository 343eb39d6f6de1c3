//! Quaternion characteristic polynomial (QCP) superposition.
//!
//! The minimum RMSD comes from the largest eigenvalue of the 4×4 key matrix, found by
//! Newton–Raphson on its characteristic polynomial starting from `E0`. The optimal
//! rotation is read off the quaternion given by a column of the adjugate of
//! `K - λ I`.

use super::error::Error;
use super::fit::{Fit, Pairs};
use super::svd::kabsch_rotation;
use crate::model::types::Point;
use nalgebra::{Matrix3, Vector3};
use tracing::warn;

pub const MAX_ITERATIONS: usize = 50;
/// Relative convergence threshold for the eigenvalue.
pub const EVAL_PRECISION: f64 = 1e-11;
/// Below this squared quaternion norm the next adjugate column is tried.
pub const EVEC_PRECISION: f64 = 1e-6;

/// Correlation matrix `A[i][j] = Σ reference_i · moving_j` and `E0 = (G1 + G2) / 2`
/// of two centred coordinate sets.
pub fn inner_product(reference: &[Vector3<f64>], moving: &[Vector3<f64>]) -> (Matrix3<f64>, f64) {
    let mut a = Matrix3::zeros();
    let mut g1 = 0.0;
    let mut g2 = 0.0;
    for (r, m) in reference.iter().zip(moving) {
        g1 += r.norm_squared();
        g2 += m.norm_squared();
        a += r * m.transpose();
    }
    (a, (g1 + g2) * 0.5)
}

/// Minimum RMSD and the rotation taking the moving set onto the reference.
///
/// `a` and `e0` come from [`inner_product`] over `len` centred points. The rotation is
/// the identity when no eigenvector can be extracted, which happens when the sets are
/// already superposed up to numerical noise.
pub fn calc_rmsd_and_rotation(a: &Matrix3<f64>, e0: f64, len: usize) -> (f64, Matrix3<f64>) {
    let (sxx, sxy, sxz) = (a[(0, 0)], a[(0, 1)], a[(0, 2)]);
    let (syx, syy, syz) = (a[(1, 0)], a[(1, 1)], a[(1, 2)]);
    let (szx, szy, szz) = (a[(2, 0)], a[(2, 1)], a[(2, 2)]);

    let sxx2 = sxx * sxx;
    let syy2 = syy * syy;
    let szz2 = szz * szz;
    let sxy2 = sxy * sxy;
    let syz2 = syz * syz;
    let sxz2 = sxz * sxz;
    let syx2 = syx * syx;
    let szy2 = szy * szy;
    let szx2 = szx * szx;

    let syz_szy_m_syy_szz2 = 2.0 * (syz * szy - syy * szz);
    let sxx2_syy2_szz2_syz2_szy2 = syy2 + szz2 - sxx2 + syz2 + szy2;

    let c2 = -2.0 * (sxx2 + syy2 + szz2 + sxy2 + syx2 + sxz2 + szx2 + syz2 + szy2);
    let c1 = 8.0
        * (sxx * syz * szy + syy * szx * sxz + szz * sxy * syx
            - sxx * syy * szz
            - syz * szx * sxy
            - szy * syx * sxz);

    let sxz_p_szx = sxz + szx;
    let syz_p_szy = syz + szy;
    let sxy_p_syx = sxy + syx;
    let syz_m_szy = syz - szy;
    let sxz_m_szx = sxz - szx;
    let sxy_m_syx = sxy - syx;
    let sxx_p_syy = sxx + syy;
    let sxx_m_syy = sxx - syy;
    let sxy2_sxz2_syx2_szx2 = sxy2 + sxz2 - syx2 - szx2;

    let c0 = sxy2_sxz2_syx2_szx2 * sxy2_sxz2_syx2_szx2
        + (sxx2_syy2_szz2_syz2_szy2 + syz_szy_m_syy_szz2)
            * (sxx2_syy2_szz2_syz2_szy2 - syz_szy_m_syy_szz2)
        + (-sxz_p_szx * syz_m_szy + sxy_m_syx * (sxx_m_syy - szz))
            * (-sxz_m_szx * syz_p_szy + sxy_m_syx * (sxx_m_syy + szz))
        + (-sxz_p_szx * syz_p_szy - sxy_p_syx * (sxx_p_syy - szz))
            * (-sxz_m_szx * syz_m_szy - sxy_p_syx * (sxx_p_syy + szz))
        + (sxy_p_syx * syz_p_szy + sxz_p_szx * (sxx_m_syy + szz))
            * (-sxy_m_syx * syz_m_szy + sxz_p_szx * (sxx_p_syy + szz))
        + (sxy_p_syx * syz_m_szy + sxz_m_szx * (sxx_m_syy - szz))
            * (-sxy_m_syx * syz_p_szy + sxz_m_szx * (sxx_p_syy - szz));

    let mut eigenvalue = e0;
    let mut converged = false;
    for _ in 0..MAX_ITERATIONS {
        let previous = eigenvalue;
        let x2 = eigenvalue * eigenvalue;
        let b = (x2 + c2) * eigenvalue;
        let a = b + c1;
        let denominator = 2.0 * x2 * eigenvalue + b + a;
        if denominator == 0.0 || !denominator.is_finite() {
            // Stationary point of the polynomial: no further Newton step is defined.
            converged = true;
            break;
        }
        eigenvalue -= (a * eigenvalue + c0) / denominator;
        if (eigenvalue - previous).abs() < (EVAL_PRECISION * eigenvalue).abs() {
            converged = true;
            break;
        }
    }
    if !converged {
        warn!(
            iterations = MAX_ITERATIONS,
            "QCP eigenvalue did not converge"
        );
    }

    // Rounding can leave E0 - λ slightly negative.
    let rmsd = (2.0 * (e0 - eigenvalue) / len as f64).max(0.0).sqrt();

    let a11 = sxx_p_syy + szz - eigenvalue;
    let a12 = syz_m_szy;
    let a13 = -sxz_m_szx;
    let a14 = sxy_m_syx;
    let a21 = syz_m_szy;
    let a22 = sxx_m_syy - szz - eigenvalue;
    let a23 = sxy_p_syx;
    let a24 = sxz_p_szx;
    let a31 = a13;
    let a32 = a23;
    let a33 = syy - sxx - szz - eigenvalue;
    let a34 = syz_p_szy;
    let a41 = a14;
    let a42 = a24;
    let a43 = a34;
    let a44 = szz - sxx_p_syy - eigenvalue;

    let a3344_4334 = a33 * a44 - a43 * a34;
    let a3244_4234 = a32 * a44 - a42 * a34;
    let a3243_4233 = a32 * a43 - a42 * a33;
    let a3143_4133 = a31 * a43 - a41 * a33;
    let a3144_4134 = a31 * a44 - a41 * a34;
    let a3142_4132 = a31 * a42 - a41 * a32;

    let a1324_1423 = a13 * a24 - a14 * a23;
    let a1224_1422 = a12 * a24 - a14 * a22;
    let a1223_1322 = a12 * a23 - a13 * a22;
    let a1124_1421 = a11 * a24 - a14 * a21;
    let a1123_1321 = a11 * a23 - a13 * a21;
    let a1122_1221 = a11 * a22 - a12 * a21;

    let candidates = [
        [
            a22 * a3344_4334 - a23 * a3244_4234 + a24 * a3243_4233,
            -a21 * a3344_4334 + a23 * a3144_4134 - a24 * a3143_4133,
            a21 * a3244_4234 - a22 * a3144_4134 + a24 * a3142_4132,
            -a21 * a3243_4233 + a22 * a3143_4133 - a23 * a3142_4132,
        ],
        [
            a12 * a3344_4334 - a13 * a3244_4234 + a14 * a3243_4233,
            -a11 * a3344_4334 + a13 * a3144_4134 - a14 * a3143_4133,
            a11 * a3244_4234 - a12 * a3144_4134 + a14 * a3142_4132,
            -a11 * a3243_4233 + a12 * a3143_4133 - a13 * a3142_4132,
        ],
        [
            a42 * a1324_1423 - a43 * a1224_1422 + a44 * a1223_1322,
            -a41 * a1324_1423 + a43 * a1124_1421 - a44 * a1123_1321,
            a41 * a1224_1422 - a42 * a1124_1421 + a44 * a1122_1221,
            -a41 * a1223_1322 + a42 * a1123_1321 - a43 * a1122_1221,
        ],
        [
            a32 * a1324_1423 - a33 * a1224_1422 + a34 * a1223_1322,
            -a31 * a1324_1423 + a33 * a1124_1421 - a34 * a1123_1321,
            a31 * a1224_1422 - a32 * a1124_1421 + a34 * a1122_1221,
            -a31 * a1223_1322 + a32 * a1123_1321 - a33 * a1122_1221,
        ],
    ];

    let Some(q) = candidates
        .iter()
        .find(|q| q.iter().map(|v| v * v).sum::<f64>() >= EVEC_PRECISION)
    else {
        return (rmsd, Matrix3::identity());
    };

    let norm = q.iter().map(|v| v * v).sum::<f64>().sqrt();
    let [q1, q2, q3, q4] = (*q).map(|v| v / norm);

    let a2 = q1 * q1;
    let x2 = q2 * q2;
    let y2 = q3 * q3;
    let z2 = q4 * q4;
    let xy = q2 * q3;
    let az = q1 * q4;
    let zx = q4 * q2;
    let ay = q1 * q3;
    let yz = q3 * q4;
    let ax = q1 * q2;

    let rotation = Matrix3::new(
        a2 + x2 - y2 - z2,
        2.0 * (xy + az),
        2.0 * (zx - ay),
        2.0 * (xy - az),
        a2 - x2 + y2 - z2,
        2.0 * (yz + ax),
        2.0 * (zx + ay),
        2.0 * (yz - ax),
        a2 - x2 - y2 + z2,
    );
    (rmsd, rotation)
}

/// Rank of the correlation matrix, relative to the size `e0` of the centred sets.
///
/// Below rank 2 (a single point, coincident or collinear points) the largest eigenvalue
/// of the key matrix is degenerate and the quaternion is not unique.
fn correlation_rank(a: &Matrix3<f64>, e0: f64) -> usize {
    a.svd(false, false).rank(EVEC_PRECISION * e0)
}

/// Superimposes one coordinate set onto another with the QCP method.
///
/// Fewer than three independent directions (one point, coincident or collinear points)
/// fall back to the identity or to [`kabsch_rotation`].
///
/// # Examples
///
/// ```
/// use kmbio::Point;
/// use kmbio::tools::QcpSuperimposer;
///
/// let reference = [
///     Point::new(0.0, 1.0, 0.0),
///     Point::new(-1.0, 0.0, 0.0),
///     Point::new(0.0, 0.0, 1.0),
/// ];
/// let moving = [
///     Point::new(1.0, 0.0, 0.0),
///     Point::new(0.0, 1.0, 0.0),
///     Point::new(0.0, 0.0, 1.0),
/// ];
///
/// let mut sup = QcpSuperimposer::new();
/// sup.set(&reference, &moving).unwrap();
/// sup.run().unwrap();
/// assert!(sup.rms().unwrap() < 1e-6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct QcpSuperimposer {
    pairs: Option<Pairs>,
    fit: Option<Fit>,
}

impl QcpSuperimposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the coordinates and clears any previous result.
    ///
    /// # Errors
    ///
    /// [`Error::SizeMismatch`] or [`Error::Empty`].
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

        let (a, e0) = inner_product(&reference, &moving);
        let fit = match correlation_rank(&a, e0) {
            0 => pairs.fit_with(Matrix3::identity()),
            1 => pairs.fit_with(kabsch_rotation(&reference, &moving)?),
            _ => {
                let (rmsd, rotation) = calc_rmsd_and_rotation(&a, e0, pairs.len());
                let mut fit = pairs.fit_with(rotation);
                fit.rms = rmsd;
                fit
            }
        };
        self.fit = Some(fit);
        Ok(())
    }

    pub fn fit(&self) -> Result<&Fit, Error> {
        self.fit.as_ref().ok_or(Error::NotRun)
    }

    pub fn rms(&self) -> Result<f64, Error> {
        Ok(self.fit()?.rms)
    }

    /// RMSD before superposition.
    pub fn init_rms(&self) -> Result<f64, Error> {
        Ok(self.pairs.as_ref().ok_or(Error::NotSet)?.init_rms())
    }

    pub fn rotran(&self) -> Result<(Matrix3<f64>, Vector3<f64>), Error> {
        let fit = self.fit()?;
        Ok((fit.rotation, fit.translation))
    }

    /// The moving coordinates after applying the fitted transform.
    pub fn transformed(&self) -> Result<Vec<Point>, Error> {
        let fit = self.fit()?;
        let pairs = self.pairs.as_ref().ok_or(Error::NotSet)?;
        Ok(pairs.moving().iter().map(|p| fit.apply(p)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;

    fn cloud() -> Vec<Point> {
        vec![
            Point::new(1.2, 0.3, -0.7),
            Point::new(-0.4, 2.1, 0.9),
            Point::new(3.3, -1.0, 1.4),
            Point::new(0.0, 0.5, 2.2),
            Point::new(-2.1, -0.8, 0.1),
            Point::new(1.7, 1.9, -1.6),
        ]
    }

    #[test]
    fn quarter_turn_about_z_is_recovered() {
        let moving: Vec<Vector3<f64>> = vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, -1.0),
        ];
        let expected = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let reference: Vec<Vector3<f64>> = moving.iter().map(|v| expected * v).collect();

        let (a, e0) = inner_product(&reference, &moving);
        let (rmsd, rotation) = calc_rmsd_and_rotation(&a, e0, moving.len());

        assert!(rmsd < 1e-6);
        assert!((rotation - expected).abs().max() < 1e-9);
    }

    #[test]
    fn recovers_rigid_motion() {
        let reference = cloud();
        let rotation = Rotation3::from_euler_angles(0.3, -1.1, 2.0);
        let shift = Vector3::new(4.0, -2.5, 7.0);
        let moving: Vec<Point> = reference
            .iter()
            .map(|p| rotation * p + shift)
            .collect();

        let mut sup = QcpSuperimposer::new();
        sup.set(&reference, &moving).unwrap();
        sup.run().unwrap();

        assert!(sup.rms().unwrap() < 1e-5);
        assert!(sup.init_rms().unwrap() > 1.0);
        for (moved, target) in sup.transformed().unwrap().iter().zip(&reference) {
            assert!((moved - target).norm() < 1e-5);
        }
        let (rot, _) = sup.rotran().unwrap();
        assert!((rot - rotation.inverse().into_inner()).abs().max() < 1e-6);
    }

    #[test]
    fn reported_rms_matches_transformed_coordinates() {
        let reference = cloud();
        let mut moving = cloud();
        moving[0].x += 0.5;
        moving[3].z -= 0.3;

        let mut sup = QcpSuperimposer::new();
        sup.set(&reference, &moving).unwrap();
        sup.run().unwrap();

        let transformed = sup.transformed().unwrap();
        let direct = (transformed
            .iter()
            .zip(&reference)
            .map(|(a, b)| (a - b).norm_squared())
            .sum::<f64>()
            / reference.len() as f64)
            .sqrt();
        assert!((sup.rms().unwrap() - direct).abs() < 1e-6);
        assert!(sup.rms().unwrap() <= sup.init_rms().unwrap());
    }

    #[test]
    fn identical_sets_give_identity() {
        let mut sup = QcpSuperimposer::new();
        sup.set(&cloud(), &cloud()).unwrap();
        sup.run().unwrap();

        let (rot, tran) = sup.rotran().unwrap();
        assert!(sup.rms().unwrap() < 1e-6);
        assert!((rot - Matrix3::identity()).abs().max() < 1e-6);
        assert!(tran.norm() < 1e-6);
    }

    #[test]
    fn zero_correlation_gives_zero_rmsd_and_identity() {
        let (rmsd, rotation) = calc_rmsd_and_rotation(&Matrix3::zeros(), 0.0, 1);
        assert_eq!(rmsd, 0.0);
        assert_eq!(rotation, Matrix3::identity());
    }

    #[test]
    fn single_point_is_translated() {
        let mut sup = QcpSuperimposer::new();
        sup.set(&[Point::new(1.0, 2.0, 3.0)], &[Point::new(-4.0, 0.5, 9.0)])
            .unwrap();
        sup.run().unwrap();

        let (rot, tran) = sup.rotran().unwrap();
        assert_eq!(sup.rms().unwrap(), 0.0);
        assert_eq!(rot, Matrix3::identity());
        assert!((tran - Vector3::new(5.0, 1.5, -6.0)).norm() < 1e-12);
    }

    #[test]
    fn coincident_moving_points_keep_a_finite_rms() {
        let reference = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(1.0, 3.0, 0.0),
        ];
        let moving = [Point::new(5.0, 5.0, 5.0); 3];

        let mut sup = QcpSuperimposer::new();
        sup.set(&reference, &moving).unwrap();
        sup.run().unwrap();

        // Every moved point lands on the reference centroid (1, 1, 0).
        let expected = ((1.0 + 1.0) + (1.0 + 1.0) + 4.0_f64) / 3.0;
        assert!((sup.rms().unwrap() - expected.sqrt()).abs() < 1e-9);
        for moved in sup.transformed().unwrap() {
            assert!((moved - Point::new(1.0, 1.0, 0.0)).norm() < 1e-9);
        }
    }

    #[test]
    fn two_points_are_rotated_onto_each_other() {
        let reference = [Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0)];
        let moving = [Point::new(0.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.0)];

        let mut sup = QcpSuperimposer::new();
        sup.set(&reference, &moving).unwrap();
        sup.run().unwrap();

        assert!(sup.rms().unwrap() < 1e-9);
        for (moved, target) in sup.transformed().unwrap().iter().zip(&reference) {
            assert!((moved - target).norm() < 1e-9);
        }
        let (rot, _) = sup.rotran().unwrap();
        assert!((rot.determinant() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn identical_collinear_sets_superpose_exactly() {
        let line: Vec<Point> = (0..4)
            .map(|i| Point::new(i as f64, 2.0 * i as f64, -(i as f64)))
            .collect();

        let mut sup = QcpSuperimposer::new();
        sup.set(&line, &line).unwrap();
        sup.run().unwrap();

        let rms = sup.rms().unwrap();
        assert!(rms.is_finite());
        assert!(rms < 1e-9);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let mut sup = QcpSuperimposer::new();
        assert_eq!(sup.run(), Err(Error::NotSet));
        assert_eq!(
            sup.set(&cloud(), &cloud()[..2]),
            Err(Error::SizeMismatch {
                reference: 6,
                moving: 2
            })
        );
        assert_eq!(sup.set(&[], &[]), Err(Error::Empty));
        sup.set(&cloud(), &cloud()).unwrap();
        assert_eq!(sup.rms(), Err(Error::NotRun));
    }
}
