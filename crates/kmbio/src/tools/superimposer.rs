//! Atom-level superposition.

use super::error::Error;
use super::fit::Fit;
use super::qcp::QcpSuperimposer;
use super::svd::SvdSuperimposer;
use crate::model::atom::Atom;
use crate::model::structure::Structure;
use crate::model::types::Point;
use crate::ops::Transform;
use nalgebra::{Matrix3, Vector3};
use tracing::debug;

/// Algorithm used by [`Superimposer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Qcp,
    Svd,
}

/// Superimposes a list of moving atoms onto a list of fixed atoms.
///
/// Atoms are paired by position in the two lists. The resulting transform can then be
/// applied to any atoms or to a whole structure.
///
/// # Examples
///
/// ```
/// use kmbio::tools::Superimposer;
/// use kmbio::{Atom, Element, Point};
///
/// let fixed: Vec<Atom> = (0..4)
///     .map(|i| Atom::new("CA", Element::C, Point::new(i as f64, (i * i) as f64, 0.5)))
///     .collect();
/// let mut moving = fixed.clone();
/// for atom in &mut moving {
///     atom.pos.x += 3.0;
/// }
///
/// let mut sup = Superimposer::new();
/// sup.set_atoms(&fixed, &moving).unwrap();
/// sup.apply(moving.iter_mut()).unwrap();
/// assert!(sup.rms().unwrap() < 1e-6);
/// assert!((moving[2].pos - fixed[2].pos).norm() < 1e-6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Superimposer {
    method: Method,
    fit: Option<Fit>,
}

impl Superimposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(method: Method) -> Self {
        Self { method, fit: None }
    }

    /// Computes the transform that moves `moving` onto `fixed`.
    ///
    /// # Errors
    ///
    /// [`Error::SizeMismatch`] when the lists differ in length, [`Error::Empty`] for
    /// empty lists.
    pub fn set_atoms<'a, F, M>(&mut self, fixed: F, moving: M) -> Result<(), Error>
    where
        F: IntoIterator<Item = &'a Atom>,
        M: IntoIterator<Item = &'a Atom>,
    {
        let reference: Vec<Point> = fixed.into_iter().map(|a| a.pos).collect();
        let coords: Vec<Point> = moving.into_iter().map(|a| a.pos).collect();

        let fit = match self.method {
            Method::Qcp => {
                let mut sup = QcpSuperimposer::new();
                sup.set(&reference, &coords)?;
                sup.run()?;
                *sup.fit()?
            }
            Method::Svd => {
                let mut sup = SvdSuperimposer::new();
                sup.set(&reference, &coords)?;
                sup.run()?;
                *sup.fit()?
            }
        };
        debug!(method = ?self.method, atoms = reference.len(), rms = fit.rms, "superposed");
        self.fit = Some(fit);
        Ok(())
    }

    pub fn rms(&self) -> Result<f64, Error> {
        Ok(self.fit.as_ref().ok_or(Error::NotRun)?.rms)
    }

    pub fn rotran(&self) -> Result<(Matrix3<f64>, Vector3<f64>), Error> {
        let fit = self.fit.as_ref().ok_or(Error::NotRun)?;
        Ok((fit.rotation, fit.translation))
    }

    /// Moves the given atoms with the fitted transform.
    pub fn apply<'a>(&self, atoms: impl IntoIterator<Item = &'a mut Atom>) -> Result<(), Error> {
        let fit = self.fit.as_ref().ok_or(Error::NotRun)?;
        for atom in atoms {
            atom.transform(&fit.rotation, &fit.translation);
        }
        Ok(())
    }

    /// Moves every atom of `structure`, including alternate conformers.
    pub fn apply_to_structure(&self, structure: &mut Structure) -> Result<(), Error> {
        let (rotation, translation) = self.rotran()?;
        Transform::apply(structure, &rotation, &translation);
        Ok(())
    }
}
