//! Expansion of biological assemblies into explicit copies.

use super::error::Error;
use super::transform::Transform;
use crate::model::model::Model;
use crate::model::structure::Structure;
use tracing::{debug, warn};

/// Builds biological assembly `bioassembly_id` from the first model of `structure`.
///
/// Each transform of each assembly operation produces one model holding transformed
/// copies of the operation's chains, in operation order and then transform order. Model
/// ids run from `0` and serial numbers from `1`, matching the layout of deposited
/// biounit files. Chains named by the assembly but absent from the structure are skipped
/// with a warning.
///
/// # Errors
///
/// [`Error::UnknownBioassembly`] when the header does not define the assembly,
/// [`Error::EmptyStructure`] when there is no model to copy from.
pub fn apply_bioassembly(structure: &Structure, bioassembly_id: usize) -> Result<Structure, Error> {
    let key = bioassembly_id.to_string();
    let assembly = structure
        .header
        .bioassembly_data
        .get(&key)
        .ok_or_else(|| {
            Error::unknown_bioassembly(&key, structure.header.bioassembly_data.keys())
        })?;
    let source = structure
        .first_model()
        .ok_or_else(|| Error::EmptyStructure {
            structure_id: structure.id.clone(),
        })?;

    let mut expanded = Structure::new(&structure.id);
    expanded.header = structure.header.clone();

    let copies = assembly
        .operations
        .iter()
        .flat_map(|op| op.transforms.iter().map(move |t| (op, t)));

    for (index, (operation, biomt)) in copies.enumerate() {
        let mut model = Model::new(index, index + 1);

        for chain_id in &operation.chains {
            let Some(chain) = source.chain(chain_id) else {
                warn!(
                    chain = %chain_id,
                    bioassembly = %key,
                    "chain referenced by the bioassembly is missing from the structure"
                );
                continue;
            };
            if model.has_chain(chain_id) {
                continue;
            }
            model.add_chain(chain.clone());
        }
        Transform::apply_biomt(&mut model, biomt);

        debug!(model = index, chains = model.chain_count(), "bioassembly copy built");
        expanded.add_model(model);
    }

    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atom::Atom;
    use crate::model::chain::Chain;
    use crate::model::header::{AssemblyOperation, Bioassembly, Biomt};
    use crate::model::residue::Residue;
    use crate::model::types::{Element, Point, ResidueId};

    fn dimer_source() -> Structure {
        let mut model = Model::new(0, 1);
        for (id, x) in [("A", 1.0), ("B", 5.0)] {
            let mut residue = Residue::new(ResidueId::standard(1), "ALA", " ");
            residue.add_atom(Atom::new("CA", Element::C, Point::new(x, 0.0, 0.0)));
            let mut chain = Chain::new(id);
            chain.add_residue(residue);
            model.add_chain(chain);
        }
        let mut structure = Structure::new("1abc");
        structure.add_model(model);

        let shift = Biomt {
            translation: [0.0, 10.0, 0.0],
            ..Biomt::identity()
        };
        let mut assembly = Bioassembly::new("1");
        assembly.operations.push(AssemblyOperation {
            chains: vec!["A".into(), "C".into()],
            transforms: vec![Biomt::identity(), shift],
        });
        assembly.operations.push(AssemblyOperation {
            chains: vec!["B".into()],
            transforms: vec![shift],
        });
        structure
            .header
            .bioassembly_data
            .insert("1".into(), assembly);
        structure
    }

    #[test]
    fn every_transform_becomes_a_model() {
        let expanded = apply_bioassembly(&dimer_source(), 1).unwrap();

        assert_eq!(expanded.id, "1abc");
        assert_eq!(expanded.model_count(), 3);
        let ids: Vec<(usize, usize)> = expanded.iter_models().map(|m| (m.id, m.serial_num)).collect();
        assert_eq!(ids, vec![(0, 1), (1, 2), (2, 3)]);

        let first = expanded.model(0).unwrap();
        assert!(first.has_chain("A"));
        assert!(!first.has_chain("C"));
        let y: Vec<f64> = expanded.iter_atoms().map(|a| a.pos.y).collect();
        assert_eq!(y, vec![0.0, 10.0, 10.0]);
        let last = expanded.model(2).unwrap();
        assert_eq!(last.iter_chains().next().unwrap().id, "B");
    }

    #[test]
    fn source_structure_is_not_moved() {
        let source = dimer_source();
        apply_bioassembly(&source, 1).unwrap();
        let y: Vec<f64> = source.iter_atoms().map(|a| a.pos.y).collect();
        assert_eq!(y, vec![0.0, 0.0]);
    }

    #[test]
    fn unknown_bioassembly_lists_available_ids() {
        let err = apply_bioassembly(&dimer_source(), 3).unwrap_err();
        assert_eq!(err.to_string(), "bioassembly 3 is not defined (available: 1)");
    }

    #[test]
    fn empty_structure_cannot_be_expanded() {
        let mut structure = Structure::new("none");
        structure
            .header
            .bioassembly_data
            .insert("1".into(), Bioassembly::new("1"));
        assert!(matches!(
            apply_bioassembly(&structure, 1),
            Err(Error::EmptyStructure { .. })
        ));
    }
}
