use super::atom::Atom;
use super::chain::Chain;
use std::fmt;

/// One coordinate set of a structure (an NMR conformer, or a bioassembly copy).
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Zero-based position of the model within its structure.
    pub id: usize,
    /// Serial number from the `MODEL` record (or assigned on creation).
    pub serial_num: usize,
    chains: Vec<Chain>,
}

impl Model {
    pub fn new(id: usize, serial_num: usize) -> Self {
        Self {
            id,
            serial_num,
            chains: Vec::new(),
        }
    }

    pub fn add_chain(&mut self, chain: Chain) {
        debug_assert!(
            self.chain(&chain.id).is_none(),
            "Attempted to add a duplicate chain ID '{}' to model {}",
            chain.id,
            self.id
        );
        self.chains.push(chain);
    }

    pub fn remove_chain(&mut self, id: &str) -> Option<Chain> {
        let index = self.chains.iter().position(|c| c.id == id)?;
        Some(self.chains.remove(index))
    }

    pub fn chain(&self, id: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }

    pub fn chain_mut(&mut self, id: &str) -> Option<&mut Chain> {
        self.chains.iter_mut().find(|c| c.id == id)
    }

    pub(crate) fn chain_position(&self, id: &str) -> Option<usize> {
        self.chains.iter().position(|c| c.id == id)
    }

    pub(crate) fn chain_at_mut(&mut self, index: usize) -> Option<&mut Chain> {
        self.chains.get_mut(index)
    }

    pub fn has_chain(&self, id: &str) -> bool {
        self.chain(id).is_some()
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn residue_count(&self) -> usize {
        self.chains.iter().map(|c| c.residue_count()).sum()
    }

    pub fn atom_count(&self) -> usize {
        self.iter_atoms().count()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn iter_chains(&self) -> std::slice::Iter<'_, Chain> {
        self.chains.iter()
    }

    pub fn iter_chains_mut(&mut self) -> std::slice::IterMut<'_, Chain> {
        self.chains.iter_mut()
    }

    pub(crate) fn chains_mut(&mut self) -> &mut [Chain] {
        &mut self.chains
    }

    pub fn iter_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.chains.iter().flat_map(|c| c.iter_atoms())
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Model {{ id: {}, serial: {}, chains: {} }}",
            self.id,
            self.serial_num,
            self.chain_count()
        )
    }
}

impl FromIterator<Chain> for Model {
    fn from_iter<I: IntoIterator<Item = Chain>>(iter: I) -> Self {
        let mut model = Model::new(0, 1);
        for chain in iter {
            model.add_chain(chain);
        }
        model
    }
}
