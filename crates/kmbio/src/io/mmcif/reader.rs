//! mmCIF structure reader.
//!
//! The file is first flattened into an [`MmcifDict`]; `_atom_site` rows then drive the
//! same [`StructureBuilder`] the PDB reader uses, so disorder handling is identical for
//! both formats.

use super::bioassembly::get_mmcif_bioassembly_data;
use super::dict::{MmcifDict, is_null};
use crate::builder::{self, StructureBuilder};
use crate::io::error::Error;
use crate::io::parser::{Parser, finish_structure};
use crate::model::atom::Atom;
use crate::model::header::Header;
use crate::model::structure::Structure;
use crate::model::types::{Element, Point};
use std::io::BufRead;
use std::str::FromStr;
use tracing::warn;

const FORMAT: &str = "mmCIF";

/// Reader for PDBx/mmCIF files.
///
/// # Examples
///
/// ```
/// use kmbio::io::{MmcifParser, Parser};
///
/// let cif = "\
/// data_1ABC
/// loop_
/// _atom_site.group_PDB
/// _atom_site.id
/// _atom_site.type_symbol
/// _atom_site.label_atom_id
/// _atom_site.label_alt_id
/// _atom_site.label_comp_id
/// _atom_site.label_asym_id
/// _atom_site.label_seq_id
/// _atom_site.pdbx_PDB_ins_code
/// _atom_site.Cartn_x
/// _atom_site.Cartn_y
/// _atom_site.Cartn_z
/// _atom_site.occupancy
/// _atom_site.B_iso_or_equiv
/// _atom_site.auth_seq_id
/// _atom_site.auth_asym_id
/// _atom_site.pdbx_PDB_model_num
/// ATOM 1 N N . GLY A 1 ? 1.0 2.0 3.0 1.00 10.0 5 X 1
/// ";
/// let structure = MmcifParser::default()
///     .get_structure(cif.as_bytes(), None, 0)
///     .unwrap();
/// assert_eq!(structure.id, "1ABC");
/// let chain = structure.iter_chains().next().unwrap();
/// assert_eq!(chain.id, "X");
/// assert_eq!(chain.iter_residues().next().unwrap().id.seq, 5);
/// ```
#[derive(Debug, Clone)]
pub struct MmcifParser {
    /// Use author chain ids and residue numbers (`auth_asym_id`, `auth_seq_id`) instead
    /// of the label ones.
    pub use_auth_id: bool,
    /// Log construction problems as warnings instead of failing.
    pub permissive: bool,
}

impl Default for MmcifParser {
    fn default() -> Self {
        Self {
            use_auth_id: true,
            permissive: true,
        }
    }
}

impl MmcifParser {
    pub fn new(use_auth_id: bool) -> Self {
        Self {
            use_auth_id,
            ..Self::default()
        }
    }

    /// Builds the header (including assemblies) of an already parsed file.
    pub fn parse_header(&self, dict: &MmcifDict) -> Result<Header, Error> {
        let resolution = dict
            .value("_refine.ls_d_res_high")
            .or_else(|| dict.value("_reflns.d_resolution_high"))
            .and_then(|v| v.parse::<f64>().ok());

        Ok(Header {
            idcode: dict.value("_entry.id").map(str::to_string),
            name: dict.value("_struct.title").map(str::to_string),
            head: dict
                .value("_struct_keywords.pdbx_keywords")
                .map(str::to_string),
            deposition_date: dict
                .value("_pdbx_database_status.recvd_initial_deposition_date")
                .map(str::to_string),
            structure_method: dict.value("_exptl.method").map(str::to_string),
            resolution,
            bioassembly_data: get_mmcif_bioassembly_data(dict, self.use_auth_id)?,
        })
    }

    /// Builds the deposited structure from an already parsed file.
    pub fn structure_from_dict(
        &self,
        dict: &MmcifDict,
        structure_id: Option<&str>,
    ) -> Result<Structure, Error> {
        let structure_id = structure_id
            .or_else(|| dict.first("data_"))
            .or_else(|| dict.value("_entry.id"))
            .unwrap_or_default()
            .to_string();

        let mut builder = StructureBuilder::new();
        builder.init_structure(&structure_id);
        builder.set_header(self.parse_header(dict)?);
        builder.init_seg(" ");

        let sites = AtomSiteColumns::new(dict)?;
        let mut state = SiteState::default();
        for row in 0..sites.len() {
            let row_number = row + 1;
            builder.set_line_counter(row_number);
            let site = sites.row(row, self.use_auth_id)?;

            let model_key = sites.model_num(row).unwrap_or_default();
            if state.model.as_deref() != Some(model_key) {
                let serial = model_key.parse::<usize>().unwrap_or(state.next_model + 1);
                self.handle(builder.init_model(state.next_model, serial), row_number)?;
                state.open_model(model_key);
            }

            self.handle(self.feed_site(&mut builder, &mut state, site), row_number)?;
        }

        builder
            .get_structure()
            .map_err(|e| Error::construction(FORMAT, sites.len(), e))
    }

    fn feed_site(
        &self,
        builder: &mut StructureBuilder,
        state: &mut SiteState,
        site: AtomSite<'_>,
    ) -> Result<(), builder::Error> {
        if state.chain.as_deref() != Some(site.chain) {
            builder.init_chain(site.chain)?;
            state.chain = Some(site.chain.to_string());
            state.residue = None;
        }
        let residue_key = (site.field, site.resseq, site.icode, site.resname.to_string());
        if state.residue.as_ref() != Some(&residue_key) {
            state.residue = Some(residue_key);
            builder.init_residue(site.resname, site.field, site.resseq, site.icode)?;
        }
        builder.init_atom(site.atom)
    }

    fn handle(&self, result: Result<(), builder::Error>, row: usize) -> Result<(), Error> {
        match result {
            Ok(()) => Ok(()),
            Err(err) if self.permissive => {
                warn!(atom_site_row = row, "{err}");
                Ok(())
            }
            Err(err) => Err(Error::construction(FORMAT, row, err)),
        }
    }
}

impl Parser for MmcifParser {
    fn get_structure<R: BufRead>(
        &self,
        reader: R,
        structure_id: Option<&str>,
        bioassembly: usize,
    ) -> Result<Structure, Error> {
        let dict = MmcifDict::from_reader(reader)?;
        let structure = self.structure_from_dict(&dict, structure_id)?;
        finish_structure(structure, bioassembly)
    }
}

/// Change detection across consecutive `_atom_site` rows.
#[derive(Default)]
struct SiteState {
    next_model: usize,
    model: Option<String>,
    chain: Option<String>,
    residue: Option<(char, i32, char, String)>,
}

impl SiteState {
    fn open_model(&mut self, key: &str) {
        self.next_model += 1;
        self.model = Some(key.to_string());
        self.chain = None;
        self.residue = None;
    }
}

/// Column slices of the `_atom_site` table.
struct AtomSiteColumns<'a> {
    group: Option<&'a [String]>,
    id: Option<&'a [String]>,
    type_symbol: Option<&'a [String]>,
    atom_id: &'a [String],
    alt_id: Option<&'a [String]>,
    comp_id: &'a [String],
    label_asym_id: Option<&'a [String]>,
    auth_asym_id: Option<&'a [String]>,
    label_seq_id: Option<&'a [String]>,
    auth_seq_id: Option<&'a [String]>,
    ins_code: Option<&'a [String]>,
    x: &'a [String],
    y: &'a [String],
    z: &'a [String],
    occupancy: Option<&'a [String]>,
    b_iso: Option<&'a [String]>,
    model_num: Option<&'a [String]>,
}

/// One `_atom_site` row converted for the builder.
struct AtomSite<'a> {
    field: char,
    resname: &'a str,
    chain: &'a str,
    resseq: i32,
    icode: char,
    atom: Atom,
}

impl<'a> AtomSiteColumns<'a> {
    fn new(dict: &'a MmcifDict) -> Result<Self, Error> {
        let required = |key: &str| {
            dict.get(key).ok_or_else(|| {
                Error::inconsistent_data(FORMAT, None, format!("missing item '{key}'"))
            })
        };
        let columns = Self {
            group: dict.get("_atom_site.group_PDB"),
            id: dict.get("_atom_site.id"),
            type_symbol: dict.get("_atom_site.type_symbol"),
            atom_id: required("_atom_site.label_atom_id")?,
            alt_id: dict.get("_atom_site.label_alt_id"),
            comp_id: required("_atom_site.label_comp_id")?,
            label_asym_id: dict.get("_atom_site.label_asym_id"),
            auth_asym_id: dict.get("_atom_site.auth_asym_id"),
            label_seq_id: dict.get("_atom_site.label_seq_id"),
            auth_seq_id: dict.get("_atom_site.auth_seq_id"),
            ins_code: dict.get("_atom_site.pdbx_PDB_ins_code"),
            x: required("_atom_site.Cartn_x")?,
            y: required("_atom_site.Cartn_y")?,
            z: required("_atom_site.Cartn_z")?,
            occupancy: dict.get("_atom_site.occupancy"),
            b_iso: dict.get("_atom_site.B_iso_or_equiv"),
            model_num: dict.get("_atom_site.pdbx_PDB_model_num"),
        };
        Ok(columns)
    }

    fn len(&self) -> usize {
        self.atom_id.len()
    }

    fn model_num(&self, row: usize) -> Option<&'a str> {
        cell(self.model_num, row)
    }

    fn row(&self, row: usize, use_auth_id: bool) -> Result<AtomSite<'a>, Error> {
        let invalid = |item: &str, value: &str| {
            Error::inconsistent_data(
                FORMAT,
                None,
                format!("_atom_site row {}: invalid {item} '{value}'", row + 1),
            )
        };
        let required = |column: &'a [String], item: &str| {
            column
                .get(row)
                .map(String::as_str)
                .ok_or_else(|| invalid(item, "<missing>"))
        };

        let name = required(self.atom_id, "label_atom_id")?;
        let resname = required(self.comp_id, "label_comp_id")?;

        let (chain_column, seq_column) = if use_auth_id {
            (self.auth_asym_id, self.auth_seq_id)
        } else {
            (self.label_asym_id, self.label_seq_id)
        };
        let chain = cell(chain_column, row).ok_or_else(|| invalid("asym_id", "<missing>"))?;

        let seq_text = match cell(seq_column, row) {
            Some(value) if !is_null(value) => value,
            _ => cell(self.auth_seq_id, row)
                .filter(|v| !is_null(v))
                .ok_or_else(|| invalid("seq_id", "."))?,
        };
        let resseq = seq_text
            .parse::<i32>()
            .map_err(|_| invalid("seq_id", seq_text))?;

        let icode = flag_char(cell(self.ins_code, row));
        let altloc = flag_char(cell(self.alt_id, row));

        let field = match cell(self.group, row) {
            Some("HETATM") if resname == "HOH" || resname == "WAT" => 'W',
            Some("HETATM") => 'H',
            _ => ' ',
        };

        let coordinate = |column: &'a [String], item: &str| -> Result<f64, Error> {
            let text = required(column, item)?;
            text.parse::<f64>().map_err(|_| invalid(item, text))
        };
        let pos = Point::new(
            coordinate(self.x, "Cartn_x")?,
            coordinate(self.y, "Cartn_y")?,
            coordinate(self.z, "Cartn_z")?,
        );

        let occupancy = match cell(self.occupancy, row) {
            Some(text) if !is_null(text) => {
                Some(text.parse::<f64>().map_err(|_| invalid("occupancy", text))?)
            }
            _ => None,
        };
        let bfactor = match cell(self.b_iso, row) {
            Some(text) if !is_null(text) => text
                .parse::<f64>()
                .map_err(|_| invalid("B_iso_or_equiv", text))?,
            _ => 0.0,
        };
        let element = cell(self.type_symbol, row)
            .filter(|v| !is_null(v))
            .map(|symbol| Element::from_str(symbol).unwrap_or(Element::Unknown))
            .unwrap_or(Element::Unknown);

        let mut atom = Atom::new(name, element, pos)
            .with_altloc(altloc)
            .with_occupancy(occupancy)
            .with_bfactor(bfactor);
        atom.serial_number = cell(self.id, row).and_then(|v| v.parse::<u32>().ok());

        Ok(AtomSite {
            field,
            resname,
            chain,
            resseq,
            icode,
            atom,
        })
    }
}

fn cell(column: Option<&[String]>, row: usize) -> Option<&str> {
    column?.get(row).map(String::as_str)
}

/// Altloc / insertion code: null markers become a blank.
fn flag_char(value: Option<&str>) -> char {
    match value {
        Some(v) if !is_null(v) => v.chars().next().unwrap_or(' '),
        _ => ' ',
    }
}
