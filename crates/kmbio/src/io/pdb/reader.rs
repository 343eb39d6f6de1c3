//! PDB structure reader.
//!
//! Header records are collected in a first pass over the buffered lines, coordinates in a
//! second one that drives a [`StructureBuilder`]. Alternate locations, point mutations and
//! multiple models are preserved as they appear in the file.

use super::remark350::Remark350;
use crate::builder::StructureBuilder;
use crate::io::error::Error;
use crate::io::parser::{Parser, finish_structure};
use crate::model::atom::Atom;
use crate::model::header::Header;
use crate::model::structure::Structure;
use crate::model::types::{Element, Point};
use smol_str::SmolStr;
use std::io::BufRead;
use std::str::FromStr;
use tracing::warn;

const FORMAT: &str = "PDB";

/// Reader for legacy PDB files.
///
/// # Examples
///
/// ```
/// use kmbio::io::{Parser, PdbParser};
/// use std::io::Cursor;
///
/// let pdb = "\
/// HEADER    PLANT PROTEIN                           30-APR-81   1CRN
/// ATOM      1  N   THR A   1      17.047  14.099   3.625  1.00 13.79           N
/// ATOM      2  CA  THR A   1      16.967  12.784   4.338  1.00 10.80           C
/// END
/// ";
/// let structure = PdbParser::default()
///     .get_structure(Cursor::new(pdb), None, 0)
///     .unwrap();
/// assert_eq!(structure.id, "1CRN");
/// assert_eq!(structure.atom_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct PdbParser {
    /// Log construction problems (duplicate atoms, clashing residues) as warnings and keep
    /// going instead of failing.
    pub permissive: bool,
}

impl Default for PdbParser {
    fn default() -> Self {
        Self { permissive: true }
    }
}

impl PdbParser {
    pub fn new(permissive: bool) -> Self {
        Self { permissive }
    }

    /// Parses the header records of `lines` without building coordinates.
    pub fn parse_header<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Header, Error> {
        let mut header = Header::default();
        let mut remark350 = Remark350::new();
        let mut title = String::new();

        for (index, line) in lines.into_iter().enumerate() {
            let line_number = index + 1;
            match record_name(line) {
                "HEADER" => {
                    header.head = non_empty(columns(line, 10, 50));
                    header.deposition_date = non_empty(columns(line, 50, 59));
                    header.idcode = non_empty(columns(line, 62, 66));
                }
                "TITLE" => {
                    let text = columns(line, 10, 80).trim();
                    if !text.is_empty() {
                        if !title.is_empty() {
                            title.push(' ');
                        }
                        title.push_str(text);
                    }
                }
                "EXPDTA" => header.structure_method = non_empty(columns(line, 10, 79)),
                "REMARK" if line.starts_with("REMARK 350") => {
                    remark350.process_line(line, line_number)?;
                }
                "REMARK" if line.starts_with("REMARK   2 RESOLUTION.") => {
                    header.resolution = parse_resolution(line);
                }
                "ATOM" | "HETATM" | "MODEL" => break,
                _ => {}
            }
        }

        if !title.is_empty() {
            header.name = Some(title);
        }
        header.bioassembly_data = remark350.finish()?;
        Ok(header)
    }

    fn build(&self, lines: &[String], structure_id: Option<&str>) -> Result<Structure, Error> {
        let header = Self::parse_header(lines.iter().map(String::as_str))?;
        let structure_id = structure_id
            .map(str::to_string)
            .or_else(|| header.idcode.clone())
            .unwrap_or_default();

        let mut builder = StructureBuilder::new();
        builder.init_structure(&structure_id);
        builder.set_header(header);

        let mut state = CoordinateState::default();
        for (index, line) in lines.iter().enumerate() {
            let line_number = index + 1;
            builder.set_line_counter(line_number);
            match record_name(line) {
                "ATOM" | "HETATM" => {
                    let record = AtomRecord::parse(line, line_number)?;
                    self.handle(self.feed_atom(&mut builder, &mut state, record), line_number)?;
                }
                "MODEL" => {
                    let serial = columns(line, 10, 14)
                        .trim()
                        .parse::<usize>()
                        .unwrap_or(state.next_model + 1);
                    self.handle(builder.init_model(state.next_model, serial), line_number)?;
                    state.open_model();
                }
                "ENDMDL" => state.close_model(),
                "END" => break,
                _ => {}
            }
        }

        builder
            .get_structure()
            .map_err(|e| Error::construction(FORMAT, lines.len(), e))
    }

    fn feed_atom(
        &self,
        builder: &mut StructureBuilder,
        state: &mut CoordinateState,
        record: AtomRecord,
    ) -> Result<(), crate::builder::Error> {
        if !state.model_open {
            builder.init_model(state.next_model, state.next_model + 1)?;
            state.open_model();
        }

        if state.segid.as_deref() != Some(record.segid.as_str()) {
            builder.init_seg(&record.segid);
            state.segid = Some(record.segid.clone());
        }

        let residue_key = (record.field, record.resseq, record.icode, record.resname.clone());
        if state.chain.as_deref() != Some(record.chain.as_str()) {
            builder.init_chain(&record.chain)?;
            state.chain = Some(record.chain.clone());
            state.residue = None;
        }
        if state.residue.as_ref() != Some(&residue_key) {
            state.residue = Some(residue_key);
            builder.init_residue(&record.resname, record.field, record.resseq, record.icode)?;
        }

        builder.init_atom(record.atom)
    }

    fn handle(
        &self,
        result: Result<(), crate::builder::Error>,
        line_number: usize,
    ) -> Result<(), Error> {
        match result {
            Ok(()) => Ok(()),
            Err(err) if self.permissive => {
                warn!(line = line_number, "{err}");
                Ok(())
            }
            Err(err) => Err(Error::construction(FORMAT, line_number, err)),
        }
    }
}

impl Parser for PdbParser {
    fn get_structure<R: BufRead>(
        &self,
        reader: R,
        structure_id: Option<&str>,
        bioassembly: usize,
    ) -> Result<Structure, Error> {
        let lines = reader
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::from_io(e, None))?;
        let structure = self.build(&lines, structure_id)?;
        finish_structure(structure, bioassembly)
    }
}

/// Identity of the model, segment, chain and residue most recently passed to the builder.
#[derive(Debug, Default)]
struct CoordinateState {
    next_model: usize,
    model_open: bool,
    segid: Option<SmolStr>,
    chain: Option<SmolStr>,
    residue: Option<(char, i32, char, SmolStr)>,
}

impl CoordinateState {
    fn open_model(&mut self) {
        self.next_model += 1;
        self.model_open = true;
        self.segid = None;
        self.chain = None;
        self.residue = None;
    }

    fn close_model(&mut self) {
        self.model_open = false;
        self.segid = None;
        self.chain = None;
        self.residue = None;
    }
}

/// One `ATOM`/`HETATM` line split into its columns.
struct AtomRecord {
    field: char,
    resname: SmolStr,
    chain: SmolStr,
    resseq: i32,
    icode: char,
    segid: SmolStr,
    atom: Atom,
}

impl AtomRecord {
    fn parse(line: &str, line_number: usize) -> Result<Self, Error> {
        if line.len() < 54 {
            return Err(Error::parse(FORMAT, None, line_number, "Atom record too short"));
        }

        let fullname = columns(line, 12, 16);
        let name = match fullname.split_whitespace().collect::<Vec<_>>().as_slice() {
            [single] => single.to_string(),
            _ => fullname.to_string(),
        };
        let altloc = column_char(line, 16);
        let resname = SmolStr::new(columns(line, 17, 20).trim());
        let chain = SmolStr::new(column_char(line, 21).to_string());
        let serial_number = columns(line, 6, 11).trim().parse::<u32>().ok();

        let resseq = columns(line, 22, 26)
            .trim()
            .parse::<i32>()
            .map_err(|_| Error::parse(FORMAT, None, line_number, "Invalid residue sequence number"))?;
        let icode = column_char(line, 26);

        let field = if record_name(line) == "HETATM" {
            if resname == "HOH" || resname == "WAT" {
                'W'
            } else {
                'H'
            }
        } else {
            ' '
        };

        let x = parse_float(line, 30, 38, line_number, "Invalid X coordinate")?;
        let y = parse_float(line, 38, 46, line_number, "Invalid Y coordinate")?;
        let z = parse_float(line, 46, 54, line_number, "Invalid Z coordinate")?;

        let occupancy = match columns(line, 54, 60).trim() {
            "" => None,
            text => Some(text.parse::<f64>().map_err(|_| {
                Error::parse(FORMAT, None, line_number, "Invalid occupancy")
            })?),
        };
        let bfactor = match columns(line, 60, 66).trim() {
            "" => 0.0,
            text => text
                .parse::<f64>()
                .map_err(|_| Error::parse(FORMAT, None, line_number, "Invalid B-factor"))?,
        };
        let segid = SmolStr::new(columns(line, 72, 76));

        let element = match columns(line, 76, 78).trim() {
            "" => infer_element(fullname),
            symbol => Element::from_str(symbol).unwrap_or(Element::Unknown),
        };

        let mut atom = Atom::new(&name, element, Point::new(x, y, z))
            .with_altloc(altloc)
            .with_occupancy(occupancy)
            .with_bfactor(bfactor);
        atom.name = SmolStr::new(&name);
        atom.fullname = SmolStr::new(fullname);
        atom.serial_number = serial_number;

        Ok(Self {
            field,
            resname,
            chain,
            resseq,
            icode,
            segid,
            atom,
        })
    }
}

/// Infers an element from the four name columns when columns 77-78 are blank.
///
/// Names whose first column holds a letter (`FE  `, `CL1 `) are two-letter symbols; names
/// starting with a blank or a digit (` CA `, `1HB `) carry a one-letter symbol in the
/// next column.
fn infer_element(fullname: &str) -> Element {
    let mut chars = fullname.chars();
    let first = chars.next().unwrap_or(' ');
    let rest: String = chars.collect();

    let candidate = if first.is_ascii_alphabetic() && !rest.trim().chars().all(|c| c.is_ascii_digit()) {
        let pair: String = fullname.chars().take(2).collect();
        match Element::from_str(&pair) {
            Ok(el) if el.is_known() => return el,
            _ => first.to_string(),
        }
    } else if first.is_ascii_alphabetic() {
        first.to_string()
    } else {
        rest.chars().next().unwrap_or(' ').to_string()
    };

    Element::from_str(&candidate).unwrap_or(Element::Unknown)
}

fn parse_resolution(line: &str) -> Option<f64> {
    line.split_whitespace()
        .skip_while(|token| *token != "RESOLUTION.")
        .nth(1)
        .and_then(|value| value.parse::<f64>().ok())
}

fn record_name(line: &str) -> &str {
    columns(line, 0, 6).trim_end()
}

/// Columns `start..end` (0-based, end exclusive), clipped to the line.
fn columns(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or("")
}

fn column_char(line: &str, index: usize) -> char {
    columns(line, index, index + 1).chars().next().unwrap_or(' ')
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn parse_float(
    line: &str,
    start: usize,
    end: usize,
    line_number: usize,
    details: &'static str,
) -> Result<f64, Error> {
    columns(line, start, end)
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::parse(FORMAT, None, line_number, details))
}
