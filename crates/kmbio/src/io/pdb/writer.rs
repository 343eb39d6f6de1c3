//! PDB writer with entity selection and configurable atom numbering.

use crate::io::error::Error;
use crate::model::atom::Atom;
use crate::model::chain::Chain;
use crate::model::model::Model;
use crate::model::residue::Residue;
use crate::model::structure::Structure;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

const FORMAT: &str = "PDB";
const LINE_WIDTH: usize = 80;

/// Decides which entities are written.
///
/// Every method defaults to accepting everything; implementors override the levels they
/// want to filter.
pub trait Select {
    fn accept_model(&self, _model: &Model) -> bool {
        true
    }

    fn accept_chain(&self, _chain: &Chain) -> bool {
        true
    }

    fn accept_residue(&self, _residue: &Residue) -> bool {
        true
    }

    fn accept_atom(&self, _atom: &Atom) -> bool {
        true
    }

    /// Altloc written for an accepted atom.
    fn altloc(&self, atom: &Atom) -> char {
        atom.altloc
    }
}

/// Writes every model, chain, residue and conformer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectAll;

impl Select for SelectAll {}

/// Drops alternate conformers.
///
/// Ordered atoms are kept; of a disordered atom only the `A` conformer is written, with a
/// blank altloc. A disordered residue is kept when at least one of its atoms is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotDisordered;

impl Select for NotDisordered {
    fn accept_residue(&self, residue: &Residue) -> bool {
        if !residue.disordered || residue.unpacked_atoms().any(|a| self.accept_atom(a)) {
            true
        } else {
            debug!(residue = %residue, "ignoring residue");
            false
        }
    }

    fn accept_atom(&self, atom: &Atom) -> bool {
        if !atom.disordered || atom.altloc == 'A' {
            true
        } else {
            debug!(atom = %atom, "ignoring atom");
            false
        }
    }

    fn altloc(&self, atom: &Atom) -> char {
        if atom.disordered { ' ' } else { atom.altloc }
    }
}

/// How serial numbers are assigned to `ATOM`/`HETATM` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtomNumbering {
    /// Reuse each atom's `serial_number`.
    Keep,
    /// Count from 1 within each model.
    ByModel,
    /// Count from 1 within each chain.
    #[default]
    ByChain,
}

#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// Terminate the output with an `END` record.
    pub write_end: bool,
    pub numbering: AtomNumbering,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            write_end: true,
            numbering: AtomNumbering::ByChain,
        }
    }
}

/// Serializes structures as PDB text.
///
/// # Examples
///
/// ```
/// use kmbio::io::{PdbWriter, SaveOptions, SelectAll};
/// use kmbio::{Atom, Element, Point, Structure};
///
/// let structure = Structure::from(Atom::new("ZN", Element::Zn, Point::new(1.0, 2.0, 3.0)));
/// let mut out = Vec::new();
/// PdbWriter::default()
///     .write(&mut out, &structure, &SelectAll, &SaveOptions::default())
///     .unwrap();
/// let text = String::from_utf8(out).unwrap();
/// assert!(text.starts_with("ATOM      1  ZN  DUM A   1"));
/// assert!(text.ends_with("TER\nEND\n"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PdbWriter {
    /// Emit `MODEL`/`ENDMDL` records even for single-model structures.
    pub use_model_flag: bool,
}

impl PdbWriter {
    pub fn new(use_model_flag: bool) -> Self {
        Self { use_model_flag }
    }

    /// Writes the entities of `structure` accepted by `select`.
    ///
    /// # Errors
    ///
    /// [`Error::Write`] when [`AtomNumbering::Keep`] meets an atom without serial number or
    /// a record does not fit the fixed columns (e.g. a residue number above 9999);
    /// [`Error::Io`] for failures of the underlying writer.
    pub fn write<W: Write, S: Select + ?Sized>(
        &self,
        writer: W,
        structure: &Structure,
        select: &S,
        options: &SaveOptions,
    ) -> Result<(), Error> {
        let mut ctx = WriterContext {
            writer,
            select,
            numbering: options.numbering,
            atom_number: 1,
        };
        let model_flag = structure.model_count() > 1 || self.use_model_flag;

        for model in structure.iter_models() {
            if !select.accept_model(model) {
                continue;
            }
            if options.numbering == AtomNumbering::ByModel {
                ctx.atom_number = 1;
            }
            if model_flag {
                ctx.write_line(&format!("MODEL      {}", model.serial_num))?;
            }

            let mut model_written = false;
            for chain in model.iter_chains() {
                if select.accept_chain(chain) {
                    model_written |= ctx.write_chain(chain)?;
                }
            }

            if model_flag && model_written {
                ctx.write_line("ENDMDL")?;
            }
        }

        if options.write_end {
            ctx.write_line("END")?;
        }
        ctx.writer.flush().map_err(|e| Error::from_io(e, None))
    }
}

/// Writes `structure` to `path` with default numbering and an `END` record.
///
/// With `include_disordered == false` the [`NotDisordered`] selection is applied.
pub fn save_structure(
    structure: &Structure,
    path: impl AsRef<Path>,
    include_disordered: bool,
) -> Result<(), Error> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::from_io(e, Some(path.to_path_buf())))?;
    let writer = BufWriter::new(file);
    let options = SaveOptions::default();
    let pdb = PdbWriter::default();
    if include_disordered {
        pdb.write(writer, structure, &SelectAll, &options)
    } else {
        pdb.write(writer, structure, &NotDisordered, &options)
    }
}

struct WriterContext<'s, W, S: ?Sized> {
    writer: W,
    select: &'s S,
    numbering: AtomNumbering,
    atom_number: u32,
}

impl<W: Write, S: Select + ?Sized> WriterContext<'_, W, S> {
    /// Writes the accepted atoms of one chain followed by `TER`. Returns whether any atom
    /// was written.
    fn write_chain(&mut self, chain: &Chain) -> Result<bool, Error> {
        if self.numbering == AtomNumbering::ByChain {
            self.atom_number = 1;
        }

        let mut written = false;
        for residue in chain.unpacked_residues() {
            if !self.select.accept_residue(residue) {
                continue;
            }
            for atom in residue.unpacked_atoms() {
                if !self.select.accept_atom(atom) {
                    continue;
                }
                let serial = match self.numbering {
                    AtomNumbering::Keep => atom.serial_number.ok_or_else(|| {
                        Error::write(
                            FORMAT,
                            format!(
                                "atom '{}' of residue {} has no serial number to keep",
                                atom.name, residue.id
                            ),
                        )
                    })?,
                    _ => self.atom_number,
                };
                let line = format_atom_line(
                    atom,
                    self.select.altloc(atom),
                    residue,
                    &chain.id,
                    serial,
                )?;
                self.write_line(&line)?;
                self.atom_number = serial + 1;
                written = true;
            }
        }

        if written {
            self.write_line("TER")?;
        }
        Ok(written)
    }

    fn write_line(&mut self, line: &str) -> Result<(), Error> {
        writeln!(self.writer, "{line}").map_err(|e| Error::from_io(e, None))
    }
}

/// Formats one fixed-width `ATOM`/`HETATM` record (without the newline).
fn format_atom_line(
    atom: &Atom,
    altloc: char,
    residue: &Residue,
    chain_id: &str,
    serial: u32,
) -> Result<String, Error> {
    let record_type = if residue.id.hetfield.is_standard() {
        "ATOM  "
    } else {
        "HETATM"
    };
    let element = if atom.element.is_known() {
        atom.element.symbol().to_uppercase()
    } else {
        String::new()
    };
    let name = format!("{:<3}", atom.fullname.trim());

    let occupancy = match atom.occupancy {
        Some(occupancy) => format!("{occupancy:6.2}"),
        None => {
            warn!(atom = %atom.name, residue = %residue.id, "missing occupancy written as blank");
            " ".repeat(6)
        }
    };
    let mut bfactor = format!("{:6.2}", atom.bfactor);
    if bfactor.len() > 6 {
        if let Some(dot) = bfactor.find('.') {
            bfactor.truncate(dot);
        }
    }

    let line = format!(
        "{record_type:6}{serial:>5} {name:>4}{altloc}{resname:>3}{chain_id:>2}{resseq:>4}{icode}   \
         {x:8.3}{y:8.3}{z:8.3}{occupancy:6}{bfactor:6}      {segid:<4}{element:>2}  ",
        resname = residue.name,
        resseq = residue.id.seq,
        icode = residue.id.icode,
        x = atom.pos.x,
        y = atom.pos.y,
        z = atom.pos.z,
        segid = residue.segid,
    );

    if line.len() != LINE_WIDTH {
        return Err(Error::write(
            FORMAT,
            format!(
                "atom '{}' of residue {} in chain '{chain_id}' does not fit in {LINE_WIDTH} columns",
                atom.name, residue.id
            ),
        ));
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parser::Parser;
    use crate::io::pdb::reader::PdbParser;
    use crate::model::atom::{AtomEntry, DisorderedAtom};
    use crate::model::compare::{DEFAULT_TOLERANCE, allequal};
    use crate::model::types::{Element, HetField, Point, ResidueId};
    use std::io::Cursor;

    fn atom(name: &str, element: Element, x: f64) -> Atom {
        Atom::new(name, element, Point::new(x, 2.0, 3.0)).with_bfactor(10.0)
    }

    fn two_chain_structure() -> Structure {
        let mut model = Model::new(0, 1);

        let mut ala = Residue::new(ResidueId::standard(1), "ALA", "    ");
        ala.add_atom(atom("N", Element::N, 1.0));
        ala.add_atom(atom("CA", Element::C, 2.0));
        let mut a = Chain::new("A");
        a.add_residue(ala);
        model.add_chain(a);

        let mut zn = Residue::new(
            ResidueId::new(HetField::Hetero("ZN".into()), 101, ' '),
            "ZN",
            "    ",
        );
        let mut zn_atom = atom("ZN", Element::Zn, 5.0);
        zn_atom.fullname = "ZN  ".into();
        zn.add_atom(zn_atom);
        let mut b = Chain::new("B");
        b.add_residue(zn);
        model.add_chain(b);

        Structure::from(model)
    }

    fn render<S: Select>(
        structure: &Structure,
        writer: PdbWriter,
        select: &S,
        options: SaveOptions,
    ) -> String {
        let mut out = Vec::new();
        writer.write(&mut out, structure, select, &options).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn atom_lines_use_fixed_columns() {
        let text = render(
            &two_chain_structure(),
            PdbWriter::default(),
            &SelectAll,
            SaveOptions::default(),
        );
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "ATOM      1  N   ALA A   1       1.000   2.000   3.000  1.00 10.00           N  ",
                "ATOM      2  CA  ALA A   1       2.000   2.000   3.000  1.00 10.00           C  ",
                "TER",
                "HETATM    1  ZN   ZN B 101       5.000   2.000   3.000  1.00 10.00          ZN  ",
                "TER",
                "END",
            ]
        );
        assert!(lines.iter().filter(|l| l.len() > 6).all(|l| l.len() == 80));
    }

    #[test]
    fn segid_occupies_the_columns_the_reader_parses() {
        let mut gly = Residue::new(ResidueId::standard(7), "GLY", "SEG1");
        gly.add_atom(atom("CA", Element::C, 1.0));
        let mut chain = Chain::new("A");
        chain.add_residue(gly);
        let structure = Structure::from(chain);

        let text = render(
            &structure,
            PdbWriter::default(),
            &SelectAll,
            SaveOptions::default(),
        );
        let line = text.lines().next().unwrap();
        assert_eq!(&line[66..72], "      ");
        assert_eq!(&line[72..76], "SEG1");
        assert_eq!(&line[76..78], " C");

        let reread = PdbParser::default()
            .get_structure(Cursor::new(text), None, 0)
            .unwrap();
        let residue = reread.iter_chains().next().unwrap().iter_residues().next().unwrap();
        assert_eq!(residue.segid, "SEG1");
    }

    #[test]
    fn numbering_by_model_continues_across_chains() {
        let options = SaveOptions {
            numbering: AtomNumbering::ByModel,
            write_end: false,
        };
        let text = render(&two_chain_structure(), PdbWriter::default(), &SelectAll, options);
        let serials: Vec<&str> = text
            .lines()
            .filter(|l| l.len() == 80)
            .map(|l| l[6..11].trim())
            .collect();
        assert_eq!(serials, vec!["1", "2", "3"]);
        assert!(!text.contains("END\n"));
    }

    #[test]
    fn numbering_keep_uses_serials_and_requires_them() {
        let mut structure = two_chain_structure();
        let options = SaveOptions {
            numbering: AtomNumbering::Keep,
            ..SaveOptions::default()
        };

        let mut out = Vec::new();
        let err = PdbWriter::default()
            .write(&mut out, &structure, &SelectAll, &options)
            .unwrap_err();
        assert!(matches!(err, Error::Write { .. }));

        for (serial, chain) in (10..).zip(structure.iter_models_mut().flat_map(|m| m.iter_chains_mut())) {
            for atom in chain.unpacked_atoms_mut() {
                atom.serial_number = Some(serial);
            }
        }
        let text = render(&structure, PdbWriter::default(), &SelectAll, options);
        let serials: Vec<&str> = text
            .lines()
            .filter(|l| l.len() == 80)
            .map(|l| l[6..11].trim())
            .collect();
        assert_eq!(serials, vec!["10", "10", "11"]);
    }

    #[test]
    fn blank_occupancy_and_wide_bfactor() {
        let mut residue = Residue::new(ResidueId::standard(7), "GLY", "    ");
        residue.add_atom(
            Atom::new("CA", Element::C, Point::new(0.0, 0.0, 0.0))
                .with_occupancy(None)
                .with_bfactor(1234.5),
        );
        let text = render(
            &Structure::from(residue),
            PdbWriter::default(),
            &SelectAll,
            SaveOptions::default(),
        );
        let line = text.lines().next().unwrap();
        assert_eq!(&line[54..60], "      ");
        assert_eq!(&line[60..66], "1234  ");
        assert_eq!(line.len(), 80);
    }

    #[test]
    fn model_records_follow_model_flag() {
        let single = render(
            &two_chain_structure(),
            PdbWriter::new(true),
            &SelectAll,
            SaveOptions::default(),
        );
        assert!(single.starts_with("MODEL      1\n"));
        assert!(single.ends_with("TER\nENDMDL\nEND\n"));

        let mut structure = two_chain_structure();
        let mut empty = Model::new(1, 2);
        empty.add_chain(Chain::new("C"));
        structure.add_model(empty);
        let multi = render(&structure, PdbWriter::default(), &SelectAll, SaveOptions::default());
        assert_eq!(multi.matches("MODEL ").count(), 2);
        assert_eq!(multi.matches("ENDMDL").count(), 1);
        assert!(multi.ends_with("ENDMDL\nMODEL      2\nEND\n"));
    }

    #[test]
    fn not_disordered_keeps_altloc_a_with_blank_flag() {
        let mut residue = Residue::new(ResidueId::standard(3), "SER", "    ");
        residue.add_atom(atom("CA", Element::C, 1.0));
        let mut og = DisorderedAtom::new("OG");
        og.add(atom("OG", Element::O, 2.0).with_altloc('A').with_occupancy(Some(0.4)));
        og.add(atom("OG", Element::O, 2.5).with_altloc('B').with_occupancy(Some(0.6)));
        residue.add_entry(AtomEntry::Disordered(og));
        residue.disordered = true;
        let structure = Structure::from(residue);

        let all = render(&structure, PdbWriter::default(), &SelectAll, SaveOptions::default());
        let altlocs: Vec<char> = all
            .lines()
            .filter(|l| l.len() == 80)
            .map(|l| l.as_bytes()[16] as char)
            .collect();
        assert_eq!(altlocs, vec![' ', 'A', 'B']);

        let trimmed = render(&structure, PdbWriter::default(), &NotDisordered, SaveOptions::default());
        let lines: Vec<&str> = trimmed.lines().filter(|l| l.len() == 80).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(&lines[1][12..17], " OG  ");
        assert_eq!(&lines[1][30..38], "   2.000");
    }

    #[test]
    fn oversized_fields_are_rejected() {
        let mut residue = Residue::new(ResidueId::standard(12345), "GLY", "    ");
        residue.add_atom(atom("CA", Element::C, 1.0));
        let mut out = Vec::new();
        let err = PdbWriter::default()
            .write(&mut out, &Structure::from(residue), &SelectAll, &SaveOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }

    #[test]
    fn save_structure_round_trips_through_reader() {
        let structure = two_chain_structure();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdb");

        save_structure(&structure, &path, true).unwrap();

        let file = std::fs::read_to_string(&path).unwrap();
        let reread = PdbParser::default()
            .get_structure(Cursor::new(file), Some("pdb"), 0)
            .unwrap();
        assert!(allequal(&structure, &reread, DEFAULT_TOLERANCE));
        let zn = reread.iter_atoms().last().unwrap();
        assert_eq!(zn.element, Element::Zn);
    }
}
