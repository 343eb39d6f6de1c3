//! `REMARK 350` (biological assembly) records.
//!
//! ```text
//! REMARK 350 BIOMOLECULE: 1
//! REMARK 350 APPLY THE FOLLOWING TO CHAINS: A, B,
//! REMARK 350                    AND CHAINS: C
//! REMARK 350   BIOMT1   1  1.000000  0.000000  0.000000        0.00000
//! REMARK 350   BIOMT2   1  0.000000  1.000000  0.000000        0.00000
//! REMARK 350   BIOMT3   1  0.000000  0.000000  1.000000        0.00000
//! ```

use crate::io::error::Error;
use crate::model::header::{AssemblyOperation, Bioassembly, Biomt};
use std::collections::BTreeMap;

const FORMAT: &str = "PDB";

/// Incremental reader for `REMARK 350` lines.
#[derive(Debug, Default)]
pub struct Remark350 {
    assemblies: BTreeMap<String, Bioassembly>,
    current: Option<String>,
    pending: Option<PendingBiomt>,
}

#[derive(Debug)]
struct PendingBiomt {
    serial: String,
    rows: Vec<[f64; 4]>,
}

impl Remark350 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience wrapper feeding every line and returning the assembly table.
    ///
    /// Lines that are not `REMARK 350` records are ignored, so a whole file can be
    /// passed in.
    ///
    /// # Examples
    ///
    /// ```
    /// use kmbio::io::Remark350;
    ///
    /// let lines = [
    ///     "REMARK 350 BIOMOLECULE: 1",
    ///     "REMARK 350 APPLY THE FOLLOWING TO CHAINS: A",
    ///     "REMARK 350   BIOMT1   1  1.000000  0.000000  0.000000        0.00000",
    ///     "REMARK 350   BIOMT2   1  0.000000  1.000000  0.000000        0.00000",
    ///     "REMARK 350   BIOMT3   1  0.000000  0.000000  1.000000        0.00000",
    /// ];
    /// let data = Remark350::process_lines(lines).unwrap();
    /// assert_eq!(data["1"].operations[0].chains, vec!["A"]);
    /// ```
    pub fn process_lines<'a>(
        lines: impl IntoIterator<Item = &'a str>,
    ) -> Result<BTreeMap<String, Bioassembly>, Error> {
        let mut remark = Self::new();
        for (index, line) in lines.into_iter().enumerate() {
            remark.process_line(line, index + 1)?;
        }
        remark.finish()
    }

    /// Consumes one line. Anything that is not a `REMARK 350` record is skipped.
    pub fn process_line(&mut self, line: &str, line_number: usize) -> Result<(), Error> {
        let Some(content) = line.strip_prefix("REMARK 350") else {
            return Ok(());
        };
        let content = content.trim();

        if let Some(id) = content.strip_prefix("BIOMOLECULE:") {
            self.flush_pending(line_number)?;
            let id = id.trim().to_string();
            self.assemblies
                .entry(id.clone())
                .or_insert_with(|| Bioassembly::new(id.clone()));
            self.current = Some(id);
        } else if let Some(chains) = content.strip_prefix("APPLY THE FOLLOWING TO CHAINS:") {
            self.flush_pending(line_number)?;
            let assembly = self.current_assembly(line_number)?;
            assembly.operations.push(AssemblyOperation {
                chains: split_chain_list(chains),
                transforms: Vec::new(),
            });
        } else if let Some(chains) = content.strip_prefix("AND CHAINS:") {
            let operation = self.current_operation(line_number)?;
            operation.chains.extend(split_chain_list(chains));
        } else if content.starts_with("BIOMT") {
            self.process_biomt(content, line_number)?;
        }
        Ok(())
    }

    /// Returns the assemblies read so far.
    ///
    /// # Errors
    ///
    /// Fails when the last operator is missing some of its three rows.
    pub fn finish(mut self) -> Result<BTreeMap<String, Bioassembly>, Error> {
        if self.pending.is_some() {
            return Err(Error::inconsistent_data(
                FORMAT,
                None,
                "incomplete BIOMT operator at end of REMARK 350",
            ));
        }
        self.current = None;
        Ok(self.assemblies)
    }

    fn process_biomt(&mut self, content: &str, line_number: usize) -> Result<(), Error> {
        let fields: Vec<&str> = content.split_whitespace().collect();
        if fields.len() < 6 {
            return Err(Error::parse(FORMAT, None, line_number, "BIOMT record too short"));
        }
        let row_index = match fields[0] {
            "BIOMT1" => 0,
            "BIOMT2" => 1,
            "BIOMT3" => 2,
            other => {
                return Err(Error::parse(
                    FORMAT,
                    None,
                    line_number,
                    format!("unexpected BIOMT row '{other}'"),
                ));
            }
        };
        let serial = fields[1];
        let mut row = [0.0; 4];
        for (value, text) in row.iter_mut().zip(&fields[2..6]) {
            *value = text.parse::<f64>().map_err(|_| {
                Error::parse(FORMAT, None, line_number, format!("invalid BIOMT value '{text}'"))
            })?;
        }

        if row_index == 0 {
            self.flush_pending(line_number)?;
            self.pending = Some(PendingBiomt {
                serial: serial.to_string(),
                rows: vec![row],
            });
            return Ok(());
        }

        match self.pending.as_mut() {
            Some(pending) if pending.serial == serial && pending.rows.len() == row_index => {
                pending.rows.push(row);
            }
            _ => {
                return Err(Error::parse(
                    FORMAT,
                    None,
                    line_number,
                    format!("BIOMT{} out of order for operator {serial}", row_index + 1),
                ));
            }
        }

        if row_index == 2 {
            self.flush_pending(line_number)?;
        }
        Ok(())
    }

    fn flush_pending(&mut self, line_number: usize) -> Result<(), Error> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        if pending.rows.len() != 3 {
            return Err(Error::parse(
                FORMAT,
                None,
                line_number,
                format!("operator {} has {} of 3 BIOMT rows", pending.serial, pending.rows.len()),
            ));
        }
        let rows = &pending.rows;
        let biomt = Biomt {
            rotation: [
                [rows[0][0], rows[0][1], rows[0][2]],
                [rows[1][0], rows[1][1], rows[1][2]],
                [rows[2][0], rows[2][1], rows[2][2]],
            ],
            translation: [rows[0][3], rows[1][3], rows[2][3]],
        };
        self.current_operation(line_number)?.transforms.push(biomt);
        Ok(())
    }

    fn current_assembly(&mut self, line_number: usize) -> Result<&mut Bioassembly, Error> {
        self.current
            .as_ref()
            .and_then(|id| self.assemblies.get_mut(id))
            .ok_or_else(|| {
                Error::parse(FORMAT, None, line_number, "REMARK 350 record before BIOMOLECULE")
            })
    }

    fn current_operation(&mut self, line_number: usize) -> Result<&mut AssemblyOperation, Error> {
        self.current_assembly(line_number)?
            .operations
            .last_mut()
            .ok_or_else(|| {
                Error::parse(
                    FORMAT,
                    None,
                    line_number,
                    "REMARK 350 record before APPLY THE FOLLOWING TO CHAINS",
                )
            })
    }
}

/// Splits `A, B, C,` into chain ids, tolerating trailing commas and blanks.
fn split_chain_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
