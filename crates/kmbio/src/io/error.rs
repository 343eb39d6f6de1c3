//! Canonical error type for all structure IO operations.
//!
//! Parser, serializer, download and filesystem failures are wrapped into a single
//! `Error` enum that higher-level code can bubble up or turn into user-facing
//! diagnostics with uniform wording.

use crate::builder;
use crate::ops;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, fetching or writing structures.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper around operating-system level I/O failures.
    #[error(
        "I/O error for {path_desc}: {source}",
        path_desc = PathDisplay(path)
    )]
    Io {
        /// Path to the file involved in the failed operation, if any.
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// An input line could not be parsed into the expected record.
    #[error(
        "failed to parse {format} {path_desc}: {details} (line {line_number})",
        path_desc = PathDisplay(path)
    )]
    Parse {
        /// Name of the textual format (`"PDB"`, `"mmCIF"`).
        format: &'static str,
        path: Option<PathBuf>,
        /// One-based line number where parsing failed.
        line_number: usize,
        details: String,
    },

    /// Strict parsing hit a record the structure builder refused.
    #[error("invalid {format} structure at line {line_number}: {source}")]
    Construction {
        format: &'static str,
        line_number: usize,
        #[source]
        source: builder::Error,
    },

    /// Logical inconsistencies such as mismatched loop sizes or missing tables.
    #[error(
        "inconsistent data in {format} {path_desc}: {details}",
        path_desc = PathDisplay(path)
    )]
    InconsistentData {
        format: &'static str,
        path: Option<PathBuf>,
        details: String,
    },

    /// The requested biological assembly could not be built.
    #[error(transparent)]
    Assembly(#[from] ops::Error),

    /// An output record could not be produced from the in-memory structure.
    #[error("cannot write {format} record: {details}")]
    Write {
        format: &'static str,
        details: String,
    },

    /// Remote resources could not be retrieved.
    #[error("failed to fetch '{url}': {details}")]
    Fetch { url: String, details: String },
}

impl Error {
    pub fn from_io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { path, source }
    }

    /// Builds a [`Error::Parse`] variant with consistent messaging.
    pub fn parse(
        format: &'static str,
        path: Option<PathBuf>,
        line_number: usize,
        details: impl Into<String>,
    ) -> Self {
        Self::Parse {
            format,
            path,
            line_number,
            details: details.into(),
        }
    }

    pub fn construction(format: &'static str, line_number: usize, source: builder::Error) -> Self {
        Self::Construction {
            format,
            line_number,
            source,
        }
    }

    pub fn inconsistent_data(
        format: &'static str,
        path: Option<PathBuf>,
        details: impl Into<String>,
    ) -> Self {
        Self::InconsistentData {
            format,
            path,
            details: details.into(),
        }
    }

    pub fn write(format: &'static str, details: impl Into<String>) -> Self {
        Self::Write {
            format,
            details: details.into(),
        }
    }

    pub fn fetch(url: impl Into<String>, details: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            details: details.to_string(),
        }
    }
}

/// Prints `file '<path>'` when a path is known, `stream source` otherwise.
struct PathDisplay<'a>(&'a Option<PathBuf>);

impl<'a> fmt::Display for PathDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(p) => write!(f, "file '{}'", p.display()),
            None => write!(f, "stream source"),
        }
    }
}
