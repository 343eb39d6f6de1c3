//! Locating and opening structure files: local paths, `file://` URLs, remote downloads
//! and the `rcsb://` / `ebi://` / `wwpdb://` shorthand routes.

use super::error::Error;
use super::mmcif::reader::MmcifParser;
use super::parser::Parser;
use super::pdb::reader::PdbParser;
use crate::model::structure::Structure;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maps a PDB id and a file extension (`"pdb"` or `"cif"`) to a download URL.
pub type Route = fn(&str, &str) -> String;

/// Shorthand schemes understood by [`resolve_url`] and [`open_url`].
pub const DEFAULT_ROUTES: &[(&str, Route)] = &[
    ("rcsb://", rcsb_route),
    ("ebi://", ebi_route),
    ("wwpdb://", wwpdb_route),
];

fn rcsb_route(pdb_id: &str, ext: &str) -> String {
    format!(
        "https://files.rcsb.org/download/{}.{ext}",
        pdb_id.to_uppercase()
    )
}

fn ebi_route(pdb_id: &str, ext: &str) -> String {
    let pdb_id = pdb_id.to_lowercase();
    match ext {
        "pdb" => format!("https://www.ebi.ac.uk/pdbe/entry-files/download/pdb{pdb_id}.ent"),
        _ => format!("https://www.ebi.ac.uk/pdbe/entry-files/download/{pdb_id}.{ext}"),
    }
}

fn wwpdb_route(pdb_id: &str, ext: &str) -> String {
    let pdb_id = pdb_id.to_lowercase();
    let middle = pdb_id.get(1..3).unwrap_or_default();
    match ext {
        "pdb" => format!(
            "https://files.wwpdb.org/pub/pdb/data/structures/divided/pdb/{middle}/pdb{pdb_id}.ent.gz"
        ),
        _ => format!(
            "https://files.wwpdb.org/pub/pdb/data/structures/divided/mmCIF/{middle}/{pdb_id}.{ext}.gz"
        ),
    }
}

/// Looks up the route registered for `scheme` (`"rcsb://"`, ...).
pub fn route(scheme: &str) -> Option<Route> {
    DEFAULT_ROUTES
        .iter()
        .find(|(name, _)| *name == scheme)
        .map(|(_, route)| *route)
}

/// Expands a shorthand such as `rcsb://1y0x.cif` into a full URL.
///
/// Anything that does not start with a registered scheme is returned unchanged.
///
/// # Examples
///
/// ```
/// use kmbio::io::resolve_url;
///
/// assert_eq!(
///     resolve_url("rcsb://1y0x.pdb"),
///     "https://files.rcsb.org/download/1Y0X.pdb"
/// );
/// assert_eq!(resolve_url("local/1y0x.cif"), "local/1y0x.cif");
/// ```
pub fn resolve_url(path_or_url: &str) -> String {
    for (scheme, route) in DEFAULT_ROUTES {
        if let Some(rest) = path_or_url.strip_prefix(scheme) {
            let (pdb_id, ext) = rest.split_once('.').unwrap_or((rest, "cif"));
            return route(pdb_id, ext);
        }
    }
    path_or_url.to_string()
}

/// Structure file formats recognised from file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pdb,
    Mmcif,
}

impl Format {
    /// Infers the format from the extension, ignoring a trailing `.gz`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        let ext = Path::new(name).extension()?.to_str()?;
        match ext {
            "pdb" | "ent" => Some(Format::Pdb),
            "cif" | "mmcif" => Some(Format::Mmcif),
            _ if ext.starts_with("pdb") => Some(Format::Pdb),
            _ => None,
        }
    }
}

/// How [`open_url`] reaches a resolved URL.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Remote,
    Local(PathBuf),
    Unsupported,
}

impl Location {
    fn of(url: &str) -> Self {
        if url.starts_with("http://") || url.starts_with("https://") {
            Location::Remote
        } else if let Some(path) = url.strip_prefix("file://") {
            Location::Local(PathBuf::from(path))
        } else if url.contains("://") {
            Location::Unsupported
        } else {
            Location::Local(PathBuf::from(url))
        }
    }
}

/// Opens a local path, `file://` URL, remote URL or shorthand route for reading.
///
/// Names ending in `.gz` are decompressed on the fly. Remote `http(s)://` URLs require
/// the `fetch` feature.
///
/// # Errors
///
/// [`Error::Io`] for unreadable local files, [`Error::Fetch`] for failed downloads and
/// unsupported schemes.
pub fn open_url(path_or_url: &str) -> Result<Box<dyn BufRead>, Error> {
    let url = resolve_url(path_or_url);
    debug!(url = %url, "opening structure source");

    let raw: Box<dyn Read> = match Location::of(&url) {
        Location::Remote => download(&url)?,
        Location::Local(path) => {
            let file = File::open(&path).map_err(|e| Error::from_io(e, Some(path)))?;
            Box::new(file)
        }
        Location::Unsupported => return Err(Error::fetch(&url, "unsupported URL scheme")),
    };

    if url.ends_with(".gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(raw))))
    } else {
        Ok(Box::new(BufReader::new(raw)))
    }
}

#[cfg(feature = "fetch")]
fn download(url: &str) -> Result<Box<dyn Read>, Error> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| Error::fetch(url, e))?;
    let body = response.bytes().map_err(|e| Error::fetch(url, e))?;
    debug!(url, bytes = body.len(), "downloaded");
    Ok(Box::new(std::io::Cursor::new(body)))
}

#[cfg(not(feature = "fetch"))]
fn download(url: &str) -> Result<Box<dyn Read>, Error> {
    Err(Error::fetch(
        url,
        "remote sources need the `fetch` feature enabled",
    ))
}

/// Opens `path_or_url` and parses it with the reader matching its extension.
///
/// mmCIF files are read with author chain ids. `bioassembly` follows
/// [`Parser::get_structure`].
///
/// # Errors
///
/// Fails when the format cannot be inferred, plus any error of [`open_url`] or the
/// parser.
pub fn load_structure(path_or_url: &str, bioassembly: usize) -> Result<Structure, Error> {
    let url = resolve_url(path_or_url);
    let format = Format::from_name(&url).ok_or_else(|| {
        Error::inconsistent_data(
            "structure",
            None,
            format!("cannot infer the file format of '{path_or_url}'"),
        )
    })?;
    let reader = open_url(&url)?;
    match format {
        Format::Pdb => PdbParser::default().get_structure(reader, None, bioassembly),
        Format::Mmcif => MmcifParser::default().get_structure(reader, None, bioassembly),
    }
}
