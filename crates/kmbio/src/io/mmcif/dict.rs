//! Flat key → values view of an mmCIF data block.

use super::lexer::{Token, tokenize};
use crate::io::error::Error;
use std::collections::BTreeMap;
use std::io::BufRead;

const FORMAT: &str = "mmCIF";

/// Every tag of an mmCIF file mapped to its ordered list of values.
///
/// Single `_cat.item value` pairs produce one-element lists; `loop_` tables produce one
/// list per column. The data block name is stored under the key `data_`.
///
/// # Examples
///
/// ```
/// use kmbio::io::MmcifDict;
///
/// let cif = "\
/// data_1ABC
/// _entry.id 1ABC
/// loop_
/// _atom_type.symbol
/// C N O
/// ";
/// let dict = MmcifDict::from_reader(cif.as_bytes()).unwrap();
/// assert_eq!(dict.first("data_"), Some("1ABC"));
/// assert_eq!(dict.get("_atom_type.symbol").unwrap(), ["C", "N", "O"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MmcifDict {
    entries: BTreeMap<String, Vec<String>>,
}

/// Columns of the `loop_` currently being filled.
struct OpenLoop {
    columns: Vec<String>,
    values: usize,
    start_line: usize,
}

impl MmcifDict {
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        Self::from_tokens(tokenize(reader)?)
    }

    pub fn from_tokens(tokens: impl IntoIterator<Item = Token>) -> Result<Self, Error> {
        let mut dict = Self::default();
        let mut open_loop: Option<OpenLoop> = None;
        let mut pending_tag: Option<Token> = None;

        for token in tokens {
            if let Some(current) = open_loop.as_mut() {
                if token.is_tag() && current.values == 0 {
                    dict.entries.entry(token.text.clone()).or_default().clear();
                    current.columns.push(token.text);
                    continue;
                }
                if !current.columns.is_empty()
                    && !token.is_tag()
                    && !token.is_keyword("loop_")
                    && !is_block_header(&token)
                {
                    let column = &current.columns[current.values % current.columns.len()];
                    dict.entries
                        .entry(column.clone())
                        .or_default()
                        .push(token.text);
                    current.values += 1;
                    continue;
                }
                close_loop(open_loop.take())?;
            }

            if let Some(tag) = pending_tag.take() {
                if token.is_tag() || token.is_keyword("loop_") || is_block_header(&token) {
                    return Err(Error::parse(
                        FORMAT,
                        None,
                        tag.line,
                        format!("tag '{}' has no value", tag.text),
                    ));
                }
                dict.entries.insert(tag.text, vec![token.text]);
                continue;
            }

            if token.is_keyword("loop_") {
                open_loop = Some(OpenLoop {
                    columns: Vec::new(),
                    values: 0,
                    start_line: token.line,
                });
            } else if is_block_header(&token) {
                dict.entries
                    .insert("data_".to_string(), vec![token.text[5..].to_string()]);
            } else if token.is_tag() {
                pending_tag = Some(token);
            } else {
                return Err(Error::parse(
                    FORMAT,
                    None,
                    token.line,
                    format!("value '{}' outside of any tag or loop", token.text),
                ));
            }
        }

        close_loop(open_loop)?;
        if let Some(tag) = pending_tag {
            return Err(Error::parse(
                FORMAT,
                None,
                tag.line,
                format!("tag '{}' has no value", tag.text),
            ));
        }
        Ok(dict)
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// First value of `key`, the usual accessor for non-looped items.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)?.first().map(String::as_str)
    }

    /// Like [`first`](Self::first), treating the CIF null markers `.` and `?` as absent.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.first(key).filter(|v| !is_null(v))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetches several equally long columns of one table.
    ///
    /// # Errors
    ///
    /// Fails when a column is missing or the lengths disagree.
    pub fn columns<const N: usize>(&self, keys: [&str; N]) -> Result<[&[String]; N], Error> {
        let mut columns: [&[String]; N] = [&[]; N];
        for (slot, key) in columns.iter_mut().zip(keys) {
            *slot = self.get(key).ok_or_else(|| {
                Error::inconsistent_data(FORMAT, None, format!("missing item '{key}'"))
            })?;
        }
        if let Some(first) = columns.first() {
            let rows = first.len();
            if let Some((key, column)) = keys.iter().zip(&columns).find(|(_, c)| c.len() != rows) {
                return Err(Error::inconsistent_data(
                    FORMAT,
                    None,
                    format!("item '{key}' has {} values, expected {rows}", column.len()),
                ));
            }
        }
        Ok(columns)
    }
}

impl FromIterator<(String, Vec<String>)> for MmcifDict {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// `.` (inapplicable) and `?` (unknown).
pub fn is_null(value: &str) -> bool {
    value == "." || value == "?"
}

fn is_block_header(token: &Token) -> bool {
    !token.quoted
        && token
            .text
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data_"))
}

fn close_loop(open_loop: Option<OpenLoop>) -> Result<(), Error> {
    let Some(open_loop) = open_loop else {
        return Ok(());
    };
    let width = open_loop.columns.len();
    if width == 0 {
        return Err(Error::parse(
            FORMAT,
            None,
            open_loop.start_line,
            "loop_ without column tags",
        ));
    }
    if open_loop.values % width != 0 {
        return Err(Error::parse(
            FORMAT,
            None,
            open_loop.start_line,
            format!(
                "loop_ has {} values, not a multiple of its {width} columns",
                open_loop.values
            ),
        ));
    }
    Ok(())
}
