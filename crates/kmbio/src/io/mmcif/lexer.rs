//! Tokenizer for the CIF text syntax.
//!
//! Tokens are whitespace separated words. A `#` at the start of a token opens a comment
//! that runs to the end of the line. Single- or double-quoted strings end only at a
//! matching quote followed by whitespace or the end of the line, so embedded quotes such
//! as `'O5''` survive. A line starting with `;` opens a text field that runs until the
//! next line starting with `;`.

use crate::io::error::Error;
use std::io::BufRead;

const FORMAT: &str = "mmCIF";

/// One lexical token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    /// Line where the token starts (1-based).
    pub line: usize,
    /// Quoted strings and text fields are always values, never keywords or tags.
    pub quoted: bool,
}

impl Token {
    fn bare(text: &str, line: usize) -> Self {
        Self {
            text: text.to_string(),
            line,
            quoted: false,
        }
    }

    fn quoted(text: String, line: usize) -> Self {
        Self {
            text,
            line,
            quoted: true,
        }
    }

    /// `true` for an unquoted token starting with `_`.
    pub fn is_tag(&self) -> bool {
        !self.quoted && self.text.starts_with('_')
    }

    /// `true` for an unquoted reserved word, compared case-insensitively.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        !self.quoted && self.text.eq_ignore_ascii_case(keyword)
    }
}

/// Splits a whole CIF document into tokens.
///
/// # Errors
///
/// Read failures, unterminated quoted strings and unterminated text fields.
///
/// # Examples
///
/// ```
/// use kmbio::io::mmcif::lexer::tokenize;
///
/// let tokens = tokenize("_atom_site.label_atom_id 'O5''  # comment\n".as_bytes()).unwrap();
/// let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
/// assert_eq!(texts, vec!["_atom_site.label_atom_id", "O5'"]);
/// ```
pub fn tokenize<R: BufRead>(reader: R) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut text_field: Option<(usize, Vec<String>)> = None;

    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line.map_err(|e| Error::from_io(e, None))?;

        if let Some((start, mut buffer)) = text_field.take() {
            if line.starts_with(';') {
                tokens.push(Token::quoted(buffer.join("\n"), start));
                split_line(&line[1..], line_number, &mut tokens)?;
            } else {
                buffer.push(line.trim_end().to_string());
                text_field = Some((start, buffer));
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix(';') {
            text_field = Some((line_number, vec![rest.trim_end().to_string()]));
            continue;
        }

        split_line(&line, line_number, &mut tokens)?;
    }

    if let Some((start, _)) = text_field {
        return Err(Error::parse(
            FORMAT,
            None,
            start,
            "text field opened with ';' is never closed",
        ));
    }
    Ok(tokens)
}

/// Tokenizes a single line (outside any text field).
fn split_line(line: &str, line_number: usize, tokens: &mut Vec<Token>) -> Result<(), Error> {
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (start, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '#' {
            break;
        }

        if c == '\'' || c == '"' {
            let mut j = i + 1;
            let closing = loop {
                match chars.get(j) {
                    None => break None,
                    Some(&(pos, q)) if q == c => {
                        let at_boundary = chars.get(j + 1).is_none_or(|(_, next)| next.is_whitespace());
                        if at_boundary {
                            break Some(pos);
                        }
                    }
                    Some(_) => {}
                }
                j += 1;
            };
            let Some(end) = closing else {
                return Err(Error::parse(
                    FORMAT,
                    None,
                    line_number,
                    format!("unterminated quoted string starting at column {}", start + 1),
                ));
            };
            tokens.push(Token::quoted(line[start + 1..end].to_string(), line_number));
            i = j + 1;
            continue;
        }

        let mut j = i;
        while j < chars.len() && !chars[j].1.is_whitespace() {
            j += 1;
        }
        let end = chars.get(j).map_or(line.len(), |(pos, _)| *pos);
        tokens.push(Token::bare(&line[start..end], line_number));
        i = j;
    }
    Ok(())
}
