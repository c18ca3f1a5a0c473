//! N-Triples line codec.
//!
//! Each input line is handed to the oxigraph N-Triples parser on its own, so
//! a corrupt line only ever costs that line. Blank nodes are qualified with
//! the partition they were read from.

use crate::core::{BlankNodeNamer, Term, Triple};
use crate::error::{Error, Result};
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::vocab::xsd;
use oxigraph::model::{BlankNode, Literal, NamedNode};
use std::io::{BufRead, Write};

/// Parse a single N-Triples line.
///
/// Returns `Ok(None)` for blank and comment lines. Anything after the first
/// statement, including a second statement, makes the whole line malformed.
pub fn parse_line(line: &str, namer: &BlankNodeNamer) -> Result<Option<Triple>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut quads = RdfParser::from_format(RdfFormat::NTriples).for_slice(trimmed.as_bytes());
    let quad = match quads.next() {
        Some(Ok(quad)) => quad,
        Some(Err(e)) => return Err(Error::Parse(e.to_string())),
        None => return Ok(None),
    };
    if quads.next().is_some() {
        return Err(Error::Parse("trailing content after the statement".to_string()));
    }

    let subject = term_from_oxigraph(oxigraph::model::Term::from(quad.subject), namer)?;
    let object = term_from_oxigraph(quad.object, namer)?;

    Ok(Some(Triple::new(subject, quad.predicate.into_string(), object)))
}

#[allow(unreachable_patterns)]
fn term_from_oxigraph(term: oxigraph::model::Term, namer: &BlankNodeNamer) -> Result<Term> {
    match term {
        oxigraph::model::Term::NamedNode(node) => Ok(Term::Uri(node.into_string())),
        oxigraph::model::Term::BlankNode(node) => Ok(Term::Blank(namer.name(node.as_str()))),
        oxigraph::model::Term::Literal(literal) => Ok(literal_from_oxigraph(&literal)),
        other => Err(Error::Parse(format!("unsupported term: {}", other))),
    }
}

fn literal_from_oxigraph(literal: &Literal) -> Term {
    let language = literal.language().map(str::to_string);
    let datatype = if language.is_some() || literal.datatype() == xsd::STRING {
        None
    } else {
        Some(literal.datatype().as_str().to_string())
    };

    Term::Literal { value: literal.value().to_string(), language, datatype }
}

/// Convert back into an oxigraph term, used for N-Triples rendering.
pub fn term_to_oxigraph(term: &Term) -> oxigraph::model::Term {
    match term {
        Term::Uri(uri) => NamedNode::new_unchecked(uri.as_str()).into(),
        Term::Blank(label) => BlankNode::new_unchecked(label.identifier()).into(),
        Term::Literal { value, language: Some(language), .. } => {
            Literal::new_language_tagged_literal_unchecked(value.as_str(), language.as_str()).into()
        }
        Term::Literal { value, datatype: Some(datatype), .. } => {
            Literal::new_typed_literal(value.as_str(), NamedNode::new_unchecked(datatype.as_str()))
                .into()
        }
        Term::Literal { value, .. } => Literal::new_simple_literal(value.as_str()).into(),
    }
}

/// Iterates the triples of one partition.
///
/// Malformed lines come out as `Error::Parse` carrying the partition and line
/// number; the caller decides whether to skip them. IO errors are not
/// recoverable.
pub struct TripleReader<R: BufRead> {
    lines: std::io::Lines<R>,
    namer: BlankNodeNamer,
    line_number: u64,
}

impl<R: BufRead> TripleReader<R> {
    pub fn new(reader: R, namer: BlankNodeNamer) -> Self {
        Self { lines: reader.lines(), namer, line_number: 0 }
    }
}

impl<R: BufRead> Iterator for TripleReader<R> {
    type Item = Result<Triple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(Error::Io(e))),
            };
            self.line_number += 1;

            match parse_line(&line, &self.namer) {
                Ok(Some(triple)) => return Some(Ok(triple)),
                Ok(None) => continue,
                Err(e) => {
                    return Some(Err(Error::Parse(format!(
                        "{}:{}: {}",
                        self.namer.partition_id(),
                        self.line_number,
                        e
                    ))))
                }
            }
        }
    }
}

/// Write one triple as an N-Triples line.
pub fn write_triple<W: Write>(writer: &mut W, triple: &Triple) -> std::io::Result<()> {
    writeln!(writer, "{}", triple)
}
