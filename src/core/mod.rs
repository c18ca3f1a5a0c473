//! Core data structures: RDF terms, triples and partition-qualified blank nodes

use std::fmt;

pub mod blank;
pub use blank::{BlankNodeLabel, BlankNodeNamer};

/// An RDF term as it flows between the stages.
///
/// Terms are totally ordered so that triple sets iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Uri(String),
    /// `datatype` is `None` for plain `xsd:string` and language-tagged literals.
    Literal { value: String, language: Option<String>, datatype: Option<String> },
    Blank(BlankNodeLabel),
}

impl Term {
    pub fn uri(value: impl Into<String>) -> Self {
        Term::Uri(value.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal { value: value.into(), language: None, datatype: None }
    }

    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Term::Uri(uri) => Some(uri),
            _ => None,
        }
    }

    /// True for a URI starting with `prefix`. Blank nodes and literals never match.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.as_uri().map_or(false, |uri| uri.starts_with(prefix))
    }

    /// The string under which this term is keyed in the satellite index and
    /// in the shuffle. Literals are never keys.
    pub fn key(&self) -> Option<String> {
        match self {
            Term::Uri(uri) => Some(uri.clone()),
            Term::Blank(label) => Some(label.to_string()),
            Term::Literal { .. } => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::parsing::ntriples::term_to_oxigraph(self))
    }
}

/// A single RDF statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self { subject, predicate: predicate.into(), object }
    }
}

/// Renders the triple as one N-Triples statement, without a trailing newline.
impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.predicate, self.object)
    }
}
