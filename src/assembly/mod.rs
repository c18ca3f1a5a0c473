//! Stage 3 reduce side: turn the triples routed to one key into documents.

pub mod bulk;
pub mod document;

pub use bulk::{write_bulk, BulkTarget};
pub use document::{to_json, FieldValue};

use crate::config::ResolutionRules;
use crate::core::{Term, Triple};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Primary,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    pub id: String,
    pub kind: DocumentKind,
    pub parent_id: Option<String>,
    pub triples: BTreeSet<Triple>,
}

impl AssembledDocument {
    pub fn primary(id: impl Into<String>, triples: BTreeSet<Triple>) -> Self {
        Self { id: id.into(), kind: DocumentKind::Primary, parent_id: None, triples }
    }
}

pub struct DocumentAssembler<'a> {
    rules: &'a ResolutionRules,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(rules: &'a ResolutionRules) -> Self {
        Self { rules }
    }

    /// Documents for `key`: the document itself first, then every extracted
    /// sub-entity in ascending id order. Duplicate triples collapse and the
    /// result does not depend on the order of `triples`.
    pub fn assemble(
        &self,
        key: &str,
        triples: impl IntoIterator<Item = Triple>,
    ) -> Vec<AssembledDocument> {
        let mut own: BTreeSet<Triple> = BTreeSet::new();
        let mut extracted: BTreeMap<String, BTreeSet<Triple>> = BTreeMap::new();

        for triple in triples {
            match triple.subject.as_uri() {
                Some(subject) if subject != key && self.rules.keeps_separate(subject) => {
                    extracted.entry(subject.to_string()).or_default().insert(triple);
                }
                _ => {
                    own.insert(triple);
                }
            }
        }

        let parent_id = self.parent_of(key, &own);
        let mut documents = Vec::with_capacity(1 + extracted.len());
        documents.push(AssembledDocument {
            id: key.to_string(),
            kind: if parent_id.is_some() { DocumentKind::Child } else { DocumentKind::Primary },
            parent_id,
            triples: own,
        });
        documents.extend(
            extracted
                .into_iter()
                .map(|(id, triples)| AssembledDocument::primary(id, triples)),
        );
        documents
    }

    /// Smallest primary URI `key` points to through a parent predicate.
    fn parent_of(&self, key: &str, triples: &BTreeSet<Triple>) -> Option<String> {
        triples
            .iter()
            .filter(|t| t.subject.as_uri() == Some(key) && self.rules.parents.contains(&t.predicate))
            .filter_map(|t| match &t.object {
                Term::Uri(parent) if parent != key && parent.starts_with(&self.rules.primary_prefix) => {
                    Some(parent.as_str())
                }
                _ => None,
            })
            .min()
            .map(str::to_string)
    }
}
