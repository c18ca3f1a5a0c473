//! Stage 3 map side: decide which documents a triple belongs to.

use crate::config::ResolutionRules;
use crate::core::Triple;
use crate::error::Result;
use crate::indexing::SatelliteLookup;
use std::collections::BTreeSet;

pub struct TripleRouter<'a> {
    rules: &'a ResolutionRules,
}

impl<'a> TripleRouter<'a> {
    pub fn new(rules: &'a ResolutionRules) -> Self {
        Self { rules }
    }

    /// Every `(document key, triple)` pair for `triple`.
    ///
    /// A primary subject keeps its own triples. A join predicate fans the
    /// triple out to every requestor recorded for its subject, except that a
    /// requested keep-separate subject is sent to its own key, so its
    /// document is assembled once however many documents link to it.
    /// Without an index only the first rule applies. A document key is
    /// emitted at most once per triple.
    pub fn route(
        &self,
        triple: &Triple,
        index: Option<&mut (dyn SatelliteLookup + '_)>,
    ) -> Result<Vec<(String, Triple)>> {
        let mut keys = BTreeSet::new();

        if self.rules.is_document_subject(&triple.subject) {
            if let Some(subject) = triple.subject.as_uri() {
                keys.insert(subject.to_string());
            }
        }

        if let Some(index) = index {
            if self.rules.join.contains(&triple.predicate) {
                if let Some(key) = triple.subject.key() {
                    if let Some(requestors) = index.lookup(&key)? {
                        match triple.subject.as_uri() {
                            Some(subject) if self.rules.keeps_separate(subject) => {
                                keys.insert(key);
                            }
                            _ => keys.extend(requestors),
                        }
                    }
                }
            }
        }

        Ok(keys.into_iter().map(|key| (key, triple.clone())).collect())
    }
}
