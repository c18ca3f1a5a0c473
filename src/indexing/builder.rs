//! Stage 1: collect, for every satellite, the primary subjects that need it.

use crate::config::ResolutionRules;
use crate::core::{Term, Triple};
use crate::indexing::shared::SatelliteIndexEntry;
use std::collections::{BTreeMap, BTreeSet};

pub struct SatelliteIndexBuilder<'a> {
    rules: &'a ResolutionRules,
}

impl<'a> SatelliteIndexBuilder<'a> {
    pub fn new(rules: &'a ResolutionRules) -> Self {
        Self { rules }
    }

    /// Map side: `(satellite key, requestor)` for a document subject pointing
    /// at a URI or blank node through a resolve predicate, `None` otherwise.
    ///
    /// Suppressed subjects never get a document, so they never request.
    pub fn key_for(&self, triple: &Triple) -> Option<(String, String)> {
        if !self.rules.is_document_subject(&triple.subject)
            || !self.rules.resolve.contains(&triple.predicate)
        {
            return None;
        }
        let Term::Uri(subject) = &triple.subject else {
            return None;
        };
        let key = triple.object.key()?;
        Some((key, subject.clone()))
    }

    /// Reduce side: union of the requestors seen for `key`, in any order.
    pub fn merge(
        key: &str,
        requestors: impl IntoIterator<Item = String>,
    ) -> Option<SatelliteIndexEntry> {
        SatelliteIndexEntry::new(key, requestors)
    }

    /// Whole build in memory, entries in ascending key order.
    pub fn build(&self, triples: impl IntoIterator<Item = Triple>) -> Vec<SatelliteIndexEntry> {
        let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for triple in triples {
            if let Some((key, requestor)) = self.key_for(&triple) {
                grouped.entry(key).or_default().insert(requestor);
            }
        }
        grouped
            .into_iter()
            .filter_map(|(key, requestors)| Self::merge(&key, requestors))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BlankNodeNamer;

    const HAS_LOCATION: &str = "http://example.org/hasLocation";

    fn rules() -> ResolutionRules {
        let mut rules = ResolutionRules::new("http://example.org/org/");
        rules.resolve.insert(HAS_LOCATION.to_string());
        rules
    }

    fn located(subject: Term, object: Term) -> Triple {
        Triple::new(subject, HAS_LOCATION, object)
    }

    #[test]
    fn test_only_matching_triples_are_keyed() {
        let rules = rules();
        let builder = SatelliteIndexBuilder::new(&rules);
        let blank = Term::Blank(BlankNodeNamer::label("b1", "p0"));

        assert!(builder.key_for(&located(Term::uri("http://example.org/org/A"), blank.clone())).is_some());
        // literal object
        assert!(builder.key_for(&located(Term::uri("http://example.org/org/A"), Term::literal("x"))).is_none());
        // subject outside the prefix
        assert!(builder.key_for(&located(Term::uri("http://example.org/place/1"), blank.clone())).is_none());
        // blank subject
        assert!(builder.key_for(&located(blank.clone(), Term::uri("http://example.org/x"))).is_none());
        // predicate outside the resolve set
        let other = Triple::new(Term::uri("http://example.org/org/A"), "http://example.org/name", blank);
        assert!(builder.key_for(&other).is_none());
    }

    #[test]
    fn test_suppressed_subjects_do_not_request() {
        let mut rules = ResolutionRules::new("http://example.org/org/");
        rules.resolve.insert(HAS_LOCATION.to_string());
        rules.suppress = Some(regex::Regex::new("/about$").unwrap());
        let builder = SatelliteIndexBuilder::new(&rules);
        let blank = Term::Blank(BlankNodeNamer::label("b1", "p0"));

        assert!(builder.key_for(&located(Term::uri("http://example.org/org/A/about"), blank.clone())).is_none());
        let entries = builder.build(vec![
            located(Term::uri("http://example.org/org/A/about"), blank.clone()),
            located(Term::uri("http://example.org/org/A"), blank.clone()),
        ]);
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].requestors.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["http://example.org/org/A"]
        );
    }

    #[test]
    fn test_build_groups_by_satellite() {
        let rules = rules();
        let builder = SatelliteIndexBuilder::new(&rules);
        let blank = Term::Blank(BlankNodeNamer::label("b1", "p0"));

        let entries = builder.build(vec![
            located(Term::uri("http://example.org/org/B"), blank.clone()),
            located(Term::uri("http://example.org/org/A"), blank.clone()),
            located(Term::uri("http://example.org/org/A"), blank.clone()),
            located(Term::uri("http://example.org/org/A"), Term::uri("http://sws.geonames.org/2886242/")),
        ]);

        assert_eq!(entries.len(), 2);
        let blank_entry = entries.iter().find(|e| e.key == blank.key().unwrap()).unwrap();
        assert_eq!(
            blank_entry.requestors.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["http://example.org/org/A", "http://example.org/org/B"]
        );
    }

    #[test]
    fn test_merge_is_order_independent() {
        let forward = SatelliteIndexBuilder::merge("k", vec!["b".to_string(), "a".to_string()]);
        let backward = SatelliteIndexBuilder::merge("k", vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        assert_eq!(forward, backward);
        assert!(SatelliteIndexBuilder::merge("k", Vec::new()).is_none());
    }
}
