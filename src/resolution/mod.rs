//! One-hop path resolution.
//!
//! For a rule `(join, target, output)`, every `(S, join, O)` with a URI `O`
//! and every `(O, target, L)` in the same group yield `(S, output, L)`. The
//! resolver loops over the configured rules once and never evaluates its own
//! output, so a chain longer than one hop is never followed.

use crate::config::PathRule;
use crate::core::{Term, Triple};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Triples synthesized for one group.
#[derive(Debug, Default)]
pub struct Derivation {
    pub triples: BTreeSet<Triple>,
    /// Derived triples that could not be synthesized and were dropped.
    pub failures: u64,
}

pub struct PathResolver<'a> {
    rules: &'a [PathRule],
}

impl<'a> PathResolver<'a> {
    pub fn new(rules: &'a [PathRule]) -> Self {
        Self { rules }
    }

    /// Shuffle key for a triple: the object of a join triple (the entity
    /// being dereferenced), otherwise the subject. Both halves of a hop meet
    /// under the intermediate node's key.
    pub fn resolution_key(&self, triple: &Triple) -> Option<String> {
        if let Term::Uri(object) = &triple.object {
            if self.rules.iter().any(|rule| rule.join_predicate == triple.predicate) {
                return Some(object.clone());
            }
        }
        triple.subject.key()
    }

    pub fn derive(&self, group: &BTreeSet<Triple>) -> Derivation {
        let mut values: BTreeMap<(&Term, &str), Vec<&Term>> = BTreeMap::new();
        for triple in group {
            values.entry((&triple.subject, triple.predicate.as_str())).or_default().push(&triple.object);
        }

        let mut derivation = Derivation::default();
        for rule in self.rules {
            for triple in group.iter().filter(|t| t.predicate == rule.join_predicate) {
                if !matches!(triple.object, Term::Uri(_)) {
                    continue;
                }
                let Some(targets) = values.get(&(&triple.object, rule.target_predicate.as_str())) else {
                    continue;
                };
                for target in targets {
                    match synthesize(&triple.subject, rule, target) {
                        Ok(derived) => {
                            derivation.triples.insert(derived);
                        }
                        Err(e) => {
                            derivation.failures += 1;
                            warn!(subject = %triple.subject, rule = %rule.output_predicate, error = %e, "dropping derived triple");
                        }
                    }
                }
            }
        }
        derivation
    }
}

fn synthesize(subject: &Term, rule: &PathRule, value: &Term) -> Result<Triple> {
    let literal = match value {
        Term::Literal { .. } => value.clone(),
        Term::Uri(uri) => Term::literal(uri.as_str()),
        Term::Blank(label) => {
            return Err(Error::PathEvaluation(format!(
                "{} of {} is the blank node {}",
                rule.target_predicate, rule.join_predicate, label
            )))
        }
    };
    Ok(Triple::new(subject.clone(), rule.output_predicate.as_str(), literal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BlankNodeNamer;

    const CREATOR: &str = "http://purl.org/dc/terms/creator";
    const NAME: &str = "http://d-nb.info/standards/elementset/gnd#preferredNameForThePerson";

    fn rule() -> PathRule {
        PathRule::new(CREATOR, NAME, None).unwrap()
    }

    fn t(s: &str, p: &str, o: Term) -> Triple {
        Triple::new(Term::uri(s), p, o)
    }

    #[test]
    fn test_one_hop_is_materialized() {
        let rules = vec![rule()];
        let resolver = PathResolver::new(&rules);
        let group: BTreeSet<Triple> = [
            t("http://example.org/res/1", CREATOR, Term::uri("http://d-nb.info/gnd/118540238")),
            t("http://d-nb.info/gnd/118540238", NAME, Term::literal("Goethe, Johann Wolfgang von")),
        ]
        .into();

        let derived = resolver.derive(&group);
        assert_eq!(derived.failures, 0);
        assert_eq!(
            derived.triples.into_iter().collect::<Vec<_>>(),
            vec![t(
                "http://example.org/res/1",
                &rules[0].output_predicate,
                Term::literal("Goethe, Johann Wolfgang von")
            )]
        );
    }

    #[test]
    fn test_missing_target_is_not_an_error() {
        let rules = vec![rule()];
        let resolver = PathResolver::new(&rules);
        let group: BTreeSet<Triple> =
            [t("http://example.org/res/1", CREATOR, Term::uri("http://d-nb.info/gnd/1"))].into();

        let derived = resolver.derive(&group);
        assert!(derived.triples.is_empty());
        assert_eq!(derived.failures, 0);
    }

    #[test]
    fn test_blank_target_drops_only_that_triple() {
        let rules = vec![rule()];
        let resolver = PathResolver::new(&rules);
        let blank = Term::Blank(BlankNodeNamer::label("n1", "p0"));
        let group: BTreeSet<Triple> = [
            t("http://example.org/res/1", CREATOR, Term::uri("http://d-nb.info/gnd/1")),
            t("http://d-nb.info/gnd/1", NAME, blank),
            t("http://d-nb.info/gnd/1", NAME, Term::literal("Name")),
        ]
        .into();

        let derived = resolver.derive(&group);
        assert_eq!(derived.failures, 1);
        assert_eq!(derived.triples.len(), 1);
    }

    #[test]
    fn test_chains_are_not_followed() {
        // creator -> creator -> name: only the direct hop from res/1 exists.
        let rules = vec![
            PathRule::new(CREATOR, CREATOR, Some("http://example.org/creatorOfCreator")).unwrap(),
            rule(),
        ];
        let resolver = PathResolver::new(&rules);
        let group: BTreeSet<Triple> = [
            t("http://example.org/res/1", CREATOR, Term::uri("http://example.org/p/1")),
            t("http://example.org/p/1", CREATOR, Term::uri("http://example.org/p/2")),
            t("http://example.org/p/2", NAME, Term::literal("Far away")),
        ]
        .into();

        let derived = resolver.derive(&group);
        assert!(derived.triples.iter().all(|d| d.object != Term::literal("Far away")
            || d.subject == Term::uri("http://example.org/p/1")));
        assert!(!derived
            .triples
            .iter()
            .any(|d| d.subject == Term::uri("http://example.org/res/1") && d.object == Term::literal("Far away")));
    }

    #[test]
    fn test_resolution_key() {
        let rules = vec![rule()];
        let resolver = PathResolver::new(&rules);

        let join = t("http://example.org/res/1", CREATOR, Term::uri("http://d-nb.info/gnd/1"));
        assert_eq!(resolver.resolution_key(&join).as_deref(), Some("http://d-nb.info/gnd/1"));

        let plain = t("http://d-nb.info/gnd/1", NAME, Term::literal("Name"));
        assert_eq!(resolver.resolution_key(&plain).as_deref(), Some("http://d-nb.info/gnd/1"));

        let literal_join = t("http://example.org/res/1", CREATOR, Term::literal("Anonymous"));
        assert_eq!(resolver.resolution_key(&literal_join).as_deref(), Some("http://example.org/res/1"));
    }
}
