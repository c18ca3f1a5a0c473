//! Resolution rules loaded once at job start and shared read-only by every task.

use crate::core::Term;
use crate::error::{Error, Result};
use crate::execution::ExecutorConfig;
use crate::parsing::properties::{parse_properties, split_set};
use oxigraph::model::NamedNode;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::str::FromStr;

/// Pattern for synthetic "about" subjects that never become documents.
pub const DEFAULT_SUPPRESS_PATTERN: &str = "/about$";
pub const DEFAULT_CHILD_TYPE: &str = "item";

/// One-hop dereference rule: `(S, join, O)` and `(O, target, L)` give
/// `(S, output, L)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRule {
    pub join_predicate: String,
    pub target_predicate: String,
    pub output_predicate: String,
}

impl PathRule {
    /// The output predicate defaults to `join#<local name of target>`.
    pub fn new(join: &str, target: &str, output: Option<&str>) -> Result<Self> {
        let output = match output {
            Some(output) => output.to_string(),
            None => format!("{}#{}", join, local_name(target)),
        };

        for iri in [join, target, output.as_str()] {
            NamedNode::new(iri)
                .map_err(|e| Error::Configuration(format!("invalid IRI '{}' in path rule: {}", iri, e)))?;
        }

        Ok(Self {
            join_predicate: join.to_string(),
            target_predicate: target.to_string(),
            output_predicate: output,
        })
    }
}

impl FromStr for PathRule {
    type Err = Error;

    /// Parses `join|target` or `join|target|output`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('|').map(str::trim).collect();
        match parts.as_slice() {
            [join, target] => PathRule::new(join, target, None),
            [join, target, output] => PathRule::new(join, target, Some(output)),
            _ => Err(Error::Configuration(format!(
                "path rule '{}' must be 'join|target' or 'join|target|output'",
                s
            ))),
        }
    }
}

fn local_name(iri: &str) -> &str {
    iri.rsplit(|c: char| c == '#' || c == '/').next().unwrap_or(iri)
}

#[derive(Debug, Clone)]
pub struct ResolutionRules {
    pub primary_prefix: String,
    /// Predicates whose URI/blank object belongs to the subject's document.
    pub resolve: BTreeSet<String>,
    /// Predicates that trigger a satellite index lookup in Stage 3.
    pub join: BTreeSet<String>,
    /// Predicates linking a child document to its parent.
    pub parents: BTreeSet<String>,
    pub paths: Vec<PathRule>,
    pub separate_prefixes: Vec<String>,
    pub inline_prefixes: Vec<String>,
    pub suppress: Option<Regex>,
    pub child_type: String,
    pub executor: ExecutorConfig,
}

impl ResolutionRules {
    /// Empty rule set for `primary_prefix`; fill the sets directly.
    pub fn new(primary_prefix: impl Into<String>) -> Self {
        Self {
            primary_prefix: primary_prefix.into(),
            resolve: BTreeSet::new(),
            join: BTreeSet::new(),
            parents: BTreeSet::new(),
            paths: Vec::new(),
            separate_prefixes: Vec::new(),
            inline_prefixes: Vec::new(),
            suppress: None,
            child_type: DEFAULT_CHILD_TYPE.to_string(),
            executor: ExecutorConfig::default(),
        }
    }

    pub fn load(path: &Path, primary_prefix: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read rules '{}': {}", path.display(), e))
        })?;
        Self::parse(&text, primary_prefix)
    }

    pub fn parse(text: &str, primary_prefix: &str) -> Result<Self> {
        let properties = parse_properties(text).map_err(Error::Configuration)?;
        Self::from_properties(&properties, primary_prefix)
    }

    pub fn from_properties(properties: &BTreeMap<String, String>, primary_prefix: &str) -> Result<Self> {
        if primary_prefix.is_empty() {
            return Err(Error::Configuration("primary prefix must not be empty".to_string()));
        }

        let required = |key: &str| -> Result<BTreeSet<String>> {
            properties
                .get(key)
                .map(|value| split_set(value).into_iter().collect())
                .ok_or_else(|| Error::Configuration(format!("missing key '{}'", key)))
        };
        let optional = |key: &str| -> Vec<String> {
            properties.get(key).map(|value| split_set(value)).unwrap_or_default()
        };

        let paths = optional("paths")
            .iter()
            .map(|entry| entry.parse::<PathRule>())
            .collect::<Result<Vec<_>>>()?;

        let suppress = match properties.get("suppress").map(|s| s.trim()) {
            Some("") => None,
            Some(pattern) => Some(Regex::new(pattern)?),
            None => Some(Regex::new(DEFAULT_SUPPRESS_PATTERN)?),
        };

        let defaults = ExecutorConfig::default();
        let executor = ExecutorConfig {
            reducers: parse_number(properties, "reducers", defaults.reducers)?,
            sparse_interval: parse_number(properties, "sparse.interval", defaults.sparse_interval)?,
            max_attempts: parse_number(properties, "max.attempts", defaults.max_attempts)?,
        };
        if executor.reducers == 0 || executor.sparse_interval == 0 || executor.max_attempts == 0 {
            return Err(Error::Configuration(
                "reducers, sparse.interval and max.attempts must be positive".to_string(),
            ));
        }

        Ok(Self {
            primary_prefix: primary_prefix.to_string(),
            resolve: required("resolve")?,
            join: required("predicates")?,
            parents: required("parents")?,
            paths,
            separate_prefixes: optional("separate"),
            inline_prefixes: optional("inline"),
            suppress,
            child_type: properties
                .get("child.type")
                .filter(|s| !s.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_CHILD_TYPE.to_string()),
            executor,
        })
    }

    /// Primary subject that should be emitted as its own document.
    pub fn is_document_subject(&self, term: &Term) -> bool {
        let suppressed = match (term.as_uri(), &self.suppress) {
            (Some(uri), Some(re)) => re.is_match(uri),
            _ => false,
        };
        term.has_prefix(&self.primary_prefix) && !suppressed
    }

    /// Sub-entity that is extracted into its own document rather than embedded.
    pub fn keeps_separate(&self, uri: &str) -> bool {
        self.separate_prefixes.iter().any(|p| uri.starts_with(p.as_str()))
            && !self.inline_prefixes.iter().any(|p| uri.starts_with(p.as_str()))
    }
}

fn parse_number(properties: &BTreeMap<String, String>, key: &str, default: usize) -> Result<usize> {
    match properties.get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| Error::Configuration(format!("key '{}': {}", key, e))),
        None => Ok(default),
    }
}
