//! JSON shaping of an assembled document.
//!
//! The root node carries `"@id"`; every predicate becomes a key. Objects that
//! are described inside the same document are embedded, each at most once.
//! Anything not reachable from the root ends up under `"@included"`.

use crate::assembly::AssembledDocument;
use crate::core::{Term, Triple};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Value of one predicate key.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Value),
    Scalars(Vec<Value>),
    Object(Map<String, Value>),
    Objects(Vec<Map<String, Value>>),
}

impl FieldValue {
    /// Literal-only values stay scalars. As soon as one node is present every
    /// value becomes an object, literals as `{"@value": ...}`.
    fn from_rendered(values: Vec<Rendered>) -> Self {
        if values.iter().all(|v| matches!(v, Rendered::Literal(_))) {
            let mut scalars: Vec<Value> = values
                .into_iter()
                .filter_map(|v| match v {
                    Rendered::Literal(value) => Some(value),
                    Rendered::Node(_) => None,
                })
                .collect();
            return match scalars.len() {
                1 => FieldValue::Scalar(scalars.remove(0)),
                _ => FieldValue::Scalars(scalars),
            };
        }

        let mut objects: Vec<Map<String, Value>> = values
            .into_iter()
            .map(|v| match v {
                Rendered::Node(node) => node,
                Rendered::Literal(Value::Object(value)) => value,
                Rendered::Literal(value) => {
                    let mut wrapped = Map::new();
                    wrapped.insert("@value".to_string(), value);
                    wrapped
                }
            })
            .collect();
        match objects.len() {
            1 => FieldValue::Object(objects.remove(0)),
            _ => FieldValue::Objects(objects),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(field: FieldValue) -> Self {
        match field {
            FieldValue::Scalar(value) => value,
            FieldValue::Scalars(values) => Value::Array(values),
            FieldValue::Object(map) => Value::Object(map),
            FieldValue::Objects(maps) => Value::Array(maps.into_iter().map(Value::Object).collect()),
        }
    }
}

enum Rendered {
    Literal(Value),
    Node(Map<String, Value>),
}

fn literal_json(value: &str, language: Option<&str>, datatype: Option<&str>) -> Value {
    let tag = match (language, datatype) {
        (Some(language), _) => ("@language", language),
        (None, Some(datatype)) => ("@type", datatype),
        (None, None) => return Value::String(value.to_string()),
    };
    let mut map = Map::new();
    map.insert("@value".to_string(), Value::String(value.to_string()));
    map.insert(tag.0.to_string(), Value::String(tag.1.to_string()));
    Value::Object(map)
}

fn node_id(term: &Term) -> Option<String> {
    match term {
        Term::Uri(uri) => Some(uri.clone()),
        Term::Blank(label) => Some(label.to_string()),
        Term::Literal { .. } => None,
    }
}

fn reference(id: String) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("@id".to_string(), Value::String(id));
    map
}

struct Shaper<'d> {
    by_subject: BTreeMap<&'d Term, BTreeMap<&'d str, Vec<&'d Term>>>,
    visited: BTreeSet<&'d Term>,
}

impl<'d> Shaper<'d> {
    fn new(triples: &'d BTreeSet<Triple>) -> Self {
        let mut by_subject: BTreeMap<&Term, BTreeMap<&str, Vec<&Term>>> = BTreeMap::new();
        for triple in triples {
            by_subject
                .entry(&triple.subject)
                .or_default()
                .entry(triple.predicate.as_str())
                .or_default()
                .push(&triple.object);
        }
        Self { by_subject, visited: BTreeSet::new() }
    }

    fn node(&mut self, subject: &'d Term) -> Map<String, Value> {
        let mut map = reference(node_id(subject).unwrap_or_default());
        self.visited.insert(subject);

        let Some(properties) = self.by_subject.get(subject).cloned() else {
            return map;
        };
        for (predicate, objects) in properties {
            let rendered = objects.into_iter().map(|object| self.value(object)).collect();
            map.insert(predicate.to_string(), FieldValue::from_rendered(rendered).into());
        }
        map
    }

    fn value(&mut self, object: &'d Term) -> Rendered {
        match object {
            Term::Literal { value, language, datatype } => {
                Rendered::Literal(literal_json(value, language.as_deref(), datatype.as_deref()))
            }
            Term::Uri(_) | Term::Blank(_) => {
                if self.by_subject.contains_key(object) && !self.visited.contains(object) {
                    Rendered::Node(self.node(object))
                } else {
                    Rendered::Node(reference(node_id(object).unwrap_or_default()))
                }
            }
        }
    }
}

/// Deterministic JSON body of `document`. Object keys are sorted.
pub fn to_json(document: &AssembledDocument) -> Value {
    let root = Term::uri(document.id.as_str());
    let mut shaper = Shaper::new(&document.triples);
    let mut body = shaper.node(&root);

    let subjects: Vec<&Term> = shaper.by_subject.keys().copied().collect();
    let mut included = Vec::new();
    for subject in subjects {
        if subject != &root && !shaper.visited.contains(subject) {
            included.push(Value::Object(shaper.node(subject)));
        }
    }
    if !included.is_empty() {
        body.insert("@included".to_string(), Value::Array(included));
    }
    Value::Object(body)
}
