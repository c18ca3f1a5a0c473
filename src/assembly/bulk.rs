//! Bulk-index output: an action line followed by the document body.

use crate::assembly::document::to_json;
use crate::assembly::{AssembledDocument, DocumentKind};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct IndexAction<'a> {
    index: IndexMeta<'a>,
}

#[derive(Debug, Serialize)]
struct IndexMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    doc_type: &'a str,
    #[serde(rename = "_id")]
    id: &'a str,
    #[serde(rename = "_parent", skip_serializing_if = "Option::is_none")]
    parent: Option<&'a str>,
}

/// Index name and document types the bulk lines are addressed to.
#[derive(Debug, Clone)]
pub struct BulkTarget {
    pub index_name: String,
    pub primary_type: String,
    pub child_type: String,
}

impl BulkTarget {
    pub fn doc_type(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::Primary => &self.primary_type,
            DocumentKind::Child => &self.child_type,
        }
    }
}

pub fn write_bulk<W: Write>(writer: &mut W, target: &BulkTarget, document: &AssembledDocument) -> Result<()> {
    let action = IndexAction {
        index: IndexMeta {
            index: &target.index_name,
            doc_type: target.doc_type(document.kind),
            id: &document.id,
            parent: document.parent_id.as_deref(),
        },
    };
    serde_json::to_writer(&mut *writer, &action)?;
    writer.write_all(b"\n")?;
    serde_json::to_writer(&mut *writer, &to_json(document))?;
    writer.write_all(b"\n")?;
    Ok(())
}
