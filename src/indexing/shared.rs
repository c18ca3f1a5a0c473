use std::collections::BTreeSet;
use std::io::{self, Read, Write};

/// Join index entry: a satellite key and the primary subjects that need it.
///
/// `requestors` is never empty, sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteIndexEntry {
    pub key: String,
    pub requestors: BTreeSet<String>,
}

impl SatelliteIndexEntry {
    /// `None` when there is no requestor.
    pub fn new(key: impl Into<String>, requestors: impl IntoIterator<Item = String>) -> Option<Self> {
        let requestors: BTreeSet<String> = requestors.into_iter().collect();
        if requestors.is_empty() {
            return None;
        }
        Some(Self { key: key.into(), requestors })
    }

    /// Comma-joined requestor list as stored in the index.
    pub fn value(&self) -> String {
        join_requestors(&self.requestors)
    }
}

/// Join with `,`. Commas and backslashes inside a URI are escaped with `\`.
pub fn join_requestors(requestors: &BTreeSet<String>) -> String {
    let mut value = String::new();
    for (i, requestor) in requestors.iter().enumerate() {
        if i > 0 {
            value.push(',');
        }
        for c in requestor.chars() {
            if c == ',' || c == '\\' {
                value.push('\\');
            }
            value.push(c);
        }
    }
    value
}

pub fn split_requestors(value: &str) -> BTreeSet<String> {
    let mut requestors = BTreeSet::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in value.chars() {
        match (escaped, c) {
            (true, _) => {
                current.push(c);
                escaped = false;
            }
            (false, '\\') => escaped = true,
            (false, ',') => {
                if !current.is_empty() {
                    requestors.insert(std::mem::take(&mut current));
                }
            }
            (false, _) => current.push(c),
        }
    }
    if !current.is_empty() {
        requestors.insert(current);
    }
    requestors
}

/// Append one length-prefixed `key`/`value` record. Returns bytes written.
pub fn encode_record<W: Write>(writer: &mut W, key: &str, value: &str) -> io::Result<u64> {
    writer.write_all(&(key.len() as u32).to_le_bytes())?;
    writer.write_all(key.as_bytes())?;
    writer.write_all(&(value.len() as u32).to_le_bytes())?;
    writer.write_all(value.as_bytes())?;
    Ok(8 + key.len() as u64 + value.len() as u64)
}

/// Read the next record, `None` at a clean end of file.
pub fn decode_record<R: Read>(reader: &mut R) -> io::Result<Option<(String, String)>> {
    let mut len = [0u8; 4];
    match reader.read_exact(&mut len) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let key = read_string(reader, u32::from_le_bytes(len) as usize)?;

    reader.read_exact(&mut len)?;
    let value = read_string(reader, u32::from_le_bytes(len) as usize)?;

    Ok(Some((key, value)))
}

fn read_string<R: Read>(reader: &mut R, length: usize) -> io::Result<String> {
    let mut bytes = vec![0u8; length];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
