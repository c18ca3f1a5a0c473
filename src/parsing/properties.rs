//! Minimal reader for `key=value` properties files.
//!
//! Supports `#` and `!` comments, `=` or `:` separators and `\` line
//! continuations. Later keys override earlier ones.

use std::collections::BTreeMap;

pub fn parse_properties(input: &str) -> Result<BTreeMap<String, String>, String> {
    let mut properties = BTreeMap::new();
    let mut logical = String::new();
    let mut start_line = 0usize;

    for (index, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if logical.is_empty() {
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            start_line = index + 1;
        }

        if let Some(continued) = line.strip_suffix('\\') {
            logical.push_str(continued);
            continue;
        }
        logical.push_str(line);

        let (key, value) = split_entry(&logical)
            .ok_or_else(|| format!("line {}: expected 'key=value', got '{}'", start_line, logical))?;
        properties.insert(key.to_string(), value.to_string());
        logical.clear();
    }

    if !logical.is_empty() {
        return Err(format!("line {}: continuation runs past end of input", start_line));
    }

    Ok(properties)
}

fn split_entry(line: &str) -> Option<(&str, &str)> {
    let separator = line.find(|c: char| c == '=' || c == ':')?;
    let key = line[..separator].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, line[separator + 1..].trim()))
}

/// Split a semicolon-separated set, dropping empty items.
pub fn split_set(value: &str) -> Vec<String> {
    value.split(';').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}
