//! Line-oriented parsers for the input corpus and the rules file.

pub mod ntriples;
pub mod properties;
