//! Satellite index: build, on-disk format and lookup.

pub mod builder;
pub mod satellite;
pub mod shared;
pub mod sparse;

pub use builder::SatelliteIndexBuilder;
pub use satellite::{
    MemorySatelliteIndex, SatelliteIndexReader, SatelliteIndexWriter, SatelliteLookup,
};
pub use shared::SatelliteIndexEntry;
