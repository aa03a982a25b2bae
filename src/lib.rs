//! satmeta: USGS Level-1 metadata and radiometry for Landsat and EO-1
//!
//! This library parses USGS MTL metadata files into typed, ordered documents
//! and uses the calibration constants they carry to convert band digital
//! numbers to radiance, reflectance, brightness temperature and
//! normalized-difference indices.

pub mod types;
pub mod metadata;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{GeoTransform, MetadataFormat, MtlError, MtlResult, RealImage, Sensor, Spacecraft};

pub use metadata::{MetadataDocument, MetadataEntry, MetadataGroup, MetadataValue, ValueKind};

pub use io::{parse_metadata, MtlParser, ParserConfig};

pub use crate::core::{Scene, BandDescriptor};
