//! Radiometric processing of Level-1 scenes

pub mod radiometry;
pub mod sensors;
pub mod scene;

// Re-export main types
pub use radiometry::{gain_bias, normalized_difference, GainBias};
pub use sensors::ThermalConstants;
pub use scene::{BandDescriptor, BandSelection, Scene};
