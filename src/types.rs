use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Real-valued raster data (rows x columns) after widening to f64
pub type RealImage = Array2<f64>;

/// Spacecraft that produced a USGS Level-1 scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Spacecraft {
    L4,
    L5,
    L7,
    L8,
    /// EO-1, carrying both ALI and Hyperion
    EO1,
}

impl Spacecraft {
    /// Normalize a `SPACECRAFT_ID` field: `LANDSAT_8` and `Landsat5` become
    /// `L8` and `L5`, `EO1` stays as it is.
    pub fn from_spacecraft_id(id: &str) -> MtlResult<Self> {
        let id = id.trim();
        let upper = id.to_uppercase();
        if let Some(rest) = upper.strip_prefix("LANDSAT") {
            let number = rest.trim_start_matches(&['_', '-', ' '][..]);
            return match number {
                "4" => Ok(Spacecraft::L4),
                "5" => Ok(Spacecraft::L5),
                "7" => Ok(Spacecraft::L7),
                "8" => Ok(Spacecraft::L8),
                _ => Err(MtlError::UnsupportedSpacecraft(id.to_string())),
            };
        }
        match upper.as_str() {
            "L4" => Ok(Spacecraft::L4),
            "L5" => Ok(Spacecraft::L5),
            "L7" => Ok(Spacecraft::L7),
            "L8" => Ok(Spacecraft::L8),
            "EO1" | "EO-1" => Ok(Spacecraft::EO1),
            _ => Err(MtlError::UnsupportedSpacecraft(id.to_string())),
        }
    }

    pub fn is_landsat(&self) -> bool {
        !matches!(self, Spacecraft::EO1)
    }
}

impl std::fmt::Display for Spacecraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Spacecraft::L4 => write!(f, "L4"),
            Spacecraft::L5 => write!(f, "L5"),
            Spacecraft::L7 => write!(f, "L7"),
            Spacecraft::L8 => write!(f, "L8"),
            Spacecraft::EO1 => write!(f, "EO1"),
        }
    }
}

/// Instrument on board the spacecraft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sensor {
    Tm,
    EtmPlus,
    OliTirs,
    Ali,
    Hyperion,
}

impl Sensor {
    /// Parse a `SENSOR_ID` field (`TM`, `ETM`, `ETM+`, `OLI_TIRS`, `ALI`, `HSI`)
    pub fn from_sensor_id(id: &str) -> MtlResult<Self> {
        match id.trim().to_uppercase().as_str() {
            "TM" => Ok(Sensor::Tm),
            "ETM" | "ETM+" => Ok(Sensor::EtmPlus),
            "OLI_TIRS" | "OLI" | "TIRS" => Ok(Sensor::OliTirs),
            "ALI" => Ok(Sensor::Ali),
            "HSI" | "HYPERION" => Ok(Sensor::Hyperion),
            other => Err(MtlError::InvalidValue {
                key: "SENSOR_ID".to_string(),
                reason: format!("unknown sensor '{}'", other),
            }),
        }
    }
}

/// Which generation of the Landsat MTL layout a file uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataFormat {
    /// Layout introduced in 2012 (`METADATA_FILE_INFO`, `FILE_NAME_BAND_x`)
    Current,
    /// Older layout (`PROCESSING_SOFTWARE`, `BANDx_FILE_NAME`, `LMAX_BANDx`)
    Legacy,
}

/// Affine georeferencing parameters in GDAL order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// True when rows run north to south without rotation terms
    pub fn is_north_up(&self) -> bool {
        self.rotation_x == 0.0 && self.rotation_y == 0.0
    }
}

/// Error types for metadata parsing and scene processing
#[derive(Debug, thiserror::Error)]
pub enum MtlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Syntax error on line {line} ({reason}): {text}")]
    Syntax {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("Structural error on line {line}: expected end of '{}', found '{found}': {text}",
        .expected.as_deref().unwrap_or("<nothing open>"))]
    Structural {
        line: usize,
        text: String,
        expected: Option<String>,
        found: String,
    },

    #[error("Reached line {line} with block '{open}' still open: {text}")]
    UnterminatedGroup {
        line: usize,
        text: String,
        open: String,
    },

    #[error("Duplicate key '{key}' on line {line}: {text}")]
    DuplicateKey {
        line: usize,
        text: String,
        key: String,
    },

    #[error("No metadata file found: {0}")]
    MetadataNotFound(String),

    #[error("Missing metadata key: {0}")]
    MissingKey(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Spacecraft {spacecraft} does not have a band {band}. Permissible band labels are {permitted}")]
    UnknownBand {
        spacecraft: Spacecraft,
        band: String,
        permitted: String,
    },

    #[error("Unsupported spacecraft: {0}")]
    UnsupportedSpacecraft(String),

    #[error("Array shapes differ: {left:?} vs {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },

    #[error("Processing error: {0}")]
    Processing(String),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

impl MtlError {
    /// Line number for errors raised while parsing, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            MtlError::Syntax { line, .. }
            | MtlError::Structural { line, .. }
            | MtlError::UnterminatedGroup { line, .. }
            | MtlError::DuplicateKey { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Result type for metadata and scene operations
pub type MtlResult<T> = Result<T, MtlError>;
