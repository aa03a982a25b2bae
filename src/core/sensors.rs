//! Per-spacecraft constant tables for Landsat and EO-1 instruments.

use crate::types::{Sensor, Spacecraft};

/// Thermal conversion constants. K1 in W/(m^2 sr um), K2 in K.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalConstants {
    pub k1: f64,
    pub k2: f64,
}

// Chander, Markham and Helder (2009), Remote Sensing of Environment 113.
// Landsat 8 delivers its constants in the metadata file.
const L4_THERMAL: ThermalConstants = ThermalConstants { k1: 671.62, k2: 1284.30 };
const L5_THERMAL: ThermalConstants = ThermalConstants { k1: 607.76, k2: 1260.56 };
const L7_THERMAL: ThermalConstants = ThermalConstants { k1: 666.09, k2: 1282.71 };

// Mean exo-atmospheric solar irradiance, W/(m^2 um)
const L4_ESUN: &[(&str, f64)] = &[
    ("1", 1983.0),
    ("2", 1795.0),
    ("3", 1539.0),
    ("4", 1028.0),
    ("5", 219.8),
    ("7", 83.49),
];
const L5_ESUN: &[(&str, f64)] = &[
    ("1", 1983.0),
    ("2", 1796.0),
    ("3", 1536.0),
    ("4", 1031.0),
    ("5", 220.0),
    ("7", 83.44),
];
const L7_ESUN: &[(&str, f64)] = &[
    ("1", 1969.0),
    ("2", 1840.0),
    ("3", 1551.0),
    ("4", 1044.0),
    ("5", 225.7),
    ("7", 82.07),
    ("8", 1368.0),
];

const TM_BANDS: &[&str] = &["1", "2", "3", "4", "5", "6", "7"];
const ETM_BANDS: &[&str] = &["1", "2", "3", "4", "5", "6L", "6H", "7", "8"];
const OLI_TIRS_BANDS: &[&str] = &["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11"];

pub const ALI_BAND_COUNT: u32 = 10;
pub const HYPERION_BAND_COUNT: u32 = 242;
/// Bands 1-70 are read by the VNIR detector, the rest by the SWIR detector
pub const HYPERION_LAST_VNIR_BAND: u32 = 70;

/// Band labels the instrument delivers, in band order
pub fn band_labels(sensor: Sensor) -> Vec<String> {
    match sensor {
        Sensor::Tm => TM_BANDS.iter().map(|b| b.to_string()).collect(),
        Sensor::EtmPlus => ETM_BANDS.iter().map(|b| b.to_string()).collect(),
        Sensor::OliTirs => OLI_TIRS_BANDS.iter().map(|b| b.to_string()).collect(),
        Sensor::Ali => (1..=ALI_BAND_COUNT).map(|b| b.to_string()).collect(),
        Sensor::Hyperion => (1..=HYPERION_BAND_COUNT).map(|b| b.to_string()).collect(),
    }
}

pub fn is_valid_band(sensor: Sensor, label: &str) -> bool {
    match sensor {
        Sensor::Tm => TM_BANDS.contains(&label),
        Sensor::EtmPlus => ETM_BANDS.contains(&label),
        Sensor::OliTirs => OLI_TIRS_BANDS.contains(&label),
        Sensor::Ali => numbered_band(label, ALI_BAND_COUNT).is_some(),
        Sensor::Hyperion => numbered_band(label, HYPERION_BAND_COUNT).is_some(),
    }
}

/// Human-readable list of valid labels for error messages
pub fn permitted_labels(sensor: Sensor) -> String {
    match sensor {
        Sensor::Ali => format!("1 to {}", ALI_BAND_COUNT),
        Sensor::Hyperion => format!("1 to {}", HYPERION_BAND_COUNT),
        _ => band_labels(sensor).join(", "),
    }
}

fn numbered_band(label: &str, count: u32) -> Option<u32> {
    // Reject forms like "+3" or "03" that u32 parsing would accept
    if label.starts_with('0') || !label.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    label.parse::<u32>().ok().filter(|n| (1..=count).contains(n))
}

/// Strip an optional `band` prefix and normalise case: `band6l` becomes `6L`
pub fn normalize_band_label(label: &str) -> String {
    let trimmed = label.trim();
    let lower = trimmed.to_ascii_lowercase();
    let bare = match lower.strip_prefix("band") {
        Some(rest) => &trimmed[trimmed.len() - rest.len()..],
        None => trimmed,
    };
    bare.to_ascii_uppercase()
}

/// Hyperion bands outside 8-57 and 77-224 are not radiometrically calibrated
pub fn is_hyperion_calibrated(band: u32) -> bool {
    (8..=57).contains(&band) || (77..=224).contains(&band)
}

pub fn hyperion_calibrated_bands() -> Vec<u32> {
    (1..=HYPERION_BAND_COUNT).filter(|b| is_hyperion_calibrated(*b)).collect()
}

/// Fixed thermal constants; `None` for spacecraft that deliver them in metadata
pub fn thermal_constants(spacecraft: Spacecraft) -> Option<ThermalConstants> {
    match spacecraft {
        Spacecraft::L4 => Some(L4_THERMAL),
        Spacecraft::L5 => Some(L5_THERMAL),
        Spacecraft::L7 => Some(L7_THERMAL),
        Spacecraft::L8 | Spacecraft::EO1 => None,
    }
}

/// Solar exo-atmospheric irradiance of a reflective band, if tabulated
pub fn esun(spacecraft: Spacecraft, label: &str) -> Option<f64> {
    let table = match spacecraft {
        Spacecraft::L4 => L4_ESUN,
        Spacecraft::L5 => L5_ESUN,
        Spacecraft::L7 => L7_ESUN,
        Spacecraft::L8 | Spacecraft::EO1 => return None,
    };
    table.iter().find(|(band, _)| *band == label).map(|(_, value)| *value)
}

/// (NIR, red) band labels used for NDVI
pub fn ndvi_bands(spacecraft: Spacecraft) -> Option<(&'static str, &'static str)> {
    match spacecraft {
        Spacecraft::L4 | Spacecraft::L5 | Spacecraft::L7 => Some(("4", "3")),
        Spacecraft::L8 => Some(("5", "4")),
        Spacecraft::EO1 => None,
    }
}

/// (NIR, SWIR) band labels used for NBR
pub fn nbr_bands(spacecraft: Spacecraft) -> Option<(&'static str, &'static str)> {
    match spacecraft {
        Spacecraft::L4 | Spacecraft::L5 | Spacecraft::L7 => Some(("4", "7")),
        Spacecraft::L8 => Some(("5", "7")),
        Spacecraft::EO1 => None,
    }
}

/// Thermal infrared band suited for brightness temperature
pub fn thermal_band(spacecraft: Spacecraft) -> Option<&'static str> {
    match spacecraft {
        Spacecraft::L4 | Spacecraft::L5 => Some("6"),
        Spacecraft::L7 => Some("6H"),
        Spacecraft::L8 => Some("10"),
        Spacecraft::EO1 => None,
    }
}

pub fn is_thermal_band(spacecraft: Spacecraft, label: &str) -> bool {
    match spacecraft {
        Spacecraft::L4 | Spacecraft::L5 | Spacecraft::L7 => label.starts_with('6'),
        Spacecraft::L8 => label == "10" || label == "11",
        Spacecraft::EO1 => false,
    }
}

/// Earth-Sun distance in astronomical units for a day of the year
pub fn earth_sun_distance(day_of_year: u32) -> f64 {
    let angle = (0.9856 * (day_of_year as f64 - 4.0)).to_radians();
    1.0 - 0.01672 * angle.cos()
}
