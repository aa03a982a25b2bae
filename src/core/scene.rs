//! USGS Level-1 scenes (Landsat 4-8, EO-1 ALI and Hyperion).
//!
//! A scene is a directory holding one GeoTIFF per band and an MTL metadata
//! file. [`Scene`] reads calibration constants from the metadata on demand
//! and loads band pixels through a [`RasterOpener`].

use crate::core::radiometry::{self, GainBias};
use crate::core::sensors::{self, ThermalConstants};
use crate::io::mtl::parse_metadata;
use crate::io::raster::RasterOpener;
use crate::metadata::{MetadataDocument, MetadataEntry, MetadataGroup};
use crate::types::{MetadataFormat, MtlError, MtlResult, RealImage, Sensor, Spacecraft};
use chrono::Datelike;
use std::path::{Path, PathBuf};

/// A band of a scene, resolved to its file
#[derive(Debug, Clone, PartialEq)]
pub struct BandDescriptor {
    /// Normalized label, e.g. `7` or `6H`
    pub label: String,
    /// File name as listed in the metadata
    pub file_name: String,
    /// Location of the (possibly infixed) band file
    pub path: PathBuf,
}

/// Which bands make up a Hyperion spectrum
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BandSelection {
    /// Bands 8-57 and 77-224
    #[default]
    Calibrated,
    All,
    /// Uncalibrated bands 1-7
    Low,
    /// Uncalibrated bands 225-242
    High,
    Selected(Vec<String>),
}

/// A Level-1 scene described by an MTL file
#[derive(Debug, Clone)]
pub struct Scene {
    dir: PathBuf,
    name: String,
    meta: MetadataGroup,
    spacecraft: Spacecraft,
    sensor: Sensor,
    format: MetadataFormat,
    infix: String,
}

impl Scene {
    /// Parse the MTL file found in `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> MtlResult<Self> {
        let document = parse_metadata(dir.as_ref())?;
        Self::from_document(dir.as_ref(), &document)
    }

    /// Build a scene from metadata that has already been parsed. Band files
    /// are resolved relative to `dir`.
    pub fn from_document<P: Into<PathBuf>>(dir: P, document: &MetadataDocument) -> MtlResult<Self> {
        let dir = dir.into();
        let (name, meta) = document.top_group().ok_or_else(|| {
            MtlError::MissingKey("file-level metadata group (e.g. L1_METADATA_FILE)".to_string())
        })?;

        let product = meta.require_group("PRODUCT_METADATA")?;
        let spacecraft = Spacecraft::from_spacecraft_id(product.str_value("SPACECRAFT_ID")?)?;
        let sensor = Sensor::from_sensor_id(product.str_value("SENSOR_ID")?)?;

        let expected_platform = matches!(
            (spacecraft, sensor),
            (Spacecraft::L4 | Spacecraft::L5, Sensor::Tm)
                | (Spacecraft::L7, Sensor::EtmPlus)
                | (Spacecraft::L8, Sensor::OliTirs)
                | (Spacecraft::EO1, Sensor::Ali | Sensor::Hyperion)
        );
        if !expected_platform {
            log::warn!("Unexpected sensor {:?} on spacecraft {}", sensor, spacecraft);
        }

        let format = detect_format(meta, spacecraft)?;

        log::info!(
            "Opened {} {:?} scene {} ({:?} metadata format)",
            spacecraft,
            sensor,
            dir.display(),
            format
        );

        Ok(Self {
            dir,
            name: name.to_string(),
            meta: meta.clone(),
            spacecraft,
            sensor,
            format,
            infix: String::new(),
        })
    }

    /// Insert `infix` before the extension of every band file name, for
    /// bands that were pre-processed into sibling files
    pub fn with_infix<S: Into<String>>(mut self, infix: S) -> Self {
        self.infix = infix.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Name of the file-level group
    pub fn metadata_name(&self) -> &str {
        &self.name
    }

    /// The file-level metadata group
    pub fn metadata(&self) -> &MetadataGroup {
        &self.meta
    }

    pub fn spacecraft(&self) -> Spacecraft {
        self.spacecraft
    }

    pub fn sensor(&self) -> Sensor {
        self.sensor
    }

    pub fn format(&self) -> MetadataFormat {
        self.format
    }

    pub fn band_labels(&self) -> Vec<String> {
        sensors::band_labels(self.sensor)
    }

    fn group(&self, name: &str) -> MtlResult<&MetadataGroup> {
        self.meta.require_group(name)
    }

    /// Validate a label such as `band7` or `6h` and return it normalized
    fn checked_label(&self, label: &str) -> MtlResult<String> {
        let normalized = sensors::normalize_band_label(label);
        if !sensors::is_valid_band(self.sensor, &normalized) {
            return Err(MtlError::UnknownBand {
                spacecraft: self.spacecraft,
                band: normalized,
                permitted: sensors::permitted_labels(self.sensor),
            });
        }
        Ok(normalized)
    }

    fn band_number(label: &str) -> MtlResult<u32> {
        label.parse().map_err(|_| MtlError::InvalidValue {
            key: "band".to_string(),
            reason: format!("'{}' is not a numbered band", label),
        })
    }

    /// Metadata key holding the file name of a band
    fn file_name_key(&self, label: &str) -> String {
        if self.spacecraft == Spacecraft::EO1 {
            return format!("BAND{}_FILE_NAME", label);
        }
        match self.format {
            MetadataFormat::Current => format!("FILE_NAME_BAND_{}", vcid_label(label)),
            MetadataFormat::Legacy => format!("BAND{}_FILE_NAME", legacy_label(label)),
        }
    }

    /// Look up a band by label (`band7`, `7`, `band6L`, ...)
    pub fn band(&self, label: &str) -> MtlResult<BandDescriptor> {
        let label = self.checked_label(label)?;
        if self.sensor == Sensor::Hyperion {
            let number = Self::band_number(&label)?;
            if !sensors::is_hyperion_calibrated(number) {
                log::warn!("Hyperion band {} is not calibrated", label);
            }
        }

        let key = self.file_name_key(&label);
        let file_name = self.group("PRODUCT_METADATA")?.str_value(&key)?.to_string();
        let path = self.dir.join(insert_infix(&file_name, &self.infix));
        log::debug!("Band {} resolves to {}", label, path.display());

        Ok(BandDescriptor {
            label,
            file_name,
            path,
        })
    }

    /// Band used for brightness temperature: 6 for Landsat 4/5, 6H for
    /// Landsat 7 and 10 for Landsat 8
    pub fn thermal_band(&self) -> MtlResult<BandDescriptor> {
        let label = sensors::thermal_band(self.spacecraft).ok_or_else(|| {
            MtlError::Processing(format!("{} has no thermal infrared band", self.spacecraft))
        })?;
        self.band(label)
    }

    /// Linear DN to radiance calibration of a band
    pub fn radiance_calibration(&self, label: &str) -> MtlResult<GainBias> {
        let label = self.checked_label(label)?;
        match (self.spacecraft, self.sensor) {
            (Spacecraft::L8, _) => {
                let rescaling = self.group("RADIOMETRIC_RESCALING")?;
                Ok(GainBias {
                    gain: rescaling.f64_value(&format!("RADIANCE_MULT_BAND_{}", label))?,
                    bias: rescaling.f64_value(&format!("RADIANCE_ADD_BAND_{}", label))?,
                })
            }
            (Spacecraft::EO1, Sensor::Hyperion) => {
                let factor = self.hyperion_scaling_factor(&label)?;
                Ok(GainBias { gain: 1.0 / factor, bias: 0.0 })
            }
            (Spacecraft::EO1, _) => {
                let scaling = self.group("RADIANCE_SCALING")?;
                Ok(GainBias {
                    gain: scaling.f64_value(&format!("BAND{}_SCALING_FACTOR", label))?,
                    bias: scaling.f64_value(&format!("BAND{}_OFFSET", label))?,
                })
            }
            _ => {
                let radiance = self.group("MIN_MAX_RADIANCE")?;
                let pixel = self.group("MIN_MAX_PIXEL_VALUE")?;
                let (lmax, lmin, qcalmax, qcalmin) = match self.format {
                    MetadataFormat::Current => {
                        let band = vcid_label(&label);
                        (
                            radiance.f64_value(&format!("RADIANCE_MAXIMUM_BAND_{}", band))?,
                            radiance.f64_value(&format!("RADIANCE_MINIMUM_BAND_{}", band))?,
                            pixel.f64_value(&format!("QUANTIZE_CAL_MAX_BAND_{}", band))?,
                            pixel.f64_value(&format!("QUANTIZE_CAL_MIN_BAND_{}", band))?,
                        )
                    }
                    MetadataFormat::Legacy => {
                        let band = legacy_label(&label);
                        (
                            radiance.f64_value(&format!("LMAX_BAND{}", band))?,
                            radiance.f64_value(&format!("LMIN_BAND{}", band))?,
                            pixel.f64_value(&format!("QCALMAX_BAND{}", band))?,
                            pixel.f64_value(&format!("QCALMIN_BAND{}", band))?,
                        )
                    }
                };
                Ok(radiometry::gain_bias(lmax, lmin, qcalmax, qcalmin))
            }
        }
    }

    fn hyperion_scaling_factor(&self, label: &str) -> MtlResult<f64> {
        let scaling = self.group("RADIANCE_SCALING")?;
        if Self::band_number(label)? <= sensors::HYPERION_LAST_VNIR_BAND {
            scaling.f64_value("SCALING_FACTOR_VNIR")
        } else {
            scaling.f64_value("SCALING_FACTOR_SWIR")
        }
    }

    /// Raw digital numbers of a band
    pub fn digital_numbers(&self, label: &str, opener: &dyn RasterOpener) -> MtlResult<RealImage> {
        let band = self.band(label)?;
        let raster = opener.open(&band.path)?;
        let (width, height) = raster.raster_size();
        log::debug!("Reading band {} ({} x {})", band.label, width, height);
        raster.read_array()
    }

    /// Radiance in W/(m^2 sr um) from digital numbers already in memory
    pub fn radiance_from_dn(&self, label: &str, dn: &RealImage) -> MtlResult<RealImage> {
        if self.sensor == Sensor::Hyperion {
            let label = self.checked_label(label)?;
            let factor = self.hyperion_scaling_factor(&label)?;
            log::debug!("Band {}: scaling factor {}", label, factor);
            return Ok(radiometry::scale_radiance(dn, factor));
        }

        let GainBias { gain, bias } = self.radiance_calibration(label)?;
        log::debug!("Band {}: gain {}, bias {}", label, gain, bias);

        #[cfg(feature = "parallel")]
        let radiance = radiometry::dn_to_radiance_parallel(dn, gain, bias);
        #[cfg(not(feature = "parallel"))]
        let radiance = radiometry::dn_to_radiance(dn, gain, bias);

        Ok(radiance)
    }

    /// At-sensor radiance of a band
    pub fn radiance(&self, label: &str, opener: &dyn RasterOpener) -> MtlResult<RealImage> {
        let dn = self.digital_numbers(label, opener)?;
        self.radiance_from_dn(label, &dn)
    }

    /// Sun elevation in degrees at scene centre
    pub fn sun_elevation(&self) -> MtlResult<f64> {
        match (self.spacecraft, self.format) {
            (Spacecraft::L8, _) | (_, MetadataFormat::Current) => {
                self.group("IMAGE_ATTRIBUTES")?.f64_value("SUN_ELEVATION")
            }
            (_, MetadataFormat::Legacy) => self.group("PRODUCT_PARAMETERS")?.f64_value("SUN_ELEVATION"),
        }
    }

    pub fn acquisition_date(&self) -> MtlResult<chrono::NaiveDate> {
        let product = self.group("PRODUCT_METADATA")?;
        match self.format {
            MetadataFormat::Current => product.date_value("DATE_ACQUIRED"),
            MetadataFormat::Legacy => product.date_value("ACQUISITION_DATE"),
        }
    }

    /// Top-of-atmosphere reflectance from digital numbers already in memory
    pub fn reflectance_from_dn(&self, label: &str, dn: &RealImage) -> MtlResult<RealImage> {
        let label = self.checked_label(label)?;
        match self.spacecraft {
            Spacecraft::L8 => {
                let rescaling = self.group("RADIOMETRIC_RESCALING")?;
                let mult = rescaling.f64_value(&format!("REFLECTANCE_MULT_BAND_{}", label))?;
                let add = rescaling.f64_value(&format!("REFLECTANCE_ADD_BAND_{}", label))?;
                let elevation = self.sun_elevation()?;
                Ok(radiometry::scaled_reflectance(dn, mult, add, elevation))
            }
            Spacecraft::L4 | Spacecraft::L5 | Spacecraft::L7 => {
                let esun = sensors::esun(self.spacecraft, &label).ok_or_else(|| MtlError::InvalidValue {
                    key: format!("band{}", label),
                    reason: format!("no solar irradiance tabulated for {} band {}", self.spacecraft, label),
                })?;
                let elevation = self.sun_elevation()?;
                let doy = self.acquisition_date()?.ordinal();
                let distance = sensors::earth_sun_distance(doy);
                log::debug!(
                    "Band {}: ESUN {}, sun elevation {}, day {}, Earth-Sun distance {:.5} AU",
                    label, esun, elevation, doy, distance
                );
                let radiance = self.radiance_from_dn(&label, dn)?;
                Ok(radiometry::radiance_to_reflectance(&radiance, distance, esun, elevation))
            }
            Spacecraft::EO1 => Err(MtlError::Processing(format!(
                "Reflectance is not available for {:?} scenes",
                self.sensor
            ))),
        }
    }

    /// Top-of-atmosphere reflectance of a band
    pub fn reflectance(&self, label: &str, opener: &dyn RasterOpener) -> MtlResult<RealImage> {
        let dn = self.digital_numbers(label, opener)?;
        self.reflectance_from_dn(label, &dn)
    }

    /// K1/K2 for a thermal band
    pub fn thermal_constants(&self, label: &str) -> MtlResult<ThermalConstants> {
        let label = self.checked_label(label)?;
        if !sensors::is_thermal_band(self.spacecraft, &label) {
            return Err(MtlError::InvalidValue {
                key: format!("band{}", label),
                reason: format!("not a thermal band of {}", self.spacecraft),
            });
        }
        if let Some(constants) = sensors::thermal_constants(self.spacecraft) {
            return Ok(constants);
        }
        let tirs = self.group("TIRS_THERMAL_CONSTANTS")?;
        Ok(ThermalConstants {
            k1: tirs.f64_value(&format!("K1_CONSTANT_BAND_{}", label))?,
            k2: tirs.f64_value(&format!("K2_CONSTANT_BAND_{}", label))?,
        })
    }

    /// At-sensor brightness temperature in kelvin from digital numbers already in memory
    pub fn brightness_temperature_from_dn(&self, label: &str, dn: &RealImage) -> MtlResult<RealImage> {
        let ThermalConstants { k1, k2 } = self.thermal_constants(label)?;
        let radiance = self.radiance_from_dn(label, dn)?;
        Ok(radiometry::radiance_to_kelvin(&radiance, k1, k2))
    }

    /// At-sensor brightness temperature in kelvin of a thermal band
    pub fn brightness_temperature(&self, label: &str, opener: &dyn RasterOpener) -> MtlResult<RealImage> {
        let dn = self.digital_numbers(label, opener)?;
        self.brightness_temperature_from_dn(label, &dn)
    }

    /// Generic normalized difference `(band1 - band2) / (band1 + band2)` of
    /// the digital numbers of two bands
    pub fn normalized_difference(
        &self,
        label1: &str,
        label2: &str,
        opener: &dyn RasterOpener,
    ) -> MtlResult<RealImage> {
        let first = self.digital_numbers(label1, opener)?;
        let second = self.digital_numbers(label2, opener)?;

        #[cfg(feature = "parallel")]
        let index = radiometry::normalized_difference_parallel(&first, &second);
        #[cfg(not(feature = "parallel"))]
        let index = radiometry::normalized_difference(&first, &second);

        index
    }

    /// Normalized Difference Vegetation Index
    pub fn ndvi(&self, opener: &dyn RasterOpener) -> MtlResult<RealImage> {
        let (nir, red) = sensors::ndvi_bands(self.spacecraft).ok_or_else(|| {
            MtlError::Processing(format!("NDVI bands are not defined for {}", self.spacecraft))
        })?;
        log::info!("Calculating NDVI from bands {} and {}", nir, red);
        self.normalized_difference(nir, red, opener)
    }

    /// Normalized Burn Ratio
    pub fn nbr(&self, opener: &dyn RasterOpener) -> MtlResult<RealImage> {
        let (nir, swir) = sensors::nbr_bands(self.spacecraft).ok_or_else(|| {
            MtlError::Processing(format!("NBR bands are not defined for {}", self.spacecraft))
        })?;
        log::info!("Calculating NBR from bands {} and {}", nir, swir);
        self.normalized_difference(nir, swir, opener)
    }

    /// Radiance of one pixel (row `i`, column `j`) across a selection of
    /// Hyperion bands, as (label, radiance) pairs in band order
    pub fn spectrum(
        &self,
        i: usize,
        j: usize,
        selection: &BandSelection,
        opener: &dyn RasterOpener,
    ) -> MtlResult<Vec<(String, f64)>> {
        if self.sensor != Sensor::Hyperion {
            return Err(MtlError::Processing(format!(
                "Spectra are only available for Hyperion scenes, not {:?}",
                self.sensor
            )));
        }

        let labels: Vec<String> = match selection {
            BandSelection::Calibrated => sensors::hyperion_calibrated_bands()
                .iter()
                .map(u32::to_string)
                .collect(),
            BandSelection::All => self.band_labels(),
            BandSelection::Low => (1..=7).map(|b: u32| b.to_string()).collect(),
            BandSelection::High => (225..=sensors::HYPERION_BAND_COUNT).map(|b| b.to_string()).collect(),
            BandSelection::Selected(labels) => labels.clone(),
        };
        log::debug!("Extracting spectrum at ({}, {}) from {} bands", i, j, labels.len());

        let mut spectrum = Vec::with_capacity(labels.len());
        for label in labels {
            let radiance = self.radiance(&label, opener)?;
            let value = *radiance.get((i, j)).ok_or_else(|| MtlError::InvalidValue {
                key: "pixel index".to_string(),
                reason: format!(
                    "({}, {}) outside band {} of shape {:?}",
                    i,
                    j,
                    label,
                    radiance.shape()
                ),
            })?;
            spectrum.push((sensors::normalize_band_label(&label), value));
        }
        Ok(spectrum)
    }
}

/// Current-format files address the two Landsat 7 gain settings of band 6
/// as VCID 1 (low) and VCID 2 (high)
fn vcid_label(label: &str) -> String {
    label.replace('L', "_VCID_1").replace('H', "_VCID_2")
}

/// Legacy files call them 61 and 62
fn legacy_label(label: &str) -> String {
    label.replace('L', "1").replace('H', "2")
}

fn insert_infix(file_name: &str, infix: &str) -> String {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => format!("{}{}{}", &file_name[..pos], infix, &file_name[pos..]),
        _ => format!("{}{}", file_name, infix),
    }
}

fn detect_format(meta: &MetadataGroup, spacecraft: Spacecraft) -> MtlResult<MetadataFormat> {
    let has = |group: &str, key: &str| matches!(meta.lookup(&[group, key]), Some(MetadataEntry::Value(_)));

    if has("METADATA_FILE_INFO", "PROCESSING_SOFTWARE_VERSION") {
        Ok(MetadataFormat::Current)
    } else if has("PRODUCT_METADATA", "PROCESSING_SOFTWARE") || spacecraft == Spacecraft::EO1 {
        Ok(MetadataFormat::Legacy)
    } else {
        Err(MtlError::MissingKey(
            "METADATA_FILE_INFO.PROCESSING_SOFTWARE_VERSION or PRODUCT_METADATA.PROCESSING_SOFTWARE".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::mtl::MtlParser;
    use crate::io::raster::{InMemoryOpener, InMemoryRaster};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    const L7_LEGACY: &str = r#"GROUP = L1_METADATA_FILE
  GROUP = PRODUCT_METADATA
    SPACECRAFT_ID = "Landsat7"
    SENSOR_ID = "ETM+"
    ACQUISITION_DATE = 2002-06-21
    PROCESSING_SOFTWARE = "LPGS_6.3.0"
    BAND3_FILE_NAME = "L71_B30.TIF"
    BAND4_FILE_NAME = "L71_B40.TIF"
    BAND61_FILE_NAME = "L71_B61.TIF"
    BAND62_FILE_NAME = "L72_B62.TIF"
  END_GROUP = PRODUCT_METADATA
  GROUP = MIN_MAX_RADIANCE
    LMAX_BAND3 = 234.400
    LMIN_BAND3 = -5.000
    LMAX_BAND62 = 12.650
    LMIN_BAND62 = 3.200
  END_GROUP = MIN_MAX_RADIANCE
  GROUP = MIN_MAX_PIXEL_VALUE
    QCALMAX_BAND3 = 255.0
    QCALMIN_BAND3 = 1.0
    QCALMAX_BAND62 = 255.0
    QCALMIN_BAND62 = 1.0
  END_GROUP = MIN_MAX_PIXEL_VALUE
  GROUP = PRODUCT_PARAMETERS
    SUN_ELEVATION = 62.5
  END_GROUP = PRODUCT_PARAMETERS
END_GROUP = L1_METADATA_FILE
END
"#;

    fn legacy_scene() -> Scene {
        let doc = MtlParser::standard().parse_str(L7_LEGACY).unwrap();
        Scene::from_document("/data/L7", &doc).unwrap()
    }

    #[test]
    fn test_legacy_detection() {
        let scene = legacy_scene();
        assert_eq!(scene.spacecraft(), Spacecraft::L7);
        assert_eq!(scene.sensor(), Sensor::EtmPlus);
        assert_eq!(scene.format(), MetadataFormat::Legacy);
        assert_eq!(scene.metadata_name(), "L1_METADATA_FILE");
    }

    #[test]
    fn test_band_lookup() {
        let scene = legacy_scene();
        let band = scene.band("band6H").unwrap();
        assert_eq!(band.label, "6H");
        assert_eq!(band.file_name, "L72_B62.TIF");
        assert_eq!(band.path, PathBuf::from("/data/L7/L72_B62.TIF"));

        let band = scene.clone().with_infix("_clip").band("3").unwrap();
        assert_eq!(band.path, PathBuf::from("/data/L7/L71_B30_clip.TIF"));
    }

    #[test]
    fn test_unknown_band() {
        let scene = legacy_scene();
        match scene.band("band6") {
            Err(MtlError::UnknownBand { spacecraft, band, permitted }) => {
                assert_eq!(spacecraft, Spacecraft::L7);
                assert_eq!(band, "6");
                assert!(permitted.contains("6L"));
            }
            other => panic!("expected UnknownBand, got {:?}", other),
        }
        // Valid label, but the metadata lists no file for it
        assert!(matches!(scene.band("5"), Err(MtlError::MissingKey(_))));
    }

    #[test]
    fn test_legacy_calibration() {
        let scene = legacy_scene();
        let gb = scene.radiance_calibration("band3").unwrap();
        assert_abs_diff_eq!(gb.gain, 239.4 / 254.0, epsilon = 1e-12);

        let gb = scene.radiance_calibration("6H").unwrap();
        assert_abs_diff_eq!(gb.gain, (12.65 - 3.2) / 254.0, epsilon = 1e-12);
    }

    #[test]
    fn test_legacy_reflectance_and_temperature() {
        let scene = legacy_scene();
        let dn = array![[1.0, 255.0]];

        let reflectance = scene.reflectance_from_dn("3", &dn).unwrap();
        let d = sensors::earth_sun_distance(172);
        let expected = std::f64::consts::PI * 234.4 * d * d / (1551.0 * 62.5f64.to_radians().sin());
        assert_abs_diff_eq!(reflectance[[0, 1]], expected, epsilon = 1e-9);

        let kelvin = scene.brightness_temperature_from_dn("6H", &dn).unwrap();
        let expected = 1282.71 / (666.09 / 12.65 + 1.0f64).ln();
        assert_abs_diff_eq!(kelvin[[0, 1]], expected, epsilon = 1e-9);

        assert!(scene.brightness_temperature_from_dn("3", &dn).is_err());
    }

    #[test]
    fn test_ndvi_through_opener() {
        let scene = legacy_scene();
        let opener = InMemoryOpener::new()
            .with("/data/L7/L71_B40.TIF", InMemoryRaster::new(array![[3.0, 0.0]]))
            .with("/data/L7/L71_B30.TIF", InMemoryRaster::new(array![[1.0, 0.0]]));
        let ndvi = scene.ndvi(&opener).unwrap();
        assert_abs_diff_eq!(ndvi[[0, 0]], 0.5);
        assert!(ndvi[[0, 1]].is_nan());
        assert_eq!(scene.thermal_band().unwrap().label, "6H");
    }

    #[test]
    fn test_missing_top_group() {
        let doc = MtlParser::standard().parse_str("A = 1\nEND").unwrap();
        assert!(matches!(
            Scene::from_document("/tmp", &doc),
            Err(MtlError::MissingKey(_))
        ));
    }

    #[test]
    fn test_label_helpers() {
        assert_eq!(vcid_label("6L"), "6_VCID_1");
        assert_eq!(legacy_label("6H"), "62");
        assert_eq!(insert_infix("B1.TIF", "_x"), "B1_x.TIF");
        assert_eq!(insert_infix("B1", "_x"), "B1_x");
    }
}
