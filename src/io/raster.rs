//! Raster access used by scenes to load band pixels.
//!
//! Scenes only need a band as a 2-D `f64` array plus its georeference, so
//! readers are modelled as a capability trait. An in-memory implementation
//! is always available; the GDAL-backed one needs the `gdal` feature.

use crate::types::{GeoTransform, MtlError, MtlResult, RealImage};
use ndarray::Array1;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A single-band raster
pub trait RasterSource {
    /// (width, height) in pixels
    fn raster_size(&self) -> (usize, usize);

    /// Read the whole band as rows x columns
    fn read_array(&self) -> MtlResult<RealImage>;

    fn georeference(&self) -> MtlResult<GeoTransform>;

    fn geometry(&self) -> MtlResult<RasterGeometry> {
        let (ncol, nrow) = self.raster_size();
        Ok(RasterGeometry::new(self.georeference()?, ncol, nrow))
    }
}

/// Opens band files referenced by a scene
pub trait RasterOpener {
    fn open(&self, path: &Path) -> MtlResult<Box<dyn RasterSource>>;
}

/// Raster held in memory, for computed products and tests
#[derive(Debug, Clone)]
pub struct InMemoryRaster {
    data: RealImage,
    transform: Option<GeoTransform>,
}

impl InMemoryRaster {
    pub fn new(data: RealImage) -> Self {
        Self { data, transform: None }
    }

    pub fn with_georeference(mut self, transform: GeoTransform) -> Self {
        self.transform = Some(transform);
        self
    }
}

impl RasterSource for InMemoryRaster {
    fn raster_size(&self) -> (usize, usize) {
        let (rows, cols) = self.data.dim();
        (cols, rows)
    }

    fn read_array(&self) -> MtlResult<RealImage> {
        Ok(self.data.clone())
    }

    fn georeference(&self) -> MtlResult<GeoTransform> {
        self.transform
            .ok_or_else(|| MtlError::Processing("In-memory raster has no georeference".to_string()))
    }
}

/// Opener serving rasters registered by path
#[derive(Debug, Clone, Default)]
pub struct InMemoryOpener {
    rasters: HashMap<PathBuf, InMemoryRaster>,
}

impl InMemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: Into<PathBuf>>(&mut self, path: P, raster: InMemoryRaster) {
        self.rasters.insert(path.into(), raster);
    }

    pub fn with<P: Into<PathBuf>>(mut self, path: P, raster: InMemoryRaster) -> Self {
        self.insert(path, raster);
        self
    }
}

impl RasterOpener for InMemoryOpener {
    fn open(&self, path: &Path) -> MtlResult<Box<dyn RasterSource>> {
        match self.rasters.get(path) {
            Some(raster) => Ok(Box::new(raster.clone())),
            None => Err(MtlError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("No raster registered for {}", path.display()),
            ))),
        }
    }
}

#[cfg(feature = "gdal")]
pub use self::gdal_backend::{GdalOpener, GdalRaster};

#[cfg(feature = "gdal")]
mod gdal_backend {
    use super::{RasterOpener, RasterSource};
    use crate::types::{GeoTransform, MtlError, MtlResult, RealImage};
    use gdal::Dataset;
    use ndarray::Array2;
    use std::path::Path;

    /// First band of a GDAL-readable file (GeoTIFF for Level-1 scenes)
    pub struct GdalRaster {
        dataset: Dataset,
    }

    impl GdalRaster {
        pub fn open<P: AsRef<Path>>(path: P) -> MtlResult<Self> {
            log::debug!("Opening raster: {}", path.as_ref().display());
            let dataset = Dataset::open(path.as_ref())?;
            Ok(Self { dataset })
        }
    }

    impl RasterSource for GdalRaster {
        fn raster_size(&self) -> (usize, usize) {
            self.dataset.raster_size()
        }

        fn read_array(&self) -> MtlResult<RealImage> {
            let (width, height) = self.dataset.raster_size();
            let rasterband = self.dataset.rasterband(1)?;
            let band_data = rasterband.read_as::<f64>((0, 0), (width, height), (width, height), None)?;

            Array2::from_shape_vec((height, width), band_data.data)
                .map_err(|e| MtlError::Processing(format!("Failed to reshape band data: {}", e)))
        }

        fn georeference(&self) -> MtlResult<GeoTransform> {
            Ok(GeoTransform::from_gdal(self.dataset.geo_transform()?))
        }
    }

    /// Opens band files from disk through GDAL
    #[derive(Debug, Clone, Copy, Default)]
    pub struct GdalOpener;

    impl RasterOpener for GdalOpener {
        fn open(&self, path: &Path) -> MtlResult<Box<dyn RasterSource>> {
            Ok(Box::new(GdalRaster::open(path)?))
        }
    }
}

/// Georeference plus pixel dimensions of a raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterGeometry {
    pub transform: GeoTransform,
    pub ncol: usize,
    pub nrow: usize,
}

impl RasterGeometry {
    pub fn new(transform: GeoTransform, ncol: usize, nrow: usize) -> Self {
        Self { transform, ncol, nrow }
    }

    pub fn upper_left(&self) -> (f64, f64) {
        (self.transform.top_left_x, self.transform.top_left_y)
    }

    /// Outer corner of the last pixel, rotation terms included
    pub fn lower_right(&self) -> (f64, f64) {
        let gt = &self.transform;
        let (ncol, nrow) = (self.ncol as f64, self.nrow as f64);
        (
            gt.top_left_x + ncol * gt.pixel_width + nrow * gt.rotation_x,
            gt.top_left_y + ncol * gt.rotation_y + nrow * gt.pixel_height,
        )
    }

    /// Evenly spaced x coordinates from the left to the right edge, one per column
    pub fn eastings(&self) -> Array1<f64> {
        let (ulx, _) = self.upper_left();
        let (lrx, _) = self.lower_right();
        Array1::linspace(ulx, lrx, self.ncol)
    }

    /// Evenly spaced y coordinates from the top to the bottom edge, one per row
    pub fn northings(&self) -> Array1<f64> {
        let (_, uly) = self.upper_left();
        let (_, lry) = self.lower_right();
        Array1::linspace(uly, lry, self.nrow)
    }

    /// Map coordinates of the pixel centres as (x per column, y per row)
    pub fn pixel_centres(&self) -> (Array1<f64>, Array1<f64>) {
        let gt = &self.transform;
        let x = Array1::from_shape_fn(self.ncol, |j| gt.top_left_x + (j as f64 + 0.5) * gt.pixel_width);
        let y = Array1::from_shape_fn(self.nrow, |i| gt.top_left_y + (i as f64 + 0.5) * gt.pixel_height);
        (x, y)
    }

    /// Map coordinates of the upper-left corner of pixel (row i, column j).
    /// `i == nrow` and `j == ncol` address the far edges.
    pub fn ij_to_xy(&self, i: f64, j: f64) -> MtlResult<(f64, f64)> {
        if !(0.0..=self.nrow as f64).contains(&i) || !(0.0..=self.ncol as f64).contains(&j) {
            return Err(MtlError::InvalidValue {
                key: "pixel index".to_string(),
                reason: format!(
                    "({}, {}) outside raster of {} rows and {} columns",
                    i, j, self.nrow, self.ncol
                ),
            });
        }
        let gt = &self.transform;
        Ok((
            gt.top_left_x + j * gt.pixel_width,
            gt.top_left_y + i * gt.pixel_height,
        ))
    }

    /// Fractional (row, column) position of a map coordinate
    pub fn xy_to_ij_precise(&self, x: f64, y: f64) -> MtlResult<(f64, f64)> {
        let (ulx, uly) = self.upper_left();
        let (lrx, lry) = self.lower_right();
        let (xmin, xmax) = (ulx.min(lrx), ulx.max(lrx));
        let (ymin, ymax) = (lry.min(uly), lry.max(uly));
        if !(xmin..=xmax).contains(&x) || !(ymin..=ymax).contains(&y) {
            return Err(MtlError::InvalidValue {
                key: "map coordinate".to_string(),
                reason: format!(
                    "({}, {}) outside raster extent x {}..{}, y {}..{}",
                    x, y, xmin, xmax, ymin, ymax
                ),
            });
        }
        let i = (1.0 - (y - lry) / (uly - lry)) * self.nrow as f64;
        let j = (x - ulx) / (lrx - ulx) * self.ncol as f64;
        Ok((i, j))
    }

    /// Pixel (row, column) containing a map coordinate
    pub fn xy_to_ij(&self, x: f64, y: f64) -> MtlResult<(usize, usize)> {
        let (i, j) = self.xy_to_ij_precise(x, y)?;
        Ok((i.floor() as usize, j.floor() as usize))
    }
}
