pub mod mtl;
pub mod raster;

pub use mtl::{
    find_metadata_file, parse_metadata, CoercionPolicy, DuplicateKeyPolicy, MtlParser, ParserConfig,
};
pub use raster::{InMemoryOpener, InMemoryRaster, RasterGeometry, RasterOpener, RasterSource};

#[cfg(feature = "gdal")]
pub use raster::{GdalOpener, GdalRaster};
