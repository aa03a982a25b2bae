//! Radiometric conversions for optical and thermal bands.
//!
//! All conversions work element-wise on `ndarray` arrays of any dimension and
//! widen their input to `f64`. Numeric edge cases never fail: division by
//! zero and logarithms of non-positive values come out as NaN or infinity.

use crate::types::{MtlError, MtlResult};
use ndarray::{Array, ArrayBase, Data, Dimension, Zip};
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

/// Offset between kelvin and degrees Celsius
pub const KELVIN_TO_CELSIUS: f64 = 273.15;
/// Planck constant, J s
pub const PLANCK: f64 = 6.626068e-34;
/// Speed of light, m/s
pub const SPEED_OF_LIGHT: f64 = 2.99792e8;
/// Boltzmann constant, J/K
pub const BOLTZMANN: f64 = 1.38065e-23;

/// Linear calibration of digital numbers to radiance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainBias {
    pub gain: f64,
    pub bias: f64,
}

/// Gain and bias from the radiance range and the quantized calibrated range
/// of a band.
pub fn gain_bias(lmax: f64, lmin: f64, qcalmax: f64, qcalmin: f64) -> GainBias {
    let span = qcalmax - qcalmin;
    GainBias {
        gain: (lmax - lmin) / span,
        bias: (qcalmax * lmin - qcalmin * lmax) / span,
    }
}

fn log_non_finite<D: Dimension>(what: &str, values: &Array<f64, D>) {
    if log::log_enabled!(log::Level::Debug) {
        let count = values.iter().filter(|v| !v.is_finite()).count();
        if count > 0 {
            log::debug!("{}: {} of {} values are not finite", what, count, values.len());
        }
    }
}

fn check_shapes<S1, S2, D>(a: &ArrayBase<S1, D>, b: &ArrayBase<S2, D>) -> MtlResult<()>
where
    S1: Data,
    S2: Data,
    D: Dimension,
{
    if a.shape() != b.shape() {
        return Err(MtlError::ShapeMismatch {
            left: a.shape().to_vec(),
            right: b.shape().to_vec(),
        });
    }
    Ok(())
}

/// `gain * DN + bias`
pub fn dn_to_radiance<S, T, D>(dn: &ArrayBase<S, D>, gain: f64, bias: f64) -> Array<f64, D>
where
    S: Data<Elem = T>,
    T: AsPrimitive<f64>,
    D: Dimension,
{
    let radiance = dn.mapv(|v| gain * v.as_() + bias);
    log_non_finite("Radiance", &radiance);
    radiance
}

/// Parallel version of [`dn_to_radiance`]
#[cfg(feature = "parallel")]
pub fn dn_to_radiance_parallel<S, T, D>(dn: &ArrayBase<S, D>, gain: f64, bias: f64) -> Array<f64, D>
where
    S: Data<Elem = T>,
    T: AsPrimitive<f64> + Send + Sync,
    D: Dimension,
{
    let radiance = Zip::from(dn).par_map_collect(|v| gain * v.as_() + bias);
    log_non_finite("Radiance", &radiance);
    radiance
}

/// Radiance of EO-1 Hyperion bands: `DN / factor`
pub fn scale_radiance<S, T, D>(dn: &ArrayBase<S, D>, factor: f64) -> Array<f64, D>
where
    S: Data<Elem = T>,
    T: AsPrimitive<f64>,
    D: Dimension,
{
    let radiance = dn.mapv(|v| v.as_() / factor);
    log_non_finite("Scaled radiance", &radiance);
    radiance
}

/// At-sensor brightness temperature in kelvin: `K2 / ln(K1 / L + 1)`.
/// Zero or negative radiance has no brightness temperature and gives NaN.
pub fn radiance_to_kelvin<S, T, D>(radiance: &ArrayBase<S, D>, k1: f64, k2: f64) -> Array<f64, D>
where
    S: Data<Elem = T>,
    T: AsPrimitive<f64>,
    D: Dimension,
{
    let kelvin = radiance.mapv(|v| {
        let l: f64 = v.as_();
        if l > 0.0 {
            k2 / (k1 / l + 1.0).ln()
        } else {
            f64::NAN
        }
    });
    log_non_finite("Brightness temperature", &kelvin);
    kelvin
}

pub fn radiance_to_celsius<S, T, D>(radiance: &ArrayBase<S, D>, k1: f64, k2: f64) -> Array<f64, D>
where
    S: Data<Elem = T>,
    T: AsPrimitive<f64>,
    D: Dimension,
{
    radiance_to_kelvin(radiance, k1, k2) - KELVIN_TO_CELSIUS
}

#[inline]
fn normdiff(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum == 0.0 {
        f64::NAN
    } else {
        (a - b) / sum
    }
}

/// `(A - B) / (A + B)`, NaN where `A + B == 0`
pub fn normalized_difference<S1, S2, T1, T2, D>(
    a: &ArrayBase<S1, D>,
    b: &ArrayBase<S2, D>,
) -> MtlResult<Array<f64, D>>
where
    S1: Data<Elem = T1>,
    S2: Data<Elem = T2>,
    T1: AsPrimitive<f64>,
    T2: AsPrimitive<f64>,
    D: Dimension,
{
    check_shapes(a, b)?;
    let index = Zip::from(a).and(b).map_collect(|x, y| normdiff(x.as_(), y.as_()));
    log_non_finite("Normalized difference", &index);
    Ok(index)
}

/// Parallel version of [`normalized_difference`]
#[cfg(feature = "parallel")]
pub fn normalized_difference_parallel<S1, S2, T1, T2, D>(
    a: &ArrayBase<S1, D>,
    b: &ArrayBase<S2, D>,
) -> MtlResult<Array<f64, D>>
where
    S1: Data<Elem = T1>,
    S2: Data<Elem = T2>,
    T1: AsPrimitive<f64> + Send + Sync,
    T2: AsPrimitive<f64> + Send + Sync,
    D: Dimension,
{
    check_shapes(a, b)?;
    let index = Zip::from(a).and(b).par_map_collect(|x, y| normdiff(x.as_(), y.as_()));
    log_non_finite("Normalized difference", &index);
    Ok(index)
}

/// Top-of-atmosphere reflectance from radiance:
/// `pi * L * d^2 / (ESUN * sin(sun elevation))`, with `d` in AU.
pub fn radiance_to_reflectance<S, T, D>(
    radiance: &ArrayBase<S, D>,
    earth_sun_distance: f64,
    esun: f64,
    sun_elevation_deg: f64,
) -> Array<f64, D>
where
    S: Data<Elem = T>,
    T: AsPrimitive<f64>,
    D: Dimension,
{
    let factor = std::f64::consts::PI * earth_sun_distance * earth_sun_distance
        / (esun * sun_elevation_deg.to_radians().sin());
    let reflectance = radiance.mapv(|v| v.as_() * factor);
    log_non_finite("Reflectance", &reflectance);
    reflectance
}

/// Top-of-atmosphere reflectance from rescaling factors delivered with the
/// product (Landsat 8): `(mult * DN + add) / sin(sun elevation)`
pub fn scaled_reflectance<S, T, D>(
    dn: &ArrayBase<S, D>,
    mult: f64,
    add: f64,
    sun_elevation_deg: f64,
) -> Array<f64, D>
where
    S: Data<Elem = T>,
    T: AsPrimitive<f64>,
    D: Dimension,
{
    let sin_elevation = sun_elevation_deg.to_radians().sin();
    let reflectance = dn.mapv(|v| (mult * v.as_() + add) / sin_elevation);
    log_non_finite("Reflectance", &reflectance);
    reflectance
}

/// Blackbody spectral radiance in W/(m^2 sr um) at wavelength `lambda_um`
/// (micrometres) and temperature `t` (kelvin)
pub fn planck_radiance(lambda_um: f64, t: f64) -> f64 {
    let lambda = lambda_um * 1.0e-6;
    1.0e-6 * (2.0 * PLANCK * SPEED_OF_LIGHT * SPEED_OF_LIGHT)
        / (lambda.powi(5) * ((PLANCK * SPEED_OF_LIGHT) / (lambda * BOLTZMANN * t)).exp_m1())
}

/// [`planck_radiance`] over an array of wavelengths
pub fn spectral_radiance<S, T, D>(wavelengths_um: &ArrayBase<S, D>, t: f64) -> Array<f64, D>
where
    S: Data<Elem = T>,
    T: AsPrimitive<f64>,
    D: Dimension,
{
    wavelengths_um.mapv(|v| planck_radiance(v.as_(), t))
}
