use approx::assert_abs_diff_eq;
use ndarray::{array, Array2, Array3};
use satmeta::core::radiometry::{
    dn_to_radiance, gain_bias, normalized_difference, radiance_to_celsius, radiance_to_kelvin,
};
use satmeta::core::sensors::{thermal_constants, ThermalConstants};
use satmeta::{MtlError, Spacecraft};

#[test]
fn test_published_calibration_example() {
    let gb = gain_bias(200.0, -2.0, 255.0, 1.0);
    assert_abs_diff_eq!(gb.gain, 0.7953, epsilon = 1e-4);
    assert_abs_diff_eq!(gb.bias, -2.795, epsilon = 1e-3);

    let radiance = dn_to_radiance(&array![1u8, 255], gb.gain, gb.bias);
    assert_abs_diff_eq!(radiance[0], -2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(radiance[1], 200.0, epsilon = 1e-9);
}

#[test]
fn test_zero_radiance_gives_non_finite_temperature() {
    let ThermalConstants { k1, k2 } = thermal_constants(Spacecraft::L5).unwrap();
    let radiance = array![[0.0f32, 8.0], [10.0, 12.0]];

    let kelvin = radiance_to_kelvin(&radiance, k1, k2);
    assert!(!kelvin[[0, 0]].is_finite());
    assert!(kelvin.iter().skip(1).all(|t| t.is_finite()));
    // Higher radiance, higher temperature
    assert!(kelvin[[0, 1]] < kelvin[[1, 0]] && kelvin[[1, 0]] < kelvin[[1, 1]]);

    let celsius = radiance_to_celsius(&radiance, k1, k2);
    assert_abs_diff_eq!(celsius[[1, 1]], kelvin[[1, 1]] - 273.15, epsilon = 1e-9);
}

#[test]
fn test_normalized_difference_on_any_dimension() {
    let a = Array3::from_elem((2, 3, 4), 3u16);
    let b = Array3::from_elem((2, 3, 4), 1u16);
    let index = normalized_difference(&a, &b).unwrap();
    assert_eq!(index.shape(), &[2, 3, 4]);
    assert!(index.iter().all(|v| (*v - 0.5).abs() < 1e-12));

    // Views work as well as owned arrays
    let wide = Array2::from_shape_fn((4, 4), |(i, j)| (i + j) as f64);
    let index = normalized_difference(&wide.slice(ndarray::s![.., ..2]), &wide.slice(ndarray::s![.., 2..]))
        .unwrap();
    assert_eq!(index.dim(), (4, 2));
    assert_abs_diff_eq!(index[[0, 0]], -1.0);
}

#[test]
fn test_normalized_difference_zero_sum_and_shapes() {
    let index = normalized_difference(&array![0.0, 2.0, -2.0], &array![0.0, 2.0, 2.0]).unwrap();
    assert!(index[0].is_nan());
    assert_abs_diff_eq!(index[1], 0.0);
    assert!(index[2].is_nan());

    let err = normalized_difference(&array![1.0, 2.0], &array![1.0, 2.0, 3.0]).unwrap_err();
    assert!(matches!(err, MtlError::ShapeMismatch { .. }));
}
