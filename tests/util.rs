#![allow(dead_code)]
use approx::assert_abs_diff_eq;
use nifti_geometry::{ComponentType, ImageGeometry, NiftiHeader, NiftiType};
use std::fs;
use std::path::Path;

/// A 2x3x4 image of 16-bit integers, away from the origin and with
/// anisotropic spacing. All values are exact in single precision.
pub fn sample_geometry() -> ImageGeometry {
    let mut g = ImageGeometry::new(vec![2, 3, 4]).unwrap();
    g.spacing = vec![0.5, 1.25, 2.0];
    g.origin = vec![12.5, -7.25, 3.0];
    g.component_type = ComponentType::Short;
    g
}

/// A header for `sample_geometry`-sized volumes, without any spatial
/// transform.
pub fn sample_header() -> NiftiHeader {
    NiftiHeader {
        dim: [3, 2, 3, 4, 1, 1, 1, 1],
        datatype: NiftiType::Int16 as i16,
        bitpix: 16,
        pixdim: [1., 0.5, 1.25, 2., 1., 1., 1., 1.],
        ..NiftiHeader::default()
    }
}

/// Check that two geometries describe the same physical grid.
pub fn assert_same_grid(got: &ImageGeometry, expected: &ImageGeometry, eps: f64) {
    assert_eq!(got.dimensions, expected.dimensions);
    assert_eq!(got.spacing.len(), expected.spacing.len());
    for (g, e) in got.spacing.iter().zip(&expected.spacing) {
        assert_abs_diff_eq!(g, e, epsilon = eps);
    }
    assert_eq!(got.origin.len(), expected.origin.len());
    for (g, e) in got.origin.iter().zip(&expected.origin) {
        assert_abs_diff_eq!(g, e, epsilon = eps);
    }
    assert_abs_diff_eq!(got.direction, expected.direction, epsilon = eps);
    assert_eq!(got.component_type, expected.component_type);
    assert_eq!(got.pixel_layout, expected.pixel_layout);
}

/// Turn the header file of a written pair into an Analyze 7.5 header with
/// the given orientation byte.
pub fn make_analyze<P: AsRef<Path>>(hdr_path: P, orient: u8) {
    let mut raw = fs::read(&hdr_path).unwrap();
    raw[344..348].copy_from_slice(&[0, 0, 0, 0]);
    raw[252] = orient;
    fs::write(&hdr_path, raw).unwrap();
}
