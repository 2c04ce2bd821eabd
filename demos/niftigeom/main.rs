//! An application for printing the physical geometry of a NIfTI-1 file.

use nifti_geometry::{NiftiImageIo, OrientationCode};
use std::env;

fn main() {
    let mut args = env::args().skip(1);
    let filename = args.next().expect("Path to NIFTI file is required");
    let geometry = NiftiImageIo::new()
        .read_image_information(&filename)
        .expect("Failed to read NIFTI file");
    let code = OrientationCode::from_direction_cosines(&geometry.direction);
    println!("dimensions: {:?}", geometry.dimensions);
    println!("spacing:    {:?}", geometry.spacing);
    println!("origin:     {:?}", geometry.origin);
    println!("direction:  {:?} ({:?})", code.labels(), geometry.direction);
    println!(
        "pixel:      {:?} {:?} x{}",
        geometry.component_type, geometry.pixel_layout, geometry.component_count
    );
    println!(
        "rescale:    {} * v + {}",
        geometry.rescale_slope, geometry.rescale_intercept
    );
    for (key, value) in &geometry.metadata {
        println!("{}: {}", key, value);
    }
}
