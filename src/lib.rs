//! Physical geometry for NIfTI-1 and Analyze 7.5 images.
//!
//! This crate reads and writes NIfTI-1 files (single ".nii" files and
//! ".hdr"/".img" pairs, optionally gzipped) and translates their on-disk
//! description into the canonical geometry of an image: grid size, spacing
//! in millimeters and seconds, direction cosines and origin in LPS+ space,
//! plus the intensity rescale and pixel type of its voxels. Writing goes the
//! other way, synthesizing both the quaternion and the affine transforms
//! from the geometry.
//!
//! # Example
//!
//! ```no_run
//! use nifti_geometry::NiftiImageIo;
//! # use nifti_geometry::Result;
//!
//! # fn run() -> Result<()> {
//! let io = NiftiImageIo::new();
//! let geometry = io.read_image_information("brain.nii.gz")?;
//! println!("{:?} voxels, spacing {:?}", geometry.dimensions, geometry.spacing);
//! println!("origin {:?}", geometry.origin);
//! # Ok(())
//! # }
//! ```
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

pub mod affine;
pub mod datatype;
pub mod error;
pub mod geometry;
pub mod header;
pub mod io;
pub mod object;
pub mod orientation;
pub mod transform;
pub mod typedef;
pub mod units;
mod util;
pub mod volume;
pub mod writer;

pub use byteordered::Endianness;
pub use datatype::{ComponentType, PixelLayout, PixelType};
pub use error::{NiftiError, Result};
pub use geometry::{ImageGeometry, MetaDataDictionary};
pub use header::NiftiHeader;
pub use io::NiftiImageIo;
pub use object::InMemNiftiObject;
pub use orientation::{AxisLabel, OrientationCode, OrientationPolicy};
pub use transform::SpatialTransform;
pub use typedef::*;
pub use volume::VoxelBuffer;
pub use writer::WriterOptions;
