//! The image I/O facade: reading a NIfTI-1 or Analyze 7.5 file into an
//! [`ImageGeometry`] and a voxel buffer, and writing them back.
//!
//! Every operation runs through a fixed sequence of stages and either
//! completes or fails as a whole. Nothing is kept between operations.
//!
//! [`ImageGeometry`]: ../geometry/struct.ImageGeometry.html

use crate::affine::get_affine_and_translation;
use crate::datatype::{classify_code, storage_type_name, to_nifti};
use crate::error::{NiftiError, Result};
use crate::geometry::{
    ImageGeometry, FILE_NOTES, INPUT_FILTER_NAME, ON_DISK_STORAGE_TYPE_NAME,
};
use crate::header::NiftiHeader;
use crate::object::{open_header, InMemNiftiObject};
use crate::orientation::{OrientationCode, OrientationPolicy};
use crate::transform::SpatialTransform;
use crate::typedef::Unit;
use crate::units::UnitScale;
use crate::util::is_complete_filename;
use crate::volume::rescale::needs_rescale;
use crate::volume::VoxelBuffer;
use crate::writer::WriterOptions;
use flate2::Compression;
use std::path::Path;
use tracing::{debug, warn};

/// Name recorded under `InputFilterName` in the metadata of read images.
pub const READER_NAME: &str = "NiftiImageIO";

#[derive(Debug, Clone, Copy)]
enum ReadStage {
    Idle,
    HeaderIngested,
    Classified,
    OrientationResolved,
    UnitsNormalized,
    Ready,
}

#[derive(Debug, Clone, Copy)]
enum WriteStage {
    Idle,
    GeometryCollected,
    Synthesized,
    Classified,
    Ready,
}

/// Options and flags for reading and writing images, and the operations
/// using them.
///
/// # Example
///
/// ```no_run
/// use nifti_geometry::{NiftiImageIo, OrientationPolicy};
/// # use nifti_geometry::error::Result;
///
/// # fn run() -> Result<()> {
/// let io = NiftiImageIo::new().orientation_policy(OrientationPolicy::Exact);
/// let (geometry, voxels) = io.read_image("brain.nii.gz")?;
/// io.write_image("copy.nii", &geometry, &voxels)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiImageIo {
    orientation_policy: OrientationPolicy,
    apply_rescale: bool,
    compression: Compression,
    description: Option<String>,
}

impl Default for NiftiImageIo {
    fn default() -> Self {
        NiftiImageIo {
            orientation_policy: OrientationPolicy::default(),
            apply_rescale: true,
            compression: Compression::fast(),
            description: None,
        }
    }
}

impl NiftiImageIo {
    /// Creates a new set of options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how direction cosines are derived from on-disk transforms.
    pub fn orientation_policy(mut self, policy: OrientationPolicy) -> Self {
        self.orientation_policy = policy;
        self
    }

    /// Sets whether `read_image` applies the stored slope and intercept to
    /// the voxel values.
    pub fn apply_rescale(mut self, apply: bool) -> Self {
        self.apply_rescale = apply;
        self
    }

    /// Sets the compression level for ".gz" outputs.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the description written to the header. If unset, the image's
    /// `FileNotes` metadata is written instead.
    pub fn description<T: Into<String>>(mut self, description: T) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether `path` names a file whose header can be read.
    pub fn can_read_file<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        is_complete_filename(path) && open_header(path).is_ok()
    }

    /// Whether `path` names a file which can be written.
    pub fn can_write_file<P: AsRef<Path>>(&self, path: P) -> bool {
        is_complete_filename(path)
    }

    /// Read the geometry of the image at `path`, without its voxels.
    ///
    /// # Errors
    ///
    /// - `NiftiError::HeaderRead` if the header could not be read or
    ///   decoded.
    pub fn read_image_information<P: AsRef<Path>>(&self, path: P) -> Result<ImageGeometry> {
        let path = path.as_ref();
        let (_, header, _) = open_header(path).map_err(|e| header_read(path, e))?;
        self.ingest_header(&header)
    }

    /// Read the geometry and voxels of the image at `path`. Unless disabled,
    /// the voxel values are rescaled when the stored slope is above one or
    /// the intercept is not zero.
    ///
    /// # Errors
    ///
    /// - `NiftiError::HeaderRead` if the header could not be read or
    ///   decoded.
    /// - `NiftiError::MissingVolumeFile` if the volume of a header/data
    ///   pair is missing.
    /// - `NiftiError::UnsupportedComponentType` if scalar voxels of an
    ///   unknown type need to be rescaled.
    pub fn read_image<P: AsRef<Path>>(&self, path: P) -> Result<(ImageGeometry, VoxelBuffer)> {
        let path = path.as_ref();
        let (hdr_path, header, stream) = open_header(path).map_err(|e| header_read(path, e))?;
        let geometry = self.ingest_header(&header)?;
        let (_, mut voxels) = InMemNiftiObject::from_header_file(&hdr_path, header, stream)?
            .into_parts();
        if self.apply_rescale && needs_rescale(geometry.rescale_slope, geometry.rescale_intercept)
        {
            debug!(
                slope = geometry.rescale_slope,
                intercept = geometry.rescale_intercept,
                "rescaling voxel values"
            );
            voxels.rescale(
                geometry.pixel_layout,
                geometry.rescale_slope,
                geometry.rescale_intercept,
            )?;
        }
        Ok((geometry, voxels))
    }

    /// Derive the canonical geometry described by a header.
    ///
    /// Headers without any spatial transform code are read with their
    /// Analyze 7.5 orientation, a zero origin and no rescaling. Otherwise
    /// the quaternion transform is used when present, and the affine
    /// transform if not.
    ///
    /// # Errors
    ///
    /// - `NiftiError::InconsistentDim` if the header's dimensions are
    ///   invalid.
    pub fn ingest_header(&self, header: &NiftiHeader) -> Result<ImageGeometry> {
        read_stage(ReadStage::Idle);
        let dims: Vec<usize> = header.dim()?.iter().map(|&d| usize::from(d)).collect();
        let mut geometry = ImageGeometry::new(dims)?;
        let rank = geometry.rank();
        read_stage(ReadStage::HeaderIngested);

        if let Some(pixel) = classify_code(header.datatype) {
            geometry.component_type = pixel.component_type;
            geometry.pixel_layout = pixel.layout;
            geometry.component_count = pixel.components;
        }
        if let Ok(data_type) = header.data_type() {
            let _ = geometry.metadata.insert(
                ON_DISK_STORAGE_TYPE_NAME.to_string(),
                storage_type_name(data_type).to_string(),
            );
        }
        read_stage(ReadStage::Classified);

        if header.qform_code == 0 && header.sform_code == 0 {
            let code = OrientationCode::from(header.analyze75_orientation());
            geometry.direction = code.to_direction_cosines();
            geometry.rescale_slope = 1.;
            geometry.rescale_intercept = 0.;
            geometry.origin = vec![0.; rank.min(3)];
        } else {
            let affine = if header.qform_code > 0 {
                header.qform_affine()
            } else {
                header.sform_affine()
            };
            geometry.direction = self.orientation_policy.direction_cosines(&affine);
            if geometry.direction.column_iter().any(|c| c.norm() == 0.) {
                warn!("degenerate spatial transform, some directions are unknown");
            }
            geometry.rescale_slope = match f64::from(header.scl_slope) {
                s if s == 0. => 1.,
                s => s,
            };
            geometry.rescale_intercept = f64::from(header.scl_inter);
            let (_, t) = get_affine_and_translation(&affine);
            geometry.origin = [-t.x, -t.y, t.z][..rank.min(3)].to_vec();
        }
        read_stage(ReadStage::OrientationResolved);

        let scale = UnitScale::from_xyzt_units(header.xyzt_units);
        for (i, s) in geometry.spacing.iter_mut().enumerate() {
            let raw = f64::from(header.pixdim[i + 1]);
            let raw = if raw == 0. || !raw.is_finite() {
                debug!(axis = i, pixdim = raw, "unusable grid spacing, using 1");
                1.
            } else {
                raw
            };
            *s = scale.apply(i, raw);
        }
        read_stage(ReadStage::UnitsNormalized);

        let _ = geometry
            .metadata
            .insert(INPUT_FILTER_NAME.to_string(), READER_NAME.to_string());
        let _ = geometry
            .metadata
            .insert(FILE_NOTES.to_string(), header.description_str());
        read_stage(ReadStage::Ready);
        Ok(geometry)
    }

    /// Build the header describing `geometry`, as it would be written to
    /// `path`. No file is touched.
    ///
    /// # Errors
    ///
    /// - `NiftiError::InvalidFilename` if `path` has no NIfTI extension.
    /// - `NiftiError::InconsistentDim` if the geometry has no dimensions,
    ///   more than seven, or dimensions not representable in a header.
    /// - `NiftiError::DegenerateGeometry` if the directions do not make an
    ///   invertible transform.
    /// - `NiftiError::UnsupportedComponentType` and
    ///   `NiftiError::UnsupportedPixelLayout` if the pixel type has no
    ///   on-disk equivalent.
    /// - `NiftiError::IncorrectDescriptionLength` if the description is
    ///   longer than 80 bytes.
    pub fn write_image_information<P: AsRef<Path>>(
        &self,
        path: P,
        geometry: &ImageGeometry,
    ) -> Result<NiftiHeader> {
        let path = path.as_ref();
        write_stage(WriteStage::Idle);
        if !is_complete_filename(path) {
            return Err(NiftiError::InvalidFilename(path.to_owned()));
        }
        let rank = geometry.rank();
        if rank == 0 || rank > 7 {
            return Err(NiftiError::InconsistentDim(0, rank as u16));
        }
        let mut dim = [1u16; 8];
        let mut pixdim = [1f32; 8];
        dim[0] = rank as u16;
        for (i, &d) in geometry.dimensions.iter().enumerate() {
            dim[i + 1] = match d {
                1..=0x7FFF => d as u16,
                _ => return Err(NiftiError::InconsistentDim(i as u8 + 1, d.min(0xFFFF) as u16)),
            };
            pixdim[i + 1] = geometry.spacing.get(i).copied().unwrap_or(1.) as f32;
        }
        write_stage(WriteStage::GeometryCollected);

        let transform = SpatialTransform::synthesize(geometry)?;
        write_stage(WriteStage::Synthesized);

        let data_type = to_nifti(geometry.component_type, geometry.pixel_layout)?;
        write_stage(WriteStage::Classified);

        let mut header = NiftiHeader {
            dim,
            pixdim,
            datatype: data_type as i16,
            bitpix: (data_type.size_of() * 8) as i16,
            xyzt_units: Unit::Mm as u8 | Unit::Sec as u8,
            scl_slope: 1.,
            scl_inter: 0.,
            ..NiftiHeader::default()
        };
        transform.apply_to(&mut header);
        match &self.description {
            Some(d) => header.set_description_str(d.as_str())?,
            None => {
                if let Some(notes) = geometry.meta(FILE_NOTES) {
                    header.set_description_str(notes)?;
                }
            }
        }
        write_stage(WriteStage::Ready);
        Ok(header)
    }

    /// Write an image to `path`. A ".hdr" or ".img" name writes a
    /// header/data pair, and any name ending in ".gz" is compressed.
    ///
    /// The voxel values are written as they are, with an identity rescale.
    ///
    /// # Errors
    ///
    /// Any error of `write_image_information`, before a file is created,
    /// as well as:
    ///
    /// - `NiftiError::UnsupportedComponentType` if the buffer does not hold
    ///   values of the data type the geometry is stored as.
    /// - `NiftiError::UnsupportedPixelLayout` if the buffer holds scalars
    ///   for an RGB geometry, or the other way around.
    /// - `NiftiError::IncompatibleLength` if the buffer does not hold one
    ///   value per pixel.
    pub fn write_image<P: AsRef<Path>>(
        &self,
        path: P,
        geometry: &ImageGeometry,
        voxels: &VoxelBuffer,
    ) -> Result<()> {
        let path = path.as_ref();
        let header = self.write_image_information(path, geometry)?;
        // `Long` and `ULong` geometries are stored as 32-bit integers too
        if voxels.data_type().map(|t| t as i16) != Some(header.datatype) {
            if voxels.pixel_layout() != geometry.pixel_layout {
                return Err(NiftiError::UnsupportedPixelLayout(voxels.pixel_layout()));
            }
            return Err(NiftiError::UnsupportedComponentType(voxels.component_type()));
        }
        WriterOptions::new(path)
            .compression(self.compression)
            .write(&header, voxels)
    }
}

fn header_read(path: &Path, e: NiftiError) -> NiftiError {
    NiftiError::HeaderRead(path.to_owned(), Box::new(e))
}

fn read_stage(stage: ReadStage) {
    debug!(?stage, "read");
}

fn write_stage(stage: WriteStage) {
    debug!(?stage, "write");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::{ComponentType, PixelLayout};
    use crate::typedef::{Analyze75Orientation, NiftiType};
    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix3, Vector3};

    fn legacy_header(orient: Analyze75Orientation) -> NiftiHeader {
        NiftiHeader {
            dim: [3, 4, 4, 4, 1, 1, 1, 1],
            datatype: NiftiType::Int16 as i16,
            bitpix: 16,
            scl_slope: 3.,
            scl_inter: 2.,
            srow_x: [9., 0., 0., 5.],
            legacy_orient: orient as u8,
            ..NiftiHeader::default()
        }
    }

    #[test]
    fn legacy_transverse() {
        let g = NiftiImageIo::new()
            .ingest_header(&legacy_header(Analyze75Orientation::TransverseUnflipped))
            .unwrap();
        assert_eq!(
            g.direction,
            Matrix3::from_diagonal(&Vector3::new(1., -1., 1.))
        );
        assert_eq!(g.origin, vec![0., 0., 0.]);
        assert_eq!(g.rescale_slope, 1.);
        assert_eq!(g.rescale_intercept, 0.);
        assert_eq!(g.component_type, ComponentType::Short);
        assert_eq!(g.meta(ON_DISK_STORAGE_TYPE_NAME), Some("short"));
        assert_eq!(g.meta(INPUT_FILTER_NAME), Some(READER_NAME));
    }

    #[test]
    fn legacy_flipped_collapses() {
        let g = NiftiImageIo::new()
            .ingest_header(&legacy_header(Analyze75Orientation::SagittalFlipped))
            .unwrap();
        assert_eq!(g.direction, OrientationCode::RIP.to_direction_cosines());
    }

    #[test]
    fn sform_fallback_and_units() {
        let header = NiftiHeader {
            dim: [4, 2, 2, 2, 5, 1, 1, 1],
            pixdim: [1., 2., 2., 3., 500., 1., 1., 1.],
            datatype: NiftiType::Float32 as i16,
            bitpix: 32,
            sform_code: 2,
            srow_x: [2., 0., 0., -10.],
            srow_y: [0., 2., 0., 20.],
            srow_z: [0., 0., 3., 30.],
            xyzt_units: Unit::Meter as u8 | Unit::Msec as u8,
            scl_slope: 0.,
            scl_inter: 0.,
            ..NiftiHeader::default()
        };
        let g = NiftiImageIo::new().ingest_header(&header).unwrap();
        assert_eq!(g.dimensions, vec![2, 2, 2, 5]);
        assert_eq!(g.origin, vec![10., -20., 30.]);
        assert_eq!(g.direction, Matrix3::from_diagonal(&Vector3::new(-1., -1., 1.)));
        assert_eq!(g.rescale_slope, 1.);
        assert_abs_diff_eq!(g.spacing[0], 2000., epsilon = 1e-9);
        assert_abs_diff_eq!(g.spacing[2], 3000., epsilon = 1e-9);
        assert_abs_diff_eq!(g.spacing[3], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn unusable_spacing_becomes_one() {
        let header = NiftiHeader {
            dim: [3, 2, 2, 2, 1, 1, 1, 1],
            pixdim: [1., 0., f32::NAN, f32::INFINITY, 1., 1., 1., 1.],
            datatype: NiftiType::Uint8 as i16,
            bitpix: 8,
            qform_code: 1,
            xyzt_units: Unit::Micron as u8,
            ..NiftiHeader::default()
        };
        let g = NiftiImageIo::new().ingest_header(&header).unwrap();
        for s in &g.spacing {
            assert_abs_diff_eq!(*s, 1e-3, epsilon = 1e-12);
        }
        assert!(NiftiImageIo::new()
            .write_image_information("out.nii", &g)
            .is_ok());
    }

    #[test]
    fn unknown_datatype_is_not_handled() {
        let header = NiftiHeader {
            dim: [1, 4, 1, 1, 1, 1, 1, 1],
            datatype: NiftiType::Complex64 as i16,
            bitpix: 64,
            ..NiftiHeader::default()
        };
        let g = NiftiImageIo::new().ingest_header(&header).unwrap();
        assert_eq!(g.component_type, ComponentType::Unknown);
        assert_eq!(g.pixel_layout, PixelLayout::Scalar);
        assert_eq!(g.origin, vec![0.]);
    }

    #[test]
    fn bad_filename_is_rejected_first() {
        let mut g = ImageGeometry::new(vec![2, 2]).unwrap();
        g.component_type = ComponentType::LongLong;
        assert!(matches!(
            NiftiImageIo::new().write_image_information("out.dat", &g),
            Err(NiftiError::InvalidFilename(_))
        ));
        assert!(matches!(
            NiftiImageIo::new().write_image_information("out.nii", &g),
            Err(NiftiError::UnsupportedComponentType(ComponentType::LongLong))
        ));
    }

    #[test]
    fn written_header_fields() {
        let mut g = ImageGeometry::new(vec![3, 4]).unwrap();
        g.component_type = ComponentType::UChar;
        g.pixel_layout = PixelLayout::Rgb;
        g.spacing = vec![0.5, 2.];
        let header = NiftiImageIo::new()
            .description("phantom")
            .write_image_information("out.nii", &g)
            .unwrap();
        assert_eq!(header.dim, [2, 3, 4, 1, 1, 1, 1, 1]);
        assert_eq!(&header.pixdim[1..4], &[0.5, 2., 1.]);
        assert_eq!(header.datatype, NiftiType::Rgb24 as i16);
        assert_eq!(header.bitpix, 24);
        assert_eq!(header.xyzt_units, 2 | 8);
        assert_eq!(header.scl_slope, 1.);
        assert_eq!(header.description_str(), "phantom");
        assert_eq!(header.qform_code, 1);
    }

    #[test]
    fn can_write() {
        let io = NiftiImageIo::new();
        assert!(io.can_write_file("a.nii.gz"));
        assert!(io.can_write_file("a.img"));
        assert!(!io.can_write_file("a.dat"));
        assert!(!io.can_read_file("does/not/exist.nii"));
    }
}
