//! Construction of the on-disk spatial transforms from a canonical image
//! geometry.
//!
//! The 4x4 matrices are the single source of truth. Quaternion parameters
//! are derived from them when a header is filled in.

use crate::affine::{
    affine_to_quaternion, checked_inverse, from_affine_and_translation,
    get_affine_and_translation, make_orthogonal, Affine3, Affine4,
};
use crate::error::Result;
use crate::geometry::ImageGeometry;
use crate::header::NiftiHeader;
use crate::orientation::to_disk_frame;
use crate::typedef::XForm;
use nalgebra::{Matrix3, Vector3};

/// Quaternion representation of a rigid transform, as stored in the
/// `quatern_*` header fields and `pixdim[0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuaternionParams {
    /// Second quaternion component.
    pub b: f64,
    /// Third quaternion component.
    pub c: f64,
    /// Fourth quaternion component.
    pub d: f64,
    /// Translation, in millimeters.
    pub offset: Vector3<f64>,
    /// Handedness factor, `-1` for improper rotations and `1` otherwise.
    pub qfac: f64,
}

/// The voxel-to-world transforms of an image, with their inverses.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialTransform {
    /// Rigid voxel-to-world transform, without grid spacing.
    pub qto_xyz: Affine4,
    /// Inverse of `qto_xyz`.
    pub qto_ijk: Affine4,
    /// Voxel-to-world transform including grid spacing.
    pub sto_xyz: Affine4,
    /// Inverse of `sto_xyz`.
    pub sto_ijk: Affine4,
}

impl SpatialTransform {
    /// Build the on-disk transforms of the given geometry.
    ///
    /// The direction cosines are converted to the on-disk frame and
    /// re-orthogonalized, so approximately orthogonal directions are
    /// accepted. Images of rank two or less get a third axis perpendicular
    /// to the first two.
    ///
    /// # Errors
    ///
    /// - `NiftiError::DegenerateGeometry` if the directions are linearly
    ///   dependent or a resulting transform cannot be inverted.
    pub fn synthesize(geometry: &ImageGeometry) -> Result<Self> {
        let rank = geometry.rank();
        let mut direction = geometry.direction;
        if rank <= 2 {
            direction.set_column(2, &Vector3::zeros());
        }
        let disk = to_disk_frame(&direction);
        let rows = [
            disk.column(0).into_owned(),
            disk.column(1).into_owned(),
            disk.column(2).into_owned(),
        ];
        let rotation = make_orthogonal(rows)?.transpose();

        let origin = |i: usize| geometry.origin.get(i).copied().unwrap_or(0.0);
        let translation = Vector3::new(-origin(0), -origin(1), origin(2));

        let spacing = |i: usize| geometry.spacing.get(i).copied().unwrap_or(1.0);
        let scaled = rotation * Matrix3::from_diagonal(&Vector3::new(spacing(0), spacing(1), spacing(2)));

        let qto_xyz = from_affine_and_translation(&rotation, &translation);
        let sto_xyz = from_affine_and_translation(&scaled, &translation);
        Ok(SpatialTransform {
            qto_ijk: checked_inverse(&qto_xyz)?,
            sto_ijk: checked_inverse(&sto_xyz)?,
            qto_xyz,
            sto_xyz,
        })
    }

    /// The quaternion parameters of the rigid transform.
    pub fn quaternion(&self) -> QuaternionParams {
        let (mut rotation, offset): (Affine3, _) = get_affine_and_translation(&self.qto_xyz);
        let qfac = if rotation.determinant() < 0.0 {
            let flipped = -rotation.column(2);
            rotation.set_column(2, &flipped);
            -1.0
        } else {
            1.0
        };
        let q = affine_to_quaternion(&rotation);
        QuaternionParams {
            b: q[1],
            c: q[2],
            d: q[3],
            offset,
            qfac,
        }
    }

    /// Store both transforms in the header, as scanner-anatomical
    /// coordinates. The grid spacings in `pixdim[1..]` are left untouched.
    pub fn apply_to(&self, header: &mut NiftiHeader) {
        let q = self.quaternion();
        header.quatern_b = q.b as f32;
        header.quatern_c = q.c as f32;
        header.quatern_d = q.d as f32;
        header.quatern_x = q.offset.x as f32;
        header.quatern_y = q.offset.y as f32;
        header.quatern_z = q.offset.z as f32;
        header.pixdim[0] = q.qfac as f32;

        let row = |r: usize| {
            let mut out = [0.0f32; 4];
            for (c, v) in out.iter_mut().enumerate() {
                *v = self.sto_xyz[(r, c)] as f32;
            }
            out
        };
        header.srow_x = row(0);
        header.srow_y = row(1);
        header.srow_z = row(2);

        header.qform_code = XForm::ScannerAnat as i16;
        header.sform_code = XForm::ScannerAnat as i16;
    }
}
