//! Matrix and quaternion helpers shared by the read and write paths.
//!
//! All arithmetic happens in `f64`, even though the header stores its
//! transform parameters in single precision.

use crate::error::{NiftiError, Result};
use nalgebra::{Matrix3, Matrix4, Quaternion, Vector3, Vector4};

/// 3x3 rotation (or rotation + scaling) block of a spatial transform.
pub type Affine3 = Matrix3<f64>;
/// 4x4 homogeneous spatial transform, mapping voxel indices to millimeters.
pub type Affine4 = Matrix4<f64>;

/// Below this, `1 - (b² + c² + d²)` is taken as zero and the quaternion
/// describes a 180 degree rotation.
const QUATERNION_THRESHOLD: f64 = 1.0e-7;

/// Below this, a determinant is considered numerically zero.
pub(crate) const SINGULAR_THRESHOLD: f64 = 1.0e-6;

/// Separate a 4x4 affine into its 3x3 affine and translation components.
pub fn get_affine_and_translation(affine: &Affine4) -> (Affine3, Vector3<f64>) {
    let translation = Vector3::new(affine[(0, 3)], affine[(1, 3)], affine[(2, 3)]);
    let affine = affine.fixed_view::<3, 3>(0, 0).into_owned();
    (affine, translation)
}

/// Assemble a 4x4 affine from its 3x3 affine and translation components.
pub fn from_affine_and_translation(affine: &Affine3, translation: &Vector3<f64>) -> Affine4 {
    let mut out = Affine4::identity();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(affine);
    out.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    out
}

/// Compute unit quaternion from last 3 values.
///
/// If w, x, y, z are the values in the full quaternion, assumes w is positive.
/// w = 0.0 corresponds to a 180 degree rotation, which is also what we fall
/// back to when `1.0 - (x*x + y*y + z*z)` is too close to zero (or negative):
/// in that case `(x, y, z)` is normalized instead.
pub(crate) fn fill_positive(xyz: Vector3<f64>) -> Quaternion<f64> {
    let w2 = 1.0 - xyz.dot(&xyz);
    if w2 < QUATERNION_THRESHOLD {
        let norm = xyz.norm();
        if norm == 0.0 {
            return Quaternion::identity();
        }
        let xyz = xyz / norm;
        Quaternion::new(0.0, xyz.x, xyz.y, xyz.z)
    } else {
        Quaternion::new(w2.sqrt(), xyz.x, xyz.y, xyz.z)
    }
}

/// Calculate quaternion corresponding to given rotation matrix.
///
/// Method claimed to be robust to numerical errors in `affine`. Constructs quaternion by
/// calculating maximum eigenvector for matrix `k` (constructed from input `affine`). Although this
/// is not tested, a maximum eigenvalue of 1 corresponds to a valid rotation.
///
/// A quaternion `q * -1.0` corresponds to the same rotation as `q`; thus the sign of the
/// reconstructed quaternion is arbitrary, and we return quaternions with positive `w` `(q[0])`.
///
/// Bar-Itzhack, Itzhack Y. "New method for extracting the quaternion from a rotation
/// matrix", AIAA Journal of Guidance, Control and Dynamics 23(6):1085-1087, 2000
pub(crate) fn affine_to_quaternion(affine: &Affine3) -> Vector4<f64> {
    // qyx refers to the contribution of the y input vector component to the x output vector
    // component. qyx is therefore the same as M[0, 1].
    let qxx = affine[(0, 0)];
    let qyx = affine[(0, 1)];
    let qzx = affine[(0, 2)];
    let qxy = affine[(1, 0)];
    let qyy = affine[(1, 1)];
    let qzy = affine[(1, 2)];
    let qxz = affine[(2, 0)];
    let qyz = affine[(2, 1)];
    let qzz = affine[(2, 2)];

    // Fill only lower half of symmetric matrix
    #[rustfmt::skip]
    let k = Affine4::new(
        qxx - qyy - qzz, 0.0,             0.0,             0.0,
        qyx + qxy,       qyy - qxx - qzz, 0.0,             0.0,
        qzx + qxz,       qzy + qyz,       qzz - qxx - qyy, 0.0,
        qyz - qzy,       qzx - qxz,       qxy - qyx,       qxx + qyy + qzz,
    );

    // Only the lower triangle is read by the decomposition
    let eigen = k.symmetric_eigen();

    // Select largest eigenvector, reorder to w,x,y,z quaternion
    let max_idx = eigen.eigenvalues.imax();
    let max_vector = eigen.eigenvectors.column(max_idx);
    let quaternion = Vector4::new(max_vector[3], max_vector[0], max_vector[1], max_vector[2]);

    // Prefer quaternion with positive `w`.
    if quaternion[0] < 0.0 {
        -quaternion
    } else {
        quaternion
    }
}

/// Calculate rotation matrix corresponding to quaternion.
///
/// Rotation matrix applies to column vectors, and is applied to the left of coordinate vectors.
/// The algorithm here allows non-unit quaternions.
///
/// Algorithm from https://en.wikipedia.org/wiki/Rotation_matrix#Quaternion
pub(crate) fn quaternion_to_affine(q: Quaternion<f64>) -> Affine3 {
    let nq = q.w * q.w + q.i * q.i + q.j * q.j + q.k * q.k;
    if nq < f64::EPSILON {
        return Affine3::identity();
    }
    let s = 2.0 / nq;
    let x = q.i * s;
    let y = q.j * s;
    let z = q.k * s;
    let wx = q.w * x;
    let wy = q.w * y;
    let wz = q.w * z;
    let xx = q.i * x;
    let xy = q.i * y;
    let xz = q.i * z;
    let yy = q.j * y;
    let yz = q.j * z;
    let zz = q.k * z;
    #[rustfmt::skip]
    let m = Affine3::new(
        1.0 - (yy + zz), xy - wz, xz + wy,
        xy + wz, 1.0 - (xx + zz), yz - wx,
        xz - wy, yz + wx, 1.0 - (xx + yy),
    );
    m
}

/// Build an orthogonal matrix out of three row vectors.
///
/// Each row is normalized first. A zero first or second row is replaced by
/// the matching unit basis vector, and a zero third row by the cross product
/// of the first two. The result is the orthogonal matrix nearest to the
/// normalized rows (polar decomposition), so the first two rows are matched
/// as closely as a valid rotation allows.
///
/// # Errors
///
/// - `NiftiError::DegenerateGeometry` if the normalized rows are linearly
///   dependent.
pub fn make_orthogonal(rows: [Vector3<f64>; 3]) -> Result<Affine3> {
    let unit = |v: Vector3<f64>| {
        let norm = v.norm();
        if norm > 0.0 {
            Some(v / norm)
        } else {
            None
        }
    };
    let r0 = unit(rows[0]).unwrap_or_else(Vector3::x);
    let r1 = unit(rows[1]).unwrap_or_else(Vector3::y);
    let r2 = unit(rows[2]).unwrap_or_else(|| r0.cross(&r1));

    let q = Affine3::from_rows(&[r0.transpose(), r1.transpose(), r2.transpose()]);
    if q.determinant().abs() < SINGULAR_THRESHOLD {
        return Err(NiftiError::DegenerateGeometry);
    }

    let svd = q.svd(true, true);
    match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => Ok(u * v_t),
        _ => Err(NiftiError::DegenerateGeometry),
    }
}

/// Invert a homogeneous transform, failing when it is numerically singular.
pub fn checked_inverse(affine: &Affine4) -> Result<Affine4> {
    if affine.determinant().abs() < SINGULAR_THRESHOLD {
        return Err(NiftiError::DegenerateGeometry);
    }
    affine.try_inverse().ok_or(NiftiError::DegenerateGeometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Rotation3, Unit};

    #[test]
    fn quaternion_round_trip() {
        let axis = Unit::new_normalize(Vector3::new(0.3, -0.5, 0.8));
        let rotation = Rotation3::from_axis_angle(&axis, 0.7).into_inner();
        let q = affine_to_quaternion(&rotation);
        assert!(q[0] >= 0.0);
        let back = quaternion_to_affine(fill_positive(Vector3::new(q[1], q[2], q[3])));
        assert_abs_diff_eq!(back, rotation, epsilon = 1e-9);
    }

    #[test]
    fn half_turn_quaternion() {
        let q = fill_positive(Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(q.w, 0.0);
        #[rustfmt::skip]
        let expected = Affine3::new(
            -1.0, 0.0, 0.0,
            0.0, -1.0, 0.0,
            0.0, 0.0, 1.0,
        );
        assert_abs_diff_eq!(quaternion_to_affine(q), expected, epsilon = 1e-12);
    }

    #[test]
    fn orthogonalize_near_orthogonal_rows() {
        let m = make_orthogonal([
            Vector3::new(1.0, 0.01, 0.0),
            Vector3::new(0.0, 1.0, 0.02),
            Vector3::new(0.0, 0.0, 1.0),
        ])
        .unwrap();
        assert_abs_diff_eq!(m * m.transpose(), Affine3::identity(), epsilon = 1e-12);
        assert!(m[(0, 0)] > 0.99 && m[(1, 1)] > 0.99 && m[(2, 2)] > 0.99);
    }

    #[test]
    fn orthogonalize_fills_in_third_row() {
        let m = make_orthogonal([Vector3::x(), Vector3::y(), Vector3::zeros()]).unwrap();
        assert_abs_diff_eq!(m, Affine3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn orthogonalize_keeps_handedness() {
        let m = make_orthogonal([Vector3::x(), Vector3::y(), -Vector3::z()]).unwrap();
        assert_abs_diff_eq!(m.determinant(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn collinear_rows_are_degenerate() {
        let err = make_orthogonal([Vector3::x(), Vector3::x(), Vector3::zeros()]);
        assert!(matches!(err, Err(NiftiError::DegenerateGeometry)));
    }

    #[test]
    fn singular_inverse_is_degenerate() {
        let m = Affine4::from_diagonal(&Vector4::new(1.0, 0.0, 1.0, 1.0));
        assert!(matches!(checked_inverse(&m), Err(NiftiError::DegenerateGeometry)));
        let m = Affine4::from_diagonal(&Vector4::new(2.0, 4.0, 0.5, 1.0));
        assert_abs_diff_eq!(
            checked_inverse(&m).unwrap(),
            Affine4::from_diagonal(&Vector4::new(0.5, 0.25, 2.0, 1.0)),
            epsilon = 1e-12
        );
    }
}
