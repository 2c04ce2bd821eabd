//! Discrete anatomical orientation codes and their conversion to and from
//! direction cosines.
//!
//! Two physical frames are involved. The on-disk transforms map voxel
//! indices to RAS+ coordinates, where x grows towards the subject's right
//! and y towards the front. The canonical direction cosines live in LPS+,
//! which is the same frame with the x and y axes reversed. An [`AxisLabel`] names the side an axis
//! starts from, so `Left` is an axis running from left to right.

use crate::affine::{get_affine_and_translation, Affine3, Affine4};
use crate::typedef::Analyze75Orientation;
use nalgebra::{Matrix3, Vector3};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use tracing::{debug, warn};

/// Threshold below which two normalized axes are taken as orthogonal.
const ORTHOGONALITY_TOLERANCE: f64 = 1.0e-4;

/// The anatomical side a voxel axis starts from.
/// Values follow the NIfTI `NIFTI_L2R` ... `NIFTI_S2I` codes.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
pub enum AxisLabel {
    /// No orientation information.
    Unknown = 0,
    /// Left to right.
    Left = 1,
    /// Right to left.
    Right = 2,
    /// Posterior to anterior.
    Posterior = 3,
    /// Anterior to posterior.
    Anterior = 4,
    /// Inferior to superior.
    Inferior = 5,
    /// Superior to inferior.
    Superior = 6,
}

impl AxisLabel {
    /// Decode an axis label, mapping out of range codes to `Unknown`.
    pub fn from_code(code: u8) -> Self {
        AxisLabel::from_u8(code).unwrap_or(AxisLabel::Unknown)
    }

    /// The label of the reversed axis.
    pub fn opposite(self) -> Self {
        use AxisLabel::*;
        match self {
            Unknown => Unknown,
            Left => Right,
            Right => Left,
            Posterior => Anterior,
            Anterior => Posterior,
            Inferior => Superior,
            Superior => Inferior,
        }
    }

    /// The anatomical plane index shared by a label and its opposite:
    /// 0 for left/right, 1 for posterior/anterior, 2 for inferior/superior.
    pub fn plane(self) -> Option<usize> {
        match self {
            AxisLabel::Unknown => None,
            label => Some((label as usize - 1) / 2),
        }
    }

    /// Unit vector of an axis with this label in the canonical (LPS+)
    /// frame. `Unknown` yields the zero vector.
    pub fn direction(self) -> Vector3<f64> {
        use AxisLabel::*;
        match self {
            Unknown => Vector3::zeros(),
            Left => Vector3::new(-1.0, 0.0, 0.0),
            Right => Vector3::new(1.0, 0.0, 0.0),
            Posterior => Vector3::new(0.0, -1.0, 0.0),
            Anterior => Vector3::new(0.0, 1.0, 0.0),
            Inferior => Vector3::new(0.0, 0.0, 1.0),
            Superior => Vector3::new(0.0, 0.0, -1.0),
        }
    }

    /// The label of an axis pointing along on-disk (RAS+) world axis
    /// `world_axis`, in the direction given by the sign of `sign`.
    fn from_world_axis(world_axis: usize, sign: f64) -> Self {
        use AxisLabel::*;
        match (world_axis, sign > 0.0) {
            (0, true) => Left,
            (0, false) => Right,
            (1, true) => Posterior,
            (1, false) => Anterior,
            (2, true) => Inferior,
            (2, false) => Superior,
            _ => Unknown,
        }
    }
}

/// How the direction cosines of an image are derived from its on-disk
/// transform.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum OrientationPolicy {
    /// Snap the transform to the nearest orientation code, so that the
    /// directions are always signed unit axes.
    NearestAxis,
    /// Keep the normalized columns of the transform as they are, oblique
    /// directions included.
    Exact,
}

impl Default for OrientationPolicy {
    fn default() -> Self {
        OrientationPolicy::NearestAxis
    }
}

impl OrientationPolicy {
    /// Direction cosines, in the canonical (LPS+) frame, of the given
    /// on-disk (RAS+) voxel-to-world transform.
    pub fn direction_cosines(self, affine: &Affine4) -> Matrix3<f64> {
        match self {
            OrientationPolicy::NearestAxis => {
                OrientationCode::from_affine(affine).to_direction_cosines()
            }
            OrientationPolicy::Exact => exact_direction_cosines(affine),
        }
    }
}

const PRIMARY_SHIFT: u32 = 0;
const SECONDARY_SHIFT: u32 = 8;
const TERTIARY_SHIFT: u32 = 16;
const LABEL_MASK: u32 = 0xFF;

/// A packed triple of axis labels, for the primary, secondary and tertiary
/// voxel axes, one byte each.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct OrientationCode(u32);

impl OrientationCode {
    /// All three axes unknown.
    pub const UNKNOWN: OrientationCode = OrientationCode(0);
    /// Right, posterior, inferior: axial slices.
    pub const RPI: OrientationCode =
        OrientationCode::new(AxisLabel::Right, AxisLabel::Posterior, AxisLabel::Inferior);
    /// Posterior, inferior, right: sagittal slices.
    pub const PIR: OrientationCode =
        OrientationCode::new(AxisLabel::Posterior, AxisLabel::Inferior, AxisLabel::Right);
    /// Right, inferior, posterior: coronal slices.
    pub const RIP: OrientationCode =
        OrientationCode::new(AxisLabel::Right, AxisLabel::Inferior, AxisLabel::Posterior);

    /// Pack three axis labels.
    pub const fn new(primary: AxisLabel, secondary: AxisLabel, tertiary: AxisLabel) -> Self {
        OrientationCode(
            (primary as u32) << PRIMARY_SHIFT
                | (secondary as u32) << SECONDARY_SHIFT
                | (tertiary as u32) << TERTIARY_SHIFT,
        )
    }

    /// Wrap an already packed code.
    pub const fn from_raw(raw: u32) -> Self {
        OrientationCode(raw)
    }

    /// The packed representation.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Unpack the primary, secondary and tertiary labels.
    pub fn labels(self) -> [AxisLabel; 3] {
        let label = |shift: u32| AxisLabel::from_code(((self.0 >> shift) & LABEL_MASK) as u8);
        [
            label(PRIMARY_SHIFT),
            label(SECONDARY_SHIFT),
            label(TERTIARY_SHIFT),
        ]
    }

    /// Whether all three labels are known and lie in distinct anatomical
    /// planes.
    pub fn is_valid(self) -> bool {
        let planes = self.labels();
        match (planes[0].plane(), planes[1].plane(), planes[2].plane()) {
            (Some(a), Some(b), Some(c)) => a != b && b != c && a != c,
            _ => false,
        }
    }

    /// Direction cosines of this orientation, in the canonical (LPS+)
    /// frame, one column per voxel axis.
    ///
    /// Malformed codes are not rejected: unknown labels produce zero
    /// columns and repeated planes produce parallel columns.
    pub fn to_direction_cosines(self) -> Matrix3<f64> {
        let [i, j, k] = self.labels();
        Matrix3::from_columns(&[i.direction(), j.direction(), k.direction()])
    }

    /// The orientation nearest to the given canonical (LPS+) direction
    /// cosines. This is an approximation for oblique directions, and the
    /// exact inverse of [`to_direction_cosines`] for valid codes.
    ///
    /// [`to_direction_cosines`]: #method.to_direction_cosines
    pub fn from_direction_cosines(direction: &Matrix3<f64>) -> Self {
        Self::from_rotation(&to_disk_frame(direction))
    }

    /// The orientation nearest to the 3x3 block of an on-disk (RAS+)
    /// voxel-to-world transform.
    pub fn from_affine(affine: &Affine4) -> Self {
        let (rotation, _) = get_affine_and_translation(affine);
        Self::from_rotation(&rotation)
    }

    /// The orientation nearest to an on-disk (RAS+) rotation, possibly
    /// scaled and not quite orthogonal.
    ///
    /// The columns are normalized and orthogonalized, and then the signed
    /// permutation matrix `P` of the same handedness which brings `P * Q`
    /// closest to identity (largest trace) is searched exhaustively. Ties
    /// go to the first candidate in search order. A zero column, or a
    /// singular matrix, yields `OrientationCode::UNKNOWN`.
    pub fn from_rotation(rotation: &Affine3) -> Self {
        let q = match orthonormalize_columns(rotation) {
            Some(q) => q,
            None => {
                warn!("transform has a zero axis, orientation is unknown");
                return OrientationCode::UNKNOWN;
            }
        };
        let det_q = q.determinant();
        if det_q == 0.0 {
            warn!("transform is singular, orientation is unknown");
            return OrientationCode::UNKNOWN;
        }

        let mut best_trace = f64::NEG_INFINITY;
        let mut best = ([0usize, 1, 2], [1.0f64, 1.0, 1.0]);
        for (axes, signs) in signed_permutations() {
            let mut p = Matrix3::zeros();
            for row in 0..3 {
                p[(row, axes[row])] = signs[row];
            }
            if p.determinant() * det_q <= 0.0 {
                continue;
            }
            let trace = (p * q).trace();
            if trace > best_trace {
                best_trace = trace;
                best = (axes, signs);
            }
        }

        let (axes, signs) = best;
        OrientationCode::new(
            AxisLabel::from_world_axis(axes[0], signs[0]),
            AxisLabel::from_world_axis(axes[1], signs[1]),
            AxisLabel::from_world_axis(axes[2], signs[2]),
        )
    }
}

impl From<Analyze75Orientation> for OrientationCode {
    /// Only the unflipped transverse and sagittal orientations map to their
    /// own code. Flipped orientations are not found in practice, and they
    /// collapse, together with coronal and unknown ones, into
    /// `OrientationCode::RIP`.
    fn from(orient: Analyze75Orientation) -> Self {
        match orient {
            Analyze75Orientation::TransverseUnflipped => OrientationCode::RPI,
            Analyze75Orientation::SagittalUnflipped => OrientationCode::PIR,
            other => {
                debug!(orientation = ?other, "legacy orientation read as RIP");
                OrientationCode::RIP
            }
        }
    }
}

/// Convert between the canonical (LPS+) and on-disk (RAS+) frames, which
/// differ in the sign of their first two world axes. The conversion is its
/// own inverse.
pub fn to_disk_frame(m: &Matrix3<f64>) -> Matrix3<f64> {
    let mut out = *m;
    for r in 0..2 {
        for c in 0..3 {
            out[(r, c)] = -out[(r, c)];
        }
    }
    out
}

/// Direction cosines taken as they are from an on-disk transform: the
/// normalized columns, converted to the canonical frame. Zero columns stay
/// zero.
pub fn exact_direction_cosines(affine: &Affine4) -> Matrix3<f64> {
    let (mut rotation, _) = get_affine_and_translation(affine);
    for c in 0..3 {
        let norm = rotation.column(c).norm();
        if norm > 0.0 {
            let unit = rotation.column(c) / norm;
            rotation.set_column(c, &unit);
        }
    }
    to_disk_frame(&rotation)
}

/// All 48 pairs of (world axis per voxel axis, sign per voxel axis), in a
/// fixed order: axis permutations in lexicographic order, then signs from
/// negative to positive with the first voxel axis varying slowest.
fn signed_permutations() -> impl Iterator<Item = ([usize; 3], [f64; 3])> {
    const PERMUTATIONS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    const SIGNS: [f64; 2] = [-1.0, 1.0];
    PERMUTATIONS.iter().flat_map(|&axes| {
        SIGNS.iter().flat_map(move |&p| {
            SIGNS
                .iter()
                .flat_map(move |&q| SIGNS.iter().map(move |&r| (axes, [p, q, r])))
        })
    })
}

/// Normalize the columns of `m`, then make the second column orthogonal to
/// the first and the third orthogonal to both, whenever they are not
/// already orthogonal within tolerance.
fn orthonormalize_columns(m: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    let unit = |v: Vector3<f64>| {
        let norm = v.norm();
        if norm == 0.0 {
            None
        } else {
            Some(v / norm)
        }
    };
    let remove = |v: Vector3<f64>, from: &Vector3<f64>| {
        let d = v.dot(from);
        if d.abs() > ORTHOGONALITY_TOLERANCE {
            unit(v - from * d)
        } else {
            Some(v)
        }
    };

    let i = unit(m.column(0).into_owned())?;
    let j = unit(m.column(1).into_owned())?;
    let k = unit(m.column(2).into_owned())?;
    let j = remove(j, &i)?;
    let k = remove(k, &i)?;
    let k = remove(k, &j)?;
    Some(Matrix3::from_columns(&[i, j, k]))
}
