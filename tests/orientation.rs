use approx::assert_abs_diff_eq;
use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3};
use nifti_geometry::orientation::to_disk_frame;
use nifti_geometry::{Analyze75Orientation, AxisLabel, OrientationCode, OrientationPolicy};
use pretty_assertions::assert_eq;

const LABELS: [AxisLabel; 6] = [
    AxisLabel::Left,
    AxisLabel::Right,
    AxisLabel::Posterior,
    AxisLabel::Anterior,
    AxisLabel::Inferior,
    AxisLabel::Superior,
];

fn valid_codes() -> Vec<OrientationCode> {
    let mut codes = Vec::new();
    for &i in &LABELS {
        for &j in &LABELS {
            for &k in &LABELS {
                let code = OrientationCode::new(i, j, k);
                if code.is_valid() {
                    codes.push(code);
                }
            }
        }
    }
    codes
}

#[test]
fn every_valid_code_round_trips() {
    let codes = valid_codes();
    assert_eq!(codes.len(), 48);
    for code in codes {
        let direction = code.to_direction_cosines();
        assert_abs_diff_eq!(direction.determinant().abs(), 1.0);
        assert_eq!(OrientationCode::from_direction_cosines(&direction), code);
    }
}

#[test]
fn small_perturbations_snap_back() {
    let tilt = *Rotation3::from_axis_angle(&Vector3::y_axis(), 0.05).matrix();
    for code in valid_codes() {
        let direction = tilt * code.to_direction_cosines();
        assert_eq!(OrientationCode::from_direction_cosines(&direction), code);
    }
}

#[test]
fn scaled_affine_snaps_to_code() {
    // 2mm voxels, first axis running right to left
    #[rustfmt::skip]
    let affine = Matrix4::new(
        -2.0, 0.0, 0.0,   90.0,
         0.0, 2.0, 0.0, -126.0,
         0.0, 0.0, 2.0,  -72.0,
         0.0, 0.0, 0.0,    1.0,
    );
    let code = OrientationCode::from_affine(&affine);
    assert_eq!(
        code.labels(),
        [AxisLabel::Right, AxisLabel::Posterior, AxisLabel::Inferior]
    );
    assert_eq!(code, OrientationCode::RPI);
    assert_eq!(
        OrientationPolicy::NearestAxis.direction_cosines(&affine),
        Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, 1.0))
    );
    assert_abs_diff_eq!(
        OrientationPolicy::Exact.direction_cosines(&affine),
        Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, 1.0))
    );
}

#[test]
fn unknown_labels_give_zero_columns() {
    let code = OrientationCode::new(AxisLabel::Left, AxisLabel::Unknown, AxisLabel::Inferior);
    assert!(!code.is_valid());
    let direction = code.to_direction_cosines();
    assert_eq!(direction.column(1).norm(), 0.0);
    assert_eq!(
        OrientationCode::from_direction_cosines(&direction),
        OrientationCode::UNKNOWN
    );
}

#[test]
fn legacy_orientations() {
    use Analyze75Orientation::*;
    assert_eq!(OrientationCode::from(TransverseUnflipped), OrientationCode::RPI);
    assert_eq!(OrientationCode::from(SagittalUnflipped), OrientationCode::PIR);
    for &orient in &[
        CoronalUnflipped,
        TransverseFlipped,
        CoronalFlipped,
        SagittalFlipped,
        Unknown,
    ] {
        assert_eq!(OrientationCode::from(orient), OrientationCode::RIP);
    }
}

#[test]
fn disk_frame_flips_first_two_rows() {
    let m = Matrix3::new(1., 2., 3., 4., 5., 6., 7., 8., 9.);
    assert_eq!(
        to_disk_frame(&m),
        Matrix3::new(-1., -2., -3., -4., -5., -6., 7., 8., 9.)
    );
    assert_eq!(to_disk_frame(&to_disk_frame(&m)), m);
}
