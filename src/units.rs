//! Conversion of the packed `xyzt_units` header field into scale factors
//! towards millimeters and seconds.
//!
//! Files with unset or unrecognized unit selectors are common in the wild.
//! They are taken to already be in millimeters and seconds, rather than
//! rejected.

use crate::typedef::Unit;
use num_traits::FromPrimitive;
use tracing::debug;

/// Mask of the spatial unit selector within `xyzt_units`.
pub const SPACE_MASK: u8 = 0o0007;
/// Mask of the temporal unit selector within `xyzt_units`.
pub const TIME_MASK: u8 = 0o0070;

/// Multipliers turning raw grid spacings into physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScale {
    /// Factor towards millimeters, for the three spatial axes.
    pub spatial: f64,
    /// Factor towards seconds, for the fourth axis.
    pub temporal: f64,
}

impl Default for UnitScale {
    fn default() -> Self {
        UnitScale {
            spatial: 1.0,
            temporal: 1.0,
        }
    }
}

impl UnitScale {
    /// Decode both unit selectors of a packed `xyzt_units` byte.
    pub fn from_xyzt_units(xyzt_units: u8) -> Self {
        UnitScale {
            spatial: spatial_scale(xyzt_units & SPACE_MASK),
            temporal: temporal_scale(xyzt_units & TIME_MASK),
        }
    }

    /// Scale the raw spacing of axis `axis` (0-based) into millimeters or
    /// seconds. Axes beyond the fourth have no defined unit and are kept
    /// as they are.
    pub fn apply(&self, axis: usize, raw_spacing: f64) -> f64 {
        match axis {
            0..=2 => raw_spacing * self.spatial,
            3 => raw_spacing * self.temporal,
            _ => raw_spacing,
        }
    }
}

/// Scale factor from the given spatial unit code to millimeters.
pub fn spatial_scale(code: u8) -> f64 {
    match Unit::from_u8(code) {
        Some(Unit::Meter) => 1e3,
        Some(Unit::Mm) => 1.0,
        Some(Unit::Micron) => 1e-3,
        _ => {
            debug!(code, "unrecognized spatial unit, assuming millimeters");
            1.0
        }
    }
}

/// Scale factor from the given temporal unit code to seconds.
pub fn temporal_scale(code: u8) -> f64 {
    match Unit::from_u8(code) {
        Some(Unit::Sec) => 1.0,
        Some(Unit::Msec) => 1e-3,
        Some(Unit::Usec) => 1e-6,
        _ => {
            debug!(code, "unrecognized temporal unit, assuming seconds");
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_units() {
        let s = UnitScale::from_xyzt_units(Unit::Mm as u8 | Unit::Sec as u8);
        assert_eq!(s, UnitScale::default());
    }

    #[test]
    fn spatial_units() {
        assert_eq!(spatial_scale(Unit::Meter as u8), 1000.0);
        assert_eq!(spatial_scale(Unit::Mm as u8), 1.0);
        assert_eq!(spatial_scale(Unit::Micron as u8), 0.001);
        assert_eq!(spatial_scale(Unit::Unknown as u8), 1.0);
        assert_eq!(spatial_scale(7), 1.0);
    }

    #[test]
    fn temporal_units() {
        assert_eq!(temporal_scale(Unit::Sec as u8), 1.0);
        assert_eq!(temporal_scale(Unit::Msec as u8), 1e-3);
        assert_eq!(temporal_scale(Unit::Usec as u8), 1e-6);
        assert_eq!(temporal_scale(Unit::Unknown as u8), 1.0);
        // spectral units fall outside the temporal mask
        assert_eq!(temporal_scale(Unit::Hz as u8 & TIME_MASK), 1.0);
    }

    #[test]
    fn packed_selectors_are_independent() {
        let s = UnitScale::from_xyzt_units(Unit::Micron as u8 | Unit::Msec as u8);
        assert_eq!(s.spatial, 1e-3);
        assert_eq!(s.temporal, 1e-3);
        assert_abs_diff_eq!(s.apply(0, 500.0), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(s.apply(3, 2000.0), 2.0, epsilon = 1e-12);
        assert_eq!(s.apply(4, 3.0), 3.0);

        let s = UnitScale::from_xyzt_units(Unit::Meter as u8);
        assert_eq!(s.spatial, 1e3);
        assert_eq!(s.temporal, 1.0);
    }
}
