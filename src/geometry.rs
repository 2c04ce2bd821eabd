//! The application-side geometry of an image: grid size, physical spacing,
//! direction cosines and origin, plus the rescale parameters and pixel type
//! needed to interpret its voxel buffer.

use crate::datatype::{ComponentType, PixelLayout};
use crate::error::{NiftiError, Result};
use nalgebra::Matrix3;
use std::collections::BTreeMap;

/// Metadata key for the name of the reader which produced an image.
pub const INPUT_FILTER_NAME: &str = "InputFilterName";
/// Metadata key for the name of the on-disk storage type.
pub const ON_DISK_STORAGE_TYPE_NAME: &str = "OnDiskStorageTypeName";
/// Metadata key for the free-text description of the file.
pub const FILE_NOTES: &str = "FileNotes";

/// Free-form string metadata attached to an image.
pub type MetaDataDictionary = BTreeMap<String, String>;

/// Canonical geometry of an N-dimensional image, with physical quantities
/// in millimeters and seconds, and directions in LPS+ space.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeometry {
    /// Number of voxels along each axis.
    pub dimensions: Vec<usize>,
    /// Physical spacing along each axis.
    pub spacing: Vec<f64>,
    /// Unit vectors of the first three axes, one per column.
    ///
    /// Expected to be orthogonal, but not enforced: files from the wild
    /// occasionally are not.
    pub direction: Matrix3<f64>,
    /// Physical position of the first voxel, for up to three axes.
    pub origin: Vec<f64>,
    /// Multiplier recovering physical intensities from stored values.
    pub rescale_slope: f64,
    /// Offset recovering physical intensities from stored values.
    pub rescale_intercept: f64,
    /// Numeric type of each pixel component.
    pub component_type: ComponentType,
    /// Layout of the components within a pixel.
    pub pixel_layout: PixelLayout,
    /// Number of components per pixel.
    pub component_count: usize,
    /// Free-form metadata.
    pub metadata: MetaDataDictionary,
}

impl ImageGeometry {
    /// Create a geometry with the given grid size, unit spacing, identity
    /// direction, zero origin and identity rescale.
    ///
    /// # Errors
    ///
    /// - `NiftiError::InconsistentDim` if there are no dimensions, more than
    ///   seven, or any of them is zero.
    pub fn new<D: Into<Vec<usize>>>(dimensions: D) -> Result<Self> {
        let dimensions = dimensions.into();
        let rank = dimensions.len();
        if rank == 0 || rank > 7 {
            return Err(NiftiError::InconsistentDim(0, rank as u16));
        }
        if let Some(i) = dimensions.iter().position(|&d| d == 0) {
            return Err(NiftiError::InconsistentDim(i as u8 + 1, 0));
        }
        Ok(ImageGeometry {
            spacing: vec![1.0; rank],
            origin: vec![0.0; rank.min(3)],
            dimensions,
            direction: Matrix3::identity(),
            rescale_slope: 1.0,
            rescale_intercept: 0.0,
            component_type: ComponentType::default(),
            pixel_layout: PixelLayout::default(),
            component_count: 1,
            metadata: MetaDataDictionary::new(),
        })
    }

    /// Number of axes in use.
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// Total number of pixels, or `None` if it does not fit in `usize`.
    pub fn number_of_pixels(&self) -> Option<usize> {
        self.dimensions
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Look up a metadata entry.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let g = ImageGeometry::new(vec![4, 5]).unwrap();
        assert_eq!(g.rank(), 2);
        assert_eq!(g.number_of_pixels(), Some(20));
        assert_eq!(g.spacing, vec![1.0, 1.0]);
        assert_eq!(g.origin, vec![0.0, 0.0]);
        assert_eq!(g.direction, Matrix3::identity());
        assert_eq!(g.component_type, ComponentType::Unknown);
        assert_eq!(g.meta(FILE_NOTES), None);

        let g = ImageGeometry::new(vec![2, 2, 2, 3]).unwrap();
        assert_eq!(g.origin.len(), 3);
    }

    #[test]
    fn pixel_count_overflow() {
        let g = ImageGeometry::new(vec![usize::MAX / 2, 3]).unwrap();
        assert_eq!(g.number_of_pixels(), None);
    }

    #[test]
    fn bad_dimensions() {
        assert!(ImageGeometry::new(Vec::<usize>::new()).is_err());
        assert!(ImageGeometry::new(vec![1; 8]).is_err());
        assert!(matches!(
            ImageGeometry::new(vec![3, 0, 2]),
            Err(NiftiError::InconsistentDim(2, 0))
        ));
    }
}
