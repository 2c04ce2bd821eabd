//! Interfaces and implementations specific to integration with `ndarray`.
//!
//! #### Note on memory order
//!
//! NIfTI volumes are stored on disk in column major order (also called
//! Fortran order). The arrays produced here keep that memory order, so
//! indexing follows the image axes (`array[[i, j, k]]`) without any copy.
use super::VoxelBuffer;
use crate::datatype::ComponentType;
use crate::error::{NiftiError, Result};
use ndarray::{Array, IxDyn, ShapeBuilder};
use num_traits::AsPrimitive;

fn to_f64<T: AsPrimitive<f64>>(data: &[T]) -> Vec<f64> {
    data.iter().map(|v| v.as_()).collect()
}

impl VoxelBuffer {
    /// Convert a scalar buffer into an array of double precision values with
    /// the given shape.
    ///
    /// # Errors
    ///
    /// - `NiftiError::IncompatibleLength` if the shape does not match the
    ///   number of pixels.
    /// - `NiftiError::UnsupportedComponentType` for raw buffers.
    /// - `NiftiError::UnsupportedPixelLayout` for RGB buffers.
    pub fn to_ndarray_f64(&self, shape: &[usize]) -> Result<Array<f64, IxDyn>> {
        let data = match self {
            VoxelBuffer::U8(v) => to_f64(v),
            VoxelBuffer::I8(v) => to_f64(v),
            VoxelBuffer::U16(v) => to_f64(v),
            VoxelBuffer::I16(v) => to_f64(v),
            VoxelBuffer::U32(v) => to_f64(v),
            VoxelBuffer::I32(v) => to_f64(v),
            VoxelBuffer::F32(v) => to_f64(v),
            VoxelBuffer::F64(v) => v.clone(),
            VoxelBuffer::Rgb(_) => {
                return Err(NiftiError::UnsupportedPixelLayout(self.pixel_layout()))
            }
            VoxelBuffer::Raw(_) => {
                return Err(NiftiError::UnsupportedComponentType(ComponentType::Unknown))
            }
        };
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(NiftiError::VolumeTooLarge)?;
        if data.len() != expected {
            return Err(NiftiError::IncompatibleLength(data.len(), expected));
        }
        Array::from_shape_vec(IxDyn(shape).f(), data)
            .map_err(|_| NiftiError::IncompatibleLength(self.len(), expected))
    }
}
