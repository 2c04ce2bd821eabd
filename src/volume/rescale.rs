//! In-place intensity rescaling of decoded voxel buffers.

use super::VoxelBuffer;
use crate::datatype::{ComponentType, PixelLayout};
use crate::error::{NiftiError, Result};
use num_traits::AsPrimitive;

/// Whether stored values with the given slope and intercept need to be
/// rescaled when read.
///
/// Only slopes above one trigger a rescale: a slope in `(0, 1)` with a zero
/// intercept leaves the stored values as they are.
pub fn needs_rescale(slope: f64, intercept: f64) -> bool {
    slope > 1.0 || intercept != 0.0
}

/// Replace every value `v` with `v * slope + intercept`, computed in double
/// precision and cast back to the element type. Casts to integer types
/// truncate toward zero and saturate at the bounds of the type.
pub fn rescale_in_place<T>(data: &mut [T], slope: f64, intercept: f64)
where
    T: 'static + Copy + AsPrimitive<f64>,
    f64: AsPrimitive<T>,
{
    for v in data.iter_mut() {
        *v = (v.as_() * slope + intercept).as_();
    }
}

impl VoxelBuffer {
    /// Rescale the buffer in place.
    ///
    /// Buffers of pixels with more than one component are never rescaled.
    ///
    /// # Errors
    ///
    /// - `NiftiError::UnsupportedComponentType` if a non-empty scalar buffer
    ///   holds values of an unknown type.
    pub fn rescale(&mut self, layout: PixelLayout, slope: f64, intercept: f64) -> Result<()> {
        if layout != PixelLayout::Scalar {
            return Ok(());
        }
        match self {
            VoxelBuffer::U8(v) => rescale_in_place(v, slope, intercept),
            VoxelBuffer::I8(v) => rescale_in_place(v, slope, intercept),
            VoxelBuffer::U16(v) => rescale_in_place(v, slope, intercept),
            VoxelBuffer::I16(v) => rescale_in_place(v, slope, intercept),
            VoxelBuffer::U32(v) => rescale_in_place(v, slope, intercept),
            VoxelBuffer::I32(v) => rescale_in_place(v, slope, intercept),
            VoxelBuffer::F32(v) => rescale_in_place(v, slope, intercept),
            VoxelBuffer::F64(v) => rescale_in_place(v, slope, intercept),
            VoxelBuffer::Rgb(_) => {}
            VoxelBuffer::Raw(v) => {
                if !v.is_empty() {
                    return Err(NiftiError::UnsupportedComponentType(ComponentType::Unknown));
                }
            }
        }
        Ok(())
    }
}
