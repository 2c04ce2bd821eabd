//! This module defines the data element API, which enables voxel buffers
//! to decode and encode their elements in either byte order.

use crate::datatype::ComponentType;
use crate::error::{NiftiError, Result};
use crate::typedef::NiftiType;
use bytemuck::Pod;
use byteordered::{ByteOrdered, Endian, Endianness};
use num_traits::AsPrimitive;
use std::io::Write;
use std::mem::size_of;

/// Trait type for characterizing a NIfTI data element, implemented for
/// primitive numeric types which are used by the crate to represent voxel
/// values.
pub trait DataElement: 'static + Pod + AsPrimitive<f64> {
    /// The `datatype` mapped to the type.
    const DATA_TYPE: NiftiType;

    /// The component type mapped to the type.
    const COMPONENT_TYPE: ComponentType;

    /// Transform the given raw bytes into a vector of data elements, stored
    /// with the given byte order.
    ///
    /// # Errors
    ///
    /// - `NiftiError::IncompatibleLength` if the number of bytes is not a
    ///   multiple of the element size.
    fn from_raw_vec(raw: &[u8], endianness: Endianness) -> Result<Vec<Self>> {
        let size = size_of::<Self>();
        if raw.len() % size != 0 {
            return Err(NiftiError::IncompatibleLength(raw.len(), raw.len() / size * size));
        }
        if endianness == Endianness::native() {
            return Ok(bytemuck::allocation::pod_collect_to_vec(raw));
        }
        let mut input = ByteOrdered::runtime(raw, endianness);
        (0..raw.len() / size)
            .map(|_| Self::read_one(&mut input))
            .collect()
    }

    /// Read a single element in the given byte order.
    fn read_one<E: Endian>(input: &mut ByteOrdered<&[u8], E>) -> Result<Self>;

    /// Write a single element in the given byte order.
    fn write_one<W: Write, E: Endian>(self, output: &mut ByteOrdered<W, E>) -> Result<()>;

    /// Write all elements to `writer`, in little endian.
    fn write_all_le<W: Write>(data: &[Self], writer: W) -> Result<()> {
        if Endianness::native() == Endianness::Little {
            let mut writer = writer;
            writer.write_all(bytemuck::cast_slice(data))?;
            return Ok(());
        }
        let mut output = ByteOrdered::le(writer);
        for &v in data {
            v.write_one(&mut output)?;
        }
        Ok(())
    }
}

macro_rules! impl_data_element {
    ($t:ty, $data_type:ident, $component:ident, $read:ident, $write:ident) => {
        impl DataElement for $t {
            const DATA_TYPE: NiftiType = NiftiType::$data_type;
            const COMPONENT_TYPE: ComponentType = ComponentType::$component;

            fn read_one<E: Endian>(input: &mut ByteOrdered<&[u8], E>) -> Result<Self> {
                input.$read().map_err(From::from)
            }

            fn write_one<W: Write, E: Endian>(self, output: &mut ByteOrdered<W, E>) -> Result<()> {
                output.$write(self).map_err(From::from)
            }
        }
    };
}

impl_data_element!(u8, Uint8, UChar, read_u8, write_u8);
impl_data_element!(i8, Int8, Char, read_i8, write_i8);
impl_data_element!(u16, Uint16, UShort, read_u16, write_u16);
impl_data_element!(i16, Int16, Short, read_i16, write_i16);
impl_data_element!(u32, Uint32, UInt, read_u32, write_u32);
impl_data_element!(i32, Int32, Int, read_i32, write_i32);
impl_data_element!(f32, Float32, Float, read_f32, write_f32);
impl_data_element!(f64, Float64, Double, read_f64, write_f64);
