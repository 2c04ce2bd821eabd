//! This module defines the decoded voxel buffer of an image, along with
//! the conversion from and to the raw bytes of a volume file.
//! An integration with `ndarray` is available with the `ndarray_volumes`
//! feature of this crate.

pub mod element;
pub mod rescale;
#[cfg(feature = "ndarray_volumes")]
pub mod ndarray;

use self::element::DataElement;
use crate::datatype::{ComponentType, PixelLayout};
use crate::error::{NiftiError, Result};
use crate::typedef::NiftiType;
use byteordered::Endianness;
use rgb::RGB8;
use std::io::{self, Read, Write};

/// Voxel values decoded into native types, in the order in which they are
/// stored (first axis varying fastest).
#[derive(Debug, Clone, PartialEq)]
pub enum VoxelBuffer {
    /// Unsigned 8-bit values.
    U8(Vec<u8>),
    /// Signed 8-bit values.
    I8(Vec<i8>),
    /// Unsigned 16-bit values.
    U16(Vec<u16>),
    /// Signed 16-bit values.
    I16(Vec<i16>),
    /// Unsigned 32-bit values.
    U32(Vec<u32>),
    /// Signed 32-bit values.
    I32(Vec<i32>),
    /// Single precision values.
    F32(Vec<f32>),
    /// Double precision values.
    F64(Vec<f64>),
    /// 8-bit RGB pixels.
    Rgb(Vec<RGB8>),
    /// Bytes of a data type without a native counterpart, kept as they are.
    Raw(Vec<u8>),
}

macro_rules! impl_from_vec {
    ($t:ty, $variant:ident) => {
        impl From<Vec<$t>> for VoxelBuffer {
            fn from(data: Vec<$t>) -> Self {
                VoxelBuffer::$variant(data)
            }
        }
    };
}

impl_from_vec!(u8, U8);
impl_from_vec!(i8, I8);
impl_from_vec!(u16, U16);
impl_from_vec!(i16, I16);
impl_from_vec!(u32, U32);
impl_from_vec!(i32, I32);
impl_from_vec!(f32, F32);
impl_from_vec!(f64, F64);
impl_from_vec!(RGB8, Rgb);

impl VoxelBuffer {
    /// Decode the raw bytes of a volume, stored with the given data type and
    /// byte order. Data types without a native counterpart are kept as raw
    /// bytes.
    pub fn from_raw(raw: Vec<u8>, data_type: NiftiType, endianness: Endianness) -> Result<Self> {
        let buffer = match data_type {
            NiftiType::Uint8 => VoxelBuffer::U8(raw),
            NiftiType::Int8 => VoxelBuffer::I8(i8::from_raw_vec(&raw, endianness)?),
            NiftiType::Uint16 => VoxelBuffer::U16(u16::from_raw_vec(&raw, endianness)?),
            NiftiType::Int16 => VoxelBuffer::I16(i16::from_raw_vec(&raw, endianness)?),
            NiftiType::Uint32 => VoxelBuffer::U32(u32::from_raw_vec(&raw, endianness)?),
            NiftiType::Int32 => VoxelBuffer::I32(i32::from_raw_vec(&raw, endianness)?),
            NiftiType::Float32 => VoxelBuffer::F32(f32::from_raw_vec(&raw, endianness)?),
            NiftiType::Float64 => VoxelBuffer::F64(f64::from_raw_vec(&raw, endianness)?),
            NiftiType::Rgb24 => {
                if raw.len() % 3 != 0 {
                    return Err(NiftiError::IncompatibleLength(raw.len(), raw.len() / 3 * 3));
                }
                VoxelBuffer::Rgb(
                    raw.chunks_exact(3)
                        .map(|c| RGB8::new(c[0], c[1], c[2]))
                        .collect(),
                )
            }
            _ => VoxelBuffer::Raw(raw),
        };
        Ok(buffer)
    }

    /// Read `nbytes` bytes of volume data from `source` and decode them.
    pub fn from_reader<R: Read>(
        mut source: R,
        nbytes: usize,
        data_type: NiftiType,
        endianness: Endianness,
    ) -> Result<Self> {
        let raw = read_volume_bytes(source, nbytes)?;
        Self::from_raw(raw, data_type, endianness)
    }

    /// Number of pixels, or of bytes for raw buffers.
    pub fn len(&self) -> usize {
        match self {
            VoxelBuffer::U8(v) => v.len(),
            VoxelBuffer::I8(v) => v.len(),
            VoxelBuffer::U16(v) => v.len(),
            VoxelBuffer::I16(v) => v.len(),
            VoxelBuffer::U32(v) => v.len(),
            VoxelBuffer::I32(v) => v.len(),
            VoxelBuffer::F32(v) => v.len(),
            VoxelBuffer::F64(v) => v.len(),
            VoxelBuffer::Rgb(v) => v.len(),
            VoxelBuffer::Raw(v) => v.len(),
        }
    }

    /// Whether the buffer holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The numeric type of each pixel component.
    pub fn component_type(&self) -> ComponentType {
        match self {
            VoxelBuffer::U8(_) | VoxelBuffer::Rgb(_) => u8::COMPONENT_TYPE,
            VoxelBuffer::I8(_) => i8::COMPONENT_TYPE,
            VoxelBuffer::U16(_) => u16::COMPONENT_TYPE,
            VoxelBuffer::I16(_) => i16::COMPONENT_TYPE,
            VoxelBuffer::U32(_) => u32::COMPONENT_TYPE,
            VoxelBuffer::I32(_) => i32::COMPONENT_TYPE,
            VoxelBuffer::F32(_) => f32::COMPONENT_TYPE,
            VoxelBuffer::F64(_) => f64::COMPONENT_TYPE,
            VoxelBuffer::Raw(_) => ComponentType::Unknown,
        }
    }

    /// The on-disk data type of the buffer's values, or `None` for raw
    /// buffers.
    pub fn data_type(&self) -> Option<NiftiType> {
        match self {
            VoxelBuffer::U8(_) => Some(u8::DATA_TYPE),
            VoxelBuffer::I8(_) => Some(i8::DATA_TYPE),
            VoxelBuffer::U16(_) => Some(u16::DATA_TYPE),
            VoxelBuffer::I16(_) => Some(i16::DATA_TYPE),
            VoxelBuffer::U32(_) => Some(u32::DATA_TYPE),
            VoxelBuffer::I32(_) => Some(i32::DATA_TYPE),
            VoxelBuffer::F32(_) => Some(f32::DATA_TYPE),
            VoxelBuffer::F64(_) => Some(f64::DATA_TYPE),
            VoxelBuffer::Rgb(_) => Some(NiftiType::Rgb24),
            VoxelBuffer::Raw(_) => None,
        }
    }

    /// The layout of each pixel.
    pub fn pixel_layout(&self) -> PixelLayout {
        match self {
            VoxelBuffer::Rgb(_) => PixelLayout::Rgb,
            _ => PixelLayout::Scalar,
        }
    }

    /// Write the buffer in little endian, as stored in a NIfTI-1 file.
    pub fn write_le<W: Write>(&self, mut writer: W) -> Result<()> {
        match self {
            VoxelBuffer::U8(v) => u8::write_all_le(v, writer),
            VoxelBuffer::I8(v) => i8::write_all_le(v, writer),
            VoxelBuffer::U16(v) => u16::write_all_le(v, writer),
            VoxelBuffer::I16(v) => i16::write_all_le(v, writer),
            VoxelBuffer::U32(v) => u32::write_all_le(v, writer),
            VoxelBuffer::I32(v) => i32::write_all_le(v, writer),
            VoxelBuffer::F32(v) => f32::write_all_le(v, writer),
            VoxelBuffer::F64(v) => f64::write_all_le(v, writer),
            VoxelBuffer::Rgb(v) => {
                for px in v {
                    writer.write_all(&[px.r, px.g, px.b])?;
                }
                Ok(())
            }
            VoxelBuffer::Raw(v) => {
                writer.write_all(v)?;
                Ok(())
            }
        }
    }
}

/// Read exactly `nbytes` bytes, growing the buffer as data arrives so that
/// a bogus size in a header fails at the end of the stream instead of at
/// allocation.
pub(crate) fn read_volume_bytes<R: Read>(source: R, nbytes: usize) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    let _ = source.take(nbytes as u64).read_to_end(&mut raw)?;
    if raw.len() < nbytes {
        return Err(NiftiError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "volume data ends before the size given by the header",
        )));
    }
    Ok(raw)
}
